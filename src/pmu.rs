//! Performance-monitor event mapping behind the vendor PMU extension.

use crate::consts::*;
use crate::hal::Hal;
use crate::ppu::Ppu;

const fn mhpmevent(idx: usize) -> u16 {
    CSR_MHPMEVENT3 + (idx - PMU_COUNTER_FIRST) as u16
}

impl<H: Hal> Ppu<H> {
    /// Vendor PMU request entry: the map kind rewires one counter, every
    /// other kind restores the default mapping.
    pub fn pmu_set(&self, kind: usize, idx: usize, event_id: usize) {
        match kind {
            PMU_KIND_MAP => self.pmu_map(idx, event_id),
            _ => self.pmu_init(),
        }
    }

    /// Default event mapping: counter n counts event n - 2, with counter
    /// writes opened up to the supervisor and the overflow interrupt
    /// delegated.
    pub fn pmu_init(&self) {
        let mideleg = self.hal.csr_read(CSR_MIDELEG) | (1 << 17);
        self.hal.csr_write(CSR_MIDELEG, mideleg);
        self.hal.csr_write(CSR_MCOUNTERWEN, 0xffff_ffff);
        for idx in PMU_COUNTER_FIRST..=PMU_DEFAULT_LAST {
            self.hal.csr_write(mhpmevent(idx), idx - 2);
        }
    }

    /// Points one hardware counter at an event id. Indices outside the
    /// mappable range are ignored.
    pub fn pmu_map(&self, idx: usize, event_id: usize) {
        if (PMU_COUNTER_FIRST..=PMU_COUNTER_LAST).contains(&idx) {
            self.hal.csr_write(mhpmevent(idx), event_id);
        }
    }
}
