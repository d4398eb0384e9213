//! Hart power state machine: ordered save sequences into low power and the
//! reset-driven wake path. One [`Ppu`] instance covers the whole cluster;
//! each core calls into it on its own hardware thread.

use core::sync::atomic::{AtomicBool, Ordering};

use axerrno::{AxError, AxResult};
use log::debug;
use spin::Mutex;

use crate::consts::*;
use crate::hal::{Hal, RegisterMap};

/// CSR values captured on the way into low power.
///
/// The wake path never reads these back: a stopped or suspended core comes
/// back through warm reset and the cold-boot CSR init, so the snapshot exists
/// for post-mortem inspection only.
#[derive(Debug, Default, Clone, Copy)]
pub struct SavedCsrs {
    pub mstatus: usize,
    pub mie: usize,
    pub mhint: usize,
    pub mhcr: usize,
    pub msmpr: usize,
}

/// Cluster power and protection context.
pub struct Ppu<H: Hal> {
    pub(crate) hal: H,
    pub(crate) map: RegisterMap,
    /// Address the boot ROM re-enters after a warm reset.
    warm_entry: usize,
    /// Monotonic: set by the first save on any core, never cleared. While
    /// unset the cores are still live from cold boot rather than reset-held,
    /// so `hart_start` must not pulse the reset line.
    hotplug: AtomicBool,
    saved: Mutex<SavedCsrs>,
    /// Single-writer lock for the replicated PMP banks.
    pub(crate) pmp_lock: Mutex<()>,
}

impl<H: Hal> Ppu<H> {
    pub fn new(hal: H, map: RegisterMap, warm_entry: usize) -> Self {
        Self {
            hal,
            map,
            warm_entry,
            hotplug: AtomicBool::new(false),
            saved: Mutex::new(SavedCsrs::default()),
            pmp_lock: Mutex::new(()),
        }
    }

    /// Brings a stopped core back through its reset vector.
    ///
    /// The caller-provided start address is not consumed here: the target
    /// core re-enters through the warm boot vector and the runtime hands it
    /// its start address once it reports back in.
    pub fn hart_start(&self, hartid: usize, _start_addr: usize) -> AxResult<()> {
        debug!("core {}: start hart {}", self.hal.hart_id(), hartid);
        self.aux_restore(hartid);
        Ok(())
    }

    /// Parks the calling core. On hardware this does not run past the final
    /// `wfi`; wake goes through the reset vector written by `hart_start`.
    pub fn hart_stop(&self) -> AxResult<()> {
        debug!("core {}: stop", self.hal.hart_id());
        self.aux_save();
        Ok(())
    }

    /// Takes the calling (master) core and the cluster into deep standby.
    /// Retentive requests stay with the runtime's generic suspend path.
    pub fn hart_suspend(&self, suspend_type: u32, _resume_addr: usize) -> AxResult<()> {
        if suspend_type & SUSPEND_NON_RET_BIT == 0 {
            return Err(AxError::Unsupported);
        }
        debug!("core {}: suspend type {:#x}", self.hal.hart_id(), suspend_type);
        self.master_save();
        Ok(())
    }

    pub fn hotplug_engaged(&self) -> bool {
        self.hotplug.load(Ordering::Relaxed)
    }

    /// Snapshot taken by the most recent save sequence.
    pub fn saved_csrs(&self) -> SavedCsrs {
        *self.saved.lock()
    }

    /// Common front half of every save sequence. The order is load-bearing:
    /// interrupts must be masked before the cache comes down, prefetch must
    /// stop before the invalidate, and the fence must retire every prior
    /// store before the core stops fetching.
    fn save_core_state(&self) {
        let mut saved = self.saved.lock();
        // disable all irq
        saved.mstatus = self.hal.csr_read_clear(CSR_MSTATUS, MSTATUS_MIE | MSTATUS_SIE);
        saved.mie = self.hal.csr_read_clear(
            CSR_MIE,
            MIP_MSIP | MIP_MTIP | MIP_MEIP | MIP_SSIP | MIP_STIP | MIP_SEIP,
        );
        self.hotplug.store(true, Ordering::Relaxed);
        // close prefetch
        saved.mhint = self
            .hal
            .csr_read_clear(CSR_MHINT, MHINT_L2PLD | MHINT_IPLD | MHINT_DPLD);
        // clean+invalidate dcache
        self.hal.dcache_ciall();
        self.hal.sync_is();
        // close dcache
        saved.mhcr = self.hal.csr_read_clear(CSR_MHCR, MHCR_DE);
        // close smp
        saved.msmpr = self.hal.csr_read_clear(CSR_MSMPR, MSMPR_MSPEN);
        self.hal.mb();
    }

    fn aux_save(&self) {
        self.save_core_state();
        self.hal.wfi();
    }

    fn master_save(&self) {
        self.save_core_state();
        self.set_lp_mode(LP_STANDBY);
        self.master_entryboot_set();
        self.perf_disable();
        self.hal.wfi();
    }

    fn set_lp_mode(&self, mode: u32) {
        self.hal.write32(self.map.chip_lp_mode, mode);
    }

    /// Leaves the boot ROM everything it needs to take the warm path: the
    /// indicator magics plus the ROM-to-loader handoff and warm entry vector.
    fn master_entryboot_set(&self) {
        for (reg, magic) in self.map.str_indicator.into_iter().zip(STR_INDICATOR_MAGIC) {
            self.hal.write32(reg, magic);
        }
        self.hal.write32(self.map.boot_arg[0], BOOT_ARG_FLAG);
        self.hal.write32(self.map.boot_arg[1], BOOT_ARG_LOADER_ENTRY);
        self.hal.write32(self.map.boot_arg[2], self.warm_entry as u32);
        self.hal.write32(self.map.boot_arg[3], (self.warm_entry as u64 >> 32) as u32);
    }

    /// Rewrites the reset vector of every auxiliary slot. Always all four:
    /// the registers are cheap to write and the vector is identical.
    fn aux_entryboot_set(&self) {
        let lo = self.warm_entry as u32;
        let hi = (self.warm_entry as u64 >> 32) as u32;
        for (reg_lo, reg_hi) in self.map.core_rvba {
            self.hal.write32(reg_lo, lo);
            self.hal.write32(reg_hi, hi);
        }
    }

    /// One-way microarchitectural shutdown ahead of deep standby. There is
    /// no matching re-enable here; the cold-boot CSR init after warm reset
    /// brings the core back to its normal configuration.
    fn perf_disable(&self) {
        self.hal.csr_write(CSR_MSMPR, 0);
        self.hal.csr_write(CSR_MHINT2, 0);
        self.hal.csr_write(CSR_MHINT4, 0);
        self.hal.csr_write(CSR_MCCR2, MCCR2_SUSPEND);
        self.hal.csr_write(CSR_MHCR, MHCR_SUSPEND);
        self.hal.csr_write(CSR_MXSTATUS, MXSTATUS_SUSPEND);
        self.hal.csr_write(CSR_MHINT, MHINT_SUSPEND);
    }

    /// Re-arms the warm vectors, then pulses the target core's reset line so
    /// the boot ROM actually runs from them. No pulse before the first save:
    /// the hardware is not reset-held yet.
    fn aux_restore(&self, hartid: usize) {
        self.aux_entryboot_set();
        if self.hotplug.load(Ordering::Relaxed) && hartid < MAX_CORES {
            let mut val = self.hal.read32(self.map.swrst);
            val &= !(1 << (hartid + 1));
            self.hal.write32(self.map.swrst, val);
            val |= 1 << (hartid + 1);
            self.hal.write32(self.map.swrst, val);
        }
    }
}
