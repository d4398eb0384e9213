//! Vendor extension dispatch: decodes a privileged-call (extension id,
//! function id) pair into a PMU or PMP request.

use log::debug;

use crate::consts::{EXT_VENDOR_PMP, EXT_VENDOR_PMU};
use crate::hal::Hal;
use crate::ppu::Ppu;

/// Argument registers captured from the calling context.
#[derive(Debug, Default, Clone, Copy)]
pub struct VendorArgs {
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
}

/// Extension id this firmware build does not serve.
///
/// Unrecoverable by contract: the caller asked for an extension that does
/// not exist in this build, so the runtime boundary must convert this into
/// [`Ppu::fatal_halt`] rather than resume the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownExtension(pub usize);

impl<H: Hal> Ppu<H> {
    /// Serves one vendor call. PMU requests carry (kind, counter, event) in
    /// `a0..a2`; PMP requests select the region via the function id and carry
    /// the authorization byte in `a0`, with unknown region selectors ignored.
    pub fn handle_vendor_call(
        &self,
        extid: usize,
        funcid: usize,
        args: VendorArgs,
    ) -> Result<usize, UnknownExtension> {
        debug!("vendor call: extid {:#x} funcid {:#x}", extid, funcid);
        match extid {
            EXT_VENDOR_PMU => {
                self.pmu_set(args.a0, args.a1, args.a2);
                Ok(0)
            }
            EXT_VENDOR_PMP => {
                self.set_region_permission(funcid, args.a0 as u32);
                Ok(0)
            }
            _ => Err(UnknownExtension(extid)),
        }
    }

    /// Boundary conversion for a fatal dispatch outcome.
    pub fn fatal_halt(&self) -> ! {
        self.hal.halt()
    }
}
