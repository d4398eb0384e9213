#![no_std]

//! Power-management and memory-protection control layer for a C9xx RISC-V
//! application cluster: hart save/restore sequencing against the SoC
//! low-power registers, replicated PMP window programming for the shared
//! TCM ranges, and the vendor extension dispatch exposing both.

pub mod consts;
pub mod hal;

mod ecall;
mod pmp;
mod pmu;
mod ppu;

pub use ecall::{UnknownExtension, VendorArgs};
pub use hal::{Hal, RegisterMap};
pub use pmp::TcmRegion;
pub use ppu::{Ppu, SavedCsrs};
