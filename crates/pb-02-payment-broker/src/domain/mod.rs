//! # Domain Layer (Inner Hexagon)
//!
//! Pure broker logic. NO I/O beyond the ports handed in by the caller,
//! NO async, NO clocks.

pub mod channel;
pub mod codec;
pub mod invariants;
pub mod state_machine;
pub mod value_objects;
pub mod voucher;

pub use channel::*;
pub use invariants::*;
pub use state_machine::*;
pub use value_objects::*;
pub use voucher::*;
