//! # Adapters Layer
//!
//! In-memory implementations of the outbound ports, for tests and for
//! hosts that keep everything in one process.

pub mod clock;
pub mod conditions;
pub mod signature;

pub use clock::*;
pub use conditions::*;
pub use signature::*;
