//! # Ports Layer (Hexagonal Architecture)
//!
//! - `inbound`: the message surface hosts drive the broker through
//! - `outbound`: what the broker needs from its host

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
