//! # Exploit Simulations
//!
//! Each test plays a dishonest payer, target or bystander and checks that
//! the attack is rejected without moving value or consuming a nonce.

pub mod forgery;
pub mod replay;
