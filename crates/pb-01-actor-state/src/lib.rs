//! # pb-01-actor-state
//!
//! Account model shared by every actor, including the payment broker.
//!
//! ## Role in System
//!
//! - **Account Model**: balance, replay-protection nonce, code identity and
//!   state-root pointer for every address
//! - **Content-Addressed State**: immutable blobs keyed by BLAKE3 digest; an
//!   actor's private state is updated by replacing its `head` pointer
//!
//! ```text
//!   Address ──► Account { code, head, nonce, balance }
//!                                 │
//!                                 ▼
//!                     ContentStore: Cid ──► bytes (immutable)
//! ```
//!
//! ## Invariants
//!
//! - Balance never goes negative: `debit` fails before mutating
//! - Nonce only moves by `increment_nonce`, exactly one step at a time
//! - Account bytes are a fixed 88-byte layout; anything else is rejected

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::*;
pub use domain::*;
pub use ports::*;
