//! # Integration Tests
//!
//! Full channel flows driven through the dispatcher against in-memory
//! stores, checking committed state after every message.

pub mod lifecycle;
