//! Application layer: the engines that drive the payment and showcase protocols.
//!
//! Each engine is a single-writer state machine performing at most one
//! network call per public method. Callers loop on `proceed()`/`repeat()`
//! and own all scheduling, including honoring `next_retry` between polls.

pub mod adaptive;
pub mod payment;
pub mod persistence;
pub mod showcase;
