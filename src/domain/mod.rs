//! Domain types and ports shared by the payment and showcase engines.

pub mod money;
pub mod payment;
pub mod ports;
pub mod request;
pub mod results;
pub mod showcase;
