pub mod billing;
pub mod document;
pub mod money;
pub mod payment;
pub mod period;
pub mod ports;
pub mod tier;
