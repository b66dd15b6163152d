//! Deployment submission and monitoring

pub mod backoff;
pub mod driver;
pub mod fsm;
pub mod monitor;
