//! Deployment-trigger handler library
//!
//! Drives a blue/green or canary deployment to completion on behalf of a
//! pipeline job: validates, submits, monitors, re-validates, and reports the
//! outcome back to the pipeline controller.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod logs;
pub mod models;
pub mod services;
pub mod utils;
pub mod validate;
pub mod workers;

pub use app::options::HandlerOptions;
pub use app::run::{Handler, InvocationSummary};
pub use app::settings::Settings;
pub use errors::{HandlerError, ServiceError};
