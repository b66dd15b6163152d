//! Handler assembly: settings, options and the invocation flow

pub mod options;
pub mod run;
pub mod settings;
