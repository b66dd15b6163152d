//! Integration tests for the deployment-trigger handler

mod test_driver;
mod test_fsm;
mod test_validation;
