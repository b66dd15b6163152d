//! Data models for one handler invocation

pub mod deployment;
pub mod job;
