//! Pre- and post-deployment gates

pub mod health;
pub mod post;
pub mod pre;
