//! HTTP request handlers and middleware.

pub mod auth;
pub mod metrics;
