//! Middleware for rentroll-service.

pub mod metrics;
