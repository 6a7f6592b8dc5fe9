//! Donation Gateway - rate-limited payment intent service
//!
//! This crate implements the HTTP gateway in front of a nonprofit website's
//! donation flow. Payment intent creation is guarded by an in-memory,
//! per-client fixed-window rate limiter with a periodic sweep of expired
//! windows.

pub mod config;
pub mod error;
pub mod http;
pub mod payments;
pub mod ratelimit;
