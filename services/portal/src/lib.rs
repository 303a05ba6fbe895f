//! Portal gateway service library crate.
//!
//! # Purpose
//! Exposes the portal API surface, the access gate, configuration, and the
//! map view machinery for use by the binary and tests.
//!
//! # Notes
//! Module boundaries mirror the HTTP API and the two gateway concerns,
//! access control and map data, for clarity.
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod map;
pub mod observability;
