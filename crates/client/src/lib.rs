//! Admin and student clients for visit check-ins.
//!
//! Wraps the backend REST endpoints, caches the organization registry for the
//! admin console, and runs the scan loop that turns a camera frame feed into
//! at most one visit submission per presented code.

pub mod admin;
pub mod api;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod registry;
pub mod scanner;
pub mod session;
