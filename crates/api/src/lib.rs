//! In-memory reference backend for visit check-ins.
//!
//! Implements the four endpoints the admin and student clients consume so the
//! client workflows can be exercised end to end. Records live in process
//! memory only.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
pub mod store;
