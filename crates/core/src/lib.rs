//! Domain core for visit check-ins.
//!
//! Holds the organization token generator, the scan-session state machine,
//! and the wire-level data model shared by the client and the reference
//! backend. This crate does no network or file I/O.

pub mod config;
pub mod error;
pub mod messages;
pub mod organization;
pub mod scan;
pub mod student;
pub mod token;
pub mod types;
pub mod visit;
