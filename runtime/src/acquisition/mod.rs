//! Acquisition: finding identifiers and rendering their detail pages.
//!
//! Discovery is a single plain HTTP request; the detail pages need a full
//! browser render, driven by the orchestrator.

pub mod discovery;
pub mod http_client;
pub mod orchestrator;
