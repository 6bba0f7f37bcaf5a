//! Common test utilities for panel cache testing.
//!
//! - [`fixtures`] - Seed data for the in-memory API
//! - [`harness`] - Session setup and a gated API for interleaving tests

#![allow(dead_code)]

pub mod fixtures;
pub mod harness;
