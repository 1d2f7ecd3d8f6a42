//! Shared test utilities for the packvar workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`workspace`]: [`TestWorkspace`](workspace::TestWorkspace), a temporary
//!   directory for override and settings files
//! - [`fixtures`]: declaration sources and builders for variable blocks

pub mod fixtures;
pub mod workspace;
