//! Core domain types
//!
//! This module contains the cluster entities the console operates on. These
//! types are decoded from the REST API's property bags and shared between the
//! client, the watchers, and the CLI.

pub mod job;
pub mod node;
