//! Gantry Core
//!
//! Core types for the Gantry cluster console.
//!
//! This crate contains:
//! - Domain types: Cluster entities (Node, Job) and their state enums
//! - REST decoding: The property-bag wire shape the cluster API speaks

pub mod domain;
pub mod rest;
