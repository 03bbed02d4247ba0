//! Classhub - Education center management backend core
//!
//! This crate implements session virtualization for recurring class
//! schedules: weekly rules are expanded into virtual sessions on demand,
//! merged with persisted records for calendar reads, and promoted to
//! real, identity-bearing sessions only when somebody acts on a slot.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
