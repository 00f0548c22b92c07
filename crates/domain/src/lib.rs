//! Domain layer for the CRM reminder service.
//!
//! This crate contains:
//! - Domain models (ReminderRule, EntitySnapshot, NotificationLogEntry, ScanReport)
//! - The trigger evaluator, entity strategy table and scan orchestrator
//! - Collaborator traits implemented by the persistence and api crates
//! - Domain error types

pub mod errors;
pub mod models;
pub mod services;
