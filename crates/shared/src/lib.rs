//! Shared utilities and common types for the CRM reminder service.
//!
//! This crate provides common functionality used across all other crates:
//! - Placeholder template rendering
//! - Whole-day date arithmetic
//! - Common validation logic

pub mod template;
pub mod time;
pub mod validation;
