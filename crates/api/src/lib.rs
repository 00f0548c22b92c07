//! HTTP surface, configuration and background jobs of the CRM reminder service.

pub mod app;
pub mod config;
pub mod error;
pub mod jobs;
pub mod middleware;
pub mod routes;
pub mod services;
