//! Invoicing Service - invoice generation, backfill, and duplicate reconciliation jobs.

pub mod config;
pub mod models;
pub mod services;
