//! Storage layer for rdx
//!
//! This crate provides:
//! - SQLite rule store (rules keyed by document identity)
//! - Redaction activity and audit trail tables
//! - Migrations

pub mod db;
pub mod error;
pub mod models;

pub use db::Storage;
pub use error::{Result, StorageError};
pub use models::{NewRule, RuleRecord};
