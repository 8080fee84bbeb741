//! # CLMS Common Library
//!
//! Shared code for CLMS (Cohort Learning Management System) services
//! including:
//! - Database initialization, migrations, and models
//! - Configuration loading and root folder resolution
//! - Week index arithmetic for batch progression
//! - Timestamp and run-scheduling utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod week;

pub use error::{Error, Result};
