//! Database access layer shared by CLMS services

pub mod init;
pub mod migrations;
pub mod models;

pub use init::init_database;
