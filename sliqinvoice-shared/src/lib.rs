//! # SliqInvoice Shared Library
//!
//! Types and business logic used by the SliqInvoice API server and the
//! background worker.
//!
//! ## Module Organization
//!
//! - `auth`: Password hashing, session tokens, and the path gate rules
//! - `db`: Connection pool, migrations, and seeding
//! - `models`: Users, Customers and Modules
//! - `resource`: Generic list/read/delete contract shared by every model
//! - `spreadsheet`: `.xlsx` export and import codec
//! - `import`: Row-by-row upsert of imported spreadsheets
//! - `customer_link`: Provisioning and syncing the User behind each Customer
//! - `telemetry`: Tracing subscriber setup for the binaries

pub mod auth;
pub mod customer_link;
pub mod db;
pub mod import;
pub mod models;
pub mod resource;
pub mod spreadsheet;
pub mod telemetry;

/// Current version of the SliqInvoice shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
