//! # SliqInvoice Worker Library
//!
//! Background jobs that run next to the API server.
//!
//! ## Modules
//!
//! - `reconciler`: Links Customers left without a usable User login

pub mod reconciler;
