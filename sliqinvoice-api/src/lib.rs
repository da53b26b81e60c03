//! # SliqInvoice API Server Library
//!
//! This library provides the core functionality for the SliqInvoice admin
//! API server.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Session cookie gate
//! - `response`: Success envelopes
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
