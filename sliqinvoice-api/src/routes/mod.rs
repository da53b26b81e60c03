/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Session endpoints (login, register, logout, me)
/// - `resource`: Handlers shared by every CRUD resource
/// - `users`, `customers`, `modules`: Per-entity create and update

pub mod auth;
pub mod customers;
pub mod health;
pub mod modules;
pub mod resource;
pub mod users;
