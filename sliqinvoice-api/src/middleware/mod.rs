/// Middleware modules for the API server
///
/// - `auth_gate`: Session cookie check applied to every request

pub mod auth_gate;
