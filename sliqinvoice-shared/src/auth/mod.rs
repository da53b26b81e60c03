/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and length rule
/// - [`jwt`]: Session token generation and validation
/// - [`gate`]: Public/protected path rules applied to every request
///
/// # Example
///
/// ```
/// use sliqinvoice_shared::auth::gate::{decide, GateDecision, TokenState};
///
/// assert_eq!(
///     decide("/api/customers", &TokenState::Missing),
///     GateDecision::Unauthorized("Authentication required"),
/// );
/// ```

pub mod gate;
pub mod jwt;
pub mod password;
