/// Database models for SliqInvoice
///
/// Each model owns its inserts and partial updates; listing, lookup and
/// deletion go through the generic [`crate::resource`] functions.
///
/// # Models
///
/// - `user`: Dashboard accounts (administrators, moderators, customer logins)
/// - `customer`: Subscribing companies, each linked to a login User
/// - `module`: Feature/menu entries toggled from the dashboard
///
/// # Example
///
/// ```no_run
/// use sliqinvoice_shared::models::user::{CreateUser, User, UserRole};
/// use sliqinvoice_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "ops@sliqinvoice.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: "Ops".to_string(),
///     role: UserRole::Moderator,
///     permissions: vec!["customers.read".to_string()],
///     is_active: true,
///     customer_id: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod customer;
pub mod module;
pub mod user;

use serde::{Deserialize, Deserializer};
use validator::ValidateEmail;

/// A stored enum column held a value outside its fixed set
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Enum being decoded ("role", "subscription status", ...)
    pub kind: &'static str,

    /// Offending value
    pub value: String,
}

/// Trims and lowercases an e-mail address
///
/// Every stored and looked-up address goes through this, which is what makes
/// the unique constraints case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Whether the address is syntactically valid
pub fn is_valid_email(email: &str) -> bool {
    email.validate_email()
}

/// Trims, drops empties and de-duplicates, keeping first-seen order
pub fn normalize_permissions<I, S>(permissions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for p in permissions {
        let p = p.as_ref().trim();
        if !p.is_empty() && !out.iter().any(|existing| existing == p) {
            out.push(p.to_string());
        }
    }
    out
}

/// Parses a comma-separated permissions cell
pub fn parse_permission_list(cell: &str) -> Vec<String> {
    normalize_permissions(cell.split(','))
}

/// Turns whitespace-only optional text into `None`
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Distinguishes an absent field from an explicit `null`
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`: a missing
/// field stays `None`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Deserializes a string with surrounding whitespace removed
///
/// Length rules then see the trimmed value, so `length(min = 1)` rejects
/// whitespace-only input.
pub fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// [`trimmed`] for optional fields; `null` stays `None`
pub fn trimmed_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|v| v.map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        phone: Option<Option<String>>,
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Admin@SliqInvoice.COM "), "admin@sliqinvoice.com");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("a@acme.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_parse_permission_list() {
        assert_eq!(
            parse_permission_list(" invoices.read, invoices.write,,invoices.read "),
            vec!["invoices.read".to_string(), "invoices.write".to_string()]
        );
        assert!(parse_permission_list("").is_empty());
    }

    #[test]
    fn test_blank_to_none() {
        assert_eq!(blank_to_none(Some("  ".to_string())), None);
        assert_eq!(blank_to_none(Some(" x ".to_string())), Some("x".to_string()));
        assert_eq!(blank_to_none(None), None);
    }

    #[derive(Debug, Deserialize)]
    struct Names {
        #[serde(default, deserialize_with = "trimmed")]
        name: String,

        #[serde(default, deserialize_with = "trimmed_option")]
        nickname: Option<String>,
    }

    #[test]
    fn test_trimmed_names() {
        let names: Names = serde_json::from_str(r#"{"name": "  Acme ", "nickname": "   "}"#).unwrap();
        assert_eq!(names.name, "Acme");
        assert_eq!(names.nickname.as_deref(), Some(""));

        let absent: Names = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.name, "");
        assert_eq!(absent.nickname, None);

        let cleared: Names = serde_json::from_str(r#"{"nickname": null}"#).unwrap();
        assert_eq!(cleared.nickname, None);
    }

    #[test]
    fn test_double_option() {
        let absent: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.phone, None);

        let cleared: Patch = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        assert_eq!(cleared.phone, Some(None));

        let set: Patch = serde_json::from_str(r#"{"phone": "555"}"#).unwrap();
        assert_eq!(set.phone, Some(Some("555".to_string())));
    }
}
