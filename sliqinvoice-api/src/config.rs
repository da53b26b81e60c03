/// Configuration management for the API server
///
/// This module loads configuration from environment variables (with `.env`
/// support) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `JWT_SECRET`: Session token signing key, at least 32 characters (required)
/// - `JWT_EXPIRY_HOURS`: Session lifetime, 1 to 8760 (default: 24)
/// - `APP_ENV`: `production` turns on `Secure` cookies (default: development)
/// - `CORS_ORIGINS`: Comma-separated origins, or `*` (default: *)
/// - `STATIC_DIR`: Directory of page files served behind the gate (optional)
/// - `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD`: Bootstrap administrator (optional)
/// - `RUST_LOG` / `LOG_FORMAT`: Log filter and `json` output
///
/// # Example
///
/// ```no_run
/// use sliqinvoice_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::path::PathBuf;

use anyhow::Context;

/// Shortest accepted `JWT_SECRET`
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Longest accepted session lifetime, one year
pub const MAX_JWT_EXPIRY_HOURS: i64 = 24 * 365;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,

    /// Bootstrap administrator, when both variables are set
    pub seed_admin: Option<SeedAdminConfig>,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,

    /// Page files served to requests no route matched
    pub static_dir: Option<PathBuf>,

    /// Deployed in production (Secure cookies)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HS256 signing key
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token and cookie lifetime
    pub expiry_hours: i64,
}

#[derive(Debug, Clone)]
pub struct SeedAdminConfig {
    pub email: String,
    pub password: String,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a value does not
    /// parse, or `JWT_SECRET` is too short. There is no fallback secret.
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()
            .context("API_PORT must be a port number")?;

        let database_url = get("DATABASE_URL").context("DATABASE_URL environment variable is required")?;
        let max_connections = get("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()
            .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?;

        let jwt_secret = get("JWT_SECRET").context("JWT_SECRET environment variable is required")?;
        if jwt_secret.chars().count() < MIN_JWT_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_JWT_SECRET_LENGTH);
        }

        let expiry_hours = get("JWT_EXPIRY_HOURS")
            .unwrap_or_else(|| "24".to_string())
            .parse::<i64>()
            .context("JWT_EXPIRY_HOURS must be an integer")?;
        if !(1..=MAX_JWT_EXPIRY_HOURS).contains(&expiry_hours) {
            anyhow::bail!("JWT_EXPIRY_HOURS must be between 1 and {}", MAX_JWT_EXPIRY_HOURS);
        }

        let production = get("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        let seed_admin = match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(SeedAdminConfig { email, password }),
            _ => None,
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                static_dir: get("STATIC_DIR").map(PathBuf::from),
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiry_hours,
            },
            seed_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session lifetime
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.jwt.expiry_hours)
    }
}
