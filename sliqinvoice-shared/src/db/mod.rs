/// Database layer for SliqInvoice
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: Embedded schema migrations
/// - `seed`: Bootstrap administrator account
///
/// Models are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
pub mod seed;
