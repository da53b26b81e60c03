/// Customer login reconciler
///
/// Customer create and update link the Customer to a User after the customer
/// row is written, and a failed link only gets logged. This loop finds
/// Customers left without a usable User and runs the same link step again,
/// oldest first. Each pass walks all of them, one batch per query.
///
/// # Example
///
/// ```no_run
/// use sliqinvoice_worker::reconciler::{Reconciler, ReconcilerConfig};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) {
/// let reconciler = Reconciler::new(pool, ReconcilerConfig::default());
///
/// let shutdown = reconciler.shutdown_token();
/// tokio::spawn(async move {
///     let _ = tokio::signal::ctrl_c().await;
///     shutdown.cancel();
/// });
///
/// reconciler.run().await;
/// # }
/// ```

use anyhow::Context;
use sliqinvoice_shared::customer_link::{self, LinkOutcome};
use sliqinvoice_shared::models::customer::Customer;
use sqlx::PgPool;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Reconciler configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Seconds between passes
    pub interval_secs: u64,

    /// Customers fetched per query within a pass
    pub batch_size: i64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        ReconcilerConfig {
            interval_secs: 60,
            batch_size: 50,
        }
    }
}

impl ReconcilerConfig {
    /// Loads `RECONCILE_INTERVAL_SECS` and `RECONCILE_BATCH_SIZE`
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let interval_secs = match get("RECONCILE_INTERVAL_SECS") {
            Some(v) => v
                .parse::<u64>()
                .context("RECONCILE_INTERVAL_SECS must be a whole number of seconds")?,
            None => defaults.interval_secs,
        };
        if interval_secs == 0 {
            anyhow::bail!("RECONCILE_INTERVAL_SECS must be at least 1");
        }

        let batch_size = match get("RECONCILE_BATCH_SIZE") {
            Some(v) => v
                .parse::<i64>()
                .context("RECONCILE_BATCH_SIZE must be a number")?,
            None => defaults.batch_size,
        };
        if batch_size < 1 {
            anyhow::bail!("RECONCILE_BATCH_SIZE must be at least 1");
        }

        Ok(ReconcilerConfig {
            interval_secs,
            batch_size,
        })
    }
}

/// Counts for one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Unlinked customers found
    pub examined: usize,

    /// Customers that got a new User
    pub created: usize,

    /// Customers that adopted an existing User
    pub adopted: usize,

    /// Customers whose link was already valid
    pub already_linked: usize,

    /// Customers that could not be linked this pass
    pub failed: usize,
}

impl PassReport {
    fn record(&mut self, outcome: LinkOutcome) {
        match outcome {
            LinkOutcome::Created(_) => self.created += 1,
            LinkOutcome::Adopted(_) => self.adopted += 1,
            LinkOutcome::AlreadyLinked(_) => self.already_linked += 1,
        }
    }

    /// Customers that now have a User
    pub fn linked(&self) -> usize {
        self.created + self.adopted + self.already_linked
    }
}

/// Periodic Customer to User repair loop
pub struct Reconciler {
    db: PgPool,
    config: ReconcilerConfig,
    shutdown_token: CancellationToken,
}

impl Reconciler {
    pub fn new(db: PgPool, config: ReconcilerConfig) -> Self {
        Reconciler {
            db,
            config,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancelling this token stops [`Reconciler::run`] after the current pass
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Runs passes until shutdown
    ///
    /// The first pass starts immediately. A pass that fails to query the
    /// database is logged and retried on the next tick.
    pub async fn run(&self) {
        tracing::info!(
            interval_secs = self.config.interval_secs,
            batch_size = self.config.batch_size,
            "Reconciler starting"
        );

        let mut ticker = interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.run_once().await {
                Ok(report) if report.examined > 0 => {
                    tracing::info!(
                        examined = report.examined,
                        created = report.created,
                        adopted = report.adopted,
                        already_linked = report.already_linked,
                        failed = report.failed,
                        "Reconciliation pass complete"
                    );
                }
                Ok(_) => tracing::debug!("No unlinked customers"),
                Err(e) => tracing::error!(error = %e, "Reconciliation pass failed"),
            }
        }

        tracing::info!("Reconciler shut down");
    }

    /// Runs a single pass over every unlinked customer
    ///
    /// Customers are fetched `batch_size` at a time, continuing after the
    /// last one seen, so rows that keep failing never hide newer ones.
    ///
    /// # Errors
    ///
    /// Only selecting a batch can fail the pass; per-customer failures are
    /// counted in the report.
    pub async fn run_once(&self) -> Result<PassReport, sqlx::Error> {
        let mut report = PassReport::default();
        let mut cursor = None;

        loop {
            let customers = Customer::list_unlinked(&self.db, cursor, self.config.batch_size).await?;
            let Some(last) = customers.last() else {
                break;
            };
            cursor = Some((last.created_at, last.id));
            let page_len = customers.len();

            for customer in &customers {
                if self.shutdown_token.is_cancelled() {
                    return Ok(report);
                }

                report.examined += 1;
                match customer_link::link_user(&self.db, customer).await {
                    Ok(outcome) => report.record(outcome),
                    Err(e) => {
                        report.failed += 1;
                        tracing::warn!(
                            customer_id = %customer.id,
                            email = %customer.contact_email,
                            error = %e,
                            "Failed to link customer"
                        );
                    }
                }
            }

            if (page_len as i64) < self.config.batch_size {
                break;
            }
        }

        Ok(report)
    }
}
