/// Customer to User linking
///
/// A Customer signs in through a User with the same e-mail and password
/// hash. The two rows are written independently: the customer insert or
/// update is the operation that succeeds or fails, the User side is applied
/// afterwards on a best-effort basis. Customers left without a usable User
/// are picked up again by the worker's reconciler, which calls
/// [`link_user`].

use sqlx::PgPool;
use uuid::Uuid;

use crate::models::customer::{CreateCustomer, Customer, UpdateCustomer};
use crate::models::user::{CreateUser, UpdateUser, User, UserRole};
use crate::resource::repository;

/// Error type for linking a Customer to its User
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The e-mail already belongs to a User owned by another customer
    #[error("User {user_id} with email {email} already belongs to customer {customer_id}")]
    OwnedByOtherCustomer {
        user_id: Uuid,
        email: String,
        customer_id: Uuid,
    },

    /// The e-mail belongs to a staff account
    #[error("User {user_id} with email {email} has role {role} and cannot be linked to a customer")]
    RoleNotLinkable {
        user_id: Uuid,
        email: String,
        role: UserRole,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// How a Customer got its User
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// `user_id` already pointed at an existing User
    AlreadyLinked(Uuid),

    /// A User with the same e-mail existed and was adopted
    Adopted(Uuid),

    /// A new User was created
    Created(Uuid),
}

impl LinkOutcome {
    pub fn user_id(&self) -> Uuid {
        match self {
            LinkOutcome::AlreadyLinked(id) | LinkOutcome::Adopted(id) | LinkOutcome::Created(id) => *id,
        }
    }
}

/// Ensures the customer has a linked User
///
/// Reuses a `customer` or `customer_sub_user` User with the customer's
/// e-mail when one exists, otherwise creates a `customer` role User with the
/// customer's password hash.
///
/// # Errors
///
/// Fails when the e-mail is held by a staff User or by a User of another
/// customer, or on any database error. Nothing is rolled back: a User
/// created before a failing `set_user_id` is adopted on the next attempt.
pub async fn link_user(pool: &PgPool, customer: &Customer) -> Result<LinkOutcome, LinkError> {
    if let Some(user_id) = customer.user_id {
        if let Some(user) = repository::find_by_id::<User>(pool, user_id).await? {
            ensure_linkable(&user)?;
            return Ok(LinkOutcome::AlreadyLinked(user_id));
        }
        tracing::debug!(customer_id = %customer.id, %user_id, "Linked user no longer exists");
    }

    let outcome = match User::find_by_email(pool, &customer.contact_email).await? {
        Some(user) if !user.role.is_customer_login() => return Err(not_linkable(user)),
        Some(user) => match user.customer_id {
            Some(owner) if owner != customer.id => {
                return Err(LinkError::OwnedByOtherCustomer {
                    user_id: user.id,
                    email: user.email,
                    customer_id: owner,
                });
            }
            Some(_) => LinkOutcome::Adopted(user.id),
            None => {
                User::update(
                    pool,
                    user.id,
                    UpdateUser {
                        customer_id: Some(Some(customer.id)),
                        ..Default::default()
                    },
                )
                .await?;
                LinkOutcome::Adopted(user.id)
            }
        },
        None => {
            let user = User::create(
                pool,
                CreateUser {
                    email: customer.contact_email.clone(),
                    password_hash: customer.password_hash.clone(),
                    name: customer.login_name().to_string(),
                    role: UserRole::Customer,
                    permissions: customer.permissions.clone(),
                    is_active: customer.subscription_status.allows_login(),
                    customer_id: Some(customer.id),
                },
            )
            .await?;
            LinkOutcome::Created(user.id)
        }
    };

    Customer::set_user_id(pool, customer.id, outcome.user_id()).await?;

    tracing::info!(
        customer_id = %customer.id,
        user_id = %outcome.user_id(),
        outcome = ?outcome,
        "Customer linked to user"
    );

    Ok(outcome)
}

fn not_linkable(user: User) -> LinkError {
    LinkError::RoleNotLinkable {
        user_id: user.id,
        email: user.email,
        role: user.role,
    }
}

fn ensure_linkable(user: &User) -> Result<(), LinkError> {
    if user.role.is_customer_login() {
        Ok(())
    } else {
        Err(not_linkable(user.clone()))
    }
}

/// Best-effort [`link_user`]: failures are logged and swallowed
///
/// Returns the linked User's ID on success.
pub async fn provision_user(pool: &PgPool, customer: &Customer) -> Option<Uuid> {
    match link_user(pool, customer).await {
        Ok(outcome) => Some(outcome.user_id()),
        Err(e) => {
            tracing::warn!(
                customer_id = %customer.id,
                email = %customer.contact_email,
                error = %e,
                "Failed to provision user for customer; left for reconciliation"
            );
            None
        }
    }
}

/// Creates a customer, then provisions its User
///
/// Only the customer insert can fail the call.
pub async fn create_and_link(pool: &PgPool, data: CreateCustomer) -> Result<Customer, sqlx::Error> {
    let mut customer = Customer::create(pool, data).await?;

    if let Some(user_id) = provision_user(pool, &customer).await {
        customer.user_id = Some(user_id);
    }

    Ok(customer)
}

/// User fields to mirror after a customer update
///
/// `changes` is what was requested, `customer` the row after the update.
pub fn mirrored_user_changes(changes: &UpdateCustomer, customer: &Customer) -> UpdateUser {
    let renamed = changes.contact_name.is_some() || changes.company_name.is_some();

    UpdateUser {
        email: changes.contact_email.as_ref().map(|_| customer.contact_email.clone()),
        password_hash: changes.password_hash.clone(),
        name: renamed.then(|| customer.login_name().to_string()),
        permissions: changes.permissions.as_ref().map(|_| customer.permissions.clone()),
        is_active: changes
            .subscription_status
            .map(|status| status.allows_login()),
        ..Default::default()
    }
}

/// Applies mirrored changes to a linked User
///
/// Returns `false` when the User no longer exists. Staff accounts are refused
/// even if a stale link points at one.
async fn mirror_to_user(pool: &PgPool, user_id: Uuid, changes: UpdateUser) -> Result<bool, LinkError> {
    let user = match repository::find_by_id::<User>(pool, user_id).await? {
        Some(user) => user,
        None => return Ok(false),
    };
    ensure_linkable(&user)?;

    Ok(User::update(pool, user_id, changes).await?.is_some())
}

/// Updates a customer, then mirrors the relevant changes to its User
///
/// Only the customer update can fail the call. An unlinked customer is
/// linked instead of mirrored.
pub async fn update_and_sync(
    pool: &PgPool,
    id: Uuid,
    changes: UpdateCustomer,
) -> Result<Option<Customer>, sqlx::Error> {
    let mirror = changes.clone();

    let mut customer = match Customer::update(pool, id, changes).await? {
        Some(customer) => customer,
        None => return Ok(None),
    };

    match customer.user_id {
        Some(user_id) => {
            let user_changes = mirrored_user_changes(&mirror, &customer);
            if !user_changes.is_empty() {
                match mirror_to_user(pool, user_id, user_changes).await {
                    Ok(true) => {
                        tracing::debug!(customer_id = %id, %user_id, "Customer changes mirrored to user");
                    }
                    Ok(false) => {
                        tracing::warn!(customer_id = %id, %user_id, "Linked user missing; left for reconciliation");
                    }
                    Err(e) => {
                        tracing::warn!(customer_id = %id, %user_id, error = %e, "Failed to mirror customer changes to user");
                    }
                }
            }
        }
        None => {
            customer.user_id = provision_user(pool, &customer).await;
        }
    }

    Ok(Some(customer))
}
