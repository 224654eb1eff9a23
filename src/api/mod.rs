//! Boundary layer: role checks, request validation and wire-shaped replies.
//!
//! Every entry point takes the caller as `Option<&CurrentUser>` (`None` when
//! the session layer could not authenticate anyone) and returns a [`Reply`].
//! Errors are turned into `{ error, kind }` bodies here and never cross the
//! boundary as error values.

use crate::{
    core::user::get_user_by_id,
    entities::Role,
    errors::{Error, ErrorKind, Result},
};
use sea_orm::ConnectionTrait;
use serde::Serialize;
use tracing::{error, warn};

pub mod inventory;
pub mod renewal;

/// The authenticated caller, as yielded by the session layer.
///
/// Token balances are deliberately absent; they are read from the store when
/// needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub role: Role,
    pub department: String,
}

impl CurrentUser {
    /// Loads the caller from the store. Inactive or missing accounts yield `None`.
    pub async fn load<C>(db: &C, user_id: i64) -> Result<Option<Self>>
    where
        C: ConnectionTrait,
    {
        let user = get_user_by_id(db, user_id).await?;
        Ok(user.filter(|u| u.is_active).map(|u| Self {
            id: u.id,
            role: u.role,
            department: u.department,
        }))
    }
}

/// Checks that a caller is present and that `allowed` accepts its role.
/// Runs before any store access.
pub(crate) fn authorize<'a>(
    user: Option<&'a CurrentUser>,
    allowed: fn(Role) -> bool,
    action: &'static str,
) -> Result<&'a CurrentUser> {
    let user = user.ok_or(Error::Unauthenticated)?;
    if !allowed(user.role) {
        warn!(user_id = user.id, role = %user.role, action, "Forbidden");
        return Err(Error::Forbidden {
            role: user.role,
            action,
        });
    }
    Ok(user)
}

/// Failure body sent back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub error: String,
    pub kind: ErrorKind,
}

impl From<Error> for Failure {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let error = if kind == ErrorKind::Internal {
            error!(error = %err, "Internal error");
            "Internal error, please try again later".to_string()
        } else {
            err.to_string()
        };
        Self { error, kind }
    }
}

/// Result of a boundary call, serialized as either the success body or a
/// [`Failure`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Reply<T> {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure kind, if this is a failure.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure.kind),
        }
    }
}

impl<T> From<Result<T>> for Reply<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(body) => Self::Success(body),
            Err(e) => Self::Failure(e.into()),
        }
    }
}
