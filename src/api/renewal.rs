//! Monthly renewal entry point.

use super::{CurrentUser, Reply, authorize};
use crate::{
    core::monthly::{UserRenewalResult, run_monthly_renewal},
    entities::Role,
    errors::Error,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;

/// Per-class renewal verdicts of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RenewalFlags {
    pub insumo: bool,
    pub papeleria_ordinario: bool,
    pub papeleria_extraordinario: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRenewalReply {
    pub usuario_id: i64,
    pub renovaciones: RenewalFlags,
    pub tokens_renovados: usize,
}

impl From<&UserRenewalResult> for UserRenewalReply {
    fn from(result: &UserRenewalResult) -> Self {
        Self {
            usuario_id: result.user_id,
            renovaciones: RenewalFlags {
                insumo: result.supply_ordinary,
                papeleria_ordinario: result.stationery_ordinary,
                papeleria_extraordinario: result.stationery_extraordinary,
            },
            tokens_renovados: result.tokens_renewed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenewalProcessReply {
    pub message: String,
    pub usuarios_procesados: usize,
    pub resultados: Vec<UserRenewalReply>,
}

/// Runs the monthly token renewal as of `today`. Super admins only.
pub async fn run_renewal_process(
    db: &DatabaseConnection,
    user: Option<&CurrentUser>,
    today: NaiveDate,
) -> Reply<RenewalProcessReply> {
    async {
        authorize(user, |role| role == Role::SuperAdmin, "run token renewal")?;

        let result = run_monthly_renewal(db, today).await?;
        Ok::<_, Error>(RenewalProcessReply {
            message: format!(
                "Renovacion de tokens {} completada ({} a {})",
                result.window.period,
                result.window.start.format("%Y-%m-%d"),
                result.window.end.format("%Y-%m-%d"),
            ),
            usuarios_procesados: result.users_processed,
            resultados: result.results.iter().map(UserRenewalReply::from).collect(),
        })
    }
    .await
    .into()
}
