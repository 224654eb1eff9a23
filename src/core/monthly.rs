//! Monthly token renewal.
//!
//! Once a month an operator renews the request tokens of every active user.
//! Requisitions submitted during the previous calendar month are evaluated per
//! token class (see [`crate::core::renewal`]), renewed classes are set back to
//! available, and the whole batch is committed in a single transaction: either
//! every user is processed or nothing is persisted.
//!
//! The audit period label is the month the renewal runs in, while the
//! evaluated window is the month before it. A renewal run in April 2024 is
//! recorded as `2024-04` and looks at requisitions from March 2024.

use crate::{
    core::{
        renewal::{ClassGroups, evaluate},
        user::{get_active_users, grant_tokens},
    },
    entities::{Requisition, TokenClass, requisition, user},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use tracing::{error, info, instrument};

/// The evaluated window and the label its verdicts are recorded under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalWindow {
    /// First instant of the previous month (00:00:00)
    pub start: DateTime<Utc>,
    /// Last second of the previous month (23:59:59), as reported
    pub end: DateTime<Utc>,
    /// First instant of the current month; the window is `start..next_start`
    pub next_start: DateTime<Utc>,
    /// Audit label, the current month as `YYYY-MM`
    pub period: String,
}

impl RenewalWindow {
    /// Builds the window for a renewal run on `today`.
    pub fn for_date(today: NaiveDate) -> Result<Self> {
        let invalid = || Error::Validation {
            message: format!("Cannot compute the renewal window for {today}"),
        };

        let first_of_month = today.with_day(1).ok_or_else(invalid)?;
        let last_of_previous = first_of_month.pred_opt().ok_or_else(invalid)?;
        let first_of_previous = last_of_previous.with_day(1).ok_or_else(invalid)?;

        let start = first_of_previous.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        let end = last_of_previous.and_hms_opt(23, 59, 59).ok_or_else(invalid)?;
        let next_start = first_of_month.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;

        Ok(Self {
            start: start.and_utc(),
            end: end.and_utc(),
            next_start: next_start.and_utc(),
            period: today.format("%Y-%m").to_string(),
        })
    }
}

/// Verdicts for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRenewalResult {
    pub user_id: i64,
    pub supply_ordinary: bool,
    pub stationery_ordinary: bool,
    pub stationery_extraordinary: bool,
    /// Number of classes that were renewed
    pub tokens_renewed: usize,
}

impl UserRenewalResult {
    #[must_use]
    pub const fn verdict(&self, class: TokenClass) -> bool {
        match class {
            TokenClass::SupplyOrdinary => self.supply_ordinary,
            TokenClass::StationeryOrdinary => self.stationery_ordinary,
            TokenClass::StationeryExtraordinary => self.stationery_extraordinary,
        }
    }
}

/// Represents the result of a complete monthly renewal.
#[derive(Debug, Clone)]
pub struct MonthlyRenewalResult {
    /// Window that was evaluated and the label it was recorded under
    pub window: RenewalWindow,
    /// Number of active users processed
    pub users_processed: usize,
    /// Per-user verdicts, in user id order
    pub results: Vec<UserRenewalResult>,
}

/// Fetches the token-consuming requisitions a user submitted inside the window.
pub async fn get_token_requisitions_in_window<C>(
    db: &C,
    user_id: i64,
    window: &RenewalWindow,
) -> Result<Vec<requisition::Model>>
where
    C: ConnectionTrait,
{
    Requisition::find()
        .filter(requisition::Column::UserId.eq(user_id))
        .filter(requisition::Column::TokenUsed.eq(true))
        .filter(requisition::Column::SubmittedAt.gte(window.start))
        .filter(requisition::Column::SubmittedAt.lt(window.next_start))
        .order_by_asc(requisition::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Evaluates the three token classes of one user and grants the renewed ones.
async fn renew_user<C>(db: &C, user: &user::Model, window: &RenewalWindow) -> Result<UserRenewalResult>
where
    C: ConnectionTrait,
{
    let requisitions = get_token_requisitions_in_window(db, user.id, window).await?;
    let groups = ClassGroups::partition(requisitions);

    let mut renewed = Vec::with_capacity(TokenClass::ALL.len());
    for class in TokenClass::ALL {
        if evaluate(db, user.id, groups.get(class), class, &window.period).await? {
            renewed.push(class);
        }
    }

    // Denied classes are left as they are; tokens are only spent at request time
    grant_tokens(db, user.id, &renewed).await?;

    Ok(UserRenewalResult {
        user_id: user.id,
        supply_ordinary: renewed.contains(&TokenClass::SupplyOrdinary),
        stationery_ordinary: renewed.contains(&TokenClass::StationeryOrdinary),
        stationery_extraordinary: renewed.contains(&TokenClass::StationeryExtraordinary),
        tokens_renewed: renewed.len(),
    })
}

async fn renew_all_users<C>(db: &C, window: &RenewalWindow) -> Result<Vec<UserRenewalResult>>
where
    C: ConnectionTrait,
{
    let users = get_active_users(db).await?;
    let mut results = Vec::with_capacity(users.len());

    for user in &users {
        let result = renew_user(db, user, window)
            .await
            .inspect_err(|e| error!(user_id = user.id, error = %e, "Token renewal failed"))?;
        results.push(result);
    }

    Ok(results)
}

/// Runs the monthly token renewal as of `today`. This function:
///
/// 1. Computes the previous month's window and the current month's label
/// 2. For each active user, partitions their token-consuming requisitions of
///    the window into the three token classes and evaluates each class
/// 3. Sets every renewed class back to available
/// 4. Commits all users at once, or rolls everything back on the first error
///
/// Running it again for the same period overwrites the audit verdicts instead
/// of duplicating them.
#[instrument(skip(db))]
pub async fn run_monthly_renewal(
    db: &DatabaseConnection,
    today: NaiveDate,
) -> Result<MonthlyRenewalResult> {
    let window = RenewalWindow::for_date(today)?;

    // All users succeed or none are persisted
    let txn = db.begin().await?;

    match renew_all_users(&txn, &window).await {
        Ok(results) => {
            txn.commit().await?;
            info!(
                period = %window.period,
                users = results.len(),
                "Monthly token renewal committed"
            );
            Ok(MonthlyRenewalResult {
                users_processed: results.len(),
                results,
                window,
            })
        }
        Err(e) => {
            error!(period = %window.period, error = %e, "Monthly token renewal rolled back");
            if let Err(rollback_err) = txn.rollback().await {
                error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

/// Formats a renewal result into a human-readable summary for the operator.
#[must_use]
pub fn format_renewal_summary(result: &MonthlyRenewalResult) -> String {
    use std::fmt::Write;

    let renewed_total: usize = result.results.iter().map(|r| r.tokens_renewed).sum();
    let mut summary = format!(
        "Token renewal {} - evaluated {} to {} - {} users, {} tokens renewed\n",
        result.window.period,
        result.window.start.format("%Y-%m-%d"),
        result.window.end.format("%Y-%m-%d"),
        result.users_processed,
        renewed_total
    );

    for user_result in &result.results {
        let marks: Vec<String> = TokenClass::ALL
            .iter()
            .map(|class| {
                let mark = if user_result.verdict(*class) { "yes" } else { "no" };
                format!("{class}={mark}")
            })
            .collect();
        // Writing to a String cannot fail
        let _ = writeln!(summary, "  user {} | {}", user_result.user_id, marks.join(" "));
    }

    summary
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::renewal::get_renewal_record;
    use crate::core::user::{TokenBalances, consume_token, token_balances};
    use crate::entities::{RequisitionState, ResourceKind, TokenKind, TokenRenewal, token_renewal};
    use crate::test_utils::*;
    use sea_orm::{PaginatorTrait, sea_query::Expr};

    fn april_2024() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 10).unwrap()
    }

    async fn spend_all_tokens(db: &DatabaseConnection, user_id: i64) -> Result<()> {
        for class in TokenClass::ALL {
            consume_token(db, user_id, class).await?;
        }
        Ok(())
    }

    #[test]
    fn test_window_covers_previous_month() {
        let window = RenewalWindow::for_date(april_2024()).unwrap();
        assert_eq!(window.period, "2024-04");
        assert_eq!(window.start, utc(2024, 3, 1));
        assert_eq!(window.next_start, utc(2024, 4, 1));
        assert_eq!(
            window.end,
            NaiveDate::from_ymd_opt(2024, 3, 31)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn test_window_wraps_year() {
        let window =
            RenewalWindow::for_date(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()).unwrap();
        assert_eq!(window.period, "2025-01");
        assert_eq!(window.start, utc(2024, 12, 1));
        assert_eq!(window.end.date_naive(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }

    #[test]
    fn test_window_leap_february() {
        let window =
            RenewalWindow::for_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()).unwrap();
        assert_eq!(window.end.date_naive(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[tokio::test]
    async fn test_unacknowledged_extraordinary_is_not_renewed() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ursula").await?;
        spend_all_tokens(&db, user.id).await?;

        create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Extraordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 12),
        )
        .await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert_eq!(result.users_processed, 1);

        let user_result = &result.results[0];
        assert!(user_result.supply_ordinary);
        assert!(user_result.stationery_ordinary);
        assert!(!user_result.stationery_extraordinary);
        assert_eq!(user_result.tokens_renewed, 2);

        let balances = token_balances(&db, user.id).await?;
        assert!(balances.supply_ordinary);
        assert!(balances.stationery_ordinary);
        assert!(!balances.stationery_extraordinary);

        let record =
            get_renewal_record(&db, user.id, "2024-04", TokenClass::StationeryExtraordinary)
                .await?
                .unwrap();
        assert!(record.had_requisition);
        assert!(!record.acknowledged);
        assert!(!record.renewed);

        Ok(())
    }

    #[tokio::test]
    async fn test_denial_does_not_touch_other_classes() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "pablo").await?;
        spend_all_tokens(&db, user.id).await?;

        let supply = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Insumo),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 2),
        )
        .await?;
        acknowledge(&db, supply.id, user.id).await?;
        create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 3),
        )
        .await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        let user_result = &result.results[0];
        assert!(user_result.supply_ordinary);
        assert!(!user_result.stationery_ordinary);

        let balances = token_balances(&db, user.id).await?;
        assert!(balances.supply_ordinary);
        assert!(!balances.stationery_ordinary);

        Ok(())
    }

    #[tokio::test]
    async fn test_requisitions_outside_window_are_ignored() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "rita").await?;
        spend_all_tokens(&db, user.id).await?;

        // Unacknowledged, but in February and in April: neither is in the March window
        create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 29),
        )
        .await?;
        create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Pendiente,
            utc(2024, 4, 1),
        )
        .await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert!(result.results[0].supply_ordinary);
        assert_eq!(token_balances(&db, user.id).await?, TokenBalances::FULL);

        Ok(())
    }

    #[tokio::test]
    async fn test_last_second_of_month_is_inside_window() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "sol").await?;
        let last_second = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap()
            .and_utc();
        create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            last_second,
        )
        .await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert!(!result.results[0].supply_ordinary);

        Ok(())
    }

    #[tokio::test]
    async fn test_sub_second_before_month_end_is_inside_window() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "rita").await?;
        let late = NaiveDate::from_ymd_opt(2024, 3, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 500)
            .unwrap()
            .and_utc();
        create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            late,
        )
        .await?;

        let april = run_monthly_renewal(&db, april_2024()).await?;
        assert!(!april.results[0].supply_ordinary);

        // Belongs to March only, so May's run does not see it
        let may = run_monthly_renewal(&db, NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()).await?;
        assert!(may.results[0].supply_ordinary);

        Ok(())
    }

    #[tokio::test]
    async fn test_meeting_requisitions_do_not_affect_renewal() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "tomas").await?;
        create_meeting_requisition(&db, user.id, utc(2024, 3, 15)).await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert_eq!(result.results[0].tokens_renewed, 3);

        Ok(())
    }

    #[tokio::test]
    async fn test_inactive_users_are_skipped() -> Result<()> {
        let db = setup_test_db().await?;
        let active = create_test_user(&db, "activa").await?;
        let inactive = create_test_user(&db, "inactiva").await?;
        spend_all_tokens(&db, inactive.id).await?;
        deactivate_user(&db, inactive.id).await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert_eq!(result.users_processed, 1);
        assert_eq!(result.results[0].user_id, active.id);

        let balances = token_balances(&db, inactive.id).await?;
        assert!(!balances.supply_ordinary);

        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_keeps_one_record_per_key() -> Result<()> {
        let db = setup_test_db().await?;
        let first_user = create_test_user(&db, "uno").await?;
        let second_user = create_test_user(&db, "dos").await?;
        create_token_requisition(
            &db,
            second_user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 20),
        )
        .await?;

        let first_run = run_monthly_renewal(&db, april_2024()).await?;
        let second_run = run_monthly_renewal(&db, april_2024()).await?;

        assert_eq!(first_run.results, second_run.results);

        let total = TokenRenewal::find().count(&db).await?;
        assert_eq!(total, 6);
        for user_id in [first_user.id, second_user.id] {
            let per_user = TokenRenewal::find()
                .filter(token_renewal::Column::UserId.eq(user_id))
                .filter(token_renewal::Column::Period.eq("2024-04"))
                .count(&db)
                .await?;
            assert_eq!(per_user, 3);
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_failure_on_later_user_rolls_back_whole_run() -> Result<()> {
        let db = setup_test_db().await?;
        let first_user = create_test_user(&db, "primero").await?;
        let second_user = create_test_user(&db, "segundo").await?;
        spend_all_tokens(&db, first_user.id).await?;

        let broken = create_token_requisition(
            &db,
            second_user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 5),
        )
        .await?;
        // A state value no variant maps to makes loading the second user's
        // requisitions fail after the first user was already granted tokens
        Requisition::update_many()
            .col_expr(requisition::Column::State, Expr::value("archivado"))
            .filter(requisition::Column::Id.eq(broken.id))
            .exec(&db)
            .await?;

        let result = run_monthly_renewal(&db, april_2024()).await;
        assert!(result.is_err());

        let balances = token_balances(&db, first_user.id).await?;
        assert_eq!(
            balances,
            TokenBalances {
                supply_ordinary: false,
                stationery_ordinary: false,
                stationery_extraordinary: false,
            }
        );
        assert_eq!(TokenRenewal::find().count(&db).await?, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_no_users_processes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let result = run_monthly_renewal(&db, april_2024()).await?;
        assert_eq!(result.users_processed, 0);
        assert!(result.results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_format_renewal_summary() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "vera").await?;
        create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 3, 8),
        )
        .await?;

        let result = run_monthly_renewal(&db, april_2024()).await?;
        let summary = format_renewal_summary(&result);

        assert!(summary.contains("Token renewal 2024-04"));
        assert!(summary.contains("2024-03-01 to 2024-03-31"));
        assert!(summary.contains("1 users, 2 tokens renewed"));
        assert!(summary.contains("insumo=yes papeleria_ordinario=no papeleria_extraordinario=yes"));

        Ok(())
    }
}
