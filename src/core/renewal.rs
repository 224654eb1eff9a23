//! Token renewal evaluation for a single user and token class.
//!
//! A token class is renewed when the user either did not use it during the
//! evaluated window, or acknowledged receipt of every requisition that used
//! it. Every evaluation leaves one audit row per (user, period, resource kind,
//! token kind); re-evaluating the same key overwrites that row.

use crate::{
    entities::{
        ReceiptAcknowledgement, TokenClass, TokenRenewal, receipt_acknowledgement, requisition,
        token_renewal,
    },
    errors::Result,
};
use sea_orm::{Set, prelude::*};
use tracing::debug;

/// Outcome of evaluating one token class for one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenewalVerdict {
    pub class: TokenClass,
    /// At least one qualifying requisition in the window
    pub had_requisition: bool,
    /// Every qualifying requisition was acknowledged (vacuously true with none)
    pub acknowledged: bool,
    pub renewed: bool,
}

/// A user's token-consuming requisitions split into the three token classes.
///
/// Requisitions that did not use a token, or whose (resource kind, token kind)
/// pair belongs to no class, are dropped.
#[derive(Debug, Clone, Default)]
pub struct ClassGroups {
    supply_ordinary: Vec<requisition::Model>,
    stationery_ordinary: Vec<requisition::Model>,
    stationery_extraordinary: Vec<requisition::Model>,
}

impl ClassGroups {
    #[must_use]
    pub fn partition(requisitions: Vec<requisition::Model>) -> Self {
        let mut groups = Self::default();
        for requisition in requisitions {
            if !requisition.token_used {
                continue;
            }
            match TokenClass::classify(requisition.resource_kind, requisition.token_kind_used) {
                Some(TokenClass::SupplyOrdinary) => groups.supply_ordinary.push(requisition),
                Some(TokenClass::StationeryOrdinary) => {
                    groups.stationery_ordinary.push(requisition);
                }
                Some(TokenClass::StationeryExtraordinary) => {
                    groups.stationery_extraordinary.push(requisition);
                }
                None => {}
            }
        }
        groups
    }

    #[must_use]
    pub fn get(&self, class: TokenClass) -> &[requisition::Model] {
        match class {
            TokenClass::SupplyOrdinary => &self.supply_ordinary,
            TokenClass::StationeryOrdinary => &self.stationery_ordinary,
            TokenClass::StationeryExtraordinary => &self.stationery_extraordinary,
        }
    }
}

/// Whether `user_id` acknowledged receipt of `requisition_id`.
pub async fn has_acknowledged<C>(db: &C, requisition_id: i64, user_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let found = ReceiptAcknowledgement::find()
        .filter(receipt_acknowledgement::Column::RequisitionId.eq(requisition_id))
        .filter(receipt_acknowledgement::Column::UserId.eq(user_id))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Decides whether `class` is renewed for `user_id` and records the verdict
/// under `period`.
///
/// `requisitions` must already be restricted to the user's token-consuming
/// requisitions of the evaluated window that belong to `class`.
pub async fn evaluate<C>(
    db: &C,
    user_id: i64,
    requisitions: &[requisition::Model],
    class: TokenClass,
    period: &str,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let verdict = evaluate_class(db, user_id, requisitions, class, period).await?;
    Ok(verdict.renewed)
}

/// Same as [`evaluate`] but returns the full verdict.
pub async fn evaluate_class<C>(
    db: &C,
    user_id: i64,
    requisitions: &[requisition::Model],
    class: TokenClass,
    period: &str,
) -> Result<RenewalVerdict>
where
    C: ConnectionTrait,
{
    let had_requisition = !requisitions.is_empty();

    let mut acknowledged = true;
    for requisition in requisitions {
        if !has_acknowledged(db, requisition.id, user_id).await? {
            debug!(user_id, requisition_id = requisition.id, %class, "Receipt not acknowledged");
            acknowledged = false;
            break;
        }
    }

    let verdict = RenewalVerdict {
        class,
        had_requisition,
        acknowledged,
        renewed: acknowledged,
    };
    upsert_renewal_record(db, user_id, period, &verdict).await?;

    Ok(verdict)
}

/// Writes the audit row for (user, period, class), replacing any earlier verdict.
pub async fn upsert_renewal_record<C>(
    db: &C,
    user_id: i64,
    period: &str,
    verdict: &RenewalVerdict,
) -> Result<token_renewal::Model>
where
    C: ConnectionTrait,
{
    let now = chrono::Utc::now();

    let existing = TokenRenewal::find()
        .filter(token_renewal::Column::UserId.eq(user_id))
        .filter(token_renewal::Column::Period.eq(period))
        .filter(token_renewal::Column::ResourceKind.eq(verdict.class.resource_kind()))
        .filter(token_renewal::Column::TokenKind.eq(verdict.class.token_kind()))
        .one(db)
        .await?;

    let record = if let Some(record) = existing {
        let mut active_model: token_renewal::ActiveModel = record.into();
        active_model.had_requisition = Set(verdict.had_requisition);
        active_model.acknowledged = Set(verdict.acknowledged);
        active_model.renewed = Set(verdict.renewed);
        active_model.evaluated_at = Set(now);
        active_model.update(db).await?
    } else {
        token_renewal::ActiveModel {
            user_id: Set(user_id),
            period: Set(period.to_string()),
            resource_kind: Set(verdict.class.resource_kind()),
            token_kind: Set(verdict.class.token_kind()),
            had_requisition: Set(verdict.had_requisition),
            acknowledged: Set(verdict.acknowledged),
            renewed: Set(verdict.renewed),
            evaluated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?
    };

    Ok(record)
}

/// Looks up the stored verdict for one key.
pub async fn get_renewal_record<C>(
    db: &C,
    user_id: i64,
    period: &str,
    class: TokenClass,
) -> Result<Option<token_renewal::Model>>
where
    C: ConnectionTrait,
{
    TokenRenewal::find()
        .filter(token_renewal::Column::UserId.eq(user_id))
        .filter(token_renewal::Column::Period.eq(period))
        .filter(token_renewal::Column::ResourceKind.eq(class.resource_kind()))
        .filter(token_renewal::Column::TokenKind.eq(class.token_kind()))
        .one(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::{RequisitionState, ResourceKind, TokenKind};
    use crate::test_utils::*;

    const PERIOD: &str = "2024-03";

    #[tokio::test]
    async fn test_no_requisitions_renews_by_default() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "ana").await?;

        let renewed = evaluate(&db, user.id, &[], TokenClass::SupplyOrdinary, PERIOD).await?;
        assert!(renewed);

        let record = get_renewal_record(&db, user.id, PERIOD, TokenClass::SupplyOrdinary)
            .await?
            .unwrap();
        assert!(!record.had_requisition);
        assert!(record.renewed);

        Ok(())
    }

    #[tokio::test]
    async fn test_one_missing_acknowledgement_denies() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "luis").await?;
        let first = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 5),
        )
        .await?;
        let second = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 20),
        )
        .await?;
        acknowledge(&db, first.id, user.id).await?;

        let renewed = evaluate(
            &db,
            user.id,
            &[first, second],
            TokenClass::StationeryOrdinary,
            PERIOD,
        )
        .await?;
        assert!(!renewed);

        let record = get_renewal_record(&db, user.id, PERIOD, TokenClass::StationeryOrdinary)
            .await?
            .unwrap();
        assert!(record.had_requisition);
        assert!(!record.acknowledged);
        assert!(!record.renewed);

        Ok(())
    }

    #[tokio::test]
    async fn test_all_acknowledged_renews() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "marta").await?;
        let first = create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 1),
        )
        .await?;
        let second = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Insumo),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 28),
        )
        .await?;
        acknowledge(&db, first.id, user.id).await?;
        acknowledge(&db, second.id, user.id).await?;

        let renewed = evaluate(
            &db,
            user.id,
            &[first, second],
            TokenClass::SupplyOrdinary,
            PERIOD,
        )
        .await?;
        assert!(renewed);

        Ok(())
    }

    #[tokio::test]
    async fn test_acknowledgement_by_other_user_does_not_count() -> Result<()> {
        let db = setup_test_db().await?;
        let owner = create_test_user(&db, "owner").await?;
        let other = create_test_user(&db, "other").await?;
        let requisition = create_token_requisition(
            &db,
            owner.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Extraordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 10),
        )
        .await?;
        acknowledge(&db, requisition.id, other.id).await?;

        let renewed = evaluate(
            &db,
            owner.id,
            &[requisition],
            TokenClass::StationeryExtraordinary,
            PERIOD,
        )
        .await?;
        assert!(!renewed);

        Ok(())
    }

    #[tokio::test]
    async fn test_reevaluation_overwrites_record() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "jorge").await?;
        let requisition = create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            utc(2024, 2, 14),
        )
        .await?;

        let first = evaluate(
            &db,
            user.id,
            std::slice::from_ref(&requisition),
            TokenClass::SupplyOrdinary,
            PERIOD,
        )
        .await?;
        assert!(!first);

        acknowledge(&db, requisition.id, user.id).await?;
        let second = evaluate(
            &db,
            user.id,
            std::slice::from_ref(&requisition),
            TokenClass::SupplyOrdinary,
            PERIOD,
        )
        .await?;
        assert!(second);

        let records = TokenRenewal::find()
            .filter(token_renewal::Column::UserId.eq(user.id))
            .all(&db)
            .await?;
        assert_eq!(records.len(), 1);
        assert!(records[0].renewed);
        assert!(records[0].acknowledged);

        Ok(())
    }

    #[tokio::test]
    async fn test_partition_rules() -> Result<()> {
        let db = setup_test_db().await?;
        let user = create_test_user(&db, "eva").await?;
        let at = utc(2024, 2, 3);

        let supply_null = create_token_requisition(
            &db,
            user.id,
            None,
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            at,
        )
        .await?;
        let supply = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Insumo),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            at,
        )
        .await?;
        let stationery = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Ordinario,
            RequisitionState::Cerrado,
            at,
        )
        .await?;
        let extraordinary = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Papeleria),
            TokenKind::Extraordinario,
            RequisitionState::Cerrado,
            at,
        )
        .await?;
        let supply_extraordinary = create_token_requisition(
            &db,
            user.id,
            Some(ResourceKind::Insumo),
            TokenKind::Extraordinario,
            RequisitionState::Cerrado,
            at,
        )
        .await?;
        let meeting = create_meeting_requisition(&db, user.id, at).await?;

        let groups = ClassGroups::partition(vec![
            supply_null.clone(),
            supply.clone(),
            stationery.clone(),
            extraordinary.clone(),
            supply_extraordinary,
            meeting,
        ]);

        assert_eq!(groups.get(TokenClass::SupplyOrdinary), &[supply_null, supply]);
        assert_eq!(groups.get(TokenClass::StationeryOrdinary), &[stationery]);
        assert_eq!(groups.get(TokenClass::StationeryExtraordinary), &[extraordinary]);

        Ok(())
    }
}
