//! User and token balance operations.
//!
//! Token balances are always read from the store on demand; nothing in the
//! crate keeps a copy of them between calls.

use crate::{
    entities::{Role, TokenClass, User, user},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// The three token balances of one user, as availability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalances {
    pub supply_ordinary: bool,
    pub stationery_ordinary: bool,
    pub stationery_extraordinary: bool,
}

impl TokenBalances {
    /// All three tokens available.
    pub const FULL: Self = Self {
        supply_ordinary: true,
        stationery_ordinary: true,
        stationery_extraordinary: true,
    };

    #[must_use]
    pub const fn get(&self, class: TokenClass) -> bool {
        match class {
            TokenClass::SupplyOrdinary => self.supply_ordinary,
            TokenClass::StationeryOrdinary => self.stationery_ordinary,
            TokenClass::StationeryExtraordinary => self.stationery_extraordinary,
        }
    }
}

impl From<&user::Model> for TokenBalances {
    fn from(model: &user::Model) -> Self {
        Self {
            supply_ordinary: model.supply_token == 1,
            stationery_ordinary: model.stationery_token_ordinary == 1,
            stationery_extraordinary: model.stationery_token_extraordinary == 1,
        }
    }
}

/// Column of `usuarios` that stores the balance for `class`.
const fn token_column(class: TokenClass) -> user::Column {
    match class {
        TokenClass::SupplyOrdinary => user::Column::SupplyToken,
        TokenClass::StationeryOrdinary => user::Column::StationeryTokenOrdinary,
        TokenClass::StationeryExtraordinary => user::Column::StationeryTokenExtraordinary,
    }
}

fn flag(available: bool) -> i32 {
    i32::from(available)
}

/// Fields for a new account. New accounts start with every token available.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub department: String,
}

/// Creates a user account.
pub async fn create_user<C>(db: &C, new_user: NewUser) -> Result<user::Model>
where
    C: ConnectionTrait,
{
    if new_user.name.trim().is_empty() || new_user.email.trim().is_empty() {
        return Err(Error::Validation {
            message: "User name and e-mail are required".to_string(),
        });
    }

    let model = user::ActiveModel {
        name: Set(new_user.name.trim().to_string()),
        email: Set(new_user.email.trim().to_lowercase()),
        role: Set(new_user.role),
        department: Set(new_user.department),
        supply_token: Set(1),
        stationery_token_ordinary: Set(1),
        stationery_token_extraordinary: Set(1),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };

    model.insert(db).await.map_err(Into::into)
}

pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// All active users, ordered by id.
pub async fn get_active_users<C>(db: &C) -> Result<Vec<user::Model>>
where
    C: ConnectionTrait,
{
    User::find()
        .filter(user::Column::IsActive.eq(true))
        .order_by_asc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Reads the current token balances of a user straight from the store.
pub async fn token_balances<C>(db: &C, user_id: i64) -> Result<TokenBalances>
where
    C: ConnectionTrait,
{
    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;
    Ok(TokenBalances::from(&user))
}

/// Marks every class in `classes` as available with a single update.
/// Classes not listed are left exactly as they are.
pub async fn grant_tokens<C>(db: &C, user_id: i64, classes: &[TokenClass]) -> Result<()>
where
    C: ConnectionTrait,
{
    if classes.is_empty() {
        return Ok(());
    }

    let mut update = User::update_many().filter(user::Column::Id.eq(user_id));
    for class in classes {
        update = update.col_expr(token_column(*class), Expr::value(1));
    }
    update.exec(db).await?;
    Ok(())
}

/// Spends the token for `class`. Fails with [`Error::TokenUnavailable`] if it
/// was already spent this period.
pub async fn consume_token<C>(db: &C, user_id: i64, class: TokenClass) -> Result<()>
where
    C: ConnectionTrait,
{
    let column = token_column(class);
    let result = User::update_many()
        .col_expr(column, Expr::value(0))
        .filter(user::Column::Id.eq(user_id))
        .filter(column.eq(1))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        // Distinguish a missing user from a spent token
        get_user_by_id(db, user_id)
            .await?
            .ok_or(Error::UserNotFound { id: user_id })?;
        return Err(Error::TokenUnavailable { user_id, class });
    }
    Ok(())
}

/// Admin override: sets all three balances explicitly.
#[instrument(skip(db))]
pub async fn override_token_balances(
    db: &DatabaseConnection,
    user_id: i64,
    balances: TokenBalances,
) -> Result<TokenBalances> {
    let user = get_user_by_id(db, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;

    let mut active_model: user::ActiveModel = user.into();
    active_model.supply_token = Set(flag(balances.supply_ordinary));
    active_model.stationery_token_ordinary = Set(flag(balances.stationery_ordinary));
    active_model.stationery_token_extraordinary = Set(flag(balances.stationery_extraordinary));
    let updated = active_model.update(db).await?;

    info!(user_id, ?balances, "Token balances overridden");
    Ok(TokenBalances::from(&updated))
}
