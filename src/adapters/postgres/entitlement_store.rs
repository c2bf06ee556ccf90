//! PostgreSQL implementation of EntitlementStore.
//!
//! Unlocks live in `user_movie_unlocks` (one row per user and movie) so a
//! grant is a single `INSERT ... ON CONFLICT DO NOTHING`. The subscription is
//! one row per user, upserted whole; the upsert only replaces a row whose
//! `start_date` is strictly earlier.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::domain::entitlement::{Entitlement, Subscription, SubscriptionPlan};
use crate::domain::foundation::{DomainError, MovieId, Timestamp, UserId};
use crate::ports::EntitlementStore;

pub struct PostgresEntitlementStore {
    pool: PgPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UnlockRow {
    movie_id: Uuid,
    unlocked_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    plan: String,
    status: String,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    auto_renew: bool,
    updated_at: DateTime<Utc>,
}

impl TryFrom<&SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: &SubscriptionRow) -> Result<Self, Self::Error> {
        Ok(Subscription {
            plan: row.plan.parse().map_err(corrupt)?,
            status: row.status.parse().map_err(corrupt)?,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: Timestamp::from_datetime(row.end_date),
            auto_renew: row.auto_renew,
        })
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("Corrupt subscription row: {}", e))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

/// Latest write across both tables, or now for a user never seen before.
fn last_touched(unlocks: &[UnlockRow], subscription: Option<&SubscriptionRow>) -> Timestamp {
    unlocks
        .iter()
        .map(|u| u.unlocked_at)
        .chain(subscription.map(|s| s.updated_at))
        .max()
        .map(Timestamp::from_datetime)
        .unwrap_or_else(Timestamp::now)
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn find(&self, user_id: &UserId) -> Result<Entitlement, DomainError> {
        let unlocks: Vec<UnlockRow> = sqlx::query_as(
            "SELECT movie_id, unlocked_at FROM user_movie_unlocks WHERE user_id = $1",
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load unlocked movies", e))?;

        let subscription: Option<SubscriptionRow> = sqlx::query_as(
            r#"
            SELECT plan, status, start_date, end_date, auto_renew, updated_at
            FROM user_subscriptions
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to load subscription", e))?;

        Ok(Entitlement {
            user_id: user_id.clone(),
            unlocked_movies: unlocks
                .iter()
                .map(|u| MovieId::from_uuid(u.movie_id))
                .collect::<BTreeSet<_>>(),
            subscription: subscription.as_ref().map(Subscription::try_from).transpose()?,
            updated_at: last_touched(&unlocks, subscription.as_ref()),
        })
    }

    async fn grant_movie(&self, user_id: &UserId, movie_id: &MovieId) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_movie_unlocks (user_id, movie_id, unlocked_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, movie_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(movie_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to grant movie", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_movie(
        &self,
        user_id: &UserId,
        movie_id: &MovieId,
    ) -> Result<bool, DomainError> {
        let result =
            sqlx::query("DELETE FROM user_movie_unlocks WHERE user_id = $1 AND movie_id = $2")
                .bind(user_id.as_str())
                .bind(movie_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("Failed to revoke movie", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_subscription(
        &self,
        user_id: &UserId,
        subscription: &Subscription,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_subscriptions (
                user_id, plan, status, start_date, end_date, auto_renew, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                plan = EXCLUDED.plan,
                status = EXCLUDED.status,
                start_date = EXCLUDED.start_date,
                end_date = EXCLUDED.end_date,
                auto_renew = EXCLUDED.auto_renew,
                updated_at = EXCLUDED.updated_at
            WHERE user_subscriptions.start_date < EXCLUDED.start_date
            "#,
        )
        .bind(user_id.as_str())
        .bind(subscription.plan.as_str())
        .bind(subscription.status.as_str())
        .bind(subscription.start_date.as_datetime())
        .bind(subscription.end_date.as_datetime())
        .bind(subscription.auto_renew)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(result.rows_affected() == 1)
    }

    async fn cancel_subscription(
        &self,
        user_id: &UserId,
        plan: SubscriptionPlan,
    ) -> Result<bool, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE user_subscriptions
            SET status = 'cancelled', auto_renew = FALSE, updated_at = NOW()
            WHERE user_id = $1 AND plan = $2 AND status <> 'cancelled'
            "#,
        )
        .bind(user_id.as_str())
        .bind(plan.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to cancel subscription", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::SubscriptionStatus;

    fn sub_row() -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            plan: "vip".to_string(),
            status: "active".to_string(),
            start_date: now,
            end_date: now + chrono::Duration::days(30),
            auto_renew: false,
            updated_at: now,
        }
    }

    #[test]
    fn subscription_row_converts() {
        let sub = Subscription::try_from(&sub_row()).unwrap();
        assert_eq!(sub.plan, SubscriptionPlan::Vip);
        assert_eq!(sub.status, SubscriptionStatus::Active);
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let mut row = sub_row();
        row.plan = "platinum".to_string();
        assert!(Subscription::try_from(&row).is_err());
    }

    #[test]
    fn last_touched_picks_latest_write() {
        let old = Utc::now() - chrono::Duration::days(3);
        let new = Utc::now() - chrono::Duration::days(1);
        let unlocks = vec![UnlockRow {
            movie_id: Uuid::new_v4(),
            unlocked_at: old,
        }];
        let mut sub = sub_row();
        sub.updated_at = new;
        assert_eq!(last_touched(&unlocks, Some(&sub)), Timestamp::from_datetime(new));
        assert_eq!(last_touched(&unlocks, None), Timestamp::from_datetime(old));
    }
}
