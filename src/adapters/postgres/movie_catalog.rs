//! PostgreSQL implementation of MovieCatalog.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::catalog::{Movie, PlanOffer};
use crate::domain::entitlement::SubscriptionPlan;
use crate::domain::foundation::{Currency, DomainError, Money, MovieId};
use crate::ports::MovieCatalog;

pub struct PostgresMovieCatalog {
    pool: PgPool,
}

impl PostgresMovieCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    fee_cents: i64,
    currency: String,
}

impl TryFrom<MovieRow> for Movie {
    type Error = DomainError;

    fn try_from(row: MovieRow) -> Result<Self, Self::Error> {
        let fee = money(row.fee_cents, &row.currency)?;
        Ok(Movie::new(MovieId::from_uuid(row.id), row.title, fee))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PlanRow {
    plan: String,
    price_cents: i64,
    currency: String,
    duration_days: i32,
    is_active: bool,
}

impl TryFrom<PlanRow> for PlanOffer {
    type Error = DomainError;

    fn try_from(row: PlanRow) -> Result<Self, Self::Error> {
        let plan: SubscriptionPlan = row.plan.parse().map_err(corrupt)?;
        let duration_days = u32::try_from(row.duration_days).map_err(corrupt)?;
        Ok(PlanOffer {
            plan,
            price: money(row.price_cents, &row.currency)?,
            duration_days,
            is_active: row.is_active,
        })
    }
}

fn money(cents: i64, currency: &str) -> Result<Money, DomainError> {
    let currency = Currency::new(currency).map_err(corrupt)?;
    Money::new(cents, currency).map_err(corrupt)
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("Corrupt catalog row: {}", e))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

#[async_trait]
impl MovieCatalog for PostgresMovieCatalog {
    async fn find_movie(&self, movie_id: &MovieId) -> Result<Option<Movie>, DomainError> {
        let row: Option<MovieRow> =
            sqlx::query_as("SELECT id, title, fee_cents, currency FROM movies WHERE id = $1")
                .bind(movie_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to fetch movie", e))?;

        row.map(Movie::try_from).transpose()
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, DomainError> {
        let rows: Vec<MovieRow> =
            sqlx::query_as("SELECT id, title, fee_cents, currency FROM movies ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("Failed to list movies", e))?;

        rows.into_iter().map(Movie::try_from).collect()
    }

    async fn find_plan(&self, plan: SubscriptionPlan) -> Result<Option<PlanOffer>, DomainError> {
        let row: Option<PlanRow> = sqlx::query_as(
            r#"
            SELECT plan, price_cents, currency, duration_days, is_active
            FROM subscription_plans
            WHERE plan = $1
            "#,
        )
        .bind(plan.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch plan", e))?;

        row.map(PlanOffer::try_from).transpose()
    }
}
