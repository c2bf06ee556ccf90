//! PostgreSQL implementation of TransactionLedger.
//!
//! Every state change is one conditional `UPDATE ... WHERE status = <expected>
//! RETURNING`. When the update matches nothing the row is re-read to tell a
//! replay (already in the target state) from an illegal transition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    Currency, DomainError, ErrorCode, Money, MovieId, Timestamp, TransactionId, UserId,
};
use crate::domain::purchase::{
    LedgerSummary, PurchaseSubject, RefundRecord, Transaction, TransactionStatus, TxRef,
    VerifiedPayment,
};
use crate::ports::TransactionLedger;

const TX_REF_CONSTRAINT: &str = "transactions_tx_ref_key";

const SELECT_COLUMNS: &str = r#"
    id, user_id, subject_type, subject_id, amount_cents, currency, tx_ref, status,
    created_at, updated_at, completed_at, gateway_reference,
    refunded_at, refund_reason, refunded_by
"#;

pub struct PostgresTransactionLedger {
    pool: PgPool,
}

impl PostgresTransactionLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, DomainError> {
        let row: Option<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE tx_ref = $1",
            SELECT_COLUMNS
        ))
        .bind(tx_ref.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to fetch transaction", e))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn fetch_existing(&self, tx_ref: &TxRef) -> Result<Transaction, DomainError> {
        self.fetch(tx_ref).await?.ok_or_else(|| not_found(tx_ref))
    }
}

/// Database row representation of a ledger entry.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    user_id: String,
    subject_type: String,
    subject_id: String,
    amount_cents: i64,
    currency: String,
    tx_ref: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    gateway_reference: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    refund_reason: Option<String>,
    refunded_by: Option<String>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DomainError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let subject = parse_subject(&row.subject_type, &row.subject_id)?;
        let currency = Currency::new(&row.currency).map_err(corrupt)?;
        let amount = Money::new(row.amount_cents, currency).map_err(corrupt)?;
        let status: TransactionStatus = row.status.parse().map_err(corrupt)?;

        let refund = match (row.refunded_at, row.refund_reason, row.refunded_by) {
            (Some(at), Some(reason), Some(by)) => Some(RefundRecord {
                refunded_at: Timestamp::from_datetime(at),
                reason,
                refunded_by: UserId::new(by).map_err(corrupt)?,
            }),
            _ => None,
        };

        Ok(Transaction {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::new(row.user_id).map_err(corrupt)?,
            subject,
            amount,
            tx_ref: TxRef::try_from(row.tx_ref).map_err(corrupt)?,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            completed_at: row.completed_at.map(Timestamp::from_datetime),
            gateway_reference: row.gateway_reference,
            refund,
        })
    }
}

fn parse_subject(subject_type: &str, subject_id: &str) -> Result<PurchaseSubject, DomainError> {
    match subject_type {
        "movie" => subject_id
            .parse::<MovieId>()
            .map(PurchaseSubject::Movie)
            .map_err(|_| {
                DomainError::database(format!("Invalid movie subject_id: {}", subject_id))
            }),
        "subscription" => subject_id
            .parse()
            .map(PurchaseSubject::Subscription)
            .map_err(corrupt),
        other => Err(DomainError::database(format!(
            "Invalid subject_type value: {}",
            other
        ))),
    }
}

fn corrupt(e: impl std::fmt::Display) -> DomainError {
    DomainError::database(format!("Corrupt transaction row: {}", e))
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn not_found(tx_ref: &TxRef) -> DomainError {
    DomainError::new(
        ErrorCode::TransactionNotFound,
        format!("Transaction not found: {}", tx_ref),
    )
    .with_detail("tx_ref", tx_ref.as_str())
}

fn illegal_transition(tx: &Transaction, target: TransactionStatus) -> DomainError {
    DomainError::new(
        ErrorCode::InvalidStateTransition,
        format!(
            "Cannot transition transaction {} from {} to {}",
            tx.tx_ref, tx.status, target
        ),
    )
    .with_detail("tx_ref", tx.tx_ref.as_str())
}

#[async_trait]
impl TransactionLedger for PostgresTransactionLedger {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, user_id, subject_type, subject_id, amount_cents, currency,
                tx_ref, status, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.user_id.as_str())
        .bind(transaction.subject.subject_type().as_str())
        .bind(transaction.subject.subject_id())
        .bind(transaction.amount.amount_cents)
        .bind(transaction.amount.currency.as_str())
        .bind(transaction.tx_ref.as_str())
        .bind(transaction.status.as_str())
        .bind(transaction.created_at.as_datetime())
        .bind(transaction.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some(TX_REF_CONSTRAINT) {
                    return DomainError::new(
                        ErrorCode::DuplicateReference,
                        format!("tx_ref already exists: {}", transaction.tx_ref),
                    )
                    .with_detail("tx_ref", transaction.tx_ref.as_str());
                }
            }
            db_error("Failed to insert transaction", e)
        })?;

        Ok(transaction.clone())
    }

    async fn find_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, DomainError> {
        self.fetch(tx_ref).await
    }

    async fn mark_completed(
        &self,
        tx_ref: &TxRef,
        payment: &VerifiedPayment,
    ) -> Result<Transaction, DomainError> {
        let now = Timestamp::now();
        let completed_at = payment.paid_at.unwrap_or(now);

        let updated: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions
            SET status = 'completed', completed_at = $2, gateway_reference = $3, updated_at = $4
            WHERE tx_ref = $1 AND status = 'pending'
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(tx_ref.as_str())
        .bind(completed_at.as_datetime())
        .bind(&payment.gateway_reference)
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to complete transaction", e))?;

        if let Some(row) = updated {
            return Transaction::try_from(row);
        }

        let existing = self.fetch_existing(tx_ref).await?;
        match existing.status {
            TransactionStatus::Completed | TransactionStatus::Refunded => Ok(existing),
            _ => Err(illegal_transition(&existing, TransactionStatus::Completed)),
        }
    }

    async fn mark_failed(&self, tx_ref: &TxRef) -> Result<Transaction, DomainError> {
        let updated: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions
            SET status = 'failed', updated_at = $2
            WHERE tx_ref = $1 AND status = 'pending'
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(tx_ref.as_str())
        .bind(Timestamp::now().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to mark transaction failed", e))?;

        match updated {
            Some(row) => Transaction::try_from(row),
            None => self.fetch_existing(tx_ref).await,
        }
    }

    async fn mark_refunded(
        &self,
        tx_ref: &TxRef,
        reason: &str,
        actor: &UserId,
    ) -> Result<Transaction, DomainError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(DomainError::validation("reason", "Refund reason is required"));
        }
        let now = Timestamp::now();

        let updated: Option<TransactionRow> = sqlx::query_as(&format!(
            r#"
            UPDATE transactions
            SET status = 'refunded', refunded_at = $2, refund_reason = $3,
                refunded_by = $4, updated_at = $2
            WHERE tx_ref = $1 AND status = 'completed'
            RETURNING {}
            "#,
            SELECT_COLUMNS
        ))
        .bind(tx_ref.as_str())
        .bind(now.as_datetime())
        .bind(reason)
        .bind(actor.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to refund transaction", e))?;

        match updated {
            Some(row) => Transaction::try_from(row),
            None => {
                let existing = self.fetch_existing(tx_ref).await?;
                Err(illegal_transition(&existing, TransactionStatus::Refunded))
            }
        }
    }

    async fn delete_pending(&self, tx_ref: &TxRef) -> Result<bool, DomainError> {
        let sql = "DELETE FROM transactions WHERE tx_ref = $1 AND status = 'pending'";
        let result = sqlx::query(sql)
            .bind(tx_ref.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete pending transaction", e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list transactions", e))?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn summarize(&self, since: Option<Timestamp>) -> Result<LedgerSummary, DomainError> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT {} FROM transactions WHERE ($1::timestamptz IS NULL OR created_at >= $1)",
            SELECT_COLUMNS
        ))
        .bind(since.map(|s| *s.as_datetime()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to summarize transactions", e))?;

        let transactions = rows
            .into_iter()
            .map(Transaction::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LedgerSummary::from_transactions(&transactions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entitlement::SubscriptionPlan;

    fn row() -> TransactionRow {
        let now = Utc::now();
        TransactionRow {
            id: Uuid::new_v4(),
            user_id: "viewer-1".to_string(),
            subject_type: "movie".to_string(),
            subject_id: Uuid::new_v4().to_string(),
            amount_cents: 999,
            currency: "ETB".to_string(),
            tx_ref: "tx_1700000000000_abcdefghijkl".to_string(),
            status: "completed".to_string(),
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
            gateway_reference: Some("CHK-1".to_string()),
            refunded_at: None,
            refund_reason: None,
            refunded_by: None,
        }
    }

    #[test]
    fn row_converts_to_transaction() {
        let tx = Transaction::try_from(row()).unwrap();
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.amount, Money::etb(999));
        assert!(matches!(tx.subject, PurchaseSubject::Movie(_)));
        assert!(tx.refund.is_none());
    }

    #[test]
    fn subscription_row_parses_plan() {
        let mut r = row();
        r.subject_type = "subscription".to_string();
        r.subject_id = "premium".to_string();
        let tx = Transaction::try_from(r).unwrap();
        assert_eq!(tx.subject, PurchaseSubject::Subscription(SubscriptionPlan::Premium));
    }

    #[test]
    fn refund_columns_build_record() {
        let mut r = row();
        r.status = "refunded".to_string();
        r.refunded_at = Some(Utc::now());
        r.refund_reason = Some("duplicate charge".to_string());
        r.refunded_by = Some("ops".to_string());
        let tx = Transaction::try_from(r).unwrap();
        assert_eq!(tx.refund.unwrap().reason, "duplicate charge");
    }

    #[test]
    fn unknown_status_is_database_error() {
        let mut r = row();
        r.status = "settled".to_string();
        let err = Transaction::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn bad_subject_is_database_error() {
        let mut r = row();
        r.subject_id = "not-a-uuid".to_string();
        assert_eq!(
            Transaction::try_from(r).unwrap_err().code,
            ErrorCode::DatabaseError
        );
    }
}
