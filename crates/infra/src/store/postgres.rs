//! Postgres-backed settlement store.
//!
//! Persists wallets, the ledger, orders and membership state in PostgreSQL,
//! with the core's storage constraints enforced at the database level:
//!
//! - wallet uniqueness per owner identity: `UNIQUE (owner_kind, owner_ref)`;
//!   racing creators converge via `INSERT ... ON CONFLICT DO NOTHING` + read
//! - idempotency-key uniqueness among completed entries: a partial unique
//!   index, so two concurrent commits of the same key cannot both land
//! - lost-update prevention: wallet rows are locked with
//!   `SELECT ... FOR UPDATE` (in deterministic id order) for the duration of
//!   the commit transaction
//! - balance non-negativity and positive amounts: `CHECK` constraints as a
//!   second line of defense behind the in-transaction checks
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | PostgreSQL error | StoreError | Scenario |
//! |------------------|------------|----------|
//! | `23505` on the partial key index | `DuplicateIdempotencyKey` | Concurrent commit of the same logical operation |
//! | `23505` elsewhere / `23514` | `Internal` | Constraint violation the checks should have caught |
//! | `40001` / `40P01` | `Conflict` | Serialization failure / deadlock; retried by the engine |
//! | Other | `Internal` | Network, pool, unexpected database errors |
//!
//! ## Runtime Bridge
//!
//! The store traits are synchronous; Postgres operations are async. Like the
//! rest of the workspace's sqlx usage this bridges through
//! `tokio::runtime::Handle::block_on`, which works when called from within a
//! tokio runtime context.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use marketpay_core::{CompanyId, OrderId, Page, ServiceId, TxId, UserId, WalletId};
use marketpay_orders::{Order, OrderStatus};
use marketpay_parties::MembershipState;
use marketpay_settlement::{
    CommittedTransfer, CoupledEffect, LedgerStore, OrderStore, StoreError, TransferPlan,
};
use marketpay_wallet::{LedgerEntry, TxStatus, TxType, Wallet, WalletOwner};

/// Postgres-backed implementation of `LedgerStore` + `OrderStore`.
#[derive(Debug, Clone)]
pub struct PostgresSettlementStore {
    pool: Arc<PgPool>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS wallets (
    id UUID PRIMARY KEY,
    owner_kind TEXT NOT NULL,
    owner_ref UUID NOT NULL,
    balance_cents BIGINT NOT NULL CHECK (balance_cents >= 0),
    low_balance_threshold BIGINT NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL,
    UNIQUE (owner_kind, owner_ref)
);

CREATE TABLE IF NOT EXISTS ledger_entries (
    id UUID PRIMARY KEY,
    from_wallet_id UUID REFERENCES wallets (id),
    to_wallet_id UUID REFERENCES wallets (id),
    amount_cents BIGINT NOT NULL CHECK (amount_cents > 0),
    status TEXT NOT NULL,
    tx_type TEXT NOT NULL,
    idempotency_key TEXT,
    ref_id TEXT,
    metadata JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    CHECK (from_wallet_id IS NOT NULL OR to_wallet_id IS NOT NULL)
);

CREATE UNIQUE INDEX IF NOT EXISTS ledger_entries_completed_key
    ON ledger_entries (idempotency_key)
    WHERE status = 'completed' AND idempotency_key IS NOT NULL;

CREATE INDEX IF NOT EXISTS ledger_entries_from_wallet
    ON ledger_entries (from_wallet_id, created_at DESC);

CREATE INDEX IF NOT EXISTS ledger_entries_to_wallet
    ON ledger_entries (to_wallet_id, created_at DESC);

CREATE TABLE IF NOT EXISTS orders (
    id UUID PRIMARY KEY,
    rider_user_id UUID NOT NULL,
    company_id UUID NOT NULL,
    service_id UUID NOT NULL,
    price_cents BIGINT NOT NULL CHECK (price_cents > 0),
    status TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL
);

CREATE TABLE IF NOT EXISTS memberships (
    company_id UUID PRIMARY KEY,
    plan TEXT NOT NULL,
    expires_at TIMESTAMPTZ
);
"#;

impl PostgresSettlementStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the settlement tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("migrate", e))?;
        }
        tx.commit().await.map_err(|e| map_sqlx_error("migrate", e))
    }

    #[instrument(skip(self), fields(owner = %owner), err)]
    async fn get_or_create_wallet_async(&self, owner: WalletOwner) -> Result<Wallet, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("get_or_create_wallet", e))?;
        let wallet = upsert_wallet(&mut tx, owner, false).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("get_or_create_wallet", e))?;
        Ok(wallet)
    }

    async fn get_wallet_async(&self, wallet_id: WalletId) -> Result<Option<Wallet>, StoreError> {
        let row: Option<WalletRow> = sqlx::query_as(
            r#"
            SELECT id, owner_kind, owner_ref, balance_cents, low_balance_threshold, updated_at
            FROM wallets
            WHERE id = $1
            "#,
        )
        .bind(wallet_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_wallet", e))?;

        row.map(Wallet::try_from).transpose()
    }

    async fn find_by_idempotency_key_async(
        &self,
        key: &str,
    ) -> Result<Option<LedgerEntry>, StoreError> {
        let row: Option<LedgerEntryRow> = sqlx::query_as(
            r#"
            SELECT id, from_wallet_id, to_wallet_id, amount_cents, status, tx_type,
                   idempotency_key, ref_id, metadata, created_at
            FROM ledger_entries
            WHERE idempotency_key = $1 AND status = 'completed'
            "#,
        )
        .bind(key)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_by_idempotency_key", e))?;

        row.map(LedgerEntry::try_from).transpose()
    }

    #[instrument(
        skip(self, plan, effect),
        fields(tx_type = plan.tx_type.as_str(), amount_cents = plan.amount_cents),
        err
    )]
    async fn commit_transfer_async(
        &self,
        plan: TransferPlan,
        effect: Option<CoupledEffect>,
    ) -> Result<CommittedTransfer, StoreError> {
        let now = Utc::now();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("commit_transfer", e))?;

        // Resolve both endpoint wallets, locking their rows for the rest of
        // the transaction. Deterministic lock order avoids AB/BA deadlocks.
        let mut endpoints: Vec<WalletOwner> = plan.from.into_iter().chain(plan.to).collect();
        endpoints.sort_by_key(|o| (o.kind().as_str(), o.ref_uuid()));

        let mut from_wallet: Option<Wallet> = None;
        let mut to_wallet: Option<Wallet> = None;
        for owner in endpoints {
            let wallet = upsert_wallet(&mut tx, owner, true).await?;
            if plan.from == Some(owner) {
                from_wallet = Some(wallet.clone());
            }
            if plan.to == Some(owner) {
                to_wallet = Some(wallet);
            }
        }

        // Debit sufficiency under the row lock.
        if let Some(wallet) = from_wallet.as_mut() {
            if wallet.balance_cents < plan.amount_cents {
                return Err(StoreError::InsufficientFunds {
                    balance_cents: wallet.balance_cents,
                    requested_cents: plan.amount_cents,
                });
            }
            wallet.balance_cents -= plan.amount_cents;
            wallet.updated_at = now;
            apply_delta(&mut tx, wallet.id, -plan.amount_cents, now).await?;
        }
        if let Some(wallet) = to_wallet.as_mut() {
            wallet.balance_cents += plan.amount_cents;
            wallet.updated_at = now;
            apply_delta(&mut tx, wallet.id, plan.amount_cents, now).await?;
        }

        // Append the entry. The partial unique index is the authoritative
        // idempotency-key check: a concurrent duplicate fails right here and
        // rolls the whole transaction back.
        let entry = LedgerEntry {
            id: TxId::new(),
            from_wallet_id: from_wallet.as_ref().map(|w| w.id),
            to_wallet_id: to_wallet.as_ref().map(|w| w.id),
            amount_cents: plan.amount_cents,
            status: TxStatus::Completed,
            tx_type: plan.tx_type,
            idempotency_key: plan.idempotency_key,
            ref_id: plan.ref_id,
            metadata: plan.metadata,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, from_wallet_id, to_wallet_id, amount_cents, status, tx_type,
                idempotency_key, ref_id, metadata, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.from_wallet_id.map(|id| *id.as_uuid()))
        .bind(entry.to_wallet_id.map(|id| *id.as_uuid()))
        .bind(entry.amount_cents)
        .bind(entry.status.as_str())
        .bind(entry.tx_type.as_str())
        .bind(entry.idempotency_key.as_deref())
        .bind(entry.ref_id.as_deref())
        .bind(&entry.metadata)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                match entry.idempotency_key.clone() {
                    Some(key) => StoreError::DuplicateIdempotencyKey(key),
                    None => map_sqlx_error("insert_ledger_entry", e),
                }
            } else {
                map_sqlx_error("insert_ledger_entry", e)
            }
        })?;

        match effect {
            Some(CoupledEffect::CompleteOrder(order_id)) => {
                let updated = sqlx::query(
                    r#"
                    UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1
                    "#,
                )
                .bind(order_id.as_uuid())
                .bind(OrderStatus::Completed.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("complete_order", e))?
                .rows_affected();

                if updated == 0 {
                    return Err(StoreError::NotFound(format!("order {order_id}")));
                }
            }
            Some(CoupledEffect::ExtendMembership {
                company_id,
                plan: plan_name,
            }) => {
                let row: Option<MembershipRow> = sqlx::query_as(
                    r#"
                    SELECT company_id, plan, expires_at FROM memberships
                    WHERE company_id = $1
                    FOR UPDATE
                    "#,
                )
                .bind(company_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("load_membership", e))?;

                let mut membership = row
                    .map(|r| MembershipState {
                        plan: r.plan,
                        expires_at: r.expires_at,
                    })
                    .unwrap_or_else(MembershipState::free);
                membership.renew(plan_name, now);

                sqlx::query(
                    r#"
                    INSERT INTO memberships (company_id, plan, expires_at)
                    VALUES ($1, $2, $3)
                    ON CONFLICT (company_id)
                    DO UPDATE SET plan = EXCLUDED.plan, expires_at = EXCLUDED.expires_at
                    "#,
                )
                .bind(company_id.as_uuid())
                .bind(&membership.plan)
                .bind(membership.expires_at)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("extend_membership", e))?;
            }
            None => {}
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transfer", e))?;

        Ok(CommittedTransfer {
            entry,
            from_wallet,
            to_wallet,
        })
    }

    async fn list_by_wallet_async(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> Result<Page<LedgerEntry>, StoreError> {
        let page = page.max(1);
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM ledger_entries
            WHERE from_wallet_id = $1 OR to_wallet_id = $1
            "#,
        )
        .bind(wallet_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_wallet", e))?;

        let rows: Vec<LedgerEntryRow> = sqlx::query_as(
            r#"
            SELECT id, from_wallet_id, to_wallet_id, amount_cents, status, tx_type,
                   idempotency_key, ref_id, metadata, created_at
            FROM ledger_entries
            WHERE from_wallet_id = $1 OR to_wallet_id = $1
            ORDER BY created_at DESC, id DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(wallet_id.as_uuid())
        .bind(((page - 1) * size) as i64)
        .bind(size as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_by_wallet", e))?;

        let items = rows
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let total_items = total as usize;
        let total_pages = if size == 0 {
            0
        } else {
            total_items.div_ceil(size)
        };
        Ok(Page {
            page,
            size,
            total_items,
            total_pages,
            has_next: page * size < total_items,
            has_prev: page > 1 && total_items > 0,
            items,
        })
    }

    async fn membership_async(
        &self,
        company_id: CompanyId,
    ) -> Result<Option<MembershipState>, StoreError> {
        let row: Option<MembershipRow> = sqlx::query_as(
            r#"
            SELECT company_id, plan, expires_at FROM memberships WHERE company_id = $1
            "#,
        )
        .bind(company_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("membership", e))?;

        Ok(row.map(|r| MembershipState {
            plan: r.plan,
            expires_at: r.expires_at,
        }))
    }

    async fn insert_order_async(&self, order: Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (
                id, rider_user_id, company_id, service_id, price_cents, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.rider_user_id.as_uuid())
        .bind(order.company_id.as_uuid())
        .bind(order.service_id.as_uuid())
        .bind(order.price_cents)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;
        Ok(())
    }

    async fn get_order_async(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, rider_user_id, company_id, service_id, price_cents, status,
                   created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_order", e))?;

        row.map(Order::try_from).transpose()
    }

    async fn update_order_async(&self, order: &Order) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_order", e))?
        .rows_affected();

        if updated == 0 {
            return Err(StoreError::NotFound(format!("order {}", order.id)));
        }
        Ok(())
    }
}

/// Insert-if-absent + (optionally locked) read of one wallet row.
///
/// `ON CONFLICT DO NOTHING` resolves creation races: the loser's insert is a
/// no-op and the following select reads the winner's row.
async fn upsert_wallet(
    tx: &mut Transaction<'_, Postgres>,
    owner: WalletOwner,
    lock: bool,
) -> Result<Wallet, StoreError> {
    let fresh = Wallet::open(owner, Utc::now());
    sqlx::query(
        r#"
        INSERT INTO wallets (id, owner_kind, owner_ref, balance_cents, low_balance_threshold, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (owner_kind, owner_ref) DO NOTHING
        "#,
    )
    .bind(fresh.id.as_uuid())
    .bind(owner.kind().as_str())
    .bind(owner.ref_uuid())
    .bind(fresh.balance_cents)
    .bind(fresh.low_balance_threshold)
    .bind(fresh.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("upsert_wallet", e))?;

    let query = if lock {
        r#"
        SELECT id, owner_kind, owner_ref, balance_cents, low_balance_threshold, updated_at
        FROM wallets
        WHERE owner_kind = $1 AND owner_ref = $2
        FOR UPDATE
        "#
    } else {
        r#"
        SELECT id, owner_kind, owner_ref, balance_cents, low_balance_threshold, updated_at
        FROM wallets
        WHERE owner_kind = $1 AND owner_ref = $2
        "#
    };

    let row: WalletRow = sqlx::query_as(query)
        .bind(owner.kind().as_str())
        .bind(owner.ref_uuid())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_wallet", e))?;

    Wallet::try_from(row)
}

async fn apply_delta(
    tx: &mut Transaction<'_, Postgres>,
    wallet_id: WalletId,
    delta_cents: i64,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE wallets SET balance_cents = balance_cents + $2, updated_at = $3 WHERE id = $1
        "#,
    )
    .bind(wallet_id.as_uuid())
    .bind(delta_cents)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("apply_delta", e))?;
    Ok(())
}

impl LedgerStore for PostgresSettlementStore {
    fn get_or_create_wallet(&self, owner: WalletOwner) -> Result<Wallet, StoreError> {
        block_on(self.get_or_create_wallet_async(owner))
    }

    fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>, StoreError> {
        block_on(self.get_wallet_async(wallet_id))
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>, StoreError> {
        block_on(self.find_by_idempotency_key_async(key))
    }

    fn commit_transfer(
        &self,
        plan: TransferPlan,
        effect: Option<CoupledEffect>,
    ) -> Result<CommittedTransfer, StoreError> {
        block_on(self.commit_transfer_async(plan, effect))
    }

    fn list_by_wallet(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> Result<Page<LedgerEntry>, StoreError> {
        block_on(self.list_by_wallet_async(wallet_id, page, size))
    }

    fn membership(&self, company_id: CompanyId) -> Result<Option<MembershipState>, StoreError> {
        block_on(self.membership_async(company_id))
    }
}

impl OrderStore for PostgresSettlementStore {
    fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        block_on(self.insert_order_async(order))
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        block_on(self.get_order_async(order_id))
    }

    fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        block_on(self.update_order_async(order))
    }
}

/// Run an async store operation from the synchronous trait surface.
///
/// Requires a current tokio runtime (the stores are called from request
/// handlers that already run inside one).
fn block_on<F, T>(fut: F) -> Result<T, StoreError>
where
    F: std::future::Future<Output = Result<T, StoreError>>,
{
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Internal(
            "PostgresSettlementStore requires a tokio runtime context".to_string(),
        )
    })?;
    handle.block_on(fut)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                _ => StoreError::Internal(msg),
            }
        }
        other => StoreError::Internal(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

// SQLx row types

#[derive(Debug, FromRow)]
struct WalletRow {
    id: Uuid,
    owner_kind: String,
    owner_ref: Uuid,
    balance_cents: i64,
    low_balance_threshold: i64,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WalletRow> for Wallet {
    type Error = StoreError;

    fn try_from(row: WalletRow) -> Result<Self, Self::Error> {
        let owner = owner_from_parts(&row.owner_kind, row.owner_ref)?;
        Ok(Wallet {
            id: WalletId::from_uuid(row.id),
            owner,
            balance_cents: row.balance_cents,
            low_balance_threshold: row.low_balance_threshold,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LedgerEntryRow {
    id: Uuid,
    from_wallet_id: Option<Uuid>,
    to_wallet_id: Option<Uuid>,
    amount_cents: i64,
    status: String,
    tx_type: String,
    idempotency_key: Option<String>,
    ref_id: Option<String>,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        Ok(LedgerEntry {
            id: TxId::from_uuid(row.id),
            from_wallet_id: row.from_wallet_id.map(WalletId::from_uuid),
            to_wallet_id: row.to_wallet_id.map(WalletId::from_uuid),
            amount_cents: row.amount_cents,
            status: parse_tx_status(&row.status)?,
            tx_type: parse_tx_type(&row.tx_type)?,
            idempotency_key: row.idempotency_key,
            ref_id: row.ref_id,
            metadata: row.metadata,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct MembershipRow {
    #[allow(dead_code)]
    company_id: Uuid,
    plan: String,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    rider_user_id: Uuid,
    company_id: Uuid,
    service_id: Uuid,
    price_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            rider_user_id: UserId::from_uuid(row.rider_user_id),
            company_id: CompanyId::from_uuid(row.company_id),
            service_id: ServiceId::from_uuid(row.service_id),
            price_cents: row.price_cents,
            status: parse_order_status(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn owner_from_parts(kind: &str, owner_ref: Uuid) -> Result<WalletOwner, StoreError> {
    match kind {
        "company" => Ok(WalletOwner::Company(CompanyId::from_uuid(owner_ref))),
        "driver" => Ok(WalletOwner::Driver(UserId::from_uuid(owner_ref))),
        "rider" => Ok(WalletOwner::Rider(UserId::from_uuid(owner_ref))),
        "platform" => Ok(WalletOwner::Platform),
        other => Err(StoreError::Internal(format!(
            "unknown wallet owner kind: {other}"
        ))),
    }
}

fn parse_tx_type(value: &str) -> Result<TxType, StoreError> {
    match value {
        "topup" => Ok(TxType::Topup),
        "withdraw" => Ok(TxType::Withdraw),
        "pay_salary" => Ok(TxType::PaySalary),
        "pay_membership" => Ok(TxType::PayMembership),
        "order_payment" => Ok(TxType::OrderPayment),
        other => Err(StoreError::Internal(format!(
            "unknown transaction type: {other}"
        ))),
    }
}

fn parse_tx_status(value: &str) -> Result<TxStatus, StoreError> {
    match value {
        "completed" => Ok(TxStatus::Completed),
        "failed" => Ok(TxStatus::Failed),
        other => Err(StoreError::Internal(format!(
            "unknown transaction status: {other}"
        ))),
    }
}

fn parse_order_status(value: &str) -> Result<OrderStatus, StoreError> {
    match value {
        "pending" => Ok(OrderStatus::Pending),
        "in_progress" => Ok(OrderStatus::InProgress),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(StoreError::Internal(format!(
            "unknown order status: {other}"
        ))),
    }
}
