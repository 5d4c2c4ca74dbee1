//! In-memory settlement store.
//!
//! Intended for tests/dev. A single `RwLock` guards the whole settlement
//! state, so every commit runs under the write lock: same-wallet operations
//! serialize their read-modify-write, and the balance mutations, the ledger
//! append and the coupled effect land as one indivisible unit. The
//! completed-key index is consulted inside the same critical section, which
//! makes idempotency-key uniqueness a storage-level constraint rather than
//! a check-then-insert race.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use marketpay_core::{CompanyId, OrderId, Page, TxId, UserId, WalletId};
use marketpay_orders::Order;
use marketpay_parties::{EmploymentRelation, MembershipState};
use marketpay_settlement::{
    CommittedTransfer, CoupledEffect, EmploymentDirectory, LedgerStore, OrderStore, StoreError,
    TransferPlan,
};
use marketpay_wallet::{LedgerEntry, TxStatus, Wallet, WalletOwner};

#[derive(Debug, Default)]
struct SettlementState {
    owners: HashMap<WalletOwner, WalletId>,
    wallets: HashMap<WalletId, Wallet>,
    /// Append-only, in commit order (i.e. chronological).
    ledger: Vec<LedgerEntry>,
    /// Uniqueness index over completed entries: key → position in `ledger`.
    completed_keys: HashMap<String, usize>,
    orders: HashMap<OrderId, Order>,
    memberships: HashMap<CompanyId, MembershipState>,
}

impl SettlementState {
    fn wallet_id_for(&mut self, owner: WalletOwner) -> WalletId {
        if let Some(id) = self.owners.get(&owner) {
            return *id;
        }
        let wallet = Wallet::open(owner, Utc::now());
        let id = wallet.id;
        self.owners.insert(owner, id);
        self.wallets.insert(id, wallet);
        id
    }

    fn balance_of(&self, owner: WalletOwner) -> i64 {
        self.owners
            .get(&owner)
            .and_then(|id| self.wallets.get(id))
            .map(|w| w.balance_cents)
            .unwrap_or(0)
    }

    fn apply_delta(&mut self, wallet_id: WalletId, delta_cents: i64, now: chrono::DateTime<Utc>) {
        if let Some(wallet) = self.wallets.get_mut(&wallet_id) {
            wallet.balance_cents += delta_cents;
            wallet.updated_at = now;
        }
    }
}

/// In-memory implementation of `LedgerStore` + `OrderStore`.
#[derive(Debug, Default)]
pub struct InMemorySettlementStore {
    state: RwLock<SettlementState>,
}

impl InMemorySettlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of ledger entries ever appended (test observability).
    pub fn ledger_len(&self) -> usize {
        self.state.read().map(|s| s.ledger.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Internal("lock poisoned".to_string())
}

impl LedgerStore for InMemorySettlementStore {
    fn get_or_create_wallet(&self, owner: WalletOwner) -> Result<Wallet, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let id = state.wallet_id_for(owner);
        Ok(state.wallets[&id].clone())
    }

    fn get_wallet(&self, wallet_id: WalletId) -> Result<Option<Wallet>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.wallets.get(&wallet_id).cloned())
    }

    fn find_by_idempotency_key(&self, key: &str) -> Result<Option<LedgerEntry>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .completed_keys
            .get(key)
            .map(|&idx| state.ledger[idx].clone()))
    }

    fn commit_transfer(
        &self,
        plan: TransferPlan,
        effect: Option<CoupledEffect>,
    ) -> Result<CommittedTransfer, StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        let now = Utc::now();

        // Constraint checks first; failure must leave no mutation behind.
        if let Some(key) = plan.idempotency_key.as_deref() {
            if state.completed_keys.contains_key(key) {
                return Err(StoreError::DuplicateIdempotencyKey(key.to_string()));
            }
        }

        if let Some(from) = plan.from {
            let balance = state.balance_of(from);
            if balance < plan.amount_cents {
                return Err(StoreError::InsufficientFunds {
                    balance_cents: balance,
                    requested_cents: plan.amount_cents,
                });
            }
        }

        if let Some(CoupledEffect::CompleteOrder(order_id)) = &effect {
            if !state.orders.contains_key(order_id) {
                return Err(StoreError::NotFound(format!("order {order_id}")));
            }
        }

        // Apply. Everything below is infallible.
        let from_id = plan.from.map(|owner| state.wallet_id_for(owner));
        let to_id = plan.to.map(|owner| state.wallet_id_for(owner));

        if let Some(id) = from_id {
            state.apply_delta(id, -plan.amount_cents, now);
        }
        if let Some(id) = to_id {
            state.apply_delta(id, plan.amount_cents, now);
        }

        let entry = LedgerEntry {
            id: TxId::new(),
            from_wallet_id: from_id,
            to_wallet_id: to_id,
            amount_cents: plan.amount_cents,
            status: TxStatus::Completed,
            tx_type: plan.tx_type,
            idempotency_key: plan.idempotency_key,
            ref_id: plan.ref_id,
            metadata: plan.metadata,
            created_at: now,
        };

        if let Some(key) = entry.idempotency_key.clone() {
            let ledger_index = state.ledger.len();
            state.completed_keys.insert(key, ledger_index);
        }
        state.ledger.push(entry.clone());

        match effect {
            Some(CoupledEffect::CompleteOrder(order_id)) => {
                if let Some(order) = state.orders.get_mut(&order_id) {
                    order.mark_completed(now);
                }
            }
            Some(CoupledEffect::ExtendMembership {
                company_id,
                plan: plan_name,
            }) => {
                state
                    .memberships
                    .entry(company_id)
                    .or_insert_with(MembershipState::free)
                    .renew(plan_name, now);
            }
            None => {}
        }

        Ok(CommittedTransfer {
            from_wallet: from_id.map(|id| state.wallets[&id].clone()),
            to_wallet: to_id.map(|id| state.wallets[&id].clone()),
            entry,
        })
    }

    fn list_by_wallet(
        &self,
        wallet_id: WalletId,
        page: usize,
        size: usize,
    ) -> Result<Page<LedgerEntry>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        // Ledger order is chronological; walk it backwards for newest-first.
        let involved: Vec<LedgerEntry> = state
            .ledger
            .iter()
            .rev()
            .filter(|e| e.involves(wallet_id))
            .cloned()
            .collect();
        Ok(Page::from_slice(&involved, page, size))
    }

    fn membership(&self, company_id: CompanyId) -> Result<Option<MembershipState>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.memberships.get(&company_id).cloned())
    }
}

impl OrderStore for InMemorySettlementStore {
    fn insert_order(&self, order: Order) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state.orders.contains_key(&order.id) {
            return Err(StoreError::Internal(format!(
                "order {} already exists",
                order.id
            )));
        }
        state.orders.insert(order.id, order);
        Ok(())
    }

    fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.orders.get(&order_id).cloned())
    }

    fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(poisoned)?;
        match state.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("order {}", order.id))),
        }
    }
}

/// In-memory employment-relation directory.
///
/// Stands in for the invitation/application subsystem that owns these
/// records in production.
#[derive(Debug, Default)]
pub struct InMemoryEmploymentDirectory {
    relations: RwLock<HashMap<(CompanyId, UserId), EmploymentRelation>>,
}

impl InMemoryEmploymentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an employment relation (what "accept invite" would produce).
    pub fn hire(&self, relation: EmploymentRelation) {
        if let Ok(mut relations) = self.relations.write() {
            relations.insert((relation.company_id, relation.driver_user_id), relation);
        }
    }
}

impl EmploymentDirectory for InMemoryEmploymentDirectory {
    fn is_employed(
        &self,
        company_id: CompanyId,
        driver_user_id: UserId,
    ) -> Result<bool, StoreError> {
        let relations = self.relations.read().map_err(poisoned)?;
        Ok(relations.contains_key(&(company_id, driver_user_id)))
    }
}
