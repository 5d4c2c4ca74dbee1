//! Order lifecycle service: the state machine wired to settlement.
//!
//! Confirm and cancel are plain status transitions. Complete is the one
//! transition that moves money: it charges the rider's wallet in favor of
//! the owning company under the deterministic key
//! `complete-order-{order_id}`, and the status flip to `Completed` rides in
//! the same atomic commit as the payment. A failed charge leaves the order
//! untouched; a repeated completion replays the recorded payment and
//! succeeds without charging again.

use chrono::Utc;
use serde_json::json;

use marketpay_core::{LedgerError, LedgerResult, OrderId};
use marketpay_orders::{CompletionDecision, Order};
use marketpay_wallet::{order_completion_key, TransferRequest, TxType, WalletOwner};

use crate::engine::{map_store_error, TransferEngine, TransferReceipt};
use crate::store::{CoupledEffect, LedgerStore, OrderStore};

/// Result of `complete`: the order in its final state and the payment that
/// settled it (replayed on idempotent re-completion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCompletion {
    pub order: Order,
    pub receipt: TransferReceipt,
}

/// Drives orders through their lifecycle against a shared store.
pub struct OrderLifecycle<S> {
    engine: TransferEngine<S>,
}

impl<S: LedgerStore + OrderStore> OrderLifecycle<S> {
    pub fn new(store: S) -> Self {
        Self {
            engine: TransferEngine::new(store),
        }
    }

    fn store(&self) -> &S {
        self.engine.store()
    }

    /// Record a freshly-placed order (used by the out-of-scope placement
    /// flow and by tests).
    pub fn place(&self, order: Order) -> LedgerResult<Order> {
        self.store()
            .insert_order(order.clone())
            .map_err(map_store_error)?;
        Ok(order)
    }

    pub fn get(&self, order_id: OrderId) -> LedgerResult<Order> {
        self.store()
            .get_order(order_id)
            .map_err(map_store_error)?
            .ok_or_else(LedgerError::not_found)
    }

    /// `Pending → InProgress`.
    pub fn confirm(&self, order_id: OrderId) -> LedgerResult<Order> {
        let mut order = self.get(order_id)?;
        order.confirm(Utc::now())?;
        self.store().update_order(&order).map_err(map_store_error)?;
        Ok(order)
    }

    /// `Pending|InProgress → Cancelled`.
    pub fn cancel(&self, order_id: OrderId) -> LedgerResult<Order> {
        let mut order = self.get(order_id)?;
        order.cancel(Utc::now())?;
        self.store().update_order(&order).map_err(map_store_error)?;
        Ok(order)
    }

    /// Complete the order, collecting `price_cents` from the rider's wallet
    /// into the company's wallet.
    ///
    /// Payment and the `Completed` status commit as one unit: on
    /// `InsufficientFunds` the order stays in its prior state and no ledger
    /// entry is created.
    pub fn complete(&self, order_id: OrderId) -> LedgerResult<OrderCompletion> {
        let order = self.get(order_id)?;
        let key = order_completion_key(order.id);

        match order.completion_decision()? {
            CompletionDecision::AlreadyCompleted => {
                // Idempotent success — but only if the ledger agrees that the
                // charge was recorded. Status alone is not trusted.
                let entry = self
                    .store()
                    .find_by_idempotency_key(&key)
                    .map_err(map_store_error)?
                    .ok_or_else(|| {
                        LedgerError::internal(format!(
                            "order {order_id} is completed but has no recorded payment"
                        ))
                    })?;
                let receipt = self.engine.execute(TransferRequest {
                    from: Some(WalletOwner::Rider(order.rider_user_id)),
                    to: Some(WalletOwner::Company(order.company_id)),
                    amount_cents: entry.amount_cents,
                    tx_type: TxType::OrderPayment,
                    idempotency_key: Some(key),
                    ref_id: Some(order.id.to_string()),
                    metadata: json!({}),
                })?;
                debug_assert!(receipt.replayed);
                Ok(OrderCompletion { order, receipt })
            }
            CompletionDecision::ChargeRider => {
                let receipt = self.engine.execute_with_effect(
                    TransferRequest {
                        from: Some(WalletOwner::Rider(order.rider_user_id)),
                        to: Some(WalletOwner::Company(order.company_id)),
                        amount_cents: order.price_cents,
                        tx_type: TxType::OrderPayment,
                        idempotency_key: Some(key),
                        ref_id: Some(order.id.to_string()),
                        metadata: json!({}),
                    },
                    Some(CoupledEffect::CompleteOrder(order.id)),
                )?;

                if receipt.replayed {
                    // The charge landed in an earlier attempt whose status
                    // flip we can no longer assume: reconcile the order to
                    // match the ledger.
                    let mut current = self.get(order_id)?;
                    if !current.status.is_terminal() {
                        current.mark_completed(Utc::now());
                        self.store()
                            .update_order(&current)
                            .map_err(map_store_error)?;
                    }
                }

                let order = self.get(order_id)?;
                Ok(OrderCompletion { order, receipt })
            }
        }
    }
}
