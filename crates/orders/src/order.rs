//! Order lifecycle: `Pending → InProgress → Completed`, with cancellation
//! from either non-terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketpay_core::{CompanyId, Entity, LedgerError, LedgerResult, OrderId, ServiceId, UserId};

/// Order status lifecycle. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What completing an order requires next.
///
/// Completion is decided here but *applied* by the lifecycle service, because
/// the rider charge and the status flip must commit as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDecision {
    /// Order is already `Completed`; succeed without charging again.
    AlreadyCompleted,
    /// Charge the rider `price_cents` and mark the order `Completed`.
    ChargeRider,
}

/// An order placed by a rider against a company service.
///
/// Immutable once terminal; the price is fixed at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub rider_user_id: UserId,
    pub company_id: CompanyId,
    pub service_id: ServiceId,
    pub price_cents: i64,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Place a new `Pending` order.
    pub fn place(
        rider_user_id: UserId,
        company_id: CompanyId,
        service_id: ServiceId,
        price_cents: i64,
        now: DateTime<Utc>,
    ) -> LedgerResult<Self> {
        if price_cents <= 0 {
            return Err(LedgerError::InvalidAmount(price_cents));
        }
        Ok(Self {
            id: OrderId::new(),
            rider_user_id,
            company_id,
            service_id,
            price_cents,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// `Pending → InProgress`. Any other origin state is rejected with a
    /// message naming the conflict.
    pub fn confirm(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        match self.status {
            OrderStatus::Pending => {
                self.status = OrderStatus::InProgress;
                self.updated_at = now;
                Ok(())
            }
            OrderStatus::Completed => Err(LedgerError::invalid_state("order already completed")),
            OrderStatus::Cancelled => Err(LedgerError::invalid_state("order already cancelled")),
            OrderStatus::InProgress => Err(LedgerError::invalid_state(
                "order can only be confirmed while pending",
            )),
        }
    }

    /// Decide what completing this order requires.
    ///
    /// `Pending` is accepted directly (covers orders never routed through
    /// confirmation). A `Completed` order is an idempotent success; only a
    /// cancelled order is a hard failure.
    pub fn completion_decision(&self) -> LedgerResult<CompletionDecision> {
        match self.status {
            OrderStatus::Pending | OrderStatus::InProgress => Ok(CompletionDecision::ChargeRider),
            OrderStatus::Completed => Ok(CompletionDecision::AlreadyCompleted),
            OrderStatus::Cancelled => Err(LedgerError::invalid_state("order already cancelled")),
        }
    }

    /// Apply the `Completed` status. Only meaningful after the payment has
    /// committed; callers go through the lifecycle service.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = OrderStatus::Completed;
        self.updated_at = now;
    }

    /// `Pending|InProgress → Cancelled`.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> LedgerResult<()> {
        match self.status {
            OrderStatus::Pending | OrderStatus::InProgress => {
                self.status = OrderStatus::Cancelled;
                self.updated_at = now;
                Ok(())
            }
            OrderStatus::Completed => Err(LedgerError::invalid_state("order already completed")),
            OrderStatus::Cancelled => Err(LedgerError::invalid_state("order already cancelled")),
        }
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
