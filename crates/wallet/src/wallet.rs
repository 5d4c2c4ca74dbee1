//! The wallet balance model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use marketpay_core::{CompanyId, Entity, UserId, WalletId};

/// Default `low_balance_threshold` assigned to lazily-created wallets.
pub const DEFAULT_LOW_BALANCE_THRESHOLD_CENTS: i64 = 10_000;

/// High-level owner kind of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Company,
    Driver,
    Rider,
    Platform,
}

impl OwnerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerKind::Company => "company",
            OwnerKind::Driver => "driver",
            OwnerKind::Rider => "rider",
            OwnerKind::Platform => "platform",
        }
    }
}

impl core::fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite wallet owner identity: `(owner kind, owner id)`.
///
/// `Platform` is the single marketplace-revenue wallet (membership fees);
/// there is exactly one of it, so it carries no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum WalletOwner {
    Company(CompanyId),
    Driver(UserId),
    Rider(UserId),
    Platform,
}

impl WalletOwner {
    pub fn kind(&self) -> OwnerKind {
        match self {
            WalletOwner::Company(_) => OwnerKind::Company,
            WalletOwner::Driver(_) => OwnerKind::Driver,
            WalletOwner::Rider(_) => OwnerKind::Rider,
            WalletOwner::Platform => OwnerKind::Platform,
        }
    }

    /// Owner reference as a raw UUID (nil for the platform wallet).
    ///
    /// Storage backends persist the composite key as `(kind, ref)`.
    pub fn ref_uuid(&self) -> Uuid {
        match self {
            WalletOwner::Company(id) => *id.as_uuid(),
            WalletOwner::Driver(id) | WalletOwner::Rider(id) => *id.as_uuid(),
            WalletOwner::Platform => Uuid::nil(),
        }
    }
}

impl core::fmt::Display for WalletOwner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.ref_uuid())
    }
}

/// A balance holder, one per owner identity.
///
/// `balance_cents` is an integer amount of minor units and never goes
/// negative. Balances are mutated exclusively by the transfer engine inside
/// a store's atomic commit; every other component treats wallets as
/// read-only snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: WalletId,
    pub owner: WalletOwner,
    pub balance_cents: i64,
    pub low_balance_threshold: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Open a fresh zero-balance wallet for `owner`.
    pub fn open(owner: WalletOwner, now: DateTime<Utc>) -> Self {
        Self {
            id: WalletId::new(),
            owner,
            balance_cents: 0,
            low_balance_threshold: DEFAULT_LOW_BALANCE_THRESHOLD_CENTS,
            updated_at: now,
        }
    }

    pub fn is_below_threshold(&self) -> bool {
        self.balance_cents < self.low_balance_threshold
    }
}

impl Entity for Wallet {
    type Id = WalletId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_wallet_starts_at_zero_with_default_threshold() {
        let owner = WalletOwner::Rider(UserId::new());
        let w = Wallet::open(owner, Utc::now());
        assert_eq!(w.balance_cents, 0);
        assert_eq!(w.low_balance_threshold, DEFAULT_LOW_BALANCE_THRESHOLD_CENTS);
        assert_eq!(w.owner, owner);
        assert!(w.is_below_threshold());
    }

    #[test]
    fn owner_identity_distinguishes_kind_for_same_user() {
        let user = UserId::new();
        let driver = WalletOwner::Driver(user);
        let rider = WalletOwner::Rider(user);
        // Same person acting in two roles holds two distinct wallets.
        assert_ne!(driver, rider);
        assert_eq!(driver.ref_uuid(), rider.ref_uuid());
    }

    #[test]
    fn platform_owner_has_nil_ref() {
        assert_eq!(WalletOwner::Platform.ref_uuid(), Uuid::nil());
        assert_eq!(WalletOwner::Platform.kind(), OwnerKind::Platform);
    }
}
