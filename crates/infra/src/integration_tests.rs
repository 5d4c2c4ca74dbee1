//! Integration tests for the settlement pipeline.
//!
//! Tests: policies / order lifecycle → transfer engine → store.
//!
//! Verifies:
//! - money movement is atomic and conserves value
//! - idempotency keys yield at most one financial effect, under concurrency
//! - order completion couples payment and status transition
//! - failures leave balances and orders provably unchanged

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use chrono::Utc;
    use proptest::prelude::*;
    use serde_json::json;

    use marketpay_core::{CompanyId, LedgerError, ServiceId, UserId};
    use marketpay_orders::{Order, OrderStatus};
    use marketpay_parties::EmploymentRelation;
    use marketpay_settlement::{
        LedgerStore, OrderLifecycle, SettlementService, TransferEngine,
    };
    use marketpay_wallet::{order_completion_key, TransferRequest, TxType, WalletOwner};

    use crate::store::{InMemoryEmploymentDirectory, InMemorySettlementStore};

    type Service = SettlementService<Arc<InMemorySettlementStore>, Arc<InMemoryEmploymentDirectory>>;
    type Lifecycle = OrderLifecycle<Arc<InMemorySettlementStore>>;

    fn setup() -> (
        Arc<InMemorySettlementStore>,
        Arc<InMemoryEmploymentDirectory>,
        Service,
        Lifecycle,
    ) {
        marketpay_observability::init();
        let store = Arc::new(InMemorySettlementStore::new());
        let employment = Arc::new(InMemoryEmploymentDirectory::new());
        let service = SettlementService::new(store.clone(), employment.clone());
        let lifecycle = OrderLifecycle::new(store.clone());
        (store, employment, service, lifecycle)
    }

    fn place_order(lifecycle: &Lifecycle, rider: UserId, company: CompanyId, price: i64) -> Order {
        let order = Order::place(rider, company, ServiceId::new(), price, Utc::now()).unwrap();
        lifecycle.place(order).unwrap()
    }

    #[test]
    fn topup_creates_wallet_and_appends_one_entry() {
        let (store, _, service, _) = setup();
        let rider = WalletOwner::Rider(UserId::new());

        let receipt = service.topup(rider, 1_000, None).unwrap();
        assert_eq!(receipt.to_balance, Some(1_000));
        assert_eq!(receipt.entry.tx_type, TxType::Topup);
        assert!(receipt.entry.from_wallet_id.is_none());
        assert!(!receipt.replayed);
        assert_eq!(store.ledger_len(), 1);

        let wallet = service.get_or_create_wallet(rider).unwrap();
        assert_eq!(wallet.balance_cents, 1_000);
    }

    #[test]
    fn withdraw_fails_on_insufficient_balance_with_no_entry() {
        let (store, _, service, _) = setup();
        let driver = WalletOwner::Driver(UserId::new());

        let err = service.withdraw(driver, 500, None).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                balance_cents: 0,
                requested_cents: 500,
            }
        );
        assert_eq!(store.ledger_len(), 0);
    }

    #[test]
    fn withdraw_debits_and_records() {
        let (_, _, service, _) = setup();
        let driver = WalletOwner::Driver(UserId::new());
        service.topup(driver, 2_000, None).unwrap();

        let receipt = service.withdraw(driver, 500, None).unwrap();
        assert_eq!(receipt.from_balance, Some(1_500));
        assert!(receipt.entry.to_wallet_id.is_none());
        assert_eq!(receipt.entry.tx_type, TxType::Withdraw);
    }

    #[test]
    fn invalid_amounts_are_rejected_before_any_mutation() {
        let (store, _, service, _) = setup();
        let rider = WalletOwner::Rider(UserId::new());

        assert_eq!(
            service.topup(rider, 0, None).unwrap_err(),
            LedgerError::InvalidAmount(0)
        );
        assert_eq!(
            service.withdraw(rider, -100, None).unwrap_err(),
            LedgerError::InvalidAmount(-100)
        );
        assert_eq!(store.ledger_len(), 0);
    }

    // ===== order lifecycle =====

    #[test]
    fn complete_order_moves_price_and_flips_status() {
        let (store, _, service, lifecycle) = setup();
        let rider = UserId::new();
        let company = CompanyId::new();

        service.topup(WalletOwner::Rider(rider), 10_000, None).unwrap();
        let order = place_order(&lifecycle, rider, company, 5_000);
        lifecycle.confirm(order.id).unwrap();

        let completion = lifecycle.complete(order.id).unwrap();
        assert_eq!(completion.order.status, OrderStatus::Completed);
        assert_eq!(completion.receipt.from_balance, Some(5_000));
        assert_eq!(completion.receipt.to_balance, Some(5_000));
        assert_eq!(completion.receipt.entry.tx_type, TxType::OrderPayment);
        assert_eq!(
            completion.receipt.entry.ref_id.as_deref(),
            Some(order.id.to_string().as_str())
        );
        assert_eq!(
            completion.receipt.entry.idempotency_key.as_deref(),
            Some(order_completion_key(order.id).as_str())
        );

        // Exactly one OrderPayment entry exists (plus the topup).
        assert_eq!(store.ledger_len(), 2);

        let company_wallet = service
            .get_or_create_wallet(WalletOwner::Company(company))
            .unwrap();
        assert_eq!(company_wallet.balance_cents, 5_000);
    }

    #[test]
    fn complete_order_is_allowed_directly_from_pending() {
        let (_, _, service, lifecycle) = setup();
        let rider = UserId::new();

        service.topup(WalletOwner::Rider(rider), 8_000, None).unwrap();
        let order = place_order(&lifecycle, rider, CompanyId::new(), 8_000);

        // No confirm step.
        let completion = lifecycle.complete(order.id).unwrap();
        assert_eq!(completion.order.status, OrderStatus::Completed);
        assert_eq!(completion.receipt.from_balance, Some(0));
    }

    #[test]
    fn complete_order_insufficient_funds_leaves_everything_unchanged() {
        let (store, _, _, lifecycle) = setup();
        let rider = UserId::new();

        let order = place_order(&lifecycle, rider, CompanyId::new(), 5_000);
        lifecycle.confirm(order.id).unwrap();

        let err = lifecycle.complete(order.id).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                balance_cents: 0,
                requested_cents: 5_000,
            }
        );

        // Order remains in its prior state; no ledger entry was created.
        assert_eq!(lifecycle.get(order.id).unwrap().status, OrderStatus::InProgress);
        assert_eq!(store.ledger_len(), 0);
    }

    #[test]
    fn complete_twice_charges_once() {
        let (store, _, service, lifecycle) = setup();
        let rider = UserId::new();

        service.topup(WalletOwner::Rider(rider), 10_000, None).unwrap();
        let order = place_order(&lifecycle, rider, CompanyId::new(), 4_000);

        let first = lifecycle.complete(order.id).unwrap();
        assert!(!first.receipt.replayed);

        let second = lifecycle.complete(order.id).unwrap();
        assert!(second.receipt.replayed);
        assert_eq!(second.order.status, OrderStatus::Completed);
        assert_eq!(second.receipt.entry.id, first.receipt.entry.id);
        // Balance unchanged by the replay.
        assert_eq!(second.receipt.from_balance, Some(6_000));
        assert_eq!(store.ledger_len(), 2);
    }

    #[test]
    fn cancelled_orders_reject_confirm_and_complete() {
        let (_, _, _, lifecycle) = setup();
        let order = place_order(&lifecycle, UserId::new(), CompanyId::new(), 1_000);
        lifecycle.cancel(order.id).unwrap();

        match lifecycle.confirm(order.id).unwrap_err() {
            LedgerError::InvalidState(msg) => assert!(msg.contains("already cancelled")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
        match lifecycle.complete(order.id).unwrap_err() {
            LedgerError::InvalidState(msg) => assert!(msg.contains("already cancelled")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn confirm_rejects_completed_order_with_specific_message() {
        let (_, _, service, lifecycle) = setup();
        let rider = UserId::new();
        service.topup(WalletOwner::Rider(rider), 1_000, None).unwrap();
        let order = place_order(&lifecycle, rider, CompanyId::new(), 1_000);
        lifecycle.complete(order.id).unwrap();

        match lifecycle.confirm(order.id).unwrap_err() {
            LedgerError::InvalidState(msg) => assert!(msg.contains("already completed")),
            other => panic!("expected InvalidState, got {other:?}"),
        }
    }

    #[test]
    fn unknown_order_is_not_found() {
        let (_, _, _, lifecycle) = setup();
        assert_eq!(
            lifecycle.complete(marketpay_core::OrderId::new()).unwrap_err(),
            LedgerError::NotFound
        );
    }

    // ===== payroll =====

    #[test]
    fn pay_salary_requires_employment() {
        let (store, _, service, _) = setup();
        let company = CompanyId::new();
        let driver = UserId::new();

        service
            .topup(WalletOwner::Company(company), 500_000, None)
            .unwrap();

        let err = service
            .pay_salary(company, driver, 150_000, "2025-08", None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotEmployed { .. }));
        // Only the topup is on the ledger.
        assert_eq!(store.ledger_len(), 1);
    }

    #[test]
    fn pay_salary_moves_money_and_records_period() {
        let (_, employment, service, _) = setup();
        let company = CompanyId::new();
        let driver = UserId::new();
        employment.hire(EmploymentRelation::new(company, driver, 150_000, Utc::now()));

        service
            .topup(WalletOwner::Company(company), 500_000, None)
            .unwrap();

        let receipt = service
            .pay_salary(company, driver, 150_000, "2025-08", None)
            .unwrap();
        assert_eq!(receipt.from_balance, Some(350_000));
        assert_eq!(receipt.to_balance, Some(150_000));
        assert_eq!(receipt.entry.tx_type, TxType::PaySalary);
        assert_eq!(receipt.entry.metadata, json!({ "period": "2025-08" }));
    }

    #[test]
    fn duplicate_payroll_run_is_recognized_without_explicit_key() {
        let (store, employment, service, _) = setup();
        let company = CompanyId::new();
        let driver = UserId::new();
        employment.hire(EmploymentRelation::new(company, driver, 100, Utc::now()));

        service
            .topup(WalletOwner::Company(company), 1_000, None)
            .unwrap();

        let first = service
            .pay_salary(company, driver, 100, "2025-08", None)
            .unwrap();
        assert!(!first.replayed);

        let second = service
            .pay_salary(company, driver, 100, "2025-08", None)
            .unwrap();
        assert!(second.replayed);
        assert_eq!(second.entry.id, first.entry.id);
        // Balances unchanged by the second call.
        assert_eq!(second.from_balance, Some(900));
        assert_eq!(second.to_balance, Some(100));
        assert_eq!(store.ledger_len(), 2);

        // A different period is a fresh payment.
        let third = service
            .pay_salary(company, driver, 100, "2025-09", None)
            .unwrap();
        assert!(!third.replayed);
        assert_eq!(third.from_balance, Some(800));
    }

    // ===== membership =====

    #[test]
    fn membership_payment_credits_platform_and_extends_expiry() {
        let (_, _, service, _) = setup();
        let company = CompanyId::new();

        service
            .topup(WalletOwner::Company(company), 50_000, None)
            .unwrap();

        let before = Utc::now();
        let paid = service
            .pay_membership(company, "Pro", 20_000, None)
            .unwrap();
        assert_eq!(paid.receipt.from_balance, Some(30_000));
        assert_eq!(paid.receipt.to_balance, Some(20_000));
        assert_eq!(paid.membership.plan, "Pro");
        let first_expiry = paid.membership.expires_at.unwrap();
        assert!(first_expiry >= before + chrono::Duration::days(30));

        let platform = service
            .get_or_create_wallet(WalletOwner::Platform)
            .unwrap();
        assert_eq!(platform.balance_cents, 20_000);

        // Renewing before expiry stacks.
        let renewed = service
            .pay_membership(company, "Pro", 10_000, None)
            .unwrap();
        assert_eq!(
            renewed.membership.expires_at.unwrap(),
            first_expiry + chrono::Duration::days(30)
        );
    }

    #[test]
    fn membership_payment_replays_under_one_key() {
        let (store, _, service, _) = setup();
        let company = CompanyId::new();
        service
            .topup(WalletOwner::Company(company), 50_000, None)
            .unwrap();

        let key = Some("membership-2025-08".to_string());
        let first = service
            .pay_membership(company, "Pro", 20_000, key.clone())
            .unwrap();
        let second = service
            .pay_membership(company, "Pro", 20_000, key)
            .unwrap();

        assert!(second.receipt.replayed);
        // Debited once, extended once.
        assert_eq!(second.receipt.from_balance, Some(30_000));
        assert_eq!(second.membership.expires_at, first.membership.expires_at);
        assert_eq!(store.ledger_len(), 2);
    }

    #[test]
    fn membership_payment_requires_funds() {
        let (_, _, service, _) = setup();
        let company = CompanyId::new();
        let err = service
            .pay_membership(company, "Pro", 20_000, None)
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert!(service.engine().store().membership(company).unwrap().is_none());
    }

    // ===== listing =====

    #[test]
    fn transactions_list_newest_first_with_pagination() {
        let (_, _, service, _) = setup();
        let rider = WalletOwner::Rider(UserId::new());

        for amount in 1..=5 {
            service.topup(rider, amount * 100, None).unwrap();
        }
        let wallet = service.get_or_create_wallet(rider).unwrap();

        let first = service.list_transactions(wallet.id, 1, 2).unwrap();
        assert_eq!(first.total_items, 5);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_next);
        assert!(!first.has_prev);
        assert_eq!(first.items[0].amount_cents, 500);
        assert_eq!(first.items[1].amount_cents, 400);

        let last = service.list_transactions(wallet.id, 3, 2).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].amount_cents, 100);
        assert!(!last.has_next);
    }

    // ===== concurrency =====

    #[test]
    fn concurrent_same_key_topups_apply_once() {
        let (store, _, _, _) = setup();
        let rider = WalletOwner::Rider(UserId::new());

        let mut handles = Vec::new();
        for _ in 0..2 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let engine = TransferEngine::new(store);
                engine.execute(TransferRequest {
                    from: None,
                    to: Some(rider),
                    amount_cents: 1_000,
                    tx_type: TxType::Topup,
                    idempotency_key: Some("topup-race".to_string()),
                    ref_id: None,
                    metadata: json!({}),
                })
            }));
        }

        for handle in handles {
            let receipt = handle.join().unwrap().unwrap();
            assert_eq!(receipt.to_balance, Some(1_000));
        }

        assert_eq!(store.ledger_len(), 1);
        let entry = store.find_by_idempotency_key("topup-race").unwrap().unwrap();
        assert_eq!(entry.amount_cents, 1_000);
    }

    #[test]
    fn concurrent_commits_on_one_wallet_lose_no_updates() {
        let (store, _, _, _) = setup();
        let driver = WalletOwner::Driver(UserId::new());

        let mut handles = Vec::new();
        for worker in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                let engine = TransferEngine::new(store);
                for i in 0..10 {
                    engine
                        .execute(TransferRequest {
                            from: None,
                            to: Some(driver),
                            amount_cents: 100,
                            tx_type: TxType::Topup,
                            idempotency_key: Some(format!("w{worker}-{i}")),
                            ref_id: None,
                            metadata: json!({}),
                        })
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        let engine = TransferEngine::new(store.clone());
        let wallet = engine.store().get_or_create_wallet(driver).unwrap();
        assert_eq!(wallet.balance_cents, 8 * 10 * 100);
        assert_eq!(store.ledger_len(), 80);
    }

    #[test]
    fn concurrent_wallet_creation_converges_to_one_row() {
        let (store, _, _, _) = setup();
        let owner = WalletOwner::Company(CompanyId::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                store.get_or_create_wallet(owner).unwrap().id
            }));
        }

        let ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }

    // ===== conservation =====

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: after any sequence of topups, withdrawals and internal
        /// transfers, no balance is negative and the sum of all balances
        /// equals the external in-flow minus out-flow.
        #[test]
        fn balances_stay_non_negative_and_conserve_value(
            ops in proptest::collection::vec((0u8..3, 0usize..4, 0usize..4, 1i64..5_000), 1..60)
        ) {
            let store = Arc::new(InMemorySettlementStore::new());
            let engine = TransferEngine::new(store.clone());

            let owners: Vec<WalletOwner> = (0..4)
                .map(|_| WalletOwner::Rider(UserId::new()))
                .collect();
            let mut external_delta: i64 = 0;

            for (kind, a, b, amount) in ops {
                let (from, to, tx_type) = match kind {
                    0 => (None, Some(owners[a]), TxType::Topup),
                    1 => (Some(owners[a]), None, TxType::Withdraw),
                    _ => (Some(owners[a]), Some(owners[b]), TxType::PaySalary),
                };
                if from == to {
                    continue;
                }
                let result = engine.execute(TransferRequest {
                    from,
                    to,
                    amount_cents: amount,
                    tx_type,
                    idempotency_key: None,
                    ref_id: None,
                    metadata: json!({}),
                });
                match result {
                    Ok(receipt) => {
                        if from.is_none() {
                            external_delta += amount;
                        }
                        if to.is_none() {
                            external_delta -= amount;
                        }
                        if let Some(balance) = receipt.from_balance {
                            prop_assert!(balance >= 0);
                        }
                    }
                    Err(LedgerError::InsufficientFunds { .. }) => {}
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }

            let mut total: i64 = 0;
            for owner in &owners {
                let wallet = engine.store().get_or_create_wallet(*owner).unwrap();
                prop_assert!(wallet.balance_cents >= 0);
                total += wallet.balance_cents;
            }

            prop_assert_eq!(total, external_delta);
        }
    }
}
