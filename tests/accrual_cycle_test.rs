use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bigdecimal::BigDecimal;
use uuid::Uuid;

use arbor_core::domain::{Account, Caller, Plan};
use arbor_core::gateway::{InMemoryGateway, PersistenceGateway};
use arbor_core::services::AccrualEngine;

fn decimal(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("valid decimal")
}

fn plan(name: &str, rate: &str) -> Plan {
    Plan {
        id: Uuid::new_v4(),
        name: name.to_string(),
        daily_rate: decimal(rate),
    }
}

fn enrolled(balance: &str, plan_id: Uuid) -> Account {
    let mut account = Account::new(None, Some(plan_id));
    account.balance = decimal(balance);
    account
}

#[tokio::test]
async fn full_cycle_applies_yield_across_a_mixed_book() {
    let gateway = Arc::new(InMemoryGateway::new());

    let growth = plan("Growth", "0.01");
    let flat = plan("Flat", "0");
    let shrinking = plan("Shrinking", "-0.01");

    let a = enrolled("200", growth.id);
    let b = enrolled("100", flat.id);
    let c = enrolled("1000", shrinking.id);
    let d = enrolled("350.50", growth.id);
    let orphan = enrolled("100", Uuid::new_v4());

    let ids = [a.id, b.id, c.id, d.id, orphan.id];

    gateway.add_plan(growth);
    gateway.add_plan(flat);
    gateway.add_plan(shrinking);
    for account in [&a, &b, &c, &d, &orphan] {
        gateway.add_account(account.clone());
    }

    let engine = AccrualEngine::new(gateway.clone(), Duration::from_secs(30));
    let summary = engine
        .run_cycle(&Caller::admin("integration"))
        .await
        .expect("cycle runs");

    // a and d accrue; b and c are inert; orphan's plan is missing.
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.failed, vec![ids[4]]);

    assert_eq!(gateway.balance_of(ids[0]), Some(decimal("202.0")));
    assert_eq!(gateway.balance_of(ids[1]), Some(decimal("100")));
    assert_eq!(gateway.balance_of(ids[2]), Some(decimal("1000")));
    assert_eq!(gateway.balance_of(ids[3]), Some(decimal("354.005")));
    assert_eq!(gateway.balance_of(ids[4]), Some(decimal("100")));

    assert_eq!(gateway.yield_record_count(), 2);
}

#[tokio::test]
async fn two_cycles_double_the_yield_without_an_external_boundary() {
    // The engine holds no period state; re-running within the same period
    // accrues again. The scheduler (or the administrator) owns the boundary.
    let gateway = Arc::new(InMemoryGateway::new());
    let p = plan("Growth", "0.01");
    let account = enrolled("100", p.id);
    let account_id = account.id;
    gateway.add_plan(p);
    gateway.add_account(account);

    let engine = AccrualEngine::new(gateway.clone(), Duration::from_secs(30));
    engine
        .run_cycle(&Caller::admin("integration"))
        .await
        .expect("first cycle");
    engine
        .run_cycle(&Caller::admin("integration"))
        .await
        .expect("second cycle");

    assert_eq!(gateway.balance_of(account_id), Some(decimal("102.01")));
    assert_eq!(gateway.yield_record_count(), 2);
}

#[tokio::test]
async fn yield_history_is_newest_first() {
    let gateway = Arc::new(InMemoryGateway::new());
    let p = plan("Growth", "0.5");
    let account = enrolled("100", p.id);
    let account_id = account.id;
    gateway.add_plan(p);
    gateway.add_account(account);

    let engine = AccrualEngine::new(gateway.clone(), Duration::from_secs(30));
    engine.run_cycle(&Caller::admin("integration")).await.expect("first");
    engine.run_cycle(&Caller::admin("integration")).await.expect("second");

    let records = gateway.yield_records(account_id).await.expect("records");
    assert_eq!(records.len(), 2);
    assert!(records[0].created_at >= records[1].created_at);
    // First cycle accrues 50, second accrues 75 off the grown balance.
    assert_eq!(records[1].amount, decimal("50.0"));
    assert_eq!(records[0].amount, decimal("75.00"));
}
