//! Bill generation integration tests.

mod common;

use common::{parse_decimal, TestApp};
use rust_decimal::Decimal;
use serde_json::Value;

#[tokio::test]
async fn generation_creates_period_and_bills_for_active_leases() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Asha Rao").await;
    let t2 = app.create_tenant("Ben Okoye").await;
    let a1 = app.create_apartment("A-101").await;
    let a2 = app.create_apartment("A-102").await;
    app.create_lease(t1, a1, "2025-01-01", "2025-12-31", "15000")
        .await;
    app.create_lease(t2, a2, "2025-01-01", "2025-12-31", "12000")
        .await;

    let (status, body) = app
        .generate_bills("2025-03", "2025-03-05", "2025-03-01", None)
        .await;

    assert_eq!(status, 201, "generation should succeed: {body}");
    assert_eq!(body["bills_created"], 2);
    assert_eq!(parse_decimal(&body["total_amount_billed"]), Decimal::from(27000));
    assert_eq!(body["period_key"], "2025-03");

    for bill in body["bills"].as_array().unwrap() {
        assert_eq!(bill["status"], "unpaid");
        assert_eq!(bill["bill_type"], "rent");
        assert_eq!(bill["due_date"], "2025-03-05");
        assert_eq!(parse_decimal(&bill["amount_paid"]), Decimal::ZERO);
    }

    // The period registry now holds the month
    let response = app
        .client
        .get(format!("{}/billing/periods", app.address))
        .send()
        .await
        .unwrap();
    let periods: Value = response.json().await.unwrap();
    let period = periods["periods"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["period_key"] == "2025-03")
        .expect("period 2025-03 should exist");
    assert_eq!(period["month_name"], "March");
    assert_eq!(period["year"], 2025);

    app.cleanup().await;
}

#[tokio::test]
async fn regeneration_skips_already_billed_tenants() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Cara Lindt").await;
    let a1 = app.create_apartment("B-201").await;
    app.create_lease(t1, a1, "2025-01-01", "2025-12-31", "10000")
        .await;

    let (status, first) = app
        .generate_bills("2025-04", "2025-04-05", "2025-04-01", None)
        .await;
    assert_eq!(status, 201);
    assert_eq!(first["bills_created"], 1);

    // Second run for the same period creates nothing and reports the skip.
    let (status, second) = app
        .generate_bills("2025-04", "2025-04-05", "2025-04-01", None)
        .await;
    assert_eq!(status, 201, "re-running generation is not an error");
    assert_eq!(second["bills_created"], 0);
    assert_eq!(
        second["skipped_tenant_ids"].as_array().unwrap().len(),
        1,
        "the already-billed tenant is reported as skipped"
    );

    // Still exactly one bill.
    assert_eq!(app.list_bills(t1).await.len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn generation_with_no_matching_leases_fails_without_creating_period() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let (status, _body) = app
        .generate_bills("2025-05", "2025-05-05", "2025-05-01", None)
        .await;
    assert_eq!(status, 400, "no active leases is a validation failure");

    // The failed run must not leak an empty period row.
    let response = app
        .client
        .get(format!("{}/billing/periods", app.address))
        .send()
        .await
        .unwrap();
    let periods: Value = response.json().await.unwrap();
    assert!(
        !periods["periods"]
            .as_array()
            .unwrap()
            .iter()
            .any(|p| p["period_key"] == "2025-05"),
        "period 2025-05 must not be created as a side effect"
    );

    app.cleanup().await;
}

#[tokio::test]
async fn generation_honors_explicit_tenant_selection() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Dev Kumar").await;
    let t2 = app.create_tenant("Elena Sousa").await;
    let a1 = app.create_apartment("C-301").await;
    let a2 = app.create_apartment("C-302").await;
    app.create_lease(t1, a1, "2025-01-01", "2025-12-31", "9000")
        .await;
    app.create_lease(t2, a2, "2025-01-01", "2025-12-31", "9500")
        .await;

    let (status, body) = app
        .generate_bills("2025-06", "2025-06-05", "2025-06-01", Some(vec![t1]))
        .await;
    assert_eq!(status, 201);
    assert_eq!(body["bills_created"], 1);

    assert_eq!(app.list_bills(t1).await.len(), 1);
    assert_eq!(app.list_bills(t2).await.len(), 0);

    app.cleanup().await;
}

#[tokio::test]
async fn generation_skips_tenants_whose_lease_has_ended() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Farid Amini").await;
    let a1 = app.create_apartment("D-401").await;
    app.create_lease(t1, a1, "2024-01-01", "2024-12-31", "8000")
        .await;

    // Lease ended in 2024; generating for mid-2025 finds nothing.
    let (status, _body) = app
        .generate_bills("2025-07", "2025-07-05", "2025-07-01", None)
        .await;
    assert_eq!(status, 400);

    app.cleanup().await;
}

#[tokio::test]
async fn generation_writes_one_audit_entry() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Greta Holm").await;
    let a1 = app.create_apartment("E-501").await;
    app.create_lease(t1, a1, "2025-01-01", "2025-12-31", "11000")
        .await;

    let (status, _body) = app
        .generate_bills("2025-08", "2025-08-05", "2025-08-01", None)
        .await;
    assert_eq!(status, 201);

    let response = app
        .client
        .get(format!(
            "{}/audit/events?action=generate_bills",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let events = body["events"].as_array().unwrap();
    assert_eq!(events.len(), 1, "one audit entry per generation run");
    assert_eq!(events[0]["entity_type"], "billing_period");

    app.cleanup().await;
}
