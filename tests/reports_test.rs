//! Reporting integration tests.

mod common;

use common::{parse_decimal, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

async fn setup_two_tenants(app: &TestApp) -> (Uuid, Uuid) {
    let t1 = app.create_tenant("Rita Solberg").await;
    let t2 = app.create_tenant("Sam Adeyemi").await;
    let a1 = app.create_apartment("R-101").await;
    let a2 = app.create_apartment("R-102").await;
    app.create_lease(t1, a1, "2025-01-01", "2025-12-31", "10000")
        .await;
    app.create_lease(t2, a2, "2025-01-01", "2025-12-31", "8000")
        .await;
    (t1, t2)
}

#[tokio::test]
async fn collection_summary_tracks_billed_and_collected() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let (t1, _t2) = setup_two_tenants(&app).await;
    let (status, _body) = app
        .generate_bills("2025-01", "2025-01-05", "2025-01-01", None)
        .await;
    assert_eq!(status, 201);

    // t1 pays in full; t2 pays nothing.
    let (status, _body) = app
        .record_payment(json!({
            "tenant_id": t1,
            "amount": "10000",
            "settlement_date": "2025-01-04",
            "payment_method": "cash",
            "as_of": "2025-01-04",
        }))
        .await;
    assert_eq!(status, 201);

    let response = app
        .client
        .get(format!("{}/reports/collection-summary", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let summary = &body["summary"];

    assert_eq!(
        parse_decimal(&summary["total_billed"]),
        Decimal::from(18000)
    );
    assert_eq!(
        parse_decimal(&summary["total_collected"]),
        Decimal::from(10000)
    );
    assert_eq!(
        parse_decimal(&summary["total_outstanding"]),
        Decimal::from(8000)
    );
    assert_eq!(
        parse_decimal(&summary["collection_efficiency_pct"]),
        "55.56".parse::<Decimal>().unwrap()
    );

    app.cleanup().await;
}

#[tokio::test]
async fn aging_report_buckets_by_days_past_due() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Tove Lind").await;
    let apartment = app.create_apartment("S-201").await;
    app.create_lease(tenant, apartment, "2025-01-01", "2025-12-31", "1000")
        .await;

    // Four periods with ascending due dates.
    for (period, due) in [
        ("2025-01", "2025-01-05"),
        ("2025-02", "2025-02-05"),
        ("2025-03", "2025-03-05"),
        ("2025-04", "2025-04-05"),
    ] {
        let (status, _body) = app
            .generate_bills(period, due, "2025-01-01", Some(vec![tenant]))
            .await;
        assert_eq!(status, 201);
    }

    // As of 2025-04-20: Jan is 105 days past due (90+), Feb 74 (61-90),
    // Mar 46 (31-60), Apr 15 (1-30).
    let response = app
        .client
        .get(format!("{}/reports/aging?as_of=2025-04-20", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let aging = &body["aging"];

    assert_eq!(parse_decimal(&aging["days_1_30"]), Decimal::from(1000));
    assert_eq!(parse_decimal(&aging["days_31_60"]), Decimal::from(1000));
    assert_eq!(parse_decimal(&aging["days_61_90"]), Decimal::from(1000));
    assert_eq!(parse_decimal(&aging["days_over_90"]), Decimal::from(1000));
    assert_eq!(parse_decimal(&aging["current"]), Decimal::ZERO);

    // As of the due date of the newest bill, it is not past due yet.
    let response = app
        .client
        .get(format!("{}/reports/aging?as_of=2025-04-05", app.address))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        parse_decimal(&body["aging"]["current"]),
        Decimal::from(1000)
    );

    app.cleanup().await;
}

#[tokio::test]
async fn overdue_tenants_ranked_by_outstanding_amount() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let (t1, t2) = setup_two_tenants(&app).await;
    let (status, _body) = app
        .generate_bills("2025-01", "2025-01-05", "2025-01-01", None)
        .await;
    assert_eq!(status, 201);

    // t1 owes 10000, t2 owes 8000; both overdue as of February.
    let response = app
        .client
        .get(format!(
            "{}/reports/overdue-tenants?as_of=2025-02-01&limit=10",
            app.address
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    let overdue = body["overdue_tenants"].as_array().unwrap();

    assert_eq!(overdue.len(), 2);
    assert_eq!(common::parse_uuid(&overdue[0]["tenant_id"]), t1);
    assert_eq!(
        parse_decimal(&overdue[0]["overdue_amount"]),
        Decimal::from(10000)
    );
    assert_eq!(common::parse_uuid(&overdue[1]["tenant_id"]), t2);
    assert_eq!(overdue[0]["oldest_due_date"], "2025-01-05");

    // Before the due date nobody is overdue.
    let response = app
        .client
        .get(format!(
            "{}/reports/overdue-tenants?as_of=2025-01-05&limit=10",
            app.address
        ))
        .send()
        .await
        .unwrap();
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["overdue_tenants"].as_array().unwrap().len(), 0);

    app.cleanup().await;
}

async fn payment_state(app: &TestApp, tenant: Uuid, as_of: &str) -> String {
    let response = app
        .client
        .get(format!(
            "{}/tenants/{}/payment-state?as_of={}",
            app.address, tenant, as_of
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    body["state"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn tenant_payment_state_follows_the_precedence_order() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Uma Patel").await;
    let apartment = app.create_apartment("T-301").await;
    app.create_lease(tenant, apartment, "2025-01-01", "2025-12-31", "1000")
        .await;
    let (status, _body) = app
        .generate_bills("2025-01", "2025-01-05", "2025-01-01", Some(vec![tenant]))
        .await;
    assert_eq!(status, 201);

    // Unpaid before due date, overdue after it.
    assert_eq!(payment_state(&app, tenant, "2025-01-04").await, "unpaid");
    assert_eq!(payment_state(&app, tenant, "2025-01-06").await, "overdue");

    // Partial payment: partial before due date, still overdue after.
    let (status, _body) = app
        .record_payment(json!({
            "tenant_id": tenant,
            "amount": "400",
            "settlement_date": "2025-01-03",
            "payment_method": "cash",
            "as_of": "2025-01-03",
        }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(payment_state(&app, tenant, "2025-01-04").await, "partial");
    assert_eq!(payment_state(&app, tenant, "2025-01-06").await, "overdue");

    // Full settlement: paid regardless of date.
    let (status, _body) = app
        .record_payment(json!({
            "tenant_id": tenant,
            "amount": "600",
            "settlement_date": "2025-01-04",
            "payment_method": "cash",
            "as_of": "2025-01-04",
        }))
        .await;
    assert_eq!(status, 201);
    assert_eq!(payment_state(&app, tenant, "2025-01-06").await, "paid");

    app.cleanup().await;
}
