//! Integrity guard integration tests: deletions and lease overlap.

mod common;

use common::{parse_uuid, TestApp};
use serde_json::{json, Value};

#[tokio::test]
async fn lease_overlapping_an_existing_lease_is_rejected() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let t1 = app.create_tenant("Hana Saito").await;
    let t2 = app.create_tenant("Igor Petrov").await;
    let apartment = app.create_apartment("F-601").await;
    app.create_lease(t1, apartment, "2025-01-01", "2025-06-30", "7000")
        .await;

    let response = app
        .client
        .post(format!("{}/leases", app.address))
        .json(&json!({
            "tenant_id": t2,
            "apartment_id": apartment,
            "start_date": "2025-06-01",
            "end_date": "2025-12-31",
            "monthly_rent": "7000",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409, "overlapping lease must be refused");

    // A lease starting after the first ends is fine.
    let response = app
        .client
        .post(format!("{}/leases", app.address))
        .json(&json!({
            "tenant_id": t2,
            "apartment_id": apartment,
            "start_date": "2025-07-01",
            "end_date": "2025-12-31",
            "monthly_rent": "7000",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);

    app.cleanup().await;
}

#[tokio::test]
async fn lease_with_reversed_dates_is_rejected() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Jia Wen").await;
    let apartment = app.create_apartment("G-701").await;

    let response = app
        .client
        .post(format!("{}/leases", app.address))
        .json(&json!({
            "tenant_id": tenant,
            "apartment_id": apartment,
            "start_date": "2025-06-01",
            "end_date": "2025-01-01",
            "monthly_rent": "7000",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    app.cleanup().await;
}

#[tokio::test]
async fn tenant_with_unpaid_bills_cannot_be_removed() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Karl Meier").await;
    let apartment = app.create_apartment("H-801").await;
    app.create_lease(tenant, apartment, "2024-01-01", "2024-12-31", "6000")
        .await;
    let (status, _body) = app
        .generate_bills("2024-11", "2024-11-05", "2024-11-01", Some(vec![tenant]))
        .await;
    assert_eq!(status, 201);

    // Lease has ended, but the November bill is still unpaid.
    let response = app
        .client
        .delete(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
    let body: Value = response.json().await.unwrap();
    assert!(
        body["error"].as_str().unwrap().contains("unpaid"),
        "refusal carries a descriptive reason: {body}"
    );

    app.cleanup().await;
}

#[tokio::test]
async fn tenant_with_active_lease_cannot_be_removed() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Lena Fischer").await;
    let apartment = app.create_apartment("I-901").await;
    app.create_lease(tenant, apartment, "2025-01-01", "2099-12-31", "6000")
        .await;

    let response = app
        .client
        .delete(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn tenant_without_history_is_hard_deleted() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Milo Novak").await;

    let response = app
        .client
        .delete(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "deleted");

    let response = app
        .client
        .get(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);

    app.cleanup().await;
}

#[tokio::test]
async fn tenant_with_settled_history_is_deactivated_not_deleted() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Nora Quist").await;
    let apartment = app.create_apartment("J-1001").await;
    app.create_lease(tenant, apartment, "2024-01-01", "2024-12-31", "6000")
        .await;
    let (status, _body) = app
        .generate_bills("2024-12", "2024-12-05", "2024-12-01", Some(vec![tenant]))
        .await;
    assert_eq!(status, 201);
    let (status, _body) = app
        .record_payment(json!({
            "tenant_id": tenant,
            "amount": "6000",
            "settlement_date": "2024-12-04",
            "payment_method": "cash",
            "as_of": "2024-12-04",
        }))
        .await;
    assert_eq!(status, 201);

    let response = app
        .client
        .delete(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["outcome"], "deactivated");

    // The tenant row survives so the settled ledger stays attributable.
    let response = app
        .client
        .get(format!("{}/tenants/{}", app.address, tenant))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["tenant"]["status"], "inactive");

    app.cleanup().await;
}

#[tokio::test]
async fn bill_with_recorded_payments_cannot_be_deleted() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Omar Haddad").await;
    let apartment = app.create_apartment("K-1101").await;
    app.create_lease(tenant, apartment, "2025-01-01", "2025-12-31", "6000")
        .await;
    let (status, body) = app
        .generate_bills("2025-01", "2025-01-05", "2025-01-01", Some(vec![tenant]))
        .await;
    assert_eq!(status, 201);
    let bill_id = parse_uuid(&body["bills"][0]["bill_id"]);

    let (status, _body) = app
        .record_payment(json!({
            "tenant_id": tenant,
            "amount": "1000",
            "settlement_date": "2025-01-03",
            "payment_method": "cash",
            "as_of": "2025-01-03",
        }))
        .await;
    assert_eq!(status, 201);

    let response = app
        .client
        .delete(format!("{}/bills/{}", app.address, bill_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    app.cleanup().await;
}

#[tokio::test]
async fn unbilled_bill_can_be_deleted() {
    let Some(app) = TestApp::try_spawn().await else {
        return;
    };

    let tenant = app.create_tenant("Priya Nair").await;
    let apartment = app.create_apartment("L-1201").await;
    app.create_lease(tenant, apartment, "2025-01-01", "2025-12-31", "6000")
        .await;
    let (status, body) = app
        .generate_bills("2025-02", "2025-02-05", "2025-02-01", Some(vec![tenant]))
        .await;
    assert_eq!(status, 201);
    let bill_id = parse_uuid(&body["bills"][0]["bill_id"]);

    let response = app
        .client
        .delete(format!("{}/bills/{}", app.address, bill_id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    assert_eq!(app.list_bills(tenant).await.len(), 0);

    app.cleanup().await;
}
