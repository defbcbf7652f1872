//! Test helper module for rentroll-service integration tests.
//!
//! Database-backed tests run against the PostgreSQL instance named by
//! `TEST_DATABASE_URL`, each inside its own schema. When the variable is not
//! set the tests skip themselves.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};

use rentroll_service::config::{Config, DatabaseConfig, EventPublisherConfig, ServerConfig};
use rentroll_service::startup::Application;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use uuid::Uuid;

// Counter for unique schema names
static SCHEMA_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique schema name for test isolation.
fn unique_schema_name() -> String {
    let counter = SCHEMA_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("test_rentroll_{}_{}", std::process::id(), counter)
}

/// Test application wrapper for integration tests.
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    base_db_url: String,
    schema_name: String,
}

impl TestApp {
    /// Spawn a test application on a random port against a fresh schema.
    /// Returns `None` (after logging) when `TEST_DATABASE_URL` is unset.
    pub async fn try_spawn() -> Option<Self> {
        let Ok(base_url) = std::env::var("TEST_DATABASE_URL") else {
            eprintln!("TEST_DATABASE_URL not set; skipping database-backed test");
            return None;
        };

        let schema_name = unique_schema_name();

        // Create schema for test isolation
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&base_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", schema_name))
            .execute(&pool)
            .await
            .ok();
        sqlx::query(&format!("CREATE SCHEMA {}", schema_name))
            .execute(&pool)
            .await
            .expect("Failed to create test schema");

        pool.close().await;

        // Point the app at the schema via search_path
        let separator = if base_url.contains('?') { "&" } else { "?" };
        let db_url_with_schema = format!(
            "{}{}options=-c search_path%3D{}",
            base_url, separator, schema_name
        );

        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0, // Random port
            },
            database: DatabaseConfig {
                url: db_url_with_schema,
                max_connections: 5,
                min_connections: 1,
            },
            events: EventPublisherConfig {
                collector_url: None,
            },
            service_name: "rentroll-service-test".to_string(),
            log_level: "warn".to_string(),
            otlp_endpoint: None,
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Some(TestApp {
            address,
            port,
            client,
            base_db_url: base_url,
            schema_name,
        })
    }

    /// Cleanup test resources (schema).
    pub async fn cleanup(&self) {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect(&self.base_db_url)
            .await
            .ok();

        if let Some(pool) = pool {
            let _ = sqlx::query(&format!(
                "DROP SCHEMA IF EXISTS {} CASCADE",
                self.schema_name
            ))
            .execute(&pool)
            .await;
            pool.close().await;
        }
    }

    /// Create a tenant, returning its id.
    pub async fn create_tenant(&self, full_name: &str) -> Uuid {
        let response = self
            .client
            .post(format!("{}/tenants", self.address))
            .json(&json!({ "full_name": full_name }))
            .send()
            .await
            .expect("Failed to create tenant");
        assert_eq!(response.status(), 201, "tenant creation should succeed");
        let body: Value = response.json().await.unwrap();
        parse_uuid(&body["tenant"]["tenant_id"])
    }

    /// Create an apartment, returning its id.
    pub async fn create_apartment(&self, unit_label: &str) -> Uuid {
        let response = self
            .client
            .post(format!("{}/apartments", self.address))
            .json(&json!({ "unit_label": unit_label }))
            .send()
            .await
            .expect("Failed to create apartment");
        assert_eq!(response.status(), 201, "apartment creation should succeed");
        let body: Value = response.json().await.unwrap();
        parse_uuid(&body["apartment"]["apartment_id"])
    }

    /// Create a lease, returning its id.
    pub async fn create_lease(
        &self,
        tenant_id: Uuid,
        apartment_id: Uuid,
        start_date: &str,
        end_date: &str,
        monthly_rent: &str,
    ) -> Uuid {
        let response = self
            .client
            .post(format!("{}/leases", self.address))
            .json(&json!({
                "tenant_id": tenant_id,
                "apartment_id": apartment_id,
                "start_date": start_date,
                "end_date": end_date,
                "monthly_rent": monthly_rent,
            }))
            .send()
            .await
            .expect("Failed to create lease");
        assert_eq!(response.status(), 201, "lease creation should succeed");
        let body: Value = response.json().await.unwrap();
        parse_uuid(&body["lease"]["lease_id"])
    }

    /// Generate bills for a period and return the response body.
    pub async fn generate_bills(
        &self,
        period_key: &str,
        due_date: &str,
        as_of: &str,
        tenant_ids: Option<Vec<Uuid>>,
    ) -> (u16, Value) {
        let mut payload = json!({
            "period_key": period_key,
            "due_date": due_date,
            "as_of": as_of,
        });
        if let Some(ids) = tenant_ids {
            payload["tenant_ids"] = json!(ids);
        }
        let response = self
            .client
            .post(format!("{}/billing/generate", self.address))
            .json(&payload)
            .send()
            .await
            .expect("Failed to call generate");
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Record a payment and return (status, body).
    pub async fn record_payment(&self, payload: Value) -> (u16, Value) {
        let response = self
            .client
            .post(format!("{}/payments", self.address))
            .json(&payload)
            .send()
            .await
            .expect("Failed to call payments");
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// List bills for a tenant, ordered by due date.
    pub async fn list_bills(&self, tenant_id: Uuid) -> Vec<Value> {
        let response = self
            .client
            .get(format!(
                "{}/bills?tenant_id={}&limit=100",
                self.address, tenant_id
            ))
            .send()
            .await
            .expect("Failed to list bills");
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await.unwrap();
        body["bills"].as_array().cloned().unwrap_or_default()
    }
}

/// Parse a JSON string field into a Uuid.
pub fn parse_uuid(value: &Value) -> Uuid {
    value
        .as_str()
        .and_then(|s| Uuid::parse_str(s).ok())
        .expect("expected a UUID string")
}

/// Parse a JSON string field into a Decimal (amounts serialize as strings).
pub fn parse_decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .expect("expected a decimal string")
}
