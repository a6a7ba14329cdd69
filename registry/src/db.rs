use crate::errors::Result;
use crate::model::{Device, Gateway, GatewayRow};
use crate::store::GatewayStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

pub async fn make_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    info!("Database connection established");
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations completed");

    Ok(pool)
}

/// Gateway store backed by PostgreSQL.
///
/// Gateway ids come from an identity column, so the database sequence
/// serializes concurrent creates and never reuses a value. Devices live in
/// their own table with a `position` column that preserves their order.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OwnedDevice {
    gateway_id: i64,
    #[sqlx(flatten)]
    device: Device,
}

#[async_trait]
impl GatewayStore for PgStore {
    async fn list(&self) -> Result<Vec<Gateway>> {
        let rows =
            sqlx::query_as::<_, GatewayRow>("SELECT id, name, ipv4 FROM gateways ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        let devices = sqlx::query_as::<_, OwnedDevice>(
            "SELECT gateway_id, id, vendor, online, created FROM devices ORDER BY gateway_id, position",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_gateway: HashMap<i64, Vec<Device>> = HashMap::new();
        for owned in devices {
            by_gateway
                .entry(owned.gateway_id)
                .or_default()
                .push(owned.device);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let devices = by_gateway.remove(&row.id).unwrap_or_default();
                row.with_devices(devices)
            })
            .collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Gateway>> {
        let row = sqlx::query_as::<_, GatewayRow>(
            "SELECT id, name, ipv4 FROM gateways WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let devices = sqlx::query_as::<_, Device>(
            "SELECT id, vendor, online, created FROM devices WHERE gateway_id = $1 ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(row.with_devices(devices)))
    }

    async fn create(&self, name: &str, ipv4: &str) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO gateways (name, ipv4) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(ipv4)
        .fetch_one(&self.pool)
        .await?;

        debug!("Inserted gateway {}", id);
        Ok(id)
    }

    async fn save(&self, gateway: &Gateway) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query("UPDATE gateways SET name = $2, ipv4 = $3 WHERE id = $1")
            .bind(gateway.id)
            .bind(&gateway.name)
            .bind(&gateway.ipv4)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        sqlx::query("DELETE FROM devices WHERE gateway_id = $1")
            .bind(gateway.id)
            .execute(&mut *tx)
            .await?;

        if !gateway.devices.is_empty() {
            let ids: Vec<&str> = gateway.devices.iter().map(|d| d.id.as_str()).collect();
            let vendors: Vec<&str> = gateway.devices.iter().map(|d| d.vendor.as_str()).collect();
            let onlines: Vec<bool> = gateway.devices.iter().map(|d| d.online).collect();
            let createds: Vec<DateTime<Utc>> = gateway.devices.iter().map(|d| d.created).collect();
            let positions: Vec<i32> = (0..gateway.devices.len() as i32).collect();

            let query = r#"
                INSERT INTO devices (gateway_id, id, vendor, online, created, position)
                SELECT $1::int8, * FROM UNNEST($2::text[], $3::text[], $4::bool[], $5::timestamptz[], $6::int4[])
                "#;

            sqlx::query(query)
                .bind(gateway.id)
                .bind(&ids)
                .bind(&vendors)
                .bind(&onlines)
                .bind(&createds)
                .bind(&positions)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        debug!(
            "Saved gateway {} with {} devices",
            gateway.id,
            gateway.devices.len()
        );
        Ok(true)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        // devices go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM gateways WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }
}
