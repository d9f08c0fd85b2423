// MySQL channel store implementation
use crate::application::channel_store::{ChannelStore, SampleSink};
use crate::domain::channel::{ChannelId, ChannelDef};
use crate::domain::sample::{ChannelWrite, Sample};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlPool, MySqlPoolOptions};
use sqlx::ConnectOptions;
use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

const CREATE_CHANNELS: &str = "
    CREATE TABLE IF NOT EXISTS channels (
        channel_id INT PRIMARY KEY NOT NULL AUTO_INCREMENT,
        name VARCHAR(255) NOT NULL UNIQUE,
        type VARCHAR(20) NOT NULL,
        unit VARCHAR(20) NOT NULL
    )";

const CREATE_DATA: &str = "
    CREATE TABLE IF NOT EXISTS data (
        channel_id INT NOT NULL,
        timestamp BIGINT NOT NULL,
        value FLOAT NOT NULL,
        PRIMARY KEY (channel_id, timestamp),
        CONSTRAINT fk_channel_id FOREIGN KEY (channel_id) REFERENCES channels(channel_id)
    )";

// A repeated (channel, timestamp) overwrites the stored value
const INSERT_SAMPLE: &str = "
    INSERT INTO data (channel_id, timestamp, value) VALUES (?, ?, ?)
    ON DUPLICATE KEY UPDATE value = VALUES(value)";

#[derive(Debug, Clone)]
pub struct MysqlChannelStore {
    pool: MySqlPool,
    options: MySqlConnectOptions,
    /// Bounds the writer's connect and every insert
    io_timeout: Duration,
}

impl MysqlChannelStore {
    pub async fn connect(url: &str, connect_timeout: Duration) -> Result<Self> {
        let options = MySqlConnectOptions::from_str(url).context("Invalid database url")?;
        let pool = MySqlPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(connect_timeout)
            .connect_with(options.clone())
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self {
            pool,
            options,
            io_timeout: connect_timeout,
        })
    }

    /// Create the registry and sample tables if they do not exist yet
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(CREATE_CHANNELS)
            .execute(&self.pool)
            .await
            .context("Failed to create channels table")?;
        sqlx::query(CREATE_DATA)
            .execute(&self.pool)
            .await
            .context("Failed to create data table")?;
        Ok(())
    }
}

#[async_trait]
impl ChannelStore for MysqlChannelStore {
    async fn resolve_channel_id(&self, channel: &ChannelDef) -> Result<ChannelId> {
        sqlx::query("INSERT IGNORE INTO channels (name, type, unit) VALUES (?, ?, ?)")
            .bind(channel.name)
            .bind(channel.kind.as_str())
            .bind(channel.unit)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to register channel {}", channel.name))?;

        let id: ChannelId = sqlx::query_scalar("SELECT channel_id FROM channels WHERE name = ?")
            .bind(channel.name)
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to look up channel {}", channel.name))?;

        tracing::debug!("Channel {} has id {}", channel.name, id);
        Ok(id)
    }

    async fn query_range(&self, channel_id: ChannelId, start_ms: i64, end_ms: i64) -> Result<Vec<Sample>> {
        let rows: Vec<(i64, f32)> = sqlx::query_as(
            "SELECT timestamp, value FROM data
             WHERE channel_id = ? AND timestamp >= ? AND timestamp <= ?
             ORDER BY timestamp",
        )
        .bind(channel_id)
        .bind(start_ms)
        .bind(end_ms)
        .fetch_all(&self.pool)
        .await
        .context("Failed to query samples")?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, value)| Sample::new(timestamp, value as f64))
            .collect())
    }

    async fn latest_sample(&self, channel_id: ChannelId) -> Result<Option<Sample>> {
        let row: Option<(i64, f32)> = sqlx::query_as(
            "SELECT timestamp, value FROM data
             WHERE channel_id = ?
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to query latest sample")?;

        Ok(row.map(|(timestamp, value)| Sample::new(timestamp, value as f64)))
    }

    async fn open_sink(&self) -> Result<Box<dyn SampleSink>> {
        let conn = bounded(self.io_timeout, "open writer connection", self.options.connect())
            .await
            .context("Failed to open writer connection")?;
        Ok(Box::new(MysqlSink {
            conn,
            io_timeout: self.io_timeout,
        }))
    }
}

/// Dedicated autocommit connection owned by the persistent writer
struct MysqlSink {
    conn: MySqlConnection,
    io_timeout: Duration,
}

#[async_trait]
impl SampleSink for MysqlSink {
    async fn insert(&mut self, write: &ChannelWrite) -> Result<()> {
        let insert = sqlx::query(INSERT_SAMPLE)
            .bind(write.channel_id)
            .bind(write.timestamp)
            .bind(write.value as f32)
            .execute(&mut self.conn);
        bounded(self.io_timeout, "insert", insert)
            .await
            .with_context(|| {
                format!(
                    "Failed to insert sample for channel {} at {}",
                    write.channel_id, write.timestamp
                )
            })?;
        Ok(())
    }
}

/// Run a store round-trip, failing once `limit` elapses so the writer can reconnect
async fn bounded<T, E, F>(limit: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => Ok(result?),
        Err(_) => anyhow::bail!("{} timed out after {:?}", what, limit),
    }
}
