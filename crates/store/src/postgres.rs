//! PostgreSQL-backed checkout store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EventId, OrderId, TxId};
use domain::{Order, OrderItem, OrderStatus, TxStatus};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::store::{CheckoutStore, NewOrder, NewOutboxRecord, OutboxRecord, TxLogEntry};

// Statement sub-deadlines; the request-level deadline lives at the HTTP
// boundary.
const PING_DEADLINE: Duration = Duration::from_secs(3);
const CREATE_ORDER_DEADLINE: Duration = Duration::from_secs(5);
const IDEMPOTENCY_LOOKUP_DEADLINE: Duration = Duration::from_secs(2);

/// PostgreSQL implementation of [`CheckoutStore`].
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_outbox(row: PgRow) -> Result<OutboxRecord> {
        Ok(OutboxRecord {
            id: row.try_get("id")?,
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("event_id")?),
            topic: row.try_get("topic")?,
            key: row.try_get("key")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            sent_at: row.try_get("sent_at")?,
        })
    }

    fn parse_order_status(raw: &str) -> Result<OrderStatus> {
        OrderStatus::parse(raw)
            .ok_or_else(|| StoreError::Decode(format!("unknown order status {raw:?}")))
    }
}

async fn with_deadline<T>(
    deadline: Duration,
    op: &'static str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(op)),
    }
}

#[async_trait]
impl CheckoutStore for PostgresStore {
    async fn ping(&self) -> Result<()> {
        with_deadline(PING_DEADLINE, "ping", async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn create_order(&self, new_order: NewOrder) -> Result<()> {
        with_deadline(CREATE_ORDER_DEADLINE, "create_order", async {
            let mut tx = self.pool.begin().await?;

            sqlx::query("INSERT INTO orders(id, status, total) VALUES($1, $2, $3)")
                .bind(new_order.order_id.as_str())
                .bind(OrderStatus::Processing.as_str())
                .bind(new_order.total)
                .execute(&mut *tx)
                .await?;

            for item in &new_order.items {
                sqlx::query(
                    "INSERT INTO order_items(order_id, product_id, quantity) VALUES($1, $2, $3)",
                )
                .bind(new_order.order_id.as_str())
                .bind(&item.product_id)
                .bind(item.quantity)
                .execute(&mut *tx)
                .await?;
            }

            if let Some(key) = &new_order.idempotency_key {
                sqlx::query(
                    "INSERT INTO order_idempotency(idempotency_key, order_id) VALUES($1, $2)",
                )
                .bind(key)
                .bind(new_order.order_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    // A unique violation here means another request bound
                    // the key between our lookup and this insert.
                    if let sqlx::Error::Database(ref db_err) = e
                        && db_err.is_unique_violation()
                    {
                        return StoreError::IdempotencyRace;
                    }
                    StoreError::Database(e)
                })?;
            }

            if let Some(txid) = new_order.txid {
                let participants_json = serde_json::to_value(&new_order.participants)?;
                sqlx::query(
                    "INSERT INTO twopc_tx_log(txid, order_id, status, participants) \
                     VALUES($1, $2, $3, $4)",
                )
                .bind(txid.as_uuid())
                .bind(new_order.order_id.as_str())
                .bind(TxStatus::Started.as_str())
                .bind(participants_json)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn get_order(&self, order_id: &OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            "SELECT id, status, total, created_at, updated_at FROM orders WHERE id = $1",
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows =
            sqlx::query("SELECT product_id, quantity FROM order_items WHERE order_id = $1")
                .bind(order_id.as_str())
                .fetch_all(&self.pool)
                .await?;

        let items = item_rows
            .into_iter()
            .map(|r| {
                Ok(OrderItem {
                    product_id: r.try_get("product_id")?,
                    quantity: r.try_get("quantity")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let status: String = row.try_get("status")?;
        Ok(Some(Order {
            id: OrderId::from(row.try_get::<String, _>("id")?),
            status: Self::parse_order_status(&status)?,
            total: row.try_get("total")?,
            items,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        }))
    }

    async fn get_order_by_idempotency_key(&self, key: &str) -> Result<Option<OrderId>> {
        with_deadline(IDEMPOTENCY_LOOKUP_DEADLINE, "idempotency_lookup", async {
            let order_id: Option<String> = sqlx::query_scalar(
                "SELECT order_id FROM order_idempotency WHERE idempotency_key = $1",
            )
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
            Ok(order_id.map(OrderId::from))
        })
        .await
    }

    async fn set_order_status(&self, order_id: &OrderId, status: OrderStatus) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id.as_str())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_order_status_with_event(
        &self,
        order_id: &OrderId,
        status: OrderStatus,
        record: NewOutboxRecord,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE orders SET status = $2, updated_at = now() WHERE id = $1")
            .bind(order_id.as_str())
            .bind(status.as_str())
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO outbox(event_id, topic, key, payload) VALUES($1, $2, $3, $4)")
            .bind(record.event_id.as_uuid())
            .bind(&record.topic)
            .bind(&record.key)
            .bind(&record.payload)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_tx_status(&self, txid: TxId, status: TxStatus) -> Result<()> {
        sqlx::query("UPDATE twopc_tx_log SET status = $2, updated_at = now() WHERE txid = $1")
            .bind(txid.as_uuid())
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_tx_log(&self, txid: TxId) -> Result<Option<TxLogEntry>> {
        let row = sqlx::query(
            "SELECT txid, order_id, status, participants, updated_at \
             FROM twopc_tx_log WHERE txid = $1",
        )
        .bind(txid.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status: String = row.try_get("status")?;
        let participants: serde_json::Value = row.try_get("participants")?;
        Ok(Some(TxLogEntry {
            txid: TxId::from_uuid(row.try_get::<Uuid, _>("txid")?),
            order_id: OrderId::from(row.try_get::<String, _>("order_id")?),
            status: TxStatus::parse(&status)
                .ok_or_else(|| StoreError::Decode(format!("unknown tx status {status:?}")))?,
            participants: serde_json::from_value(participants)?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        }))
    }

    async fn append_event(&self, record: NewOutboxRecord) -> Result<()> {
        sqlx::query("INSERT INTO outbox(event_id, topic, key, payload) VALUES($1, $2, $3, $4)")
            .bind(record.event_id.as_uuid())
            .bind(&record.topic)
            .bind(&record.key)
            .bind(&record.payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_pending_events(&self, limit: i64) -> Result<Vec<OutboxRecord>> {
        let rows = sqlx::query(
            "SELECT id, event_id, topic, key, payload, created_at, sent_at \
             FROM outbox WHERE sent_at IS NULL ORDER BY id LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_outbox).collect()
    }

    async fn mark_event_sent(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE outbox SET sent_at = now() WHERE id = $1 AND sent_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
