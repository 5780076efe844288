//! Persistent order and distributor-payment store
//!
//! The narrow interface the bot consumes (`OrderStore`) plus the SQLite
//! implementation. Orders and payments live in separate tables; payment
//! ids keep the human-facing `PAY-<wilaya>-<millis>` shape for display.

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Row};
use std::str::FromStr;
use std::sync::Arc;
use strum::{Display, EnumString};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::db::{get_connection, DbPool};

/// Order lifecycle status as shown on the channel controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Preparing,
    Prepared,
    Shipped,
    Delivered,
    Canceled,
}

impl OrderStatus {
    /// Parses a stored status string, defaulting to `Preparing` for
    /// anything unrecognized (legacy rows).
    pub fn from_db(raw: &str) -> Self {
        OrderStatus::from_str(raw).unwrap_or(OrderStatus::Preparing)
    }
}

/// A full order row.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_id: String,
    pub status: OrderStatus,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub wilaya: Option<String>,
    pub address: Option<String>,
    pub amount_total: Option<f64>,
    pub notes: Option<String>,
    pub photo_links: Vec<String>,
    pub created_at: String,
}

/// Fields for a freshly submitted order. Status always starts at
/// `preparing`; `created_at` is stamped by the store.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_id: String,
    pub customer_name: Option<String>,
    pub phone: Option<String>,
    pub wilaya: Option<String>,
    pub address: Option<String>,
    pub amount_total: Option<f64>,
    pub notes: Option<String>,
    pub photo_links: Vec<String>,
}

/// Count + amount pair for one status in a statistics report.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatusBucket {
    pub count: u64,
    pub amount: f64,
}

/// Per-wilaya order statistics.
#[derive(Debug, Clone, Default)]
pub struct WilayaStats {
    pub total_orders: u64,
    pub total_amount: f64,
    pub preparing: StatusBucket,
    pub prepared: StatusBucket,
    pub shipped: StatusBucket,
    pub delivered: StatusBucket,
    pub canceled: StatusBucket,
}

impl WilayaStats {
    /// Orders that count toward distributor accounting (sent out the door).
    pub fn accounting_count(&self) -> u64 {
        self.shipped.count + self.delivered.count
    }

    /// Order value that counts toward distributor accounting.
    pub fn accounting_amount(&self) -> f64 {
        self.shipped.amount + self.delivered.amount
    }

    fn bucket_mut(&mut self, status: OrderStatus) -> &mut StatusBucket {
        match status {
            OrderStatus::Preparing => &mut self.preparing,
            OrderStatus::Prepared => &mut self.prepared,
            OrderStatus::Shipped => &mut self.shipped,
            OrderStatus::Delivered => &mut self.delivered,
            OrderStatus::Canceled => &mut self.canceled,
        }
    }
}

/// A distributor payment row.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub payment_id: String,
    pub wilaya: String,
    pub amount: f64,
    pub notes: Option<String>,
    pub created_at: String,
}

/// The persistence interface the bot consumes.
///
/// Async so the submission path can be exercised against mocks in tests;
/// the SQLite implementation completes synchronously on a pooled
/// connection.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Next order id in the day-prefixed continuous sequence.
    async fn generate_next_order_id(&self) -> AppResult<String>;
    async fn create_order(&self, order: NewOrder) -> AppResult<()>;
    /// All orders, newest first.
    async fn fetch_all_orders(&self) -> AppResult<Vec<OrderRecord>>;
    async fn fetch_order(&self, order_id: &str) -> AppResult<Option<OrderRecord>>;
    async fn order_status(&self, order_id: &str) -> AppResult<Option<OrderStatus>>;
    /// Fails with `OrderNotFound` for unknown ids.
    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> AppResult<()>;
    /// Fails with `OrderNotFound` for unknown ids.
    async fn delete_order(&self, order_id: &str) -> AppResult<()>;
    async fn orders_by_wilaya(&self, wilaya: &str) -> AppResult<Vec<OrderRecord>>;
    async fn orders_by_wilaya_and_status(&self, wilaya: &str, status: OrderStatus) -> AppResult<Vec<OrderRecord>>;
    async fn wilaya_statistics(&self, wilaya: &str) -> AppResult<WilayaStats>;
    async fn record_payment(&self, wilaya: &str, amount: f64, notes: Option<String>) -> AppResult<PaymentRecord>;
    async fn total_received(&self, wilaya: &str) -> AppResult<f64>;
    /// Payment history for a wilaya, newest first.
    async fn payment_history(&self, wilaya: &str) -> AppResult<Vec<PaymentRecord>>;
    async fn payment(&self, payment_id: &str) -> AppResult<Option<PaymentRecord>>;
    /// Fails with `PaymentNotFound` for unknown ids.
    async fn update_payment(&self, payment_id: &str, amount: f64) -> AppResult<()>;
    /// Fails with `PaymentNotFound` for unknown ids.
    async fn delete_payment(&self, payment_id: &str) -> AppResult<()>;
}

/// Matches generated order ids; capture group is the sequence suffix.
static ORDER_ID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}-\d{{4}}-\d{{2}}-\d{{2}}-(\d{{3}})$",
        config::order_id::PREFIX
    ))
    .expect("Failed to compile order id regex")
});

/// SQLite-backed `OrderStore`.
pub struct SqliteOrderStore {
    pool: Arc<DbPool>,
}

impl SqliteOrderStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    fn order_from_row(row: &Row<'_>) -> rusqlite::Result<OrderRecord> {
        let status: String = row.get("status")?;
        let photo_links: String = row.get("photo_links")?;
        Ok(OrderRecord {
            order_id: row.get("order_id")?,
            status: OrderStatus::from_db(&status),
            customer_name: row.get("customer_name")?,
            phone: row.get("phone")?,
            wilaya: row.get("wilaya")?,
            address: row.get("address")?,
            amount_total: row.get("amount_total")?,
            notes: row.get("notes")?,
            photo_links: photo_links.split('\n').filter(|s| !s.is_empty()).map(String::from).collect(),
            created_at: row.get("created_at")?,
        })
    }

    fn payment_from_row(row: &Row<'_>) -> rusqlite::Result<PaymentRecord> {
        Ok(PaymentRecord {
            payment_id: row.get("payment_id")?,
            wilaya: row.get("wilaya")?,
            amount: row.get("amount")?,
            notes: row.get("notes")?,
            created_at: row.get("created_at")?,
        })
    }
}

const ORDER_COLUMNS: &str =
    "order_id, status, customer_name, phone, wilaya, address, amount_total, notes, photo_links, created_at";

#[async_trait]
impl OrderStore for SqliteOrderStore {
    async fn generate_next_order_id(&self) -> AppResult<String> {
        let conn = get_connection(&self.pool)?;
        let today = Utc::now().format("%Y-%m-%d");

        // Continuous sequence: the day lives in the prefix, the 3-digit
        // suffix keeps counting across days (matches the ids already in
        // circulation). Gaps are tolerated; we only ever take max+1.
        let mut stmt = conn.prepare("SELECT order_id FROM orders WHERE order_id LIKE ?1")?;
        let like = format!("{}-%", config::order_id::PREFIX);
        let ids = stmt.query_map(params![like], |row| row.get::<_, String>(0))?;

        let mut max_seq: u32 = 0;
        for id in ids {
            let id = id?;
            if let Some(caps) = ORDER_ID_REGEX.captures(&id) {
                if let Ok(seq) = caps[1].parse::<u32>() {
                    max_seq = max_seq.max(seq);
                }
            }
        }

        let order_id = format!(
            "{}-{}-{:0width$}",
            config::order_id::PREFIX,
            today,
            max_seq + 1,
            width = config::order_id::SEQ_WIDTH
        );
        log::info!("Generated new order id {} (previous max {})", order_id, max_seq);
        Ok(order_id)
    }

    async fn create_order(&self, order: NewOrder) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "INSERT INTO orders (order_id, status, customer_name, phone, wilaya, address, amount_total, notes, photo_links, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                order.order_id,
                OrderStatus::Preparing.to_string(),
                order.customer_name,
                order.phone,
                order.wilaya,
                order.address,
                order.amount_total,
                order.notes,
                order.photo_links.join("\n"),
                Utc::now().to_rfc3339(),
            ],
        )?;
        log::info!("Saved order {}", order.order_id);
        Ok(())
    }

    async fn fetch_all_orders(&self) -> AppResult<Vec<OrderRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map([], Self::order_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn fetch_order(&self, order_id: &str) -> AppResult<Option<OrderRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_id = ?1"))?;
        let mut rows = stmt.query_map(params![order_id], Self::order_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn order_status(&self, order_id: &str) -> AppResult<Option<OrderStatus>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare("SELECT status FROM orders WHERE order_id = ?1")?;
        let mut rows = stmt.query_map(params![order_id], |row| row.get::<_, String>(0))?;
        match rows.next() {
            Some(raw) => Ok(Some(OrderStatus::from_db(&raw?))),
            None => Ok(None),
        }
    }

    async fn update_order_status(&self, order_id: &str, status: OrderStatus) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE orders SET status = ?1 WHERE order_id = ?2",
            params![status.to_string(), order_id],
        )?;
        if changed == 0 {
            return Err(AppError::OrderNotFound(order_id.to_string()));
        }
        log::info!("Order {} status set to {}", order_id, status);
        Ok(())
    }

    async fn delete_order(&self, order_id: &str) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        let changed = conn.execute("DELETE FROM orders WHERE order_id = ?1", params![order_id])?;
        if changed == 0 {
            return Err(AppError::OrderNotFound(order_id.to_string()));
        }
        log::info!("Order {} deleted", order_id);
        Ok(())
    }

    async fn orders_by_wilaya(&self, wilaya: &str) -> AppResult<Vec<OrderRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE wilaya = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![wilaya], Self::order_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn orders_by_wilaya_and_status(&self, wilaya: &str, status: OrderStatus) -> AppResult<Vec<OrderRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE wilaya = ?1 AND status = ?2 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![wilaya, status.to_string()], Self::order_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn wilaya_statistics(&self, wilaya: &str) -> AppResult<WilayaStats> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare("SELECT status, amount_total FROM orders WHERE wilaya = ?1")?;
        let rows = stmt.query_map(params![wilaya], |row| {
            let status: String = row.get(0)?;
            let amount: Option<f64> = row.get(1)?;
            Ok((status, amount))
        })?;

        let mut stats = WilayaStats::default();
        for row in rows {
            let (status, amount) = row?;
            let amount = amount.unwrap_or(0.0);
            stats.total_orders += 1;
            stats.total_amount += amount;
            let bucket = stats.bucket_mut(OrderStatus::from_db(&status));
            bucket.count += 1;
            bucket.amount += amount;
        }
        Ok(stats)
    }

    async fn record_payment(&self, wilaya: &str, amount: f64, notes: Option<String>) -> AppResult<PaymentRecord> {
        let conn = get_connection(&self.pool)?;
        let record = PaymentRecord {
            payment_id: format!("PAY-{}-{}", wilaya, Utc::now().timestamp_millis()),
            wilaya: wilaya.to_string(),
            amount,
            notes,
            created_at: Utc::now().to_rfc3339(),
        };
        conn.execute(
            "INSERT INTO payments (payment_id, wilaya, amount, notes, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.payment_id, record.wilaya, record.amount, record.notes, record.created_at],
        )?;
        log::info!("Recorded payment {} ({} د.ج from {})", record.payment_id, amount, wilaya);
        Ok(record)
    }

    async fn total_received(&self, wilaya: &str) -> AppResult<f64> {
        let conn = get_connection(&self.pool)?;
        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE wilaya = ?1",
            params![wilaya],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    async fn payment_history(&self, wilaya: &str) -> AppResult<Vec<PaymentRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT payment_id, wilaya, amount, notes, created_at FROM payments
             WHERE wilaya = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![wilaya], Self::payment_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    async fn payment(&self, payment_id: &str) -> AppResult<Option<PaymentRecord>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(
            "SELECT payment_id, wilaya, amount, notes, created_at FROM payments WHERE payment_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![payment_id], Self::payment_from_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    async fn update_payment(&self, payment_id: &str, amount: f64) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        let changed = conn.execute(
            "UPDATE payments SET amount = ?1 WHERE payment_id = ?2",
            params![amount, payment_id],
        )?;
        if changed == 0 {
            return Err(AppError::PaymentNotFound(payment_id.to_string()));
        }
        log::info!("Payment {} amount set to {}", payment_id, amount);
        Ok(())
    }

    async fn delete_payment(&self, payment_id: &str) -> AppResult<()> {
        let conn = get_connection(&self.pool)?;
        let changed = conn.execute("DELETE FROM payments WHERE payment_id = ?1", params![payment_id])?;
        if changed == 0 {
            return Err(AppError::PaymentNotFound(payment_id.to_string()));
        }
        log::info!("Payment {} deleted", payment_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::db::create_pool;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    fn test_store() -> (SqliteOrderStore, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let pool = create_pool(file.path().to_str().unwrap()).unwrap();
        (SqliteOrderStore::new(Arc::new(pool)), file)
    }

    fn sample_order(order_id: &str, wilaya: &str, amount: f64) -> NewOrder {
        NewOrder {
            order_id: order_id.to_string(),
            customer_name: Some("محمد العربي".to_string()),
            phone: Some("0661234567".to_string()),
            wilaya: Some(wilaya.to_string()),
            address: None,
            amount_total: Some(amount),
            notes: None,
            photo_links: vec!["https://res.example/a.jpg".to_string(), "https://res.example/b.jpg".to_string()],
        }
    }

    // ==================== Order id generation ====================

    #[tokio::test]
    async fn test_first_order_id_starts_at_one() {
        let (store, _file) = test_store();
        let id = store.generate_next_order_id().await.unwrap();
        assert!(id.starts_with("TSL-"), "unexpected prefix: {}", id);
        assert!(id.ends_with("-001"), "sequence should start at 001: {}", id);
    }

    #[tokio::test]
    async fn test_order_id_sequence_is_continuous_across_days() {
        let (store, _file) = test_store();
        // An id from a past day still advances the shared sequence.
        store
            .create_order(sample_order("TSL-2024-01-05-007", "رقان", 2000.0))
            .await
            .unwrap();
        let id = store.generate_next_order_id().await.unwrap();
        assert!(id.ends_with("-008"), "expected max+1: {}", id);
    }

    #[tokio::test]
    async fn test_order_id_ignores_foreign_formats() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-legacy-99", "أدرار", 100.0)).await.unwrap();
        store.create_order(sample_order("OTHER-2024-01-05-500", "أدرار", 100.0)).await.unwrap();
        let id = store.generate_next_order_id().await.unwrap();
        assert!(id.ends_with("-001"), "foreign id formats must not advance the sequence: {}", id);
    }

    // ==================== Order CRUD ====================

    #[tokio::test]
    async fn test_create_and_fetch_round_trip() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-2026-08-06-001", "تمنراست", 4500.0)).await.unwrap();

        let fetched = store.fetch_order("TSL-2026-08-06-001").await.unwrap().unwrap();
        assert_eq!(fetched.status, OrderStatus::Preparing);
        assert_eq!(fetched.customer_name.as_deref(), Some("محمد العربي"));
        assert_eq!(fetched.amount_total, Some(4500.0));
        assert_eq!(fetched.photo_links.len(), 2);

        assert!(store.fetch_order("TSL-0000-00-00-000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_update_and_not_found() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-2026-08-06-001", "أولف", 900.0)).await.unwrap();

        store.update_order_status("TSL-2026-08-06-001", OrderStatus::Shipped).await.unwrap();
        assert_eq!(
            store.order_status("TSL-2026-08-06-001").await.unwrap(),
            Some(OrderStatus::Shipped)
        );

        let err = store.update_order_status("missing", OrderStatus::Shipped).await.unwrap_err();
        assert!(matches!(err, AppError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_order() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-2026-08-06-001", "رقان", 700.0)).await.unwrap();
        store.delete_order("TSL-2026-08-06-001").await.unwrap();
        assert!(store.fetch_order("TSL-2026-08-06-001").await.unwrap().is_none());
        assert!(matches!(
            store.delete_order("TSL-2026-08-06-001").await.unwrap_err(),
            AppError::OrderNotFound(_)
        ));
    }

    // ==================== Statistics ====================

    #[tokio::test]
    async fn test_wilaya_statistics_buckets() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-2026-08-06-001", "عين صالح", 1000.0)).await.unwrap();
        store.create_order(sample_order("TSL-2026-08-06-002", "عين صالح", 2000.0)).await.unwrap();
        store.create_order(sample_order("TSL-2026-08-06-003", "عين صالح", 4000.0)).await.unwrap();
        store.create_order(sample_order("TSL-2026-08-06-004", "تمنراست", 9000.0)).await.unwrap();

        store.update_order_status("TSL-2026-08-06-002", OrderStatus::Shipped).await.unwrap();
        store.update_order_status("TSL-2026-08-06-003", OrderStatus::Delivered).await.unwrap();

        let stats = store.wilaya_statistics("عين صالح").await.unwrap();
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.total_amount, 7000.0);
        assert_eq!(stats.preparing, StatusBucket { count: 1, amount: 1000.0 });
        assert_eq!(stats.shipped, StatusBucket { count: 1, amount: 2000.0 });
        assert_eq!(stats.delivered, StatusBucket { count: 1, amount: 4000.0 });
        assert_eq!(stats.accounting_count(), 2);
        assert_eq!(stats.accounting_amount(), 6000.0);

        // Other wilayas do not leak in
        let other = store.wilaya_statistics("رقان").await.unwrap();
        assert_eq!(other.total_orders, 0);
    }

    // ==================== Payments ====================

    #[tokio::test]
    async fn test_payment_lifecycle() {
        let (store, _file) = test_store();
        let payment = store.record_payment("رقان", 5000.0, None).await.unwrap();
        assert!(payment.payment_id.starts_with("PAY-رقان-"));

        assert_eq!(store.total_received("رقان").await.unwrap(), 5000.0);
        assert_eq!(store.total_received("أدرار").await.unwrap(), 0.0);

        store.update_payment(&payment.payment_id, 7500.0).await.unwrap();
        assert_eq!(store.total_received("رقان").await.unwrap(), 7500.0);

        let history = store.payment_history("رقان").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, 7500.0);

        store.delete_payment(&payment.payment_id).await.unwrap();
        assert!(store.payment(&payment.payment_id).await.unwrap().is_none());
        assert!(matches!(
            store.delete_payment(&payment.payment_id).await.unwrap_err(),
            AppError::PaymentNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_payments_do_not_pollute_order_statistics() {
        let (store, _file) = test_store();
        store.create_order(sample_order("TSL-2026-08-06-001", "أولف", 3000.0)).await.unwrap();
        store.record_payment("أولف", 9999.0, None).await.unwrap();

        let stats = store.wilaya_statistics("أولف").await.unwrap();
        assert_eq!(stats.total_orders, 1);
        assert_eq!(stats.total_amount, 3000.0);
    }
}
