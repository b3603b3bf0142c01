//! SQLCipher-backed storage for gym business data.
//!
//! Every row carries the owning gym's id, and every statement binds it from
//! the caller's [`TenantContext`]. There is no query surface without a
//! context, so cross-tenant reads cannot be expressed.

use crate::context::TenantContext;
use crate::error::{TenantError, TenantResult};
use chrono::{DateTime, Utc};
use rackside_types::GymId;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// A gym member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub gym_id: GymId,
    pub name: String,
    pub phone: Option<String>,
    pub tariff_id: Option<i64>,
    pub joined_at: DateTime<Utc>,
}

/// A membership payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub gym_id: GymId,
    pub customer_id: i64,
    pub amount_cents: i64,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
}

/// A membership plan offered by a gym.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub gym_id: GymId,
    pub name: String,
    pub price_cents: i64,
    pub duration_days: i64,
}

/// The gym's business database, backed by SQLCipher.
pub struct TenantDb {
    conn: Arc<Mutex<Connection>>,
}

impl TenantDb {
    /// Opens (or creates) the database at the given path, keyed with the
    /// given passphrase.
    pub fn open(path: &Path, passphrase: &str) -> TenantResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| TenantError::Storage(format!("failed to open tenant db: {e}")))?;
        conn.pragma_update(None, "key", passphrase)
            .map_err(|e| TenantError::Storage(format!("failed to key tenant db: {e}")))?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Opens an unencrypted in-memory database (for testing).
    pub fn open_in_memory() -> TenantResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            TenantError::Storage(format!("failed to open in-memory tenant db: {e}"))
        })?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> TenantResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS customers (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                gym_id TEXT NOT NULL,
                name TEXT NOT NULL,
                phone TEXT,
                tariff_id INTEGER,
                joined_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_customers_gym ON customers(gym_id);

            CREATE TABLE IF NOT EXISTS payments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                gym_id TEXT NOT NULL,
                customer_id INTEGER NOT NULL,
                amount_cents INTEGER NOT NULL,
                paid_at TEXT NOT NULL,
                note TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_payments_gym ON payments(gym_id);

            CREATE TABLE IF NOT EXISTS tariffs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                gym_id TEXT NOT NULL,
                name TEXT NOT NULL,
                price_cents INTEGER NOT NULL,
                duration_days INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tariffs_gym ON tariffs(gym_id);
            ",
        )
        .map_err(|e| TenantError::Storage(format!("failed to init tenant schema: {e}")))?;
        Ok(())
    }

    // ── Customers ────────────────────────────────────────────────

    /// Adds a customer under the context's gym. Requires an active license.
    pub fn add_customer(
        &self,
        ctx: &TenantContext,
        name: &str,
        phone: Option<&str>,
        tariff_id: Option<i64>,
    ) -> TenantResult<Customer> {
        ctx.ensure_active()?;
        let joined_at = Utc::now();
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO customers (gym_id, name, phone, tariff_id, joined_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ctx.gym_id().to_string(),
                name,
                phone,
                tariff_id,
                joined_at.to_rfc3339(),
            ],
        )
        .map_err(|e| TenantError::Storage(format!("failed to insert customer: {e}")))?;
        Ok(Customer {
            id: conn.last_insert_rowid(),
            gym_id: ctx.gym_id(),
            name: name.to_string(),
            phone: phone.map(String::from),
            tariff_id,
            joined_at,
        })
    }

    /// Lists the gym's customers, newest first.
    pub fn list_customers(&self, ctx: &TenantContext) -> TenantResult<Vec<Customer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, gym_id, name, phone, tariff_id, joined_at FROM customers WHERE gym_id = ?1 ORDER BY id DESC",
            )
            .map_err(|e| TenantError::Storage(format!("failed to prepare customer query: {e}")))?;
        let rows = stmt
            .query_map(params![ctx.gym_id().to_string()], |row| {
                let id: i64 = row.get(0)?;
                let gym: String = row.get(1)?;
                let name: String = row.get(2)?;
                let phone: Option<String> = row.get(3)?;
                let tariff_id: Option<i64> = row.get(4)?;
                let joined: String = row.get(5)?;
                Ok((id, gym, name, phone, tariff_id, joined))
            })
            .map_err(|e| TenantError::Storage(format!("failed to query customers: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, gym_str, name, phone, tariff_id, joined_str) = row
                .map_err(|e| TenantError::Storage(format!("failed to read customer row: {e}")))?;
            result.push(Customer {
                id,
                gym_id: parse_gym_id(&gym_str)?,
                name,
                phone,
                tariff_id,
                joined_at: parse_timestamp(&joined_str)?,
            });
        }
        Ok(result)
    }

    // ── Payments ─────────────────────────────────────────────────

    /// Records a payment for one of the gym's customers. Requires an
    /// active license.
    ///
    /// Fails with `NotFound` when the customer does not exist under this
    /// gym, including when the id belongs to a different gym's customer.
    pub fn record_payment(
        &self,
        ctx: &TenantContext,
        customer_id: i64,
        amount_cents: i64,
        note: Option<&str>,
    ) -> TenantResult<Payment> {
        ctx.ensure_active()?;
        let paid_at = Utc::now();
        let conn = self.conn.lock().unwrap();

        let owned: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM customers WHERE id = ?1 AND gym_id = ?2",
                params![customer_id, ctx.gym_id().to_string()],
                |row| row.get(0),
            )
            .map_err(|e| TenantError::Storage(format!("failed to check customer: {e}")))?;
        if owned == 0 {
            return Err(TenantError::NotFound(format!(
                "customer {customer_id} in gym {}",
                ctx.gym_id()
            )));
        }

        conn.execute(
            "INSERT INTO payments (gym_id, customer_id, amount_cents, paid_at, note) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                ctx.gym_id().to_string(),
                customer_id,
                amount_cents,
                paid_at.to_rfc3339(),
                note,
            ],
        )
        .map_err(|e| TenantError::Storage(format!("failed to insert payment: {e}")))?;
        Ok(Payment {
            id: conn.last_insert_rowid(),
            gym_id: ctx.gym_id(),
            customer_id,
            amount_cents,
            paid_at,
            note: note.map(String::from),
        })
    }

    /// Lists the gym's payments, newest first.
    pub fn list_payments(&self, ctx: &TenantContext) -> TenantResult<Vec<Payment>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, gym_id, customer_id, amount_cents, paid_at, note FROM payments WHERE gym_id = ?1 ORDER BY id DESC",
            )
            .map_err(|e| TenantError::Storage(format!("failed to prepare payment query: {e}")))?;
        let rows = stmt
            .query_map(params![ctx.gym_id().to_string()], |row| {
                let id: i64 = row.get(0)?;
                let gym: String = row.get(1)?;
                let customer_id: i64 = row.get(2)?;
                let amount_cents: i64 = row.get(3)?;
                let paid: String = row.get(4)?;
                let note: Option<String> = row.get(5)?;
                Ok((id, gym, customer_id, amount_cents, paid, note))
            })
            .map_err(|e| TenantError::Storage(format!("failed to query payments: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, gym_str, customer_id, amount_cents, paid_str, note) = row
                .map_err(|e| TenantError::Storage(format!("failed to read payment row: {e}")))?;
            result.push(Payment {
                id,
                gym_id: parse_gym_id(&gym_str)?,
                customer_id,
                amount_cents,
                paid_at: parse_timestamp(&paid_str)?,
                note,
            });
        }
        Ok(result)
    }

    /// Total payment volume for the gym, in cents.
    pub fn revenue_cents(&self, ctx: &TenantContext) -> TenantResult<i64> {
        let conn = self.conn.lock().unwrap();
        let total: i64 = conn
            .query_row(
                "SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE gym_id = ?1",
                params![ctx.gym_id().to_string()],
                |row| row.get(0),
            )
            .map_err(|e| TenantError::Storage(format!("failed to sum payments: {e}")))?;
        Ok(total)
    }

    // ── Tariffs ──────────────────────────────────────────────────

    /// Adds a membership plan under the context's gym. Requires an active
    /// license.
    pub fn add_tariff(
        &self,
        ctx: &TenantContext,
        name: &str,
        price_cents: i64,
        duration_days: i64,
    ) -> TenantResult<Tariff> {
        ctx.ensure_active()?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tariffs (gym_id, name, price_cents, duration_days) VALUES (?1, ?2, ?3, ?4)",
            params![
                ctx.gym_id().to_string(),
                name,
                price_cents,
                duration_days,
            ],
        )
        .map_err(|e| TenantError::Storage(format!("failed to insert tariff: {e}")))?;
        Ok(Tariff {
            id: conn.last_insert_rowid(),
            gym_id: ctx.gym_id(),
            name: name.to_string(),
            price_cents,
            duration_days,
        })
    }

    /// Lists the gym's membership plans, cheapest first.
    pub fn list_tariffs(&self, ctx: &TenantContext) -> TenantResult<Vec<Tariff>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, gym_id, name, price_cents, duration_days FROM tariffs WHERE gym_id = ?1 ORDER BY price_cents ASC",
            )
            .map_err(|e| TenantError::Storage(format!("failed to prepare tariff query: {e}")))?;
        let rows = stmt
            .query_map(params![ctx.gym_id().to_string()], |row| {
                let id: i64 = row.get(0)?;
                let gym: String = row.get(1)?;
                let name: String = row.get(2)?;
                let price_cents: i64 = row.get(3)?;
                let duration_days: i64 = row.get(4)?;
                Ok((id, gym, name, price_cents, duration_days))
            })
            .map_err(|e| TenantError::Storage(format!("failed to query tariffs: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            let (id, gym_str, name, price_cents, duration_days) = row
                .map_err(|e| TenantError::Storage(format!("failed to read tariff row: {e}")))?;
            result.push(Tariff {
                id,
                gym_id: parse_gym_id(&gym_str)?,
                name,
                price_cents,
                duration_days,
            });
        }
        Ok(result)
    }
}

fn parse_gym_id(s: &str) -> TenantResult<GymId> {
    s.parse()
        .map_err(|e| TenantError::Storage(format!("invalid gym_id in row: {e}")))
}

fn parse_timestamp(s: &str) -> TenantResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TenantError::Storage(format!("invalid timestamp in row: {e}")))
}
