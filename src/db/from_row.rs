//! Row mapping for the four tables. Each `*_COLS` list must match the
//! positional reads in the corresponding `FromRow` impl.

use rusqlite::{Connection, OptionalExtension, Params, Row, types::Type};
use serde_json::Value;

use crate::error::Result;
use crate::models::{License, LicenseActivation, Message, Order};

pub const ORDER_COLS: &str =
    "id, provider, provider_order_id, amount_cents, currency, customer_phone, status, created_at";

pub const LICENSE_COLS: &str = "id, license_key, product_sku, order_id, issued_to, issued_phone, issued_email, issued_at, expires_at, status, activated, activated_at, metadata";

pub const MESSAGE_COLS: &str = "id, phone, email, message, method, license_id, status, attempts, last_attempt_at, sent_at, response_json, created_at";

pub const ACTIVATION_COLS: &str = "id, license_id, terminal_id, activated_at";

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Option<T>> {
    let row = conn.query_row(sql, params, T::from_row).optional()?;
    Ok(row)
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, T::from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Read a nullable JSON TEXT column.
fn json_column(row: &Row, idx: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

impl FromRow for Order {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Order {
            id: row.get(0)?,
            provider: row.get(1)?,
            provider_order_id: row.get(2)?,
            amount_cents: row.get(3)?,
            currency: row.get(4)?,
            customer_phone: row.get(5)?,
            status: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl FromRow for License {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(License {
            id: row.get(0)?,
            license_key: row.get(1)?,
            product_sku: row.get(2)?,
            order_id: row.get(3)?,
            issued_to: row.get(4)?,
            issued_phone: row.get(5)?,
            issued_email: row.get(6)?,
            issued_at: row.get(7)?,
            expires_at: row.get(8)?,
            status: row.get(9)?,
            activated: row.get::<_, i32>(10)? != 0,
            activated_at: row.get(11)?,
            metadata: json_column(row, 12)?,
        })
    }
}

impl FromRow for Message {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Message {
            id: row.get(0)?,
            phone: row.get(1)?,
            email: row.get(2)?,
            message: row.get(3)?,
            method: row.get(4)?,
            license_id: row.get(5)?,
            status: row.get(6)?,
            attempts: row.get(7)?,
            last_attempt_at: row.get(8)?,
            sent_at: row.get(9)?,
            response_json: json_column(row, 10)?,
            created_at: row.get(11)?,
        })
    }
}

impl FromRow for LicenseActivation {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(LicenseActivation {
            id: row.get(0)?,
            license_id: row.get(1)?,
            terminal_id: row.get(2)?,
            activated_at: row.get(3)?,
        })
    }
}
