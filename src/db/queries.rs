use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params, types::Value};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::*;

use super::from_row::{
    ACTIVATION_COLS, LICENSE_COLS, MESSAGE_COLS, ORDER_COLS, query_all, query_one,
};

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

fn json_text(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

/// Builder for INSERT statements. Columns left out fall back to their
/// DDL defaults, so optional inputs are simply not written when absent.
struct InsertBuilder {
    table: &'static str,
    fields: Vec<(&'static str, Value)>,
    conflict_target: Option<&'static str>,
}

impl InsertBuilder {
    fn new(table: &'static str) -> Self {
        Self {
            table,
            fields: Vec::new(),
            conflict_target: None,
        }
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Skip the insert when `column`'s unique constraint already holds the value.
    fn on_conflict_do_nothing(mut self, column: &'static str) -> Self {
        self.conflict_target = Some(column);
        self
    }

    /// Returns the number of rows inserted (0 when a conflict was skipped).
    fn execute(self, conn: &Connection) -> Result<usize> {
        let columns: Vec<&str> = self.fields.iter().map(|(col, _)| *col).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            columns.join(", "),
            placeholders.join(", ")
        );
        if let Some(target) = self.conflict_target {
            sql.push_str(&format!(" ON CONFLICT({}) DO NOTHING", target));
        }
        let values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        let inserted = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(inserted)
    }
}

/// Builder for dynamic UPDATE statements with optional fields.
struct UpdateBuilder {
    table: &'static str,
    id: String,
    fields: Vec<(&'static str, Value)>,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: &str) -> Self {
        Self {
            table,
            id: id.to_string(),
            fields: Vec::new(),
        }
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Set a column to an explicit value (including NULL).
    fn set_nullable<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.fields.push((column, v.into())),
            None => self.fields.push((column, Value::Null)),
        }
        self
    }

    /// Outer None leaves the column alone; `Some(None)` clears it.
    fn set_opt_nullable<V: Into<Value>>(self, column: &'static str, value: Option<Option<V>>) -> Self {
        match value {
            Some(v) => self.set_nullable(column, v),
            None => self,
        }
    }

    fn execute(self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            return Ok(false);
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id.into());
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Orders ============

/// Record an order. Without an explicit status the row starts as "pending".
pub fn create_order(conn: &Connection, input: &CreateOrder) -> Result<Order> {
    let id = gen_id();

    InsertBuilder::new("orders")
        .set("id", id.clone())
        .set("provider", input.provider.clone())
        .set("provider_order_id", input.provider_order_id.clone())
        .set_opt("amount_cents", input.amount_cents)
        .set_opt("currency", input.currency.clone())
        .set_opt("customer_phone", input.customer_phone.clone())
        .set_opt("status", input.status.clone())
        .execute(conn)?;

    get_order_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("Order vanished after insert".into()))
}

/// Record an order unless one already exists for the same provider_order_id.
///
/// Returns the stored order and `true` if this call inserted it. A repeated
/// call for the same external transaction returns the original row untouched.
pub fn create_order_if_absent(conn: &Connection, input: &CreateOrder) -> Result<(Order, bool)> {
    let inserted = InsertBuilder::new("orders")
        .set("id", gen_id())
        .set("provider", input.provider.clone())
        .set("provider_order_id", input.provider_order_id.clone())
        .set_opt("amount_cents", input.amount_cents)
        .set_opt("currency", input.currency.clone())
        .set_opt("customer_phone", input.customer_phone.clone())
        .set_opt("status", input.status.clone())
        .on_conflict_do_nothing("provider_order_id")
        .execute(conn)?;

    let order = get_order_by_provider_order_id(conn, &input.provider_order_id)?
        .ok_or_else(|| AppError::Internal("Order missing after insert".into()))?;

    if inserted == 0 {
        tracing::debug!(
            provider_order_id = %input.provider_order_id,
            "Order already recorded"
        );
    }

    Ok((order, inserted > 0))
}

pub fn get_order_by_id(conn: &Connection, id: &str) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE id = ?1", ORDER_COLS),
        [id],
    )
}

pub fn get_order_by_provider_order_id(
    conn: &Connection,
    provider_order_id: &str,
) -> Result<Option<Order>> {
    query_one(
        conn,
        &format!("SELECT {} FROM orders WHERE provider_order_id = ?1", ORDER_COLS),
        [provider_order_id],
    )
}

pub fn update_order_status(conn: &Connection, id: &str, status: &str) -> Result<bool> {
    UpdateBuilder::new("orders", id)
        .set("status", status.to_string())
        .execute(conn)
}

pub fn list_orders_paginated(
    conn: &Connection,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Order>, i64)> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |row| row.get(0))?;
    if limit <= 0 {
        return Ok((Vec::new(), total));
    }
    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM orders ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2",
            ORDER_COLS
        ),
        params![limit, offset],
    )?;
    Ok((items, total))
}

// ============ Licenses ============

/// Store a license. Status, activation flag and issued_at take their column
/// defaults ("valid", false, now).
pub fn create_license(conn: &Connection, input: &CreateLicense) -> Result<License> {
    let id = gen_id();
    let metadata = input.metadata.as_ref().map(json_text).transpose()?;

    InsertBuilder::new("licenses")
        .set("id", id.clone())
        .set("license_key", input.license_key.clone())
        .set_opt("product_sku", input.product_sku.clone())
        .set_opt("order_id", input.order_id.clone())
        .set_opt("issued_to", input.issued_to.clone())
        .set_opt("issued_phone", input.issued_phone.clone())
        .set_opt("issued_email", input.issued_email.clone())
        .set_opt("expires_at", input.expires_at)
        .set_opt("metadata", metadata)
        .execute(conn)?;

    get_license_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("License vanished after insert".into()))
}

pub fn get_license_by_id(conn: &Connection, id: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE id = ?1", LICENSE_COLS),
        [id],
    )
}

pub fn get_license_by_key(conn: &Connection, license_key: &str) -> Result<Option<License>> {
    query_one(
        conn,
        &format!("SELECT {} FROM licenses WHERE license_key = ?1", LICENSE_COLS),
        [license_key],
    )
}

pub fn license_key_exists(conn: &Connection, license_key: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM licenses WHERE license_key = ?1",
            [license_key],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

/// All licenses bought with one order, oldest first.
pub fn list_licenses_for_order(conn: &Connection, order_id: &str) -> Result<Vec<License>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM licenses WHERE order_id = ?1 ORDER BY issued_at, rowid",
            LICENSE_COLS
        ),
        [order_id],
    )
}

/// Partial update of a license's descriptive fields.
pub fn update_license(conn: &Connection, id: &str, input: &UpdateLicense) -> Result<bool> {
    UpdateBuilder::new("licenses", id)
        .set_opt("product_sku", input.product_sku.clone())
        .set_opt("issued_to", input.issued_to.clone())
        .set_opt("issued_phone", input.issued_phone.clone())
        .set_opt("issued_email", input.issued_email.clone())
        .set_opt("status", input.status.clone())
        .set_opt_nullable("expires_at", input.expires_at)
        .execute(conn)
}

pub fn update_license_status(conn: &Connection, id: &str, status: &str) -> Result<bool> {
    UpdateBuilder::new("licenses", id)
        .set("status", status.to_string())
        .execute(conn)
}

pub fn mark_license_activated(conn: &Connection, id: &str) -> Result<bool> {
    UpdateBuilder::new("licenses", id)
        .set("activated", 1_i64)
        .set("activated_at", now())
        .execute(conn)
}

/// Replace the license's metadata document.
pub fn update_license_metadata(
    conn: &Connection,
    id: &str,
    metadata: &serde_json::Value,
) -> Result<bool> {
    UpdateBuilder::new("licenses", id)
        .set("metadata", json_text(metadata)?)
        .execute(conn)
}

// ============ Notification Messages ============

/// Queue an outbound SMS or email. Email-only messages leave `phone` NULL.
pub fn queue_message(conn: &Connection, input: &QueueMessage) -> Result<Message> {
    let id = gen_id();
    let method: &str = input.method.as_ref();

    InsertBuilder::new("sms_messages")
        .set("id", id.clone())
        .set_opt("phone", input.phone.clone())
        .set_opt("email", input.email.clone())
        .set("message", input.message.clone())
        .set("method", method.to_string())
        .set_opt("license_id", input.license_id.clone())
        .execute(conn)?;

    tracing::debug!(message_id = %id, method, "Message queued");

    get_message_by_id(conn, &id)?
        .ok_or_else(|| AppError::Internal("Message vanished after insert".into()))
}

pub fn get_message_by_id(conn: &Connection, id: &str) -> Result<Option<Message>> {
    query_one(
        conn,
        &format!("SELECT {} FROM sms_messages WHERE id = ?1", MESSAGE_COLS),
        [id],
    )
}

/// Messages in one status, oldest first. A non-positive `limit` returns
/// nothing rather than SQLite's unbounded `LIMIT -1`.
pub fn list_messages_by_status(
    conn: &Connection,
    status: &str,
    limit: i64,
) -> Result<Vec<Message>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }
    query_all(
        conn,
        &format!(
            "SELECT {} FROM sms_messages WHERE status = ?1 ORDER BY created_at, rowid LIMIT ?2",
            MESSAGE_COLS
        ),
        params![status, limit],
    )
}

pub fn count_messages_by_status(conn: &Connection, status: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM sms_messages WHERE status = ?1",
        [status],
        |row| row.get(0),
    )
    .map_err(Into::into)
}

/// Claim up to `limit` of the oldest queued messages for delivery.
///
/// Each claimed row moves to "sending", its attempt counter goes up by one and
/// `last_attempt_at` is stamped. The select and the updates share one
/// IMMEDIATE transaction, which takes SQLite's write lock up front, so two
/// workers claiming at the same time never receive the same row.
///
/// Rows sharing a `created_at` second are ordered by `rowid`. The tables have
/// TEXT primary keys, so a `VACUUM` may renumber rowids and reorder such ties.
/// Ordering across distinct seconds is unaffected.
///
/// # PostgreSQL Migration Note
/// The equivalent there is `SELECT ... FOR UPDATE SKIP LOCKED`.
pub fn claim_queued_messages(
    conn: &mut Connection,
    method: Option<DeliveryMethod>,
    limit: i64,
) -> Result<Vec<Message>> {
    if limit <= 0 {
        return Ok(Vec::new());
    }

    let queued: &str = MessageStatus::Queued.as_ref();
    let sending: &str = MessageStatus::Sending.as_ref();
    let method: Option<String> = method.map(|m| m.as_ref().to_string());

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let candidate_ids: Vec<String> = {
        let mut stmt = tx.prepare(
            "SELECT id FROM sms_messages
             WHERE status = ?1 AND (?2 IS NULL OR method = ?2)
             ORDER BY created_at, rowid
             LIMIT ?3",
        )?;
        stmt.query_map(params![queued, method, limit], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    let now = now();
    let mut claimed = Vec::with_capacity(candidate_ids.len());
    for id in &candidate_ids {
        tx.execute(
            "UPDATE sms_messages
             SET status = ?1, attempts = attempts + 1, last_attempt_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![sending, now, id, queued],
        )?;
        if let Some(message) = query_one(
            &tx,
            &format!("SELECT {} FROM sms_messages WHERE id = ?1", MESSAGE_COLS),
            [id],
        )? {
            claimed.push(message);
        }
    }

    tx.commit()?;

    if !claimed.is_empty() {
        tracing::debug!(count = claimed.len(), "Claimed queued messages");
    }

    Ok(claimed)
}

/// Move a row from one status to another only if it is still in `from`.
fn transition_message(
    conn: &Connection,
    id: &str,
    from: &[MessageStatus],
    to: MessageStatus,
    extra_sets: &str,
    extra_values: Vec<Value>,
) -> Result<bool> {
    let from_list: Vec<String> = from
        .iter()
        .map(|s| {
            let name: &str = s.as_ref();
            format!("'{}'", name)
        })
        .collect();
    let sql = format!(
        "UPDATE sms_messages SET status = ?{}{} WHERE id = ?{} AND status IN ({})",
        extra_values.len() + 1,
        extra_sets,
        extra_values.len() + 2,
        from_list.join(", ")
    );
    let mut values = extra_values;
    let to: &str = to.as_ref();
    values.push(to.to_string().into());
    values.push(id.to_string().into());
    let affected = conn.execute(&sql, rusqlite::params_from_iter(values))?;
    Ok(affected > 0)
}

/// Record a successful delivery. Only messages currently "sending" change.
pub fn mark_message_sent(
    conn: &Connection,
    id: &str,
    response: &serde_json::Value,
) -> Result<bool> {
    let updated = transition_message(
        conn,
        id,
        &[MessageStatus::Sending],
        MessageStatus::Sent,
        ", sent_at = ?1, response_json = ?2",
        vec![now().into(), json_text(response)?.into()],
    )?;
    if updated {
        tracing::info!(message_id = %id, "Message marked sent");
    }
    Ok(updated)
}

/// Record a failed delivery with its error document. Only "sending" rows change.
pub fn mark_message_failed(
    conn: &Connection,
    id: &str,
    error: &serde_json::Value,
) -> Result<bool> {
    let updated = transition_message(
        conn,
        id,
        &[MessageStatus::Sending],
        MessageStatus::Failed,
        ", last_attempt_at = ?1, response_json = ?2",
        vec![now().into(), json_text(error)?.into()],
    )?;
    if updated {
        tracing::warn!(message_id = %id, "Message marked failed");
    }
    Ok(updated)
}

/// Put a sending or failed message back in the queue. The attempt counter is kept.
pub fn requeue_message(conn: &Connection, id: &str) -> Result<bool> {
    transition_message(
        conn,
        id,
        &[MessageStatus::Sending, MessageStatus::Failed],
        MessageStatus::Queued,
        "",
        Vec::new(),
    )
}

// ============ License Activations ============

pub fn record_activation(
    conn: &Connection,
    license_id: &str,
    terminal_id: &str,
) -> Result<LicenseActivation> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO license_activations (id, license_id, terminal_id, activated_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![&id, license_id, terminal_id, now],
    )?;

    Ok(LicenseActivation {
        id,
        license_id: license_id.to_string(),
        terminal_id: terminal_id.to_string(),
        activated_at: now,
    })
}

/// Record an activation and flag the license as activated in one transaction.
///
/// No limit on terminals or repeat activations is applied here; callers that
/// need one should consult `get_last_activation_terminal` or
/// `count_distinct_terminals` first.
pub fn activate_license(
    conn: &mut Connection,
    license_id: &str,
    terminal_id: &str,
) -> Result<LicenseActivation> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let activation = record_activation(&tx, license_id, terminal_id)?;

    tx.execute(
        "UPDATE licenses SET activated = 1, activated_at = ?1 WHERE id = ?2",
        params![activation.activated_at, license_id],
    )?;

    tx.commit()?;

    tracing::info!(
        license_id = %license_id,
        terminal_id = %terminal_id,
        "License activated"
    );

    Ok(activation)
}

/// Terminal of the most recent activation, if the license was ever activated.
pub fn get_last_activation_terminal(conn: &Connection, license_id: &str) -> Result<Option<String>> {
    let terminal = conn
        .query_row(
            "SELECT terminal_id FROM license_activations
             WHERE license_id = ?1
             ORDER BY activated_at DESC, rowid DESC
             LIMIT 1",
            [license_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(terminal)
}

pub fn list_activations_for_license(
    conn: &Connection,
    license_id: &str,
) -> Result<Vec<LicenseActivation>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM license_activations WHERE license_id = ?1 ORDER BY activated_at DESC, rowid DESC",
            ACTIVATION_COLS
        ),
        [license_id],
    )
}

pub fn count_distinct_terminals(conn: &Connection, license_id: &str) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(DISTINCT terminal_id) FROM license_activations WHERE license_id = ?1",
        [license_id],
        |row| row.get(0),
    )
    .map_err(Into::into)
}
