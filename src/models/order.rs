use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Status values written by this crate. The column itself is an open string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Paid,
}

/// A purchase recorded by a payment/commerce provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub provider: String,
    /// Provider-side transaction id, unique across all orders
    pub provider_order_id: String,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub customer_phone: Option<String>,
    pub status: String,
    pub created_at: i64,
}

impl Order {
    pub fn has_status(&self, status: OrderStatus) -> bool {
        let expected: &str = status.as_ref();
        self.status == expected
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateOrder {
    pub provider: String,
    pub provider_order_id: String,
    #[serde(default)]
    pub amount_cents: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// None keeps the column default ("pending")
    #[serde(default)]
    pub status: Option<String>,
}
