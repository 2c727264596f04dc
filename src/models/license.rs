use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LicenseStatus {
    Valid,
    Revoked,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    /// The credential itself, unique across all licenses
    pub license_key: String,
    pub product_sku: Option<String>,
    pub order_id: Option<String>,
    pub issued_to: Option<String>,
    pub issued_phone: Option<String>,
    pub issued_email: Option<String>,
    pub issued_at: i64,
    /// None = never expires
    pub expires_at: Option<i64>,
    pub status: String,
    pub activated: bool,
    pub activated_at: Option<i64>,
    pub metadata: Option<Value>,
}

impl License {
    pub fn has_status(&self, status: LicenseStatus) -> bool {
        let expected: &str = status.as_ref();
        self.status == expected
    }

    /// Whether `expires_at` lies before `now`. Licenses without an expiry never expire.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp < now)
    }

    /// Usable at `now`: not revoked, not marked expired, and not past its expiry.
    pub fn is_valid_at(&self, now: i64) -> bool {
        !self.has_status(LicenseStatus::Revoked)
            && !self.has_status(LicenseStatus::Expired)
            && !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLicense {
    pub license_key: String,
    #[serde(default)]
    pub product_sku: Option<String>,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub issued_to: Option<String>,
    #[serde(default)]
    pub issued_phone: Option<String>,
    #[serde(default)]
    pub issued_email: Option<String>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Partial update. For `expires_at`, `Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLicense {
    #[serde(default)]
    pub product_sku: Option<String>,
    #[serde(default)]
    pub issued_to: Option<String>,
    #[serde(default)]
    pub issued_phone: Option<String>,
    #[serde(default)]
    pub issued_email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub expires_at: Option<Option<i64>>,
}

/// Distinguish an absent field (None) from an explicit null (Some(None)).
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}
