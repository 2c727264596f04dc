use serde::{Deserialize, Serialize};

/// One terminal activating one license. Repeated rows for the same pair are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LicenseActivation {
    pub id: String,
    pub license_id: String,
    pub terminal_id: String,
    pub activated_at: i64,
}
