use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Device identity pushed into the store at collection-session start.
/// `device_id` is the natural key used for the idempotent upsert; the store
/// hands back the surrogate key the rest of the schema references.
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub device_id: String,
    pub device_name: String,
    pub device_type: String,
    pub ip_address: String,
    pub mac_address: Option<String>,
    pub firmware_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Circuit {
    pub id: i64,
    pub device_id: i64,
    pub circuit_number: i32,
    pub circuit_name: String,
    pub circuit_description: Option<String>,
    pub circuit_type: String,
    pub max_amperage: i32,
    pub is_active: bool,
}

/// Default attributes used when provisioning a circuit that does not exist
/// yet. Seeding never overwrites user-edited rows.
#[derive(Debug, Clone)]
pub struct CircuitSeed {
    pub circuit_name: String,
    pub circuit_description: Option<String>,
    pub circuit_type: String,
    pub max_amperage: i32,
}
