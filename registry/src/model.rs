use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A network gateway and the devices attached to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: i64,
    pub name: String,
    pub ipv4: String,
    pub devices: Vec<Device>,
}

/// A device owned by a single gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Device {
    pub id: String,
    pub vendor: String,
    pub online: bool,
    pub created: DateTime<Utc>,
}

impl Device {
    pub fn new(vendor: String, online: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            vendor,
            online,
            // TIMESTAMPTZ stores microseconds
            created: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Gateway columns without the owned devices
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GatewayRow {
    pub id: i64,
    pub name: String,
    pub ipv4: String,
}

impl GatewayRow {
    pub fn with_devices(self, devices: Vec<Device>) -> Gateway {
        Gateway {
            id: self.id,
            name: self.name,
            ipv4: self.ipv4,
            devices,
        }
    }
}

/// Body of `POST /gateway`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGateway {
    pub name: Option<String>,
    pub ipv4: Option<String>,
}

/// Body of `PUT /gateway/:id`.
///
/// The outer `Option` is `None` when the field is absent (left untouched);
/// `Some(None)` is an explicit `null`, which validation rejects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayPatch {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ipv4: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Body of `POST /gateway/:id/device` and `PUT /gateway/:id/device/:device_id`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInput {
    pub vendor: Option<String>,
    pub online: Option<bool>,
}
