use crate::errors::Result;
use crate::model::Gateway;
use crate::store::GatewayStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Process-wide id generator. Values start at 1 and are never handed out twice.
#[derive(Debug)]
pub struct Sequence {
    last: AtomicI64,
}

impl Sequence {
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(0),
        }
    }

    pub fn next(&self) -> i64 {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new()
    }
}

/// Gateway store held in process memory; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    gateways: RwLock<BTreeMap<i64, Gateway>>,
    ids: Sequence,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GatewayStore for MemoryStore {
    async fn list(&self) -> Result<Vec<Gateway>> {
        Ok(self.gateways.read().values().cloned().collect())
    }

    async fn get(&self, id: i64) -> Result<Option<Gateway>> {
        Ok(self.gateways.read().get(&id).cloned())
    }

    async fn create(&self, name: &str, ipv4: &str) -> Result<i64> {
        let id = self.ids.next();
        let gateway = Gateway {
            id,
            name: name.to_string(),
            ipv4: ipv4.to_string(),
            devices: Vec::new(),
        };
        self.gateways.write().insert(id, gateway);
        Ok(id)
    }

    async fn save(&self, gateway: &Gateway) -> Result<bool> {
        let mut gateways = self.gateways.write();
        match gateways.get_mut(&gateway.id) {
            Some(stored) => {
                *stored = gateway.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        Ok(self.gateways.write().remove(&id).is_some())
    }
}
