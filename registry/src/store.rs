use crate::errors::Result;
use crate::model::Gateway;
use async_trait::async_trait;

/// Persistence for gateway documents.
///
/// A gateway is read and written as a whole, devices included. Stores carry
/// no business rules: validation and the device cap live in the service.
#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// All gateways ordered by id ascending
    async fn list(&self) -> Result<Vec<Gateway>>;

    async fn get(&self, id: i64) -> Result<Option<Gateway>>;

    /// Persists a gateway with no devices and returns its freshly assigned id.
    /// Ids start at 1 and are never handed out twice.
    async fn create(&self, name: &str, ipv4: &str) -> Result<i64>;

    /// Replaces the stored gateway, devices included, with `gateway`.
    /// Returns `false` if no gateway with that id exists.
    async fn save(&self, gateway: &Gateway) -> Result<bool>;

    /// Removes the gateway and its devices. Returns `false` if nothing was deleted.
    async fn delete(&self, id: i64) -> Result<bool>;
}
