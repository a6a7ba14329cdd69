use crate::errors::{Error, Result};
use crate::metrics::{
    DEVICES_ADDED_TOTAL, DEVICES_REMOVED_TOTAL, GATEWAYS_CREATED_TOTAL, GATEWAYS_DELETED_TOTAL,
};
use crate::model::{Device, DeviceInput, Gateway, GatewayPatch, NewGateway};
use crate::store::GatewayStore;
use crate::validate;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MAX_DEVICES: usize = 10;

/// Business rules for gateways and their devices.
///
/// Every mutating operation validates its input, loads the gateway, applies
/// the change to the loaded copy, and only then writes it back. A rejected
/// request therefore never reaches the store.
#[derive(Clone)]
pub struct GatewayService {
    store: Arc<dyn GatewayStore>,
    max_devices: usize,
}

impl GatewayService {
    pub fn new(store: Arc<dyn GatewayStore>, max_devices: usize) -> Self {
        Self { store, max_devices }
    }

    pub async fn list_gateways(&self) -> Result<Vec<Gateway>> {
        self.store.list().await
    }

    pub async fn get_gateway(&self, id: i64) -> Result<Gateway> {
        self.store
            .get(id)
            .await?
            .ok_or(Error::GatewayNotFound(id))
    }

    pub async fn create_gateway(&self, input: NewGateway) -> Result<i64> {
        let valid = validate::new_gateway(input)?;
        let id = self.store.create(&valid.name, &valid.ipv4).await?;

        GATEWAYS_CREATED_TOTAL.inc();
        info!("Created gateway {} ({}, {})", id, valid.name, valid.ipv4);
        Ok(id)
    }

    pub async fn update_gateway(&self, id: i64, patch: GatewayPatch) -> Result<Gateway> {
        let patch = validate::gateway_patch(patch)?;
        let mut gateway = self.get_gateway(id).await?;

        if let Some(name) = patch.name {
            gateway.name = name;
        }
        if let Some(ipv4) = patch.ipv4 {
            gateway.ipv4 = ipv4;
        }

        self.persist(&gateway).await?;
        debug!("Updated gateway {}", id);
        Ok(gateway)
    }

    pub async fn delete_gateway(&self, id: i64) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(Error::GatewayNotFound(id));
        }

        GATEWAYS_DELETED_TOTAL.inc();
        info!("Deleted gateway {}", id);
        Ok(())
    }

    pub async fn list_devices(&self, id: i64) -> Result<Vec<Device>> {
        Ok(self.get_gateway(id).await?.devices)
    }

    pub async fn get_device(&self, id: i64, device_id: &str) -> Result<Device> {
        let gateway = self.get_gateway(id).await?;
        gateway
            .devices
            .into_iter()
            .find(|d| d.id == device_id)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))
    }

    /// Appends a device and returns the gateway's resulting device list.
    ///
    /// Field errors win over a full gateway; the capacity check runs before
    /// the list is touched.
    pub async fn add_device(&self, id: i64, input: DeviceInput) -> Result<Vec<Device>> {
        let valid = validate::device(input)?;
        let mut gateway = self.get_gateway(id).await?;

        if gateway.devices.len() >= self.max_devices {
            return Err(Error::CapacityExceeded(self.max_devices));
        }

        let device = Device::new(valid.vendor, valid.online);
        debug!("Adding device {} to gateway {}", device.id, id);
        gateway.devices.push(device);

        self.persist(&gateway).await?;
        DEVICES_ADDED_TOTAL.inc();
        Ok(gateway.devices)
    }

    /// Replaces vendor and online state; the device id and creation time stay.
    pub async fn update_device(
        &self,
        id: i64,
        device_id: &str,
        input: DeviceInput,
    ) -> Result<Gateway> {
        let valid = validate::device(input)?;
        let mut gateway = self.get_gateway(id).await?;

        let device = gateway
            .devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))?;
        device.vendor = valid.vendor;
        device.online = valid.online;

        self.persist(&gateway).await?;
        debug!("Updated device {} on gateway {}", device_id, id);
        Ok(gateway)
    }

    pub async fn remove_device(&self, id: i64, device_id: &str) -> Result<()> {
        let mut gateway = self.get_gateway(id).await?;

        let index = gateway
            .devices
            .iter()
            .position(|d| d.id == device_id)
            .ok_or_else(|| Error::DeviceNotFound(device_id.to_string()))?;
        // Vec::remove shifts the tail, keeping the remaining order
        gateway.devices.remove(index);

        self.persist(&gateway).await?;
        DEVICES_REMOVED_TOTAL.inc();
        debug!("Removed device {} from gateway {}", device_id, id);
        Ok(())
    }

    async fn persist(&self, gateway: &Gateway) -> Result<()> {
        if self.store.save(gateway).await? {
            Ok(())
        } else {
            // deleted between load and save
            Err(Error::GatewayNotFound(gateway.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn service(max_devices: usize) -> GatewayService {
        GatewayService::new(Arc::new(MemoryStore::new()), max_devices)
    }

    fn new_gateway(name: &str, ipv4: &str) -> NewGateway {
        NewGateway {
            name: Some(name.to_string()),
            ipv4: Some(ipv4.to_string()),
        }
    }

    fn device(vendor: &str, online: bool) -> DeviceInput {
        DeviceInput {
            vendor: Some(vendor.to_string()),
            online: Some(online),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_increasing_ids() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let mut previous = 0;
        for i in 0..5 {
            let id = svc
                .create_gateway(new_gateway(&format!("gw-{}", i), "192.168.1.1"))
                .await
                .unwrap();
            assert!(id > previous);
            previous = id;
        }
        assert_eq!(previous, 5);
    }

    #[tokio::test]
    async fn test_invalid_create_persists_nothing() {
        let svc = service(DEFAULT_MAX_DEVICES);

        let err = svc
            .create_gateway(new_gateway("x", "10.0.0.1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = svc
            .create_gateway(new_gateway("router1", "10.0.0.999"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        assert!(svc.list_gateways().await.unwrap().is_empty());
        // rejected creates don't consume ids in the memory store
        assert_eq!(
            svc.create_gateway(new_gateway("router1", "10.0.0.1"))
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_gateway_lifecycle() {
        let svc = service(DEFAULT_MAX_DEVICES);

        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let updated = svc
            .update_gateway(
                id,
                GatewayPatch {
                    name: Some(Some("router2".to_string())),
                    ipv4: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, 1);
        assert_eq!(updated.name, "router2");
        assert_eq!(updated.ipv4, "10.0.0.1");

        let devices = svc.add_device(id, device("Acme", true)).await.unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].vendor, "Acme");
        assert!(devices[0].online);

        svc.delete_gateway(id).await.unwrap();
        assert!(matches!(
            svc.get_gateway(id).await,
            Err(Error::GatewayNotFound(1))
        ));
        assert!(matches!(
            svc.list_devices(id).await,
            Err(Error::GatewayNotFound(1))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_gateway() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let err = svc
            .update_gateway(7, GatewayPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GatewayNotFound(7)));
    }

    #[tokio::test]
    async fn test_invalid_update_leaves_gateway_unchanged() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();

        let err = svc
            .update_gateway(
                id,
                GatewayPatch {
                    name: Some(Some("router2".to_string())),
                    ipv4: Some(Some("not-an-ip".to_string())),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let gateway = svc.get_gateway(id).await.unwrap();
        assert_eq!(gateway.name, "router1");
        assert_eq!(gateway.ipv4, "10.0.0.1");
    }

    #[tokio::test]
    async fn test_delete_unknown_gateway() {
        let svc = service(DEFAULT_MAX_DEVICES);
        assert!(matches!(
            svc.delete_gateway(3).await,
            Err(Error::GatewayNotFound(3))
        ));
    }

    #[tokio::test]
    async fn test_add_device_up_to_capacity() {
        let svc = service(10);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();

        for i in 0..10 {
            let devices = svc
                .add_device(id, device(&format!("vendor-{}", i), i % 2 == 0))
                .await
                .unwrap();
            assert_eq!(devices.len(), i + 1);
        }

        let err = svc.add_device(id, device("Acme", true)).await.unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded(10)));

        let devices = svc.list_devices(id).await.unwrap();
        assert_eq!(devices.len(), 10);
        let vendors: Vec<String> = devices.iter().map(|d| d.vendor.clone()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("vendor-{}", i)).collect();
        assert_eq!(vendors, expected);
    }

    #[tokio::test]
    async fn test_configured_capacity_is_honoured() {
        let svc = service(2);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();

        svc.add_device(id, device("Acme", true)).await.unwrap();
        svc.add_device(id, device("Acme", true)).await.unwrap();
        let err = svc.add_device(id, device("Acme", true)).await.unwrap_err();
        assert_eq!(err.to_string(), "gateway cannot have more than 2 devices");
    }

    #[tokio::test]
    async fn test_validation_takes_precedence_over_capacity() {
        let svc = service(1);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        svc.add_device(id, device("Acme", true)).await.unwrap();

        let err = svc.add_device(id, device("A", true)).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_add_device_unknown_gateway() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let err = svc.add_device(42, device("Acme", true)).await.unwrap_err();
        assert!(matches!(err, Error::GatewayNotFound(42)));
    }

    #[tokio::test]
    async fn test_device_ids_unique_within_gateway() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        for _ in 0..5 {
            svc.add_device(id, device("Acme", true)).await.unwrap();
        }

        let mut ids: Vec<String> = svc
            .list_devices(id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 5);
    }

    #[tokio::test]
    async fn test_get_device_checks_gateway_then_device() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        let devices = svc.add_device(id, device("Acme", false)).await.unwrap();

        let found = svc.get_device(id, &devices[0].id).await.unwrap();
        assert_eq!(found, devices[0]);

        assert!(matches!(
            svc.get_device(id, "missing").await,
            Err(Error::DeviceNotFound(_))
        ));
        assert!(matches!(
            svc.get_device(id + 1, &devices[0].id).await,
            Err(Error::GatewayNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_device_keeps_identity() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        let before = svc.add_device(id, device("Acme", true)).await.unwrap()[0].clone();

        let gateway = svc
            .update_device(id, &before.id, device("Globex", false))
            .await
            .unwrap();
        let after = &gateway.devices[0];

        assert_eq!(after.id, before.id);
        assert_eq!(after.created, before.created);
        assert_eq!(after.vendor, "Globex");
        assert!(!after.online);
    }

    #[tokio::test]
    async fn test_update_device_requires_both_fields() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        let before = svc.add_device(id, device("Acme", true)).await.unwrap()[0].clone();

        let err = svc
            .update_device(
                id,
                &before.id,
                DeviceInput {
                    vendor: Some("Globex".to_string()),
                    online: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(svc.get_device(id, &before.id).await.unwrap(), before);

        assert!(matches!(
            svc.update_device(id, "missing", device("Globex", false))
                .await,
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_device_preserves_order() {
        let svc = service(DEFAULT_MAX_DEVICES);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        for vendor in ["A-corp", "B-corp", "C-corp", "D-corp"] {
            svc.add_device(id, device(vendor, true)).await.unwrap();
        }
        let devices = svc.list_devices(id).await.unwrap();

        svc.remove_device(id, &devices[1].id).await.unwrap();

        let remaining: Vec<String> = svc
            .list_devices(id)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.vendor)
            .collect();
        assert_eq!(remaining, vec!["A-corp", "C-corp", "D-corp"]);

        assert!(matches!(
            svc.remove_device(id, &devices[1].id).await,
            Err(Error::DeviceNotFound(_))
        ));
        assert!(matches!(
            svc.remove_device(id + 1, &devices[0].id).await,
            Err(Error::GatewayNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_removing_a_device_frees_capacity() {
        let svc = service(1);
        let id = svc
            .create_gateway(new_gateway("router1", "10.0.0.1"))
            .await
            .unwrap();
        let devices = svc.add_device(id, device("Acme", true)).await.unwrap();

        svc.remove_device(id, &devices[0].id).await.unwrap();
        assert_eq!(svc.add_device(id, device("Globex", true)).await.unwrap().len(), 1);
    }
}
