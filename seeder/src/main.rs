mod fixtures;

use anyhow::{bail, Context};
use clap::Parser;
use reqwest::{Client, StatusCode};
use tracing::{info, warn};

/// Populates a running gateway registry with random gateways and devices
#[derive(Debug, Parser)]
#[command(name = "seeder", version)]
struct Args {
    /// Base URL of the registry
    #[arg(long, env = "REGISTRY_URL", default_value = "http://localhost:3000")]
    url: String,

    /// Number of gateways to create
    #[arg(long, env = "GATEWAYS", default_value_t = 5)]
    gateways: usize,

    /// Devices to attach to each gateway
    #[arg(long, env = "DEVICES", default_value_t = 3)]
    devices: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    info!("Starting gateway seeder");
    info!(
        "Registry: {}, Gateways: {}, Devices per gateway: {}",
        args.url, args.gateways, args.devices
    );

    let client = Client::new();
    let mut rng = rand::thread_rng();
    let mut created_devices = 0usize;

    for _ in 0..args.gateways {
        let gateway = fixtures::gateway(&mut rng);
        let response = client
            .post(format!("{}/gateway", args.url))
            .json(&gateway)
            .send()
            .await
            .with_context(|| format!("Failed to reach registry at {}", args.url))?;

        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Registry rejected gateway {:?}: {} {}", gateway, status, body);
        }
        let id: i64 = response.json().await.context("Unexpected gateway id")?;
        info!("Created gateway {} ({}, {})", id, gateway.name, gateway.ipv4);

        for _ in 0..args.devices {
            let device = fixtures::device(&mut rng);
            let response = client
                .post(format!("{}/gateway/{}/device", args.url, id))
                .json(&device)
                .send()
                .await
                .with_context(|| format!("Failed to reach registry at {}", args.url))?;

            if response.status() != StatusCode::OK {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                // a full gateway is expected once DEVICES exceeds the registry's cap
                warn!("Device rejected on gateway {}: {} {}", id, status, body);
                continue;
            }

            let devices: Vec<fixtures::Device> = response.json().await?;
            if let Some(added) = devices.last() {
                info!("  Added device {} ({})", added.id, added.vendor);
            }
            created_devices += 1;
        }
    }

    info!(
        "Seeded {} gateways with {} devices",
        args.gateways, created_devices
    );
    Ok(())
}
