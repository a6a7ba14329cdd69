use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

const NOUNS: &[&str] = &[
    "edge", "core", "relay", "bridge", "hub", "uplink", "mesh", "spine", "access", "border",
];

const VENDORS: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Hooli", "Stark", "Wayne", "Cyberdyne", "Tyrell",
];

#[derive(Debug, Clone, Serialize)]
pub struct NewGateway {
    pub name: String,
    pub ipv4: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDevice {
    pub vendor: String,
    pub online: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    pub id: String,
    pub vendor: String,
}

pub fn gateway(rng: &mut impl Rng) -> NewGateway {
    let noun = NOUNS.choose(rng).copied().unwrap_or("gw");
    NewGateway {
        // stays within the registry's 20 character limit
        name: format!("{}-{}", noun, rng.gen_range(0..10_000)),
        ipv4: format!(
            "10.{}.{}.{}",
            rng.gen::<u8>(),
            rng.gen::<u8>(),
            rng.gen_range(1..255)
        ),
    }
}

pub fn device(rng: &mut impl Rng) -> NewDevice {
    NewDevice {
        vendor: VENDORS.choose(rng).copied().unwrap_or("Generic").to_string(),
        // most devices come up online
        online: rng.gen_bool(0.8),
    }
}
