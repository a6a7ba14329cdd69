use crate::errors::{Error, Result};
use crate::model::{DeviceInput, GatewayPatch, NewGateway};
use serde::Serialize;
use serde_json::Value;
use std::net::Ipv4Addr;

const NAME_MIN: usize = 2;
const NAME_MAX: usize = 20;
const VENDOR_MIN: usize = 2;
const VENDOR_MAX: usize = 20;

/// A single rejected field, reported back to the client
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(param: &str, msg: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            param: param.to_string(),
            msg: msg.into(),
            value,
        }
    }
}

/// Accepted fields of a new gateway
#[derive(Debug, Clone, PartialEq)]
pub struct ValidGateway {
    pub name: String,
    pub ipv4: String,
}

/// Accepted fields of a partial gateway update; `None` keeps the stored value
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidPatch {
    pub name: Option<String>,
    pub ipv4: Option<String>,
}

/// Accepted fields of a new or replaced device
#[derive(Debug, Clone, PartialEq)]
pub struct ValidDevice {
    pub vendor: String,
    pub online: bool,
}

/// Validates the body of a gateway creation
pub fn new_gateway(input: NewGateway) -> Result<ValidGateway> {
    let mut errors = Vec::new();

    let name = required(&mut errors, "name", input.name)
        .and_then(|name| length(&mut errors, "name", name, NAME_MIN, NAME_MAX));
    let ipv4 = required(&mut errors, "ipv4", input.ipv4).and_then(|ip| ipv4(&mut errors, ip));

    match (name, ipv4) {
        (Some(name), Some(ipv4)) if errors.is_empty() => Ok(ValidGateway { name, ipv4 }),
        _ => Err(Error::Validation(errors)),
    }
}

/// Validates a partial gateway update. Only the supplied fields are checked;
/// an explicit `null` counts as supplied.
pub fn gateway_patch(input: GatewayPatch) -> Result<ValidPatch> {
    let mut errors = Vec::new();

    let name = input
        .name
        .and_then(|name| not_null(&mut errors, "name", name))
        .and_then(|name| length(&mut errors, "name", name, NAME_MIN, NAME_MAX));
    let ipv4 = input
        .ipv4
        .and_then(|ip| not_null(&mut errors, "ipv4", ip))
        .and_then(|ip| ipv4(&mut errors, ip));

    if errors.is_empty() {
        Ok(ValidPatch { name, ipv4 })
    } else {
        Err(Error::Validation(errors))
    }
}

/// Validates a device body; both fields are required
pub fn device(input: DeviceInput) -> Result<ValidDevice> {
    let mut errors = Vec::new();

    let vendor = required(&mut errors, "vendor", input.vendor)
        .and_then(|vendor| length(&mut errors, "vendor", vendor, VENDOR_MIN, VENDOR_MAX));
    let online = required(&mut errors, "online", input.online);

    match (vendor, online) {
        (Some(vendor), Some(online)) if errors.is_empty() => Ok(ValidDevice { vendor, online }),
        _ => Err(Error::Validation(errors)),
    }
}

fn required<T>(errors: &mut Vec<FieldError>, param: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.push(FieldError::new(param, format!("{} is required", param), None));
    }
    value
}

fn not_null<T>(errors: &mut Vec<FieldError>, param: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.push(FieldError::new(
            param,
            format!("{} must not be null", param),
            Some(Value::Null),
        ));
    }
    value
}

fn length(
    errors: &mut Vec<FieldError>,
    param: &str,
    value: String,
    min: usize,
    max: usize,
) -> Option<String> {
    let len = value.chars().count();
    if len < min || len > max {
        errors.push(FieldError::new(
            param,
            format!("{} must be between {} and {} characters", param, min, max),
            Some(Value::String(value)),
        ));
        return None;
    }
    Some(value)
}

fn ipv4(errors: &mut Vec<FieldError>, value: String) -> Option<String> {
    if value.parse::<Ipv4Addr>().is_err() {
        errors.push(FieldError::new(
            "ipv4",
            "ipv4 must be a valid IPv4 address",
            Some(Value::String(value)),
        ));
        return None;
    }
    Some(value)
}
