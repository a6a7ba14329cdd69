use crate::errors::Error;
use crate::metrics::{CAPACITY_REJECTIONS_TOTAL, STORE_FAILURES_TOTAL, VALIDATION_FAILURES_TOTAL};
use crate::model::{Device, DeviceInput, Gateway, GatewayPatch, NewGateway};
use crate::service::GatewayService;
use crate::validate::FieldError;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::{debug, error, warn};

#[derive(Clone)]
struct AppState {
    service: GatewayService,
}

pub fn create_router(service: GatewayService) -> Router {
    let state = AppState { service };

    Router::new()
        .route("/gateway", get(list_gateways).post(create_gateway))
        .route(
            "/gateway/:id",
            get(get_gateway).put(update_gateway).delete(delete_gateway),
        )
        .route("/gateway/:id/device", get(list_devices).post(add_device))
        .route(
            "/gateway/:id/device/:device_id",
            get(get_device).put(update_device).delete(remove_device),
        )
        .with_state(state)
}

async fn list_gateways(State(state): State<AppState>) -> Result<Json<Vec<Gateway>>, AppError> {
    Ok(Json(state.service.list_gateways().await?))
}

async fn get_gateway(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Gateway>, AppError> {
    Ok(Json(state.service.get_gateway(id).await?))
}

async fn create_gateway(
    State(state): State<AppState>,
    payload: Result<Json<NewGateway>, JsonRejection>,
) -> Result<Json<i64>, AppError> {
    let input = body(payload)?;
    let id = state
        .service
        .create_gateway(input)
        .await
        .map_err(on_store(StatusCode::NOT_IMPLEMENTED))?;
    Ok(Json(id))
}

async fn update_gateway(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<GatewayPatch>, JsonRejection>,
) -> Result<Json<Gateway>, AppError> {
    let patch = body(payload)?;
    let gateway = state
        .service
        .update_gateway(id, patch)
        .await
        .map_err(on_store(StatusCode::BAD_REQUEST))?;
    Ok(Json(gateway))
}

async fn delete_gateway(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<&'static str, AppError> {
    state
        .service
        .delete_gateway(id)
        .await
        .map_err(on_store(StatusCode::BAD_REQUEST))?;
    Ok("deleted")
}

async fn list_devices(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Device>>, AppError> {
    Ok(Json(state.service.list_devices(id).await?))
}

async fn get_device(
    State(state): State<AppState>,
    Path((id, device_id)): Path<(i64, String)>,
) -> Result<Json<Device>, AppError> {
    Ok(Json(state.service.get_device(id, &device_id).await?))
}

async fn add_device(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<DeviceInput>, JsonRejection>,
) -> Result<Json<Vec<Device>>, AppError> {
    let input = body(payload)?;
    let devices = state
        .service
        .add_device(id, input)
        .await
        .map_err(on_store(StatusCode::NOT_IMPLEMENTED))?;
    Ok(Json(devices))
}

async fn update_device(
    State(state): State<AppState>,
    Path((id, device_id)): Path<(i64, String)>,
    payload: Result<Json<DeviceInput>, JsonRejection>,
) -> Result<Json<Gateway>, AppError> {
    let input = body(payload)?;
    let gateway = state
        .service
        .update_device(id, &device_id, input)
        .await
        .map_err(on_store(StatusCode::BAD_REQUEST))?;
    Ok(Json(gateway))
}

async fn remove_device(
    State(state): State<AppState>,
    Path((id, device_id)): Path<(i64, String)>,
) -> Result<&'static str, AppError> {
    state
        .service
        .remove_device(id, &device_id)
        .await
        .map_err(on_store(StatusCode::BAD_REQUEST))?;
    Ok("device deleted")
}

/// Unreadable or mistyped bodies are reported like any other field error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(Error::Validation(vec![FieldError::new(
            "body",
            rejection.body_text(),
            None,
        )])
        .into()),
    }
}

/// Status used for store failures on routes that don't answer them with a 500.
fn on_store(status: StatusCode) -> impl FnOnce(Error) -> AppError {
    move |error| AppError {
        error,
        store_status: status,
    }
}

struct AppError {
    error: Error,
    store_status: StatusCode,
}

impl From<Error> for AppError {
    fn from(error: Error) -> Self {
        Self {
            error,
            store_status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.error {
            Error::Validation(errors) => {
                VALIDATION_FAILURES_TOTAL.inc();
                debug!("Rejected request with {} field errors", errors.len());
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response()
            }
            Error::GatewayNotFound(id) => {
                debug!("Gateway {} not found", id);
                (StatusCode::BAD_REQUEST, "gateway not found").into_response()
            }
            Error::DeviceNotFound(device_id) => {
                debug!("Device {} not found", device_id);
                (StatusCode::BAD_REQUEST, "device not found").into_response()
            }
            Error::CapacityExceeded(max) => {
                CAPACITY_REJECTIONS_TOTAL.inc();
                let message = Error::CapacityExceeded(max).to_string();
                warn!("{}", message);
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            e @ (Error::Database(_) | Error::Migration(_)) => {
                STORE_FAILURES_TOTAL.inc();
                error!("Store failure: {}", e);
                (self.store_status, Json(json!({ "error": ["server error"] }))).into_response()
            }
        }
    }
}
