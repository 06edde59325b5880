use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{
        Path, State,
        rejection::{BytesRejection, JsonRejection},
    },
    http::{HeaderMap, StatusCode, header},
};
use splitbill_core::{
    Allocation, ChargeConfig, ChargeUpdate, ExtractionError, ExtractionOutcome, ItemId, LineItem,
    Person, PersonId, ReceiptImage,
};
use tracing::{error, info, instrument};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::gemini::check_image;
use crate::types::{
    AddItemRequest, AddPersonRequest, AssignAllResponse, BillSnapshot, HealthResponse,
    ToggleRequest, ToggleResponse, UsageResponse,
};

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let processing = state.read_session()?.is_processing();
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.elapsed().as_secs(),
        processing,
    }))
}

pub async fn get_bill(State(state): State<Arc<AppState>>) -> ApiResult<Json<BillSnapshot>> {
    let session = state.read_session()?;
    Ok(Json(BillSnapshot::from(&*session)))
}

pub async fn get_totals(State(state): State<Arc<AppState>>) -> ApiResult<Json<Allocation>> {
    Ok(Json(state.read_session()?.allocation()))
}

/// Unwrap a JSON body, reporting decode failures in the API error format
fn json_body<T>(state: &AppState, payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(state.payload_too_large())
        }
        Err(rejection) => Err(rejection.into()),
    }
}

pub async fn add_person(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddPersonRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Person>)> {
    let request = json_body(&state, payload)?;
    let person = state.write_session()?.add_person(&request.name)?;
    Ok((StatusCode::CREATED, Json(person)))
}

pub async fn remove_person(
    State(state): State<Arc<AppState>>,
    Path(id): Path<PersonId>,
) -> ApiResult<StatusCode> {
    state.write_session()?.remove_person(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<LineItem>)> {
    let request = json_body(&state, payload)?;
    let item = state.write_session()?.add_item(&request.name, request.price)?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> ApiResult<StatusCode> {
    state.write_session()?.remove_item(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn assign_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<ItemId>,
) -> ApiResult<Json<AssignAllResponse>> {
    let person_ids = state.write_session()?.assign_all(id)?;
    Ok(Json(AssignAllResponse { item_id: id, person_ids }))
}

pub async fn toggle_assignment(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ToggleRequest>, JsonRejection>,
) -> ApiResult<Json<ToggleResponse>> {
    let request = json_body(&state, payload)?;
    let assigned = state.write_session()?.toggle(request.item_id, request.person_id)?;
    Ok(Json(ToggleResponse { item_id: request.item_id, person_id: request.person_id, assigned }))
}

pub async fn get_charges(State(state): State<Arc<AppState>>) -> ApiResult<Json<ChargeConfig>> {
    Ok(Json(*state.read_session()?.charges()))
}

pub async fn update_charges(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChargeUpdate>, JsonRejection>,
) -> ApiResult<Json<ChargeConfig>> {
    let update = json_body(&state, payload)?;
    Ok(Json(state.write_session()?.update_charges(update)?))
}

/// Upload a receipt photo and replace the items with what the extractor reads
///
/// The session lock is released while the extractor runs. The call happens
/// on its own task so the processing flag is cleared even if the client
/// goes away.
#[instrument(skip_all)]
pub async fn upload_receipt(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<ExtractionOutcome>> {
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            state.payload_too_large()
        } else {
            ApiError::validation(rejection.body_text())
        }
    })?;
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim().to_ascii_lowercase())
        .unwrap_or_default();

    let image = ReceiptImage::new(body.to_vec(), mime_type);
    check_image(&image).map_err(|e| match e {
        ExtractionError::UnsupportedMediaType { mime_type } => {
            ApiError::UnsupportedMediaType { mime_type }
        }
        other => ApiError::validation(other.to_string()),
    })?;

    state.write_session()?.begin_extraction()?;
    info!(
        extractor = state.extractor.name(),
        mime_type = %image.mime_type,
        bytes = image.len(),
        "Receipt upload accepted"
    );

    let task_state = state.clone();
    let task = tokio::spawn(async move {
        let result = task_state.extractor.extract(&image).await;
        let outcome = task_state.write_session()?.complete_extraction(result)?;
        Ok::<_, ApiError>(outcome)
    });

    match task.await {
        Ok(outcome) => Ok(Json(outcome?)),
        Err(join_error) => {
            error!(error = %join_error, "Extraction task did not complete");
            let failure = ExtractionError::request("extraction task did not complete");
            // the task never reached complete_extraction, so clear the flag here
            let _ = state.write_session()?.complete_extraction(Err(failure));
            Err(ApiError::internal("Receipt extraction was interrupted"))
        }
    }
}

pub async fn clear_receipt(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.write_session()?.clear_receipt()?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn extraction_usage(State(state): State<Arc<AppState>>) -> Json<UsageResponse> {
    Json(UsageResponse {
        extractor: state.extractor.name().to_string(),
        token_usage: state.extractor.token_usage(),
    })
}
