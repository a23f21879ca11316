use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use directorate_common::{KindSchema, RecordFilter};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::content_form::ContentForm;
use crate::models::content::{ListResponse, RecordResponse};
use crate::state::AppState;

fn parse_filter(
    schema: &KindSchema,
    params: &BTreeMap<String, String>,
) -> Result<RecordFilter, AppError> {
    Ok(schema.parse_filter(params.iter().map(|(k, v)| (k.as_str(), v.as_str())))?)
}

#[utoipa::path(
    post,
    path = "/{kind}/create",
    tag = "Content",
    operation_id = "createRecord",
    summary = "Create a record",
    description = "Creates a record of the given kind. Send JSON, or multipart form data when \
        uploading files; file parts are named after the attachment field (e.g. `photo`). \
        Localized fields are sent as `<field>_uz`, `<field>_ru` and `<field>_en`.",
    params(("kind" = String, Path, description = "Content kind, e.g. `leader`")),
    request_body(content_type = "multipart/form-data", description = "Field values and files"),
    responses(
        (status = 201, description = "Record created", body = RecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown kind (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, form))]
pub async fn create_record(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    form: ContentForm,
) -> Result<(StatusCode, Json<RecordResponse>), AppError> {
    let service = state.service(&kind)?;
    let schema = service.schema();
    let outcome = service.create(form.into_input(schema)?).await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordResponse::new(
            format!("{} created successfully", schema.label),
            &outcome.value,
        )?),
    ))
}

#[utoipa::path(
    get,
    path = "/{kind}/getAll/{locale}",
    tag = "Content",
    operation_id = "listLocalized",
    summary = "List records projected to a locale",
    description = "Public listing. Each localized field is returned once under its base name. \
        Unsupported locales fall back to `uz`. Kinds with a publication flag only return \
        published records. Flag and choice fields can be used as exact-match query filters.",
    params(
        ("kind" = String, Path, description = "Content kind"),
        ("locale" = String, Path, description = "One of `uz`, `ru`, `en`"),
    ),
    responses(
        (status = 200, description = "Projected records", body = ListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown kind (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params))]
pub async fn list_localized(
    State(state): State<AppState>,
    Path((kind, locale)): Path<(String, String)>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse>, AppError> {
    let service = state.service(&kind)?;
    let filter = parse_filter(service.schema(), &params)?;
    let views = service.list_localized(Some(&locale), filter).await?;
    Ok(Json(ListResponse::new(service.schema(), &views)?))
}

#[utoipa::path(
    get,
    path = "/{kind}/getAll",
    tag = "Content",
    operation_id = "listRaw",
    summary = "List raw records",
    description = "Management listing with every stored field, including all locale variants.",
    params(("kind" = String, Path, description = "Content kind")),
    responses(
        (status = 200, description = "Raw records", body = ListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown kind (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params))]
pub async fn list_raw(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse>, AppError> {
    let service = state.service(&kind)?;
    let filter = parse_filter(service.schema(), &params)?;
    let records = service.list_raw(filter).await?;
    Ok(Json(ListResponse::new(service.schema(), &records)?))
}

#[utoipa::path(
    get,
    path = "/{kind}/get/{id}",
    tag = "Content",
    operation_id = "getRecord",
    summary = "Get a raw record",
    params(
        ("kind" = String, Path, description = "Content kind"),
        ("id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 200, description = "Raw record", body = RecordResponse),
        (status = 404, description = "Unknown kind or record (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_record(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<RecordResponse>, AppError> {
    let service = state.service(&kind)?;
    let record = service.find(&id).await?;
    Ok(Json(RecordResponse::new(
        format!("{} retrieved", service.schema().label),
        &record,
    )?))
}

#[utoipa::path(
    get,
    path = "/{kind}/get/{id}/{locale}",
    tag = "Content",
    operation_id = "getLocalizedRecord",
    summary = "Get a record projected to a locale",
    params(
        ("kind" = String, Path, description = "Content kind"),
        ("id" = String, Path, description = "Record ID"),
        ("locale" = String, Path, description = "One of `uz`, `ru`, `en`"),
    ),
    responses(
        (status = 200, description = "Projected record", body = RecordResponse),
        (status = 404, description = "Unknown kind or record (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_localized_record(
    State(state): State<AppState>,
    Path((kind, id, locale)): Path<(String, String, String)>,
) -> Result<Json<RecordResponse>, AppError> {
    let service = state.service(&kind)?;
    let view = service.find_projected(&id, Some(&locale)).await?;
    Ok(Json(RecordResponse::new(
        format!("{} retrieved", service.schema().label),
        &view,
    )?))
}

#[utoipa::path(
    put,
    path = "/{kind}/update/{id}",
    tag = "Content",
    operation_id = "updateRecord",
    summary = "Update a record",
    description = "Partial update; omitted fields keep their stored values. A new file for a \
        single-file field replaces the previous one, which is deleted after the response. \
        Gallery kinds accept a removal list (e.g. `deletedPhotos`) naming entries to drop; new \
        gallery files are appended.",
    params(
        ("kind" = String, Path, description = "Content kind"),
        ("id" = String, Path, description = "Record ID"),
    ),
    request_body(content_type = "multipart/form-data", description = "Changed fields and files"),
    responses(
        (status = 200, description = "Record updated", body = RecordResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Unknown kind or record (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Record kept changing under concurrent writes (CONFLICT)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, form))]
pub async fn update_record(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    form: ContentForm,
) -> Result<Json<RecordResponse>, AppError> {
    let service = state.service(&kind)?;
    let schema = service.schema();
    let outcome = service.update(&id, form.into_input(schema)?).await?;

    Ok(Json(RecordResponse::new(
        format!("{} updated successfully", schema.label),
        &outcome.value,
    )?))
}

#[utoipa::path(
    delete,
    path = "/{kind}/delete/{id}",
    tag = "Content",
    operation_id = "deleteRecord",
    summary = "Delete a record",
    description = "Deletes the record; every file it references is then unlinked in the \
        background. File cleanup problems are logged and do not fail the request.",
    params(
        ("kind" = String, Path, description = "Content kind"),
        ("id" = String, Path, description = "Record ID"),
    ),
    responses(
        (status = 200, description = "Record deleted", body = RecordResponse),
        (status = 404, description = "Unknown kind or record (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn delete_record(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<RecordResponse>, AppError> {
    let service = state.service(&kind)?;
    let outcome = service.delete(&id).await?;

    Ok(Json(RecordResponse::new(
        format!("{} deleted successfully", service.schema().label),
        &outcome.value,
    )?))
}
