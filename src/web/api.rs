//! HTTP handlers for the file endpoints

use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::{Method, Uri},
    response::Response,
    Json,
};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::{
    extractors::RequestContext,
    responses::{bad_request, handle_error, ok, ok_empty, ok_with_filename},
    utils::log_request,
    AppState,
};
use crate::export::ExportOutcome;
use crate::models::{Lifecycle, Mapping, Schema};

pub const MISSING_MAPPING: &str = "No mapping Provided";
pub const MISSING_FILENAME: &str = "No filename Provided";
pub const MISSING_FILE: &str = "No file provided";

/// Body of `/map` and `/validate`
#[derive(Debug, Deserialize)]
pub struct MappingRequest {
    pub filename: Option<String>,
    pub mapping: Option<Mapping>,
    #[serde(default)]
    pub schema: Option<Schema>,
}

/// Body of `/import`
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub filename: Option<String>,
}

/// Liveness probe
pub async fn status(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    context: RequestContext,
) -> Response {
    log_request(&method, &uri, &context);
    state.usage.track("Status");
    ok_empty()
}

/// Store a multipart upload and preview its first rows
pub async fn upload_file(
    State(state): State<AppState>,
    Path(user): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    log_request(&method, &uri, &context);
    state.usage.track("Upload");

    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return rejected_body(rejection.body_text()),
    };

    let (filename, content) = match first_file(&mut multipart).await {
        Ok(Some(file)) => file,
        Ok(None) => return bad_request(MISSING_FILE),
        Err(e) => {
            debug!("Rejected multipart body: {}", e);
            return bad_request(&format!("Invalid multipart body: {}", e));
        }
    };

    info!(user = %user, filename = %filename, "Uploading file");

    let service = &state.data_mapping_service;
    if let Err(e) = service.save_upload(&user, &filename, &content).await {
        return handle_error(e);
    }

    let preview = match service.upload_preview(&user, &filename).await {
        Ok(preview) => preview,
        Err(e) => return handle_error(e),
    };

    state.webhook.trigger(&user, Lifecycle::FileUploaded).await;
    ok_with_filename(preview, filename)
}

/// Rename, subset and validate an upload into its mapped copy
pub async fn map_file(
    State(state): State<AppState>,
    Path(user): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
    body: Result<Json<MappingRequest>, JsonRejection>,
) -> Response {
    log_request(&method, &uri, &context);
    state.usage.track("Mapping");

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejected_body(rejection.body_text()),
    };
    let (filename, mapping, schema) = match unpack(body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    debug!(user = %user, filename = %filename, mapping = ?mapping, "Received mapping");

    match state
        .data_mapping_service
        .map_file(&user, &filename, &mapping, &schema)
        .await
    {
        Ok(preview) => {
            state.webhook.trigger(&user, Lifecycle::MappingCompleted).await;
            ok(preview)
        }
        Err(e) => handle_error(e),
    }
}

/// Score an upload against the schema without changing it
pub async fn validate_mapping(
    State(state): State<AppState>,
    Path(user): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
    body: Result<Json<MappingRequest>, JsonRejection>,
) -> Response {
    log_request(&method, &uri, &context);
    state.usage.track("Validate");

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejected_body(rejection.body_text()),
    };
    let (filename, mapping, schema) = match unpack(body) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    debug!(user = %user, filename = %filename, mapping = ?mapping, "Received mapping for validation");

    match state
        .data_mapping_service
        .validate_file(&user, &filename, &mapping, &schema)
        .await
    {
        Ok(report) => {
            state.webhook.trigger(&user, Lifecycle::MappingValidation).await;
            ok(report)
        }
        Err(e) => handle_error(e),
    }
}

/// Send the mapped copy of an upload to the export target
pub async fn import_file(
    State(state): State<AppState>,
    Path(user): Path<String>,
    method: Method,
    uri: Uri,
    context: RequestContext,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Response {
    log_request(&method, &uri, &context);
    state.usage.track("Import");

    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return rejected_body(rejection.body_text()),
    };

    let Some(filename) = body.filename else {
        return bad_request(MISSING_FILENAME);
    };

    match state.exporter.export(&user, &filename).await {
        Ok(outcome) => {
            if let ExportOutcome::Completed { output_dir } = &outcome {
                info!(user = %user, filename = %filename, output = %output_dir.display(), "Export completed");
            }
            state.webhook.trigger(&user, Lifecycle::DataExported).await;
            ok_empty()
        }
        Err(e) => {
            error!(user = %user, filename = %filename, "Export failed: {}", e);
            handle_error(e)
        }
    }
}

/// Request bodies axum could not extract still get the error envelope
fn rejected_body(reason: String) -> Response {
    debug!("Rejected request body: {}", reason);
    bad_request(&reason)
}

/// Check the required parts of a mapping request
fn unpack(body: MappingRequest) -> Result<(String, Mapping, Schema), Response> {
    let mapping = body.mapping.ok_or_else(|| bad_request(MISSING_MAPPING))?;
    let filename = body.filename.ok_or_else(|| bad_request(MISSING_FILENAME))?;
    Ok((filename, mapping, body.schema.unwrap_or_default()))
}

/// The first multipart part that carries a file name
async fn first_file(multipart: &mut Multipart) -> Result<Option<(String, Bytes)>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content = field.bytes().await?;
        return Ok(Some((filename, content)));
    }
    Ok(None)
}
