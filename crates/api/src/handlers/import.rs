//! Handlers for bulk import, dry-run validation and template download.
//!
//! Uploads arrive as multipart with the file in a field named `file`; its
//! file name decides whether it is decoded as CSV or XLSX.

use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use propline_core::import::decoder::FileKind;
use propline_core::import::pipeline::{self, ImportOutcome};
use propline_core::import::report::ImportReport;
use propline_core::import::schema::EntityKind;
use propline_core::import::template::{self, TemplateFormat};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "file";

/// A file pulled out of a multipart request.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl Upload {
    pub fn file_kind(&self) -> Result<FileKind, AppError> {
        Ok(FileKind::from_file_name(&self.file_name)?)
    }
}

/// Read the first `file` field. Other fields are ignored.
async fn read_upload(multipart: &mut Multipart) -> AppResult<Upload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no file name".to_string()))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        return Ok(Upload { file_name, bytes });
    }

    Err(AppError::BadRequest(format!(
        "No file received; expected multipart field '{UPLOAD_FIELD}'"
    )))
}

// ── Import ───────────────────────────────────────────────────────────

/// POST /api/v1/import/{kind}
///
/// Decode the upload, then validate, resolve and persist each row. Row
/// failures are reported in the body; only file-level problems are errors.
pub async fn import_file(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<ImportOutcome>>> {
    let kind: EntityKind = kind.parse()?;
    let upload = read_upload(&mut multipart).await?;
    let file_kind = upload.file_kind()?;

    tracing::info!(
        kind = %kind,
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Received import upload"
    );

    let outcome = pipeline::import_file(
        state.store.as_ref(),
        state.phone_policy.as_ref(),
        &upload.bytes,
        file_kind,
        kind,
    )
    .await?;

    Ok(Json(DataResponse { data: outcome }))
}

// ── Validate ─────────────────────────────────────────────────────────

/// POST /api/v1/import/{kind}/validate
///
/// Dry run: report per-row validation results, field accuracy and in-file
/// duplicates without writing anything. Lead phones go through the same
/// policy as a real import.
pub async fn validate_file(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    mut multipart: Multipart,
) -> AppResult<Json<DataResponse<ImportReport>>> {
    let kind: EntityKind = kind.parse()?;
    let upload = read_upload(&mut multipart).await?;
    let file_kind = upload.file_kind()?;

    let report = pipeline::validate_file(
        state.phone_policy.as_ref(),
        &upload.bytes,
        file_kind,
        kind,
    )?;
    Ok(Json(DataResponse { data: report }))
}

// ── Template ─────────────────────────────────────────────────────────

/// Query parameters for the template download.
#[derive(Debug, Deserialize)]
pub struct TemplateParams {
    /// `csv` (default) or `xlsx`.
    pub format: Option<String>,
}

/// GET /api/v1/import/{kind}/template
///
/// Download a header row plus example rows for `kind`.
pub async fn download_template(
    Path(kind): Path<String>,
    Query(params): Query<TemplateParams>,
) -> AppResult<impl IntoResponse> {
    let kind: EntityKind = kind.parse()?;
    let format: TemplateFormat = match params.format.as_deref() {
        Some(raw) => raw.parse()?,
        None => TemplateFormat::default(),
    };

    let file = template::render(kind, format)?;
    let disposition = format!("attachment; filename=\"{}\"", file.file_name);

    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, file.content_type.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    ))
}
