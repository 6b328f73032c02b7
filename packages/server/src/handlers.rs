//! HTTP handler functions for the SoF event extractor.

use actix_multipart::Multipart;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, ResponseError as _, web};
use futures::TryStreamExt as _;
use sof_events_intake::{UploadId, check_size, sanitize_filename};
use sof_events_server_models::{ApiHealth, ReportLinks, UploadResponse};

use crate::{AppState, OUTPUTS_PATH};
use crate::error::ApiError;
use crate::pipeline::Processed;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// A file pulled out of a multipart body.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /api/upload`
///
/// Processes the uploaded file and returns the summary plus links to the
/// rendered reports.
pub async fn api_upload(
    state: web::Data<AppState>,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let processed = process(&state, payload).await?;

    let id = processed.id.to_string();
    Ok(HttpResponse::Ok().json(UploadResponse {
        links: ReportLinks {
            html: format!("/results/{id}"),
            json: format!("{OUTPUTS_PATH}/{id}.json"),
            csv: format!("{OUTPUTS_PATH}/{id}.csv"),
        },
        id,
        filename: processed.extraction.filename,
        format: processed.extraction.format,
        events_count: processed.extraction.timeline.len(),
        summary: processed.extraction.summary,
        metadata: processed.extraction.metadata,
    }))
}

/// `POST /upload`
///
/// Form-post variant of [`api_upload`]: responds with the HTML report
/// itself, or an HTML error page.
pub async fn form_upload(state: web::Data<AppState>, payload: Multipart) -> HttpResponse {
    match process(&state, payload).await {
        Ok(processed) => {
            let downloads = state.pipeline.downloads(&processed.id);
            HttpResponse::Ok()
                .content_type(ContentType::html())
                .body(sof_events_report::render(&processed.extraction, Some(&downloads)))
        }
        Err(e) => {
            let status = e.status_code();
            log::warn!("Form upload failed ({status}): {e}");
            HttpResponse::build(status)
                .content_type(ContentType::html())
                .body(sof_events_report::render_error(&e.public_message()))
        }
    }
}

/// `GET /results/{id}`
///
/// Serves the stored HTML report for an earlier upload.
pub async fn result(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let raw = path.into_inner();
    let id = UploadId::parse(&raw).ok_or_else(|| ApiError::NotFound(raw.clone()))?;
    let report = state
        .pipeline
        .html_report(&id)
        .ok_or_else(|| ApiError::NotFound(raw.clone()))?;

    let html = std::fs::read_to_string(&report).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ApiError::NotFound(raw)
        } else {
            ApiError::Internal(format!("failed to read {}: {e}", report.display()))
        }
    })?;

    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}

async fn process(state: &web::Data<AppState>, payload: Multipart) -> Result<Processed, ApiError> {
    let upload = read_upload(payload, state.config.max_upload_bytes).await?;

    let pipeline = state.pipeline.clone();
    web::block(move || pipeline.process(&upload.filename, &upload.bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("upload worker failed: {e}")))?
}

/// Reads the first file field from a multipart body, enforcing `limit`.
///
/// Non-file fields (and file inputs left empty) are skipped.
async fn read_upload(mut payload: Multipart, limit: usize) -> Result<Upload, ApiError> {
    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .filter(|name| !name.trim().is_empty())
            .map(sanitize_filename);

        let Some(filename) = filename else {
            while field
                .try_next()
                .await
                .map_err(|e| ApiError::BadRequest(e.to_string()))?
                .is_some()
            {}
            continue;
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
        {
            check_size(bytes.len() + chunk.len(), limit)?;
            bytes.extend_from_slice(&chunk);
        }

        log::debug!("Received {filename} ({} bytes)", bytes.len());
        return Ok(Upload { filename, bytes });
    }

    Err(ApiError::MissingFile)
}
