//! FIFO production report handlers.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::header,
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use lotwise_core::TenantId;

use crate::error::AppError;
use crate::render::{RenderedDocument, ReportFormat};
use crate::service::ReportRequest;
use crate::state::AppState;
use crate::storage::StoredReference;

/// Download prefix for `/api/reports/fifo`.
const FIFO_PREFIX: &str = "fifo";

/// Download prefix for `/api/reports/custom`.
const CUSTOM_PREFIX: &str = "custom";

/// Build the reports router.
///
/// `/api/reports/custom` serves the same generator under its own download
/// file names.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/reports/fifo", get(report_get).post(report_post))
        .route("/api/reports/custom", get(custom_get).post(custom_post))
}

/// Query parameters for `GET /api/reports/fifo`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub tenant: Option<String>,
    pub format: Option<String>,
    pub store: Option<bool>,
}

impl TryFrom<ReportQuery> for ReportRequest {
    type Error = AppError;

    fn try_from(query: ReportQuery) -> Result<Self, Self::Error> {
        let from = parse_date("from", query.from.as_deref())?;
        let to = parse_date("to", query.to.as_deref())?;
        let tenant = query
            .tenant
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                raw.parse::<TenantId>()
                    .map_err(|e| AppError::BadRequest(format!("invalid tenant: {e}")))
            })
            .transpose()?;
        let format = query
            .format
            .map(|raw| raw.parse::<ReportFormat>().map_err(AppError::BadRequest))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            from,
            to,
            tenant,
            format,
            store: query.store.unwrap_or(false),
        })
    }
}

fn parse_date(name: &str, raw: Option<&str>) -> Result<NaiveDate, AppError> {
    let raw = raw.ok_or_else(|| AppError::BadRequest(format!("missing `{name}` date")))?;
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        AppError::BadRequest(format!("`{name}` must be a YYYY-MM-DD date, got {raw:?}"))
    })
}

/// Response body when a POSTed report was stored.
#[derive(Debug, Serialize)]
pub struct StoredResponse {
    pub ok: bool,
    pub reference: StoredReference,
    pub ms: u64,
}

/// Generate a report from query parameters.
///
/// Redirects to the stored copy when storage issued a public URL; otherwise
/// returns the document inline.
///
/// # Errors
///
/// Returns `AppError` for invalid parameters or a failed generation.
#[instrument(skip(state))]
pub async fn report_get(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    get_report(&state, query, FIFO_PREFIX).await
}

/// `GET /api/reports/custom`; same as [`report_get`].
///
/// # Errors
///
/// Returns `AppError` for invalid parameters or a failed generation.
#[instrument(skip(state))]
pub async fn custom_get(
    State(state): State<AppState>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    get_report(&state, query, CUSTOM_PREFIX).await
}

async fn get_report(
    state: &AppState,
    query: Result<Query<ReportQuery>, QueryRejection>,
    prefix: &str,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let request = ReportRequest::try_from(query)?;
    let generated = state.reports().generate(&request).await?;

    if let Some(url) = generated.reference.as_ref().and_then(StoredReference::url) {
        return Ok(Redirect::to(url.as_str()).into_response());
    }

    Ok(document_response(&request, prefix, generated.document, None))
}

/// Generate a report from a JSON body.
///
/// Returns `{ ok, reference, ms }` when the report was stored, otherwise the
/// document inline with an `X-Render-Time` header.
///
/// # Errors
///
/// Returns `AppError` for an invalid body or a failed generation.
#[instrument(skip(state, body))]
pub async fn report_post(
    State(state): State<AppState>,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    post_report(&state, body, FIFO_PREFIX).await
}

/// `POST /api/reports/custom`; same as [`report_post`].
///
/// # Errors
///
/// Returns `AppError` for an invalid body or a failed generation.
#[instrument(skip(state, body))]
pub async fn custom_post(
    State(state): State<AppState>,
    body: Result<Json<ReportRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    post_report(&state, body, CUSTOM_PREFIX).await
}

async fn post_report(
    state: &AppState,
    body: Result<Json<ReportRequest>, JsonRejection>,
    prefix: &str,
) -> Result<Response, AppError> {
    let started = Instant::now();
    let Json(request) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let generated = state.reports().generate(&request).await?;
    let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    if let Some(reference) = generated.reference {
        return Ok(Json(StoredResponse {
            ok: true,
            reference,
            ms,
        })
        .into_response());
    }

    Ok(document_response(
        &request,
        prefix,
        generated.document,
        Some(format!("{ms}ms")),
    ))
}

fn document_response(
    request: &ReportRequest,
    prefix: &str,
    document: RenderedDocument,
    render_time: Option<String>,
) -> Response {
    let disposition = format!(
        "inline; filename=\"{}\"",
        request.file_name_with(prefix, document.extension)
    );
    let mut response = (
        [
            (header::CONTENT_TYPE, document.content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        document.bytes,
    )
        .into_response();

    if let Some(value) = render_time.and_then(|v| v.parse().ok()) {
        response.headers_mut().insert("x-render-time", value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn query(from: &str, to: &str) -> ReportQuery {
        ReportQuery {
            from: Some(from.to_string()),
            to: Some(to.to_string()),
            ..ReportQuery::default()
        }
    }

    #[test]
    fn test_query_to_request_defaults() {
        let request = ReportRequest::try_from(query("2025-06-01", "2025-06-30")).unwrap();

        assert_eq!(request.format, ReportFormat::Html);
        assert!(!request.store);
        assert!(request.tenant.is_none());
    }

    #[test]
    fn test_query_requires_dates() {
        let err = ReportRequest::try_from(ReportQuery::default()).unwrap_err();
        assert!(err.to_string().contains("from"));

        let err = ReportRequest::try_from(query("2025-06-01", "June")).unwrap_err();
        assert!(err.to_string().contains("`to`"));
    }

    #[test]
    fn test_query_rejects_bad_tenant_and_format() {
        let mut bad_tenant = query("2025-06-01", "2025-06-30");
        bad_tenant.tenant = Some("acme".to_string());
        assert!(ReportRequest::try_from(bad_tenant).is_err());

        let mut bad_format = query("2025-06-01", "2025-06-30");
        bad_format.format = Some("pdf".to_string());
        assert!(ReportRequest::try_from(bad_format).is_err());
    }

    #[test]
    fn test_empty_tenant_means_all() {
        let mut q = query("2025-06-01", "2025-06-30");
        q.tenant = Some(String::new());
        assert!(ReportRequest::try_from(q).unwrap().tenant.is_none());
    }
}
