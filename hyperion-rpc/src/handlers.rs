// HTTP Handlers
// Submit documents and collect their results over HTTP

use crate::error::{RpcError, RpcResult};
use crate::service::DocumentService;

use axum::body::Bytes;
use axum::extract::{Path, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::collections::BTreeSet;

/// Query parameters of a submission: repeated `tag` values and an optional `timeout` in minutes
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SubmitQuery {
    pub tags: BTreeSet<String>,
    pub timeout: Option<u64>,
}

impl SubmitQuery {
    pub fn parse(query: Option<&str>) -> RpcResult<Self> {
        let mut parsed = SubmitQuery::default();
        let Some(query) = query else {
            return Ok(parsed);
        };

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "tag" => {
                    if !value.is_empty() {
                        parsed.tags.insert(value.into_owned());
                    }
                }
                "timeout" => {
                    let minutes = value.parse::<u64>().map_err(|_| {
                        RpcError::InvalidRequest(format!("timeout '{}' is not a number", value))
                    })?;
                    parsed.timeout = Some(minutes);
                }
                other => {
                    return Err(RpcError::InvalidRequest(format!(
                        "unknown query parameter '{}'",
                        other
                    )))
                }
            }
        }

        Ok(parsed)
    }
}

/// `POST /documents`: body is the YAML document, response is the document id
pub async fn submit_document(
    State(service): State<DocumentService>,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> RpcResult<String> {
    let query = SubmitQuery::parse(query.as_deref())?;
    Ok(service.submit(body.to_vec(), query.tags, query.timeout))
}

/// `GET /documents/{id}`: the finished result, or 404 while unknown or running
pub async fn query_document(
    State(service): State<DocumentService>,
    Path(id): Path<String>,
) -> Response {
    match service.query(&id).await {
        Some(result) => Json(result).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no result for '{}'", id)).into_response(),
    }
}
