//! Signed object routes for the local storage backend.
//!
//! URLs issued by `LocalStorage` point here. A request is served only when its
//! `signature` covers the route's verb, the exact key and the `expires`
//! timestamp, and that timestamp has not passed. These routes sit outside
//! bearer authentication since the signature is the credential.

use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
};
use depot_core::models::PresignMethod;
use depot_core::AppError;
use depot_storage::{parse_object_key, UrlSigner};
use serde::Deserialize;
use std::sync::Arc;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
pub struct SignedObjectQuery {
    pub method: Option<String>,
    pub expires: u64,
    pub signature: String,
}

fn signer(state: &AppState) -> Result<&UrlSigner, AppError> {
    state
        .object_signer
        .as_ref()
        .ok_or_else(|| AppError::NotFound("Object routes are disabled for this backend".to_string()))
}

fn verify(
    state: &AppState,
    method: PresignMethod,
    key: &str,
    query: &SignedObjectQuery,
) -> Result<(), HttpAppError> {
    if let Some(declared) = query.method.as_deref() {
        if !declared.eq_ignore_ascii_case(method.as_str()) {
            return Err(AppError::Forbidden(format!(
                "URL was signed for {}, not {}",
                declared, method
            ))
            .into());
        }
    }
    signer(state)?.verify(method, key, query.expires, &query.signature)?;
    Ok(())
}

#[tracing::instrument(skip(state, query, headers, body), fields(object_key = %key, size_bytes = body.len()))]
pub async fn put_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedObjectQuery>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    verify(&state, PresignMethod::Put, &key, &query)?;

    // The signature covers the key, not the body
    if let Some(parts) = parse_object_key(&key) {
        state
            .config
            .upload_rules()
            .check_size(parts.category, body.len() as u64)?;
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE);

    state
        .storage
        .upload_with_key(&key, body.to_vec(), content_type)
        .await?;

    Ok(StatusCode::OK)
}

#[tracing::instrument(skip(state, query), fields(object_key = %key))]
pub async fn get_object(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
    Query(query): Query<SignedObjectQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    verify(&state, PresignMethod::Get, &key, &query)?;

    let data = state.storage.download(&key).await?;
    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, DEFAULT_CONTENT_TYPE)],
        data,
    ))
}
