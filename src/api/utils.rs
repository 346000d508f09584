//! Request body helpers for the intake endpoint

use axum::http::{HeaderMap, header};
use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};

use crate::api::error::ApiError;

/// Accept `application/json`, optionally with parameters such as charset
pub fn parse_content_type(headers: &HeaderMap) -> Result<mime::Mime, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidPayload("missing Content-Type header".into()))?;

    let media_type: mime::Mime = content_type
        .parse()
        .map_err(|_| ApiError::InvalidPayload(format!("invalid Content-Type: {content_type}")))?;

    if media_type.type_() != mime::APPLICATION || media_type.subtype() != mime::JSON {
        return Err(ApiError::InvalidPayload(format!(
            "Content-Type must be application/json, got: {}/{}",
            media_type.type_(),
            media_type.subtype()
        )));
    }

    Ok(media_type)
}

/// Collect an already-decompressed body, stopping as soon as it exceeds
/// `max_size`
pub async fn read_body(body: axum::body::Body, max_size: usize) -> Result<Bytes, ApiError> {
    let collected = Limited::new(body, max_size).collect().await.map_err(|err| {
        if err.is::<LengthLimitError>() {
            ApiError::PayloadTooLarge(max_size)
        } else {
            ApiError::InvalidPayload(format!("failed to read body: {err}"))
        }
    })?;

    Ok(collected.to_bytes())
}
