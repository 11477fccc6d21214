//! Response tagging layer.
//!
//! Stamps the classifier's tags onto outbound responses as a `Cache-Tag`
//! header so the CDN can group-invalidate them later. Classification can
//! never fail a request: anything that does not produce a valid header
//! value leaves the response untagged.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

use crate::purge::classify;

/// Header carrying the comma-separated tag list.
pub const CACHE_TAG_HEADER: &str = "cache-tag";

/// Middleware stamping cache tags derived from the request path.
pub async fn tag_responses(request: Request, next: Next) -> Response {
    let tags = classify(request.uri().path());
    let mut response = next.run(request).await;

    if !tags.is_empty()
        && let Ok(value) = HeaderValue::from_str(&tags.join(","))
    {
        response.headers_mut().insert(CACHE_TAG_HEADER, value);
    }
    response
}
