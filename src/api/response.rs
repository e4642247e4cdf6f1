use actix_web::body::{BoxBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::http::header::HeaderMap;
use actix_web::middleware::Next;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use serde::Serialize;

use crate::error::EvaluationError;

/// Envelope every endpoint answers with: `{success, message?, data?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn ok_with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

// Extractor rejections (bad JSON, query strings, paths) use the same envelope.

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        EvaluationError::Validation(format!("Invalid request body: {err}")).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        EvaluationError::Validation(format!("Invalid query parameters: {err}")).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        EvaluationError::Validation(format!("Invalid path parameters: {err}")).into()
    })
}

const RATE_LIMIT_HEADERS: [&str; 2] = ["retry-after", "x-ratelimit-after"];

fn too_many_requests(req: HttpRequest, source: &HeaderMap) -> ServiceResponse<BoxBody> {
    let mut builder = HttpResponse::TooManyRequests();
    for name in RATE_LIMIT_HEADERS {
        if let Some(value) = source.get(name) {
            builder.insert_header((name, value.clone()));
        }
    }

    let retry = source
        .get("retry-after")
        .or_else(|| source.get("x-ratelimit-after"))
        .and_then(|v| v.to_str().ok())
        .map(|secs| format!("Too many requests, retry in {secs}s"))
        .unwrap_or_else(|| "Too many requests".to_string());

    ServiceResponse::new(req, builder.json(ApiResponse::failure(retry)))
}

/// Rewrites the rate limiter's plain-text 429 into the JSON envelope.
pub async fn rate_limit_envelope(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let http_req = req.request().clone();

    match next.call(req).await {
        Ok(res) if res.status() == StatusCode::TOO_MANY_REQUESTS => {
            let headers = res.headers().clone();
            Ok(too_many_requests(res.request().clone(), &headers))
        }
        Ok(res) => Ok(res.map_into_boxed_body()),
        Err(err) if err.as_response_error().status_code() == StatusCode::TOO_MANY_REQUESTS => {
            let rejected = err.error_response();
            Ok(too_many_requests(http_req, rejected.headers()))
        }
        Err(err) => Err(err),
    }
}
