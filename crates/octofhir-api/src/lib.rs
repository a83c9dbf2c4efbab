use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use octofhir_cds_core::{FieldError, ValidationError, ValidationScope};
use serde::Serialize;
use thiserror::Error;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

// -------------------------
// Error body
// -------------------------

/// JSON body returned for CDS errors.
///
/// Validation failures carry the scope and field-level errors so client
/// developers can fix the request programmatically.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub status_code: u16,
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_context: Option<ValidationScope>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<FieldError>>,
}

impl ErrorBody {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error"),
            message: message.into(),
            validation_context: None,
            validation: None,
        }
    }
}

// -------------------------
// API Error
// -------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("{0}")]
    Validation(ValidationError),
    #[error("Not found")]
    NotFound,
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The JSON body for this error, `None` when the response has no body.
    ///
    /// Internal details never leave the process.
    pub fn to_body(&self) -> Option<ErrorBody> {
        let status = self.status_code();
        match self {
            ApiError::NotFound => None,
            ApiError::BadRequest(msg) => Some(ErrorBody::new(status, msg.clone())),
            ApiError::Validation(err) => Some(ErrorBody {
                validation_context: Some(err.scope),
                validation: Some(err.errors.clone()),
                ..ErrorBody::new(status, err.message())
            }),
            ApiError::Internal(_) => Some(ErrorBody::new(status, "Internal Server Error")),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let Some(body) = self.to_body() else {
            return status.into_response();
        };

        match serde_json::to_vec(&body) {
            Ok(bytes) => json_response(status, bytes),
            Err(_) => json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"statusCode":500,"error":"Internal Server Error","message":"Internal Server Error"}"#
                    .to_vec(),
            ),
        }
    }
}

// -------------------------
// API Response Wrapper
// -------------------------

#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub value: Option<T>,
    pub status: StatusCode,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl<T> ApiResponse<T> {
    pub fn new(value: T, status: StatusCode) -> Self {
        Self {
            value: Some(value),
            status,
            headers: Vec::new(),
        }
    }

    pub fn ok(value: T) -> Self {
        Self::new(value, StatusCode::OK)
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.push((name, value));
        self
    }
}

impl ApiResponse<()> {
    /// `200` with an empty body.
    pub fn empty() -> Self {
        Self {
            value: None,
            status: StatusCode::OK,
            headers: Vec::new(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let mut response = match self.value {
            None => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = self.status;
                response
            }
            Some(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => json_response(self.status, bytes),
                Err(e) => return ApiError::internal(e.to_string()).into_response(),
            },
        };
        let headers = response.headers_mut();
        for (name, value) in self.headers {
            headers.insert(name, value);
        }
        response
    }
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(JSON_CONTENT_TYPE),
    );
    response
}
