use std::collections::BTreeMap;
use std::convert::Infallible;

use serde_json::{json, Value};
use warp::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    reject::{self, Rejection},
    reply::{self, Response},
    Reply,
};

use crate::constants::NON_FIELD_ERRORS;

/// Kind of failure a request can end in. Decides the status code and the
/// shape of the JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    InvalidCredentials,
    Unauthorized,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InternalServerError,
}

impl HtmlError {
    pub fn status(&self) -> StatusCode {
        match self {
            HtmlError::InvalidRequest | HtmlError::InvalidCredentials => StatusCode::BAD_REQUEST,
            HtmlError::Unauthorized => StatusCode::UNAUTHORIZED,
            HtmlError::NotFound => StatusCode::NOT_FOUND,
            HtmlError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            HtmlError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            HtmlError::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn new(self, info: impl Into<String>) -> Error {
        Error {
            kind: self,
            info: info.into(),
            fields: FieldErrors::new(),
        }
    }

    pub fn default(self) -> Error {
        let info = match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::InvalidCredentials => crate::constants::GENERIC_AUTH_FAILURE,
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::NotFound => "Not found.",
            HtmlError::MethodNotAllowed => "Method not allowed.",
            HtmlError::PayloadTooLarge => "Request body is too large.",
            HtmlError::InternalServerError => "A server error occurred.",
        };
        self.new(info)
    }
}

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, thiserror::Error)]
#[error("{info}")]
pub struct Error {
    pub kind: HtmlError,
    pub info: String,
    pub fields: FieldErrors,
}

pub type ApiResult<T> = Result<T, Error>;

impl Error {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::default();
        errors.add(field, message);
        errors.into_error()
    }

    pub fn method_not_allowed(method: &warp::http::Method) -> Self {
        HtmlError::MethodNotAllowed.new(format!("Method \"{method}\" not allowed."))
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn body(&self) -> Value {
        match self.kind {
            HtmlError::InvalidRequest | HtmlError::InvalidCredentials => {
                if self.fields.is_empty() {
                    json!({ NON_FIELD_ERRORS: [self.info] })
                } else {
                    json!(self.fields)
                }
            }
            _ => json!({ "detail": self.info }),
        }
    }
}

impl reject::Reject for Error {}

impl Reply for Error {
    fn into_response(self) -> Response {
        let mut response = reply::with_status(reply::json(&self.body()), self.status()).into_response();
        if self.kind == HtmlError::Unauthorized {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }
        response
    }
}

/// Collects field-level messages while a payload is validated.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    fields: FieldErrors,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_error(self) -> Error {
        Error {
            kind: HtmlError::InvalidRequest,
            info: String::from("Invalid input."),
            fields: self.fields,
        }
    }

    pub fn check(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into_error())
        }
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let error = if let Some(error) = err.find::<Error>() {
        error.clone()
    } else if err.is_not_found() {
        HtmlError::NotFound.default()
    } else if let Some(e) = err.find::<reject::MethodNotAllowed>() {
        HtmlError::MethodNotAllowed.new(e.to_string())
    } else if let Some(e) = err.find::<reject::PayloadTooLarge>() {
        HtmlError::PayloadTooLarge.new(e.to_string())
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        HtmlError::InvalidRequest.new(e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        HtmlError::InvalidRequest.new(e.to_string())
    } else if let Some(e) = err.find::<reject::UnsupportedMediaType>() {
        HtmlError::InvalidRequest.new(e.to_string())
    } else if let Some(e) = err.find::<reject::LengthRequired>() {
        HtmlError::InvalidRequest.new(e.to_string())
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        HtmlError::InvalidRequest.new(e.to_string())
    } else {
        log::error!("Unhandled rejection: {err:?}");
        HtmlError::InternalServerError.default()
    };

    Ok(error.into_response())
}
