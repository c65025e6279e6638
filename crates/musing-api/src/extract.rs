//! Extractors whose rejections surface as `ApiError`, so a malformed body
//! or path id gets the same `{"message"}` 400 as a field violation.

use axum::{Json, extract::Path};
use axum_extra::extract::WithRejection;

use crate::error::ApiError;

pub type ApiJson<T> = WithRejection<Json<T>, ApiError>;
pub type ApiPath<T> = WithRejection<Path<T>, ApiError>;
