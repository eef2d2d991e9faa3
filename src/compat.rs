use std::error::Error;

use crate::model::{self, network::ErrorResponse};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Serialize;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(model::ApiError))]
pub struct MyJson<T>(pub T);

impl<T: Serialize> IntoResponse for MyJson<T> {
    fn into_response(self) -> axum::response::Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(model::ApiError))]
pub struct MyQuery<T>(pub T);

fn describe(err: &dyn Error) -> String {
    let mut s = format!("{}", err);

    let mut source_ = err.source();
    while let Some(source) = source_ {
        s.push_str(&format!(": {}", source));
        source_ = source.source();
    }

    s
}

impl From<JsonRejection> for model::ApiError {
    fn from(value: JsonRejection) -> Self {
        model::ApiError::InvalidJson(describe(&value))
    }
}

impl From<QueryRejection> for model::ApiError {
    fn from(value: QueryRejection) -> Self {
        model::ApiError::InvalidJson(describe(&value))
    }
}

impl IntoResponse for model::ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            model::ApiError::Storage(_) | model::ApiError::Template(_) => {
                tracing::error!(error = %self, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }

            model::ApiError::InvalidJson(ref detail) => {
                tracing::info!(detail = %detail, "could not decode request");
                MyJson(ErrorResponse::new(self.to_string())).into_response()
            }

            model::ApiError::Validation(_)
            | model::ApiError::Permission
            | model::ApiError::NotFound => MyJson(ErrorResponse::new(self.to_string())).into_response(),
        }
    }
}
