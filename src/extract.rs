//! Body and path extractors whose rejections use the `AppError` body.

use axum::{
    async_trait,
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::AppError;

/// `Json<T>` that rejects with 400 instead of 415/422.
pub struct JsonBody<T>(pub T);

/// `Path<T>` that rejects with 400 and a JSON error body.
pub struct PathParam<T>(pub T);

fn json_rejection(rejection: JsonRejection) -> AppError {
    debug!(reason = %rejection.body_text(), "json body rejected");
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Missing 'Content-Type: application/json' header"
        }
        JsonRejection::JsonDataError(_) => "Invalid field type in request",
        JsonRejection::JsonSyntaxError(_) => "Malformed JSON body",
        _ => "Invalid request body",
    };
    AppError::BadRequest(message.into())
}

fn path_rejection(rejection: PathRejection) -> AppError {
    debug!(reason = %rejection.body_text(), "path rejected");
    AppError::BadRequest("Invalid user id".into())
}

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(json_rejection)?;
        Ok(JsonBody(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(path_rejection)?;
        Ok(PathParam(value))
    }
}
