//! Who is calling
//!
//! Authentication lives in front of this service. The gateway forwards the
//! resolved caller in `X-Actor` as `staff:<name>` or `customer:<id>`.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::ApiResponse;
use crate::domain::Actor;

pub const ACTOR_HEADER: &str = "x-actor";

/// Caller taken from `X-Actor`. Requests without the header act as
/// `staff:api`. `system` is reserved for the sweep and rejected here.
#[derive(Debug, Clone)]
pub struct RequestActor(pub Actor);

impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Self(Actor::Staff("api".to_string())));
        };
        let parsed = raw
            .to_str()
            .map_err(|_| "X-Actor is not valid text".to_string())
            .and_then(|s| s.trim().parse::<Actor>());
        match parsed {
            Ok(Actor::System) => Err(reject("X-Actor cannot be 'system'".into())),
            Ok(actor) => Ok(Self(actor)),
            Err(msg) => Err(reject(msg)),
        }
    }
}

fn reject(message: String) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}
