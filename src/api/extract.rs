/// Request extractors shared by the role routers
use crate::{context::AppContext, error::NameError};
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Header carrying the trusted caller identity for registry mutations
pub const CALLER_HEADER: &str = "x-registry-caller";

/// JSON body that has been deserialized and validated.
///
/// Malformed JSON and failed validation both reject with
/// [`NameError::InvalidInput`].
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = NameError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| NameError::InvalidInput(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| NameError::InvalidInput(e.to_string()))?;

        Ok(ValidatedJson(value))
    }
}

/// Identity performing a registry mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCaller(pub String);

#[async_trait]
impl FromRequestParts<AppContext> for RegistryCaller {
    type Rejection = NameError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let caller = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                NameError::Unauthorized("Missing X-Registry-Caller header".to_string())
            })?;

        Ok(RegistryCaller(caller.to_string()))
    }
}
