/// Resolution service endpoint (resolver role)
use crate::{
    api::{extract::ValidatedJson, gateway::validate_record_type},
    context::AppContext,
    error::{NameError, NameResult},
    resolution::Resolve,
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/resolve", post(resolve))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    #[validate(length(min = 1, message = "domain is required"))]
    pub domain: String,
    #[validate(
        length(min = 1, message = "recordType is required"),
        custom(function = "validate_record_type")
    )]
    pub record_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveResponse {
    pub domain: String,
    pub record_type: String,
    pub value: String,
    pub ttl: u64,
    pub last_updated: i64,
}

/// POST /resolve
async fn resolve(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<ResolveRequest>,
) -> NameResult<Json<ResolveResponse>> {
    let service = ctx.resolution.as_ref().ok_or(NameError::Unconfigured)?;
    let record = service.resolve(&req.domain, &req.record_type).await?;

    Ok(Json(ResolveResponse {
        domain: req.domain,
        record_type: req.record_type,
        value: record.value,
        ttl: record.ttl,
        last_updated: record.last_updated,
    }))
}
