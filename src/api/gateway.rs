/// Edge cache endpoint (gateway and standalone roles)
use crate::{
    api::extract::ValidatedJson,
    context::AppContext,
    edge::{Provenance, KEY_SEPARATOR},
    error::{NameError, NameResult},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub fn routes() -> Router<AppContext> {
    Router::new().route("/resolve", post(resolve))
}

fn default_record_type() -> String {
    "A".to_string()
}

/// Record types end up inside the composite cache key
pub(crate) fn validate_record_type(record_type: &str) -> Result<(), ValidationError> {
    if record_type.contains(KEY_SEPARATOR) {
        let mut error = ValidationError::new("record_type_separator");
        error.message = Some(format!("recordType must not contain '{}'", KEY_SEPARATOR).into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResolveRequest {
    #[validate(length(min = 1, message = "domain is required"))]
    pub domain: String,
    #[serde(default = "default_record_type")]
    #[validate(
        length(min = 1, message = "recordType cannot be empty"),
        custom(function = "validate_record_type")
    )]
    pub record_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    pub last_updated: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayResolveResponse {
    pub domain: String,
    pub record_type: String,
    pub value: String,
    pub ttl: u64,
    pub proof: Proof,
    pub source: Provenance,
}

/// POST /resolve
async fn resolve(
    State(ctx): State<AppContext>,
    ValidatedJson(req): ValidatedJson<GatewayResolveRequest>,
) -> NameResult<Json<GatewayResolveResponse>> {
    let edge = ctx
        .edge
        .as_ref()
        .ok_or_else(|| NameError::Internal("Edge cache not initialised".to_string()))?;

    let lookup = edge.lookup(&req.domain, &req.record_type).await?;

    Ok(Json(GatewayResolveResponse {
        domain: req.domain,
        record_type: req.record_type,
        value: lookup.value,
        ttl: lookup.ttl,
        proof: Proof {
            last_updated: lookup.last_updated,
        },
        source: lookup.provenance,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_defaults_to_a() {
        let req: GatewayResolveRequest =
            serde_json::from_str(r#"{"domain": "example.eth"}"#).unwrap();
        assert_eq!(req.record_type, "A");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_empty_domain_rejected() {
        let req: GatewayResolveRequest =
            serde_json::from_str(r#"{"domain": "", "recordType": "A"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_separator_in_record_type_rejected() {
        let req: GatewayResolveRequest =
            serde_json::from_str(r#"{"domain": "example.eth", "recordType": "A:B"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_source_serialization() {
        let body = serde_json::to_value(GatewayResolveResponse {
            domain: "example.eth".to_string(),
            record_type: "A".to_string(),
            value: "203.0.113.10".to_string(),
            ttl: 60,
            proof: Proof {
                last_updated: 1_700_000_000,
            },
            source: Provenance::Live,
        })
        .unwrap();

        assert_eq!(body["source"], "resolver");
        assert_eq!(body["recordType"], "A");
        assert_eq!(body["proof"]["lastUpdated"], 1_700_000_000);
    }
}
