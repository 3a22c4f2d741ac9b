/// Ledger endpoints (registry and standalone roles)
///
/// Reads are open. Mutations identify the caller through the
/// `X-Registry-Caller` header and the ledger enforces ownership.
use crate::{
    api::{
        extract::{RegistryCaller, ValidatedJson},
        gateway::validate_record_type,
    },
    context::AppContext,
    error::{NameError, NameResult},
    registry::{DomainInfo, DomainRecord, LedgerRegistry, RecordKey, Registry},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/records/:domain/:record_key", get(get_record))
        .route("/domains", post(register_domain))
        .route("/domains/:domain", get(get_domain))
        .route("/domains/:domain/records", put(set_record))
        .route("/domains/:domain/transfer", post(transfer_domain))
        .route("/domains/:domain/renew", post(renew_domain))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1))]
    pub domain: String,
    #[validate(length(min = 1))]
    pub owner: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SetRecordRequest {
    #[validate(length(min = 1), custom(function = "validate_record_type"))]
    pub record_type: String,
    #[validate(length(min = 1, message = "value cannot be empty"))]
    pub value: String,
    #[serde(default)]
    pub ttl: u64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[validate(length(min = 1))]
    pub new_owner: String,
}

fn ledger(ctx: &AppContext) -> NameResult<&Arc<LedgerRegistry>> {
    ctx.ledger
        .as_ref()
        .ok_or_else(|| NameError::Internal("Ledger not initialised".to_string()))
}

/// GET /records/:domain/:record_key
async fn get_record(
    State(ctx): State<AppContext>,
    Path((domain, record_key)): Path<(String, String)>,
) -> NameResult<Json<DomainRecord>> {
    let key: RecordKey = record_key.parse()?;
    let record = ledger(&ctx)?.get_record(&domain, &key).await?;
    Ok(Json(record))
}

/// GET /domains/:domain
async fn get_domain(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
) -> NameResult<Json<DomainInfo>> {
    Ok(Json(ledger(&ctx)?.get_domain_owner(&domain).await?))
}

/// POST /domains
async fn register_domain(
    State(ctx): State<AppContext>,
    RegistryCaller(caller): RegistryCaller,
    ValidatedJson(req): ValidatedJson<RegisterRequest>,
) -> NameResult<(StatusCode, Json<DomainInfo>)> {
    let info = ledger(&ctx)?
        .register(&caller, &req.domain, &req.owner)
        .await?;
    Ok((StatusCode::CREATED, Json(info)))
}

/// PUT /domains/:domain/records
async fn set_record(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
    RegistryCaller(caller): RegistryCaller,
    ValidatedJson(req): ValidatedJson<SetRecordRequest>,
) -> NameResult<Json<DomainRecord>> {
    let record = ledger(&ctx)?
        .set_record(
            &caller,
            &domain,
            RecordKey::derive(&req.record_type),
            &req.value,
            req.ttl,
        )
        .await?;
    Ok(Json(record))
}

/// POST /domains/:domain/transfer
async fn transfer_domain(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
    RegistryCaller(caller): RegistryCaller,
    ValidatedJson(req): ValidatedJson<TransferRequest>,
) -> NameResult<Json<DomainInfo>> {
    let info = ledger(&ctx)?
        .transfer(&caller, &domain, &req.new_owner)
        .await?;
    Ok(Json(info))
}

/// POST /domains/:domain/renew
async fn renew_domain(
    State(ctx): State<AppContext>,
    Path(domain): Path<String>,
    RegistryCaller(caller): RegistryCaller,
) -> NameResult<Json<DomainInfo>> {
    Ok(Json(ledger(&ctx)?.renew(&caller, &domain).await?))
}
