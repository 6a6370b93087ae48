use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
};
use paycontrol_core::{
    AuditAction, AuditEntry, AuditQuery, Commitment, CommitmentPatch, CommitmentStatus, Contract,
    ContractPatch, CoreError, EntityKind, NewCommitment, NewContract, NewSupplier, NewUser,
    Recorded, Supplier, SupplierPatch, User, UserPatch,
};
use paycontrol_service::{ContractBalance, DashboardSummary};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::{auth::Authenticated, state::AppState};

const AUDIT_DEFAULT_LIMIT: i64 = 100;
const AUDIT_MAX_LIMIT: i64 = 500;

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub items: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListCommitmentsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangeStatusRequest {
    pub status: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListAuditQuery {
    pub entity: Option<String>,
    pub action: Option<String>,
    pub entity_id: Option<Uuid>,
    pub limit: Option<i64>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route(
            "/suppliers/{id}",
            get(get_supplier).patch(update_supplier).delete(delete_supplier),
        )
        .route("/contracts", get(list_contracts).post(create_contract))
        .route(
            "/contracts/{id}",
            get(get_contract).patch(update_contract).delete(delete_contract),
        )
        .route("/contracts/{id}/balance", get(contract_balance))
        .route("/commitments", get(list_commitments).post(create_commitment))
        .route(
            "/commitments/{id}",
            get(get_commitment)
                .patch(update_commitment)
                .delete(delete_commitment),
        )
        .route("/commitments/{id}/status", patch(change_commitment_status))
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/audit", get(list_audit))
        .route("/dashboard", get(dashboard))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_suppliers(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ItemsResponse<Supplier>>> {
    let items = state.service.list_suppliers().await.map_err(core_error)?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_supplier(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Supplier>> {
    let supplier = state.service.get_supplier(id).await.map_err(core_error)?;
    Ok(Json(supplier))
}

async fn create_supplier(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<NewSupplier>,
) -> ApiResult<(StatusCode, Json<Supplier>)> {
    let recorded = state
        .service
        .create_supplier(&actor, payload)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(record(&state, recorded).await)))
}

async fn update_supplier(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<SupplierPatch>,
) -> ApiResult<Json<Supplier>> {
    let recorded = state
        .service
        .update_supplier(&actor, id, payload)
        .await
        .map_err(core_error)?;
    Ok(Json(record(&state, recorded).await))
}

async fn delete_supplier(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let recorded = state
        .service
        .delete_supplier(&actor, id)
        .await
        .map_err(core_error)?;
    record(&state, recorded).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_contracts(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ItemsResponse<Contract>>> {
    let items = state.service.list_contracts().await.map_err(core_error)?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_contract(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Contract>> {
    let contract = state.service.get_contract(id).await.map_err(core_error)?;
    Ok(Json(contract))
}

async fn contract_balance(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ContractBalance>> {
    let balance = state
        .service
        .contract_balance(id)
        .await
        .map_err(core_error)?;
    Ok(Json(balance))
}

async fn create_contract(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<NewContract>,
) -> ApiResult<(StatusCode, Json<Contract>)> {
    let recorded = state
        .service
        .create_contract(&actor, payload)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(record(&state, recorded).await)))
}

async fn update_contract(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContractPatch>,
) -> ApiResult<Json<Contract>> {
    let recorded = state
        .service
        .update_contract(&actor, id, payload)
        .await
        .map_err(core_error)?;
    Ok(Json(record(&state, recorded).await))
}

async fn delete_contract(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let recorded = state
        .service
        .delete_contract(&actor, id)
        .await
        .map_err(core_error)?;
    record(&state, recorded).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_commitments(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Query(query): Query<ListCommitmentsQuery>,
) -> ApiResult<Json<ItemsResponse<Commitment>>> {
    let status = query
        .status
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .map(str::parse::<CommitmentStatus>)
        .transpose()
        .map_err(core_error)?;

    let items = state
        .service
        .list_commitments(status)
        .await
        .map_err(core_error)?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_commitment(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Commitment>> {
    let commitment = state.service.get_commitment(id).await.map_err(core_error)?;
    Ok(Json(commitment))
}

async fn create_commitment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<NewCommitment>,
) -> ApiResult<(StatusCode, Json<Commitment>)> {
    let recorded = state
        .service
        .create_commitment(&actor, payload)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(record(&state, recorded).await)))
}

async fn update_commitment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<CommitmentPatch>,
) -> ApiResult<Json<Commitment>> {
    let recorded = state
        .service
        .update_commitment(&actor, id, payload)
        .await
        .map_err(core_error)?;
    Ok(Json(record(&state, recorded).await))
}

async fn change_commitment_status(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeStatusRequest>,
) -> ApiResult<Json<Commitment>> {
    let recorded = state
        .service
        .change_status(&actor, id, &payload.status, payload.reason)
        .await
        .map_err(core_error)?;
    Ok(Json(record(&state, recorded).await))
}

async fn delete_commitment(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let recorded = state
        .service
        .delete_commitment(&actor, id)
        .await
        .map_err(core_error)?;
    record(&state, recorded).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<ItemsResponse<User>>> {
    let items = state.service.list_users().await.map_err(core_error)?;
    Ok(Json(ItemsResponse { items }))
}

async fn get_user(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<User>> {
    let user = state.service.get_user(id).await.map_err(core_error)?;
    Ok(Json(user))
}

async fn create_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Json(payload): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let recorded = state
        .service
        .create_user(&actor, payload)
        .await
        .map_err(core_error)?;
    Ok((StatusCode::CREATED, Json(record(&state, recorded).await)))
}

async fn update_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Json(payload): Json<UserPatch>,
) -> ApiResult<Json<User>> {
    let recorded = state
        .service
        .update_user(&actor, id, payload)
        .await
        .map_err(core_error)?;
    Ok(Json(record(&state, recorded).await))
}

async fn delete_user(
    State(state): State<AppState>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let recorded = state
        .service
        .delete_user(&actor, id)
        .await
        .map_err(core_error)?;
    record(&state, recorded).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_audit(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
    Query(query): Query<ListAuditQuery>,
) -> ApiResult<Json<ItemsResponse<AuditEntry>>> {
    let entity = query
        .entity
        .as_deref()
        .map(|value| EntityKind::parse(value).ok_or_else(|| unknown_filter("entity", value)))
        .transpose()?;
    let action = query
        .action
        .as_deref()
        .map(|value| AuditAction::parse(value).ok_or_else(|| unknown_filter("action", value)))
        .transpose()?;

    let items = state
        .audit
        .list(&AuditQuery {
            entity,
            action,
            entity_id: query.entity_id,
            limit: query
                .limit
                .unwrap_or(AUDIT_DEFAULT_LIMIT)
                .clamp(1, AUDIT_MAX_LIMIT),
        })
        .await
        .map_err(internal_error)?;
    Ok(Json(ItemsResponse { items }))
}

async fn dashboard(
    State(state): State<AppState>,
    Authenticated(_): Authenticated,
) -> ApiResult<Json<DashboardSummary>> {
    let summary = state.service.dashboard().await.map_err(core_error)?;
    Ok(Json(summary))
}

/// Persists the audit entry of an accepted mutation. The mutation is already
/// committed, so a failed write is logged and the value still returned.
async fn record<T>(state: &AppState, recorded: Recorded<T>) -> T {
    let Recorded { value, audit } = recorded;

    if let Err(err) = state.audit.record(&audit).await {
        error!(
            audit_id = %audit.id,
            entity = audit.entity.as_str(),
            entity_id = %audit.entity_id,
            action = audit.action.as_str(),
            error = %err,
            "failed to record audit entry"
        );
    }

    value
}

fn core_error(err: CoreError) -> (StatusCode, String) {
    let status = match &err {
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::DuplicateKey { .. }
        | CoreError::InvalidTransition { .. }
        | CoreError::ImmutableState { .. }
        | CoreError::ConcurrentUpdate { .. } => StatusCode::CONFLICT,
        CoreError::BudgetExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Validation(_) | CoreError::UnknownStatus(_) => StatusCode::BAD_REQUEST,
        CoreError::Storage(_) => {
            error!(error = %err, "storage failure");
            return internal_error(&err);
        }
    };

    (status, err.to_string())
}

fn unknown_filter(name: &str, value: &str) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, format!("unknown {name} '{value}'"))
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
