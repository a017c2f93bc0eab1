use crate::{auth::AuthenticatedUser, error::ApiError, error::ApiResult, state::AppState};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post, put},
    Json, Router,
};
use portal_orchestrator::{
    evaluate_crossing, trigger, CreateWorkspaceRequest, Crossing, Notification,
    ProvisioningGrant, WorkspaceRecord, WorkspaceSummary, WorkspaceType,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;
use utoipa::ToSchema;

use crate::provision::{generate_api_key, notification_channel_name};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/workspaces",
            get(list_workspaces).post(create_workspace),
        )
        .route("/api/v1/workspaces/all", get(list_all_workspaces))
        .route("/api/v1/workspaces/{id}", get(get_workspace))
        .route("/api/v1/workspaces/{id}/provision", post(provision_workspace))
        .route("/api/v1/workspaces/{id}/limits", put(set_limits))
        .route(
            "/api/v1/workspaces/{id}/direct-pay-limit",
            put(set_direct_pay_limit),
        )
}

/// Routes authenticated by workspace api key instead of a user session.
pub fn usage_routes() -> Router<AppState> {
    Router::new().route("/api/v1/workspaces/{id}/total-usage", put(set_total_usage))
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetLimitsBody {
    #[serde(rename = "soft-limit")]
    #[schema(value_type = String)]
    pub soft_limit: Decimal,

    #[serde(rename = "hard-limit")]
    #[schema(value_type = String)]
    pub hard_limit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UsageBody {
    #[serde(rename = "total-usage")]
    #[schema(value_type = String)]
    pub total_usage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProvisionBody {
    pub account_id: String,

    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub credits_amount: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DirectPayBody {
    #[schema(value_type = String)]
    pub direct_pay_limit: Decimal,
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces",
    request_body = CreateWorkspaceRequest,
    responses((status = 200, description = "Workspace request created")),
    tag = "portal-api"
)]
pub async fn create_workspace(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Json(mut req): Json<CreateWorkspaceRequest>,
) -> ApiResult<Json<Value>> {
    // Override owner with authenticated user
    req.owner_id = user.username;

    let record = state.store.create(req).await?;

    // Direct-pay requesters drive a follow-up billing flow and need the id
    // back; the other types only learn it from the workspace listing.
    let body = match record.workspace_type {
        WorkspaceType::DirectPay => json!({
            "message": "success",
            "workspace_id": record.workspace_id,
        }),
        _ => json!({ "message": "success" }),
    };

    Ok(Json(body))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces",
    responses((status = 200, body = [WorkspaceSummary])),
    tag = "portal-api"
)]
pub async fn list_workspaces(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
) -> ApiResult<Json<Vec<WorkspaceSummary>>> {
    let records = state.store.list_by_owner(&user.username).await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/all",
    responses((status = 200, body = [WorkspaceSummary])),
    tag = "portal-api"
)]
pub async fn list_all_workspaces(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<WorkspaceSummary>>> {
    let records = state.store.list_all().await?;

    Ok(Json(records.into_iter().map(Into::into).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/workspaces/{id}",
    params(("id" = String, Path, description = "Workspace id")),
    responses(
        (status = 200, body = WorkspaceSummary),
        (status = 404, description = "Workspace not found")
    ),
    tag = "portal-api"
)]
pub async fn get_workspace(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<WorkspaceSummary>> {
    let record = state.store.get(&user.username, &id).await?;

    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/v1/workspaces/{id}/provision",
    params(("id" = String, Path, description = "Workspace id")),
    request_body = ProvisionBody,
    responses(
        (status = 200, description = "Provisioning started"),
        (status = 400, description = "Workspace is not in a provisionable status")
    ),
    tag = "portal-api"
)]
pub async fn provision_workspace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<ProvisionBody>,
) -> ApiResult<Json<Value>> {
    let record = state.store.get_by_workspace_id(&id).await?;

    if !record.request_status.provisionable() {
        return Err(ApiError::BadRequest(
            "Request must be in pending status to provision".to_string(),
        ));
    }

    let grant = ProvisioningGrant {
        api_key: generate_api_key(),
        notification_channel: notification_channel_name(&id),
        account_id: body.account_id,
        credits_amount: body.credits_amount.map(|c| c.round_dp(2)),
    };

    let record = state
        .store
        .begin_provisioning(&record.owner_id, &record.workspace_id, grant)
        .await?;

    // The chain runs asynchronously; callers observe the outcome through
    // the record status.
    state.launcher.start(&record);

    Ok(Json(json!({ "message": "success" })))
}

#[utoipa::path(
    put,
    path = "/api/v1/workspaces/{id}/limits",
    params(("id" = String, Path, description = "Workspace id")),
    request_body = SetLimitsBody,
    responses(
        (status = 200, body = WorkspaceSummary),
        (status = 400, description = "Soft limit is not below hard limit")
    ),
    tag = "portal-api"
)]
pub async fn set_limits(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<SetLimitsBody>,
) -> ApiResult<Json<WorkspaceSummary>> {
    let soft_limit = body.soft_limit.round_dp(2);
    let hard_limit = body.hard_limit.round_dp(2);

    let record = state
        .store
        .set_limits(&user.username, &id, soft_limit, hard_limit)
        .await?;

    // Re-evaluate the unchanged total against the new limit pair.
    let crossing = evaluate_crossing(
        record.total_usage,
        record.total_usage,
        record.soft_limit,
        record.hard_limit,
    );

    let subject = match crossing {
        Crossing::HardCrossing => format!("Workspace {}: total usage exceeds hard limit", id),
        Crossing::SoftCrossing => format!("Workspace {}: total usage exceeds soft limit", id),
        Crossing::NoCrossing => format!("Workspace {}: soft and hard limits updated", id),
    };
    let message = format!(
        "The usage limits for workspace {} were updated.\n{}",
        id,
        usage_figures(&record)
    );
    publish_best_effort(&state, &record, subject, message, true).await;

    Ok(Json(record.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/workspaces/{id}/total-usage",
    params(("id" = String, Path, description = "Workspace id")),
    request_body = UsageBody,
    responses(
        (status = 200, description = "Usage total updated"),
        (status = 401, description = "Missing api key"),
        (status = 403, description = "Api key does not match workspace")
    ),
    tag = "portal-api"
)]
pub async fn set_total_usage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UsageBody>,
) -> ApiResult<Json<Value>> {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("x-api-key header is required".to_string()))?;

    // Resolve the owner through the secondary index; usage reporters only
    // know the workspace id.
    let record = state.store.get_by_workspace_id(&id).await?;

    if let Some(expected) = &record.api_key {
        if expected != api_key {
            return Err(ApiError::Forbidden(
                "Api key does not match workspace".to_string(),
            ));
        }
    }

    let total_usage = body.total_usage.round_dp(2);
    let write = state
        .store
        .set_total_usage(&record.owner_id, &record.workspace_id, total_usage)
        .await?;

    let crossing = evaluate_crossing(
        write.previous.total_usage,
        write.updated.total_usage,
        write.updated.soft_limit,
        write.updated.hard_limit,
    );

    match crossing {
        Crossing::HardCrossing => {
            let subject = format!("Workspace {}: total usage exceeds hard limit", id);
            let message = format!(
                "Total usage exceeds the set hard limit for workspace {}.\n{}",
                id,
                usage_figures(&write.updated)
            );
            publish_best_effort(&state, &write.updated, subject, message, true).await;

            trigger::apply_usage_status(&state.store, &write.updated).await?;
        }
        Crossing::SoftCrossing => {
            let subject = format!("Workspace {}: total usage exceeds soft limit", id);
            let message = format!(
                "Total usage exceeds the set soft limit for workspace {}.\n{}",
                id,
                usage_figures(&write.updated)
            );
            publish_best_effort(&state, &write.updated, subject, message, false).await;
        }
        Crossing::NoCrossing => {}
    }

    Ok(Json(json!({})))
}

#[utoipa::path(
    put,
    path = "/api/v1/workspaces/{id}/direct-pay-limit",
    params(("id" = String, Path, description = "Workspace id")),
    request_body = DirectPayBody,
    responses(
        (status = 200, body = WorkspaceSummary),
        (status = 400, description = "Invalid direct pay limit")
    ),
    tag = "portal-api"
)]
pub async fn set_direct_pay_limit(
    State(state): State<AppState>,
    axum::Extension(user): axum::Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    Json(body): Json<DirectPayBody>,
) -> ApiResult<Json<WorkspaceSummary>> {
    let record = state
        .store
        .set_direct_pay_limit(&user.username, &id, body.direct_pay_limit.round_dp(2))
        .await?;

    Ok(Json(record.into()))
}

fn usage_figures(record: &WorkspaceRecord) -> String {
    format!(
        "Workspace info:\n\
         \x20   Owner: {}\n\
         \x20   Workspace type: {}\n\
         \x20   Workspace id: {}\n\
         \x20   Total usage: {}\n\
         \x20   Soft usage limit: {}\n\
         \x20   Hard usage limit: {}",
        record.owner_id,
        record.workspace_type,
        record.workspace_id,
        record.total_usage,
        record.soft_limit,
        record.hard_limit
    )
}

/// Publish to the workspace's channel when it has one. Publish errors are
/// logged and swallowed; the record write this notifies about is already
/// committed.
async fn publish_best_effort(
    state: &AppState,
    record: &WorkspaceRecord,
    subject: String,
    message: String,
    with_attributes: bool,
) {
    let Some(channel) = &record.notification_channel else {
        warn!(
            workspace_id = %record.workspace_id,
            "Workspace has no notification channel yet"
        );
        return;
    };

    let mut notification = Notification::new(channel, subject, message);
    if with_attributes {
        notification = notification
            .with_attribute("workspace_id", &record.workspace_id)
            .with_attribute("user_id", &record.owner_id)
            .with_attribute("total_usage", record.total_usage.to_string())
            .with_attribute("hard_limit", record.hard_limit.to_string());
    }

    if let Err(e) = state.notifier.publish(notification).await {
        warn!(
            workspace_id = %record.workspace_id,
            "Failed to publish notification: {}", e
        );
    }
}
