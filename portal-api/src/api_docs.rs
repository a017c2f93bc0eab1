use crate::routes::workspaces::{DirectPayBody, ProvisionBody, SetLimitsBody, UsageBody};
use portal_orchestrator::{
    CreateWorkspaceRequest, RequestStatus, WorkspaceSummary, WorkspaceType,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health_check,
        crate::routes::health::readiness_check,
        crate::routes::workspaces::list_workspaces,
        crate::routes::workspaces::list_all_workspaces,
        crate::routes::workspaces::create_workspace,
        crate::routes::workspaces::get_workspace,
        crate::routes::workspaces::provision_workspace,
        crate::routes::workspaces::set_limits,
        crate::routes::workspaces::set_total_usage,
        crate::routes::workspaces::set_direct_pay_limit,
    ),
    components(
        schemas(
            WorkspaceSummary,
            RequestStatus,
            WorkspaceType,
            CreateWorkspaceRequest,
            SetLimitsBody,
            UsageBody,
            ProvisionBody,
            DirectPayBody
        )
    ),
    tags(
        (name = "portal-api", description = "Workspace Provisioning Portal API")
    )
)]
pub struct ApiDoc;
