use crate::error::{OrchestratorError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use utoipa::ToSchema;
use uuid::Uuid;

/// Credits granted to a new credits-type workspace. Soft and hard limits
/// default to 50% and 90% of this amount.
pub const DEFAULT_CREDITS_GRANT: i64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    pub owner_id: String,
    pub workspace_id: String,
    pub workspace_type: WorkspaceType,
    pub request_status: RequestStatus,
    pub account_id: Option<String>,
    pub api_key: Option<String>,
    pub notification_channel: Option<String>,
    pub credits: Decimal,
    pub soft_limit: Decimal,
    pub hard_limit: Decimal,
    pub total_usage: Decimal,
    pub direct_pay_limit: Option<Decimal>,

    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit_updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_updated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    Pending,
    Provisioning,
    Active,
    Failed,
    Error,
    AboveLimit,
}

impl RequestStatus {
    /// Only pending and previously-failed requests may be (re-)provisioned.
    pub fn provisionable(self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::Failed | RequestStatus::Error
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum WorkspaceType {
    Credits,
    Grant,
    DirectPay,
}

impl std::fmt::Display for WorkspaceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WorkspaceType::Credits => "credits",
            WorkspaceType::Grant => "grant",
            WorkspaceType::DirectPay => "direct-pay",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateWorkspaceRequest {
    #[serde(default)]
    pub owner_id: String,
    pub workspace_type: WorkspaceType,
}

/// Read-only projection returned by the list/get endpoints. Money keys keep
/// the kebab-case names the portal clients expect.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceSummary {
    pub workspace_id: String,
    pub request_status: RequestStatus,
    pub workspace_type: WorkspaceType,

    #[serde(rename = "total-usage")]
    #[schema(value_type = String)]
    pub total_usage: Decimal,

    #[schema(value_type = String)]
    pub credits: Decimal,

    #[serde(rename = "soft-limit")]
    #[schema(value_type = String)]
    pub soft_limit: Decimal,

    #[serde(rename = "hard-limit")]
    #[schema(value_type = String)]
    pub hard_limit: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub direct_pay_limit: Option<Decimal>,
}

impl From<WorkspaceRecord> for WorkspaceSummary {
    fn from(record: WorkspaceRecord) -> Self {
        Self {
            workspace_id: record.workspace_id,
            request_status: record.request_status,
            workspace_type: record.workspace_type,
            total_usage: record.total_usage,
            credits: record.credits,
            soft_limit: record.soft_limit,
            hard_limit: record.hard_limit,
            direct_pay_limit: record.direct_pay_limit,
        }
    }
}

/// Fields written when provisioning starts for a request.
#[derive(Debug, Clone)]
pub struct ProvisioningGrant {
    pub api_key: String,
    pub notification_channel: String,
    pub account_id: String,
    pub credits_amount: Option<Decimal>,
}

/// Result of a total-usage write: the record as it was before the write and
/// as it is after, so callers can evaluate limit crossings.
#[derive(Debug, Clone)]
pub struct UsageWrite {
    pub previous: WorkspaceRecord,
    pub updated: WorkspaceRecord,
}

#[derive(Clone)]
pub struct WorkspaceStore {
    pool: SqlitePool,
}

impl WorkspaceStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a reference to the database pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a new workspace request in pending status with per-type defaults
    pub async fn create(&self, req: CreateWorkspaceRequest) -> Result<WorkspaceRecord> {
        if req.owner_id.is_empty() {
            return Err(OrchestratorError::InvalidInput(
                "owner_id is required".to_string(),
            ));
        }

        let workspace_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let grant = Decimal::from(DEFAULT_CREDITS_GRANT);
        let (credits, soft_limit, hard_limit, direct_pay_limit) = match req.workspace_type {
            WorkspaceType::Credits => (
                grant,
                grant * Decimal::new(50, 2),
                grant * Decimal::new(90, 2),
                None,
            ),
            WorkspaceType::Grant => (
                Decimal::ZERO,
                grant * Decimal::new(50, 2),
                grant * Decimal::new(90, 2),
                None,
            ),
            WorkspaceType::DirectPay => {
                (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, Some(Decimal::ZERO))
            }
        };

        sqlx::query(
            r#"
            INSERT INTO workspaces (owner_id, workspace_id, workspace_type, request_status,
                                    credits, soft_limit, hard_limit, total_usage,
                                    direct_pay_limit, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&req.owner_id)
        .bind(&workspace_id)
        .bind(req.workspace_type)
        .bind(RequestStatus::Pending)
        .bind(fmt_amount(credits))
        .bind(fmt_amount(soft_limit))
        .bind(fmt_amount(hard_limit))
        .bind(fmt_amount(Decimal::ZERO))
        .bind(direct_pay_limit.map(fmt_amount))
        .bind(now.timestamp())
        .execute(&self.pool)
        .await?;

        self.get(&req.owner_id, &workspace_id).await
    }

    /// Get a single record by its full (owner, workspace) key
    pub async fn get(&self, owner_id: &str, workspace_id: &str) -> Result<WorkspaceRecord> {
        let row = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT * FROM workspaces WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(owner_id)
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| OrchestratorError::NotFound(workspace_id.to_string()))?;

        Ok(row.into())
    }

    /// Look up a record by workspace id alone via the secondary index.
    ///
    /// Workspace ids are generated UUIDs, so more than one match means the
    /// generation invariant was violated somewhere and the caller cannot
    /// safely pick a row.
    pub async fn get_by_workspace_id(&self, workspace_id: &str) -> Result<WorkspaceRecord> {
        let mut rows =
            sqlx::query_as::<_, WorkspaceRow>("SELECT * FROM workspaces WHERE workspace_id = ?")
                .bind(workspace_id)
                .fetch_all(&self.pool)
                .await?;

        match rows.len() {
            0 => Err(OrchestratorError::NotFound(workspace_id.to_string())),
            1 => Ok(rows.remove(0).into()),
            _ => Err(OrchestratorError::Ambiguous(workspace_id.to_string())),
        }
    }

    /// List all workspaces owned by a user, newest first
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<WorkspaceRecord>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT * FROM workspaces WHERE owner_id = ? ORDER BY created_at DESC",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }

    /// List every workspace in the table (admin view)
    pub async fn list_all(&self) -> Result<Vec<WorkspaceRecord>> {
        let rows = sqlx::query_as::<_, WorkspaceRow>(
            "SELECT * FROM workspaces ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| row.into()).collect())
    }

    /// Update the soft/hard limit pair. The soft limit must stay strictly
    /// below the hard limit on every write.
    pub async fn set_limits(
        &self,
        owner_id: &str,
        workspace_id: &str,
        soft_limit: Decimal,
        hard_limit: Decimal,
    ) -> Result<WorkspaceRecord> {
        if soft_limit >= hard_limit {
            return Err(OrchestratorError::InvalidInput(
                "hard limit must be larger than soft limit".to_string(),
            ));
        }

        let result = sqlx::query(
            "UPDATE workspaces
             SET soft_limit = ?, hard_limit = ?, limit_updated_at = ?
             WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(fmt_amount(soft_limit))
        .bind(fmt_amount(hard_limit))
        .bind(Utc::now().timestamp())
        .bind(owner_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        self.get(owner_id, workspace_id).await
    }

    /// Overwrite the accumulated usage total, returning both the previous and
    /// the updated record so the caller can detect limit crossings.
    pub async fn set_total_usage(
        &self,
        owner_id: &str,
        workspace_id: &str,
        total_usage: Decimal,
    ) -> Result<UsageWrite> {
        if total_usage < Decimal::ZERO {
            return Err(OrchestratorError::InvalidInput(
                "total usage cannot be negative".to_string(),
            ));
        }

        let previous = self.get(owner_id, workspace_id).await?;

        let result = sqlx::query(
            "UPDATE workspaces
             SET total_usage = ?, usage_updated_at = ?
             WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(fmt_amount(total_usage))
        .bind(Utc::now().timestamp())
        .bind(owner_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        let updated = self.get(owner_id, workspace_id).await?;

        Ok(UsageWrite { previous, updated })
    }

    /// Update the request status for a known (owner, workspace) key
    pub async fn set_status(
        &self,
        owner_id: &str,
        workspace_id: &str,
        status: RequestStatus,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE workspaces SET request_status = ? WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(status)
        .bind(owner_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        Ok(())
    }

    /// Update the request status when only the workspace id is known,
    /// resolving the owner through the secondary index first
    pub async fn set_status_by_workspace_id(
        &self,
        workspace_id: &str,
        status: RequestStatus,
    ) -> Result<WorkspaceRecord> {
        let record = self.get_by_workspace_id(workspace_id).await?;

        self.set_status(&record.owner_id, workspace_id, status)
            .await?;

        self.get(&record.owner_id, workspace_id).await
    }

    /// Attach the member account id assigned during provisioning
    pub async fn set_account_id(
        &self,
        workspace_id: &str,
        account_id: &str,
    ) -> Result<WorkspaceRecord> {
        let record = self.get_by_workspace_id(workspace_id).await?;

        let result = sqlx::query(
            "UPDATE workspaces SET account_id = ? WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(account_id)
        .bind(&record.owner_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        self.get(&record.owner_id, workspace_id).await
    }

    /// Raise the direct-pay ceiling. The new value must cover both usage
    /// limits and can never decrease.
    pub async fn set_direct_pay_limit(
        &self,
        owner_id: &str,
        workspace_id: &str,
        direct_pay_limit: Decimal,
    ) -> Result<WorkspaceRecord> {
        if direct_pay_limit < Decimal::ZERO {
            return Err(OrchestratorError::InvalidInput(
                "direct pay limit must be a positive number".to_string(),
            ));
        }

        let record = self.get(owner_id, workspace_id).await?;

        if direct_pay_limit < record.hard_limit || direct_pay_limit < record.soft_limit {
            return Err(OrchestratorError::InvalidInput(
                "direct pay limit is less than the soft limit or hard limit".to_string(),
            ));
        }
        if let Some(current) = record.direct_pay_limit {
            if direct_pay_limit < current {
                return Err(OrchestratorError::InvalidInput(
                    "direct pay limit is less than the current direct pay limit".to_string(),
                ));
            }
        }

        let result = sqlx::query(
            "UPDATE workspaces SET direct_pay_limit = ? WHERE owner_id = ? AND workspace_id = ?",
        )
        .bind(fmt_amount(direct_pay_limit))
        .bind(owner_id)
        .bind(workspace_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        self.get(owner_id, workspace_id).await
    }

    /// Transition a request into provisioning: attach the issued api key,
    /// the notification channel, the member account id, and optionally an
    /// overridden credits grant, all in one conditional write.
    pub async fn begin_provisioning(
        &self,
        owner_id: &str,
        workspace_id: &str,
        grant: ProvisioningGrant,
    ) -> Result<WorkspaceRecord> {
        let mut sql = String::from(
            "UPDATE workspaces
             SET api_key = ?, notification_channel = ?, account_id = ?,
                 request_status = ?, provisioned_at = ?",
        );
        if grant.credits_amount.is_some() {
            sql.push_str(", credits = ?");
        }
        sql.push_str(" WHERE owner_id = ? AND workspace_id = ?");

        let mut query = sqlx::query(&sql)
            .bind(&grant.api_key)
            .bind(&grant.notification_channel)
            .bind(&grant.account_id)
            .bind(RequestStatus::Provisioning)
            .bind(Utc::now().timestamp());

        if let Some(credits) = grant.credits_amount {
            query = query.bind(fmt_amount(credits));
        }

        let result = query
            .bind(owner_id)
            .bind(workspace_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(OrchestratorError::NotFound(workspace_id.to_string()));
        }

        self.get(owner_id, workspace_id).await
    }
}

/// Render an amount as 2-decimal-place TEXT for storage
fn fmt_amount(amount: Decimal) -> String {
    let mut amount = amount.round_dp(2);
    amount.rescale(2);
    amount.to_string()
}

// Internal row type for sqlx
#[derive(sqlx::FromRow)]
struct WorkspaceRow {
    owner_id: String,
    workspace_id: String,
    workspace_type: WorkspaceType,
    request_status: RequestStatus,
    account_id: Option<String>,
    api_key: Option<String>,
    notification_channel: Option<String>,
    credits: String,
    soft_limit: String,
    hard_limit: String,
    total_usage: String,
    direct_pay_limit: Option<String>,
    created_at: i64,
    limit_updated_at: Option<i64>,
    usage_updated_at: Option<i64>,
    provisioned_at: Option<i64>,
}

impl From<WorkspaceRow> for WorkspaceRecord {
    fn from(row: WorkspaceRow) -> Self {
        Self {
            owner_id: row.owner_id,
            workspace_id: row.workspace_id,
            workspace_type: row.workspace_type,
            request_status: row.request_status,
            account_id: row.account_id,
            api_key: row.api_key,
            notification_channel: row.notification_channel,
            credits: row.credits.parse().unwrap(),
            soft_limit: row.soft_limit.parse().unwrap(),
            hard_limit: row.hard_limit.parse().unwrap(),
            total_usage: row.total_usage.parse().unwrap(),
            direct_pay_limit: row.direct_pay_limit.map(|s| s.parse().unwrap()),
            created_at: DateTime::from_timestamp(row.created_at, 0).unwrap(),
            limit_updated_at: row
                .limit_updated_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            usage_updated_at: row
                .usage_updated_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            provisioned_at: row
                .provisioned_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        }
    }
}
