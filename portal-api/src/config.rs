use portal_provisioner::ProvisionerConfig;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    #[serde(default = "default_region")]
    pub region: String,

    /// Domain for generated member-account root addresses.
    #[serde(default = "default_email_domain")]
    pub email_domain: String,

    /// Separate root-address domain for direct-pay workspaces.
    #[serde(default = "default_direct_pay_email_domain")]
    pub direct_pay_email_domain: String,

    /// Managed instance the post-deploy command batch runs on.
    #[serde(default = "default_admin_instance_id")]
    pub admin_instance_id: String,

    #[serde(default = "default_command_wait")]
    pub command_wait_secs: u64,

    #[serde(default = "default_poll_max_attempts")]
    pub poll_max_attempts: u32,
}

fn default_bind_addr() -> String {
    std::env::var("PORTAL_API_BIND").unwrap_or_else(|_| "0.0.0.0:3141".to_string())
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PORTAL_API_DB_PATH") {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        let appdata = std::env::var("APPDATA").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(appdata)
            .join("portal")
            .join("api")
            .join("portal.db")
    } else {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home)
            .join(".portal")
            .join("api")
            .join("portal.db")
    }
}

fn default_region() -> String {
    std::env::var("PORTAL_REGION").unwrap_or_else(|_| "us-east-1".to_string())
}

fn default_email_domain() -> String {
    std::env::var("PORTAL_EMAIL_DOMAIN").unwrap_or_else(|_| "workspaces.example.org".to_string())
}

fn default_direct_pay_email_domain() -> String {
    std::env::var("PORTAL_DIRECT_PAY_EMAIL_DOMAIN")
        .unwrap_or_else(|_| "directpay.example.org".to_string())
}

fn default_admin_instance_id() -> String {
    std::env::var("PORTAL_ADMIN_INSTANCE_ID").unwrap_or_else(|_| "i-admin-vm".to_string())
}

fn default_command_wait() -> u64 {
    std::env::var("PORTAL_COMMAND_WAIT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(15)
}

fn default_poll_max_attempts() -> u32 {
    std::env::var("PORTAL_POLL_MAX_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(80) // ~20 minutes at the default wait
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            db_path: default_db_path(),
            region: default_region(),
            email_domain: default_email_domain(),
            direct_pay_email_domain: default_direct_pay_email_domain(),
            admin_instance_id: default_admin_instance_id(),
            command_wait_secs: default_command_wait(),
            poll_max_attempts: default_poll_max_attempts(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn provisioner_config(&self) -> ProvisionerConfig {
        ProvisionerConfig {
            command_wait: Duration::from_secs(self.command_wait_secs),
            poll_max_attempts: self.poll_max_attempts,
            admin_instance_id: self.admin_instance_id.clone(),
            ..ProvisionerConfig::default()
        }
    }
}
