use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub github: GitHubConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self { Self { port: default_port() } }
}

fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    /// Numeric GitHub App ID.
    pub app_id: u64,
    /// Path to the app's RSA private key (PEM).
    pub private_key_path: PathBuf,
    /// Shared secret for `X-Hub-Signature-256`. Deliveries are not verified when unset.
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl GitHubConfig {
    pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }
}

fn default_request_timeout_secs() -> u64 { 5 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Simulated work between a check run entering `in_progress` and its completion.
    #[serde(default = "default_completion_delay_secs")]
    pub completion_delay_secs: u64,
    #[serde(default = "default_check_run_name")]
    pub check_run_name: String,
    #[serde(default = "default_rerun_check_run_name")]
    pub rerun_check_run_name: String,
}

impl WorkflowConfig {
    pub fn completion_delay(&self) -> Duration { Duration::from_secs(self.completion_delay_secs) }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            completion_delay_secs: default_completion_delay_secs(),
            check_run_name: default_check_run_name(),
            rerun_check_run_name: default_rerun_check_run_name(),
        }
    }
}

fn default_completion_delay_secs() -> u64 { 10 }

fn default_check_run_name() -> String { "checkbot".to_string() }

fn default_rerun_check_run_name() -> String { "checkbot (rerun)".to_string() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config: Config = serde_yaml::from_str(
            "github:\n  app_id: 1234\n  private_key_path: private-key.pem\n",
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.github.app_id, 1234);
        assert_eq!(config.github.webhook_secret, None);
        assert_eq!(config.github.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.workflow.completion_delay(), Duration::from_secs(10));
        assert_eq!(config.workflow.check_run_name, "checkbot");
    }

    #[test]
    fn test_full_config() {
        let config: Config = serde_yaml::from_str(
            r#"
server:
  port: 3000
github:
  app_id: 42
  private_key_path: /etc/checkbot/key.pem
  webhook_secret: hunter2
  request_timeout_secs: 30
workflow:
  completion_delay_secs: 1
  check_run_name: lint
  rerun_check_run_name: lint again
"#,
        )
        .unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.github.webhook_secret.as_deref(), Some("hunter2"));
        assert_eq!(config.github.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.workflow.completion_delay(), Duration::from_secs(1));
        assert_eq!(config.workflow.rerun_check_run_name, "lint again");
    }
}
