//! Stack file model
//!
//! ```yaml
//! project: kutt
//! region: us-west-2
//! config:
//!   site_name: brig.gs
//!   admin_emails: ops@brig.gs
//! secrets:
//!   recaptcha_site_key: ...
//! tags:
//!   Name: kutt
//!   environment: production
//! references:
//!   jaxxstorm/vpc/prod:
//!     vpc_id: vpc-0a1b2c3d
//!     private_subnet_ids: [subnet-a, subnet-b]
//! dns:
//!   zone_id: 023e105f4ecef8ad9ca31a8372d0c353
//!   domain: brig.gs
//!   listener_priority: 10
//! simulation:
//!   account_id: "123456789012"
//!   vpcs:
//!     vpc-0a1b2c3d: 10.0.0.0/16
//! ```

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Prefix of environment variables overriding secrets
pub const SECRET_ENV_PREFIX: &str = "KUTT_INFRA_SECRET_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackConfig {
    pub project: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub config: BTreeMap<String, String>,

    #[serde(default)]
    pub secrets: BTreeMap<String, String>,

    /// Applied to every taggable resource of the service components
    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    /// Outputs of other stacks, keyed by `org/project/stack`
    #[serde(default)]
    pub references: BTreeMap<String, Map<String, Value>>,

    #[serde(default)]
    pub dns: Option<DnsSettings>,

    #[serde(default)]
    pub simulation: SimulationSettings,
}

/// Cloudflare record and listener rule for a custom domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsSettings {
    pub zone_id: String,
    pub domain: String,
    pub listener_priority: u32,

    /// Listener output on the load balancer stack
    #[serde(default = "default_listener_output")]
    pub listener_output: String,
}

/// Inputs to the simulated providers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationSettings {
    #[serde(default = "default_account_id")]
    pub account_id: String,

    /// VPC id to CIDR block
    #[serde(default)]
    pub vpcs: BTreeMap<String, String>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            account_id: default_account_id(),
            vpcs: BTreeMap::new(),
        }
    }
}

fn default_region() -> String {
    "us-west-2".to_string()
}

fn default_account_id() -> String {
    "000000000000".to_string()
}

fn default_listener_output() -> String {
    "https_listener_arn".to_string()
}

impl StackConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), project = %config.project, "Loaded stack file");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.project.trim().is_empty() {
            return Err(ConfigError::Invalid("project must not be empty".to_string()));
        }
        if let Some(dns) = &self.dns {
            if dns.domain.is_empty() || dns.zone_id.is_empty() {
                return Err(ConfigError::Invalid(
                    "dns needs both zone_id and domain".to_string(),
                ));
            }
            if !(1..=50000).contains(&dns.listener_priority) {
                return Err(ConfigError::Invalid(
                    "dns.listener_priority must be between 1 and 50000".to_string(),
                ));
            }
        }
        if let Some(key) = self.config.keys().find(|k| self.secrets.contains_key(*k)) {
            return Err(ConfigError::Invalid(format!(
                "'{}' is set both as config and as a secret",
                key
            )));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ConfigError::MissingValue(key.to_string()))
    }

    /// A secret from the environment override or the stack file
    pub fn require_secret(&self, key: &str) -> Result<String> {
        if let Ok(value) = std::env::var(secret_env_var(key)) {
            return Ok(value);
        }
        self.secrets
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::MissingSecret(key.to_string()))
    }

    /// Outputs published by another stack
    pub fn reference(&self, name: &str) -> Result<&Map<String, Value>> {
        self.references
            .get(name)
            .ok_or_else(|| ConfigError::ReferenceNotFound(name.to_string()))
    }
}

/// `recaptcha_site_key` becomes `KUTT_INFRA_SECRET_RECAPTCHA_SITE_KEY`
pub fn secret_env_var(key: &str) -> String {
    format!(
        "{}{}",
        SECRET_ENV_PREFIX,
        key.to_ascii_uppercase().replace(['-', '.'], "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const STACK_FILE: &str = r#"
project: kutt
config:
  site_name: brig.gs
secrets:
  recaptcha_site_key: site-key
references:
  jaxxstorm/vpc/prod:
    vpc_id: vpc-0a1b2c3d
    private_subnet_ids: [subnet-a, subnet-b]
simulation:
  vpcs:
    vpc-0a1b2c3d: 10.0.0.0/16
"#;

    fn parse(yaml: &str) -> StackConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(STACK_FILE);
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.simulation.account_id, "000000000000");
        assert_eq!(config.simulation.vpcs["vpc-0a1b2c3d"], "10.0.0.0/16");
        assert!(config.dns.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_require() {
        let config = parse(STACK_FILE);
        assert_eq!(config.require("site_name").unwrap(), "brig.gs");
        assert!(config.get("admin_emails").is_none());
        assert!(matches!(
            config.require("admin_emails"),
            Err(ConfigError::MissingValue(key)) if key == "admin_emails"
        ));
    }

    #[test]
    #[serial]
    fn test_secret_env_override() {
        let config = parse(STACK_FILE);

        temp_env::with_var_unset("KUTT_INFRA_SECRET_RECAPTCHA_SITE_KEY", || {
            assert_eq!(config.require_secret("recaptcha_site_key").unwrap(), "site-key");
        });
        temp_env::with_var(
            "KUTT_INFRA_SECRET_RECAPTCHA_SITE_KEY",
            Some("from-env"),
            || {
                assert_eq!(config.require_secret("recaptcha_site_key").unwrap(), "from-env");
            },
        );
        temp_env::with_var_unset("KUTT_INFRA_SECRET_JWT", || {
            assert!(matches!(
                config.require_secret("jwt"),
                Err(ConfigError::MissingSecret(_))
            ));
        });
    }

    #[test]
    fn test_reference() {
        let config = parse(STACK_FILE);
        let vpc = config.reference("jaxxstorm/vpc/prod").unwrap();
        assert_eq!(vpc["vpc_id"], "vpc-0a1b2c3d");
        assert!(matches!(
            config.reference("jaxxstorm/ecs/prod"),
            Err(ConfigError::ReferenceNotFound(_))
        ));
    }

    #[test]
    fn test_dns_validation() {
        let mut config = parse(STACK_FILE);
        config.dns = Some(DnsSettings {
            zone_id: "zone".to_string(),
            domain: "brig.gs".to_string(),
            listener_priority: 0,
            listener_output: default_listener_output(),
        });
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_key_in_config_and_secrets_rejected() {
        let mut config = parse(STACK_FILE);
        config
            .config
            .insert("recaptcha_site_key".to_string(), "plain".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_reports_path_on_parse_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("Kutt.prod.yaml");
        std::fs::write(&path, "project: [unterminated").unwrap();

        match StackConfig::load(&path) {
            Err(ConfigError::Parse { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_secret_env_var_name() {
        assert_eq!(
            secret_env_var("google-safe-browsing.key"),
            "KUTT_INFRA_SECRET_GOOGLE_SAFE_BROWSING_KEY"
        );
    }
}
