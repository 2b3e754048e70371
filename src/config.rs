// ABOUTME: Parses the optional migrator configuration file and environment overrides
// ABOUTME: Resolves the DynamoDB Local endpoint and the AWS region/profile to use

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;

pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:8000";
/// Region used for DynamoDB Local when neither the config file nor the AWS
/// provider chain names one
pub const DEFAULT_LOCAL_REGION: &str = "us-east-1";

/// Environment variable that overrides `[local].endpoint`
pub const LOCAL_ENDPOINT_ENV: &str = "DYNAMODB_LOCAL_ENDPOINT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigratorConfig {
    pub local: LocalConfig,
    pub cloud: CloudConfig,
}

/// DynamoDB Local settings
///
/// `region` and `profile` are optional: when unset, `AWS_REGION`,
/// `AWS_PROFILE` and the shared config files decide, so the migrator sees
/// the same per-credential database other AWS tools created.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LocalConfig {
    pub endpoint: String,
    pub region: Option<String>,
    pub profile: Option<String>,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LOCAL_ENDPOINT.to_string(),
            region: None,
            profile: None,
        }
    }
}

/// Cloud settings; unset fields fall through to the AWS provider chain
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CloudConfig {
    pub region: Option<String>,
    pub profile: Option<String>,
}

/// Which DynamoDB endpoint a client talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Local {
        url: String,
        region: Option<String>,
        profile: Option<String>,
    },
    Cloud {
        region: Option<String>,
        profile: Option<String>,
    },
}

impl Endpoint {
    pub fn is_local(&self) -> bool {
        matches!(self, Endpoint::Local { .. })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Local { url, .. } => write!(f, "DynamoDB Local ({})", url),
            Endpoint::Cloud {
                region: Some(region),
                ..
            } => write!(f, "AWS DynamoDB ({})", region),
            Endpoint::Cloud { region: None, .. } => write!(f, "AWS DynamoDB (default region)"),
        }
    }
}

impl MigratorConfig {
    /// Load configuration from `path` (if given) and apply environment overrides
    ///
    /// Without a path the built-in defaults are used: DynamoDB Local on
    /// `http://localhost:8000` and the AWS provider chain for the cloud side.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = fs::read_to_string(path).with_context(|| {
                    format!("Failed to read config file at {}", path.display())
                })?;
                Self::from_toml_str(&raw).with_context(|| {
                    format!("Failed to parse TOML config at {}", path.display())
                })?
            }
            None => Self::default(),
        };

        config.apply_local_override(std::env::var(LOCAL_ENDPOINT_ENV).ok())?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: MigratorConfig = toml::from_str(raw)?;
        validate_endpoint_url(&config.local.endpoint)?;
        Ok(config)
    }

    /// Replace the local endpoint URL when an override is present
    pub fn apply_local_override(&mut self, endpoint: Option<String>) -> Result<()> {
        if let Some(endpoint) = endpoint.filter(|value| !value.trim().is_empty()) {
            validate_endpoint_url(&endpoint)
                .with_context(|| format!("Invalid {} value", LOCAL_ENDPOINT_ENV))?;
            tracing::debug!("Using local endpoint override: {}", endpoint);
            self.local.endpoint = endpoint;
        }
        Ok(())
    }

    pub fn endpoint(&self, local: bool) -> Endpoint {
        if local {
            Endpoint::Local {
                url: self.local.endpoint.clone(),
                region: self.local.region.clone(),
                profile: self.local.profile.clone(),
            }
        } else {
            Endpoint::Cloud {
                region: self.cloud.region.clone(),
                profile: self.cloud.profile.clone(),
            }
        }
    }
}

fn validate_endpoint_url(url: &str) -> Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        bail!(
            "Endpoint URL must start with http:// or https://\n\
             Got: {}",
            url
        );
    }
    Ok(())
}
