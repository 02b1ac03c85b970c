//! Scan settings and OCI profile loading.
//!
//! Credentials come from the standard OCI CLI/SDK config file, an INI file
//! with one section per profile:
//!
//! ```text
//! [DEFAULT]
//! user=ocid1.user.oc1..aaaa
//! fingerprint=12:34:...:ef
//! key_file=~/.oci/oci_api_key.pem
//! tenancy=ocid1.tenancy.oc1..aaaa
//! region=us-ashburn-1
//! ```
//!
//! As with the SDKs, keys missing from the selected profile are inherited
//! from `[DEFAULT]`.

use crate::oci_api::signer::{RequestSigner, SignerError};
use crate::provisioning::{ProvisionPolicy, LOG_GROUP_NAME, LOG_STREAM_NAME};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PROFILE: &str = "DEFAULT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read OCI config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile [{profile}] not found in {path}")]
    MissingProfile { profile: String, path: PathBuf },

    #[error("profile [{profile}] is missing required key '{key}'")]
    MissingKey { profile: String, key: &'static str },

    #[error("line {line} of {path} is not a section header or key=value pair")]
    Syntax { path: PathBuf, line: usize },

    #[error("encrypted private keys (pass_phrase) are not supported; decrypt {0} first")]
    EncryptedKey(PathBuf),

    #[error("failed to read private key {path}: {source}")]
    ReadKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to load private key {path}: {source}")]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: SignerError,
    },

    #[error("could not determine home directory for the default OCI config path")]
    NoHomeDir,
}

/// Credentials and region of one profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OciProfile {
    pub name: String,
    pub user: String,
    pub fingerprint: String,
    pub key_file: PathBuf,
    pub tenancy: String,
    pub region: String,
    pub pass_phrase: Option<String>,
}

impl OciProfile {
    /// Load a profile using CLI overrides, then `OCI_CONFIG_FILE` /
    /// `OCI_CLI_PROFILE`, then `~/.oci/config` and `DEFAULT`.
    pub fn from_options(
        config_file: Option<&str>,
        profile: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let path = match config_file
            .map(str::to_string)
            .or_else(|| env::var("OCI_CONFIG_FILE").ok())
        {
            Some(p) => expand_home(&p)?,
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(".oci").join("config"),
        };
        let profile = profile
            .map(str::to_string)
            .or_else(|| env::var("OCI_CLI_PROFILE").ok())
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        Self::load(&path, &profile)
    }

    pub fn load(path: &Path, profile: &str) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path, profile)
    }

    /// Parse profile text; `path` is only used in error messages and to
    /// resolve a relative `key_file`.
    pub fn parse(text: &str, path: &Path, profile: &str) -> Result<Self, ConfigError> {
        let sections = parse_ini(text, path)?;
        let defaults = sections.get(DEFAULT_PROFILE);
        let selected = sections.get(profile).ok_or_else(|| ConfigError::MissingProfile {
            profile: profile.to_string(),
            path: path.to_path_buf(),
        })?;

        let lookup = |key: &'static str| -> Option<String> {
            selected
                .get(key)
                .or_else(|| defaults.and_then(|d| d.get(key)))
                .cloned()
        };
        let require = |key: &'static str| {
            lookup(key).ok_or_else(|| ConfigError::MissingKey {
                profile: profile.to_string(),
                key,
            })
        };

        let mut key_file = expand_home(&require("key_file")?)?;
        if key_file.is_relative() {
            if let Some(dir) = path.parent() {
                key_file = dir.join(key_file);
            }
        }

        Ok(Self {
            name: profile.to_string(),
            user: require("user")?,
            fingerprint: require("fingerprint")?,
            key_file,
            tenancy: require("tenancy")?,
            region: require("region")?,
            pass_phrase: lookup("pass_phrase").filter(|p| !p.is_empty()),
        })
    }

    /// `keyId` used when signing requests.
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    /// Read the API key and build a request signer for this profile.
    pub fn signer(&self) -> Result<RequestSigner, ConfigError> {
        if self.pass_phrase.is_some() {
            return Err(ConfigError::EncryptedKey(self.key_file.clone()));
        }
        let pem = fs::read_to_string(&self.key_file).map_err(|source| ConfigError::ReadKey {
            path: self.key_file.clone(),
            source,
        })?;
        RequestSigner::from_pem(self.key_id(), &pem).map_err(|source| ConfigError::InvalidKey {
            path: self.key_file.clone(),
            source,
        })
    }
}

fn expand_home(raw: &str) -> Result<PathBuf, ConfigError> {
    match raw.strip_prefix("~/") {
        Some(rest) => Ok(dirs::home_dir().ok_or(ConfigError::NoHomeDir)?.join(rest)),
        None if raw == "~" => dirs::home_dir().ok_or(ConfigError::NoHomeDir),
        None => Ok(PathBuf::from(raw)),
    }
}

type Sections = HashMap<String, HashMap<String, String>>;

fn parse_ini(text: &str, path: &Path) -> Result<Sections, ConfigError> {
    let mut sections: Sections = HashMap::new();
    let mut current: Option<String> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }
        let syntax = || ConfigError::Syntax {
            path: path.to_path_buf(),
            line: idx + 1,
        };
        let (key, value) = line.split_once('=').ok_or_else(syntax)?;
        let section = current.as_ref().ok_or_else(syntax)?;
        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}

/// Everything a scan needs besides its service clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSettings {
    /// Compartment the log group lives in.
    pub compartment_id: String,
    pub log_group_name: String,
    pub log_stream_name: String,
    pub provision: ProvisionPolicy,
    /// Evaluate keys without provisioning the sink or sending alerts.
    pub dry_run: bool,
}

impl ScanSettings {
    pub fn new(compartment_id: impl Into<String>) -> Self {
        Self {
            compartment_id: compartment_id.into(),
            log_group_name: LOG_GROUP_NAME.to_string(),
            log_stream_name: LOG_STREAM_NAME.to_string(),
            provision: ProvisionPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_provision_policy(mut self, policy: ProvisionPolicy) -> Self {
        self.provision = policy;
        self
    }
}
