use anyhow::{Context, Result, bail};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::clock::LocalClock;

/// File name looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "claimdesk.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
}

impl DeskConfig {
    /// Clock reading system time in the configured zone.
    #[must_use]
    pub const fn clock(&self) -> LocalClock {
        LocalClock::system(self.schedule.time_zone)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Prefix for absolute links embedded in exported documents.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Sender shown as ORGANIZER on invites. Invites carry no organizer
    /// while this is unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer_name: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_base_url: default_public_base_url(),
            organizer_email: None,
            organizer_name: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default = "default_upload_dir")]
    pub upload_dir: PathBuf,
    #[serde(default = "default_invite_dir")]
    pub invite_dir: PathBuf,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            upload_dir: default_upload_dir(),
            invite_dir: default_invite_dir(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA zone used for audit timestamps, "today", and invite times.
    #[serde(default = "default_time_zone")]
    pub time_zone: Tz,
    #[serde(default = "default_invite_duration_minutes")]
    pub invite_duration_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            invite_duration_minutes: default_invite_duration_minutes(),
        }
    }
}

/// What the assignment workflow does with a vendor/assignee id that does
/// not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Store the work order as unassigned for that role.
    #[default]
    Lenient,
    /// Reject the submission with a validation error.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default)]
    pub reference_policy: ReferencePolicy,
}

/// Candidate config files in lookup order.
#[must_use]
pub fn config_candidates(working_dir: &Path) -> Vec<PathBuf> {
    let mut candidates = vec![working_dir.join(LOCAL_CONFIG_FILE)];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("claimdesk/config.toml"));
    }
    candidates
}

/// Load configuration.
///
/// An explicit path must exist. Without one, the first existing candidate
/// from [`config_candidates`] is used, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the parsed
/// values are unusable.
pub fn load_config(explicit: Option<&Path>, working_dir: &Path) -> Result<DeskConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                bail!("config file {} does not exist", path.display());
            }
            Some(path.to_path_buf())
        }
        None => config_candidates(working_dir)
            .into_iter()
            .find(|candidate| candidate.exists()),
    };

    let Some(path) = path else {
        tracing::debug!("no config file found, using defaults");
        return Ok(DeskConfig::default());
    };

    let config = load_config_file(&path)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Read and validate one TOML config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_config_file(path: &Path) -> Result<DeskConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<DeskConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    validate(&config).with_context(|| format!("Invalid settings in {}", path.display()))?;
    Ok(config)
}

fn validate(config: &DeskConfig) -> Result<()> {
    if config.schedule.invite_duration_minutes == 0 {
        bail!("schedule.invite_duration_minutes must be at least 1");
    }
    if config.storage.max_upload_bytes == 0 {
        bail!("storage.max_upload_bytes must be at least 1");
    }
    if config.server.public_base_url.trim().is_empty() {
        bail!("server.public_base_url must not be empty");
    }
    Ok(())
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_database() -> PathBuf {
    PathBuf::from("claimdesk.db")
}

fn default_upload_dir() -> PathBuf {
    PathBuf::from("static/uploads")
}

fn default_invite_dir() -> PathBuf {
    PathBuf::from("static/ics")
}

const fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

const fn default_time_zone() -> Tz {
    chrono_tz::America::Chicago
}

const fn default_invite_duration_minutes() -> u32 {
    60
}
