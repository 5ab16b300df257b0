use std::collections::BTreeMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GridError, Result};

/// Mode given to a log directory created by [`resolve_log_dir`] (`rwxrw-rw-`).
const LOG_DIR_MODE: u32 = 0o766;

/// Which scheduler's template and parser set to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Slurm,
    Sge,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Slurm => "slurm",
            EngineKind::Sge => "sge",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command used to probe Slurm controller health.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HealthProbe {
    /// `scontrol show config`
    #[default]
    ShowConfig,
    /// `scontrol ping`
    Ping,
    /// `sinfo --summarize`
    Sinfo,
}

/// How scheduler binaries are launched.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Directory prefixed to bare program names (e.g. `/opt/slurm/bin`)
    pub program_dir: Option<PathBuf>,
    /// Extra environment passed to every command (e.g. `SGE_ROOT`)
    pub env: BTreeMap<String, String>,
}

/// Location of the SGE qmaster for `qping`.
#[derive(Debug, Clone)]
pub struct SgeConfig {
    pub qmaster_host: String,
    pub qmaster_port: u16,
}

impl Default for SgeConfig {
    fn default() -> Self {
        Self {
            qmaster_host: "localhost".to_string(),
            qmaster_port: 6444,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub engine: EngineKind,
    /// Directory with `<engine>/<operation>.hbs` files that replace built-in templates
    pub templates_dir: Option<PathBuf>,
    /// Folder shared between this service and the execution hosts
    pub shared_folder: PathBuf,
    /// Job log directory, absolute or relative to `shared_folder`
    pub log_dir: PathBuf,
    pub executor: ExecutorConfig,
    pub health_probe: HealthProbe,
    pub sge: SgeConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::Slurm,
            templates_dir: None,
            shared_folder: PathBuf::from("/data"),
            log_dir: PathBuf::from("logs"),
            executor: ExecutorConfig::default(),
            health_probe: HealthProbe::default(),
            sge: SgeConfig::default(),
        }
    }
}

impl BridgeConfig {
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            ..Default::default()
        }
    }

    pub fn with_templates_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.templates_dir = Some(dir.into());
        self
    }

    pub fn with_shared_folder(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shared_folder = dir.into();
        self
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.executor.env.insert(name.into(), value.into());
        self
    }
}

/// Resolve the job log directory against the shared folder and make sure it exists.
///
/// A relative `log_dir` is placed under `shared_folder`; an absolute one must
/// already live inside it.
pub fn resolve_log_dir(shared_folder: &Path, log_dir: &Path) -> Result<PathBuf> {
    let resolved = if log_dir.is_absolute() {
        if !log_dir.starts_with(shared_folder) {
            return Err(GridError::BadRequest(format!(
                "Log directory {} is absolute but is not inside shared folder {}",
                log_dir.display(),
                shared_folder.display()
            )));
        }
        log_dir.to_path_buf()
    } else {
        let joined = shared_folder.join(log_dir);
        tracing::info!(path = %joined.display(), "Log directory resolved under shared folder");
        joined
    };

    if !resolved.exists() {
        std::fs::create_dir_all(&resolved)?;
        std::fs::set_permissions(&resolved, std::fs::Permissions::from_mode(LOG_DIR_MODE))?;
        tracing::info!(path = %resolved.display(), "Created log directory");
    }
    Ok(resolved)
}
