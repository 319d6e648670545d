//! Configuration system for the `kanban` binary.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/kanban/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;

use kanban_proto::ids::{InvalidReplicaId, ReplicaId};
use kanban_proto::task::Stars;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// A replica id was given but is blank.
    #[error("invalid {field}: {source}")]
    InvalidReplicaId {
        /// Which setting held the id.
        field: &'static str,
        /// Validation failure.
        source: InvalidReplicaId,
    },

    /// The local and peer replicas resolved to the same id.
    #[error("replica id and peer id are both {0:?}; they must differ")]
    DuplicateReplicaId(String),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    replica: ReplicaFileConfig,
    board: BoardFileConfig,
}

/// `[replica]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ReplicaFileConfig {
    id: Option<String>,
    peer_id: Option<String>,
}

/// `[board]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct BoardFileConfig {
    author: Option<String>,
    default_stars: Option<u8>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved board configuration.
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Identity of the local replica.
    pub replica_id: ReplicaId,
    /// Identity of the demo peer replica.
    pub peer_id: ReplicaId,
    /// Name recorded as author of tasks created from this session.
    pub author: String,
    /// Star rating preselected for new tasks.
    pub default_stars: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            replica_id: default_replica_id(),
            peer_id: default_peer_id(),
            author: "anonymous".to_string(),
            default_stars: 1,
        }
    }
}

impl BoardConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// either file cannot be parsed, or the replica ids are blank or equal.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `BoardConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let replica_id = match cli.replica_id.clone().or_else(|| file.replica.id.clone()) {
            Some(id) => parse_replica_id("replica id", id)?,
            None => defaults.replica_id,
        };
        let peer_id = match cli.peer_id.clone().or_else(|| file.replica.peer_id.clone()) {
            Some(id) => parse_replica_id("peer id", id)?,
            None => defaults.peer_id,
        };
        if replica_id == peer_id {
            return Err(ConfigError::DuplicateReplicaId(replica_id.to_string()));
        }

        Ok(Self {
            replica_id,
            peer_id,
            author: cli
                .author
                .clone()
                .or_else(|| file.board.author.clone())
                .unwrap_or(defaults.author),
            default_stars: file
                .board
                .default_stars
                .filter(|s| Stars::try_from(*s).is_ok())
                .unwrap_or(defaults.default_stars),
        })
    }
}

fn parse_replica_id(field: &'static str, id: String) -> Result<ReplicaId, ConfigError> {
    ReplicaId::new(id).map_err(|source| ConfigError::InvalidReplicaId { field, source })
}

/// `replica-<random>`, unique per session.
fn default_replica_id() -> ReplicaId {
    ReplicaId::generate("replica")
}

/// `peer-<random>`, unique per session.
fn default_peer_id() -> ReplicaId {
    ReplicaId::generate("peer")
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Collaborative kanban board replica")]
pub struct CliArgs {
    /// Identity of the local replica.
    #[arg(long, env = "KANBAN_REPLICA_ID")]
    pub replica_id: Option<String>,

    /// Identity of the demo peer replica.
    #[arg(long)]
    pub peer_id: Option<String>,

    /// Your name, recorded as author of the tasks you create.
    #[arg(long, env = "KANBAN_AUTHOR")]
    pub author: Option<String>,

    /// Path to config file (default: `~/.config/kanban/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print the final board as JSON instead of columns.
    #[arg(long)]
    pub json: bool,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "KANBAN_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/kanban.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("kanban").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
