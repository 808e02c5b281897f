//! State management for declared resources
//!
//! Manages the `.kutt-infra/stacks/<stack>.json` files which record the
//! resolved declarations and outputs of the last applied run of each stack.
//!
//! State files hold resolved secret values (generated passwords, access key
//! secrets) in plain text; masking only applies when rendering. On Unix the
//! state and lock files are created with mode `0600`.

use crate::error::{GraphError, Result};
use crate::resource::Urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

const STATE_VERSION: u32 = 1;
const STATE_DIR: &str = ".kutt-infra";
const STACKS_DIR: &str = "stacks";

/// Placeholder rendered in place of secret values
pub const SECRET_MASK: &str = "[secret]";

/// Resolved state of one stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackState {
    /// State file version
    pub version: u32,

    pub project: String,

    pub stack: String,

    /// Last modified timestamp
    pub updated_at: DateTime<Utc>,

    /// Resources in registration order (owners and dependencies first)
    pub resources: Vec<ResourceState>,

    /// Exported stack outputs
    pub outputs: BTreeMap<String, Value>,

    /// Exported outputs that are secret
    #[serde(default)]
    pub secret_outputs: BTreeSet<String>,
}

impl StackState {
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            version: STATE_VERSION,
            project: project.into(),
            stack: stack.into(),
            updated_at: Utc::now(),
            resources: Vec::new(),
            outputs: BTreeMap::new(),
            secret_outputs: BTreeSet::new(),
        }
    }

    /// Get a resource by URN
    pub fn get_resource(&self, urn: &Urn) -> Option<&ResourceState> {
        self.resources.iter().find(|r| &r.urn == urn)
    }

    /// Resources of one type
    pub fn by_type(&self, resource_type: &str) -> Vec<&ResourceState> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == resource_type)
            .collect()
    }

    /// Direct children of a resource
    pub fn children_of(&self, urn: &Urn) -> Vec<&ResourceState> {
        self.resources
            .iter()
            .filter(|r| r.parent.as_ref() == Some(urn))
            .collect()
    }

    /// Stack outputs with secret values masked
    pub fn masked_outputs(&self) -> BTreeMap<String, Value> {
        self.outputs
            .iter()
            .map(|(key, value)| {
                if self.secret_outputs.contains(key) {
                    (key.clone(), Value::from(SECRET_MASK))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect()
    }
}

/// State of a single resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    pub urn: Urn,

    /// Resource type token
    pub resource_type: String,

    /// Logical name
    pub name: String,

    /// `false` for components
    pub custom: bool,

    /// Logical owner
    pub parent: Option<Urn>,

    /// Explicit and implicit dependencies
    pub dependencies: BTreeSet<Urn>,

    /// Resolved inputs
    pub inputs: Value,

    /// Inputs merged with computed attributes
    pub outputs: Value,

    /// Keys whose values are secret
    pub secret_keys: BTreeSet<String>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl ResourceState {
    pub fn new(urn: Urn, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            urn,
            resource_type: resource_type.into(),
            name: name.into(),
            custom: true,
            parent: None,
            dependencies: BTreeSet::new(),
            inputs: Value::Object(Default::default()),
            outputs: Value::Object(Default::default()),
            secret_keys: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent: Urn) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_inputs(mut self, inputs: Value) -> Self {
        self.outputs = inputs.clone();
        self.inputs = inputs;
        self
    }

    pub fn get_output<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.outputs
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Inputs with secret values masked
    pub fn masked_inputs(&self) -> Value {
        mask(&self.inputs, &self.secret_keys)
    }

    /// Outputs with secret values masked
    pub fn masked_outputs(&self) -> Value {
        mask(&self.outputs, &self.secret_keys)
    }
}

fn mask(value: &Value, secret_keys: &BTreeSet<String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| {
                    if secret_keys.contains(key) {
                        (key.clone(), Value::from(SECRET_MASK))
                    } else {
                        (key.clone(), value.clone())
                    }
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// State manager for reading/writing stack state files
pub struct StateManager {
    /// Project root directory
    project_root: PathBuf,
}

impl StateManager {
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        Self {
            project_root: project_root.as_ref().to_path_buf(),
        }
    }

    /// Get the stacks directory path
    fn stacks_dir(&self) -> PathBuf {
        self.project_root.join(STATE_DIR).join(STACKS_DIR)
    }

    /// Get the state file path of a stack
    pub fn state_path(&self, stack: &str) -> PathBuf {
        self.stacks_dir().join(format!("{}.json", stack))
    }

    fn backup_path(&self, stack: &str) -> PathBuf {
        self.stacks_dir().join(format!("{}.json.backup", stack))
    }

    fn lock_path(&self, stack: &str) -> PathBuf {
        self.stacks_dir().join(format!("{}.lock", stack))
    }

    /// Ensure the stacks directory exists
    async fn ensure_state_dir(&self) -> Result<()> {
        let dir = self.stacks_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir).await?;
            tracing::debug!("Created state directory: {}", dir.display());
        }
        Ok(())
    }

    /// Load the saved state of a stack, if any
    pub async fn load(&self, stack: &str) -> Result<Option<StackState>> {
        let path = self.state_path(stack);
        if !path.exists() {
            tracing::debug!(stack, "State file not found");
            return Ok(None);
        }

        let content = fs::read_to_string(&path).await?;
        let state: StackState = serde_json::from_str(&content)?;

        if state.version > STATE_VERSION {
            return Err(GraphError::StateError(format!(
                "State file version {} is newer than supported version {}",
                state.version, STATE_VERSION
            )));
        }

        tracing::debug!(stack, "Loaded state with {} resources", state.resources.len());
        Ok(Some(state))
    }

    /// Save the state of a stack
    pub async fn save(&self, state: &StackState) -> Result<()> {
        self.ensure_state_dir().await?;

        let path = self.state_path(&state.stack);
        let backup = self.backup_path(&state.stack);

        // Keep the previous state next to the new one
        if path.exists() {
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!("Created state backup");
        }

        let content = serde_json::to_string_pretty(state)?;
        let mut file = create_private(&path, false).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(
            stack = %state.stack,
            "Saved state with {} resources",
            state.resources.len()
        );
        Ok(())
    }

    /// Remove the state of a destroyed stack, keeping a backup
    pub async fn remove(&self, stack: &str) -> Result<()> {
        let path = self.state_path(stack);
        if path.exists() {
            let backup = self.backup_path(stack);
            if backup.exists() {
                fs::remove_file(&backup).await?;
            }
            fs::rename(&path, &backup).await?;
            tracing::debug!(stack, "Removed state");
        }
        Ok(())
    }

    /// Acquire a lock for exclusive access to a stack
    ///
    /// The lock file is created with `create_new`, so only one caller can
    /// hold it. A lock older than an hour is taken over.
    pub async fn acquire_lock(&self, stack: &str) -> Result<StateLock> {
        self.ensure_state_dir().await?;

        let lock_path = self.lock_path(stack);
        let lock_info = LockInfo {
            holder: std::env::var("HOSTNAME")
                .or_else(|_| std::env::var("HOST"))
                .unwrap_or_else(|_| "unknown".to_string()),
            acquired_at: Utc::now(),
        };
        let content = serde_json::to_string_pretty(&lock_info)?;

        // One retry after removing a stale lock
        for _ in 0..2 {
            match create_private(&lock_path, true).await {
                Ok(mut file) => {
                    file.write_all(content.as_bytes()).await?;
                    file.flush().await?;
                    tracing::debug!(stack, "Acquired state lock");
                    return Ok(StateLock {
                        lock_path,
                        released: false,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    self.check_stale_lock(stack, &lock_path).await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(GraphError::LockError(format!(
            "Stack {} was locked again while taking over a stale lock",
            stack
        )))
    }

    /// Remove the lock at `lock_path` if it is stale, fail if it is held
    async fn check_stale_lock(&self, stack: &str, lock_path: &Path) -> Result<()> {
        let content = match fs::read_to_string(lock_path).await {
            Ok(content) => content,
            // Released in the meantime
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        // An unreadable lock (crash mid-write) is aged by its mtime
        let (holder, acquired_at) = match serde_json::from_str::<LockInfo>(&content) {
            Ok(info) => (info.holder, info.acquired_at),
            Err(_) => {
                let modified = fs::metadata(lock_path).await?.modified()?;
                ("an unreadable lock file".to_string(), DateTime::<Utc>::from(modified))
            }
        };

        // Locks older than an hour are considered stale
        let age = Utc::now().signed_duration_since(acquired_at);
        if age.num_hours() < 1 {
            return Err(GraphError::LockError(format!(
                "Stack {} is locked by {} since {}",
                stack, holder, acquired_at
            )));
        }

        tracing::warn!(stack, "Removing stale lock from {}", holder);
        match fs::remove_file(lock_path).await {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Open a file readable only by the current user
///
/// With `create_new` the call fails with `AlreadyExists` instead of
/// truncating an existing file.
async fn create_private(path: &Path, create_new: bool) -> std::io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true);
    if create_new {
        options.create_new(true);
    } else {
        options.create(true).truncate(true);
    }
    #[cfg(unix)]
    options.mode(0o600);
    options.open(path).await
}

/// Lock information
#[derive(Debug, Serialize, Deserialize)]
struct LockInfo {
    holder: String,
    acquired_at: DateTime<Utc>,
}

/// RAII guard for a stack lock
pub struct StateLock {
    lock_path: PathBuf,
    released: bool,
}

impl StateLock {
    /// Release the lock
    pub async fn release(mut self) -> Result<()> {
        if !self.released {
            if self.lock_path.exists() {
                fs::remove_file(&self.lock_path).await?;
                tracing::debug!("Released state lock");
            }
            self.released = true;
        }
        Ok(())
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if !self.released && self.lock_path.exists() {
            let _ = std::fs::remove_file(&self.lock_path);
        }
    }
}
