pub mod error;
pub mod stack;

pub use error::*;
pub use stack::{DnsSettings, SimulationSettings, StackConfig};

use std::path::{Path, PathBuf};

/// Environment variable naming the stack file directly
pub const CONFIG_PATH_ENV: &str = "KUTT_INFRA_CONFIG";

/// Directory holding stack files and state inside a project
pub const PROJECT_DIR: &str = ".kutt-infra";

/// kutt-infra's global config directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("kutt-infra");
    Ok(config_dir)
}

/// File names tried for `stack`, most specific first
pub fn stack_file_names(stack: &str) -> [String; 2] {
    [
        format!("Kutt.{}.local.yaml", stack),
        format!("Kutt.{}.yaml", stack),
    ]
}

/// Find the stack file for `stack`
///
/// Search order:
/// 1. `KUTT_INFRA_CONFIG` (direct path)
/// 2. Current directory: `Kutt.<stack>.local.yaml`, `Kutt.<stack>.yaml`
/// 3. `./.kutt-infra/` with the same names
/// 4. `~/.config/kutt-infra/Kutt.<stack>.yaml`
pub fn find_stack_file(stack: &str) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{} points to a missing file", CONFIG_PATH_ENV);
    }

    let current_dir = std::env::current_dir()?;
    if let Some(path) = find_in(&current_dir, stack) {
        return Ok(path);
    }
    if let Some(path) = find_in(&current_dir.join(PROJECT_DIR), stack) {
        return Ok(path);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join(format!("Kutt.{}.yaml", stack));
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::StackFileNotFound(stack.to_string()))
}

fn find_in(dir: &Path, stack: &str) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }
    stack_file_names(stack)
        .into_iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

/// Project root for a stack file: the directory holding it, or the parent
/// of `.kutt-infra/` when the file lives there
pub fn project_root(stack_file: &Path) -> PathBuf {
    let dir = stack_file.parent().unwrap_or_else(|| Path::new("."));
    if dir.file_name().is_some_and(|name| name == PROJECT_DIR) {
        dir.parent().unwrap_or(dir).to_path_buf()
    } else {
        dir.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    fn in_dir<F: FnOnce()>(dir: &Path, f: F) {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        temp_env::with_var_unset(CONFIG_PATH_ENV, f);
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("kutt-infra"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Kutt.prod.yaml"), "project: kutt").unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_stack_file("prod").unwrap();
            assert!(path.ends_with("Kutt.prod.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_takes_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Kutt.prod.yaml"), "project: kutt").unwrap();
        fs::write(temp_dir.path().join("Kutt.prod.local.yaml"), "project: kutt").unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_stack_file("prod").unwrap();
            assert!(path.ends_with("Kutt.prod.local.yaml"));
        });
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_project_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(PROJECT_DIR);
        fs::create_dir(&project_dir).unwrap();
        fs::write(project_dir.join("Kutt.staging.yaml"), "project: kutt").unwrap();

        in_dir(temp_dir.path(), || {
            let path = find_stack_file("staging").unwrap();
            assert!(path.ends_with(".kutt-infra/Kutt.staging.yaml"));
            assert_eq!(
                project_root(&path).canonicalize().unwrap(),
                temp_dir.path().canonicalize().unwrap()
            );
        });
    }

    #[test]
    #[serial]
    fn test_env_var_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.yaml");
        fs::write(&config_path, "project: kutt").unwrap();
        fs::write(temp_dir.path().join("Kutt.prod.yaml"), "project: kutt").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(config_path.to_str().unwrap()), || {
            assert_eq!(find_stack_file("prod").unwrap(), config_path);
        });
    }

    #[test]
    #[serial]
    fn test_other_stacks_are_not_picked_up() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("Kutt.prod.yaml"), "project: kutt").unwrap();

        in_dir(temp_dir.path(), || {
            let result = find_stack_file("dev-nobody-uses");
            assert!(matches!(result, Err(ConfigError::StackFileNotFound(stack)) if stack == "dev-nobody-uses"));
        });
    }
}
