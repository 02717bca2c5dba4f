// src/core/context.rs

use crate::{
    constants::{
        GLOBAL_SETTINGS_FILENAME, LOCAL_SETTINGS_FILENAME, PROJECT_CONFIG_FILENAME, QUIVER_DIR,
        WORKGROUP_SETTINGS_FILENAME,
    },
    core::settings::{
        COMMAND_LINE_LEVEL, GLOBAL_LEVEL, LOCAL_LEVEL, LayeredSettings, SettingsError,
        WORKGROUP_LEVEL,
    },
    models::{ProjectConfig, ProjectContext},
};
use anyhow::{Context as _, Result, anyhow};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Settings domain holding free-form key-value pairs.
pub const VALUE_DOMAIN: &str = "value";
/// Settings domain holding stored per-command parameters.
pub const PARAMETERS_DOMAIN: &str = "parameters";
/// Settings domain holding command alias expansions.
pub const ALIAS_DOMAIN: &str = "alias";

/// The process-wide configuration context: application identity and
/// directories, the active project (if any), and the factory for the layered
/// settings store. Constructed once in the entry point and passed down by
/// parameter — nothing here is a global.
#[derive(Debug)]
pub struct Context {
    pub app_name: String,
    pub app_dir: PathBuf,
    pub project: Option<ProjectContext>,
}

impl Context {
    /// Builds the context for the current process: ensures the application
    /// config directory exists and walks up from the working directory
    /// looking for a `.quiver/` project marker.
    pub fn discover(app_name: &str) -> Result<Self> {
        let app_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not find the system config directory."))?
            .join(app_name);
        if !app_dir.exists() {
            fs::create_dir_all(&app_dir).with_context(|| {
                format!("Could not create config directory at '{}'", app_dir.display())
            })?;
        }
        let cwd = env::current_dir().context("Could not determine the working directory.")?;
        let project = find_project(&cwd)?;
        if let Some(project) = &project {
            log::debug!("Active project found at '{}'", project.root.display());
        }
        Ok(Self {
            app_name: app_name.to_string(),
            app_dir,
            project,
        })
    }

    /// The ordered level stack for this run, highest precedence first. The
    /// project-scoped levels only exist when a project is active.
    pub fn level_stack(&self) -> Vec<(String, Option<PathBuf>)> {
        let mut stack = vec![(COMMAND_LINE_LEVEL.to_string(), None)];
        if let Some(project) = &self.project {
            let quiver_dir = project.root.join(QUIVER_DIR);
            stack.push((
                LOCAL_LEVEL.to_string(),
                Some(quiver_dir.join(LOCAL_SETTINGS_FILENAME)),
            ));
            stack.push((
                WORKGROUP_LEVEL.to_string(),
                Some(quiver_dir.join(WORKGROUP_SETTINGS_FILENAME)),
            ));
        }
        stack.push((
            GLOBAL_LEVEL.to_string(),
            Some(self.app_dir.join(GLOBAL_SETTINGS_FILENAME)),
        ));
        stack
    }

    /// Opens the layered settings store for this run. The default write
    /// level is `local` inside a project and `global` otherwise.
    pub fn open_settings(&self) -> Result<LayeredSettings, SettingsError> {
        let mut store = LayeredSettings::open(self.level_stack())?;
        if self.project.is_some() {
            store.select_write_level(LOCAL_LEVEL)?;
        } else {
            store.select_write_level(GLOBAL_LEVEL)?;
        }
        Ok(store)
    }
}

/// Walks up from `start` looking for a directory containing `.quiver/`.
fn find_project(start: &Path) -> Result<Option<ProjectContext>> {
    let mut current = Some(start);
    while let Some(dir) = current {
        let quiver_dir = dir.join(QUIVER_DIR);
        if quiver_dir.is_dir() {
            return load_project(dir).map(Some);
        }
        current = dir.parent();
    }
    Ok(None)
}

/// Loads the project manifest and expands its declared binary directories.
/// A missing manifest is fine; the project then contributes no bin dirs.
fn load_project(root: &Path) -> Result<ProjectContext> {
    let manifest_path = root.join(QUIVER_DIR).join(PROJECT_CONFIG_FILENAME);
    let config: ProjectConfig = if manifest_path.exists() {
        let raw = fs::read_to_string(&manifest_path)
            .with_context(|| format!("Failed to read '{}'", manifest_path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("'{}' is not valid TOML", manifest_path.display()))?
    } else {
        ProjectConfig::default()
    };

    let mut bin_dirs = Vec::new();
    for template in &config.bin_dirs {
        let expanded = shellexpand::full(template)
            .with_context(|| format!("Failed to expand bin_dir template '{}'", template))?;
        let path = PathBuf::from(expanded.into_owned());
        bin_dirs.push(if path.is_absolute() {
            path
        } else {
            root.join(path)
        });
    }

    Ok(ProjectContext {
        root: root.to_path_buf(),
        bin_dirs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_project_walks_up() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("workspace");
        let nested = root.join("a").join("b");
        fs::create_dir_all(root.join(QUIVER_DIR)).unwrap();
        fs::create_dir_all(&nested).unwrap();

        let project = find_project(&nested).unwrap().unwrap();
        assert_eq!(project.root, root);
        assert!(project.bin_dirs.is_empty());
    }

    #[test]
    fn test_find_project_absent() {
        let dir = TempDir::new().unwrap();
        assert!(find_project(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_project_resolves_relative_bin_dirs() {
        let dir = TempDir::new().unwrap();
        let quiver_dir = dir.path().join(QUIVER_DIR);
        fs::create_dir_all(&quiver_dir).unwrap();
        fs::write(
            quiver_dir.join(PROJECT_CONFIG_FILENAME),
            "bin_dirs = [\"bin\", \"tools/bin\"]\n",
        )
        .unwrap();

        let project = load_project(dir.path()).unwrap();
        assert_eq!(
            project.bin_dirs,
            vec![dir.path().join("bin"), dir.path().join("tools/bin")]
        );
    }
}
