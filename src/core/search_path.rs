// src/core/search_path.rs

use crate::{constants::SCRIPTS_DIRNAME, models::ProjectContext};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// The ordered list of directories scanned for external commands.
///
/// Precedence is list order: project-declared binary directories first (only
/// when a project is active), then the application-private scripts directory,
/// then every entry of the inherited `PATH` in its original order. Earlier
/// directories win on name collision during `which`-style lookup.
///
/// No deduplication or existence filtering happens here; missing directories
/// are simply skipped by the consumers.
#[derive(Debug, Clone)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Assembles the search path for the current process.
    pub fn assemble(project: Option<&ProjectContext>, app_dir: &Path) -> Self {
        let mut dirs = Vec::new();
        if let Some(project) = project {
            dirs.extend(project.bin_dirs.iter().cloned());
        }
        dirs.push(app_dir.join(SCRIPTS_DIRNAME));
        if let Some(path_var) = env::var_os("PATH") {
            dirs.extend(env::split_paths(&path_var));
        }
        Self { dirs }
    }

    /// Builds a search path from an explicit directory list.
    pub fn from_dirs(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Locates an executable file by exact name, returning the full path in
    /// the first directory that contains one.
    pub fn which(&self, file_name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| is_executable(candidate))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_file()).unwrap_or(false)
}
