// src/core/discovery.rs

use crate::{
    constants::{KNOWN_SUFFIXES, SUFFIX_MARKER},
    core::search_path::SearchPath,
};
use std::collections::BTreeSet;
use std::fs;
use std::sync::OnceLock;

/// Discovers external commands on the search path.
///
/// Executables named `<app>-<name>[.sh|.py]` become logical commands. The
/// scan runs once per service value; the resulting name set is held in an
/// explicit `OnceLock` for the lifetime of the process. The cache records
/// *presence* only — the actual path resolution for an invocation happens
/// per-call through [`SearchPath::which`], so later directories never shadow
/// earlier ones for cache membership.
#[derive(Debug)]
pub struct CommandDiscovery {
    search_path: SearchPath,
    prefix: String,
    names: OnceLock<Vec<String>>,
}

impl CommandDiscovery {
    pub fn new(app_name: &str, search_path: SearchPath) -> Self {
        Self {
            search_path,
            prefix: format!("{}-", app_name),
            names: OnceLock::new(),
        }
    }

    pub fn search_path(&self) -> &SearchPath {
        &self.search_path
    }

    /// The sorted, deduplicated set of logical command names found on the
    /// search path. Computed once, on first call.
    pub fn command_names(&self) -> &[String] {
        self.names.get_or_init(|| {
            let mut names = BTreeSet::new();
            for dir in self.search_path.dirs() {
                let Ok(entries) = fs::read_dir(dir) else {
                    continue;
                };
                for entry in entries.flatten() {
                    let file_name = entry.file_name();
                    let Some(file_name) = file_name.to_str() else {
                        continue;
                    };
                    if let Some(rest) = file_name.strip_prefix(&self.prefix)
                        && !rest.is_empty()
                    {
                        names.insert(logical_name(rest));
                    }
                }
            }
            log::debug!("Discovered {} external command(s)", names.len());
            names.into_iter().collect()
        })
    }

    /// Reconstructs the real executable file name for a logical name
    /// (inverse of the discovery encoding).
    pub fn executable_name(&self, logical: &str) -> String {
        format!("{}{}", self.prefix, logical.replace(SUFFIX_MARKER, "."))
    }
}

/// Derives the logical command name from a file name with the application
/// prefix already stripped.
///
/// A known scripting suffix is re-encoded with the marker (`deploy.sh` →
/// `deploy@sh`) so that `deploy.sh` and `deploy.py` never collide; any other
/// literal dots are re-encoded with the same marker to keep the logical-name
/// alphabet consistent. The same encoding applies to user-typed display
/// names, which keeps the mapping reversible.
pub fn logical_name(rest: &str) -> String {
    for suffix in KNOWN_SUFFIXES {
        if let Some(stem) = rest.strip_suffix(suffix) {
            return format!("{}{}{}", stem, SUFFIX_MARKER, &suffix[1..]);
        }
    }
    rest.replace('.', &SUFFIX_MARKER.to_string())
}

/// The user-facing form of a logical name, with dots restored.
pub fn display_name(logical: &str) -> String {
    logical.replace(SUFFIX_MARKER, ".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_logical_name_encodes_known_suffixes() {
        assert_eq!(logical_name("deploy.sh"), "deploy@sh");
        assert_eq!(logical_name("deploy.py"), "deploy@py");
        assert_eq!(logical_name("deploy"), "deploy");
    }

    #[test]
    fn test_logical_name_is_injective_for_suffix_pairs() {
        assert_ne!(logical_name("deploy.sh"), logical_name("deploy.py"));
        assert_ne!(logical_name("deploy.sh"), logical_name("deploy"));
    }

    #[test]
    fn test_logical_name_reencodes_unknown_dots() {
        assert_eq!(logical_name("backup.tar"), "backup@tar");
        // A known suffix keeps the stem verbatim; reconstruction restores it.
        assert_eq!(logical_name("backup.tar.sh"), "backup.tar@sh");
    }

    #[test]
    fn test_display_and_executable_name_roundtrip() {
        let discovery =
            CommandDiscovery::new("quiver", SearchPath::from_dirs(vec![]));
        for file in ["deploy.sh", "deploy.py", "deploy", "backup.tar.sh"] {
            let logical = logical_name(file);
            assert_eq!(display_name(&logical), *file);
            assert_eq!(
                discovery.executable_name(&logical),
                format!("quiver-{}", file)
            );
        }
    }

    #[test]
    fn test_command_names_filters_and_dedupes() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        for name in ["quiver-deploy.sh", "quiver-deploy.py", "unrelated"] {
            std::fs::write(first.path().join(name), "").unwrap();
        }
        // Same logical name in a later directory must not duplicate.
        std::fs::write(second.path().join("quiver-deploy.sh"), "").unwrap();
        std::fs::write(second.path().join("quiver-status"), "").unwrap();

        let discovery = CommandDiscovery::new(
            "quiver",
            SearchPath::from_dirs(vec![
                first.path().to_path_buf(),
                second.path().to_path_buf(),
            ]),
        );
        assert_eq!(
            discovery.command_names(),
            &["deploy@py", "deploy@sh", "status"]
        );
    }

    #[test]
    fn test_command_names_tolerates_missing_directories() {
        let discovery = CommandDiscovery::new(
            "quiver",
            SearchPath::from_dirs(vec![PathBuf::from("/no/such/dir")]),
        );
        assert!(discovery.command_names().is_empty());
    }
}
