// src/core/settings.rs

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

pub const COMMAND_LINE_LEVEL: &str = "command-line";
pub const LOCAL_LEVEL: &str = "local";
pub const WORKGROUP_LEVEL: &str = "workgroup";
pub const GLOBAL_LEVEL: &str = "global";

/// The read mode that bypasses precedence and shows raw per-key metadata.
pub const SETTINGS_FILE_MODE: &str = "settings-file";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error(
        "The {level} configuration has no '{key}' value registered. \
         Try using another level option (like --local, --workgroup or --global)."
    )]
    NoSuchKey { level: String, key: String },
    #[error(
        "'{key}' already exists at level {level}. \
         Use --overwrite to perform the renaming anyway."
    )]
    Conflict { level: String, key: String },
    #[error("'{param}' is not in the parameters of {command}.")]
    NoSuchParameter { param: String, command: String },
    #[error("Unknown settings level '{0}'.")]
    UnknownLevel(String),
    #[error("Failed to read settings file '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Settings file '{path}' is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to persist settings to '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to serialize settings for '{path}': {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },
}

/// One stored value, plus the commands that registered the key (shown by the
/// `settings-file` read mode instead of the value).
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsEntry {
    pub value: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

/// key -> entry, within one domain at one level.
type DomainMap = BTreeMap<String, SettingsEntry>;
/// domain -> keys. This is the full content of one level's backing file.
type LevelContent = BTreeMap<String, DomainMap>;

/// One precedence tier of the store. A level without a backing file
/// (command-line) is transient and never persisted.
#[derive(Debug)]
struct Level {
    name: String,
    file: Option<PathBuf>,
    content: LevelContent,
}

/// How reads address the store.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReadMode {
    /// Resolve precedence across all levels (the default).
    #[default]
    Effective,
    /// Show only one specific level's values.
    Level(String),
    /// Show which commands registered each key instead of a value.
    SettingsFile,
}

/// One row produced by `show`, ready for table rendering. `level` carries the
/// provenance of the value (None in settings-file mode).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowRow {
    pub key: String,
    pub rendering: String,
    pub level: Option<String>,
}

/// The precedence-ordered, multi-domain key-value store.
///
/// Levels are data, not a hard-coded enum: the store is built from an ordered
/// list of `(name, backing file)` pairs, highest precedence first. Mutation
/// always targets the explicitly selected write level and persists
/// immediately afterwards (write-through, no batching); reads default to
/// resolving across all levels.
#[derive(Debug)]
pub struct LayeredSettings {
    levels: Vec<Level>,
    write_level: usize,
    read_mode: ReadMode,
}

impl LayeredSettings {
    /// Opens the store, loading every level that has an existing backing
    /// file. The write level starts at the lowest-precedence level (the last
    /// one, conventionally "global").
    pub fn open(level_specs: Vec<(String, Option<PathBuf>)>) -> Result<Self, SettingsError> {
        let mut levels = Vec::with_capacity(level_specs.len());
        for (name, file) in level_specs {
            let content = match &file {
                Some(path) if path.exists() => {
                    let raw = fs::read_to_string(path).map_err(|e| SettingsError::Load {
                        path: path.clone(),
                        source: e,
                    })?;
                    toml::from_str(&raw).map_err(|e| SettingsError::Parse {
                        path: path.clone(),
                        source: e,
                    })?
                }
                _ => LevelContent::new(),
            };
            levels.push(Level {
                name,
                file,
                content,
            });
        }
        let write_level = levels.len().saturating_sub(1);
        Ok(Self {
            levels,
            write_level,
            read_mode: ReadMode::Effective,
        })
    }

    pub fn level_names(&self) -> Vec<&str> {
        self.levels.iter().map(|l| l.name.as_str()).collect()
    }

    pub fn write_level_name(&self) -> &str {
        &self.levels[self.write_level].name
    }

    pub fn select_write_level(&mut self, name: &str) -> Result<(), SettingsError> {
        self.write_level = self
            .levels
            .iter()
            .position(|l| l.name == name)
            .ok_or_else(|| SettingsError::UnknownLevel(name.to_string()))?;
        Ok(())
    }

    pub fn select_read_mode(&mut self, mode: ReadMode) -> Result<(), SettingsError> {
        if let ReadMode::Level(name) = &mode
            && !self.levels.iter().any(|l| &l.name == name)
        {
            return Err(SettingsError::UnknownLevel(name.clone()));
        }
        self.read_mode = mode;
        Ok(())
    }

    /// Seeds a transient value into a named level without persisting.
    /// Used to install framework-supplied values at the command-line level.
    pub fn seed(
        &mut self,
        level: &str,
        domain: &str,
        key: &str,
        value: &str,
    ) -> Result<(), SettingsError> {
        let level = self
            .levels
            .iter_mut()
            .find(|l| l.name == level)
            .ok_or_else(|| SettingsError::UnknownLevel(level.to_string()))?;
        level.content.entry(domain.to_string()).or_default().insert(
            key.to_string(),
            SettingsEntry {
                value: value.to_string(),
                commands: Vec::new(),
            },
        );
        Ok(())
    }

    // --- Mutation (always against the selected write level) ---

    /// Writes a value unconditionally, recording the registering command.
    /// Returns the previous entry, if any.
    pub fn set(
        &mut self,
        domain: &str,
        key: &str,
        value: &str,
        registrar: &str,
    ) -> Result<Option<SettingsEntry>, SettingsError> {
        let domain_map = self.levels[self.write_level]
            .content
            .entry(domain.to_string())
            .or_default();
        let mut commands = domain_map
            .get(key)
            .map(|e| e.commands.clone())
            .unwrap_or_default();
        if !commands.iter().any(|c| c == registrar) {
            commands.push(registrar.to_string());
        }
        let old = domain_map.insert(
            key.to_string(),
            SettingsEntry {
                value: value.to_string(),
                commands,
            },
        );
        self.persist_write_level()?;
        Ok(old)
    }

    /// Moves an entry to a new key at the write level, preserving its stored
    /// value. Fails if `src` is absent, or if `dst` exists and `overwrite` is
    /// not set; in both failure cases nothing is mutated.
    pub fn rename(
        &mut self,
        domain: &str,
        src: &str,
        dst: &str,
        overwrite: bool,
    ) -> Result<(), SettingsError> {
        let level_name = self.write_level_name().to_string();
        let domain_map = self.levels[self.write_level]
            .content
            .entry(domain.to_string())
            .or_default();
        if !domain_map.contains_key(src) {
            return Err(SettingsError::NoSuchKey {
                level: level_name,
                key: src.to_string(),
            });
        }
        if domain_map.contains_key(dst) && !overwrite {
            return Err(SettingsError::Conflict {
                level: level_name,
                key: dst.to_string(),
            });
        }
        let entry = domain_map.remove(src).unwrap_or_default();
        domain_map.insert(dst.to_string(), entry);
        self.persist_write_level()
    }

    /// Deletes a batch of keys at the write level, all-or-nothing: the whole
    /// batch is validated before any key is touched, and the store persists
    /// once at the end.
    pub fn unset(&mut self, domain: &str, keys: &[String]) -> Result<(), SettingsError> {
        let level_name = self.write_level_name().to_string();
        let domain_map = self.levels[self.write_level]
            .content
            .entry(domain.to_string())
            .or_default();
        for key in keys {
            if !domain_map.contains_key(key) {
                return Err(SettingsError::NoSuchKey {
                    level: level_name,
                    key: key.clone(),
                });
            }
        }
        for key in keys {
            domain_map.remove(key);
        }
        self.persist_write_level()
    }

    // --- Reads ---

    /// Resolves the effective entry for a key: the value at the
    /// highest-precedence level that defines it, tagged with that level.
    pub fn effective(&self, domain: &str, key: &str) -> Option<(&str, &SettingsEntry)> {
        self.levels.iter().find_map(|level| {
            level
                .content
                .get(domain)
                .and_then(|keys| keys.get(key))
                .map(|entry| (level.name.as_str(), entry))
        })
    }

    /// Renders the requested keys according to the configured read mode.
    /// With no keys, the universe is every key across all levels
    /// (`all_levels`) or only those visible at the configured read mode.
    pub fn show(&self, domain: &str, keys: &[String], all_levels: bool) -> Vec<ShowRow> {
        let keys: Vec<String> = if !keys.is_empty() {
            keys.to_vec()
        } else if all_levels {
            self.all_keys(domain)
        } else {
            self.visible_keys(domain)
        };

        let mut rows = Vec::new();
        for key in keys {
            match &self.read_mode {
                ReadMode::SettingsFile => {
                    let commands = self.registered_commands(domain, &key);
                    rows.push(ShowRow {
                        key,
                        rendering: commands.join(", "),
                        level: None,
                    });
                }
                ReadMode::Level(name) => {
                    let Some(entry) = self
                        .levels
                        .iter()
                        .find(|l| &l.name == name)
                        .and_then(|l| l.content.get(domain))
                        .and_then(|keys| keys.get(&key))
                    else {
                        continue;
                    };
                    rows.push(ShowRow {
                        key,
                        rendering: entry.value.clone(),
                        level: Some(name.clone()),
                    });
                }
                ReadMode::Effective => {
                    let Some((level, entry)) = self.effective(domain, &key) else {
                        continue;
                    };
                    rows.push(ShowRow {
                        key,
                        rendering: entry.value.clone(),
                        level: Some(level.to_string()),
                    });
                }
            }
        }
        rows
    }

    fn all_keys(&self, domain: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .levels
            .iter()
            .filter_map(|l| l.content.get(domain))
            .flat_map(|keys| keys.keys().cloned())
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn visible_keys(&self, domain: &str) -> Vec<String> {
        match &self.read_mode {
            ReadMode::Level(name) => {
                let mut keys: Vec<String> = self
                    .levels
                    .iter()
                    .find(|l| &l.name == name)
                    .and_then(|l| l.content.get(domain))
                    .map(|keys| keys.keys().cloned().collect())
                    .unwrap_or_default();
                keys.sort();
                keys
            }
            // Every key defined anywhere has an effective value.
            ReadMode::Effective | ReadMode::SettingsFile => self.all_keys(domain),
        }
    }

    /// The union of commands that registered a key, across all levels.
    fn registered_commands(&self, domain: &str, key: &str) -> Vec<String> {
        let mut commands = Vec::new();
        for level in &self.levels {
            if let Some(entry) = level.content.get(domain).and_then(|keys| keys.get(key)) {
                for command in &entry.commands {
                    if !commands.contains(command) {
                        commands.push(command.clone());
                    }
                }
            }
        }
        commands
    }

    // --- Stored command parameters (the "parameters" domain) ---

    /// The effective stored parameters for a command path, shell-split.
    pub fn stored_parameters(&self, domain: &str, command_path: &str) -> Vec<String> {
        self.effective(domain, command_path)
            .and_then(|(_, entry)| shlex::split(&entry.value))
            .unwrap_or_default()
    }

    /// The stored parameters visible at the write level only.
    fn writable_parameters(&self, domain: &str, command_path: &str) -> Option<Vec<String>> {
        self.levels[self.write_level]
            .content
            .get(domain)
            .and_then(|keys| keys.get(command_path))
            .and_then(|entry| shlex::split(&entry.value))
    }

    /// Replaces the stored parameters of a command at the write level.
    /// Returns the previous parameters, if any.
    pub fn set_parameters(
        &mut self,
        domain: &str,
        command_path: &str,
        params: &[String],
    ) -> Result<Option<Vec<String>>, SettingsError> {
        let old = self.writable_parameters(domain, command_path);
        self.set(domain, command_path, &join_parameters(params), domain)?;
        Ok(old)
    }

    /// Appends parameters after those already stored at the write level.
    pub fn append_parameters(
        &mut self,
        domain: &str,
        command_path: &str,
        params: &[String],
    ) -> Result<Vec<String>, SettingsError> {
        let mut new = self
            .writable_parameters(domain, command_path)
            .unwrap_or_default();
        new.extend(params.iter().cloned());
        self.set(domain, command_path, &join_parameters(&new), domain)?;
        Ok(new)
    }

    /// Inserts parameters before the *effective* parameters of the command,
    /// writing the combined list at the write level.
    pub fn insert_parameters(
        &mut self,
        domain: &str,
        command_path: &str,
        params: &[String],
    ) -> Result<Vec<String>, SettingsError> {
        let mut new: Vec<String> = params.to_vec();
        new.extend(self.stored_parameters(domain, command_path));
        self.set(domain, command_path, &join_parameters(&new), domain)?;
        Ok(new)
    }

    /// Removes parameters from the write level: first as a contiguous block
    /// (so relative order stays consistent), then one by one.
    pub fn remove_parameters(
        &mut self,
        domain: &str,
        command_path: &str,
        params: &[String],
    ) -> Result<Vec<String>, SettingsError> {
        let current = self.writable_parameters(domain, command_path).ok_or_else(|| {
            SettingsError::NoSuchKey {
                level: self.write_level_name().to_string(),
                key: command_path.to_string(),
            }
        })?;

        if current.len() >= params.len() {
            for i in 0..=(current.len() - params.len()) {
                if &current[i..i + params.len()] == params {
                    let mut new = current.clone();
                    new.drain(i..i + params.len());
                    self.set(domain, command_path, &join_parameters(&new), domain)?;
                    return Ok(new);
                }
            }
        }

        let mut new = current;
        for param in params {
            let position = new.iter().position(|p| p == param).ok_or_else(|| {
                SettingsError::NoSuchParameter {
                    param: param.clone(),
                    command: command_path.to_string(),
                }
            })?;
            new.remove(position);
        }
        self.set(domain, command_path, &join_parameters(&new), domain)?;
        Ok(new)
    }

    // --- Persistence ---

    /// Writes the full content of the write level back to its backing file.
    /// Transient levels are skipped.
    fn persist_write_level(&mut self) -> Result<(), SettingsError> {
        let level = &self.levels[self.write_level];
        let Some(path) = &level.file else {
            return Ok(());
        };
        let rendered =
            toml::to_string_pretty(&level.content).map_err(|e| SettingsError::Serialize {
                path: path.clone(),
                source: e,
            })?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Persist {
                path: path.clone(),
                source: e,
            })?;
        }
        fs::write(path, rendered).map_err(|e| SettingsError::Persist {
            path: path.clone(),
            source: e,
        })
    }
}

/// Joins parameters into the stored string form, shell-quoting as needed.
pub fn join_parameters(params: &[String]) -> String {
    params
        .iter()
        .map(|p| {
            shlex::try_quote(p)
                .unwrap_or(Cow::Borrowed(p.as_str()))
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stock_store(dir: &TempDir) -> LayeredSettings {
        LayeredSettings::open(vec![
            (COMMAND_LINE_LEVEL.to_string(), None),
            (
                LOCAL_LEVEL.to_string(),
                Some(dir.path().join("local.toml")),
            ),
            (
                GLOBAL_LEVEL.to_string(),
                Some(dir.path().join("global.toml")),
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_set_then_show_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "editor", "vim", "value").unwrap();

        let rows = store.show("value", &["editor".to_string()], false);
        assert_eq!(
            rows,
            vec![ShowRow {
                key: "editor".to_string(),
                rendering: "vim".to_string(),
                level: Some(GLOBAL_LEVEL.to_string()),
            }]
        );
    }

    #[test]
    fn test_higher_level_wins_precedence() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "editor", "vi", "value").unwrap();
        store.select_write_level(LOCAL_LEVEL).unwrap();
        store.set("value", "editor", "helix", "value").unwrap();

        let rows = store.show("value", &[], false);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].rendering, "helix");
        assert_eq!(rows[0].level.as_deref(), Some(LOCAL_LEVEL));
    }

    #[test]
    fn test_show_one_specific_level() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "editor", "vi", "value").unwrap();
        store
            .select_read_mode(ReadMode::Level(LOCAL_LEVEL.to_string()))
            .unwrap();

        // The key only exists at global, so the local view skips it.
        assert!(store.show("value", &["editor".to_string()], false).is_empty());
    }

    #[test]
    fn test_settings_file_mode_shows_registrars() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "editor", "vi", "value").unwrap();
        store.select_read_mode(ReadMode::SettingsFile).unwrap();

        let rows = store.show("value", &["editor".to_string()], false);
        assert_eq!(rows[0].rendering, "value");
        assert_eq!(rows[0].level, None);
    }

    #[test]
    fn test_rename_conflict_leaves_both_keys_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "a", "1", "value").unwrap();
        store.set("value", "b", "2", "value").unwrap();

        let err = store.rename("value", "a", "b", false).unwrap_err();
        assert!(matches!(err, SettingsError::Conflict { .. }));
        assert_eq!(store.effective("value", "a").unwrap().1.value, "1");
        assert_eq!(store.effective("value", "b").unwrap().1.value, "2");
    }

    #[test]
    fn test_rename_with_overwrite_moves_the_value() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "a", "1", "value").unwrap();
        store.set("value", "b", "2", "value").unwrap();

        store.rename("value", "a", "b", true).unwrap();
        assert!(store.effective("value", "a").is_none());
        assert_eq!(store.effective("value", "b").unwrap().1.value, "1");
    }

    #[test]
    fn test_rename_missing_source_fails() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        let err = store.rename("value", "ghost", "b", false).unwrap_err();
        assert!(matches!(err, SettingsError::NoSuchKey { .. }));
    }

    #[test]
    fn test_unset_is_all_or_nothing() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "a", "1", "value").unwrap();
        store.set("value", "b", "2", "value").unwrap();

        let err = store
            .unset(
                "value",
                &["a".to_string(), "ghost".to_string(), "b".to_string()],
            )
            .unwrap_err();
        match err {
            SettingsError::NoSuchKey { key, .. } => assert_eq!(key, "ghost"),
            other => panic!("unexpected error: {other:?}"),
        }
        // Nothing was deleted.
        assert!(store.effective("value", "a").is_some());
        assert!(store.effective("value", "b").is_some());

        store
            .unset("value", &["a".to_string(), "b".to_string()])
            .unwrap();
        assert!(store.effective("value", "a").is_none());
    }

    #[test]
    fn test_mutations_persist_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = stock_store(&dir);
            store.select_write_level(GLOBAL_LEVEL).unwrap();
            store.set("value", "editor", "vim", "value").unwrap();
        }
        let store = stock_store(&dir);
        assert_eq!(store.effective("value", "editor").unwrap().1.value, "vim");
    }

    #[test]
    fn test_seeded_command_line_value_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store.set("value", "editor", "vi", "value").unwrap();
        store
            .seed(COMMAND_LINE_LEVEL, "value", "editor", "nano")
            .unwrap();

        let (level, entry) = store.effective("value", "editor").unwrap();
        assert_eq!(level, COMMAND_LINE_LEVEL);
        assert_eq!(entry.value, "nano");
    }

    #[test]
    fn test_command_line_level_is_transient() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = stock_store(&dir);
            store.select_write_level(COMMAND_LINE_LEVEL).unwrap();
            store.set("value", "editor", "nano", "value").unwrap();
        }
        let store = stock_store(&dir);
        assert!(store.effective("value", "editor").is_none());
    }

    #[test]
    fn test_stored_parameters_shell_splitting() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store
            .set_parameters(
                "parameters",
                "deploy.sh",
                &["--env".to_string(), "two words".to_string()],
            )
            .unwrap();

        assert_eq!(
            store.stored_parameters("parameters", "deploy.sh"),
            vec!["--env".to_string(), "two words".to_string()]
        );
    }

    #[test]
    fn test_append_and_insert_parameters_preserve_order() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store
            .set_parameters("parameters", "deploy.sh", &["-v".to_string()])
            .unwrap();
        store
            .append_parameters("parameters", "deploy.sh", &["--force".to_string()])
            .unwrap();
        store
            .insert_parameters("parameters", "deploy.sh", &["--dry-run".to_string()])
            .unwrap();

        assert_eq!(
            store.stored_parameters("parameters", "deploy.sh"),
            vec![
                "--dry-run".to_string(),
                "-v".to_string(),
                "--force".to_string()
            ]
        );
    }

    #[test]
    fn test_remove_parameters_block_then_elementwise() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        let params: Vec<String> = ["-G", "foo", "-v"].iter().map(|s| s.to_string()).collect();
        store
            .set_parameters("parameters", "generate", &params)
            .unwrap();

        // Block removal keeps ordering consistent.
        store
            .remove_parameters(
                "parameters",
                "generate",
                &["-G".to_string(), "foo".to_string()],
            )
            .unwrap();
        assert_eq!(
            store.stored_parameters("parameters", "generate"),
            vec!["-v".to_string()]
        );

        let err = store
            .remove_parameters("parameters", "generate", &["--ghost".to_string()])
            .unwrap_err();
        assert!(matches!(err, SettingsError::NoSuchParameter { .. }));
    }
}
