// src/constants.rs

/// The application name. External commands are discovered by this prefix.
pub const APP_NAME: &str = "quiver";

/// The name of the directory containing quiver configuration for a project.
pub const QUIVER_DIR: &str = ".quiver";

/// The name of the project manifest file (inside .quiver/).
pub const PROJECT_CONFIG_FILENAME: &str = "quiver.toml";

/// The name of the local settings file (inside .quiver/).
pub const LOCAL_SETTINGS_FILENAME: &str = "settings.toml";

/// The name of the workgroup settings file (inside .quiver/).
pub const WORKGROUP_SETTINGS_FILENAME: &str = "workgroup.toml";

/// The name of the global settings file (in ~/.config/quiver/).
pub const GLOBAL_SETTINGS_FILENAME: &str = "settings.toml";

/// The directory under the application config dir scanned for private scripts.
pub const SCRIPTS_DIRNAME: &str = "scripts";

/// A line consisting of exactly this token separates the help text of an
/// external command from its metadata records.
pub const METADATA_SEPARATOR: &str = "--";

/// Marker used to re-encode dots when deriving a logical command name from a
/// file name, so that `foo.sh` and `foo.py` stay distinguishable.
pub const SUFFIX_MARKER: char = '@';

/// Scripting suffixes recognized during command discovery.
pub const KNOWN_SUFFIXES: &[&str] = &[".sh", ".py"];

/// Help text attached to an external command whose help query exited non-zero.
pub const BROKEN_COMMAND_HELP: &str = "No help found... (the command is most likely broken)";

/// Default help text for the trailing catch-all argument of an external command.
pub const DEFAULT_REMAINING_ARGS_HELP: &str = "Remaining arguments";

/// The argument passed to an external command to request its help output.
pub const HELP_REQUEST_ARG: &str = "--help";
