// src/models.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// --- EXTERNAL COMMAND METADATA MODELS ---
// These structures are the parsed form of the line-oriented metadata protocol
// spoken by external commands (`O:`/`F:`/`A:`/`N:` records in their help
// output). Declaration order is preserved exactly as encountered; it drives
// the order in which parameters are attached to the synthesized command.

/// The type of a declared option or argument value.
///
/// Tokens without a `.` are resolved against the built-in set; tokens
/// containing a `.` are fully-qualified references to a parser registered
/// through [`crate::core::types::TypeRegistry::register`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Str,
    External(String),
}

/// An `O:<name>:<type>:<help>` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionDecl {
    pub name: String,
    pub value_type: ValueType,
    pub help: String,
}

/// An `F:<name>:<help>[:<default>]` record. The default is `true` only when
/// the optional field is exactly the literal `True`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDecl {
    pub name: String,
    pub help: String,
    pub default: bool,
}

/// An `A:<name>:<type>:<help>[:<nargs>]` record. `nargs` defaults to 1;
/// `-1` declares a variadic argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentDecl {
    pub name: String,
    pub value_type: ValueType,
    pub help: String,
    pub nargs: i32,
}

/// The complete self-description of one external command, recovered from its
/// help output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// The user-facing name (dots restored, e.g. "deploy.sh").
    pub name: String,
    /// First line of the help text.
    pub short_help: String,
    pub full_help: String,
    pub options: Vec<OptionDecl>,
    pub flags: Vec<FlagDecl>,
    pub arguments: Vec<ArgumentDecl>,
    /// Help text for the trailing catch-all argument. `None` means the
    /// command accepts no trailing arguments.
    pub remaining_args: Option<String>,
    /// Upstream commands that should conceptually run before this one.
    pub flow_depends: Vec<String>,
}

// --- RUNTIME PARAMETER VALUES ---

/// A fully-parsed parameter value, as handed to the environment bridge.
///
/// Typed option values (int, float, external) are carried as their validated
/// string form; the child process only ever sees strings anyway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Str(String),
    Bool(bool),
    Seq(Vec<String>),
    /// The parameter was declared but not provided and has no default.
    Missing,
}

// --- PROJECT MANIFEST MODELS (What is read from .quiver/quiver.toml) ---

/// Deserialized structure of a project's `quiver.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ProjectConfig {
    /// Directories, relative to the project root unless absolute, that are
    /// prepended to the external command search path.
    #[serde(default)]
    pub bin_dirs: Vec<String>,
}

/// The active project, if the working directory (or an ancestor) contains a
/// `.quiver/` directory.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Absolute path of the directory containing `.quiver/`.
    pub root: PathBuf,
    /// Expanded, absolute binary directories declared by the manifest.
    pub bin_dirs: Vec<PathBuf>,
}
