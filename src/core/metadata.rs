// src/core/metadata.rs

use crate::{
    constants::{
        BROKEN_COMMAND_HELP, DEFAULT_REMAINING_ARGS_HELP, HELP_REQUEST_ARG, METADATA_SEPARATOR,
    },
    core::{discovery, discovery::CommandDiscovery, types::TypeRegistry},
    models::{ArgumentDecl, CommandSpec, FlagDecl, OptionDecl, ValueType},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::path::PathBuf;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

lazy_static! {
    static ref OPTION_RE: Regex = Regex::new(r"^O:([^:]+):([^:]+):([^:]+)$").unwrap();
    static ref FLAG_RE: Regex = Regex::new(r"^F:([^:]+):([^:]+)(?::([^:]+))?$").unwrap();
    static ref ARGUMENT_RE: Regex =
        Regex::new(r"^A:([^:]+):([^:]+):([^:]+)(?::([^:]+))?$").unwrap();
    static ref REMAINING_RE: Regex = Regex::new(r"^N:([^:]+)$").unwrap();
    static ref FLOWDEPENDS_RE: Regex = Regex::new(r"flowdepends: (.+)").unwrap();
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No executable named '{executable}' was found on the search path for '{command}'.")]
    NotFound { command: String, executable: String },
    #[error("Malformed metadata line in '{command}': expected {expected}, got '{line}'")]
    ProtocolFormat {
        command: String,
        expected: &'static str,
        line: String,
    },
    #[error("Unknown parameter type '{token}' declared by '{command}'.")]
    TypeResolution { command: String, token: String },
    #[error("Failed to query '{command}' for its metadata: {source}")]
    Query {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Help output of '{command}' was not valid UTF-8.")]
    InvalidUtf8 {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
}

/// Called when resolving one command fails, before the error is returned.
/// Bulk listings install a hook that logs and then skips the broken command.
pub type LoadingErrorHook<'a> = Box<dyn Fn(&str, &ResolveError) + 'a>;

/// Queries external commands for their self-describing metadata.
///
/// Resolution is strictly per-command: a failure here never affects sibling
/// commands. A help query that exits non-zero is *not* a failure — the
/// command degrades to a metadata-less placeholder so that broken externals
/// still appear in listings.
pub struct MetadataClient<'a> {
    discovery: &'a CommandDiscovery,
    registry: &'a TypeRegistry,
    error_hook: Option<LoadingErrorHook<'a>>,
}

impl<'a> MetadataClient<'a> {
    pub fn new(discovery: &'a CommandDiscovery, registry: &'a TypeRegistry) -> Self {
        Self {
            discovery,
            registry,
            error_hook: None,
        }
    }

    pub fn with_error_hook(mut self, hook: LoadingErrorHook<'a>) -> Self {
        self.error_hook = Some(hook);
        self
    }

    /// Resolves a logical command name into its spec and executable path.
    pub fn resolve(&self, logical: &str) -> Result<(CommandSpec, PathBuf), ResolveError> {
        let name = discovery::display_name(logical);
        let result = self.resolve_inner(logical, &name);
        if let (Err(e), Some(hook)) = (&result, &self.error_hook) {
            hook(&name, e);
        }
        result
    }

    fn resolve_inner(
        &self,
        logical: &str,
        name: &str,
    ) -> Result<(CommandSpec, PathBuf), ResolveError> {
        let executable_name = self.discovery.executable_name(logical);
        let executable = self
            .discovery
            .search_path()
            .which(&executable_name)
            .ok_or_else(|| ResolveError::NotFound {
                command: name.to_string(),
                executable: executable_name.clone(),
            })?;

        log::debug!("Querying '{}' for metadata", executable.display());
        let output = StdCommand::new(&executable)
            .arg(HELP_REQUEST_ARG)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| ResolveError::Query {
                command: name.to_string(),
                source: e,
            })?;

        let spec = if output.status.success() {
            let text = String::from_utf8(output.stdout).map_err(|e| ResolveError::InvalidUtf8 {
                command: name.to_string(),
                source: e,
            })?;
            parse_help_output(name, &text, self.registry)?
        } else {
            log::warn!(
                "Help query for '{}' exited with {}; treating the command as broken",
                name,
                output.status
            );
            broken_spec(name)
        };
        Ok((spec, executable))
    }
}

/// The degraded spec used when the help query exits non-zero.
fn broken_spec(name: &str) -> CommandSpec {
    CommandSpec {
        name: name.to_string(),
        short_help: BROKEN_COMMAND_HELP.to_string(),
        full_help: BROKEN_COMMAND_HELP.to_string(),
        options: Vec::new(),
        flags: Vec::new(),
        arguments: Vec::new(),
        remaining_args: Some(DEFAULT_REMAINING_ARGS_HELP.to_string()),
        flow_depends: Vec::new(),
    }
}

/// Parses captured help output against the line-oriented metadata protocol.
///
/// Layout: free text, blank line, help text, optional `--` separator line,
/// then metadata records. Without a separator the whole output (after the
/// leading blank) is help text and the default catch-all stays enabled; a
/// separator disables the catch-all unless an `N:` record re-enables it.
fn parse_help_output(
    name: &str,
    out: &str,
    registry: &TypeRegistry,
) -> Result<CommandSpec, ResolveError> {
    let lines: Vec<&str> = out.lines().collect();
    // Only an exactly-empty line opens the help block; whitespace-only lines
    // are still preamble.
    let help_start = lines
        .iter()
        .position(|l| l.is_empty())
        .map(|i| i + 1)
        .unwrap_or(0);
    let separator = lines.iter().position(|l| *l == METADATA_SEPARATOR);
    let help_end = separator.unwrap_or(lines.len());

    let full_help = if help_start < help_end {
        lines[help_start..help_end].join("\n").trim().to_string()
    } else {
        String::new()
    };
    let short_help = full_help.lines().next().unwrap_or("").to_string();

    let mut options = Vec::new();
    let mut flags = Vec::new();
    let mut arguments = Vec::new();
    let mut remaining_args = if separator.is_some() {
        None
    } else {
        Some(DEFAULT_REMAINING_ARGS_HELP.to_string())
    };

    if let Some(sep) = separator {
        for line in &lines[sep..] {
            if line.starts_with("O:") {
                let caps = OPTION_RE.captures(line).ok_or_else(|| {
                    ResolveError::ProtocolFormat {
                        command: name.to_string(),
                        expected: "O:name:type:help",
                        line: line.to_string(),
                    }
                })?;
                options.push(OptionDecl {
                    name: caps[1].to_string(),
                    value_type: resolve_type(name, &caps[2], registry)?,
                    help: caps[3].to_string(),
                });
            } else if line.starts_with("F:") {
                let caps = FLAG_RE.captures(line).ok_or_else(|| {
                    ResolveError::ProtocolFormat {
                        command: name.to_string(),
                        expected: "F:name:help[:default]",
                        line: line.to_string(),
                    }
                })?;
                flags.push(FlagDecl {
                    name: caps[1].to_string(),
                    help: caps[2].to_string(),
                    default: caps.get(3).map(|m| m.as_str()) == Some("True"),
                });
            } else if line.starts_with("A:") {
                let caps = ARGUMENT_RE.captures(line).ok_or_else(|| {
                    ResolveError::ProtocolFormat {
                        command: name.to_string(),
                        expected: "A:name:type:help[:nargs]",
                        line: line.to_string(),
                    }
                })?;
                let nargs = match caps.get(4) {
                    Some(raw) => raw.as_str().parse::<i32>().map_err(|_| {
                        ResolveError::ProtocolFormat {
                            command: name.to_string(),
                            expected: "A:name:type:help[:nargs]",
                            line: line.to_string(),
                        }
                    })?,
                    None => 1,
                };
                arguments.push(ArgumentDecl {
                    name: caps[1].to_string(),
                    value_type: resolve_type(name, &caps[2], registry)?,
                    help: caps[3].to_string(),
                    nargs,
                });
            } else if let Some(caps) = REMAINING_RE.captures(line) {
                // The last N: record wins.
                remaining_args = Some(caps[1].to_string());
            }
        }
    }

    let flow_depends = FLOWDEPENDS_RE
        .captures(out)
        .map(|caps| caps[1].split(", ").map(str::to_string).collect())
        .unwrap_or_default();

    Ok(CommandSpec {
        name: name.to_string(),
        short_help,
        full_help,
        options,
        flags,
        arguments,
        remaining_args,
        flow_depends,
    })
}

fn resolve_type(
    name: &str,
    token: &str,
    registry: &TypeRegistry,
) -> Result<ValueType, ResolveError> {
    registry
        .resolve(token)
        .ok_or_else(|| ResolveError::TypeResolution {
            command: name.to_string(),
            token: token.to_string(),
        })
}
