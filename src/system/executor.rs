// src/system/executor.rs

use crate::models::ParamValue;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command as StdCommand, ExitStatus, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{command}' could not be launched: {source}")]
    Launch {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// One command in the invocation chain, with its fully-parsed parameters.
#[derive(Debug, Clone)]
pub struct ChainLink {
    /// Space-separated command path, e.g. "quiver deploy.sh".
    pub command_path: String,
    pub params: Vec<(String, ParamValue)>,
}

/// The full chain of commands for one invocation, from the root command down
/// to the invoked command itself.
#[derive(Debug, Clone)]
pub struct InvocationChain {
    /// The root command name (the application).
    pub root: String,
    /// The full path of the invoked command.
    pub command_path: String,
    pub links: Vec<ChainLink>,
}

/// Builds the deterministic environment bindings delivered to an external
/// child process. All names are upper-cased with non-alphanumeric bytes
/// normalized to underscores; every contract variable is always present,
/// even when empty-valued.
///
/// The framework-parsed parameter values travel exclusively through these
/// bindings — they are never re-serialized onto argv, because argv
/// reconstruction from typed values is lossy for sequences and flags.
pub fn build_environment(
    chain: &InvocationChain,
    stored_params: &[String],
    child_args: &[String],
) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();

    for link in &chain.links {
        let prefix = sanitize(&link.command_path);
        for (name, value) in &link.params {
            env.insert(format!("{}__{}", prefix, sanitize(name)), render(value));
        }
    }

    let root = sanitize(&chain.root);
    // The path value only normalizes spaces; dots in command names survive.
    env.insert(
        format!("{}___PATH", root),
        chain.command_path.replace(' ', "_").to_uppercase(),
    );
    env.insert(
        format!("{}___CMD_OPTIND", root),
        stored_params.len().to_string(),
    );
    env.insert(format!("{}___CMD_ARGS", root), quote_join(stored_params));
    env.insert(format!("{}___OPTIND", root), child_args.len().to_string());
    env.insert(format!("{}___ARGS", root), quote_join(child_args));
    env
}

/// Launches the external executable with the stored parameters as its only
/// argv tail, the given bindings merged over the current environment, and
/// inherited stdio. Blocks until the child exits and passes the exit status
/// through untouched.
pub fn launch(
    executable: &Path,
    stored_params: &[String],
    env: &BTreeMap<String, String>,
    cwd: &Path,
) -> Result<ExitStatus, ExecutionError> {
    let clean_cwd = dunce::simplified(cwd);
    log::debug!(
        "Launching '{}' with {} stored parameter(s)",
        executable.display(),
        stored_params.len()
    );
    StdCommand::new(executable)
        .args(stored_params)
        .current_dir(clean_cwd)
        .envs(env)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| ExecutionError::Launch {
            command: executable.display().to_string(),
            source: e,
        })
}

/// Upper-cases and normalizes a name for use in an environment variable.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Renders a parameter value for the environment: sequences are shell-quoted
/// and space-joined, unset flags and missing values render empty, and a set
/// flag renders as the literal `True` the metadata protocol uses for flag
/// defaults, so consuming scripts see one spelling everywhere.
fn render(value: &ParamValue) -> String {
    match value {
        ParamValue::Seq(items) => quote_join(items),
        ParamValue::Bool(true) => "True".to_string(),
        ParamValue::Bool(false) | ParamValue::Missing => String::new(),
        ParamValue::Str(s) => s.clone(),
    }
}

fn quote_join(items: &[String]) -> String {
    items
        .iter()
        .map(|item| {
            shlex::try_quote(item)
                .unwrap_or(Cow::Borrowed(item.as_str()))
                .into_owned()
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_chain() -> InvocationChain {
        InvocationChain {
            root: "quiver".to_string(),
            command_path: "quiver deploy.sh".to_string(),
            links: vec![
                ChainLink {
                    command_path: "quiver".to_string(),
                    params: vec![("verbose".to_string(), ParamValue::Bool(true))],
                },
                ChainLink {
                    command_path: "quiver deploy.sh".to_string(),
                    params: vec![
                        ("env".to_string(), ParamValue::Str("staging".to_string())),
                        (
                            "targets".to_string(),
                            ParamValue::Seq(vec!["web".to_string(), "db main".to_string()]),
                        ),
                        ("force".to_string(), ParamValue::Bool(false)),
                        ("count".to_string(), ParamValue::Missing),
                    ],
                },
            ],
        }
    }

    #[test]
    fn test_environment_contract_variables() {
        let stored = vec!["--env".to_string(), "staging".to_string()];
        let env = build_environment(&demo_chain(), &stored, &stored);

        // Only the space separating chain segments is replaced in the path
        // value; the dot in "deploy.sh" stays.
        assert_eq!(env.get("QUIVER___PATH").unwrap(), "QUIVER_DEPLOY.SH");
        assert_eq!(env.get("QUIVER___CMD_OPTIND").unwrap(), "2");
        assert_eq!(env.get("QUIVER___CMD_ARGS").unwrap(), "--env staging");
        assert_eq!(env.get("QUIVER___OPTIND").unwrap(), "2");
        assert_eq!(env.get("QUIVER___ARGS").unwrap(), "--env staging");
    }

    #[test]
    fn test_per_link_parameter_bindings() {
        let env = build_environment(&demo_chain(), &[], &[]);

        assert_eq!(env.get("QUIVER__VERBOSE").unwrap(), "True");
        assert_eq!(env.get("QUIVER_DEPLOY_SH__ENV").unwrap(), "staging");
        assert_eq!(env.get("QUIVER_DEPLOY_SH__TARGETS").unwrap(), "web 'db main'");
        // Unset flags and missing values are present but empty.
        assert_eq!(env.get("QUIVER_DEPLOY_SH__FORCE").unwrap(), "");
        assert_eq!(env.get("QUIVER_DEPLOY_SH__COUNT").unwrap(), "");
    }

    #[test]
    fn test_contract_variables_present_when_empty() {
        let env = build_environment(&demo_chain(), &[], &[]);
        assert_eq!(env.get("QUIVER___CMD_OPTIND").unwrap(), "0");
        assert_eq!(env.get("QUIVER___CMD_ARGS").unwrap(), "");
        assert_eq!(env.get("QUIVER___OPTIND").unwrap(), "0");
        assert_eq!(env.get("QUIVER___ARGS").unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_passes_exit_status_through() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let script = dir.path().join("quiver-fail");
        fs::write(&script, "#!/bin/sh\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let status = launch(&script, &[], &BTreeMap::new(), dir.path()).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[cfg(unix)]
    #[test]
    fn test_launch_missing_executable_is_a_launch_error() {
        let result = launch(
            Path::new("/no/such/executable"),
            &[],
            &BTreeMap::new(),
            Path::new("/"),
        );
        assert!(matches!(result, Err(ExecutionError::Launch { .. })));
    }
}
