// src/bin/quiver.rs

use anyhow::{Result, bail};
use clap::Parser;
use clap::error::ErrorKind;
use colored::*;
use quiver::{
    cli::{Cli, handlers},
    constants::APP_NAME,
    core::context::Context,
};

// --- Command Definition and Registry ---

/// Defines a builtin command, its aliases, and its handler function. The
/// handler signature is kept consistent across all builtins for simplicity
/// in the registry.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &Context) -> Result<()>,
}

/// The single source of truth for all builtin commands. Anything not listed
/// here dispatches to external command resolution.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "alias",
        aliases: &[],
        handler: handlers::alias::handle,
    },
    CommandDefinition {
        name: "commands",
        aliases: &["ls"],
        handler: handlers::commands::handle,
    },
    CommandDefinition {
        name: "parameters",
        aliases: &["params"],
        handler: handlers::parameters::handle,
    },
    CommandDefinition {
        name: "value",
        aliases: &[],
        handler: handlers::value::handle,
    },
    CommandDefinition {
        name: "which",
        aliases: &[],
        handler: handlers::which::handle,
    },
];

/// Upper bound on alias-to-alias indirection before a chain is treated as a
/// loop.
const MAX_ALIAS_DEPTH: usize = 16;

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// The main entry point. Sets up logging, dispatches to the correct handler,
/// performs centralized error handling, and exits with the child's status
/// when an external command was invoked.
fn main() {
    env_logger::init();
    match run_cli(Cli::parse()) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn run_cli(cli: Cli) -> Result<i32> {
    log::debug!("CLI args parsed: {:?}", cli.args);
    let mut args = cli.args;
    if args.is_empty() {
        println!("usage: {} <command> [args...]", APP_NAME);
        println!(
            "Run '{} commands' to list the external commands on the search path.",
            APP_NAME
        );
        return Ok(0);
    }
    let mut first = args.remove(0);

    let ctx = Context::discover(APP_NAME)?;

    // Aliases expand before dispatch; builtin names always win. A
    // self-referencing alias prepends its expansion tail once and stops, so
    // "alias set deploy.sh deploy.sh --env prod" behaves as default
    // parameters rather than recursing.
    let store = ctx.open_settings()?;
    let mut depth = 0;
    while find_command(&first).is_none() {
        let Some(mut words) = handlers::alias::expand(&store, &first) else {
            break;
        };
        let head = words.remove(0);
        words.append(&mut args);
        args = words;
        let settled = head == first;
        first = head;
        if settled {
            break;
        }
        depth += 1;
        if depth > MAX_ALIAS_DEPTH {
            bail!(
                "Alias expansion of '{}' did not reach a real command after {} steps.",
                first,
                MAX_ALIAS_DEPTH
            );
        }
    }

    if let Some(command) = find_command(&first) {
        match (command.handler)(args, &ctx) {
            Ok(()) => Ok(0),
            Err(e) => match e.downcast::<clap::error::Error>() {
                // Help and usage errors from the builtin parsers keep clap's
                // own rendering and exit codes.
                Ok(clap_err) => {
                    clap_err.print()?;
                    match clap_err.kind() {
                        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Ok(0),
                        _ => Ok(2),
                    }
                }
                Err(e) => Err(e),
            },
        }
    } else {
        // Not a builtin: treat it as an external command name.
        handlers::external::run(&first, args, &ctx)
    }
}
