// src/cli/handlers/external.rs

use crate::{
    core::{
        context::{Context, PARAMETERS_DOMAIN},
        discovery::{self, CommandDiscovery},
        metadata::MetadataClient,
        search_path::SearchPath,
        synthesizer::ExternalCommand,
        types::TypeRegistry,
    },
    system::executor::{self, ChainLink, InvocationChain},
};
use anyhow::{Context as _, Result};
use clap::error::ErrorKind;
use std::env;

/// Resolves and invokes an external command: discovery, metadata query,
/// argument parsing against the synthesized interface, settings fetch,
/// environment construction, launch. Returns the child's exit code.
pub fn run(name: &str, args: Vec<String>, ctx: &Context) -> Result<i32> {
    let search_path = SearchPath::assemble(ctx.project.as_ref(), &ctx.app_dir);
    let discovery = CommandDiscovery::new(&ctx.app_name, search_path);
    let registry = TypeRegistry::new();
    let client = MetadataClient::new(&discovery, &registry).with_error_hook(Box::new(
        |command, err| log::warn!("When loading command {}: {}", command, err),
    ));

    let logical = discovery::logical_name(name);
    let (spec, executable) = client.resolve(&logical).with_context(|| {
        format!(
            "'{}' is neither a builtin nor an external command. \
             Run '{} commands' to list what is available.",
            name, ctx.app_name
        )
    })?;
    let command = ExternalCommand::build(spec, executable);

    let matches = match command.clap_command(&registry).try_get_matches_from(&args) {
        Ok(matches) => matches,
        Err(e) if e.kind() == ErrorKind::DisplayHelp || e.kind() == ErrorKind::DisplayVersion => {
            e.print()?;
            return Ok(0);
        }
        // Usage errors keep clap's rendering and conventional exit code.
        Err(e) => {
            e.print()?;
            return Ok(2);
        }
    };
    if !command.flow_depends().is_empty() {
        log::debug!(
            "'{}' declares flow dependencies: {}",
            command.spec.name,
            command.flow_depends().join(", ")
        );
    }
    let params = command.parameter_values(&matches);

    let store = ctx.open_settings()?;
    let display = discovery::display_name(&logical);
    let stored = store.stored_parameters(PARAMETERS_DOMAIN, &display);

    let command_path = format!("{} {}", ctx.app_name, display);
    let chain = InvocationChain {
        root: ctx.app_name.clone(),
        command_path: command_path.clone(),
        links: vec![
            ChainLink {
                command_path: ctx.app_name.clone(),
                params: Vec::new(),
            },
            ChainLink {
                command_path,
                params,
            },
        ],
    };
    // The stored parameters are the only argv tail; the parsed values travel
    // through the environment.
    let env = executor::build_environment(&chain, &stored, &stored);

    let cwd = env::current_dir()?;
    let status = executor::launch(&command.executable, &stored, &env, &cwd)?;
    Ok(status.code().unwrap_or(1))
}
