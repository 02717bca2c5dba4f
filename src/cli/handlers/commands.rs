// src/cli/handlers/commands.rs

use crate::core::{
    context::Context,
    discovery::{self, CommandDiscovery},
    metadata::MetadataClient,
    search_path::SearchPath,
    types::TypeRegistry,
};
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug)]
#[command(
    name = "commands",
    no_binary_name = true,
    about = "List the external commands available on the search path."
)]
struct CommandsCli {
    /// Only display the command names.
    #[arg(long)]
    name_only: bool,

    /// Also display the declared flow dependencies.
    #[arg(long)]
    flow: bool,
}

pub fn handle(args: Vec<String>, ctx: &Context) -> Result<()> {
    let cli = CommandsCli::try_parse_from(&args)?;

    let search_path = SearchPath::assemble(ctx.project.as_ref(), &ctx.app_dir);
    let discovery = CommandDiscovery::new(&ctx.app_name, search_path);
    let registry = TypeRegistry::new();
    let client = MetadataClient::new(&discovery, &registry).with_error_hook(Box::new(
        |command, err| log::warn!("When loading command {}: {}", command, err),
    ));

    for logical in discovery.command_names() {
        let name = discovery::display_name(logical);
        if cli.name_only {
            println!("{}", name);
            continue;
        }
        // One broken command must never abort the listing; the error hook
        // already reported it.
        let Ok((spec, _)) = client.resolve(logical) else {
            continue;
        };
        if cli.flow && !spec.flow_depends.is_empty() {
            println!(
                "{:<24} {} (flow depends on: {})",
                name.cyan(),
                spec.short_help,
                spec.flow_depends.join(", ").dimmed()
            );
        } else {
            println!("{:<24} {}", name.cyan(), spec.short_help);
        }
    }
    Ok(())
}
