// src/cli/handlers/which.rs

use crate::core::{
    context::Context,
    discovery::{self, CommandDiscovery},
    search_path::SearchPath,
};
use anyhow::{Result, anyhow};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "which",
    no_binary_name = true,
    about = "Locate the executable behind an external command."
)]
struct WhichCli {
    /// The command name, as shown by `commands`.
    name: String,
}

pub fn handle(args: Vec<String>, ctx: &Context) -> Result<()> {
    let cli = WhichCli::try_parse_from(&args)?;

    let search_path = SearchPath::assemble(ctx.project.as_ref(), &ctx.app_dir);
    let discovery = CommandDiscovery::new(&ctx.app_name, search_path);
    let logical = discovery::logical_name(&cli.name);
    let executable_name = discovery.executable_name(&logical);

    let path = discovery
        .search_path()
        .which(&executable_name)
        .ok_or_else(|| {
            anyhow!(
                "No executable named '{}' was found on the search path.",
                executable_name
            )
        })?;
    println!("{}", path.display());
    Ok(())
}
