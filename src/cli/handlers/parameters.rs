// src/cli/handlers/parameters.rs

use crate::{
    cli::handlers::{LevelArgs, print_rows},
    core::{
        context::{Context, PARAMETERS_DOMAIN},
        settings::join_parameters,
    },
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser, Debug)]
#[command(
    name = "parameters",
    no_binary_name = true,
    about = "Manipulate the parameters stored for commands."
)]
struct ParametersCli {
    #[command(flatten)]
    levels: LevelArgs,

    #[command(subcommand)]
    action: ParametersAction,
}

#[derive(Subcommand, Debug)]
enum ParametersAction {
    /// Set the parameters of a command, replacing any stored ones.
    Set {
        cmd: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Add parameters after the stored parameters of a command.
    Append {
        cmd: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Add parameters before the stored parameters of a command.
    Insert {
        cmd: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Remove some stored parameters of a command.
    Remove {
        cmd: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        params: Vec<String>,
    },
    /// Unset the parameters of some commands. The whole batch is validated
    /// before anything is deleted.
    Unset {
        #[arg(required = true)]
        cmds: Vec<String>,
    },
    /// Show the stored parameters. With no commands, all are shown.
    Show {
        cmds: Vec<String>,
        /// Show every command set at any level, not only the effective view.
        #[arg(long)]
        all: bool,
    },
}

pub fn handle(args: Vec<String>, ctx: &Context) -> Result<()> {
    let cli = ParametersCli::try_parse_from(&args)?;
    let mut store = ctx.open_settings()?;
    cli.levels.apply(&mut store)?;
    let level = store.write_level_name().to_string();

    match cli.action {
        ParametersAction::Set { cmd, params } => {
            let old = store.set_parameters(PARAMETERS_DOMAIN, &cmd, &params)?;
            if let Some(old) = old {
                println!(
                    "Removing {} parameters of {}: {}",
                    level,
                    cmd.bold(),
                    join_parameters(&old)
                );
            }
            println!(
                "New {} parameters for {}: {}",
                level,
                cmd.bold(),
                join_parameters(&params)
            );
        }
        ParametersAction::Append { cmd, params } => {
            let new = store.append_parameters(PARAMETERS_DOMAIN, &cmd, &params)?;
            println!(
                "New {} parameters for {}: {}",
                level,
                cmd.bold(),
                join_parameters(&new)
            );
        }
        ParametersAction::Insert { cmd, params } => {
            let new = store.insert_parameters(PARAMETERS_DOMAIN, &cmd, &params)?;
            println!(
                "New {} parameters for {}: {}",
                level,
                cmd.bold(),
                join_parameters(&new)
            );
        }
        ParametersAction::Remove { cmd, params } => {
            let new = store.remove_parameters(PARAMETERS_DOMAIN, &cmd, &params)?;
            println!(
                "New {} parameters for {}: {}",
                level,
                cmd.bold(),
                join_parameters(&new)
            );
        }
        ParametersAction::Unset { cmds } => {
            store.unset(PARAMETERS_DOMAIN, &cmds)?;
            for cmd in &cmds {
                println!("Erasing {} parameters from {} settings", cmd.bold(), level);
            }
        }
        ParametersAction::Show { cmds, all } => {
            print_rows(&store.show(PARAMETERS_DOMAIN, &cmds, all));
        }
    }
    Ok(())
}
