// src/cli/handlers/value.rs

use crate::{
    cli::handlers::{LevelArgs, print_rows},
    core::context::{Context, VALUE_DOMAIN},
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser, Debug)]
#[command(name = "value", no_binary_name = true, about = "Manipulate the key-value store.")]
struct ValueCli {
    #[command(flatten)]
    levels: LevelArgs,

    #[command(subcommand)]
    action: ValueAction,
}

#[derive(Subcommand, Debug)]
enum ValueAction {
    /// Set a value.
    Set { key: String, value: String },
    /// Rename a key, keeping its stored value.
    Rename {
        src: String,
        dst: String,
        /// Rename even if the destination already exists.
        #[arg(long)]
        overwrite: bool,
    },
    /// Unset some values. The whole batch is validated before anything is
    /// deleted.
    Unset {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show the values. With no keys, all keys are shown.
    Show {
        keys: Vec<String>,
        /// Show every key set at any level, not only the effective view.
        #[arg(long)]
        all: bool,
    },
}

pub fn handle(args: Vec<String>, ctx: &Context) -> Result<()> {
    let cli = ValueCli::try_parse_from(&args)?;
    let mut store = ctx.open_settings()?;
    cli.levels.apply(&mut store)?;
    let level = store.write_level_name().to_string();

    match cli.action {
        ValueAction::Set { key, value } => {
            let old = store.set(VALUE_DOMAIN, &key, &value, "value")?;
            if let Some(old) = old {
                println!(
                    "Removing {} value of {}: {}",
                    level,
                    key.bold(),
                    old.value
                );
            }
            println!("New {} value for {}: {}", level, key.bold(), value);
        }
        ValueAction::Rename {
            src,
            dst,
            overwrite,
        } => {
            store.rename(VALUE_DOMAIN, &src, &dst, overwrite)?;
            println!(
                "Rename {} -> {} in level {}",
                src.bold(),
                dst.bold(),
                level
            );
        }
        ValueAction::Unset { keys } => {
            store.unset(VALUE_DOMAIN, &keys)?;
            for key in &keys {
                println!("Erasing {} value from {} settings", key.bold(), level);
            }
        }
        ValueAction::Show { keys, all } => {
            print_rows(&store.show(VALUE_DOMAIN, &keys, all));
        }
    }
    Ok(())
}
