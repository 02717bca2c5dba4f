// src/cli/handlers/alias.rs

use crate::{
    cli::handlers::{LevelArgs, print_rows},
    core::{
        context::{ALIAS_DOMAIN, Context},
        settings::{LayeredSettings, join_parameters},
    },
};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;

#[derive(Parser, Debug)]
#[command(name = "alias", no_binary_name = true, about = "Manipulate command aliases.")]
struct AliasCli {
    #[command(flatten)]
    levels: LevelArgs,

    #[command(subcommand)]
    action: AliasAction,
}

#[derive(Subcommand, Debug)]
enum AliasAction {
    /// Define an alias, replacing any previous expansion.
    Set {
        name: String,
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        expansion: Vec<String>,
    },
    /// Unset some aliases. The whole batch is validated before anything is
    /// deleted.
    Unset {
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Show the defined aliases. With no names, all are shown.
    Show {
        names: Vec<String>,
        /// Show every alias set at any level, not only the effective view.
        #[arg(long)]
        all: bool,
    },
}

/// Resolves one alias step: the effective expansion for `name`, shell-split.
/// Undefined and empty aliases expand to nothing.
pub fn expand(store: &LayeredSettings, name: &str) -> Option<Vec<String>> {
    let words = store.stored_parameters(ALIAS_DOMAIN, name);
    (!words.is_empty()).then_some(words)
}

pub fn handle(args: Vec<String>, ctx: &Context) -> Result<()> {
    let cli = AliasCli::try_parse_from(&args)?;
    let mut store = ctx.open_settings()?;
    cli.levels.apply(&mut store)?;
    let level = store.write_level_name().to_string();

    match cli.action {
        AliasAction::Set { name, expansion } => {
            let old = store.set_parameters(ALIAS_DOMAIN, &name, &expansion)?;
            if let Some(old) = old {
                println!(
                    "Removing {} alias {}: {}",
                    level,
                    name.bold(),
                    join_parameters(&old)
                );
            }
            println!(
                "New {} alias {}: {}",
                level,
                name.bold(),
                join_parameters(&expansion)
            );
        }
        AliasAction::Unset { names } => {
            store.unset(ALIAS_DOMAIN, &names)?;
            for name in &names {
                println!("Erasing alias {} from {} settings", name.bold(), level);
            }
        }
        AliasAction::Show { names, all } => {
            print_rows(&store.show(ALIAS_DOMAIN, &names, all));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::settings::GLOBAL_LEVEL;
    use tempfile::TempDir;

    fn stock_store(dir: &TempDir) -> LayeredSettings {
        let mut store = LayeredSettings::open(vec![(
            GLOBAL_LEVEL.to_string(),
            Some(dir.path().join("global.toml")),
        )])
        .unwrap();
        store.select_write_level(GLOBAL_LEVEL).unwrap();
        store
    }

    #[test]
    fn test_expand_splits_the_stored_expansion() {
        let dir = TempDir::new().unwrap();
        let mut store = stock_store(&dir);
        store
            .set_parameters(
                ALIAS_DOMAIN,
                "dep",
                &[
                    "deploy.sh".to_string(),
                    "--env".to_string(),
                    "two words".to_string(),
                ],
            )
            .unwrap();

        assert_eq!(
            expand(&store, "dep"),
            Some(vec![
                "deploy.sh".to_string(),
                "--env".to_string(),
                "two words".to_string(),
            ])
        );
    }

    #[test]
    fn test_expand_is_none_for_undefined_names() {
        let dir = TempDir::new().unwrap();
        let store = stock_store(&dir);
        assert_eq!(expand(&store, "ghost"), None);
    }
}
