// src/cli/handlers/mod.rs

use crate::core::settings::{
    GLOBAL_LEVEL, LOCAL_LEVEL, LayeredSettings, ReadMode, SETTINGS_FILE_MODE, ShowRow,
    WORKGROUP_LEVEL,
};
use anyhow::Result;
use colored::*;

pub mod alias;
pub mod commands;
pub mod external;
pub mod parameters;
pub mod value;
pub mod which;

/// Settings-level selection flags shared by the store-manipulating commands.
/// The exact write level is always explicit; reads default to precedence
/// resolution across all levels.
#[derive(clap::Args, Debug, Default)]
pub struct LevelArgs {
    /// Operate on the project-local settings.
    #[arg(long, global = true, group = "write_level")]
    pub local: bool,

    /// Operate on the workgroup settings.
    #[arg(long, global = true, group = "write_level")]
    pub workgroup: bool,

    /// Operate on the global settings.
    #[arg(long, global = true, group = "write_level")]
    pub global: bool,

    /// Read from one specific level, or "settings-file" to show which
    /// commands registered each key instead of a value.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub read_level: Option<String>,
}

impl LevelArgs {
    pub fn apply(&self, store: &mut LayeredSettings) -> Result<()> {
        if self.local {
            store.select_write_level(LOCAL_LEVEL)?;
        } else if self.workgroup {
            store.select_write_level(WORKGROUP_LEVEL)?;
        } else if self.global {
            store.select_write_level(GLOBAL_LEVEL)?;
        }
        if let Some(level) = &self.read_level {
            let mode = if level == SETTINGS_FILE_MODE {
                ReadMode::SettingsFile
            } else {
                ReadMode::Level(level.clone())
            };
            store.select_read_mode(mode)?;
        }
        Ok(())
    }
}

/// Renders show output as key/value rows, coloring each value by the level
/// it was resolved from so provenance stays visible.
pub fn print_rows(rows: &[ShowRow]) {
    for row in rows {
        match &row.level {
            Some(level) => println!(
                "{} {}",
                row.key.bold(),
                row.rendering.color(level_color(level))
            ),
            None => println!("{} {}", row.key.bold(), row.rendering),
        }
    }
}

fn level_color(level: &str) -> Color {
    match level {
        "command-line" => Color::Cyan,
        "local" => Color::Green,
        "workgroup" => Color::Magenta,
        "global" => Color::Yellow,
        _ => Color::White,
    }
}
