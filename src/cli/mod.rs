use clap::Parser;

pub mod handlers;

/// quiver: turns external executables into first-class subcommands.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The sequence of arguments passed to quiver. Kept opaque here so that
    /// everything after the command name can flow to the command untouched.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
