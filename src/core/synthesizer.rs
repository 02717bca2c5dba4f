// src/core/synthesizer.rs

use crate::{
    core::types::TypeRegistry,
    models::{CommandSpec, ParamValue},
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;

/// Identifier of the synthesized trailing catch-all argument.
const CATCH_ALL_ID: &str = "args";

/// An external executable promoted to a first-class subcommand.
///
/// This layer is purely structural: it translates an already-parsed
/// [`CommandSpec`] into the command object the surrounding framework (clap)
/// expects, and extracts resolved parameter values after parsing. It never
/// re-derives metadata.
#[derive(Debug)]
pub struct ExternalCommand {
    pub spec: CommandSpec,
    pub executable: PathBuf,
}

impl ExternalCommand {
    pub fn build(spec: CommandSpec, executable: PathBuf) -> Self {
        Self { spec, executable }
    }

    /// The declared upstream commands, for the framework's own dependency
    /// ordering.
    pub fn flow_depends(&self) -> &[String] {
        &self.spec.flow_depends
    }

    /// Translates the spec into a `clap::Command`, attaching parameters in
    /// declaration order: options first, then positional arguments, then
    /// flags, then — when declared — the trailing catch-all.
    pub fn clap_command(&self, registry: &TypeRegistry) -> Command {
        let mut command = Command::new(self.spec.name.clone())
            .about(self.spec.short_help.clone())
            .long_about(self.spec.full_help.clone())
            .no_binary_name(true)
            .disable_version_flag(true);

        for option in &self.spec.options {
            let id = bare_name(&option.name);
            command = command.arg(
                Arg::new(id.clone())
                    .long(id)
                    .help(option.help.clone())
                    .action(ArgAction::Set)
                    .value_parser(registry.value_parser(&option.value_type)),
            );
        }
        for argument in &self.spec.arguments {
            let mut arg = Arg::new(argument.name.clone())
                .help(argument.help.clone())
                .value_parser(registry.value_parser(&argument.value_type));
            arg = match argument.nargs {
                -1 => arg.num_args(0..),
                1 => arg.num_args(1).required(true),
                n => arg.num_args(n.max(0) as usize).required(true),
            };
            command = command.arg(arg);
        }
        for flag in &self.spec.flags {
            let id = bare_name(&flag.name);
            command = command.arg(
                Arg::new(id.clone())
                    .long(id)
                    .help(flag.help.clone())
                    .action(ArgAction::SetTrue),
            );
        }
        if let Some(help) = &self.spec.remaining_args {
            command = command.arg(
                Arg::new(CATCH_ALL_ID)
                    .help(help.clone())
                    .num_args(0..)
                    .allow_hyphen_values(true)
                    .trailing_var_arg(true),
            );
        }
        command
    }

    /// Extracts the resolved value of every declared parameter, in
    /// declaration order. Flags that were not passed fall back to their
    /// protocol-declared default.
    pub fn parameter_values(&self, matches: &ArgMatches) -> Vec<(String, ParamValue)> {
        let mut values = Vec::new();
        for option in &self.spec.options {
            let id = bare_name(&option.name);
            let value = matches
                .get_one::<String>(&id)
                .map(|v| ParamValue::Str(v.clone()))
                .unwrap_or(ParamValue::Missing);
            values.push((id, value));
        }
        for argument in &self.spec.arguments {
            let value = if argument.nargs == 1 {
                matches
                    .get_one::<String>(&argument.name)
                    .map(|v| ParamValue::Str(v.clone()))
                    .unwrap_or(ParamValue::Missing)
            } else {
                ParamValue::Seq(
                    matches
                        .get_many::<String>(&argument.name)
                        .map(|vals| vals.cloned().collect())
                        .unwrap_or_default(),
                )
            };
            values.push((argument.name.clone(), value));
        }
        for flag in &self.spec.flags {
            let id = bare_name(&flag.name);
            let value = if matches.get_flag(&id) {
                true
            } else {
                flag.default
            };
            values.push((id, ParamValue::Bool(value)));
        }
        if self.spec.remaining_args.is_some() {
            values.push((
                CATCH_ALL_ID.to_string(),
                ParamValue::Seq(
                    matches
                        .get_many::<String>(CATCH_ALL_ID)
                        .map(|vals| vals.cloned().collect())
                        .unwrap_or_default(),
                ),
            ));
        }
        values
    }
}

/// Protocol names may carry leading dashes (`--verbose`); clap wants the bare
/// name for both the identifier and the long form.
fn bare_name(name: &str) -> String {
    name.trim_start_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ArgumentDecl, FlagDecl, OptionDecl, ValueType};

    fn demo_spec() -> CommandSpec {
        CommandSpec {
            name: "demo.sh".to_string(),
            short_help: "A demo.".to_string(),
            full_help: "A demo.\nLonger text.".to_string(),
            options: vec![OptionDecl {
                name: "count".to_string(),
                value_type: ValueType::Int,
                help: "How many".to_string(),
            }],
            flags: vec![FlagDecl {
                name: "verbose".to_string(),
                help: "Talk more".to_string(),
                default: false,
            }],
            arguments: vec![ArgumentDecl {
                name: "target".to_string(),
                value_type: ValueType::Str,
                help: "The target".to_string(),
                nargs: 1,
            }],
            remaining_args: Some("Remaining arguments".to_string()),
            flow_depends: vec!["build".to_string()],
        }
    }

    fn build() -> ExternalCommand {
        ExternalCommand::build(demo_spec(), PathBuf::from("/usr/bin/quiver-demo.sh"))
    }

    #[test]
    fn test_parses_declared_parameters() {
        let command = build();
        let registry = TypeRegistry::new();
        let matches = command
            .clap_command(&registry)
            .try_get_matches_from(["--count", "3", "prod", "--verbose", "extra", "--raw"])
            .unwrap();

        let values = command.parameter_values(&matches);
        assert_eq!(
            values,
            vec![
                ("count".to_string(), ParamValue::Str("3".to_string())),
                ("target".to_string(), ParamValue::Str("prod".to_string())),
                ("verbose".to_string(), ParamValue::Bool(true)),
                (
                    "args".to_string(),
                    ParamValue::Seq(vec!["extra".to_string(), "--raw".to_string()])
                ),
            ]
        );
    }

    #[test]
    fn test_typed_option_rejects_bad_value() {
        let command = build();
        let registry = TypeRegistry::new();
        let result = command
            .clap_command(&registry)
            .try_get_matches_from(["--count", "three", "prod"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flag_falls_back_to_declared_default() {
        let mut spec = demo_spec();
        spec.flags[0].default = true;
        let command = ExternalCommand::build(spec, PathBuf::from("/x"));
        let registry = TypeRegistry::new();
        let matches = command
            .clap_command(&registry)
            .try_get_matches_from(["prod"])
            .unwrap();

        let values = command.parameter_values(&matches);
        assert!(values.contains(&("verbose".to_string(), ParamValue::Bool(true))));
    }

    #[test]
    fn test_no_catch_all_when_not_declared() {
        let mut spec = demo_spec();
        spec.remaining_args = None;
        let command = ExternalCommand::build(spec, PathBuf::from("/x"));
        let registry = TypeRegistry::new();
        assert!(
            command
                .clap_command(&registry)
                .try_get_matches_from(["prod", "stray"])
                .is_err()
        );
    }

    #[test]
    fn test_multi_value_argument_collects_a_sequence() {
        let mut spec = demo_spec();
        spec.arguments[0].nargs = 2;
        spec.remaining_args = None;
        let command = ExternalCommand::build(spec, PathBuf::from("/x"));
        let registry = TypeRegistry::new();
        let matches = command
            .clap_command(&registry)
            .try_get_matches_from(["a", "b"])
            .unwrap();

        let values = command.parameter_values(&matches);
        assert!(values.contains(&(
            "target".to_string(),
            ParamValue::Seq(vec!["a".to_string(), "b".to_string()])
        )));
    }
}
