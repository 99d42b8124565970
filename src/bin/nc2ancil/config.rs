use std::{io::Write, path::{Path, PathBuf}};

use ancil_rs::{ancil::WriteOptions, update::UpdateOptions};
use error_stack::ResultExt;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{cli, CliError};

/// Prefix for environment variables that override the configuration file
const ENV_PREFIX: &str = "NC2ANCIL_";

/// Settings for a conversion, merged from (lowest to highest priority) the
/// defaults, a TOML file, `NC2ANCIL_*` environment variables and the command
/// line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct ConvertConfig {
    pub(crate) reference_ancil: Option<PathBuf>,
    pub(crate) variables: Option<Vec<String>>,
    pub(crate) skip_variables: Vec<String>,
    pub(crate) validate: bool,
    pub(crate) fill_missing: bool,
    pub(crate) check_shapes: bool,
    pub(crate) words_per_sector: usize,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        let update = UpdateOptions::default();
        let write = WriteOptions::default();
        Self {
            reference_ancil: None,
            variables: update.variables,
            skip_variables: update.skip_variables,
            validate: write.validate,
            fill_missing: update.fill_missing,
            check_shapes: update.check_shapes,
            words_per_sector: write.words_per_sector,
        }
    }
}

impl ConvertConfig {
    /// Load the configuration from the defaults, the optional TOML file
    /// and the environment, then apply the command line options in `input`.
    pub(crate) fn load(input: &cli::InputCli) -> error_stack::Result<Self, CliError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(config_file) = input.config.as_deref() {
            if !config_file.is_file() {
                return Err(CliError::usage(format!(
                    "Configuration file {} does not exist",
                    config_file.display()
                ))
                .into());
            }
            figment = figment.merge(Toml::file(config_file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let mut config: Self = figment
            .extract()
            .change_context_lazy(|| CliError::context("Error loading the configuration"))?;
        config.apply_cli(input);
        log::debug!("Configuration: {config:?}");
        Ok(config)
    }

    fn apply_cli(&mut self, input: &cli::InputCli) {
        if let Some(ancil) = &input.ancil {
            self.reference_ancil = Some(ancil.clone());
        }
        if let Some(variables) = &input.variables {
            self.variables = Some(variables.clone());
        }
        self.skip_variables.extend(input.skip.iter().cloned());
        if input.no_shape_check {
            self.check_shapes = false;
        }
    }

    pub(crate) fn reference_ancil(&self) -> error_stack::Result<&Path, CliError> {
        self.reference_ancil.as_deref().ok_or_else(|| {
            CliError::usage(
                "No reference ancillary file given; use --ancil, reference_ancil in the configuration file, or NC2ANCIL_REFERENCE_ANCIL",
            )
            .into()
        })
    }

    pub(crate) fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            variables: self.variables.clone(),
            skip_variables: self.skip_variables.clone(),
            fill_missing: self.fill_missing,
            check_shapes: self.check_shapes,
        }
    }

    pub(crate) fn write_options(&self) -> WriteOptions {
        WriteOptions {
            validate: self.validate,
            words_per_sector: self.words_per_sector,
        }
    }

    /// Create an example configuration file
    pub(crate) fn write_template_example(example_file: &Path) -> error_stack::Result<(), CliError> {
        let comments = [
            "This is an example configuration for nc2ancil. Every key is optional.",
            "",
            "reference_ancil: the ancillary file whose fields are replaced (same as --ancil).",
            "variables: which netCDF data variables to use, and in what order. Leave this out",
            "  to use every data variable in the order they are stored in the netCDF file.",
            "skip_variables: data variables to leave out.",
            "validate: check the output is a consistent ancillary file before writing it.",
            "fill_missing: replace NaNs (including netCDF fill values) with each field's",
            "  missing data indicator.",
            "check_shapes: require every slice to have the same rows and columns as its field.",
            "words_per_sector: align the start of each field's data to this many words.",
            "",
            "Any key can also be set with an environment variable, e.g. NC2ANCIL_VALIDATE=false.",
            "Command line options take precedence over both.",
        ];
        let template = Self::template_example();
        let mut f = std::fs::File::create(example_file).change_context_lazy(|| {
            CliError::context("Error occurred while opening the output file for the configuration template")
        })?;

        for line in comments {
            writeln!(f, "# {line}").change_context_lazy(|| {
                CliError::context(format!("Error writing to template file: {}", example_file.display()))
            })?;
        }
        let s = toml::to_string_pretty(&template)
            .expect("The example template should be able to be serialized (this is a bug)");
        write!(f, "{s}").change_context_lazy(|| {
            CliError::context(format!("Error writing to template file: {}", example_file.display()))
        })?;

        Ok(())
    }

    fn template_example() -> Self {
        Self {
            reference_ancil: Some(PathBuf::from("/path/to/veg_original")),
            variables: Some(vec!["frac".to_string(), "lai".to_string(), "canht".to_string()]),
            skip_variables: vec!["soil_albedo".to_string()],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    fn input_cli(args: &[&str]) -> cli::InputCli {
        let mut full = vec!["nc2ancil", "plan"];
        full.extend(args);
        match cli::Cli::parse_from(full).command {
            cli::Commands::Plan(plan) => plan.input,
            other => panic!("Parsed the wrong subcommand: {other:?}"),
        }
    }

    #[test]
    fn test_template_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("nc2ancil.toml");
        ConvertConfig::write_template_example(&template).unwrap();

        let input = input_cli(&["veg.nc", "--config", template.to_str().unwrap()]);
        let config = ConvertConfig::load(&input).unwrap();
        assert_eq!(config.reference_ancil, Some(PathBuf::from("/path/to/veg_original")));
        assert_eq!(config.variables.as_deref().map(|v| v.len()), Some(3));
        assert_eq!(config.skip_variables, vec!["soil_albedo"]);
        assert!(config.validate);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = dir.path().join("cfg.toml");
        std::fs::write(
            &cfg,
            "reference_ancil = \"/a/veg\"\nskip_variables = [\"x\"]\nwords_per_sector = 2048\n",
        )
        .unwrap();

        let input = input_cli(&[
            "veg.nc",
            "-c",
            cfg.to_str().unwrap(),
            "--ancil",
            "/b/veg",
            "--variables",
            "lai,frac",
            "--skip",
            "y",
            "--no-shape-check",
        ]);
        let config = ConvertConfig::load(&input).unwrap();
        assert_eq!(config.reference_ancil().unwrap(), Path::new("/b/veg"));
        assert_eq!(config.variables, Some(vec!["lai".to_string(), "frac".to_string()]));
        assert_eq!(config.skip_variables, vec!["x", "y"]);
        assert!(!config.check_shapes);
        assert!(config.fill_missing);
        assert_eq!(config.write_options().words_per_sector, 2048);
    }

    #[test]
    fn test_missing_config_file() {
        let input = input_cli(&["veg.nc", "--config", "/no/such/nc2ancil.toml"]);
        assert!(ConvertConfig::load(&input).is_err());
    }
}
