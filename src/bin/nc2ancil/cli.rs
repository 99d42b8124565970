//! Command line interface definitions
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Put data from a netCDF file into a copy of a UM ancillary file.
#[derive(Debug, Parser)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Commands,

    /// Also write log messages (at least DEBUG level) to this file.
    #[clap(long, global = true)]
    pub(crate) log_file: Option<PathBuf>,

    #[command(flatten)]
    pub(crate) verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Commands {
    /// Replace the field data of a reference ancillary file with the
    /// variables in a netCDF file and write the result.
    Convert(ConvertCli),
    /// Show which variable slice would be written to which field, without
    /// writing anything.
    Plan(PlanCli),
    /// Print a summary of an ancillary file's header and fields.
    Inspect(InspectCli),
    /// Create an example of the configuration file.
    ConfigTemplate(TemplateCli),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct InputCli {
    /// The netCDF file with the new field data. Each data variable is
    /// treated as a stack of 2D fields along its first dimension, after
    /// dropping any length-1 dimensions.
    pub(crate) nc_file: PathBuf,

    /// The reference ancillary file whose fields are replaced. Required
    /// here if not given in the configuration file or environment.
    #[clap(short, long)]
    pub(crate) ancil: Option<PathBuf>,

    /// Path to a TOML configuration file, see the config-template subcommand.
    #[clap(short, long)]
    pub(crate) config: Option<PathBuf>,

    /// Use only these variables, in this order, instead of every data
    /// variable in file order. Separate names with commas.
    #[clap(long, value_delimiter = ',')]
    pub(crate) variables: Option<Vec<String>>,

    /// Leave out these variables. Separate names with commas.
    #[clap(long, value_delimiter = ',')]
    pub(crate) skip: Vec<String>,

    /// Do not require each slice to match the grid of its field.
    #[clap(long)]
    pub(crate) no_shape_check: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct ConvertCli {
    #[clap(flatten)]
    pub(crate) input: InputCli,

    /// Where to write the new ancillary file. The default is the netCDF
    /// file path with its extension removed.
    #[clap(short, long)]
    pub(crate) output: Option<PathBuf>,

    /// Write the output even if it fails the ancillary file checks.
    #[clap(long)]
    pub(crate) no_validate: bool,

    /// Leave NaNs in the data instead of replacing them with each field's
    /// missing data indicator.
    #[clap(long)]
    pub(crate) keep_nans: bool,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct PlanCli {
    #[clap(flatten)]
    pub(crate) input: InputCli,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct InspectCli {
    /// The ancillary file to summarize
    pub(crate) ancil_file: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct TemplateCli {
    /// Path to write the template to
    pub(crate) template_file: PathBuf,
}
