use std::{path::Path, process::ExitCode};

use ancil_rs::{
    ancil::AncilFile,
    dataset::GriddedDataset,
    logging::init_logging,
    update::{check_output_path, output_path_for, plan_for_dataset, replace_field_data},
};
use clap::Parser;
use error_stack::ResultExt;

mod cli;
mod config;
mod report;

fn main() -> ExitCode {
    let clargs = cli::Cli::parse();
    if let Err(e) = init_logging(clargs.verbosity.log_level_filter(), clargs.log_file.as_deref()) {
        eprintln!("ERROR: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    if let Err(e) = main_inner(clargs) {
        eprintln!("ERROR: {e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_inner(clargs: cli::Cli) -> error_stack::Result<(), CliError> {
    match clargs.command {
        cli::Commands::Convert(convert_cli) => convert_driver(convert_cli),
        cli::Commands::Plan(plan_cli) => plan_driver(plan_cli),
        cli::Commands::Inspect(inspect_cli) => {
            let ancil = open_ancil(&inspect_cli.ancil_file)?;
            println!("{}", report::inspect_report(&ancil));
            Ok(())
        }
        cli::Commands::ConfigTemplate(template_cli) => {
            config::ConvertConfig::write_template_example(&template_cli.template_file)
        }
    }
}

/// Copy the reference ancillary file, replace its field data with the
/// netCDF variables and write the result.
fn convert_driver(cli: cli::ConvertCli) -> error_stack::Result<(), CliError> {
    let mut config = config::ConvertConfig::load(&cli.input)?;
    if cli.no_validate {
        config.validate = false;
    }
    if cli.keep_nans {
        config.fill_missing = false;
    }

    let output_file = cli
        .output
        .clone()
        .unwrap_or_else(|| output_path_for(&cli.input.nc_file));
    check_output_path(&cli.input.nc_file, &output_file).change_context_lazy(|| {
        CliError::usage("Give a different output path with --output")
    })?;

    let reference = open_ancil(config.reference_ancil()?)?;
    let mut ancil = reference.copy(true);
    let ds = open_dataset(&cli.input.nc_file)?;

    let summary = replace_field_data(&mut ancil, &ds, &config.update_options())
        .change_context_lazy(|| {
            CliError::context(format!(
                "Error putting the data from {} into the ancillary fields",
                cli.input.nc_file.display()
            ))
        })?;
    if summary.fields_updated() == 0 {
        log::warn!("No variables were used, the output will be a copy of the reference ancillary file");
    }

    log::info!("Writing {}", output_file.display());
    ancil
        .to_file_with(&output_file, &config.write_options())
        .change_context_lazy(|| {
            CliError::context(format!(
                "Error writing the ancillary file {}",
                output_file.display()
            ))
        })?;
    Ok(())
}

/// Print which slice of which variable would replace each field.
fn plan_driver(cli: cli::PlanCli) -> error_stack::Result<(), CliError> {
    let config = config::ConvertConfig::load(&cli.input)?;
    let ancil = open_ancil(config.reference_ancil()?)?;
    let ds = open_dataset(&cli.input.nc_file)?;
    let plan = plan_for_dataset(&ancil, &ds, &config.update_options()).change_context_lazy(|| {
        CliError::context(format!(
            "Could not match the variables in {} to the ancillary fields",
            cli.input.nc_file.display()
        ))
    })?;
    println!("{}", report::plan_table(&ancil, &plan));
    println!(
        "\n{} of {} fields would be replaced; output would go to {}",
        plan.len(),
        ancil.fields.len(),
        output_path_for(&cli.input.nc_file).display()
    );
    Ok(())
}

fn open_ancil(ancil_file: &Path) -> error_stack::Result<AncilFile, CliError> {
    AncilFile::from_file(ancil_file).change_context_lazy(|| {
        CliError::context(format!(
            "Error reading the ancillary file {}",
            ancil_file.display()
        ))
    })
}

fn open_dataset(nc_file: &Path) -> error_stack::Result<GriddedDataset, CliError> {
    let ds = GriddedDataset::open(nc_file).change_context_lazy(|| {
        CliError::context(format!("Error reading the netCDF file {}", nc_file.display()))
    })?;
    Ok(ds.squeeze())
}

/// Program error type
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Indicates a problem with the combination of arguments and settings given.
    #[error("{0}")]
    UsageError(String),

    /// Wrapper type used to add information to an inner error.
    #[error("{0}")]
    Context(String),
}

impl CliError {
    fn usage<S: ToString>(msg: S) -> Self {
        Self::UsageError(msg.to_string())
    }

    fn context<S: ToString>(ctx: S) -> Self {
        Self::Context(ctx.to_string())
    }
}
