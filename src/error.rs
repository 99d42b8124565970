//! Common errors across the ancil-rs crate
use std::path::PathBuf;

/// Errors related to loading a gridded dataset
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[cfg(feature = "netcdf")]
    #[error("Error reading netCDF file {}: {source}", path.display())]
    Netcdf {
        path: PathBuf,
        source: netcdf::Error,
    },
    #[error("Variable {name} in {} has {nvalues} values, which does not match its dimensions {shape:?}", path.display())]
    BadShape {
        path: PathBuf,
        name: String,
        nvalues: usize,
        shape: Vec<usize>,
    },
}

/// Errors related to replacing ancillary field data with dataset slices
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    #[error("Variable {variable} needs fields {first} to {last} but the ancillary file only has {nfields} fields")]
    TooFewFields {
        variable: String,
        first: usize,
        last: usize,
        nfields: usize,
    },
    #[error("Variable {0} is a scalar after squeezing, it cannot be mapped onto ancillary fields")]
    ScalarVariable(String),
    #[error("Slice {slice} of variable {variable} has shape {shape:?}, field {field} needs a 2D slice")]
    SliceRank {
        variable: String,
        slice: usize,
        field: usize,
        shape: Vec<usize>,
    },
    #[error("Slice {slice} of variable {variable} has shape {actual:?}, but field {field} has a {expected:?} grid")]
    ShapeMismatch {
        variable: String,
        slice: usize,
        field: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("Requested variable {0} is not a data variable in the dataset")]
    MissingVariable(String),
    #[error("The output path {} is the input dataset file", .0.display())]
    OutputIsInput(PathBuf),
}
