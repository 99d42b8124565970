pub mod ancil;
pub mod dataset;
pub mod error;
pub mod logging;
#[cfg(feature = "netcdf")]
pub mod nc_utils;
pub mod update;

#[cfg(test)]
pub(crate) mod test_utils;
