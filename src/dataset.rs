//! In-memory gridded dataset: the variables from a netCDF file that hold
//! data (as opposed to coordinates), as `f64` arrays in file order.
use std::path::{Path, PathBuf};

use indexmap::{IndexMap, IndexSet};
use ndarray::{ArrayD, Axis, IxDyn};

#[cfg(feature = "netcdf")]
use crate::error::DatasetError;

/// One data variable
#[derive(Debug, Clone, PartialEq)]
pub struct DataVariable {
    pub name: String,
    pub dims: Vec<String>,
    pub values: ArrayD<f64>,
}

impl DataVariable {
    /// Create a variable. Returns `None` if the number of dimension names
    /// does not match the number of axes in `values`.
    pub fn new<S: ToString>(name: S, dims: Vec<String>, values: ArrayD<f64>) -> Option<Self> {
        if dims.len() != values.ndim() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            dims,
            values,
        })
    }

    /// Remove every axis of length 1, along with its dimension name.
    pub fn squeeze(self) -> Self {
        let Self {
            name,
            mut dims,
            mut values,
        } = self;
        for iax in (0..values.ndim()).rev() {
            if values.len_of(Axis(iax)) == 1 {
                values = values.remove_axis(Axis(iax));
                dims.remove(iax);
            }
        }
        Self { name, dims, values }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GriddedDataset {
    path: Option<PathBuf>,
    coords: IndexSet<String>,
    data_vars: IndexMap<String, DataVariable>,
}

impl GriddedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a netCDF file and read all of its numeric data variables.
    ///
    /// Coordinate variables (those named after one of their own dimensions, or
    /// listed in any `coordinates` attribute) are recorded by name but not read.
    /// Non-numeric variables are skipped with a warning. Values are decoded as
    /// described in [`crate::nc_utils::read_decoded_values`].
    #[cfg(feature = "netcdf")]
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        use crate::nc_utils;

        let nc_err = |source| DatasetError::Netcdf {
            path: path.to_path_buf(),
            source,
        };
        let ds = netcdf::open(path).map_err(nc_err)?;

        let mut coords = IndexSet::new();
        for var in ds.variables() {
            let name = var.name();
            if var.dimensions().iter().any(|d| d.name() == name) {
                coords.insert(name);
            }
            if let Some(listed) = nc_utils::attribute_as_string(&var, "coordinates") {
                coords.extend(listed.split_whitespace().map(|s| s.to_string()));
            }
        }

        let mut me = Self {
            path: Some(path.to_path_buf()),
            coords,
            data_vars: IndexMap::new(),
        };

        for var in ds.variables() {
            let name = var.name();
            if me.coords.contains(&name) {
                log::debug!("Treating {name} as a coordinate");
                continue;
            }

            let values = match nc_utils::read_decoded_values(&var).map_err(nc_err)? {
                Some(v) => v,
                None => {
                    log::warn!("Variable {name} in {} is not numeric, skipping it", path.display());
                    continue;
                }
            };

            let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
            let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
            let nvalues = values.len();
            let values = ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|_| {
                DatasetError::BadShape {
                    path: path.to_path_buf(),
                    name: name.clone(),
                    nvalues,
                    shape: shape.clone(),
                }
            })?;
            log::debug!("Read data variable {name} with dimensions {dims:?} and shape {shape:?}");
            me.data_vars.insert(name.clone(), DataVariable { name, dims, values });
        }

        Ok(me)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Add a data variable, replacing any existing one of the same name.
    /// A replaced variable keeps its original position.
    pub fn insert(&mut self, var: DataVariable) {
        self.data_vars.insert(var.name.clone(), var);
    }

    /// Mark a name as a coordinate rather than data
    pub fn add_coord<S: ToString>(&mut self, name: S) {
        self.coords.insert(name.to_string());
    }

    pub fn coords(&self) -> impl Iterator<Item = &str> {
        self.coords.iter().map(|s| s.as_str())
    }

    /// Iterate over the data variables in the order they appear in the dataset.
    pub fn data_vars(&self) -> impl Iterator<Item = &DataVariable> {
        self.data_vars.values()
    }

    pub fn data_var(&self, name: &str) -> Option<&DataVariable> {
        self.data_vars.get(name)
    }

    /// Drop every length-1 axis from every data variable.
    pub fn squeeze(self) -> Self {
        let data_vars = self
            .data_vars
            .into_iter()
            .map(|(k, v)| (k, v.squeeze()))
            .collect();
        Self {
            path: self.path,
            coords: self.coords,
            data_vars,
        }
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array;

    use super::*;

    fn var(name: &str, dims: &[&str], shape: &[usize]) -> DataVariable {
        let n = shape.iter().product::<usize>();
        let values = Array::range(0.0, n as f64, 1.0).into_shape(IxDyn(shape)).unwrap();
        DataVariable::new(name, dims.iter().map(|d| d.to_string()).collect(), values).unwrap()
    }

    #[test]
    fn test_squeeze_variable() {
        let v = var("frac", &["time", "pseudo", "lat", "lon"], &[1, 9, 3, 4]).squeeze();
        assert_eq!(v.dims, vec!["pseudo", "lat", "lon"]);
        assert_eq!(v.values.shape(), &[9, 3, 4]);
        assert_eq!(v.values[[8, 2, 3]], 107.0);
    }

    #[test]
    fn test_squeeze_all_singleton() {
        let v = var("scalar", &["t", "z"], &[1, 1]).squeeze();
        assert!(v.dims.is_empty());
        assert_eq!(v.values.ndim(), 0);
    }

    #[test]
    fn test_dims_must_match() {
        let values = ArrayD::zeros(IxDyn(&[2, 2]));
        assert!(DataVariable::new("x", vec!["a".to_string()], values).is_none());
    }

    #[test]
    fn test_data_var_order() {
        let mut ds = GriddedDataset::new();
        ds.insert(var("lai", &["pft", "lat", "lon"], &[5, 3, 4]));
        ds.insert(var("canht", &["pft", "lat", "lon"], &[5, 3, 4]));
        ds.insert(var("frac", &["type", "lat", "lon"], &[9, 3, 4]));
        // Replacing keeps the position
        ds.insert(var("lai", &["pft", "lat", "lon"], &[5, 3, 4]));
        let names: Vec<&str> = ds.data_vars().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["lai", "canht", "frac"]);

        let ds = ds.squeeze();
        let names: Vec<&str> = ds.data_vars().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["lai", "canht", "frac"]);
    }

    #[cfg(feature = "netcdf")]
    mod netcdf_tests {
        use approx::assert_abs_diff_eq;

        use super::super::*;

        /// Write a small file mimicking a vegetation ancillary dumped to netCDF.
        fn write_veg_file(path: &Path) {
            let mut f = netcdf::create(path).unwrap();
            f.add_dimension("t", 1).unwrap();
            f.add_dimension("pseudo", 2).unwrap();
            f.add_dimension("latitude", 3).unwrap();
            f.add_dimension("longitude", 4).unwrap();

            let mut lat = f.add_variable::<f64>("latitude", &["latitude"]).unwrap();
            lat.put_values(&[-1.0, 0.0, 1.0], Extents::All).unwrap();
            let mut lon = f.add_variable::<f64>("longitude", &["longitude"]).unwrap();
            lon.put_values(&[0.0, 1.0, 2.0, 3.0], Extents::All).unwrap();
            let mut height = f.add_variable::<f32>("height", &["t"]).unwrap();
            height.put_values(&[1.5_f32], Extents::All).unwrap();

            let mut lai = f
                .add_variable::<f32>("lai", &["t", "pseudo", "latitude", "longitude"])
                .unwrap();
            lai.put_attribute("_FillValue", -999.0_f32).unwrap();
            lai.put_attribute("coordinates", "height").unwrap();
            let mut values: Vec<f32> = (0..24).map(|i| i as f32).collect();
            values[5] = -999.0;
            lai.put_values(&values, Extents::All).unwrap();

            let mut frac = f
                .add_variable::<i16>("frac", &["t", "latitude", "longitude"])
                .unwrap();
            frac.put_attribute("scale_factor", 0.5_f64).unwrap();
            frac.put_attribute("add_offset", 1.0_f64).unwrap();
            frac.put_values(&[2_i16; 12], Extents::All).unwrap();
        }

        use netcdf::Extents;

        #[test]
        fn test_open_netcdf() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("veg_modified.nc");
            write_veg_file(&path);

            let ds = GriddedDataset::open(&path).unwrap();
            let coords: Vec<&str> = ds.coords().collect();
            assert_eq!(coords, vec!["latitude", "longitude", "height"]);
            let names: Vec<&str> = ds.data_vars().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["lai", "frac"]);

            let lai = ds.data_var("lai").unwrap();
            assert_eq!(lai.values.shape(), &[1, 2, 3, 4]);
            assert!(lai.values[[0, 0, 1, 1]].is_nan());
            assert_abs_diff_eq!(lai.values[[0, 1, 2, 3]], 23.0);

            let frac = ds.data_var("frac").unwrap();
            assert!(frac.values.iter().all(|&v| v == 2.0));

            let ds = ds.squeeze();
            assert_eq!(ds.data_var("lai").unwrap().dims, vec!["pseudo", "latitude", "longitude"]);
            assert_eq!(ds.data_var("frac").unwrap().values.shape(), &[3, 4]);
        }
    }
}
