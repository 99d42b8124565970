//! Replacing ancillary field data with slices of dataset variables.
//!
//! Each data variable is treated as a stack of 2D slices along its first
//! axis. The stacks are laid onto the ancillary fields one after another:
//! the first variable's slices replace fields `0..n1`, the second variable's
//! replace fields `n1..n1 + n2`, and so on.
use std::{
    collections::HashMap,
    ops::Range,
    path::{Path, PathBuf},
};

use ndarray::{ArrayViewD, Axis, Ix2};
use serde::{Deserialize, Serialize};

use crate::{
    ancil::{constants::lookup as lk, AncilFile},
    dataset::{DataVariable, GriddedDataset},
    error::UpdateError,
};

/// One slice of one variable, and the index of the field it replaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceAssignment {
    pub variable: String,
    pub slice_index: usize,
    pub field_index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOptions {
    /// Use only these variables, in this order. If `None`, all data variables
    /// are used in dataset order.
    pub variables: Option<Vec<String>>,
    /// Variables to leave out.
    pub skip_variables: Vec<String>,
    /// Replace NaNs with the field's missing data indicator.
    pub fill_missing: bool,
    /// Require each slice to match its field's (rows, columns).
    pub check_shapes: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            variables: None,
            skip_variables: vec![],
            fill_missing: true,
            check_shapes: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpdateSummary {
    pub assignments: Vec<SliceAssignment>,
    pub nfields: usize,
}

impl UpdateSummary {
    pub fn fields_updated(&self) -> usize {
        self.assignments.len()
    }

    /// Indices of fields after the last one replaced. Since fields are
    /// replaced contiguously from 0, these are all the untouched fields.
    pub fn untouched_fields(&self) -> Range<usize> {
        self.assignments.len()..self.nfields
    }
}

/// Work out which field each slice goes to.
///
/// `stacks` gives each variable's name and number of slices, in the order
/// they are to be applied. Slice `i` of a variable goes to field
/// `offset + i`, where `offset` is the total number of slices of all
/// preceding variables. Returns an error if that would go past the last of
/// the `nfields` fields.
pub fn plan_assignments<'a, I>(
    nfields: usize,
    stacks: I,
) -> Result<Vec<SliceAssignment>, UpdateError>
where
    I: IntoIterator<Item = (&'a str, usize)>,
{
    let mut offset = 0;
    let mut plan = vec![];
    for (variable, nslices) in stacks {
        let end = offset + nslices;
        if end > nfields {
            return Err(UpdateError::TooFewFields {
                variable: variable.to_string(),
                first: offset,
                last: end - 1,
                nfields,
            });
        }

        plan.extend((0..nslices).map(|i| SliceAssignment {
            variable: variable.to_string(),
            slice_index: i,
            field_index: offset + i,
        }));
        offset = end;
    }
    Ok(plan)
}

/// A variable viewed as a stack of slices along its first axis
struct LevelStack<'a> {
    name: &'a str,
    values: ArrayViewD<'a, f64>,
}

impl<'a> LevelStack<'a> {
    fn new(var: &'a DataVariable) -> Result<Self, UpdateError> {
        let values = match var.values.ndim() {
            0 => return Err(UpdateError::ScalarVariable(var.name.clone())),
            // A single 2D field: treat it as a stack of one
            2 => var.values.view().insert_axis(Axis(0)),
            _ => var.values.view(),
        };
        Ok(Self {
            name: &var.name,
            values,
        })
    }

    fn nslices(&self) -> usize {
        self.values.len_of(Axis(0))
    }
}

/// Choose the variables to use, in order, according to `options`.
fn select_variables<'a>(
    dataset: &'a GriddedDataset,
    options: &UpdateOptions,
) -> Result<Vec<&'a DataVariable>, UpdateError> {
    let selected: Vec<&DataVariable> = if let Some(names) = &options.variables {
        names
            .iter()
            .map(|n| {
                dataset
                    .data_var(n)
                    .ok_or_else(|| UpdateError::MissingVariable(n.clone()))
            })
            .collect::<Result<_, _>>()?
    } else {
        dataset.data_vars().collect()
    };

    Ok(selected
        .into_iter()
        .filter(|v| {
            let skip = options.skip_variables.contains(&v.name);
            if skip {
                log::info!("Skipping variable {}", v.name);
            }
            !skip
        })
        .collect())
}

fn level_stacks<'a>(
    dataset: &'a GriddedDataset,
    options: &UpdateOptions,
) -> Result<Vec<LevelStack<'a>>, UpdateError> {
    select_variables(dataset, options)?
        .into_iter()
        .map(LevelStack::new)
        .collect()
}

/// Compute the assignments `replace_field_data` would make, without
/// changing anything.
pub fn plan_for_dataset(
    ancil: &AncilFile,
    dataset: &GriddedDataset,
    options: &UpdateOptions,
) -> Result<Vec<SliceAssignment>, UpdateError> {
    let stacks = level_stacks(dataset, options)?;
    plan_assignments(ancil.fields.len(), stacks.iter().map(|s| (s.name, s.nslices())))
}

/// Replace the data of `ancil`'s fields with slices from `dataset`.
///
/// See [`plan_assignments`] for how slices are matched to fields. Each slice
/// must be 2D and, if `options.check_shapes` is set, match the field's grid.
/// Without the check, a field given a slice of a different shape has its
/// `lbrow` and `lbnpt` changed to match; whether the result may be written is
/// then up to [`AncilFile::validate`]. Everything is checked before any field
/// is changed, so on error `ancil` is left as it was.
pub fn replace_field_data(
    ancil: &mut AncilFile,
    dataset: &GriddedDataset,
    options: &UpdateOptions,
) -> Result<UpdateSummary, UpdateError> {
    let stacks = level_stacks(dataset, options)?;
    let plan = plan_assignments(ancil.fields.len(), stacks.iter().map(|s| (s.name, s.nslices())))?;
    let stacks_by_name: HashMap<&str, &LevelStack> = stacks.iter().map(|s| (s.name, s)).collect();

    let mut new_data = Vec::with_capacity(plan.len());
    for a in plan.iter() {
        let stack = stacks_by_name[a.variable.as_str()];
        let slice = stack.values.index_axis(Axis(0), a.slice_index);
        let shape = slice.shape().to_vec();
        let slice = slice
            .into_dimensionality::<Ix2>()
            .map_err(|_| UpdateError::SliceRank {
                variable: a.variable.clone(),
                slice: a.slice_index,
                field: a.field_index,
                shape,
            })?;

        let field = &ancil.fields[a.field_index];
        if options.check_shapes {
            if let Some(expected) = field.lookup.grid_shape() {
                if slice.dim() != expected {
                    return Err(UpdateError::ShapeMismatch {
                        variable: a.variable.clone(),
                        slice: a.slice_index,
                        field: a.field_index,
                        expected,
                        actual: slice.dim(),
                    });
                }
            }
        }

        let mut data = slice.to_owned();
        if options.fill_missing {
            let mdi = field.lookup.bmdi();
            data.mapv_inplace(|v| if v.is_nan() { mdi } else { v });
        }
        new_data.push(data);
    }

    for (a, data) in plan.iter().zip(new_data) {
        log::debug!(
            "Replacing field {} (STASH {}, lblev {}) with slice {} of {}",
            a.field_index,
            ancil.fields[a.field_index].lookup.stash_code(),
            ancil.fields[a.field_index].lookup.lblev(),
            a.slice_index,
            a.variable
        );
        let field = &mut ancil.fields[a.field_index];
        let (rows, cols) = data.dim();
        if field.lookup.grid_shape() != Some((rows, cols)) {
            log::warn!(
                "Field {} changes from (lbrow, lbnpt) = ({}, {}) to ({rows}, {cols}) to fit slice {} of {}",
                a.field_index,
                field.lookup.lbrow(),
                field.lookup.lbnpt(),
                a.slice_index,
                a.variable
            );
            field.lookup.set_int(lk::LBROW, rows as i64);
            field.lookup.set_int(lk::LBNPT, cols as i64);
        }
        field.set_data_array(data);
    }

    let summary = UpdateSummary {
        assignments: plan,
        nfields: ancil.fields.len(),
    };
    log::info!(
        "Replaced the data of {} of {} fields",
        summary.fields_updated(),
        summary.nfields
    );
    let untouched = summary.untouched_fields();
    if !untouched.is_empty() {
        log::warn!(
            "Fields {} to {} were not replaced and keep their original data",
            untouched.start,
            untouched.end - 1
        );
    }
    Ok(summary)
}

/// The output path for a dataset file: the same path with exactly one
/// trailing extension removed (`veg_modified.nc` becomes `veg_modified`,
/// `a/b.c.nc` becomes `a/b.c`). A path with no extension is returned as is.
pub fn output_path_for(nc_file: &Path) -> PathBuf {
    nc_file.with_extension("")
}

/// Error if writing to `output` would replace the dataset file `nc_file`.
///
/// Both paths are resolved first, so `./veg.nc` and `veg.nc` are the same
/// file. `output` need not exist yet.
pub fn check_output_path(nc_file: &Path, output: &Path) -> Result<(), UpdateError> {
    if resolve_path(output) == resolve_path(nc_file) {
        Err(UpdateError::OutputIsInput(output.to_path_buf()))
    } else {
        Ok(())
    }
}

fn resolve_path(p: &Path) -> PathBuf {
    if let Ok(full) = p.canonicalize() {
        return full;
    }
    // Not there yet, so resolve the directory it would go in
    let parent = match p.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    match (parent.canonicalize(), p.file_name()) {
        (Ok(dir), Some(name)) => dir.join(name),
        _ => p.to_path_buf(),
    }
}
