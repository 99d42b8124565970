use ndarray::Array2;

use crate::ancil::{
    constants::{fixed_header as fh, integer_constants as ic, lookup as lk, IMDI, RMDI},
    AncilFile, ByteOrder, Component, ComponentKind, Field, FieldData, FixedLengthHeader, Lookup,
};

/// STASH code for the fractions of surface types, the usual vegetation ancillary
pub(crate) const STASH_FRAC_SURF_TYPES: i64 = 216;

/// Description of a small, valid ancillary file for tests
#[derive(Debug, Clone)]
pub(crate) struct SyntheticAncil {
    pub(crate) nfields: usize,
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) lbpack: i64,
    pub(crate) byte_order: ByteOrder,
}

impl Default for SyntheticAncil {
    fn default() -> Self {
        Self {
            nfields: 4,
            rows: 3,
            cols: 4,
            lbpack: 0,
            byte_order: ByteOrder::Big,
        }
    }
}

/// Build an in-memory ancillary file from `layout`.
///
/// Field `i` has `lblev = i + 1` and is filled with the value `i`, except
/// for its last point which is `i + 0.5`.
pub(crate) fn synthetic_ancil(layout: &SyntheticAncil) -> AncilFile {
    let mut header = FixedLengthHeader::empty();
    header.set(fh::DATA_SET_FORMAT_VERSION, 20);
    header.set(fh::SUB_MODEL, 1);
    header.set(fh::VERT_COORD_TYPE, 1);
    header.set(fh::HORIZ_GRID_TYPE, 0);
    header.set(fh::DATASET_TYPE, 4);
    header.set(fh::CALENDAR, 1);
    header.set(fh::GRID_STAGGERING, 6);
    header.set(fh::MODEL_VERSION, 1300);

    let mut ancil = AncilFile::new(header, layout.byte_order);

    let mut int_consts = vec![IMDI; 15];
    int_consts[ic::NUM_TIMES] = 1;
    int_consts[ic::NUM_COLS] = layout.cols as i64;
    int_consts[ic::NUM_ROWS] = layout.rows as i64;
    int_consts[ic::NUM_LEVELS] = layout.nfields as i64;
    int_consts[ic::NUM_FIELD_TYPES] = 1;
    ancil.set_component(
        ComponentKind::IntegerConstants,
        Component::from_ints(vec![15], int_consts),
    );
    ancil.set_component(
        ComponentKind::RealConstants,
        Component::from_reals(vec![6], &[1.875, 1.25, -89.375, 0.0, 90.0, 0.0]),
    );
    let level_consts: Vec<f64> = (0..layout.nfields * 4).map(|i| i as f64).collect();
    ancil.set_component(
        ComponentKind::LevelDependentConstants,
        Component::from_reals(vec![layout.nfields, 4], &level_consts),
    );

    let npts = layout.rows * layout.cols;
    for i in 0..layout.nfields {
        let mut lookup = Lookup::default();
        lookup.set_int(lk::LBYR, 0);
        lookup.set_int(lk::LBMON, 1);
        lookup.set_int(lk::LBDAT, 1);
        lookup.set_int(lk::LBCODE, 1);
        lookup.set_int(lk::LBHEM, 0);
        lookup.set_int(lk::LBROW, layout.rows as i64);
        lookup.set_int(lk::LBNPT, layout.cols as i64);
        lookup.set_int(lk::LBEXT, 0);
        lookup.set_int(lk::LBPACK, layout.lbpack);
        lookup.set_int(lk::LBREL, 3);
        lookup.set_int(lk::LBLEV, i as i64 + 1);
        lookup.set_int(lk::LBUSER1, 1);
        lookup.set_int(lk::LBUSER4, STASH_FRAC_SURF_TYPES);
        lookup.set_int(lk::LBUSER7, 1);
        lookup.set_real(lk::BMDI, RMDI);
        lookup.set_real(lk::BMKS, 1.0);

        let data = Array2::from_shape_fn((layout.rows, layout.cols), |(r, c)| {
            if r * layout.cols + c == npts - 1 {
                i as f64 + 0.5
            } else {
                i as f64
            }
        });
        ancil.fields.push(Field::new(lookup, FieldData::Array(data)));
    }

    ancil
}
