//! Word offsets and special values from the UM file format (UMDP F3).
//!
//! All indices here are 0-based offsets into the relevant word array,
//! i.e. one less than the 1-based positions given in the documentation.

/// Integer missing data indicator
pub const IMDI: i64 = -32768;

/// Real missing data indicator
pub const RMDI: f64 = -1073741824.0;

/// Number of bytes in one UM word
pub const WORD_BYTES: usize = 8;

/// Number of words in the fixed length header
pub const FIXED_HEADER_LEN: usize = 256;

/// Number of words in one lookup entry
pub const LOOKUP_LEN: usize = 64;

/// Number of integer words at the start of a lookup entry; the rest are reals.
pub const LOOKUP_INT_LEN: usize = 45;

/// Number of real words at the end of a lookup entry
pub const LOOKUP_REAL_LEN: usize = LOOKUP_LEN - LOOKUP_INT_LEN;

/// Value of `lbrel` marking an unused lookup entry
pub const LBREL_EMPTY: i64 = -99;

/// Dataset type code for ancillary files
pub const DATASET_TYPE_ANCIL: i64 = 4;

/// Grid staggerings allowed in ancillary files (New Dynamics and ENDGame)
pub const ANCIL_GRID_STAGGERINGS: [i64; 2] = [3, 6];

/// Header releases that ancillary lookups may use
pub const VALID_LBRELS: [i64; 2] = [2, 3];

pub mod fixed_header {
    pub const DATA_SET_FORMAT_VERSION: usize = 0;
    pub const SUB_MODEL: usize = 1;
    pub const VERT_COORD_TYPE: usize = 2;
    pub const HORIZ_GRID_TYPE: usize = 3;
    pub const DATASET_TYPE: usize = 4;
    pub const RUN_IDENTIFIER: usize = 5;
    pub const EXPERIMENT_NUMBER: usize = 6;
    pub const CALENDAR: usize = 7;
    pub const GRID_STAGGERING: usize = 8;
    pub const ANCIL_DATA_TYPE: usize = 9;
    pub const MODEL_VERSION: usize = 11;

    pub const INT_CONST_START: usize = 99;
    pub const INT_CONST_DIM1: usize = 100;
    pub const REAL_CONST_START: usize = 104;
    pub const REAL_CONST_DIM1: usize = 105;
    pub const LEVEL_DEP_CONST_START: usize = 109;
    pub const LEVEL_DEP_CONST_DIM1: usize = 110;
    pub const LEVEL_DEP_CONST_DIM2: usize = 111;
    pub const ROW_DEP_CONST_START: usize = 114;
    pub const ROW_DEP_CONST_DIM1: usize = 115;
    pub const ROW_DEP_CONST_DIM2: usize = 116;
    pub const COL_DEP_CONST_START: usize = 119;
    pub const COL_DEP_CONST_DIM1: usize = 120;
    pub const COL_DEP_CONST_DIM2: usize = 121;
    pub const FIELDS_OF_CONST_START: usize = 124;
    pub const FIELDS_OF_CONST_DIM1: usize = 125;
    pub const FIELDS_OF_CONST_DIM2: usize = 126;
    pub const EXTRA_CONST_START: usize = 129;
    pub const EXTRA_CONST_DIM1: usize = 130;
    pub const TEMP_HISTFILE_START: usize = 134;
    pub const TEMP_HISTFILE_DIM1: usize = 135;
    pub const COMP_FIELD_INDEX1_START: usize = 139;
    pub const COMP_FIELD_INDEX1_DIM1: usize = 140;
    pub const COMP_FIELD_INDEX2_START: usize = 141;
    pub const COMP_FIELD_INDEX2_DIM1: usize = 142;
    pub const COMP_FIELD_INDEX3_START: usize = 143;
    pub const COMP_FIELD_INDEX3_DIM1: usize = 144;

    pub const LOOKUP_START: usize = 149;
    pub const LOOKUP_DIM1: usize = 150;
    pub const LOOKUP_DIM2: usize = 151;
    pub const TOTAL_PROG_FIELDS: usize = 152;

    pub const DATA_START: usize = 159;
    pub const DATA_DIM1: usize = 160;
}

/// Offsets into the integer constants component
pub mod integer_constants {
    pub const NUM_TIMES: usize = 2;
    pub const NUM_COLS: usize = 5;
    pub const NUM_ROWS: usize = 6;
    pub const NUM_LEVELS: usize = 7;
    pub const NUM_FIELD_TYPES: usize = 8;

    /// Fewest words an ancillary integer constants component may have
    pub const MIN_LEN: usize = 7;
}

/// Offsets into the real constants component
pub mod real_constants {
    pub const COL_SPACING: usize = 0;
    pub const ROW_SPACING: usize = 1;
    pub const START_LAT: usize = 2;
    pub const START_LON: usize = 3;
    pub const NORTH_POLE_LAT: usize = 4;
    pub const NORTH_POLE_LON: usize = 5;

    /// Fewest words an ancillary real constants component may have
    pub const MIN_LEN: usize = 6;
}

/// Offsets into a lookup entry. Integers are 0..45 of the entry, reals are
/// given relative to the start of the real section (so `BMDI` is word 62
/// of the full entry).
pub mod lookup {
    pub const LBYR: usize = 0;
    pub const LBMON: usize = 1;
    pub const LBDAT: usize = 2;
    pub const LBHR: usize = 3;
    pub const LBMIN: usize = 4;
    pub const LBSEC: usize = 5;
    pub const LBTIM: usize = 12;
    pub const LBFT: usize = 13;
    pub const LBLREC: usize = 14;
    pub const LBCODE: usize = 15;
    pub const LBHEM: usize = 16;
    pub const LBROW: usize = 17;
    pub const LBNPT: usize = 18;
    pub const LBEXT: usize = 19;
    pub const LBPACK: usize = 20;
    pub const LBREL: usize = 21;
    pub const LBFC: usize = 22;
    pub const LBCFC: usize = 23;
    pub const LBPROC: usize = 24;
    pub const LBVC: usize = 25;
    pub const LBEXP: usize = 27;
    pub const LBEGIN: usize = 28;
    pub const LBNREC: usize = 29;
    pub const LBPROJ: usize = 30;
    pub const LBTYP: usize = 31;
    pub const LBLEV: usize = 32;
    pub const LBSRCE: usize = 37;
    pub const LBUSER1: usize = 38;
    pub const LBUSER2: usize = 39;
    pub const LBUSER3: usize = 40;
    pub const LBUSER4: usize = 41;
    pub const LBUSER5: usize = 42;
    pub const LBUSER7: usize = 44;

    pub const BLEV: usize = 6;
    pub const BPLAT: usize = 10;
    pub const BPLON: usize = 11;
    pub const BZY: usize = 13;
    pub const BDY: usize = 14;
    pub const BZX: usize = 15;
    pub const BDX: usize = 16;
    pub const BMDI: usize = 17;
    pub const BMKS: usize = 18;
}
