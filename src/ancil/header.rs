use super::constants::{fixed_header as fh, FIXED_HEADER_LEN, IMDI};

/// The 256 word fixed length header at the start of every UM file.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedLengthHeader {
    words: Vec<i64>,
}

impl FixedLengthHeader {
    /// A header with every word set to the integer missing data indicator.
    pub fn empty() -> Self {
        Self {
            words: vec![IMDI; FIXED_HEADER_LEN],
        }
    }

    /// Create a header from its raw words. Returns `None` if `words` is
    /// not exactly [`FIXED_HEADER_LEN`] long.
    pub fn from_words(words: Vec<i64>) -> Option<Self> {
        if words.len() == FIXED_HEADER_LEN {
            Some(Self { words })
        } else {
            None
        }
    }

    pub fn words(&self) -> &[i64] {
        &self.words
    }

    /// Get a word by its 0-based index (see [`super::constants::fixed_header`]).
    ///
    /// # Panics
    /// If `index` is not less than [`FIXED_HEADER_LEN`].
    pub fn get(&self, index: usize) -> i64 {
        self.words[index]
    }

    /// Set a word by its 0-based index.
    ///
    /// # Panics
    /// If `index` is not less than [`FIXED_HEADER_LEN`].
    pub fn set(&mut self, index: usize, value: i64) {
        self.words[index] = value;
    }

    pub fn data_set_format_version(&self) -> i64 {
        self.get(fh::DATA_SET_FORMAT_VERSION)
    }

    pub fn dataset_type(&self) -> i64 {
        self.get(fh::DATASET_TYPE)
    }

    pub fn grid_staggering(&self) -> i64 {
        self.get(fh::GRID_STAGGERING)
    }

    pub fn horiz_grid_type(&self) -> i64 {
        self.get(fh::HORIZ_GRID_TYPE)
    }

    pub fn model_version(&self) -> i64 {
        self.get(fh::MODEL_VERSION)
    }

    pub fn lookup_start(&self) -> i64 {
        self.get(fh::LOOKUP_START)
    }

    pub fn lookup_dim1(&self) -> i64 {
        self.get(fh::LOOKUP_DIM1)
    }

    pub fn lookup_dim2(&self) -> i64 {
        self.get(fh::LOOKUP_DIM2)
    }

    pub fn data_start(&self) -> i64 {
        self.get(fh::DATA_START)
    }

    pub fn data_dim1(&self) -> i64 {
        self.get(fh::DATA_DIM1)
    }
}

/// Which of the header components a [`Component`] is. The order of
/// [`ComponentKind::ALL`] is the order they are laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    IntegerConstants,
    RealConstants,
    LevelDependentConstants,
    RowDependentConstants,
    ColumnDependentConstants,
    FieldsOfConstants,
    ExtraConstants,
    TempHistoryFile,
    CompressedFieldIndex1,
    CompressedFieldIndex2,
    CompressedFieldIndex3,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 11] = [
        Self::IntegerConstants,
        Self::RealConstants,
        Self::LevelDependentConstants,
        Self::RowDependentConstants,
        Self::ColumnDependentConstants,
        Self::FieldsOfConstants,
        Self::ExtraConstants,
        Self::TempHistoryFile,
        Self::CompressedFieldIndex1,
        Self::CompressedFieldIndex2,
        Self::CompressedFieldIndex3,
    ];

    /// Index of the fixed header word holding this component's start address
    pub(crate) fn start_index(&self) -> usize {
        match self {
            Self::IntegerConstants => fh::INT_CONST_START,
            Self::RealConstants => fh::REAL_CONST_START,
            Self::LevelDependentConstants => fh::LEVEL_DEP_CONST_START,
            Self::RowDependentConstants => fh::ROW_DEP_CONST_START,
            Self::ColumnDependentConstants => fh::COL_DEP_CONST_START,
            Self::FieldsOfConstants => fh::FIELDS_OF_CONST_START,
            Self::ExtraConstants => fh::EXTRA_CONST_START,
            Self::TempHistoryFile => fh::TEMP_HISTFILE_START,
            Self::CompressedFieldIndex1 => fh::COMP_FIELD_INDEX1_START,
            Self::CompressedFieldIndex2 => fh::COMP_FIELD_INDEX2_START,
            Self::CompressedFieldIndex3 => fh::COMP_FIELD_INDEX3_START,
        }
    }

    /// Indices of the fixed header words holding this component's dimensions
    pub(crate) fn dim_indices(&self) -> &'static [usize] {
        match self {
            Self::IntegerConstants => &[fh::INT_CONST_DIM1],
            Self::RealConstants => &[fh::REAL_CONST_DIM1],
            Self::LevelDependentConstants => &[fh::LEVEL_DEP_CONST_DIM1, fh::LEVEL_DEP_CONST_DIM2],
            Self::RowDependentConstants => &[fh::ROW_DEP_CONST_DIM1, fh::ROW_DEP_CONST_DIM2],
            Self::ColumnDependentConstants => &[fh::COL_DEP_CONST_DIM1, fh::COL_DEP_CONST_DIM2],
            Self::FieldsOfConstants => &[fh::FIELDS_OF_CONST_DIM1, fh::FIELDS_OF_CONST_DIM2],
            Self::ExtraConstants => &[fh::EXTRA_CONST_DIM1],
            Self::TempHistoryFile => &[fh::TEMP_HISTFILE_DIM1],
            Self::CompressedFieldIndex1 => &[fh::COMP_FIELD_INDEX1_DIM1],
            Self::CompressedFieldIndex2 => &[fh::COMP_FIELD_INDEX2_DIM1],
            Self::CompressedFieldIndex3 => &[fh::COMP_FIELD_INDEX3_DIM1],
        }
    }

    /// Where this component lives according to `header`: its 1-based start
    /// address and its dimensions. `None` means the component is absent,
    /// i.e. the start or any dimension is not positive.
    pub(crate) fn extent(&self, header: &FixedLengthHeader) -> Option<(u64, Vec<usize>)> {
        let start = header.get(self.start_index());
        if start <= 0 {
            return None;
        }

        let mut dims = Vec::with_capacity(self.dim_indices().len());
        for &i in self.dim_indices() {
            let d = header.get(i);
            if d <= 0 {
                return None;
            }
            dims.push(d as usize);
        }
        Some((start as u64, dims))
    }
}

/// One header component. Words are stored as raw `i64`s whether the
/// component is integer or real, so that writing it back is lossless.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    dims: Vec<usize>,
    words: Vec<i64>,
}

impl Component {
    /// Create an integer-valued component. Returns `None` if the number
    /// of values does not match the product of `dims`.
    pub fn from_ints(dims: Vec<usize>, values: Vec<i64>) -> Option<Self> {
        if dims.iter().product::<usize>() != values.len() {
            return None;
        }
        Some(Self { dims, words: values })
    }

    /// Create a real-valued component. Returns `None` if the number
    /// of values does not match the product of `dims`.
    pub fn from_reals(dims: Vec<usize>, values: &[f64]) -> Option<Self> {
        let words = values.iter().map(|v| v.to_bits() as i64).collect();
        Self::from_ints(dims, words)
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn words(&self) -> &[i64] {
        &self.words
    }

    pub fn as_reals(&self) -> Vec<f64> {
        self.words.iter().map(|&w| f64::from_bits(w as u64)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_extent() {
        let mut header = FixedLengthHeader::empty();
        assert!(ComponentKind::IntegerConstants.extent(&header).is_none());

        header.set(fh::INT_CONST_START, 257);
        header.set(fh::INT_CONST_DIM1, 46);
        assert_eq!(
            ComponentKind::IntegerConstants.extent(&header),
            Some((257, vec![46]))
        );

        // A 2D component with only one good dimension is absent
        header.set(fh::LEVEL_DEP_CONST_START, 400);
        header.set(fh::LEVEL_DEP_CONST_DIM1, 71);
        assert!(ComponentKind::LevelDependentConstants.extent(&header).is_none());
        header.set(fh::LEVEL_DEP_CONST_DIM2, 8);
        assert_eq!(
            ComponentKind::LevelDependentConstants.extent(&header),
            Some((400, vec![71, 8]))
        );
    }

    #[test]
    fn test_component_size_check() {
        assert!(Component::from_ints(vec![2, 3], vec![0; 6]).is_some());
        assert!(Component::from_ints(vec![2, 3], vec![0; 5]).is_none());
        let c = Component::from_reals(vec![2], &[1.5, -0.25]).unwrap();
        assert_eq!(c.as_reals(), vec![1.5, -0.25]);
    }
}
