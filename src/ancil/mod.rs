//! Reading and writing UM ancillary files.
//!
//! This covers the part of the UM file format (UMDP F3) needed to take an
//! existing ancillary file, swap out some of its field data, and write it
//! back out: the fixed length header, the header components, the lookup
//! table and unpacked or 32-bit packed field data. Fields that are not
//! modified are copied byte-for-byte, so their packing does not matter.
use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use itertools::Itertools;

pub mod byte_io;
pub mod constants;
mod field;
mod header;

pub use byte_io::ByteOrder;
pub use field::{DataKind, DiskLocation, Field, FieldData, Lookup, Packing};
pub use header::{Component, ComponentKind, FixedLengthHeader};

use constants::{
    fixed_header as fh, integer_constants as ic, lookup as lk, ANCIL_GRID_STAGGERINGS,
    DATASET_TYPE_ANCIL, FIXED_HEADER_LEN, IMDI, LBREL_EMPTY, LOOKUP_LEN, VALID_LBRELS, WORD_BYTES,
};

pub type AncilResult<T> = Result<T, AncilError>;

#[derive(Debug, thiserror::Error)]
pub enum AncilError {
    #[error("Error reading or writing ancillary file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lookup entries must be {LOOKUP_LEN} words long, header says {0}")]
    BadLookupLength(i64),
    #[error("Field has no valid grid (lbrow = {lbrow}, lbnpt = {lbnpt})")]
    NoGrid { lbrow: i64, lbnpt: i64 },
    #[error("Packing code lbpack = {0} is not supported")]
    UnsupportedPacking(i64),
    #[error("Field data is too short: expected at least {expected} bytes, got {actual}")]
    ShortData { expected: usize, actual: usize },
    #[error("Data of shape {actual:?} does not match the field grid {expected:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: Vec<usize>,
    },
    #[error("Ancillary file failed validation: {0}")]
    Validation(String),
    #[error("Refusing to write to {}, unmodified fields still read their data from it", .0.display())]
    OverwritesSource(PathBuf),
}

/// Options controlling how an [`AncilFile`] is written.
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Run [`AncilFile::validate`] before writing anything
    pub validate: bool,
    /// Each field's data starts on a multiple of this many words. The data
    /// section as a whole starts on one as well.
    pub words_per_sector: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            validate: true,
            words_per_sector: 1,
        }
    }
}

/// An ancillary file: headers plus an ordered list of fields.
#[derive(Debug, Clone)]
pub struct AncilFile {
    pub fixed_header: FixedLengthHeader,
    components: Vec<Option<Component>>,
    pub fields: Vec<Field>,
    byte_order: ByteOrder,
}

impl AncilFile {
    /// Create an ancillary file with no components and no fields
    pub fn new(fixed_header: FixedLengthHeader, byte_order: ByteOrder) -> Self {
        Self {
            fixed_header,
            components: vec![None; ComponentKind::ALL.len()],
            fields: vec![],
            byte_order,
        }
    }

    /// Read an ancillary file's headers and lookup table.
    ///
    /// Field data is not read here; each field remembers where its data is
    /// and reads it on demand. Unused lookup entries (`lbrel = -99`) are
    /// dropped.
    pub fn from_file(path: &Path) -> AncilResult<Self> {
        let source = Arc::new(path.to_path_buf());
        let mut rdr = BufReader::new(File::open(path)?);

        let mut first_word = [0; WORD_BYTES];
        rdr.read_exact(&mut first_word)?;
        let byte_order = ByteOrder::detect(first_word);
        let mut header_words = vec![byte_order.i64_from(first_word)];
        header_words.extend(byte_order.read_words(&mut rdr, FIXED_HEADER_LEN - 1)?);
        let fixed_header = FixedLengthHeader::from_words(header_words)
            .expect("fixed length header should have been read with the correct number of words");
        log::debug!(
            "Read fixed length header of {} (byte order {byte_order:?}, dataset type {})",
            path.display(),
            fixed_header.dataset_type()
        );

        let mut components = Vec::with_capacity(ComponentKind::ALL.len());
        for kind in ComponentKind::ALL {
            let comp = if let Some((start, dims)) = kind.extent(&fixed_header) {
                rdr.seek(SeekFrom::Start((start - 1) * WORD_BYTES as u64))?;
                let n = dims.iter().product();
                let words = byte_order.read_words(&mut rdr, n)?;
                log::trace!("Read {kind:?} with dimensions {dims:?}");
                Component::from_ints(dims, words)
            } else {
                None
            };
            components.push(comp);
        }

        let mut me = Self {
            fixed_header,
            components,
            fields: vec![],
            byte_order,
        };
        me.fields = me.read_lookup(&mut rdr, &source)?;
        log::debug!("Read {} fields from {}", me.fields.len(), path.display());
        Ok(me)
    }

    fn read_lookup<R: Read + Seek>(
        &self,
        rdr: &mut R,
        source: &Arc<PathBuf>,
    ) -> AncilResult<Vec<Field>> {
        let start = self.fixed_header.lookup_start();
        let nentries = self.fixed_header.lookup_dim2();
        if start <= 0 || nentries <= 0 {
            return Ok(vec![]);
        }

        let entry_len = self.fixed_header.lookup_dim1();
        if entry_len != LOOKUP_LEN as i64 {
            return Err(AncilError::BadLookupLength(entry_len));
        }

        rdr.seek(SeekFrom::Start((start as u64 - 1) * WORD_BYTES as u64))?;
        let words = self.byte_order.read_words(rdr, LOOKUP_LEN * nentries as usize)?;
        let data_offset = self.fixed_header.data_start().max(1) - 1;

        let mut fields = vec![];
        for (ientry, entry) in words.chunks_exact(LOOKUP_LEN).enumerate() {
            let lookup = Lookup::from_words(entry)
                .expect("lookup chunks should be exactly one lookup entry long");
            if lookup.lbrel() == LBREL_EMPTY {
                log::trace!("Lookup entry {ientry} is unused, skipping");
                continue;
            }

            // Older files may leave lbegin unset, in which case lbuser2 gives
            // the 1-based address relative to the start of the data section.
            let start_word = if lookup.lbegin() > 0 {
                lookup.lbegin()
            } else {
                data_offset + lookup.lbuser2() - 1
            };
            let nwords = if lookup.lbnrec() > 0 && lookup.lblrec() <= 0 {
                lookup.lbnrec()
            } else {
                lookup.lblrec()
            };

            let location = DiskLocation {
                source: Arc::clone(source),
                byte_order: self.byte_order,
                start_word: start_word.max(0) as u64,
                nwords: nwords.max(0) as usize,
            };
            fields.push(Field::new(lookup, FieldData::OnDisk(location)));
        }
        Ok(fields)
    }

    /// Make a structural copy of this file.
    ///
    /// The headers and components are always copied. If `include_fields` is
    /// `true`, the fields are copied as well, in the same order and with the
    /// same data sources; otherwise the copy has no fields.
    pub fn copy(&self, include_fields: bool) -> Self {
        Self {
            fixed_header: self.fixed_header.clone(),
            components: self.components.clone(),
            fields: if include_fields { self.fields.clone() } else { vec![] },
            byte_order: self.byte_order,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components[component_slot(kind)].as_ref()
    }

    pub fn set_component(&mut self, kind: ComponentKind, component: Option<Component>) {
        self.components[component_slot(kind)] = component;
    }

    pub fn integer_constants(&self) -> Option<&[i64]> {
        self.component(ComponentKind::IntegerConstants).map(|c| c.words())
    }

    pub fn real_constants(&self) -> Option<Vec<f64>> {
        self.component(ComponentKind::RealConstants).map(|c| c.as_reals())
    }

    /// The (rows, columns) of the model grid from the integer constants, if
    /// both are given and positive.
    pub fn grid_shape(&self) -> Option<(usize, usize)> {
        let consts = self.integer_constants()?;
        let rows = *consts.get(ic::NUM_ROWS)?;
        let cols = *consts.get(ic::NUM_COLS)?;
        if rows > 0 && cols > 0 {
            Some((rows as usize, cols as usize))
        } else {
            None
        }
    }

    /// Check that this is a consistent ancillary file.
    ///
    /// The checks are: the dataset type is "ancillary", the grid staggering
    /// is one the UM accepts for ancillaries, the integer and real constants
    /// are present and long enough, every field has a valid header release,
    /// and every field's grid matches the integer constants.
    pub fn validate(&self) -> AncilResult<()> {
        let dataset_type = self.fixed_header.dataset_type();
        if dataset_type != DATASET_TYPE_ANCIL {
            return Err(AncilError::Validation(format!(
                "dataset type is {dataset_type}, expected {DATASET_TYPE_ANCIL}"
            )));
        }

        let staggering = self.fixed_header.grid_staggering();
        if !ANCIL_GRID_STAGGERINGS.contains(&staggering) {
            return Err(AncilError::Validation(format!(
                "grid staggering is {staggering}, expected one of {}",
                ANCIL_GRID_STAGGERINGS.iter().join(", ")
            )));
        }

        match self.component(ComponentKind::IntegerConstants) {
            Some(c) if c.len() >= ic::MIN_LEN => (),
            Some(c) => {
                return Err(AncilError::Validation(format!(
                    "integer constants have {} words, need at least {}",
                    c.len(),
                    ic::MIN_LEN
                )))
            }
            None => return Err(AncilError::Validation("integer constants are missing".to_string())),
        }

        match self.component(ComponentKind::RealConstants) {
            Some(c) if c.len() >= constants::real_constants::MIN_LEN => (),
            Some(c) => {
                return Err(AncilError::Validation(format!(
                    "real constants have {} words, need at least {}",
                    c.len(),
                    constants::real_constants::MIN_LEN
                )))
            }
            None => return Err(AncilError::Validation("real constants are missing".to_string())),
        }

        let grid = self.grid_shape();
        for (ifield, field) in self.fields.iter().enumerate() {
            let lbrel = field.lookup.lbrel();
            if !VALID_LBRELS.contains(&lbrel) {
                return Err(AncilError::Validation(format!(
                    "field {ifield} has lbrel = {lbrel}, expected one of {}",
                    VALID_LBRELS.iter().join(", ")
                )));
            }

            if let (Some(file_grid), Some(field_grid)) = (grid, field.lookup.grid_shape()) {
                if file_grid != field_grid {
                    return Err(AncilError::Validation(format!(
                        "field {ifield} has (lbrow, lbnpt) = {field_grid:?}, but the file grid is {file_grid:?}"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Write this file to `path` with the default [`WriteOptions`].
    pub fn to_file(&self, path: &Path) -> AncilResult<()> {
        self.to_file_with(path, &WriteOptions::default())
    }

    /// Write this file to `path`.
    ///
    /// The layout is: fixed length header, the present components in their
    /// standard order, the lookup table, then the field data. All start
    /// addresses in the fixed header and the data positions in each lookup
    /// (`lbegin`, `lbnrec`, `lblrec`, `lbuser2`) are recomputed; everything
    /// else is written as it is in memory. `self` is not modified.
    ///
    /// All field data is encoded before `path` is created, so a field that
    /// cannot be written leaves no partial file behind.
    pub fn to_file_with(&self, path: &Path, options: &WriteOptions) -> AncilResult<()> {
        if options.validate {
            self.validate()?;
        }
        self.check_not_a_source(path)?;

        let order = self.byte_order;
        let payloads = self
            .fields
            .iter()
            .map(|f| f.encode_payload(order))
            .collect::<AncilResult<Vec<_>>>()?;

        let mut header = self.fixed_header.clone();
        let mut lookups: Vec<Lookup> = self.fields.iter().map(|f| f.lookup.clone()).collect();
        let mut wtr = BufWriter::new(File::create(path)?);

        // Placeholder for the fixed header, rewritten at the end
        order.write_words(&mut wtr, &[IMDI; FIXED_HEADER_LEN])?;
        let mut pos = FIXED_HEADER_LEN;

        for (kind, comp) in ComponentKind::ALL.iter().zip(&self.components) {
            match comp {
                Some(c) => {
                    header.set(kind.start_index(), pos as i64 + 1);
                    for (&i, &d) in kind.dim_indices().iter().zip(c.dims()) {
                        header.set(i, d as i64);
                    }
                    order.write_words(&mut wtr, c.words())?;
                    pos += c.len();
                }
                None => header.set(kind.start_index(), IMDI),
            }
        }

        let lookup_pos = pos;
        header.set(fh::LOOKUP_START, lookup_pos as i64 + 1);
        header.set(fh::LOOKUP_DIM1, LOOKUP_LEN as i64);
        header.set(fh::LOOKUP_DIM2, lookups.len() as i64);
        order.write_words(&mut wtr, &vec![IMDI; LOOKUP_LEN * lookups.len()])?;
        pos += LOOKUP_LEN * lookups.len();

        let data_pos = byte_io::sector_align(pos, options.words_per_sector);
        order.write_words(&mut wtr, &vec![0; data_pos - pos])?;
        pos = data_pos;
        header.set(fh::DATA_START, data_pos as i64 + 1);

        for (ifield, (payload, lookup)) in payloads.iter().zip(lookups.iter_mut()).enumerate() {
            let nwords = payload.len() / WORD_BYTES;
            let padded = byte_io::sector_align(nwords, options.words_per_sector);
            wtr.write_all(payload)?;
            order.write_words(&mut wtr, &vec![0; padded - nwords])?;

            lookup.set_int(lk::LBEGIN, pos as i64);
            lookup.set_int(lk::LBLREC, nwords as i64);
            lookup.set_int(lk::LBNREC, padded as i64);
            lookup.set_int(lk::LBUSER2, (pos - data_pos) as i64 + 1);
            log::trace!("Wrote field {ifield} ({nwords} words) at word {pos}");
            pos += padded;
        }
        header.set(fh::DATA_DIM1, (pos - data_pos) as i64);

        wtr.seek(SeekFrom::Start(0))?;
        order.write_words(&mut wtr, header.words())?;
        wtr.seek(SeekFrom::Start((lookup_pos * WORD_BYTES) as u64))?;
        for lookup in lookups.iter() {
            order.write_words(&mut wtr, &lookup.to_words())?;
        }
        wtr.flush()?;

        log::debug!("Wrote {} fields to {}", self.fields.len(), path.display());
        Ok(())
    }

    /// Error if writing to `path` would clobber data that one of our fields
    /// still needs to read.
    fn check_not_a_source(&self, path: &Path) -> AncilResult<()> {
        let target = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        for field in self.fields.iter() {
            if let FieldData::OnDisk(loc) = field.data() {
                let src = loc
                    .source()
                    .canonicalize()
                    .unwrap_or_else(|_| loc.source().to_path_buf());
                if src == target {
                    return Err(AncilError::OverwritesSource(path.to_path_buf()));
                }
            }
        }
        Ok(())
    }
}

fn component_slot(kind: ComponentKind) -> usize {
    ComponentKind::ALL
        .iter()
        .position(|&k| k == kind)
        .expect("every component kind should be listed in ComponentKind::ALL")
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    use super::*;
    use crate::test_utils::{synthetic_ancil, SyntheticAncil};

    #[fixture]
    fn scratch() -> TempDir {
        tempfile::tempdir().expect("should be able to create a temporary directory")
    }

    fn write_synthetic(dir: &TempDir, layout: &SyntheticAncil) -> PathBuf {
        let path = dir.path().join("veg_original");
        synthetic_ancil(layout)
            .to_file(&path)
            .expect("writing a synthetic ancillary should succeed");
        path
    }

    #[rstest]
    fn test_read_back_structure(scratch: TempDir) {
        let layout = SyntheticAncil::default();
        let path = write_synthetic(&scratch, &layout);
        let ancil = AncilFile::from_file(&path).unwrap();

        assert_eq!(ancil.byte_order(), ByteOrder::Big);
        assert_eq!(ancil.fixed_header.dataset_type(), DATASET_TYPE_ANCIL);
        assert_eq!(ancil.fixed_header.lookup_dim1(), LOOKUP_LEN as i64);
        assert_eq!(ancil.fields.len(), layout.nfields);
        assert_eq!(ancil.grid_shape(), Some((layout.rows, layout.cols)));
        let levels: Vec<i64> = ancil.fields.iter().map(|f| f.lookup.lblev()).collect();
        assert_eq!(levels, (1..=layout.nfields as i64).collect::<Vec<_>>());
        assert!(ancil.component(ComponentKind::LevelDependentConstants).is_some());
        assert!(ancil.component(ComponentKind::RowDependentConstants).is_none());
        ancil.validate().unwrap();
    }

    #[rstest]
    fn test_read_back_data(scratch: TempDir) {
        let layout = SyntheticAncil::default();
        let path = write_synthetic(&scratch, &layout);
        let ancil = AncilFile::from_file(&path).unwrap();
        for (i, field) in ancil.fields.iter().enumerate() {
            let data = field.get_data().unwrap();
            assert_eq!(data.dim(), (layout.rows, layout.cols));
            assert_abs_diff_eq!(data[[0, 0]], i as f64);
            assert_abs_diff_eq!(data[[layout.rows - 1, layout.cols - 1]], i as f64 + 0.5);
        }
    }

    #[rstest]
    fn test_copy(scratch: TempDir) {
        let path = write_synthetic(&scratch, &SyntheticAncil::default());
        let ancil = AncilFile::from_file(&path).unwrap();

        let with_fields = ancil.copy(true);
        assert_eq!(with_fields.fields.len(), ancil.fields.len());
        for (a, b) in ancil.fields.iter().zip(with_fields.fields.iter()) {
            assert_eq!(a.lookup, b.lookup);
        }

        let without_fields = ancil.copy(false);
        assert!(without_fields.fields.is_empty());
        assert_eq!(without_fields.fixed_header, ancil.fixed_header);
        assert_eq!(without_fields.integer_constants(), ancil.integer_constants());
    }

    #[rstest]
    fn test_rewrite_with_modified_field(scratch: TempDir) {
        let layout = SyntheticAncil::default();
        let path = write_synthetic(&scratch, &layout);
        let ancil = AncilFile::from_file(&path).unwrap();
        let mut modified = ancil.copy(true);
        modified.fields[1].set_data_array(Array2::from_elem((layout.rows, layout.cols), 42.0));

        let out = scratch.path().join("veg_modified");
        modified.to_file(&out).unwrap();
        let reread = AncilFile::from_file(&out).unwrap();

        assert_eq!(reread.fields.len(), ancil.fields.len());
        assert_eq!(
            reread.fields[1].get_data().unwrap(),
            Array2::from_elem((layout.rows, layout.cols), 42.0)
        );
        for i in [0, 2, 3] {
            assert_eq!(reread.fields[i].get_data().unwrap(), ancil.fields[i].get_data().unwrap());
        }
        for (a, b) in ancil.fields.iter().zip(reread.fields.iter()) {
            assert_eq!(a.lookup.stash_code(), b.lookup.stash_code());
            assert_eq!(a.lookup.lblev(), b.lookup.lblev());
        }
        // Both files have the same layout, so even the positions should agree
        assert_eq!(reread.fixed_header, ancil.fixed_header);
    }

    #[rstest]
    fn test_packed_and_sector_aligned(scratch: TempDir) {
        let layout = SyntheticAncil {
            lbpack: 2,
            ..Default::default()
        };
        let ancil = synthetic_ancil(&layout);
        let path = scratch.path().join("packed");
        let opts = WriteOptions {
            validate: true,
            words_per_sector: 16,
        };
        ancil.to_file_with(&path, &opts).unwrap();

        let reread = AncilFile::from_file(&path).unwrap();
        assert_eq!((reread.fixed_header.data_start() - 1) % 16, 0);
        let npts = layout.rows * layout.cols;
        for (i, field) in reread.fields.iter().enumerate() {
            assert_eq!(field.lookup.lbegin() % 16, 0);
            assert_eq!(field.lookup.lblrec(), npts.div_ceil(2) as i64);
            assert_eq!(field.lookup.lbnrec(), 16);
            assert_abs_diff_eq!(field.get_data().unwrap()[[0, 0]], i as f64);
        }
    }

    #[rstest]
    fn test_little_endian_roundtrip(scratch: TempDir) {
        let layout = SyntheticAncil {
            byte_order: ByteOrder::Little,
            ..Default::default()
        };
        let path = write_synthetic(&scratch, &layout);
        let ancil = AncilFile::from_file(&path).unwrap();
        assert_eq!(ancil.byte_order(), ByteOrder::Little);
        assert_eq!(ancil.fields.len(), layout.nfields);
        assert_abs_diff_eq!(ancil.fields[3].get_data().unwrap()[[0, 0]], 3.0);
    }

    #[rstest]
    fn test_empty_lookups_skipped(scratch: TempDir) {
        let path = write_synthetic(&scratch, &SyntheticAncil::default());
        let lookup_start = AncilFile::from_file(&path)
            .unwrap()
            .fixed_header
            .lookup_start() as usize;

        // Mark the third lookup entry as unused directly in the file
        let mut bytes = std::fs::read(&path).unwrap();
        let iword = lookup_start - 1 + 2 * LOOKUP_LEN + lk::LBREL;
        bytes[iword * WORD_BYTES..(iword + 1) * WORD_BYTES]
            .copy_from_slice(&LBREL_EMPTY.to_be_bytes());
        std::fs::write(&path, bytes).unwrap();

        let ancil = AncilFile::from_file(&path).unwrap();
        let levels: Vec<i64> = ancil.fields.iter().map(|f| f.lookup.lblev()).collect();
        assert_eq!(levels, vec![1, 2, 4]);
        assert_abs_diff_eq!(ancil.fields[2].get_data().unwrap()[[0, 0]], 3.0);
    }

    #[rstest]
    fn test_refuse_to_overwrite_source(scratch: TempDir) {
        let path = write_synthetic(&scratch, &SyntheticAncil::default());
        let ancil = AncilFile::from_file(&path).unwrap();
        let err = ancil.to_file(&path).unwrap_err();
        assert!(matches!(err, AncilError::OverwritesSource(_)));
        // The source must be intact after the refusal
        assert_eq!(AncilFile::from_file(&path).unwrap().fields.len(), 4);
    }

    #[rstest]
    fn test_unwritable_field_leaves_no_file(scratch: TempDir) {
        let layout = SyntheticAncil::default();
        let mut ancil = synthetic_ancil(&layout);
        ancil.fields[3].set_data_array(Array2::zeros((layout.cols, layout.rows)));

        let out = scratch.path().join("veg_modified");
        let err = ancil.to_file(&out).unwrap_err();
        assert!(matches!(err, AncilError::ShapeMismatch { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_validation_failures() {
        let good = synthetic_ancil(&SyntheticAncil::default());
        good.validate().unwrap();

        let mut bad = good.clone();
        bad.fixed_header.set(fh::DATASET_TYPE, 3);
        assert!(matches!(bad.validate(), Err(AncilError::Validation(_))));

        let mut bad = good.clone();
        bad.fixed_header.set(fh::GRID_STAGGERING, 1);
        assert!(matches!(bad.validate(), Err(AncilError::Validation(_))));

        let mut bad = good.clone();
        bad.set_component(ComponentKind::RealConstants, None);
        assert!(matches!(bad.validate(), Err(AncilError::Validation(_))));

        let mut bad = good.clone();
        bad.fields[2].lookup.set_int(lk::LBREL, 1);
        assert!(matches!(bad.validate(), Err(AncilError::Validation(_))));

        let mut bad = good.clone();
        bad.fields[0].lookup.set_int(lk::LBNPT, 99);
        assert!(matches!(bad.validate(), Err(AncilError::Validation(_))));
    }
}
