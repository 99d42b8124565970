use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

use ndarray::Array2;

use super::{
    byte_io::ByteOrder,
    constants::{lookup as lk, LOOKUP_INT_LEN, LOOKUP_LEN, LOOKUP_REAL_LEN, RMDI, WORD_BYTES},
    AncilError, AncilResult,
};

/// The 64 word header describing one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    ints: [i64; LOOKUP_INT_LEN],
    reals: [f64; LOOKUP_REAL_LEN],
}

impl Default for Lookup {
    /// A lookup with all integers set to -99 and all reals to 0, except
    /// `bmdi` which is set to [`RMDI`].
    fn default() -> Self {
        let mut reals = [0.0; LOOKUP_REAL_LEN];
        reals[lk::BMDI] = RMDI;
        Self {
            ints: [-99; LOOKUP_INT_LEN],
            reals,
        }
    }
}

impl Lookup {
    /// Build a lookup from its raw words, e.g. as read from a file.
    /// Returns `None` if `words` is not [`LOOKUP_LEN`] long.
    pub fn from_words(words: &[i64]) -> Option<Self> {
        if words.len() != LOOKUP_LEN {
            return None;
        }
        let mut ints = [0; LOOKUP_INT_LEN];
        ints.copy_from_slice(&words[..LOOKUP_INT_LEN]);
        let mut reals = [0.0; LOOKUP_REAL_LEN];
        for (r, &w) in reals.iter_mut().zip(&words[LOOKUP_INT_LEN..]) {
            *r = f64::from_bits(w as u64);
        }
        Some(Self { ints, reals })
    }

    pub fn to_words(&self) -> Vec<i64> {
        self.ints
            .iter()
            .copied()
            .chain(self.reals.iter().map(|r| r.to_bits() as i64))
            .collect()
    }

    /// Get an integer word by its offset (see [`super::constants::lookup`])
    pub fn int(&self, index: usize) -> i64 {
        self.ints[index]
    }

    pub fn set_int(&mut self, index: usize, value: i64) {
        self.ints[index] = value;
    }

    /// Get a real word by its offset into the real section
    pub fn real(&self, index: usize) -> f64 {
        self.reals[index]
    }

    pub fn set_real(&mut self, index: usize, value: f64) {
        self.reals[index] = value;
    }

    pub fn lbrow(&self) -> i64 {
        self.int(lk::LBROW)
    }

    pub fn lbnpt(&self) -> i64 {
        self.int(lk::LBNPT)
    }

    pub fn lbpack(&self) -> i64 {
        self.int(lk::LBPACK)
    }

    pub fn lbrel(&self) -> i64 {
        self.int(lk::LBREL)
    }

    pub fn lblev(&self) -> i64 {
        self.int(lk::LBLEV)
    }

    pub fn lbegin(&self) -> i64 {
        self.int(lk::LBEGIN)
    }

    pub fn lblrec(&self) -> i64 {
        self.int(lk::LBLREC)
    }

    pub fn lbnrec(&self) -> i64 {
        self.int(lk::LBNREC)
    }

    pub fn lbuser1(&self) -> i64 {
        self.int(lk::LBUSER1)
    }

    pub fn lbuser2(&self) -> i64 {
        self.int(lk::LBUSER2)
    }

    pub fn stash_code(&self) -> i64 {
        self.int(lk::LBUSER4)
    }

    pub fn bmdi(&self) -> f64 {
        self.real(lk::BMDI)
    }

    /// Number of rows and columns, if both are positive.
    pub fn grid_shape(&self) -> Option<(usize, usize)> {
        let (rows, cols) = (self.lbrow(), self.lbnpt());
        if rows > 0 && cols > 0 {
            Some((rows as usize, cols as usize))
        } else {
            None
        }
    }

    pub fn packing(&self) -> Packing {
        Packing::from_lbpack(self.lbpack())
    }

    pub fn data_kind(&self) -> DataKind {
        DataKind::from_lbuser1(self.lbuser1())
    }
}

/// How the field's values are stored on disk (the n1 and n2 digits of `lbpack`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// One 64-bit word per value
    Unpacked,
    /// Reals stored as 32-bit IEEE floats, two per word
    Cray32,
    /// Anything else (WGDOS, run length encoding, land/sea compression); the
    /// full `lbpack` value is kept
    Other(i64),
}

impl Packing {
    pub fn from_lbpack(lbpack: i64) -> Self {
        let n1 = lbpack.rem_euclid(10);
        let n2 = (lbpack / 10).rem_euclid(10);
        match (n1, n2) {
            (0, 0) => Self::Unpacked,
            (2, 0) => Self::Cray32,
            _ => Self::Other(lbpack),
        }
    }

    /// Whether values of type `kind` can be written from memory with this packing.
    pub fn can_encode(&self, kind: DataKind) -> bool {
        matches!((self, kind), (Self::Unpacked, _) | (Self::Cray32, DataKind::Real))
    }

    /// Number of 64-bit words needed to hold `npts` values.
    fn nwords(&self, npts: usize) -> AncilResult<usize> {
        match self {
            Self::Unpacked => Ok(npts),
            Self::Cray32 => Ok(npts.div_ceil(2)),
            Self::Other(lbpack) => Err(AncilError::UnsupportedPacking(*lbpack)),
        }
    }
}

/// The type of the values in a field (`lbuser1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    Real,
    Integer,
    Logical,
}

impl DataKind {
    pub fn from_lbuser1(lbuser1: i64) -> Self {
        match lbuser1 {
            2 => Self::Integer,
            3 => Self::Logical,
            _ => Self::Real,
        }
    }
}

/// Where a field's data comes from.
#[derive(Debug, Clone)]
pub enum FieldData {
    /// Data still sitting in a file on disk. It is only read when needed.
    OnDisk(DiskLocation),
    /// Data held in memory, shaped (rows, columns)
    Array(Array2<f64>),
}

/// Location of a field's raw data in its source file
#[derive(Debug, Clone)]
pub struct DiskLocation {
    pub(crate) source: Arc<PathBuf>,
    pub(crate) byte_order: ByteOrder,
    pub(crate) start_word: u64,
    pub(crate) nwords: usize,
}

impl DiskLocation {
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Read the raw bytes of the field data, exactly as stored.
    pub(crate) fn read_raw(&self) -> std::io::Result<Vec<u8>> {
        if self.nwords == 0 {
            return Ok(vec![]);
        }
        let mut f = File::open(self.source.as_path())?;
        f.seek(SeekFrom::Start(self.start_word * WORD_BYTES as u64))?;
        let mut buf = vec![0; self.nwords * WORD_BYTES];
        f.read_exact(&mut buf)?;
        Ok(buf)
    }
}

/// A single field: its lookup header plus where to get its data.
#[derive(Debug, Clone)]
pub struct Field {
    pub lookup: Lookup,
    data: FieldData,
}

impl Field {
    pub fn new(lookup: Lookup, data: FieldData) -> Self {
        Self { lookup, data }
    }

    pub fn data(&self) -> &FieldData {
        &self.data
    }

    /// `true` if the field's data has been replaced in memory.
    pub fn has_array_data(&self) -> bool {
        matches!(self.data, FieldData::Array(_))
    }

    /// Replace the data of this field with an in-memory array.
    ///
    /// The lookup is not changed, except that a packing code that cannot be
    /// written from memory for this field's data type is replaced with
    /// "unpacked". The array's shape is checked against the lookup when the
    /// file is written.
    pub fn set_data_array(&mut self, data: Array2<f64>) {
        if !self.lookup.packing().can_encode(self.lookup.data_kind()) {
            let lbpack = self.lookup.lbpack();
            let unpacked = lbpack - lbpack.rem_euclid(100);
            log::warn!(
                "Field with STASH code {} has lbpack = {lbpack}, which cannot be written; it will be stored with lbpack = {unpacked}",
                self.lookup.stash_code()
            );
            self.lookup.set_int(lk::LBPACK, unpacked);
        }
        self.data = FieldData::Array(data);
    }

    /// Get this field's values as a (rows, columns) array.
    ///
    /// Data on disk is decoded according to the lookup's packing and data
    /// type. Integer and logical fields are converted to `f64`.
    pub fn get_data(&self) -> AncilResult<Array2<f64>> {
        match &self.data {
            FieldData::Array(arr) => Ok(arr.clone()),
            FieldData::OnDisk(loc) => {
                let (rows, cols) = self.lookup.grid_shape().ok_or(AncilError::NoGrid {
                    lbrow: self.lookup.lbrow(),
                    lbnpt: self.lookup.lbnpt(),
                })?;
                let raw = loc.read_raw()?;
                let values = decode_values(
                    &raw,
                    loc.byte_order,
                    self.lookup.packing(),
                    self.lookup.data_kind(),
                    rows * cols,
                )?;
                Array2::from_shape_vec((rows, cols), values).map_err(|_| {
                    AncilError::ShapeMismatch {
                        expected: (rows, cols),
                        actual: vec![rows * cols],
                    }
                })
            }
        }
    }

    /// Produce the bytes to write for this field in a new file.
    ///
    /// Data still on disk is copied verbatim (so packings this crate cannot
    /// decode survive untouched). Data in memory is encoded with the lookup's
    /// packing and must match the lookup's grid. The returned buffer is always
    /// a whole number of words.
    pub(crate) fn encode_payload(&self, byte_order: ByteOrder) -> AncilResult<Vec<u8>> {
        match &self.data {
            FieldData::OnDisk(loc) if loc.byte_order == byte_order => Ok(loc.read_raw()?),
            FieldData::OnDisk(_) => {
                let arr = self.get_data()?;
                self.encode_array(&arr, byte_order)
            }
            FieldData::Array(arr) => self.encode_array(arr, byte_order),
        }
    }

    fn encode_array(&self, arr: &Array2<f64>, byte_order: ByteOrder) -> AncilResult<Vec<u8>> {
        let expected = self.lookup.grid_shape().ok_or(AncilError::NoGrid {
            lbrow: self.lookup.lbrow(),
            lbnpt: self.lookup.lbnpt(),
        })?;
        if arr.dim() != expected {
            return Err(AncilError::ShapeMismatch {
                expected,
                actual: arr.shape().to_vec(),
            });
        }

        let packing = self.lookup.packing();
        let kind = self.lookup.data_kind();
        let nwords = packing.nwords(arr.len())?;
        let mut buf = Vec::with_capacity(nwords * WORD_BYTES);
        match (packing, kind) {
            (Packing::Unpacked, DataKind::Real) => {
                arr.iter().for_each(|&v| buf.extend(byte_order.f64_bytes(v)));
            }
            (Packing::Unpacked, _) => {
                arr.iter().for_each(|&v| buf.extend(byte_order.i64_bytes(v.round() as i64)));
            }
            (Packing::Cray32, DataKind::Real) => {
                arr.iter().for_each(|&v| buf.extend(byte_order.f32_bytes(v as f32)));
            }
            (Packing::Cray32, _) | (Packing::Other(_), _) => {
                return Err(AncilError::UnsupportedPacking(self.lookup.lbpack()));
            }
        }
        buf.resize(nwords * WORD_BYTES, 0);
        Ok(buf)
    }
}

fn decode_values(
    raw: &[u8],
    byte_order: ByteOrder,
    packing: Packing,
    kind: DataKind,
    npts: usize,
) -> AncilResult<Vec<f64>> {
    match (packing, kind) {
        (Packing::Unpacked, _) => {
            check_length(raw, npts * WORD_BYTES)?;
            let words = byte_order.words_from_bytes(&raw[..npts * WORD_BYTES]);
            let values = match kind {
                DataKind::Real => words.into_iter().map(|w| f64::from_bits(w as u64)).collect(),
                DataKind::Integer | DataKind::Logical => {
                    words.into_iter().map(|w| w as f64).collect()
                }
            };
            Ok(values)
        }
        (Packing::Cray32, DataKind::Real) => {
            check_length(raw, npts * 4)?;
            let values = raw[..npts * 4]
                .chunks_exact(4)
                .map(|chunk| {
                    let mut b = [0; 4];
                    b.copy_from_slice(chunk);
                    byte_order.f32_from(b) as f64
                })
                .collect();
            Ok(values)
        }
        (Packing::Cray32, _) => Err(AncilError::UnsupportedPacking(2)),
        (Packing::Other(lbpack), _) => Err(AncilError::UnsupportedPacking(lbpack)),
    }
}

fn check_length(raw: &[u8], expected: usize) -> AncilResult<()> {
    if raw.len() < expected {
        Err(AncilError::ShortData {
            expected,
            actual: raw.len(),
        })
    } else {
        Ok(())
    }
}
