use std::io::{Read, Write};

use super::constants::WORD_BYTES;

/// Byte order of the words in a UM file.
///
/// UM files are normally big endian, but little endian files turn up when
/// they have been produced by tools on x86 machines without byte swapping.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

impl ByteOrder {
    /// Guess the byte order from the first word of the fixed length header.
    ///
    /// That word is the data set format version, which is a small positive
    /// number (usually 15 or 20). If it only makes sense when read as little
    /// endian, the file is little endian; otherwise we assume big endian.
    pub fn detect(first_word: [u8; 8]) -> Self {
        let plausible = |v: i64| (1..10_000).contains(&v);
        if plausible(i64::from_be_bytes(first_word)) {
            Self::Big
        } else if plausible(i64::from_le_bytes(first_word)) {
            Self::Little
        } else {
            Self::Big
        }
    }

    pub(crate) fn i64_from(&self, bytes: [u8; 8]) -> i64 {
        match self {
            Self::Big => i64::from_be_bytes(bytes),
            Self::Little => i64::from_le_bytes(bytes),
        }
    }

    pub(crate) fn f32_from(&self, bytes: [u8; 4]) -> f32 {
        match self {
            Self::Big => f32::from_be_bytes(bytes),
            Self::Little => f32::from_le_bytes(bytes),
        }
    }

    pub(crate) fn i64_bytes(&self, value: i64) -> [u8; 8] {
        match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    pub(crate) fn f64_bytes(&self, value: f64) -> [u8; 8] {
        match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    pub(crate) fn f32_bytes(&self, value: f32) -> [u8; 4] {
        match self {
            Self::Big => value.to_be_bytes(),
            Self::Little => value.to_le_bytes(),
        }
    }

    /// Read `nwords` 8-byte words and interpret them as `i64`s.
    ///
    /// Real-valued words are kept as their bit pattern; use [`f64::from_bits`]
    /// to get the value back.
    pub(crate) fn read_words<R: Read>(
        &self,
        rdr: &mut R,
        nwords: usize,
    ) -> std::io::Result<Vec<i64>> {
        let mut buf = vec![0; nwords * WORD_BYTES];
        rdr.read_exact(&mut buf)?;
        Ok(self.words_from_bytes(&buf))
    }

    /// Convert a byte slice into words. Any trailing partial word is ignored.
    pub(crate) fn words_from_bytes(&self, buf: &[u8]) -> Vec<i64> {
        buf.chunks_exact(WORD_BYTES)
            .map(|chunk| {
                let mut word = [0; WORD_BYTES];
                word.copy_from_slice(chunk);
                self.i64_from(word)
            })
            .collect()
    }

    pub(crate) fn write_words<W: Write>(&self, wtr: &mut W, words: &[i64]) -> std::io::Result<()> {
        for &w in words {
            wtr.write_all(&self.i64_bytes(w))?;
        }
        Ok(())
    }
}

/// Round `nwords` up to the next multiple of `words_per_sector`.
pub(crate) fn sector_align(nwords: usize, words_per_sector: usize) -> usize {
    if words_per_sector <= 1 {
        nwords
    } else {
        nwords.div_ceil(words_per_sector) * words_per_sector
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_byte_order() {
        assert_eq!(ByteOrder::detect(20_i64.to_be_bytes()), ByteOrder::Big);
        assert_eq!(ByteOrder::detect(20_i64.to_le_bytes()), ByteOrder::Little);
        // Garbage falls back to the UM default
        assert_eq!(ByteOrder::detect([0xff; 8]), ByteOrder::Big);
    }

    #[test]
    fn test_word_io() {
        for order in [ByteOrder::Big, ByteOrder::Little] {
            let mut buf = vec![];
            order.write_words(&mut buf, &[1, -32768, 2.5_f64.to_bits() as i64]).unwrap();
            assert_eq!(buf.len(), 24);
            let words = order.read_words(&mut buf.as_slice(), 3).unwrap();
            assert_eq!(words[..2], [1, -32768]);
            assert_eq!(f64::from_bits(words[2] as u64), 2.5);
        }
    }

    #[test]
    fn test_sector_align() {
        assert_eq!(sector_align(0, 2048), 0);
        assert_eq!(sector_align(1, 2048), 2048);
        assert_eq!(sector_align(2049, 2048), 4096);
        assert_eq!(sector_align(17, 1), 17);
        assert_eq!(sector_align(17, 0), 17);
    }
}
