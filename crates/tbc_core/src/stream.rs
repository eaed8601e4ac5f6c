//! Raw TBC sample stream.
//!
//! A `.tbc` file is a flat run of fields, each `field_width * field_height`
//! unsigned 16-bit little-endian samples, stored back to back with no header.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Random-access reader of whole fields.
pub trait FieldReader {
    /// Read the field with the given 1-based sequence number.
    fn read_field(&mut self, seq_no: usize) -> io::Result<Vec<u16>>;

    /// Number of complete fields available.
    fn field_count(&self) -> usize;
}

/// Field reader over a `.tbc` file on disk.
#[derive(Debug)]
pub struct TbcStream {
    path: PathBuf,
    reader: BufReader<File>,
    field_length: usize,
    field_width: usize,
    field_count: usize,
    /// Byte buffer reused between reads.
    scratch: Vec<u8>,
}

impl TbcStream {
    /// Open a stream with `field_length` samples per field.
    pub fn open(path: &Path, field_length: usize, field_width: usize) -> io::Result<Self> {
        if field_length == 0 || field_width == 0 || field_length % field_width != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid field geometry: {field_length} samples, width {field_width}"),
            ));
        }

        let file = File::open(path)?;
        let bytes = file.metadata()?.len();
        let field_bytes = (field_length * 2) as u64;
        let field_count = (bytes / field_bytes) as usize;

        if bytes % field_bytes != 0 {
            tracing::warn!(
                "[TbcStream] {} has {} trailing bytes after {} whole fields",
                path.display(),
                bytes % field_bytes,
                field_count
            );
        }

        tracing::debug!(
            "[TbcStream] Opened {} ({} fields of {} samples)",
            path.display(),
            field_count,
            field_length
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            field_length,
            field_width,
            field_count,
            scratch: Vec::new(),
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Samples per field.
    pub fn field_length(&self) -> usize {
        self.field_length
    }

    /// Samples per field line.
    pub fn field_width(&self) -> usize {
        self.field_width
    }
}

impl FieldReader for TbcStream {
    fn read_field(&mut self, seq_no: usize) -> io::Result<Vec<u16>> {
        if seq_no == 0 || seq_no > self.field_count {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "field {seq_no} is beyond the end of the stream ({} fields)",
                    self.field_count
                ),
            ));
        }

        let field_bytes = self.field_length * 2;
        let offset = (seq_no - 1) as u64 * field_bytes as u64;
        self.reader.seek(SeekFrom::Start(offset))?;

        self.scratch.resize(field_bytes, 0);
        self.reader.read_exact(&mut self.scratch)?;

        Ok(self
            .scratch
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect())
    }

    fn field_count(&self) -> usize {
        self.field_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_fields(fields: &[Vec<u16>]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        for field in fields {
            for sample in field {
                file.write_all(&sample.to_le_bytes()).unwrap();
            }
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn reads_fields_by_sequence_number() {
        let fields: Vec<Vec<u16>> = (0..3u16).map(|f| vec![f * 1000 + 1; 8]).collect();
        let file = write_fields(&fields);

        let mut stream = TbcStream::open(file.path(), 8, 4).unwrap();
        assert_eq!(stream.field_count(), 3);
        assert_eq!(stream.read_field(2).unwrap(), fields[1]);
        assert_eq!(stream.read_field(1).unwrap(), fields[0]);
        assert_eq!(stream.read_field(3).unwrap(), fields[2]);
    }

    #[test]
    fn samples_are_little_endian() {
        let file = write_fields(&[vec![0x1234, 0xABCD]]);
        let mut stream = TbcStream::open(file.path(), 2, 2).unwrap();
        assert_eq!(stream.read_field(1).unwrap(), vec![0x1234, 0xABCD]);
    }

    #[test]
    fn out_of_range_field_is_an_error() {
        let file = write_fields(&[vec![0; 4]]);
        let mut stream = TbcStream::open(file.path(), 4, 2).unwrap();
        assert!(stream.read_field(0).is_err());
        assert!(stream.read_field(2).is_err());
    }

    #[test]
    fn missing_file_fails_to_open() {
        let dir = tempfile::tempdir().unwrap();
        assert!(TbcStream::open(&dir.path().join("missing.tbc"), 4, 2).is_err());
    }

    #[test]
    fn partial_trailing_field_is_ignored() {
        let mut file = write_fields(&[vec![7; 4]]);
        file.write_all(&[1, 2, 3]).unwrap();
        file.flush().unwrap();
        let stream = TbcStream::open(file.path(), 4, 2).unwrap();
        assert_eq!(stream.field_count(), 1);
    }
}
