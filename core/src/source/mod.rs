//! Transports feeding the pipeline and the pull-based replay cursor.

pub mod replay;

pub use replay::{Replay, ReplayItem};

use std::fs;
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("reading capture {path}: {source}")]
    Capture {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("transport read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// One read from a byte source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRead {
    /// Zero or more bytes; empty means nothing arrived this poll.
    Data(Vec<u8>),
    /// The source will never produce more bytes.
    EndOfStream,
}

/// Non-blocking byte transport.
pub trait ByteSource {
    /// Return whatever is available now. Must not block past a bounded timeout.
    fn read_available(&mut self) -> Result<SourceRead, SourceError>;

    /// Return to the start of the stream, where that is meaningful.
    fn rewind(&mut self) -> Result<(), SourceError> {
        Ok(())
    }
}

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Replays a captured byte stream in fixed-size chunks.
#[derive(Debug, Clone)]
pub struct FileSource {
    data: Vec<u8>,
    cursor: usize,
    chunk_size: usize,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<Self, SourceError> {
        let path_ref = path.as_ref();
        let data = fs::read(path_ref).map_err(|source| SourceError::Capture {
            path: path_ref.display().to_string(),
            source,
        })?;
        Ok(Self::from_bytes(data, chunk_size))
    }

    pub fn from_bytes(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            cursor: 0,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }
}

impl ByteSource for FileSource {
    fn read_available(&mut self) -> Result<SourceRead, SourceError> {
        if self.cursor >= self.data.len() {
            return Ok(SourceRead::EndOfStream);
        }
        let end = (self.cursor + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(SourceRead::Data(chunk))
    }

    fn rewind(&mut self) -> Result<(), SourceError> {
        self.cursor = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn file_source_reads_chunks_then_ends() {
        let mut source = FileSource::from_bytes(vec![1, 2, 3, 4, 5], 2);
        assert_eq!(source.read_available().unwrap(), SourceRead::Data(vec![1, 2]));
        assert_eq!(source.read_available().unwrap(), SourceRead::Data(vec![3, 4]));
        assert_eq!(source.read_available().unwrap(), SourceRead::Data(vec![5]));
        assert_eq!(source.read_available().unwrap(), SourceRead::EndOfStream);
        assert_eq!(source.read_available().unwrap(), SourceRead::EndOfStream);

        source.rewind().unwrap();
        assert_eq!(source.remaining(), 5);
    }

    #[test]
    fn file_source_opens_capture() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&[9; 10]).unwrap();
        let path = temp.into_temp_path();
        let source = FileSource::open(&path, 4).unwrap();
        assert_eq!(source.remaining(), 10);
    }

    #[test]
    fn missing_capture_names_the_path() {
        let err = FileSource::open("/nonexistent/capture.dat", 4).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/capture.dat"));
    }
}
