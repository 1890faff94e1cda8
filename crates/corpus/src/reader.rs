use crate::error::{CorpusError, Result};
use std::io::ErrorKind;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Matches the buffer size the bundled corpus was tuned against.
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Deterministic file name for a corpus year.
pub fn year_file_name(year: i32) -> String {
    format!("yob{year}.txt")
}

/// Streams year-files as raw delimited lines using fixed-size chunk reads.
/// An incomplete trailing fragment is carried into the next chunk, so no line
/// is ever split across two output records regardless of chunk size. Lines
/// that do not carry exactly five comma-separated fields are dropped here;
/// numeric validation happens at parse time.
pub struct ChunkedLineReader {
    dir: PathBuf,
    chunk_size: usize,
}

impl ChunkedLineReader {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::with_chunk_size(dir, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(dir: impl AsRef<Path>, chunk_size: usize) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Paths of every year-file a range read would touch, in range order.
    pub fn year_files(&self, years: Range<i32>) -> Vec<PathBuf> {
        years.map(|year| self.dir.join(year_file_name(year))).collect()
    }

    /// Read every year-file in the half-open range, concatenated in range
    /// order. A missing year-file aborts the whole range: a fully specified
    /// range is expected to exist in the bundled corpus.
    pub async fn read_range(&self, years: Range<i32>) -> Result<Vec<String>> {
        let mut lines = Vec::new();
        for year in years {
            let path = self.dir.join(year_file_name(year));
            self.read_file(&path, &mut lines).await?;
        }
        log::debug!("read {} corpus lines from {}", lines.len(), self.dir.display());
        Ok(lines)
    }

    async fn read_file(&self, path: &Path, out: &mut Vec<String>) -> Result<()> {
        let mut file = match tokio::fs::File::open(path).await {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(CorpusError::FileNotFound(path.to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };

        let mut buf = vec![0u8; self.chunk_size];
        let mut leftover: Vec<u8> = Vec::new();

        loop {
            let read = file.read(&mut buf).await?;
            if read == 0 {
                break;
            }
            leftover.extend_from_slice(&buf[..read]);

            // Keep the trailing fragment after the last newline for the next
            // chunk; everything before it is complete lines.
            if let Some(last_newline) = leftover.iter().rposition(|&b| b == b'\n') {
                let rest = leftover.split_off(last_newline + 1);
                push_complete_lines(&leftover, out);
                leftover = rest;
            }
        }

        if !leftover.is_empty() {
            push_complete_lines(&leftover, out);
        }

        Ok(())
    }
}

fn push_complete_lines(chunk: &[u8], out: &mut Vec<String>) {
    for raw in chunk.split(|&b| b == b'\n') {
        if raw.is_empty() {
            continue;
        }
        let line = String::from_utf8_lossy(raw);
        if line.split(',').count() == 5 {
            out.push(line.into_owned());
        }
    }
}
