//! # Namematch Corpus
//!
//! Streaming ingestion and filtering of the bundled name-popularity corpus.
//!
//! ## Pipeline
//!
//! ```text
//! yob{year}.txt files
//!     │
//!     ├──> ChunkedLineReader (bounded-memory chunks, 5-field gate)
//!     │      └─> Raw lines
//!     │
//!     ├──> NameFilter (gender / prefix / length)
//!     │      └─> Per-name year series, descending rank
//!     │
//!     └──> candidates (seen-name exclusion, random or popularity order)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use namematch_corpus::{aggregate_lines, candidates, ChunkedLineReader, NameFilter};
//! use namematch_model::{Gender, NameSort};
//! use std::collections::HashSet;
//!
//! #[tokio::main]
//! async fn main() -> namematch_corpus::Result<()> {
//!     let reader = ChunkedLineReader::new("corpus/");
//!     let lines = reader.read_range(2020..2023).await?;
//!     let filter = NameFilter::new(Gender::Female, "A", usize::MAX);
//!     let series = aggregate_lines(lines.iter().map(String::as_str), &filter);
//!     let list = candidates(series, &HashSet::new(), NameSort::Popular);
//!     println!("{} candidates", list.len());
//!     Ok(())
//! }
//! ```

mod aggregate;
mod error;
mod reader;
mod types;

pub use aggregate::{aggregate_lines, candidates, NameFilter};
pub use error::{CorpusError, Result};
pub use reader::{year_file_name, ChunkedLineReader, DEFAULT_CHUNK_SIZE};
pub use types::{NameRecord, NameSeries, NameYearEntry};
