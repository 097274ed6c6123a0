//! Tabular file formats
//!
//! Readers for the four observation inputs (ethogram, group scans, focal
//! events, directed social interactions) and writers for every derived table.
//! Both sides work over any `io::Read` / `io::Write`; the path helpers add file
//! handling and error context.

mod reader;
mod writer;

pub use reader::*;
pub use writer::*;
