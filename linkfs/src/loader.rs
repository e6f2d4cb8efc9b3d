use crate::disk::LinkedDisk;
use crate::error::Result;
use fileblock::BlockStorage;
use std::io::{BufRead, Error, ErrorKind};

/// Outcome of a bulk load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Identifiers written, in input order.
    pub loaded: Vec<String>,
    /// Pairs not written because the disk ran out of space.
    pub skipped: usize,
}

/// Parses a file list where each logical file is two lines: its identifier,
/// then its content. Blank lines between files are ignored.
///
/// # Errors
///
/// An identifier on the last line with no content line after it is
/// `InvalidInput`.
pub fn parse_pairs<R: BufRead>(reader: R) -> std::io::Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next() {
        let id = line?;
        if id.trim().is_empty() {
            continue;
        }
        let content = match lines.next() {
            Some(content) => content?,
            None => {
                return Err(Error::new(
                    ErrorKind::InvalidInput,
                    format!("file \"{}\" has no content line", id),
                ))
            }
        };
        pairs.push((id, content));
    }
    Ok(pairs)
}

impl<T: BlockStorage> LinkedDisk<T> {
    /// Writes `pairs` in order and stops at the first one that does not fit.
    ///
    /// Running out of space ends the load without an error; the summary says
    /// how many pairs were left behind. Any other failure is returned.
    pub fn bulk_load<I, S, C>(&mut self, pairs: I) -> Result<LoadSummary>
    where
        I: IntoIterator<Item = (S, C)>,
        S: AsRef<str>,
        C: AsRef<[u8]>,
    {
        let mut summary = LoadSummary::default();
        let mut pairs = pairs.into_iter();
        while let Some((id, content)) = pairs.next() {
            match self.write_file(id.as_ref(), content.as_ref()) {
                Ok(_) => summary.loaded.push(id.as_ref().to_string()),
                Err(e) if e.is_out_of_space() => {
                    let usage = self.disk_usage();
                    warn!(
                        "cannot load more files, low disk space: {} blocks (about {} bytes) remaining",
                        usage.free_blocks,
                        usage.free_blocks * usage.payload_capacity
                    );
                    summary.skipped = 1 + pairs.by_ref().count();
                    break;
                }
                Err(e) => return Err(e),
            }
        }
        info!("{} files loaded successfully", summary.loaded.len());
        Ok(summary)
    }
}
