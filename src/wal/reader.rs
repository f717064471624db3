//! WAL Reader
//!
//! Sequential reads of framed records.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{AtlasError, Result};

use super::entry::Header;
use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Offset just past the last record read successfully
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next record
    ///
    /// Returns:
    /// - `Ok(Some(entry))`: a complete, checksummed record
    /// - `Ok(None)`: clean end of file
    /// - `Err(WalCorruption)`: torn tail or CRC mismatch
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.reader, &mut header_buf)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(AtlasError::WalCorruption(format!(
                "Partial header at offset {}: {} of {} bytes",
                self.position, read, HEADER_SIZE
            )));
        }

        let header = Header::parse(&header_buf)?;
        let mut payload = vec![0u8; header.len];
        let read = read_full(&mut self.reader, &mut payload)?;
        if read < header.len {
            return Err(AtlasError::WalCorruption(format!(
                "Partial record at offset {}: {} of {} payload bytes",
                self.position, read, header.len
            )));
        }

        let entry = WalEntry::from_parts(&header, &payload)?;
        self.position += (HEADER_SIZE + header.len) as u64;
        Ok(Some(entry))
    }

    /// Offset just past the last good record
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over records until the end or the first error
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the file allows; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
