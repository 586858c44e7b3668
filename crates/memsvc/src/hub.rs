//! The word-addressed store behind the memory module.

use std::fmt;
use std::sync::Mutex;

/// Errors raised by `MemHub` accesses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemError {
    /// The access touches words past the end of the store.
    OutOfRange { address: u32, count: usize, size: usize },
    /// A previous access panicked while holding the store.
    Poisoned,
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { address, count, size } => write!(
                f,
                "access of {} words at {:#x} is outside memory of {} words",
                count, address, size
            ),
            Self::Poisoned => write!(f, "memory store poisoned"),
        }
    }
}

impl std::error::Error for MemError {}

pub type Result<T> = std::result::Result<T, MemError>;

/// A fixed-size array of words shared by every connection.
#[derive(Debug)]
pub struct MemHub {
    words: Mutex<Vec<u32>>,
}

impl MemHub {
    /// Creates a zeroed store of `size` words.
    pub fn new(size: usize) -> Self {
        Self::with_contents(vec![0; size])
    }

    pub fn with_contents(words: Vec<u32>) -> Self {
        Self { words: Mutex::new(words) }
    }

    pub fn size(&self) -> Result<usize> {
        Ok(self.words.lock().map_err(|_| MemError::Poisoned)?.len())
    }

    /// Reads `count` words starting at `address`. A zero count reads nothing.
    pub fn read(&self, address: u32, count: u32) -> Result<Vec<u32>> {
        let words = self.words.lock().map_err(|_| MemError::Poisoned)?;
        let range = span(address, count as usize, words.len())?;
        Ok(words[range].to_vec())
    }

    /// Writes `data` starting at `address`. Nothing is written if any word is out of range.
    pub fn write(&self, address: u32, data: &[u32]) -> Result<()> {
        let mut words = self.words.lock().map_err(|_| MemError::Poisoned)?;
        let range = span(address, data.len(), words.len())?;
        words[range].copy_from_slice(data);
        Ok(())
    }
}

fn span(address: u32, count: usize, size: usize) -> Result<std::ops::Range<usize>> {
    let start = address as usize;
    match start.checked_add(count) {
        Some(end) if end <= size => Ok(start..end),
        _ => Err(MemError::OutOfRange { address, count, size }),
    }
}
