//! Sequential player id allocation.
//!
//! The next id to hand out is persisted as a single integer. Allocation
//! writes the incremented value before returning the id, so a crash between
//! the two can skip an id but never reuse one.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use waypoint_core::{PlayerId, Result};

/// Source of fresh player ids.
pub trait PlayerIdCounter: Send {
    /// Allocate the next id, persisting the counter first.
    ///
    /// # Errors
    ///
    /// Returns `Error::CounterExhausted` once ids run out, or `Error::Io` if
    /// the counter could not be persisted. No id is handed out on error.
    fn allocate(&mut self) -> Result<PlayerId>;

    /// Value the next allocation will use.
    fn peek(&self) -> u32;
}

/// Counter persisted in a text file holding one integer.
#[derive(Debug)]
pub struct FileCounter {
    path: PathBuf,
    next: u32,
}

impl FileCounter {
    /// Load the counter from `path`.
    ///
    /// A missing file or a first line that is not an integer starts at 0.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file exists but cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let next = match fs::read_to_string(&path) {
            Ok(text) => parse_counter(&text).unwrap_or_else(|| {
                warn!("Counter file {} is not an integer, starting at 0", path.display());
                0
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Counter file {} missing, starting at 0", path.display());
                0
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, next })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, value: u32) -> Result<()> {
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, format!("{value}\n"))?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn parse_counter(text: &str) -> Option<u32> {
    text.lines().next()?.trim().parse().ok()
}

impl PlayerIdCounter for FileCounter {
    fn allocate(&mut self) -> Result<PlayerId> {
        let id = PlayerId::from_counter(self.next)?;
        self.persist(self.next + 1)?;
        self.next += 1;
        debug!(player_id = %id, "Allocated player id");
        Ok(id)
    }

    fn peek(&self) -> u32 {
        self.next
    }
}

/// Counter kept in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryCounter {
    next: u32,
    persisted: Vec<u32>,
}

impl MemoryCounter {
    pub fn starting_at(next: u32) -> Self {
        Self {
            next,
            persisted: Vec::new(),
        }
    }

    /// Every value "persisted" so far, in order.
    pub fn persisted(&self) -> &[u32] {
        &self.persisted
    }
}

impl PlayerIdCounter for MemoryCounter {
    fn allocate(&mut self) -> Result<PlayerId> {
        let id = PlayerId::from_counter(self.next)?;
        self.next += 1;
        self.persisted.push(self.next);
        Ok(id)
    }

    fn peek(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;
    use waypoint_core::Error;

    #[rstest]
    #[case("12", Some(12))]
    #[case("7\nignored", Some(7))]
    #[case("  3  \n", Some(3))]
    #[case("", None)]
    #[case("seven", None)]
    #[case("-1", None)]
    fn test_parse_counter(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(parse_counter(text), expected);
    }

    #[test]
    fn test_missing_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let counter = FileCounter::load(dir.path().join("config.txt")).unwrap();
        assert_eq!(counter.peek(), 0);
    }

    #[test]
    fn test_garbage_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(&path, "not a number").unwrap();
        assert_eq!(FileCounter::load(&path).unwrap().peek(), 0);
    }

    #[test]
    fn test_allocate_persists_before_returning() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(&path, "41\n").unwrap();

        let mut counter = FileCounter::load(&path).unwrap();
        let id = counter.allocate().unwrap();

        assert_eq!(id.as_str(), "041");
        assert_eq!(fs::read_to_string(&path).unwrap().trim(), "42");
        assert_eq!(FileCounter::load(&path).unwrap().peek(), 42);
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_exhausted_counter_hands_out_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.txt");
        fs::write(&path, "1000").unwrap();

        let mut counter = FileCounter::load(&path).unwrap();
        assert!(matches!(counter.allocate(), Err(Error::CounterExhausted(1000))));
        assert_eq!(counter.peek(), 1000);
        assert_eq!(fs::read_to_string(&path).unwrap(), "1000");
    }

    #[test]
    fn test_memory_counter_records_each_allocation() {
        let mut counter = MemoryCounter::starting_at(5);
        assert_eq!(counter.allocate().unwrap().as_str(), "005");
        assert_eq!(counter.allocate().unwrap().as_str(), "006");
        assert_eq!(counter.persisted(), &[6, 7]);
    }
}
