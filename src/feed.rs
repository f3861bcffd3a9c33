//! Discovery feed reader
//!
//! The scanner that finds new tokens is a separate process. It drops a JSON
//! array of candidates into a file; we re-read that file on every poll and
//! hand back the candidates that still deserve a look.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::candidate::CandidateToken;
use crate::error::{Error, Result};

pub struct CandidateFeed {
    path: PathBuf,
    /// Mints that will never be reviewed again this session
    settled: HashSet<String>,
}

impl CandidateFeed {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            settled: HashSet::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Candidates in the file that have not been settled. A missing file is
    /// an empty feed.
    pub async fn poll(&self) -> Result<Vec<CandidateToken>> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::Io(format!("{}: {}", self.path.display(), e)))?;
        if data.trim().is_empty() {
            return Ok(Vec::new());
        }

        let candidates: Vec<CandidateToken> = serde_json::from_str(&data)
            .map_err(|e| Error::Serialization(format!("{}: {}", self.path.display(), e)))?;

        let mut seen = HashSet::new();
        let fresh: Vec<CandidateToken> = candidates
            .into_iter()
            .filter(|c| !c.address.trim().is_empty())
            .filter(|c| !self.settled.contains(&c.address))
            .filter(|c| seen.insert(c.address.clone()))
            .collect();
        debug!(count = fresh.len(), "Feed polled");
        Ok(fresh)
    }

    /// Stop offering this mint
    pub fn settle(&mut self, mint: &str) {
        self.settled.insert(mint.to_string());
    }

    pub fn settled_count(&self) -> usize {
        self.settled.len()
    }
}
