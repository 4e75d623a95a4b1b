//! Durable storage of session results.
//!
//! Layout of the session directory:
//!
//! ```text
//! <directory>/
//!   scores.json              episode scores in completion order, written at shutdown
//!   experience-<id>.json     transitions of recorded episodes
//!   epochs.csv               optional, when a CsvLogger is attached
//! ```

use crate::core::ExperienceBuffer;
use crate::error::PersistenceError;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the score history.
pub const SCORES_FILE: &str = "scores.json";

/// Writes results below a session directory.
#[derive(Debug, Clone)]
pub struct ResultsStore {
    root: PathBuf,
}

impl ResultsStore {
    /// Open the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| PersistenceError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scores_path(&self) -> PathBuf {
        self.root.join(SCORES_FILE)
    }

    pub fn experience_path(&self, episode: u64) -> PathBuf {
        self.root.join(format!("experience-{}.json", episode))
    }

    /// Write the score history, replacing any previous file.
    pub fn write_scores(&self, scores: &[f64]) -> Result<PathBuf, PersistenceError> {
        let path = self.scores_path();
        write_json(&path, &scores)?;
        Ok(path)
    }

    /// Read a previously written score history.
    pub fn read_scores(&self) -> Result<Vec<f64>, PersistenceError> {
        let path = self.scores_path();
        let file = File::open(&path).map_err(|e| PersistenceError::io(&path, e))?;
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PersistenceError::serialize(&path, e))
    }

    /// Write the transitions of one episode, keyed by its id.
    pub fn write_experience<S: Serialize, A: Serialize>(
        &self,
        buffer: &ExperienceBuffer<S, A>,
    ) -> Result<PathBuf, PersistenceError> {
        let path = self.experience_path(buffer.episode());
        write_json(&path, buffer)?;
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistenceError> {
    let file = File::create(path).map_err(|e| PersistenceError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, value).map_err(|e| PersistenceError::serialize(path, e))?;
    writer.flush().map_err(|e| PersistenceError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transition;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("runs/chain/0");
        let store = ResultsStore::open(&root).unwrap();
        assert!(root.is_dir());
        assert_eq!(store.root(), root.as_path());
    }

    #[test]
    fn test_scores_keep_order() {
        let dir = tempdir().unwrap();
        let store = ResultsStore::open(dir.path()).unwrap();
        store.write_scores(&[3.0, 1.0, 2.5]).unwrap();
        assert_eq!(store.read_scores().unwrap(), vec![3.0, 1.0, 2.5]);
    }

    #[test]
    fn test_experience_named_by_episode() {
        let dir = tempdir().unwrap();
        let store = ResultsStore::open(dir.path()).unwrap();
        let mut buffer = ExperienceBuffer::new(12, 4);
        buffer.push(Transition::new(vec![0.0f32], 1u8, 0.5, vec![1.0f32]));

        let path = store.write_experience(&buffer).unwrap();
        assert_eq!(path, dir.path().join("experience-12.json"));

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["episode"], 12);
        assert_eq!(json["transitions"][0]["reward"], 0.5);
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let dir = tempdir().unwrap();
        let store = ResultsStore::open(dir.path().join("gone")).unwrap();
        fs::remove_dir(store.root()).unwrap();

        let err = store.write_scores(&[1.0]).unwrap_err();
        assert!(matches!(err, PersistenceError::Io { .. }));
    }
}
