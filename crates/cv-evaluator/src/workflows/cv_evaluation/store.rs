use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use atomic_write_file::AtomicWriteFile;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::domain::{CandidateId, CandidateRecord, EvaluationId};
use super::pipeline::PipelineOutcome;
use super::repository::{CandidateSource, PersistedEvaluation, RepositoryError, ResultStore};

/// Candidate documents stored as `<dir>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonFileCandidateSource {
    dir: PathBuf,
}

impl JsonFileCandidateSource {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

impl CandidateSource for JsonFileCandidateSource {
    fn fetch(&self, id: &CandidateId) -> Result<Option<CandidateRecord>, RepositoryError> {
        let record: Option<CandidateRecord> = read_document(&document_path(&self.dir, id))?;
        Ok(record.map(|mut record| {
            record.id = id.clone();
            record
        }))
    }
}

/// Evaluations stored as one JSON document per source record.
///
/// Every write replaces the whole document atomically, so readers observe either the
/// previous evaluation or the new one.
#[derive(Debug)]
pub struct JsonFileResultStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileResultStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }
}

impl ResultStore for JsonFileResultStore {
    fn save(
        &self,
        source: &CandidateId,
        outcome: &PipelineOutcome,
    ) -> Result<PersistedEvaluation, RepositoryError> {
        let path = document_path(&self.dir, source);
        {
            let _guard = self
                .write_lock
                .lock()
                .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))?;

            let id = match read_document::<PersistedEvaluation>(&path) {
                Ok(existing) => existing
                    .map(|document| document.id)
                    .unwrap_or_else(EvaluationId::generate),
                Err(RepositoryError::Serialization(err)) => {
                    warn!(
                        source = %source,
                        path = %path.display(),
                        error = %err,
                        "previous evaluation unreadable, replacing it"
                    );
                    EvaluationId::generate()
                }
                Err(err) => return Err(err),
            };
            let document = PersistedEvaluation::from_outcome(id, source, outcome);

            let mut file = AtomicWriteFile::open(&path)?;
            serde_json::to_writer_pretty(&mut file, &document)?;
            file.commit()?;
            debug!(source = %source, path = %path.display(), "evaluation written");
        }

        read_document(&path)?.ok_or_else(|| {
            RepositoryError::Unavailable(format!("evaluation for {source} vanished after write"))
        })
    }

    fn fetch(&self, source: &CandidateId) -> Result<Option<PersistedEvaluation>, RepositoryError> {
        read_document(&document_path(&self.dir, source))
    }
}

fn read_document<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, RepositoryError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

fn document_path(dir: &Path, id: &CandidateId) -> PathBuf {
    dir.join(format!("{}.json", file_key(id.as_str())))
}

/// Escapes an identifier into a file name: `[A-Za-z0-9_-]` pass through, other bytes
/// become `%XX`.
fn file_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            key.push(char::from(byte));
        } else {
            let _ = write!(key, "%{byte:02X}");
        }
    }
    key
}
