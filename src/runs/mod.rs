//! Run records
//!
//! Every pipeline run leaves a small JSON manifest describing what was asked,
//! how it ended, and where the tables were written.
use crate::error::{Result, ScanError};
use crate::output::OutputPaths;
use crate::pipeline::{Outcome, PipelineReport, RunStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Final status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run is still going
    Running,
    Completed,
    NoCandidates,
    NoQualifyingCreators,
    /// Run ended with an error
    Failed,
}

impl From<Outcome> for RunStatus {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Completed => RunStatus::Completed,
            Outcome::NoCandidates => RunStatus::NoCandidates,
            Outcome::NoQualifyingCreators => RunStatus::NoQualifyingCreators,
        }
    }
}

/// Manifest of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique run identifier
    pub id: Uuid,

    pub keyword: String,

    /// Profile applied on top of the config, if any
    #[serde(default)]
    pub profile: Option<String>,

    /// Fixture the run replayed
    #[serde(default)]
    pub fixture: Option<PathBuf>,

    pub workers: usize,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    pub status: RunStatus,

    /// Error message when the run failed
    #[serde(default)]
    pub error: Option<String>,

    pub creators_registered: usize,

    #[serde(default)]
    pub stats: RunStats,

    pub posts_csv: Option<PathBuf>,

    pub creators_csv: Option<PathBuf>,
}

impl RunRecord {
    /// Start a new record
    pub fn new(keyword: impl Into<String>, workers: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            keyword: keyword.into(),
            profile: None,
            fixture: None,
            workers,
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            error: None,
            creators_registered: 0,
            stats: RunStats::default(),
            posts_csv: None,
            creators_csv: None,
        }
    }

    /// Record a finished pipeline
    pub fn finish(&mut self, report: &PipelineReport) {
        self.finished_at = Some(Utc::now());
        self.status = report.outcome.into();
        self.creators_registered = report.registered.len();
        self.stats = report.stats;
    }

    /// Record a run that ended with an error
    pub fn fail(&mut self, error: impl ToString) {
        self.finished_at = Some(Utc::now());
        self.status = RunStatus::Failed;
        self.error = Some(error.to_string());
    }

    /// Wall-clock duration of the run so far
    pub fn duration(&self) -> chrono::Duration {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        end - self.started_at
    }
}

/// Stores run records as `<dir>/<id>.json`
pub struct RunStore {
    dir: PathBuf,
}

impl RunStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Save (or overwrite) a record
    pub fn save(&self, record: &RunRecord) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to create runs directory: {}", self.dir.display()),
        })?;

        let path = self.record_path(&record.id);
        let content = serde_json::to_string_pretty(record).map_err(|e| ScanError::Json {
            source: e,
            context: "Failed to serialize run record".to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to write run record: {}", path.display()),
        })?;

        Ok(path)
    }

    /// Mark the record failed and save it; a save error is only logged
    pub fn save_failed(&self, record: &mut RunRecord, error: &ScanError) {
        record.fail(error);
        if let Err(save_err) = self.save(record) {
            tracing::warn!("Failed to save run record: {}", save_err);
        }
    }

    /// Persist a finished run: its tables when it completed, then its record.
    /// A table write error leaves a failed record behind.
    pub fn save_report(
        &self,
        record: &mut RunRecord,
        report: &PipelineReport,
        outputs: &OutputPaths,
    ) -> Result<PathBuf> {
        record.finish(report);
        if report.outcome == Outcome::Completed {
            if let Err(e) = outputs.write(&report.posts, &report.creators) {
                self.save_failed(record, &e);
                return Err(e);
            }
            record.posts_csv = Some(outputs.posts_csv.clone());
            record.creators_csv = Some(outputs.creators_csv.clone());
        }
        self.save(record)
    }

    /// Load a record by id
    pub fn load(&self, id: &Uuid) -> Result<RunRecord> {
        let path = self.record_path(id);
        if !path.exists() {
            return Err(ScanError::RunNotFound { id: id.to_string() });
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to read run record: {}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| ScanError::Json {
            source: e,
            context: format!("Failed to deserialize run record: {}", path.display()),
        })
    }

    /// Load a record by id string; accepts a unique prefix of the id
    pub fn find(&self, id: &str) -> Result<RunRecord> {
        if let Ok(uuid) = Uuid::parse_str(id) {
            return self.load(&uuid);
        }

        let mut matches = self
            .list()?
            .into_iter()
            .filter(|r| r.id.to_string().starts_with(id));
        match (matches.next(), matches.next()) {
            (Some(record), None) if !id.is_empty() => Ok(record),
            _ => Err(ScanError::RunNotFound { id: id.to_string() }),
        }
    }

    /// All readable records, newest first
    pub fn list(&self) -> Result<Vec<RunRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(|e| ScanError::Io {
            source: e,
            context: format!("Failed to read runs directory: {}", self.dir.display()),
        })? {
            let entry = entry.map_err(|e| ScanError::Io {
                source: e,
                context: "Failed to read directory entry".to_string(),
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            let id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok());
            if let Some(id) = id {
                match self.load(&id) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!("Skipping unreadable run record: {}", e),
                }
            }
        }

        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_lifecycle() {
        let mut record = RunRecord::new("travel", 2);
        assert_eq!(record.status, RunStatus::Running);
        record.fail("source unavailable");
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.finished_at.is_some());
        assert_eq!(record.error.as_deref(), Some("source unavailable"));
    }

    #[test]
    fn test_save_load_list() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path().join("runs"));

        let mut older = RunRecord::new("travel", 1);
        older.started_at = Utc::now() - chrono::Duration::hours(1);
        let newer = RunRecord::new("food", 1);
        store.save(&older).unwrap();
        store.save(&newer).unwrap();

        let loaded = store.load(&older.id).unwrap();
        assert_eq!(loaded.keyword, "travel");

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);

        let prefix = &newer.id.to_string()[..8];
        assert_eq!(store.find(prefix).unwrap().id, newer.id);
    }

    fn empty_report(outcome: Outcome) -> PipelineReport {
        PipelineReport {
            outcome,
            registered: Vec::new(),
            posts: Vec::new(),
            creators: Vec::new(),
            stats: RunStats::default(),
        }
    }

    #[test]
    fn test_save_report_writes_tables() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path().join("runs"));
        let outputs = OutputPaths {
            posts_csv: temp_dir.path().join("out").join("posts.csv"),
            creators_csv: temp_dir.path().join("out").join("creators.csv"),
        };

        let mut record = RunRecord::new("travel", 1);
        store
            .save_report(&mut record, &empty_report(Outcome::Completed), &outputs)
            .unwrap();

        let saved = store.load(&record.id).unwrap();
        assert_eq!(saved.status, RunStatus::Completed);
        assert_eq!(saved.posts_csv.as_deref(), Some(outputs.posts_csv.as_path()));
        assert!(outputs.creators_csv.exists());
    }

    #[test]
    fn test_table_write_failure_saves_failed_record() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path().join("runs"));
        // A plain file where the output directory should go
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let outputs = OutputPaths {
            posts_csv: blocker.join("posts.csv"),
            creators_csv: blocker.join("creators.csv"),
        };

        let mut record = RunRecord::new("travel", 1);
        let result = store.save_report(&mut record, &empty_report(Outcome::Completed), &outputs);
        assert!(result.is_err());

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, record.id);
        assert_eq!(listed[0].status, RunStatus::Failed);
        assert!(listed[0].error.is_some());
        assert!(listed[0].posts_csv.is_none());
    }

    #[test]
    fn test_aborted_run_skips_tables() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path().join("runs"));
        let outputs = OutputPaths {
            posts_csv: temp_dir.path().join("out").join("posts.csv"),
            creators_csv: temp_dir.path().join("out").join("creators.csv"),
        };

        let mut record = RunRecord::new("travel", 1);
        store
            .save_report(&mut record, &empty_report(Outcome::NoCandidates), &outputs)
            .unwrap();

        assert_eq!(store.load(&record.id).unwrap().status, RunStatus::NoCandidates);
        assert!(!outputs.posts_csv.exists());
    }

    #[test]
    fn test_missing_run() {
        let temp_dir = TempDir::new().unwrap();
        let store = RunStore::new(temp_dir.path().to_path_buf());
        assert!(store.list().unwrap().is_empty());
        assert!(matches!(
            store.load(&Uuid::new_v4()),
            Err(ScanError::RunNotFound { .. })
        ));
        assert!(matches!(
            store.find("nope"),
            Err(ScanError::RunNotFound { .. })
        ));
    }
}
