//! On-disk document library.
//!
//! Reports and transcripts are kept as `<id>_report.json` and
//! `<id>_transcript.txt` in the data directory. The library is the source of
//! documents for a full re-index and for "index if missing" requests.

use crate::cache::ReportCache;
use crate::document::{check_document_id, Report, SourceDocument, Transcript};
use crate::error::{Result, VidsageError};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

const REPORT_SUFFIX: &str = "_report.json";
const TRANSCRIPT_SUFFIX: &str = "_transcript.txt";

/// Reports and transcripts stored under one directory.
pub struct DocumentLibrary {
    dir: PathBuf,
    cache: Arc<dyn ReportCache>,
}

impl DocumentLibrary {
    pub fn new(dir: impl Into<PathBuf>, cache: Arc<dyn ReportCache>) -> Self {
        Self {
            dir: dir.into(),
            cache,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a report file. Fails for ids that would leave the directory.
    pub fn report_path(&self, document_id: &str) -> Result<PathBuf> {
        check_document_id(document_id)?;
        Ok(self.dir.join(format!("{}{}", document_id, REPORT_SUFFIX)))
    }

    pub fn transcript_path(&self, document_id: &str) -> Result<PathBuf> {
        check_document_id(document_id)?;
        Ok(self.dir.join(format!("{}{}", document_id, TRANSCRIPT_SUFFIX)))
    }

    /// Load a report, consulting the cache first.
    pub fn load_report(&self, document_id: &str) -> Result<Option<Report>> {
        if let Some(report) = self.cache.get(document_id)? {
            debug!("Report {} served from cache", document_id);
            return Ok(Some(report));
        }

        let path = self.report_path(document_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let report = Report::from_json_str(&content).map_err(|e| {
            VidsageError::MalformedDocument(format!("{}: {}", path.display(), e))
        })?;

        if report.document_id != document_id {
            return Err(VidsageError::MalformedDocument(format!(
                "{} holds report {} instead of {}",
                path.display(),
                report.document_id,
                document_id
            )));
        }

        self.cache.put(report.clone())?;
        Ok(Some(report))
    }

    /// Load a transcript. Its title comes from the matching report, if any.
    pub fn load_transcript(&self, document_id: &str) -> Result<Option<Transcript>> {
        let path = self.transcript_path(document_id)?;
        if !path.exists() {
            return Ok(None);
        }

        let text = std::fs::read_to_string(&path)?;
        let title = match self.load_report(document_id) {
            Ok(Some(report)) => report.title,
            _ => document_id.to_string(),
        };

        Ok(Some(Transcript::new(document_id, title, text)))
    }

    /// Write a report to the library and refresh its cache entry.
    pub fn save_report(&self, report: &Report) -> Result<PathBuf> {
        report.validate()?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.report_path(&report.document_id)?;
        std::fs::write(&path, serde_json::to_string_pretty(report)?)?;
        self.cache.put(report.clone())?;

        debug!("Saved report {} to {:?}", report.document_id, path);
        Ok(path)
    }

    pub fn save_transcript(&self, transcript: &Transcript) -> Result<PathBuf> {
        transcript.validate()?;
        std::fs::create_dir_all(&self.dir)?;

        let path = self.transcript_path(&transcript.document_id)?;
        std::fs::write(&path, &transcript.text)?;

        debug!("Saved transcript {} to {:?}", transcript.document_id, path);
        Ok(path)
    }

    /// Ids with a report or transcript file, sorted.
    pub fn document_ids(&self) -> Result<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        if !self.dir.exists() {
            return Ok(ids);
        }

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            let id = name
                .strip_suffix(REPORT_SUFFIX)
                .or_else(|| name.strip_suffix(TRANSCRIPT_SUFFIX));
            if let Some(id) = id.filter(|id| !id.is_empty()) {
                ids.insert(id.to_string());
            }
        }

        Ok(ids)
    }

    /// Every readable document in the library, reports before transcripts
    /// for each id. Unreadable files are skipped with a warning.
    pub fn load_all(&self) -> Result<Vec<SourceDocument>> {
        let mut documents = Vec::new();

        for id in self.document_ids()? {
            match self.load_report(&id) {
                Ok(Some(report)) => documents.push(report.into()),
                Ok(None) => {}
                Err(e) => warn!("Skipping report {}: {}", id, e),
            }
            match self.load_transcript(&id) {
                Ok(Some(transcript)) => documents.push(transcript.into()),
                Ok(None) => {}
                Err(e) => warn!("Skipping transcript {}: {}", id, e),
            }
        }

        Ok(documents)
    }
}
