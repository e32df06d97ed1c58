//! Durable result store
//!
//! The store is a single JSON array of [`Record`]s. It is loaded once at
//! startup to learn which respondents are already complete, and rewritten
//! after every successful respondent. Only the orchestrator touches it, so
//! writes are serialized by ownership (`&mut self`).
//!
//! Each rewrite goes to a sibling temp file which is then renamed over the
//! target, so an interrupted write leaves the previous contents intact.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::survey::types::{Record, Respondent};

#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: Vec<Record>,
    completed: HashSet<String>,
}

impl ResultStore {
    /// Open the store at `path`
    ///
    /// A missing or empty file is an empty store. If the file holds
    /// duplicate users, the first record wins.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let loaded: Vec<Record> = match fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => Vec::new(),
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse result store: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read result store: {}", path.display()))
            }
        };

        let mut completed = HashSet::new();
        let mut records = Vec::with_capacity(loaded.len());
        for record in loaded {
            if completed.insert(record.user.clone()) {
                records.push(record);
            } else {
                tracing::warn!(user = %record.user, "duplicate record in store, keeping first");
            }
        }

        tracing::info!(
            path = %path.display(),
            records = records.len(),
            "result store loaded"
        );

        Ok(Self {
            path,
            records,
            completed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, user: &str) -> bool {
        self.completed.contains(user)
    }

    /// Split respondents into pending ones and a count of already completed
    pub fn pending(&self, respondents: Vec<Respondent>) -> (Vec<Respondent>, usize) {
        let total = respondents.len();
        let pending: Vec<Respondent> = respondents
            .into_iter()
            .filter(|r| !self.contains(&r.user))
            .collect();
        let skipped = total - pending.len();
        (pending, skipped)
    }

    /// Add a record and rewrite the file
    ///
    /// Returns `false` without writing if the user is already present.
    pub async fn append(&mut self, record: Record) -> Result<bool> {
        if self.contains(&record.user) {
            tracing::warn!(user = %record.user, "record already stored, ignoring");
            return Ok(false);
        }

        self.completed.insert(record.user.clone());
        self.records.push(record);

        if let Err(e) = self.persist().await {
            // Keep memory consistent with disk
            if let Some(record) = self.records.pop() {
                self.completed.remove(&record.user);
            }
            return Err(e);
        }

        Ok(true)
    }

    async fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.records)
            .context("Failed to serialize result store")?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = fs::File::create(&tmp)
            .await
            .with_context(|| format!("Failed to create: {}", tmp.display()))?;
        file.write_all(json.as_bytes())
            .await
            .with_context(|| format!("Failed to write: {}", tmp.display()))?;
        file.sync_all()
            .await
            .with_context(|| format!("Failed to sync: {}", tmp.display()))?;
        drop(file);
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace result store: {}", self.path.display()))?;

        Ok(())
    }
}
