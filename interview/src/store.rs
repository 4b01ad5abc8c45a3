//! Session snapshot persistence.

use crate::layout::DataLayout;
use crate::layout::write_atomic;
use crate::session::SessionData;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::QuarterlyState;
use crate::state::QuickState;
use crate::state::SetupState;
use crate::workflow::QuarterlyData;
use crate::workflow::QuickAuditData;
use crate::workflow::SetupData;
use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use tokio::sync::Mutex;

/// Typed session data for whichever workflow the session runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "session", rename_all = "snake_case")]
pub enum SessionPayload {
    QuickAudit(SessionData<QuickState, QuickAuditData>),
    Setup(SessionData<SetupState, SetupData>),
    Quarterly(SessionData<QuarterlyState, QuarterlyData>),
}

impl SessionPayload {
    pub fn kind(&self) -> WorkflowKind {
        match self {
            Self::QuickAudit(_) => WorkflowKind::QuickAudit,
            Self::Setup(_) => WorkflowKind::Setup,
            Self::Quarterly(_) => WorkflowKind::Quarterly,
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::QuickAudit(data) => data.is_terminal(),
            Self::Setup(data) => data.is_terminal(),
            Self::Quarterly(data) => data.is_terminal(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub user_id: String,
    pub updated_at: DateTime<Utc>,
    pub payload: SessionPayload,
}

impl SessionRecord {
    pub fn new(id: SessionId, user_id: impl Into<String>, payload: SessionPayload) -> Self {
        Self {
            id,
            user_id: user_id.into(),
            updated_at: Utc::now(),
            payload,
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        self.payload.kind()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()>;

    async fn load(&self, id: SessionId) -> anyhow::Result<Option<SessionRecord>>;

    /// The user's non-terminal session of `kind`, if one exists.
    async fn find_active(
        &self,
        user_id: &str,
        kind: WorkflowKind,
    ) -> anyhow::Result<Option<SessionId>>;

    /// Removes the snapshot. Returns false when there was nothing to remove.
    async fn purge(&self, id: SessionId) -> anyhow::Result<bool>;
}

fn is_active_for(record: &SessionRecord, user_id: &str, kind: WorkflowKind) -> bool {
    record.user_id == user_id && record.kind() == kind && !record.payload.is_terminal()
}

/// One pretty-printed JSON file per session.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    layout: DataLayout,
}

impl FileSessionStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    fn read(path: &std::path::Path) -> anyhow::Result<SessionRecord> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read session snapshot {}", path.display()))?;
        let record =
            serde_json::from_str(&data).context("parse session snapshot json")?;
        Ok(record)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(record)?;
        write_atomic(&self.layout.session_file(record.id), &data)
    }

    async fn load(&self, id: SessionId) -> anyhow::Result<Option<SessionRecord>> {
        let path = self.layout.session_file(id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    async fn find_active(
        &self,
        user_id: &str,
        kind: WorkflowKind,
    ) -> anyhow::Result<Option<SessionId>> {
        let dir = self.layout.sessions_dir();
        if !dir.exists() {
            return Ok(None);
        }
        for entry in fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let record = Self::read(&path)?;
            if is_active_for(&record, user_id, kind) {
                return Ok(Some(record.id));
            }
        }
        Ok(None)
    }

    async fn purge(&self, id: SessionId) -> anyhow::Result<bool> {
        let path = self.layout.session_file(id);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    records: Mutex<HashMap<SessionId, SessionRecord>>,
    fail_saves: Mutex<usize>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` saves fail without storing anything.
    pub async fn fail_next_saves(&self, count: usize) {
        *self.fail_saves.lock().await = count;
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, record: &SessionRecord) -> anyhow::Result<()> {
        {
            let mut failures = self.fail_saves.lock().await;
            if *failures > 0 {
                *failures -= 1;
                anyhow::bail!("session store unavailable");
            }
        }
        self.records.lock().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn load(&self, id: SessionId) -> anyhow::Result<Option<SessionRecord>> {
        Ok(self.records.lock().await.get(&id).cloned())
    }

    async fn find_active(
        &self,
        user_id: &str,
        kind: WorkflowKind,
    ) -> anyhow::Result<Option<SessionId>> {
        Ok(self
            .records
            .lock()
            .await
            .values()
            .find(|record| is_active_for(record, user_id, kind))
            .map(|record| record.id))
    }

    async fn purge(&self, id: SessionId) -> anyhow::Result<bool> {
        Ok(self.records.lock().await.remove(&id).is_some())
    }
}
