//! Durable entities written when a session finalizes.
//!
//! A finalize hands the repository one [`EntityBatch`]. Committing a batch is
//! all-or-nothing and keyed by session id, so retrying a finalize that failed
//! after the commit overwrites instead of duplicating.

use crate::layout::DataLayout;
use crate::layout::write_atomic;
use crate::model::BoardMember;
use crate::model::PortfolioHealth;
use crate::model::Prediction;
use crate::model::PredictionStatus;
use crate::model::Problem;
use crate::model::Trigger;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use anyhow::Context;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioVersion {
    pub id: Uuid,
    pub health: PortfolioHealth,
    /// Problem id and its time allocation, in listing order.
    pub allocations: Vec<(Uuid, u8)>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityBatch {
    pub session_id: SessionId,
    pub kind: WorkflowKind,
    #[serde(default)]
    pub problems: Vec<Problem>,
    #[serde(default)]
    pub board_members: Vec<BoardMember>,
    #[serde(default)]
    pub predictions: Vec<Prediction>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub portfolio_version: Option<PortfolioVersion>,
}

impl EntityBatch {
    pub fn empty(session_id: SessionId, kind: WorkflowKind) -> Self {
        Self {
            session_id,
            kind,
            problems: Vec::new(),
            board_members: Vec::new(),
            predictions: Vec::new(),
            triggers: Vec::new(),
            portfolio_version: None,
        }
    }

    pub fn created(&self) -> CreatedEntities {
        CreatedEntities {
            problem_ids: self.problems.iter().map(|p| p.id).collect(),
            board_member_ids: self.board_members.iter().map(|m| m.id).collect(),
            prediction_ids: self.predictions.iter().map(|p| p.id).collect(),
            trigger_ids: self.triggers.iter().map(|t| t.id).collect(),
            portfolio_version_id: self.portfolio_version.as_ref().map(|v| v.id),
        }
    }
}

/// Identifiers of everything a finalize wrote.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CreatedEntities {
    #[serde(default)]
    pub problem_ids: Vec<Uuid>,
    #[serde(default)]
    pub board_member_ids: Vec<Uuid>,
    #[serde(default)]
    pub prediction_ids: Vec<Uuid>,
    #[serde(default)]
    pub trigger_ids: Vec<Uuid>,
    #[serde(default)]
    pub portfolio_version_id: Option<Uuid>,
}

#[async_trait]
pub trait EntityRepository: Send + Sync {
    /// Writes every entity in `batch` or none of them.
    async fn commit(&self, batch: &EntityBatch) -> anyhow::Result<CreatedEntities>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CommittedBatch {
    committed_at: DateTime<Utc>,
    batch: EntityBatch,
}

/// The current state of someone's portfolio, folded from every commit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Portfolio {
    pub problems: Vec<Problem>,
    pub board_members: Vec<BoardMember>,
    pub predictions: Vec<Prediction>,
    pub triggers: Vec<Trigger>,
    pub health: Option<PortfolioHealth>,
}

impl Portfolio {
    /// Folds one commit in. A setup replaces the problems, board and
    /// triggers it defines; predictions always carry over.
    pub fn apply(&mut self, batch: &EntityBatch) {
        if batch.kind == WorkflowKind::Setup {
            self.problems = batch.problems.clone();
            self.board_members = batch.board_members.clone();
            self.triggers = batch.triggers.clone();
        } else {
            upsert(&mut self.problems, &batch.problems, |p| p.id);
            upsert(&mut self.board_members, &batch.board_members, |m| m.id);
            upsert(&mut self.triggers, &batch.triggers, |t| t.id);
        }
        upsert(&mut self.predictions, &batch.predictions, |p| p.id);
        if let Some(version) = &batch.portfolio_version {
            self.health = Some(version.health.clone());
        }
    }

    /// The bet the next review should judge: the oldest expired one still
    /// waiting for an outcome, otherwise the newest open one.
    pub fn evaluable_prediction(&self) -> Option<&Prediction> {
        self.predictions
            .iter()
            .find(|p| p.status == PredictionStatus::Expired)
            .or_else(|| {
                self.predictions
                    .iter()
                    .rev()
                    .find(|p| p.status == PredictionStatus::Open)
            })
    }
}

fn upsert<T: Clone>(existing: &mut Vec<T>, incoming: &[T], id: impl Fn(&T) -> Uuid) {
    for item in incoming {
        match existing.iter_mut().find(|e| id(e) == id(item)) {
            Some(slot) => *slot = item.clone(),
            None => existing.push(item.clone()),
        }
    }
}

/// One JSON file per finalized session under the layout's entities dir.
#[derive(Debug, Clone)]
pub struct FileEntityRepository {
    layout: DataLayout,
}

impl FileEntityRepository {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    pub fn load_portfolio(&self) -> anyhow::Result<Portfolio> {
        let dir = self.layout.entities_dir();
        let mut commits = Vec::new();
        if dir.exists() {
            for entry in
                fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))?
            {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let data = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                let commit: CommittedBatch = serde_json::from_str(&data)
                    .with_context(|| format!("parse entity batch {}", path.display()))?;
                commits.push(commit);
            }
        }
        commits.sort_by_key(|c| c.committed_at);
        let mut portfolio = Portfolio::default();
        for commit in &commits {
            portfolio.apply(&commit.batch);
        }
        Ok(portfolio)
    }
}

#[async_trait]
impl EntityRepository for FileEntityRepository {
    async fn commit(&self, batch: &EntityBatch) -> anyhow::Result<CreatedEntities> {
        let path = self.layout.entities_file(batch.session_id);
        let commit = CommittedBatch {
            committed_at: Utc::now(),
            batch: batch.clone(),
        };
        let data = serde_json::to_vec_pretty(&commit)?;
        write_atomic(&path, &data)?;
        Ok(batch.created())
    }
}

#[derive(Debug, Default)]
pub struct MemoryEntityRepository {
    commits: Mutex<Vec<EntityBatch>>,
    fail_next: Mutex<bool>,
}

impl MemoryEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn commits(&self) -> Vec<EntityBatch> {
        self.commits.lock().await.clone()
    }

    /// Makes the next commit fail without writing anything.
    pub async fn fail_next_commit(&self) {
        *self.fail_next.lock().await = true;
    }
}

#[async_trait]
impl EntityRepository for MemoryEntityRepository {
    async fn commit(&self, batch: &EntityBatch) -> anyhow::Result<CreatedEntities> {
        {
            let mut fail = self.fail_next.lock().await;
            if *fail {
                *fail = false;
                anyhow::bail!("entity repository unavailable");
            }
        }
        let mut commits = self.commits.lock().await;
        commits.retain(|c| c.session_id != batch.session_id);
        commits.push(batch.clone());
        Ok(batch.created())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoardRole;
    use pretty_assertions::assert_eq;

    fn batch_with_problem(name: &str) -> (EntityBatch, Problem) {
        let problem = Problem::named(name);
        let mut batch = EntityBatch::empty(SessionId::new(), WorkflowKind::Setup);
        batch.problems.push(problem.clone());
        (batch, problem)
    }

    #[tokio::test]
    async fn file_repository_folds_commits_into_portfolio() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileEntityRepository::new(DataLayout::new(dir.path().to_path_buf()));

        let (setup, mut problem) = batch_with_problem("Pricing");
        let created = repo.commit(&setup).await.expect("commit setup");
        assert_eq!(created.problem_ids, vec![problem.id]);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        problem.name = "Pricing strategy".into();
        let mut review = EntityBatch::empty(SessionId::new(), WorkflowKind::Quarterly);
        review.problems.push(problem.clone());
        review.predictions.push(Prediction::open("raise rates", "no client accepts"));
        repo.commit(&review).await.expect("commit review");

        let portfolio = repo.load_portfolio().expect("load");
        assert_eq!(portfolio.problems, vec![problem]);
        assert_eq!(
            portfolio.evaluable_prediction().map(|p| p.status),
            Some(PredictionStatus::Open)
        );
    }

    fn setup_batch(names: &[&str]) -> EntityBatch {
        let mut batch = EntityBatch::empty(SessionId::new(), WorkflowKind::Setup);
        for name in names {
            batch.problems.push(Problem::named(*name));
        }
        batch.board_members = BoardRole::core()
            .map(|role| BoardMember::seat(role, true))
            .collect();
        batch.triggers = Trigger::standard_set(Utc::now());
        batch
    }

    #[tokio::test]
    async fn a_second_setup_replaces_the_portfolio_but_keeps_bets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let repo = FileEntityRepository::new(DataLayout::new(dir.path().to_path_buf()));

        repo.commit(&setup_batch(&["A", "B", "C"])).await.expect("first setup");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut review = EntityBatch::empty(SessionId::new(), WorkflowKind::Quarterly);
        let bet = Prediction::open("ship the pricing page", "no signups in a month");
        review.predictions.push(bet.clone());
        repo.commit(&review).await.expect("review");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let resetup = setup_batch(&["X", "Y", "Z"]);
        repo.commit(&resetup).await.expect("second setup");

        let portfolio = repo.load_portfolio().expect("load");
        let names: Vec<&str> = portfolio.problems.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["X", "Y", "Z"]);
        assert_eq!(portfolio.board_members, resetup.board_members);
        assert_eq!(portfolio.triggers, resetup.triggers);
        assert_eq!(portfolio.predictions, vec![bet]);
    }

    #[test]
    fn expired_bets_are_offered_before_newer_open_ones() {
        let mut older = Prediction::open("hire a lead", "no offer by June");
        older.status = PredictionStatus::Expired;
        let judged = Prediction {
            status: PredictionStatus::Correct,
            ..Prediction::open("drop the legacy client", "they renew")
        };
        let newer = Prediction::open("launch in Spain", "no paying user by Q3");
        let mut portfolio = Portfolio {
            predictions: vec![judged, older.clone(), newer.clone()],
            ..Portfolio::default()
        };
        assert_eq!(portfolio.evaluable_prediction(), Some(&older));

        portfolio.predictions[1].status = PredictionStatus::Wrong;
        assert_eq!(portfolio.evaluable_prediction(), Some(&newer));
    }

    #[tokio::test]
    async fn memory_repository_commit_is_idempotent_per_session() {
        let repo = MemoryEntityRepository::new();
        let (batch, _) = batch_with_problem("Hiring");
        repo.commit(&batch).await.expect("first");
        repo.commit(&batch).await.expect("retry");
        assert_eq!(repo.commits().await.len(), 1);

        repo.fail_next_commit().await;
        assert!(repo.commit(&batch).await.is_err());
        assert_eq!(repo.commits().await.len(), 1);
    }
}
