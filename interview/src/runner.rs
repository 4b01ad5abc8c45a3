//! Drives one interview session: answers in, transitions out, every change
//! persisted before it becomes visible.

use crate::error::InterviewError;
use crate::gate::GateContext;
use crate::gate::GateError;
use crate::gate::VaguenessGate;
use crate::report::ReportGenerator;
use crate::repository::EntityRepository;
use crate::session::SessionData;
use crate::session::SessionId;
use crate::session::WorkflowKind;
use crate::state::InterviewState;
use crate::store::SessionRecord;
use crate::store::SessionStore;
use crate::transcript::QuestionAnswer;
use crate::workflow::Workflow;
use crate::workflow::WorkflowSession;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// External services a runner talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn SessionStore>,
    pub gate: Arc<dyn VaguenessGate>,
    pub reports: Arc<dyn ReportGenerator>,
    pub repository: Arc<dyn EntityRepository>,
    /// Delete the snapshot when a session is abandoned.
    pub purge_abandoned: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionLifecycle {
    Idle,
    Active,
    Finalizing,
    Finalized,
    Abandoned,
}

/// Snapshot published to whatever renders the interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub session_id: SessionId,
    pub kind: WorkflowKind,
    pub lifecycle: SessionLifecycle,
    pub state: &'static str,
    pub display_name: &'static str,
    pub progress_percent: u8,
    pub question_number: Option<u8>,
    pub question_text: Option<String>,
    pub can_skip: bool,
    pub error: Option<String>,
    pub is_processing: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome<S> {
    pub state: S,
    /// Text of the question now waiting for an answer.
    pub prompt: Option<String>,
    /// Suggestion from the gate when the answer needs a concrete example.
    pub follow_up: Option<String>,
    pub warnings: Vec<String>,
    /// Set when the vagueness gate was unreachable and the answer was taken
    /// as given.
    pub notice: Option<InterviewError>,
    pub finalized: bool,
}

impl<S> SubmitOutcome<S> {
    fn new(state: S) -> Self {
        Self {
            state,
            prompt: None,
            follow_up: None,
            warnings: Vec::new(),
            notice: None,
            finalized: false,
        }
    }
}

enum Judgement {
    Concrete,
    Vague(Option<String>),
    Degraded(String),
}

pub struct SessionRunner<W: Workflow> {
    id: SessionId,
    user_id: String,
    session: WorkflowSession<W>,
    deps: Collaborators,
    view_tx: watch::Sender<SessionView>,
}

impl<W: Workflow> SessionRunner<W> {
    /// Creates and persists a new session, then moves it to its first
    /// question.
    pub async fn start(
        deps: Collaborators,
        user_id: impl Into<String>,
        seed: W::Seed,
    ) -> Result<Self, InterviewError> {
        let user_id = user_id.into();
        let existing = deps
            .store
            .find_active(&user_id, W::KIND)
            .await
            .map_err(|err| InterviewError::PersistenceReadFailed(format!("{err:#}")))?;
        if let Some(session_id) = existing {
            return Err(InterviewError::AlreadyInProgress {
                kind: W::KIND,
                session_id,
            });
        }

        let mut runner = Self::assemble(
            SessionId::new(),
            user_id,
            SessionData::new(W::initial_data(seed)),
            deps,
        );
        runner.commit(runner.session.clone()).await?;
        info!(session_id = %runner.id, kind = %W::KIND, user = %runner.user_id, "session started");
        runner.enter_first_question().await?;
        Ok(runner)
    }

    /// Loads the last persisted snapshot of `id`.
    pub async fn resume(deps: Collaborators, id: SessionId) -> Result<Self, InterviewError> {
        let record = deps
            .store
            .load(id)
            .await
            .map_err(|err| InterviewError::PersistenceReadFailed(format!("{err:#}")))?
            .ok_or(InterviewError::NotFound(id))?;
        let actual = record.kind();
        let user_id = record.user_id;
        let session = W::from_payload(record.payload).ok_or(InterviewError::WorkflowMismatch {
            session_id: id,
            expected: W::KIND,
            actual,
        })?;
        let mut runner = Self::assemble(id, user_id, session, deps);
        info!(session_id = %id, kind = %W::KIND, state = runner.state().tag(), "session resumed");
        runner.enter_first_question().await?;
        Ok(runner)
    }

    fn assemble(
        id: SessionId,
        user_id: String,
        session: WorkflowSession<W>,
        deps: Collaborators,
    ) -> Self {
        let view = build_view::<W>(id, &session, None, false);
        let (view_tx, _) = watch::channel(view);
        Self {
            id,
            user_id,
            session,
            deps,
            view_tx,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn state(&self) -> W::State {
        self.session.current_state
    }

    pub fn session(&self) -> &WorkflowSession<W> {
        &self.session
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        lifecycle_of(self.session.current_state)
    }

    pub fn view(&self) -> SessionView {
        self.view_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// Accepts an answer to the current question or clarification.
    pub async fn submit_answer(
        &mut self,
        answer: &str,
    ) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let result = self.submit_inner(answer.trim()).await;
        self.publish_result(&result);
        result
    }

    /// Moves past a clarification with the original answer as given.
    pub async fn skip(&mut self) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let result = self.skip_inner().await;
        self.publish_result(&result);
        result
    }

    /// Generates the report and commits entities. Runs on its own when the
    /// last answer lands; call it again after a failure.
    pub async fn finalize(&mut self) -> Result<(), InterviewError> {
        let result = self.finalize_inner().await;
        self.publish_result(&result);
        result
    }

    pub async fn abandon(&mut self) -> Result<(), InterviewError> {
        let result = self.abandon_inner().await;
        self.publish_result(&result);
        result
    }

    /// Applies a change to workflow data outside the question flow.
    pub async fn edit<F>(&mut self, change: F) -> Result<(), InterviewError>
    where
        F: FnOnce(&mut W::Data) -> Result<(), InterviewError>,
    {
        let result = self.edit_inner(change).await;
        self.publish_result(&result);
        result
    }

    async fn submit_inner(
        &mut self,
        answer: &str,
    ) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let state = self.ensure_answerable()?;
        if answer.is_empty() {
            return Err(InterviewError::invalid_field("answer", "an answer is required"));
        }
        if state.is_clarify() {
            self.submit_example(state, answer).await
        } else {
            self.submit_to_question(state, answer).await
        }
    }

    async fn submit_to_question(
        &mut self,
        state: W::State,
        answer: &str,
    ) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let question = W::question_text(&self.session, state);
        let qa = QuestionAnswer::new(state, question.clone(), answer)
            .with_attribution(W::attribution(&self.session, state));

        // Parse before asking the gate so malformed answers fail fast.
        let mut accepted = self.session.clone();
        accepted.transcript.push(qa.clone());
        let warnings = W::accumulate(&mut accepted, state, answer)?;

        let mut outcome = SubmitOutcome::new(state);
        if state.requires_vagueness_check() {
            match self.judge(state, question, answer).await? {
                Judgement::Vague(suggestion) => {
                    let clarify = state.clarify_state().ok_or_else(|| {
                        InterviewError::InvalidSessionState(format!(
                            "{} has no clarification step",
                            state.display_name()
                        ))
                    })?;
                    let mut pending = self.session.clone();
                    pending.transcript.push(QuestionAnswer {
                        was_vague: true,
                        ..qa
                    });
                    pending.current_state = clarify;
                    self.commit(pending).await?;
                    outcome.state = clarify;
                    outcome.prompt = Some(W::question_text(&self.session, clarify));
                    outcome.follow_up = suggestion;
                    return Ok(outcome);
                }
                Judgement::Degraded(reason) => {
                    outcome.notice = Some(InterviewError::VaguenessGateUnavailable(reason));
                }
                Judgement::Concrete => {}
            }
        }

        outcome.warnings = warnings;
        self.advance(accepted, state, outcome).await
    }

    async fn submit_example(
        &mut self,
        clarify: W::State,
        example: &str,
    ) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let parent = parent_of(clarify)?;
        let question = W::question_text(&self.session, clarify);
        let mut outcome = SubmitOutcome::new(clarify);
        match self.judge(parent, question, example).await? {
            Judgement::Vague(suggestion) => {
                outcome.prompt = Some(W::question_text(&self.session, clarify));
                outcome.follow_up = suggestion;
                return Ok(outcome);
            }
            Judgement::Degraded(reason) => {
                outcome.notice = Some(InterviewError::VaguenessGateUnavailable(reason));
            }
            Judgement::Concrete => {}
        }

        let mut next = self.session.clone();
        let original = {
            let qa = next.last_answer_mut(parent).ok_or_else(|| {
                InterviewError::InvalidSessionState("no answer is waiting for an example".into())
            })?;
            qa.concrete_example = Some(example.to_string());
            qa.answer.clone()
        };
        outcome.warnings = W::accumulate(&mut next, parent, &original)?;
        self.advance(next, parent, outcome).await
    }

    async fn skip_inner(&mut self) -> Result<SubmitOutcome<W::State>, InterviewError> {
        let state = self.ensure_answerable()?;
        if !state.is_clarify() {
            return Err(InterviewError::InvalidSessionState(
                "skip is only available while a concrete example is requested".to_string(),
            ));
        }
        let parent = parent_of(state)?;
        let mut next = self.session.clone();
        if !next.record_skip() {
            return Err(InterviewError::invalid_field(
                "vagueness_skip_count",
                "you have used both skips; give a concrete example to continue",
            ));
        }
        let original = {
            let qa = next.last_answer_mut(parent).ok_or_else(|| {
                InterviewError::InvalidSessionState("no answer is waiting for an example".into())
            })?;
            qa.skipped = true;
            qa.answer.clone()
        };
        let mut outcome = SubmitOutcome::new(state);
        outcome.warnings = W::accumulate(&mut next, parent, &original)?;
        debug!(session_id = %self.id, skips = next.vagueness_skip_count, "clarification skipped");
        self.advance(next, parent, outcome).await
    }

    /// Routes past `answered`, persists, and finalizes when the interview is
    /// out of questions.
    async fn advance(
        &mut self,
        mut next: WorkflowSession<W>,
        answered: W::State,
        mut outcome: SubmitOutcome<W::State>,
    ) -> Result<SubmitOutcome<W::State>, InterviewError> {
        next.current_state = W::route(&next, answered);
        self.commit(next).await?;
        if self.session.current_state.is_generating() {
            self.finalize_inner().await?;
            outcome.finalized = true;
        }
        let state = self.session.current_state;
        outcome.state = state;
        if state.is_question() || state.is_clarify() {
            outcome.prompt = Some(W::question_text(&self.session, state));
        }
        Ok(outcome)
    }

    async fn finalize_inner(&mut self) -> Result<(), InterviewError> {
        let state = self.session.current_state;
        if !state.is_generating() {
            return Err(InterviewError::InvalidSessionState(format!(
                "cannot finalize from \"{}\"",
                state.display_name()
            )));
        }
        let request = W::report_request(&self.session);
        self.set_processing(true);
        let generated = self.deps.reports.generate(&request).await;
        self.set_processing(false);
        self.ensure_still_open().await?;
        let markdown = generated
            .map_err(|err| InterviewError::ExternalGenerationFailed(format!("{err:#}")))?;

        let batch = W::entity_batch(&self.session, self.id);
        let created = self
            .deps
            .repository
            .commit(&batch)
            .await
            .map_err(|err| InterviewError::ExternalGenerationFailed(format!("{err:#}")))?;

        let mut next = self.session.clone();
        next.output_markdown = Some(markdown);
        next.created = created;
        next.current_state = state.next_state();
        self.commit(next).await?;
        info!(session_id = %self.id, kind = %W::KIND, "session finalized");
        Ok(())
    }

    async fn abandon_inner(&mut self) -> Result<(), InterviewError> {
        if self.session.is_terminal() {
            return Err(InterviewError::InvalidSessionState(
                "the session has already ended".to_string(),
            ));
        }
        let mut next = self.session.clone();
        next.current_state = W::State::ABANDONED;
        self.commit(next).await?;
        if self.deps.purge_abandoned {
            self.deps
                .store
                .purge(self.id)
                .await
                .map_err(|err| InterviewError::PersistenceWriteFailed(format!("{err:#}")))?;
        }
        info!(session_id = %self.id, purged = self.deps.purge_abandoned, "session abandoned");
        Ok(())
    }

    async fn edit_inner<F>(&mut self, change: F) -> Result<(), InterviewError>
    where
        F: FnOnce(&mut W::Data) -> Result<(), InterviewError>,
    {
        if self.session.is_terminal() {
            return Err(InterviewError::InvalidSessionState(
                "the session has already ended".to_string(),
            ));
        }
        let mut next = self.session.clone();
        change(&mut next.workflow)?;
        self.commit(next).await
    }

    /// Sessions restored at `initial` (fresh, or decoded from an unknown
    /// tag) move on to their first question.
    async fn enter_first_question(&mut self) -> Result<(), InterviewError> {
        if self.session.current_state != W::State::INITIAL {
            return Ok(());
        }
        let mut next = self.session.clone();
        next.current_state = W::route(&next, W::State::INITIAL);
        self.commit(next).await
    }

    fn ensure_answerable(&self) -> Result<W::State, InterviewError> {
        let state = self.session.current_state;
        if state.is_question() || state.is_clarify() {
            Ok(state)
        } else {
            Err(InterviewError::InvalidSessionState(format!(
                "\"{}\" is not waiting for an answer",
                state.display_name()
            )))
        }
    }

    async fn judge(
        &mut self,
        state: W::State,
        question: String,
        answer: &str,
    ) -> Result<Judgement, InterviewError> {
        let context = GateContext {
            kind: W::KIND,
            state_tag: state.tag(),
            question,
        };
        self.set_processing(true);
        let verdict = self.deps.gate.evaluate(answer, &context).await;
        self.set_processing(false);
        self.ensure_still_open().await?;
        match verdict {
            Ok(verdict) if verdict.is_vague => {
                Ok(Judgement::Vague(verdict.concrete_example_suggestion))
            }
            Ok(_) => Ok(Judgement::Concrete),
            Err(GateError::Unavailable(reason)) => {
                warn!(session_id = %self.id, %reason, "vagueness gate unavailable; accepting answer");
                Ok(Judgement::Degraded(reason))
            }
            Err(GateError::Failed(reason)) => Err(InterviewError::GateCallFailed(reason)),
        }
    }

    /// Rejects results that arrive after the session ended elsewhere.
    async fn ensure_still_open(&mut self) -> Result<(), InterviewError> {
        let stored = self
            .deps
            .store
            .load(self.id)
            .await
            .map_err(|err| InterviewError::PersistenceReadFailed(format!("{err:#}")))?
            .and_then(|record| W::from_payload(record.payload));
        let ended = match stored {
            Some(stored) if stored.is_terminal() => {
                self.session = stored;
                true
            }
            Some(_) => false,
            None => {
                self.session.current_state = W::State::ABANDONED;
                true
            }
        };
        if ended {
            debug!(session_id = %self.id, "discarding result for a session that has ended");
            return Err(InterviewError::InvalidSessionState(
                "the session ended while waiting for a response".to_string(),
            ));
        }
        Ok(())
    }

    /// Persists `next`, then makes it the current session and publishes it.
    async fn commit(&mut self, next: WorkflowSession<W>) -> Result<(), InterviewError> {
        let from = self.session.current_state;
        let record = SessionRecord::new(
            self.id,
            self.user_id.clone(),
            W::into_payload(next.clone()),
        );
        if let Err(err) = self.deps.store.save(&record).await {
            warn!(session_id = %self.id, error = %format!("{err:#}"), "failed to persist session");
            return Err(InterviewError::PersistenceWriteFailed(format!("{err:#}")));
        }
        debug!(
            session_id = %self.id,
            from = from.tag(),
            to = next.current_state.tag(),
            "session transition"
        );
        self.session = next;
        self.view_tx
            .send_replace(build_view::<W>(self.id, &self.session, None, false));
        Ok(())
    }

    fn set_processing(&self, processing: bool) {
        self.view_tx
            .send_modify(|view| view.is_processing = processing);
    }

    fn publish_result<T>(&self, result: &Result<T, InterviewError>) {
        let error = result.as_ref().err().map(InterviewError::user_message);
        self.view_tx
            .send_replace(build_view::<W>(self.id, &self.session, error, false));
    }
}

fn parent_of<S: InterviewState>(clarify: S) -> Result<S, InterviewError> {
    clarify.parent_question_state().ok_or_else(|| {
        InterviewError::InvalidSessionState(format!(
            "\"{}\" is not a clarification",
            clarify.display_name()
        ))
    })
}

fn lifecycle_of<S: InterviewState>(state: S) -> SessionLifecycle {
    if state == S::FINALIZED {
        SessionLifecycle::Finalized
    } else if state == S::ABANDONED {
        SessionLifecycle::Abandoned
    } else if state.is_generating() {
        SessionLifecycle::Finalizing
    } else if state == S::INITIAL {
        SessionLifecycle::Idle
    } else {
        SessionLifecycle::Active
    }
}

fn build_view<W: Workflow>(
    id: SessionId,
    session: &WorkflowSession<W>,
    error: Option<String>,
    is_processing: bool,
) -> SessionView {
    let state = session.current_state;
    let answerable = state.is_question() || state.is_clarify();
    let numbered = state.parent_question_state().unwrap_or(state);
    SessionView {
        session_id: id,
        kind: W::KIND,
        lifecycle: lifecycle_of(state),
        state: state.tag(),
        display_name: state.display_name(),
        progress_percent: W::progress_percent(session, state),
        question_number: answerable.then(|| numbered.question_number()),
        question_text: answerable.then(|| W::question_text(session, state)),
        can_skip: state.is_clarify() && session.can_skip(),
        error,
        is_processing,
    }
}
