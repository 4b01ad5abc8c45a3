use async_trait::async_trait;
use boardroom_interview::BoardMember;
use boardroom_interview::BoardRole;
use boardroom_interview::Collaborators;
use boardroom_interview::DataLayout;
use boardroom_interview::Direction;
use boardroom_interview::FileSessionStore;
use boardroom_interview::GateContext;
use boardroom_interview::GateError;
use boardroom_interview::InterviewError;
use boardroom_interview::MarkdownReportGenerator;
use boardroom_interview::MemoryEntityRepository;
use boardroom_interview::MemorySessionStore;
use boardroom_interview::Prediction;
use boardroom_interview::PredictionStatus;
use boardroom_interview::Problem;
use boardroom_interview::SessionLifecycle;
use boardroom_interview::SessionPayload;
use boardroom_interview::SessionRunner;
use boardroom_interview::SessionStore;
use boardroom_interview::Trigger;
use boardroom_interview::VaguenessGate;
use boardroom_interview::VaguenessVerdict;
use boardroom_interview::state::InterviewState;
use boardroom_interview::state::QuarterlyState;
use boardroom_interview::state::QuickState;
use boardroom_interview::state::SetupState;
use boardroom_interview::validation::AllocationBand;
use boardroom_interview::workflow::QuarterlyReview;
use boardroom_interview::workflow::QuarterlySeed;
use boardroom_interview::workflow::QuickAudit;
use boardroom_interview::workflow::SetupSeed;
use boardroom_interview::workflow::SetupWizard;
use chrono::Utc;
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Answers verdicts from a script, then treats everything as concrete.
#[derive(Default)]
struct ScriptedGate {
    script: Mutex<VecDeque<Result<VaguenessVerdict, GateError>>>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedGate {
    fn with(script: Vec<Result<VaguenessVerdict, GateError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn vague() -> Result<VaguenessVerdict, GateError> {
        Ok(VaguenessVerdict::vague("Give one specific example."))
    }
}

#[async_trait]
impl VaguenessGate for ScriptedGate {
    async fn evaluate(
        &self,
        _answer: &str,
        context: &GateContext,
    ) -> Result<VaguenessVerdict, GateError> {
        self.calls.lock().await.push(context.state_tag);
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Ok(VaguenessVerdict::concrete()))
    }
}

struct Harness {
    deps: Collaborators,
    store: Arc<MemorySessionStore>,
    repository: Arc<MemoryEntityRepository>,
}

fn harness(gate: Arc<dyn VaguenessGate>) -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    let repository = Arc::new(MemoryEntityRepository::new());
    Harness {
        deps: Collaborators {
            store: store.clone(),
            gate,
            reports: Arc::new(MarkdownReportGenerator::default()),
            repository: repository.clone(),
            purge_abandoned: false,
        },
        store,
        repository,
    }
}

#[tokio::test]
async fn quick_audit_happy_path_with_one_clarification() {
    let gate = ScriptedGate::with(vec![ScriptedGate::vague()]);
    let h = harness(gate.clone());
    let mut runner = SessionRunner::<QuickAudit>::start(h.deps.clone(), "ana", ())
        .await
        .expect("start");

    runner.submit_answer("no").await.expect("sensitivity");
    let outcome = runner
        .submit_answer("Staff engineer running the billing platform team")
        .await
        .expect("role");
    assert_eq!(outcome.state, QuickState::PaidProblems);

    let outcome = runner
        .submit_answer("various things")
        .await
        .expect("vague answer");
    assert_eq!(outcome.state, QuickState::PaidProblemsClarify);
    assert_eq!(outcome.follow_up.as_deref(), Some("Give one specific example."));
    assert!(runner.view().can_skip);
    assert_eq!(runner.view().question_number, Some(2));

    let outcome = runner
        .submit_answer("Migrated 40 enterprise invoices off the legacy ledger in March")
        .await
        .expect("example");
    assert_eq!(outcome.state, QuickState::DirectionLoop);

    runner
        .submit_answer("Ledger work is shrinking as vendors take it over")
        .await
        .expect("direction");
    runner
        .submit_answer("Telling my manager I want to leave the on-call rotation")
        .await
        .expect("avoided");
    let outcome = runner
        .submit_answer("Polishing dashboards nobody reads, about 4 hours a week")
        .await
        .expect("comfort");

    assert!(outcome.finalized);
    assert_eq!(runner.state(), QuickState::Finalized);
    assert_eq!(runner.view().progress_percent, 100);
    assert_eq!(runner.lifecycle(), SessionLifecycle::Finalized);

    let session = runner.session();
    let paid = &session.transcript[2];
    assert!(paid.was_vague);
    assert_eq!(
        paid.concrete_example.as_deref(),
        Some("Migrated 40 enterprise invoices off the legacy ledger in March")
    );
    let report = session.output_markdown.as_deref().expect("report");
    assert!(report.starts_with("# Quick audit"));
    assert!(report.contains("Example: Migrated 40 enterprise invoices"));
    assert_eq!(h.repository.commits().await.len(), 1);
    assert_eq!(
        gate.calls.lock().await.clone(),
        vec![
            "paid_problems",
            "paid_problems",
            "direction_loop",
            "avoided_decision",
            "comfort_work"
        ]
    );
}

#[tokio::test]
async fn skip_budget_runs_out_after_two() {
    let gate = ScriptedGate::with(vec![
        ScriptedGate::vague(),
        ScriptedGate::vague(),
        ScriptedGate::vague(),
    ]);
    let h = harness(gate);
    let mut runner = SessionRunner::<QuickAudit>::start(h.deps, "ana", ())
        .await
        .expect("start");
    runner.submit_answer("yes").await.expect("sensitivity");
    runner.submit_answer("Product manager").await.expect("role");

    runner.submit_answer("stuff").await.expect("vague 1");
    let outcome = runner.skip().await.expect("skip 1");
    assert_eq!(outcome.state, QuickState::DirectionLoop);

    runner.submit_answer("depends").await.expect("vague 2");
    runner.skip().await.expect("skip 2");
    assert_eq!(runner.session().vagueness_skip_count, 2);

    let outcome = runner.submit_answer("not sure").await.expect("vague 3");
    assert_eq!(outcome.state, QuickState::AvoidedDecisionClarify);
    assert!(!runner.view().can_skip);
    assert!(matches!(
        runner.skip().await,
        Err(InterviewError::ValidationFailed(_))
    ));
    assert_eq!(runner.state(), QuickState::AvoidedDecisionClarify);

    let outcome = runner
        .submit_answer("I have not told the CFO the 2025 roadmap slips by a quarter")
        .await
        .expect("example");
    assert_eq!(outcome.state, QuickState::ComfortWork);
    assert_eq!(runner.session().vagueness_skip_count, 2);
    let skipped: Vec<_> = runner
        .session()
        .transcript
        .iter()
        .filter(|qa| qa.skipped)
        .map(|qa| qa.state)
        .collect();
    assert_eq!(
        skipped,
        vec![QuickState::PaidProblems, QuickState::DirectionLoop]
    );
}

async fn answer_problem(
    runner: &mut SessionRunner<SetupWizard>,
    name: &str,
    direction: &str,
) -> SetupState {
    for answer in [
        name,
        "Quarter-end close slips by three days and finance escalates",
        "Two recruiters called about this in May\nContract rates rose 15% this year",
        "Vendors ship AI reconciliation\nA wrong close costs us an audit finding",
        direction,
    ] {
        runner.submit_answer(answer).await.expect("problem answer");
    }
    runner.state()
}

#[tokio::test]
async fn setup_wizard_bands_allocation_and_publishes_entities() {
    let h = harness(ScriptedGate::with(Vec::new()));
    let mut runner = SessionRunner::<SetupWizard>::start(h.deps.clone(), "ana", SetupSeed::default())
        .await
        .expect("start");
    runner.submit_answer("no").await.expect("sensitivity");

    assert_eq!(
        answer_problem(&mut runner, "Month-end close", "appreciating: more regulation").await,
        SetupState::ProblemName
    );
    assert_eq!(
        answer_problem(&mut runner, "Vendor contracts", "stable").await,
        SetupState::ProblemName
    );
    assert_eq!(
        answer_problem(&mut runner, "Spreadsheet audits", "down: automated away").await,
        SetupState::ProblemAddAnother
    );
    runner.submit_answer("no").await.expect("no more problems");
    assert_eq!(runner.state(), SetupState::TimeAllocation);

    let rejected = runner.submit_answer("20 20 20").await;
    assert!(matches!(rejected, Err(InterviewError::ValidationFailed(_))));
    assert_eq!(runner.state(), SetupState::TimeAllocation);

    let outcome = runner.submit_answer("40, 40, 10").await.expect("warning band");
    assert_eq!(outcome.state, SetupState::HealthRisk);
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("90%"));
    assert_eq!(
        runner.session().workflow.allocation_band,
        Some(AllocationBand::Warning)
    );

    runner
        .edit(|data| data.set_allocations(&[33, 33, 34]).map(|_| ()))
        .await
        .expect("adjust allocation");
    assert_eq!(
        runner.session().workflow.allocation_band,
        Some(AllocationBand::Valid)
    );

    runner
        .submit_answer("Close automation lands before I have moved on")
        .await
        .expect("risk");
    runner
        .submit_answer("Lead the controls rollout for 3 new entities")
        .await
        .expect("opportunity");
    runner
        .submit_answer("avoidance: 3")
        .await
        .expect("anchoring");
    runner
        .submit_answer("devil's advocate: Uncle Joe")
        .await
        .expect("personas");
    let outcome = runner.submit_answer("none").await.expect("triggers");

    assert!(outcome.finalized);
    assert_eq!(runner.state(), SetupState::Finalized);
    let commits = h.repository.commits().await;
    assert_eq!(commits.len(), 1);
    let batch = &commits[0];
    assert_eq!(batch.problems.len(), 3);
    assert_eq!(batch.board_members.len(), 7);
    assert!(batch.board_members.iter().all(|m| m.is_active));
    assert_eq!(batch.triggers.len(), 5);
    let version = batch.portfolio_version.as_ref().expect("portfolio version");
    assert_eq!(version.health.appreciating_percent, 33);
    assert_eq!(version.health.depreciating_percent, 34);
    let avoidance = batch
        .board_members
        .iter()
        .find(|m| m.role == BoardRole::Avoidance)
        .expect("avoidance seat");
    assert_eq!(avoidance.anchored_problem_id, Some(batch.problems[2].id));
    assert_eq!(
        runner.session().created.problem_ids,
        batch.problems.iter().map(|p| p.id).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn setup_problem_block_stops_at_five() {
    let h = harness(ScriptedGate::with(Vec::new()));
    let mut runner = SessionRunner::<SetupWizard>::start(h.deps, "ana", SetupSeed::default())
        .await
        .expect("start");
    runner.submit_answer("no").await.expect("sensitivity");
    for i in 0..3 {
        answer_problem(&mut runner, &format!("Problem {i}"), "stable").await;
    }
    runner.submit_answer("yes").await.expect("fourth");
    answer_problem(&mut runner, "Fourth", "stable").await;
    runner.submit_answer("yes").await.expect("fifth");
    let next = answer_problem(&mut runner, "Fifth", "stable").await;
    assert_eq!(next, SetupState::TimeAllocation);
    assert_eq!(runner.session().workflow.problems.len(), 5);

    runner
        .edit(|data| data.remove_problem(4).map(|_| ()))
        .await
        .expect("remove fifth");
    runner
        .edit(|data| data.remove_problem(3).map(|_| ()))
        .await
        .expect("remove fourth");
    assert!(matches!(
        runner.edit(|data| data.remove_problem(0).map(|_| ())).await,
        Err(InterviewError::ValidationFailed(_))
    ));
    assert_eq!(runner.session().workflow.problems.len(), 3);
}

fn quarterly_seed(last_bet: Prediction) -> QuarterlySeed {
    let problems = ["Close", "Contracts", "Audits"]
        .into_iter()
        .map(|name| Problem {
            what_breaks: "Work stalls".into(),
            scarcity_signals: vec!["a".into(), "b".into()],
            direction: Some(Direction::Stable),
            time_allocation_percent: 33,
            ..Problem::named(name)
        })
        .collect();
    QuarterlySeed {
        problems,
        board: vec![
            BoardMember::seat(BoardRole::Accountability, true),
            BoardMember::seat(BoardRole::MarketReality, true),
        ],
        triggers: Trigger::standard_set(Utc::now()),
        last_bet: Some(last_bet),
        health: None,
        bet_horizon_days: 90,
    }
}

#[tokio::test]
async fn quarterly_review_judges_an_expired_bet() {
    let mut bet = Prediction::open("Close automation ships by June", "it slips to Q4");
    bet.evaluate(PredictionStatus::Expired, Utc::now())
        .expect("open bets can expire");
    let bet_id = bet.id;

    let h = harness(ScriptedGate::with(Vec::new()));
    let mut runner =
        SessionRunner::<QuarterlyReview>::start(h.deps.clone(), "ana", quarterly_seed(bet))
            .await
            .expect("start");
    runner.submit_answer("yes").await.expect("sensitivity");
    assert_eq!(runner.state(), QuarterlyState::LastBetEvaluation);
    runner
        .submit_answer("correct: it shipped on June 12")
        .await
        .expect("evaluation");

    for answer in [
        "Promised two automations, shipped one on May 3",
        "Moving the audit team to the new tool",
        "Rewrote the same slide deck three times",
        "1: appreciating regulators added two controls",
        "improving, more leverage than last quarter",
        "Documented the close runbook and trained 2 people",
        "Offered to lead the ERP migration in October",
    ] {
        runner.submit_answer(answer).await.expect("answer");
    }
    assert_eq!(runner.state(), QuarterlyState::BoardInterrogation);
    assert_eq!(runner.view().question_number, Some(9));
    runner
        .submit_answer("Missed the May audit deadline by 4 days")
        .await
        .expect("accountability");
    assert_eq!(runner.state(), QuarterlyState::BoardInterrogation);
    runner
        .submit_answer("Three peers got offers above 180k")
        .await
        .expect("market reality");
    assert_eq!(runner.state(), QuarterlyState::TriggerCheck);
    runner.submit_answer("4").await.expect("triggers");
    let outcome = runner
        .submit_answer("I lead the ERP migration by October wrong if nobody asks me by August")
        .await
        .expect("next bet");
    assert!(outcome.finalized);

    let commits = h.repository.commits().await;
    let batch = &commits[0];
    assert_eq!(batch.predictions.len(), 2);
    let judged = &batch.predictions[0];
    assert_eq!(judged.id, bet_id);
    assert_eq!(judged.status, PredictionStatus::Correct);
    assert_eq!(judged.evaluation_session_id, Some(*runner.id().as_uuid()));
    assert_eq!(batch.predictions[1].status, PredictionStatus::Open);
    assert_eq!(batch.problems[0].direction, Some(Direction::Appreciating));
    assert!(batch.triggers[3].is_met);

    let roles: Vec<_> = runner
        .session()
        .answers_for(QuarterlyState::BoardInterrogation)
        .map(|qa| qa.role)
        .collect();
    assert_eq!(
        roles,
        vec![Some(BoardRole::Accountability), Some(BoardRole::MarketReality)]
    );

    let mut judged = judged.clone();
    assert!(judged.evaluate(PredictionStatus::Wrong, Utc::now()).is_err());
}

#[tokio::test]
async fn one_active_session_per_kind() {
    let h = harness(ScriptedGate::with(Vec::new()));
    let first = SessionRunner::<QuickAudit>::start(h.deps.clone(), "ana", ())
        .await
        .expect("start");
    let second = SessionRunner::<QuickAudit>::start(h.deps.clone(), "ana", ()).await;
    match second {
        Err(InterviewError::AlreadyInProgress { session_id, .. }) => {
            assert_eq!(session_id, first.id());
        }
        other => panic!("expected AlreadyInProgress, got {:?}", other.err()),
    }
    SessionRunner::<QuickAudit>::start(h.deps.clone(), "ben", ())
        .await
        .expect("other users are independent");
    SessionRunner::<SetupWizard>::start(h.deps.clone(), "ana", SetupSeed::default())
        .await
        .expect("other kinds are independent");
}

#[tokio::test]
async fn resume_continues_from_the_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(FileSessionStore::new(DataLayout::new(dir.path().to_path_buf())));
    let deps = Collaborators {
        store,
        gate: ScriptedGate::with(vec![ScriptedGate::vague()]),
        reports: Arc::new(MarkdownReportGenerator::default()),
        repository: Arc::new(MemoryEntityRepository::new()),
        purge_abandoned: false,
    };
    let id = {
        let mut runner = SessionRunner::<QuickAudit>::start(deps.clone(), "ana", ())
            .await
            .expect("start");
        runner.submit_answer("no").await.expect("sensitivity");
        runner.submit_answer("Analyst").await.expect("role");
        runner.submit_answer("things").await.expect("vague");
        runner.id()
    };

    let mut resumed = SessionRunner::<QuickAudit>::resume(deps.clone(), id)
        .await
        .expect("resume");
    assert_eq!(resumed.state(), QuickState::PaidProblemsClarify);
    assert_eq!(resumed.session().transcript.len(), 3);
    resumed.skip().await.expect("skip");
    assert_eq!(resumed.state(), QuickState::DirectionLoop);

    assert!(matches!(
        SessionRunner::<SetupWizard>::resume(deps.clone(), id).await,
        Err(InterviewError::WorkflowMismatch { .. })
    ));
    assert!(matches!(
        SessionRunner::<QuickAudit>::resume(deps, boardroom_interview::SessionId::new()).await,
        Err(InterviewError::NotFound(_))
    ));
}

#[tokio::test]
async fn failed_finalize_can_be_retried() {
    let h = harness(ScriptedGate::with(Vec::new()));
    let mut runner = SessionRunner::<QuickAudit>::start(h.deps.clone(), "ana", ())
        .await
        .expect("start");
    for answer in ["no", "Engineer", "Payments routing", "Growing", "Reorg", "Meetings"] {
        if runner.state() == QuickState::ComfortWork {
            h.repository.fail_next_commit().await;
        }
        let result = runner.submit_answer(answer).await;
        if answer == "Meetings" {
            assert!(matches!(
                result,
                Err(InterviewError::ExternalGenerationFailed(_))
            ));
        } else {
            result.expect("answer");
        }
    }
    assert_eq!(runner.state(), QuickState::Generating);
    assert_eq!(runner.lifecycle(), SessionLifecycle::Finalizing);
    assert!(runner.session().output_markdown.is_none());
    assert!(h.repository.commits().await.is_empty());

    runner.finalize().await.expect("retry");
    assert_eq!(runner.state(), QuickState::Finalized);
    assert_eq!(h.repository.commits().await.len(), 1);
}

/// Abandons the session through the store while the gate call is in flight.
struct AbandoningGate {
    store: Arc<MemorySessionStore>,
}

#[async_trait]
impl VaguenessGate for AbandoningGate {
    async fn evaluate(
        &self,
        _answer: &str,
        _context: &GateContext,
    ) -> Result<VaguenessVerdict, GateError> {
        let active = self
            .store
            .find_active("ana", boardroom_interview::WorkflowKind::QuickAudit)
            .await
            .map_err(|err| GateError::Failed(err.to_string()))?
            .ok_or_else(|| GateError::Failed("no active session".into()))?;
        let mut record = self
            .store
            .load(active)
            .await
            .map_err(|err| GateError::Failed(err.to_string()))?
            .ok_or_else(|| GateError::Failed("missing".into()))?;
        if let SessionPayload::QuickAudit(data) = &mut record.payload {
            data.current_state = QuickState::ABANDONED;
        }
        self.store
            .save(&record)
            .await
            .map_err(|err| GateError::Failed(err.to_string()))?;
        Ok(VaguenessVerdict::concrete())
    }
}

#[tokio::test]
async fn results_arriving_after_abandonment_are_discarded() {
    let store = Arc::new(MemorySessionStore::new());
    let repository = Arc::new(MemoryEntityRepository::new());
    let deps = Collaborators {
        store: store.clone(),
        gate: Arc::new(AbandoningGate {
            store: store.clone(),
        }),
        reports: Arc::new(MarkdownReportGenerator::default()),
        repository,
        purge_abandoned: false,
    };
    let mut runner = SessionRunner::<QuickAudit>::start(deps, "ana", ())
        .await
        .expect("start");
    runner.submit_answer("no").await.expect("sensitivity");
    runner.submit_answer("Engineer").await.expect("role");

    let result = runner.submit_answer("Payments routing for 3 markets").await;
    assert!(matches!(result, Err(InterviewError::InvalidSessionState(_))));
    assert_eq!(runner.lifecycle(), SessionLifecycle::Abandoned);
    assert!(runner.session().workflow.paid_problems.is_empty());
    assert!(runner.view().error.is_some());
}

#[tokio::test]
async fn purge_on_abandon_removes_the_snapshot() {
    let mut h = harness(ScriptedGate::with(Vec::new()));
    h.deps.purge_abandoned = true;
    let mut runner = SessionRunner::<QuickAudit>::start(h.deps.clone(), "ana", ())
        .await
        .expect("start");
    runner.abandon().await.expect("abandon");
    assert_eq!(h.store.load(runner.id()).await.expect("load"), None);
    assert!(matches!(
        SessionRunner::<QuickAudit>::resume(h.deps, runner.id()).await,
        Err(InterviewError::NotFound(_))
    ));
}
