use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use boardroom_interview::Collaborators;
use boardroom_interview::DataLayout;
use boardroom_interview::FileEntityRepository;
use boardroom_interview::FileSessionStore;
use boardroom_interview::HeuristicVaguenessGate;
use boardroom_interview::InterviewConfig;
use boardroom_interview::InterviewError;
use boardroom_interview::MAX_VAGUENESS_SKIPS;
use boardroom_interview::MarkdownReportGenerator;
use boardroom_interview::SessionId;
use boardroom_interview::SessionRunner;
use boardroom_interview::SessionView;
use boardroom_interview::SubmitOutcome;
use boardroom_interview::UnavailableVaguenessGate;
use boardroom_interview::VaguenessGate;
use boardroom_interview::WorkflowKind;
use boardroom_interview::workflow::QuarterlyReview;
use boardroom_interview::workflow::QuarterlySeed;
use boardroom_interview::workflow::QuickAudit;
use boardroom_interview::workflow::SetupSeed;
use boardroom_interview::workflow::SetupWizard;
use boardroom_interview::workflow::Workflow;
use boardroom_interview::write_atomic;
use clap::Args;
use clap::Subcommand;
use clap::ValueEnum;
use owo_colors::OwoColorize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WorkflowChoice {
    /// Five questions about where your time goes.
    Quick,
    /// Build your problem portfolio and board.
    Setup,
    /// Review the quarter against your portfolio and last bet.
    Quarterly,
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Start a new interview.
    Start(StartArgs),
    /// Answer the current question. Use `\n` or `;` to separate list items.
    Answer(AnswerArgs),
    /// Move on without the concrete example that was asked for.
    Skip(SessionArgs),
    /// Retry writing the report for a session that failed to finish.
    Finalize(SessionArgs),
    /// End a session without finishing it.
    Abandon(SessionArgs),
    /// Show where a session stands.
    Status(StatusArgs),
    /// Print the report of a finished session.
    Report(SessionArgs),
}

#[derive(Debug, Args)]
pub struct StartArgs {
    #[arg(value_enum)]
    pub workflow: WorkflowChoice,
}

#[derive(Debug, Args)]
pub struct SessionArgs {
    #[arg(value_name = "SESSION")]
    pub session: SessionId,
}

#[derive(Debug, Args)]
pub struct AnswerArgs {
    #[arg(value_name = "SESSION")]
    pub session: SessionId,

    #[arg(
        value_name = "TEXT",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub text: Vec<String>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(value_name = "SESSION")]
    pub session: SessionId,

    /// Print the session view as JSON.
    #[arg(long)]
    pub json: bool,
}

enum Action {
    Answer(String),
    Skip,
    Finalize,
    Abandon,
    Status { json: bool },
    Report,
}

struct Env<'a> {
    config: &'a InterviewConfig,
    layout: DataLayout,
    deps: Collaborators,
}

pub async fn execute(
    command: SessionCommand,
    config: &InterviewConfig,
    no_vagueness_check: bool,
) -> Result<()> {
    let layout = DataLayout::new(config.resolved_data_dir());
    layout.ensure_root()?;
    let gate: Arc<dyn VaguenessGate> = if no_vagueness_check {
        Arc::new(UnavailableVaguenessGate)
    } else {
        Arc::new(HeuristicVaguenessGate::default())
    };
    let deps = Collaborators {
        store: Arc::new(FileSessionStore::new(layout.clone())),
        gate,
        reports: Arc::new(MarkdownReportGenerator::new(config.report_width)),
        repository: Arc::new(FileEntityRepository::new(layout.clone())),
        purge_abandoned: config.purge_abandoned,
    };
    let env = Env {
        config,
        layout,
        deps,
    };

    let (id, action) = match command {
        SessionCommand::Start(args) => return start(&env, args.workflow).await,
        SessionCommand::Answer(args) => (
            args.session,
            Action::Answer(args.text.join(" ").replace("\\n", "\n")),
        ),
        SessionCommand::Skip(args) => (args.session, Action::Skip),
        SessionCommand::Finalize(args) => (args.session, Action::Finalize),
        SessionCommand::Abandon(args) => (args.session, Action::Abandon),
        SessionCommand::Status(args) => (args.session, Action::Status { json: args.json }),
        SessionCommand::Report(args) => (args.session, Action::Report),
    };

    let record = env
        .deps
        .store
        .load(id)
        .await?
        .ok_or(InterviewError::NotFound(id))?;
    match record.kind() {
        WorkflowKind::QuickAudit => act::<QuickAudit>(&env, id, action).await,
        WorkflowKind::Setup => act::<SetupWizard>(&env, id, action).await,
        WorkflowKind::Quarterly => act::<QuarterlyReview>(&env, id, action).await,
    }
}

async fn start(env: &Env<'_>, choice: WorkflowChoice) -> Result<()> {
    let user = env.config.user_id.as_str();
    let view = match choice {
        WorkflowChoice::Quick => {
            SessionRunner::<QuickAudit>::start(env.deps.clone(), user, ())
                .await?
                .view()
        }
        WorkflowChoice::Setup => {
            let seed = SetupSeed {
                review_interval_days: env.config.review_interval_days,
            };
            SessionRunner::<SetupWizard>::start(env.deps.clone(), user, seed)
                .await?
                .view()
        }
        WorkflowChoice::Quarterly => {
            let portfolio = FileEntityRepository::new(env.layout.clone())
                .load_portfolio()
                .context("failed to load your portfolio")?;
            if portfolio.problems.is_empty() {
                bail!("no portfolio found; finish `boardroom start setup` first");
            }
            let seed = QuarterlySeed::from_portfolio(&portfolio, env.config.bet_horizon_days);
            SessionRunner::<QuarterlyReview>::start(env.deps.clone(), user, seed)
                .await?
                .view()
        }
    };
    println!("session {}", view.session_id);
    print_prompt(&view);
    Ok(())
}

async fn act<W: Workflow>(env: &Env<'_>, id: SessionId, action: Action) -> Result<()> {
    let mut runner = SessionRunner::<W>::resume(env.deps.clone(), id).await?;
    match action {
        Action::Answer(text) => {
            let outcome = runner.submit_answer(&text).await;
            after_step(env, &runner, outcome)
        }
        Action::Skip => {
            let outcome = runner.skip().await;
            after_step(env, &runner, outcome)
        }
        Action::Finalize => {
            runner.finalize().await?;
            finished(env, &runner)
        }
        Action::Abandon => {
            runner.abandon().await?;
            println!("session {id} abandoned");
            Ok(())
        }
        Action::Status { json } => {
            let view = runner.view();
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                let skips_left =
                    MAX_VAGUENESS_SKIPS.saturating_sub(runner.session().vagueness_skip_count);
                println!("session {id} ({})", view.kind);
                println!(
                    "{} ({}), {}% done, {skips_left} skip(s) left",
                    view.display_name, view.state, view.progress_percent
                );
                print_prompt(&view);
            }
            Ok(())
        }
        Action::Report => match &runner.session().output_markdown {
            Some(markdown) => {
                print!("{markdown}");
                Ok(())
            }
            None => bail!(
                "session {id} has no report yet; it is at \"{}\"",
                runner.view().display_name
            ),
        },
    }
}

fn after_step<W: Workflow>(
    env: &Env<'_>,
    runner: &SessionRunner<W>,
    outcome: Result<SubmitOutcome<W::State>, InterviewError>,
) -> Result<()> {
    let outcome = match outcome {
        Ok(outcome) => outcome,
        Err(err @ InterviewError::ExternalGenerationFailed(_)) => {
            eprintln!(
                "{}",
                format!(
                    "Your answers are saved. Run `boardroom finalize {}` to try again.",
                    runner.id()
                )
                .yellow()
            );
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };
    for warning in &outcome.warnings {
        println!("{} {warning}", "warning:".yellow().bold());
    }
    if let Some(notice) = &outcome.notice {
        println!("{} {}", "note:".yellow().bold(), notice.user_message());
    }
    if let Some(follow_up) = &outcome.follow_up {
        println!("{}", follow_up.cyan());
    }
    if outcome.finalized {
        return finished(env, runner);
    }
    print_prompt(&runner.view());
    Ok(())
}

fn finished<W: Workflow>(env: &Env<'_>, runner: &SessionRunner<W>) -> Result<()> {
    let markdown = runner
        .session()
        .output_markdown
        .as_deref()
        .context("finished session has no report")?;
    let path = env.layout.report_file(runner.id());
    write_atomic(&path, markdown.as_bytes())?;
    println!("{} report written to {}", "Done.".green().bold(), path.display());
    Ok(())
}

fn print_prompt(view: &SessionView) {
    let Some(text) = &view.question_text else {
        return;
    };
    let number = view
        .question_number
        .map(|n| format!("Q{n} "))
        .unwrap_or_default();
    println!(
        "{}",
        format!("[{number}{}%] {}", view.progress_percent, view.display_name).dimmed()
    );
    println!("{text}");
    if view.can_skip {
        println!(
            "{}",
            format!(
                "Give a concrete example, or run `boardroom skip {}`.",
                view.session_id
            )
            .dimmed()
        );
    }
}
