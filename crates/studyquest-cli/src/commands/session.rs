use std::io::Write;

use clap::{Subcommand, ValueEnum};
use studyquest_core::recovery::requires_choice;
use studyquest_core::{
    Achievement, ActiveSession, CoreError, EndOutcome, Event, HttpStudyApi, RecoveryChoice,
    RecoveryOutcome, StudyApi, Tick, TimerController, ValidationError,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tokio::sync::mpsc::UnboundedReceiver;

type Controller = TimerController<HttpStudyApi>;
type Input = Lines<BufReader<Stdin>>;
type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a study session and run the timer in the foreground
    Start {
        /// What you are studying
        #[arg(long)]
        subject: String,
        /// Optional topic within the subject
        #[arg(long)]
        topic: Option<String>,
        /// Planned length in minutes (default from config)
        #[arg(long)]
        minutes: Option<u32>,
        /// How to treat a session left running by an earlier run
        #[arg(long, value_enum)]
        on_recover: Option<RecoverArg>,
        /// Print events as JSON lines instead of a progress line
        #[arg(long)]
        json: bool,
    },
    /// Pick up a session left running by an earlier run
    Recover {
        #[arg(long, value_enum)]
        on_recover: Option<RecoverArg>,
        #[arg(long)]
        json: bool,
    },
    /// Print the backend's active session as JSON
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RecoverArg {
    Resume,
    Discard,
}

impl From<RecoverArg> for RecoveryChoice {
    fn from(arg: RecoverArg) -> Self {
        match arg {
            RecoverArg::Resume => RecoveryChoice::Resume,
            RecoverArg::Discard => RecoveryChoice::Discard,
        }
    }
}

/// Session output: text for people, or every controller event as a JSON line.
struct Printer {
    events: Option<broadcast::Receiver<Event>>,
}

impl Printer {
    fn new(ctrl: &Controller, json: bool) -> Self {
        Self {
            events: json.then(|| ctrl.subscribe()),
        }
    }

    fn is_json(&self) -> bool {
        self.events.is_some()
    }

    /// Write out events published since the last flush. No-op in text mode.
    fn flush(&mut self) -> CliResult {
        let Some(events) = self.events.as_mut() else {
            return Ok(());
        };
        loop {
            match events.try_recv() {
                Ok(event) => println!("{}", serde_json::to_string(&event)?),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event output fell behind");
                }
                Err(_) => break,
            }
        }
        Ok(())
    }

    /// Questions go to stderr in JSON mode so stdout stays parseable.
    fn prompt(&self, text: &str) {
        if self.is_json() {
            eprint!("{text}");
            let _ = std::io::stderr().flush();
        } else {
            print!("{text}");
            let _ = std::io::stdout().flush();
        }
    }
}

pub async fn run(action: SessionAction) -> CliResult {
    let (config, api) = super::authenticated_api()?;

    if let SessionAction::Status = action {
        let active = api.active_session().await?;
        println!("{}", serde_json::to_string_pretty(&active)?);
        return Ok(());
    }

    let (ctrl, rx) = TimerController::new(api, config.timer.policy(), config.timer.tick_interval());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    match action {
        SessionAction::Start {
            subject,
            topic,
            minutes,
            on_recover,
            json,
        } => {
            let mut out = Printer::new(&ctrl, json);
            let recovered = recover(&ctrl, on_recover, &mut input, &mut out).await?;
            if !matches!(recovered, RecoveryOutcome::Resumed { .. }) {
                let minutes = minutes.unwrap_or(config.timer.default_duration_minutes);
                let event = ctrl.start(&subject, topic.as_deref(), minutes).await?;
                print_event(&event, &mut out)?;
            }
            run_timer(&ctrl, rx, &mut input, &mut out).await
        }
        SessionAction::Recover { on_recover, json } => {
            let mut out = Printer::new(&ctrl, json);
            let recovered = recover(&ctrl, on_recover, &mut input, &mut out).await?;
            if matches!(recovered, RecoveryOutcome::Resumed { .. }) {
                run_timer(&ctrl, rx, &mut input, &mut out).await
            } else {
                Ok(())
            }
        }
        SessionAction::Status => Ok(()),
    }
}

async fn recover(
    ctrl: &Controller,
    on_recover: Option<RecoverArg>,
    input: &mut Input,
    out: &mut Printer,
) -> CliResult<RecoveryOutcome> {
    tracing::debug!(preset = on_recover.is_some(), "checking for an open session");

    // Ask before recovering so the question reads from the same stdin
    // reader as the timer loop.
    let choice = match on_recover {
        Some(arg) => arg.into(),
        None => match ctrl.api().active_session().await? {
            Some(session) if requires_choice(session.current_duration, ctrl.policy()) => {
                ask_recovery(&session, input, out).await?
            }
            _ => RecoveryChoice::Resume,
        },
    };
    let outcome = ctrl.recover_on_mount(move |_| choice).await?;

    if out.is_json() {
        out.flush()?;
        return Ok(outcome);
    }

    match &outcome {
        RecoveryOutcome::NoActiveSession => {}
        RecoveryOutcome::AutoEnded {
            elapsed_minutes,
            xp_earned,
            ..
        } => println!("Ended a forgotten session after {elapsed_minutes} min (+{xp_earned} XP)."),
        RecoveryOutcome::Resumed {
            subject,
            remaining_secs,
            ..
        } => println!("Resumed {subject}, {} left.", clock(*remaining_secs)),
        RecoveryOutcome::Discarded {
            duration_minutes,
            xp_earned,
            achievements,
            achievement_error,
            ..
        } => {
            println!("Ended previous session at {duration_minutes} min (+{xp_earned} XP).");
            print_achievements(achievements, achievement_error.as_deref());
        }
    }
    Ok(outcome)
}

async fn ask_recovery<R: AsyncBufRead + Unpin>(
    session: &ActiveSession,
    input: &mut Lines<R>,
    out: &Printer,
) -> CliResult<RecoveryChoice> {
    out.prompt(&format!(
        "Unfinished {} session ({} min in). Resume it? [Y/n] ",
        session.subject, session.current_duration
    ));
    let Some(line) = input.next_line().await? else {
        return Err("no answer on stdin; pass --on-recover resume|discard".into());
    };
    Ok(match line.trim().to_ascii_lowercase().as_str() {
        "n" | "no" => RecoveryChoice::Discard,
        _ => RecoveryChoice::Resume,
    })
}

/// A short-session discard waiting for y/N.
struct PendingDiscard {
    /// The timer was paused for the question and resumes on "no".
    paused_for_prompt: bool,
}

/// Foreground loop: forwards ticks and reads single-letter commands.
async fn run_timer(
    ctrl: &Controller,
    mut ticks: UnboundedReceiver<Tick>,
    input: &mut Input,
    out: &mut Printer,
) -> CliResult {
    if !out.is_json() {
        println!("[p]ause  [r]esume  [e]nd  [s]tatus  [q]uit (session stays open)");
    }

    let mut stdin_open = true;
    let mut pending: Option<PendingDiscard> = None;

    loop {
        tokio::select! {
            tick = ticks.recv() => {
                let Some(tick) = tick else { break };
                match ctrl.on_tick(tick).await {
                    Ok(Some(outcome)) => {
                        if !out.is_json() {
                            println!();
                            println!("Time's up!");
                        }
                        report_end(&outcome, out)?;
                        break;
                    }
                    Ok(None) => {
                        if !out.is_json() && pending.is_none() {
                            render_progress(ctrl).await;
                        }
                    }
                    Err(e) => {
                        out.flush()?;
                        tracing::warn!(error = %e, "automatic end failed");
                        eprintln!("\nerror: {e} (press e to retry)");
                    }
                }
            }
            line = input.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    continue;
                };
                let answer = line.trim().to_ascii_lowercase();

                if let Some(PendingDiscard { paused_for_prompt }) = pending.take() {
                    if matches!(answer.as_str(), "y" | "yes") {
                        match ctrl.end(true, true).await {
                            Ok(outcome) => {
                                report_end(&outcome, out)?;
                                break;
                            }
                            Err(e) => eprintln!("error: {e}"),
                        }
                    } else if !out.is_json() {
                        println!("Keeping the session.");
                    }
                    if paused_for_prompt {
                        if let Some(event) = ctrl.resume().await {
                            print_event(&event, out)?;
                        }
                    }
                    continue;
                }

                match answer.as_str() {
                    "p" | "pause" => {
                        if let Some(event) = ctrl.pause().await {
                            print_event(&event, out)?;
                        }
                    }
                    "r" | "resume" => {
                        if let Some(event) = ctrl.resume().await {
                            print_event(&event, out)?;
                        }
                    }
                    "e" | "end" => match ctrl.end(true, false).await {
                        Ok(outcome) => {
                            report_end(&outcome, out)?;
                            break;
                        }
                        Err(CoreError::Validation(ValidationError::ConfirmationRequired {
                            elapsed_secs,
                        })) => {
                            // Hold the clock so the answer applies to this elapsed time.
                            let paused_for_prompt = ctrl.pause().await.is_some();
                            out.flush()?;
                            pending = Some(PendingDiscard { paused_for_prompt });
                            out.prompt(&format!(
                                "\nTimer paused. Only {elapsed_secs}s studied; this earns no XP. \
                                 Discard the session? [y/N] "
                            ));
                        }
                        Err(e) => eprintln!("\nerror: {e}"),
                    },
                    "s" | "status" => {
                        let snapshot = ctrl.snapshot().await;
                        if out.is_json() {
                            println!("{}", serde_json::to_string(&snapshot)?);
                        } else {
                            println!("{}", serde_json::to_string_pretty(&snapshot)?);
                        }
                    }
                    "q" | "quit" => {
                        if !out.is_json() {
                            println!(
                                "\nLeaving the session open; \
                                 `studyquest session recover` picks it up."
                            );
                        }
                        break;
                    }
                    "" => {}
                    other => eprintln!("unknown command '{other}'"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !out.is_json() {
                    println!("\nInterrupted; the session stays open on the server.");
                }
                break;
            }
        }
    }

    ctrl.shutdown().await;
    out.flush()?;
    tracing::debug!("timer loop finished");
    Ok(())
}

async fn render_progress(ctrl: &Controller) {
    if let Event::StateSnapshot {
        subject,
        remaining_secs,
        progress_pct,
        is_paused,
        ..
    } = ctrl.snapshot().await
    {
        print!(
            "\r{} {} left ({:.0}%){}   ",
            subject.unwrap_or_default(),
            clock(remaining_secs),
            progress_pct,
            if is_paused { " paused" } else { "" }
        );
        let _ = std::io::stdout().flush();
    }
}

fn print_event(event: &Event, out: &mut Printer) -> CliResult {
    if out.is_json() {
        return out.flush();
    }
    match event {
        Event::SessionStarted {
            subject,
            duration_secs,
            at,
            ..
        } => println!(
            "Started {subject} for {} at {}.",
            clock(*duration_secs),
            at.with_timezone(&chrono::Local).format("%H:%M")
        ),
        Event::TimerPaused { remaining_secs, .. } => {
            println!("\nPaused with {} left.", clock(*remaining_secs))
        }
        Event::TimerResumed { .. } => println!("Resumed."),
        other => println!("{}", other.kind()),
    }
    Ok(())
}

fn report_end(outcome: &EndOutcome, out: &mut Printer) -> CliResult {
    if out.is_json() {
        return out.flush();
    }
    match outcome {
        EndOutcome::Ended(summary) => {
            println!(
                "\nSession complete: {} min of {}, +{} XP",
                summary.duration_minutes, summary.subject, summary.xp_earned
            );
            print_achievements(&summary.achievements, summary.achievement_error.as_deref());
        }
        EndOutcome::Discarded { elapsed_secs, .. } => {
            println!("\nSession discarded after {elapsed_secs}s, no XP.")
        }
        EndOutcome::Superseded { session_id } => {
            println!("\nSession {session_id} was already replaced.")
        }
    }
    Ok(())
}

fn print_achievements(achievements: &[Achievement], error: Option<&str>) {
    for a in achievements {
        println!("{} Unlocked {} (+{} pts)", a.icon, a.name, a.points_reward);
    }
    if let Some(err) = error {
        eprintln!("warning: achievement check failed: {err}");
    }
}

fn clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
