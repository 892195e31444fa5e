mod render;

use chrono::{DateTime, Duration, Utc};
use clap::{Parser, Subcommand};
use render::{sticker_label, BellCues, TerminalRenderer};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use wolfwalk_core::motivation::{BADGES, CHAPTERS, SESSIONS_PER_CHAPTER, STICKERS};
use wolfwalk_core::*;

/// Longest stretch of simulated time a single scripted `wait` may cover
const SCRIPT_WAIT_LIMIT_SECS: i64 = 4 * 60 * 60;

#[derive(Parser)]
#[command(name = "wolfwalk")]
#[command(about = "Guided step-by-step exercise routine for kids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Do the workout (default)
    Run {
        /// Workout length (long, short)
        #[arg(long)]
        length: Option<String>,

        /// Start over instead of resuming a saved session
        #[arg(long)]
        fresh: bool,

        /// Comma-separated commands run against a simulated clock (for testing)
        #[arg(long)]
        script: Option<String>,
    },

    /// Show the saved session and overall totals
    Status,

    /// Show badges, stickers, chapter and streak
    Progress,

    /// Export the session journal to CSV
    Export {
        /// CSV file to append to
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Forget all badges, stickers, streaks and chapters
    ResetProgress {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    wolfwalk_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    match cli.command {
        Some(Commands::Run {
            length,
            fresh,
            script,
        }) => cmd_run(&config, length, fresh, script),
        Some(Commands::Status) => cmd_status(&config),
        Some(Commands::Progress) => cmd_progress(&config),
        Some(Commands::Export { out }) => cmd_export(&config, out),
        Some(Commands::ResetProgress { yes }) => cmd_reset_progress(&config, yes),
        None => cmd_run(&config, None, false, None),
    }
}

/// One user command, typed or scripted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Input {
    Primary,
    Back,
    Skip,
    PauseToggle,
    Ready,
    Tally,
    Restart,
    Wait,
    Quit,
}

impl Input {
    fn parse(token: &str) -> Option<Self> {
        let input = match token.trim().to_lowercase().as_str() {
            "" | "n" | "next" => Input::Primary,
            "b" | "back" => Input::Back,
            "s" | "skip" => Input::Skip,
            "p" | "pause" => Input::PauseToggle,
            "r" | "ready" => Input::Ready,
            "t" | "tally" => Input::Tally,
            "x" | "restart" => Input::Restart,
            "w" | "wait" => Input::Wait,
            "q" | "quit" => Input::Quit,
            _ => return None,
        };
        Some(input)
    }
}

fn apply(session: &mut Session, input: Input, now: DateTime<Utc>, confirmed: bool) {
    match input {
        Input::Primary => session.primary_action(now),
        Input::Back => session.back(),
        Input::Skip => session.skip(now),
        Input::PauseToggle => {
            if session.state().timer_phase() == TimerPhase::Running {
                session.pause();
            } else {
                session.resume(now);
            }
        }
        Input::Ready => session.ready_after_rest(now),
        Input::Tally => session.tally_rep(),
        Input::Restart => session.restart(confirmed),
        Input::Wait | Input::Quit => {}
    }
}

fn cmd_run(
    config: &Config,
    length: Option<String>,
    fresh: bool,
    script: Option<String>,
) -> Result<()> {
    let length = match length {
        Some(l) => l.parse::<WorkoutLength>()?,
        None => config.workout.default_length,
    };
    let plan = config.routine_plan()?;

    let store = FileStore::new(config.store_dir());
    let scripted = script.is_some();
    let cues: Box<dyn CueSink> = if config.audio.enabled && !scripted {
        Box::new(BellCues)
    } else {
        Box::new(LogCues)
    };

    let mut session = Session::new(
        plan,
        length,
        config.session_settings(),
        Collaborators {
            store: Box::new(store.clone()),
            motivator: Box::new(MotivationTracker::new(Box::new(store))),
            cues,
            renderer: Box::new(TerminalRenderer::new(!scripted)),
        },
    );

    if fresh {
        session.discard_saved();
    } else if let Some(saved) = session.saved_snapshot() {
        let resume = scripted
            || confirm(&format!(
                "Resume your {} workout at step {}? [Y/n]",
                saved.workout_length,
                saved.step_index + 1
            ))?;
        if resume {
            if session.resume_saved() {
                println!("Welcome back!");
            }
        } else {
            session.discard_saved();
        }
    }

    if !session.state().started {
        session.select_workout_length(length);
    }

    match script {
        Some(script) => run_script(&mut session, &script, config)?,
        None => run_interactive(&mut session, config)?,
    }

    match session.completion() {
        Some(summary) => {
            let mut journal = JsonlJournal::new(config.journal_path());
            journal.append(&SessionRecord::from(summary))?;
            println!("✓ Session logged!");
        }
        None if session.state().started => {
            println!("Progress saved. Run `wolfwalk run` to pick up where you left off.");
        }
        None => {}
    }

    Ok(())
}

fn run_script(session: &mut Session, script: &str, config: &Config) -> Result<()> {
    let sample = Duration::milliseconds(config.timer.sample_interval_ms as i64);
    let mut clock = Utc::now();

    for token in script.split(',') {
        let input = Input::parse(token)
            .ok_or_else(|| Error::Config(format!("Unknown script command '{}'", token.trim())))?;
        if input == Input::Quit {
            break;
        }

        apply(session, input, clock, true);

        if input == Input::Wait {
            let limit = clock + Duration::seconds(SCRIPT_WAIT_LIMIT_SECS);
            while session.timer_active() && clock < limit {
                clock += sample;
                session.tick(clock);
            }
        } else {
            clock += sample;
            session.tick(clock);
        }

        if session.is_finished() {
            break;
        }
    }
    Ok(())
}

fn run_interactive(session: &mut Session, config: &Config) -> Result<()> {
    let interval = std::time::Duration::from_millis(config.timer.sample_interval_ms);
    print_keys();

    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });

    loop {
        match rx.recv_timeout(interval) {
            Ok(line) => match Input::parse(&line) {
                Some(Input::Quit) => break,
                Some(Input::Restart) => confirm_restart(session, |_| {
                    prompt("Restart the whole workout? [y/N]")?;
                    let answer = rx.recv().unwrap_or_default();
                    Ok(answer.trim().eq_ignore_ascii_case("y"))
                })?,
                Some(input) => apply(session, input, Utc::now(), false),
                None => print_keys(),
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        session.tick(Utc::now());
        if session.is_finished() {
            break;
        }
    }
    Ok(())
}

/// Ask before restarting. A running timer is held paused while the question
/// is open and picks up again if the answer is no.
fn confirm_restart<F>(session: &mut Session, ask: F) -> Result<()>
where
    F: FnOnce(&Session) -> Result<bool>,
{
    let was_running = session.state().timer_phase() == TimerPhase::Running;
    if was_running {
        session.pause();
    }

    if ask(session)? {
        session.restart(true);
    } else if was_running {
        session.resume(Utc::now());
    }
    Ok(())
}

fn print_keys() {
    println!("Keys: Enter/n next | b back | s skip | p pause | r ready | t count | x restart | q quit");
}

fn prompt(message: &str) -> Result<()> {
    print!("{} ", message);
    io::stdout().flush()?;
    Ok(())
}

fn confirm(message: &str) -> Result<bool> {
    prompt(message)?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(!input.trim().eq_ignore_ascii_case("n"))
}

fn cmd_status(config: &Config) -> Result<()> {
    let store = FileStore::new(config.store_dir());

    match Snapshot::load_resumable(&store) {
        Some(saved) => {
            let plan = config.routine_plan()?;
            let routine = plan.variant(saved.workout_length);
            let name = routine
                .get(saved.step_index)
                .map(|s| s.name.as_str())
                .unwrap_or("unknown exercise");
            println!("Saved {} workout:", saved.workout_length);
            println!(
                "  Step {} of {}: {}",
                saved.step_index + 1,
                routine.len(),
                name
            );
            match saved.side {
                Side::None => println!("  Set {}", saved.set_index + 1),
                side => println!("  Set {} ({})", saved.set_index + 1, side),
            }
            println!(
                "  {} of {} exercises done",
                saved.completed_steps.len(),
                routine.len()
            );
            if saved.rest_pending.is_some() {
                println!("  Resting");
            }
        }
        None => println!("No saved session."),
    }

    let motivation = MotivationState::load(&store);
    let logged = read_records(&config.journal_path())?.len();
    println!();
    println!("Sessions completed: {}", motivation.total_sessions);
    println!("Current streak: {} day(s)", motivation.current_streak);
    println!("XP: {}", motivation.xp_total);
    println!("Journal entries: {}", logged);
    Ok(())
}

fn cmd_progress(config: &Config) -> Result<()> {
    let store = FileStore::new(config.store_dir());
    let state = MotivationState::load(&store);

    if let Some(ch) = CHAPTERS.iter().find(|c| c.number == state.current_chapter) {
        println!(
            "Chapter {}: {} ({}/{})",
            ch.number, ch.title, state.chapter_progress, SESSIONS_PER_CHAPTER
        );
    }
    println!(
        "Streak: {} day(s), grace days used this month: {}",
        state.current_streak, state.grace_days_used_this_month
    );
    println!("XP: {}", state.xp_total);

    println!();
    println!("Badges:");
    for badge in BADGES {
        let mark = if state.has_badge(badge.id) { "✓" } else { "·" };
        println!("  {} {} - {}", mark, badge.name, badge.description);
    }

    println!();
    println!(
        "Stickers: {} of {}",
        state.collected_stickers.len().min(STICKERS.len()),
        STICKERS.len()
    );
    for sticker in &state.collected_stickers {
        println!("  {}", sticker_label(sticker));
    }
    Ok(())
}

fn cmd_export(config: &Config, out: Option<PathBuf>) -> Result<()> {
    let journal_path = config.journal_path();
    if !journal_path.exists() {
        println!("No journal found - nothing to export.");
        return Ok(());
    }

    let csv_path = out.unwrap_or_else(|| config.export_path());
    let count = export_csv(&journal_path, &csv_path)?;

    println!("✓ Exported {} sessions to CSV", count);
    println!("  CSV: {}", csv_path.display());
    Ok(())
}

fn cmd_reset_progress(config: &Config, yes: bool) -> Result<()> {
    if !yes {
        return Err(Error::Config(
            "Resetting progress cannot be undone; pass --yes to confirm".into(),
        ));
    }

    let store = FileStore::new(config.store_dir());
    let mut tracker = MotivationTracker::new(Box::new(store));
    tracker.reset();
    println!("✓ Progress reset");
    Ok(())
}
