use std::sync::Arc;

use clap::Subcommand;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use daybook_core::effects::dispatch;
use daybook_core::{
    Config, CoreError, Database, Event, ProgressStore, SessionKey, SessionRuntime, SessionTimer,
};

use crate::effects::TerminalEffects;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Print current timer state as JSON
    Status,
    /// Advance the countdown by one or more seconds
    Tick {
        /// Number of seconds to apply
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Toggle between running and paused
    Toggle,
    /// Cut the current break short
    SkipBreak,
    /// Restart the session from cycle 1
    Reset,
    /// Run a live session in the foreground until it completes
    Run,
}

/// Rebuild today's session from config and stored progress.
///
/// One-shot commands reconstruct the engine the same way a remounting
/// screen would: read the stored snapshot, resume or start clean.
fn load_session(db: &Database, config: &Config) -> (SessionKey, SessionTimer) {
    let key = SessionKey::today();
    let mut timer = SessionTimer::new(config.session_settings());
    let stored = if config.timer.preserve_progress {
        match db.get(&key) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(session = %key, error = %e, "progress read failed; starting clean");
                None
            }
        }
    } else {
        None
    };
    timer.initialize(stored.as_ref());
    (key, timer)
}

fn save_session(db: &Database, key: &SessionKey, timer: &SessionTimer) {
    if let Err(e) = db.set(key, &timer.progress_record()) {
        warn!(session = %key, error = %e, "progress write dropped");
    }
}

fn print_event(event: &Event) -> Result<(), CoreError> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: TimerAction) -> Result<(), CoreError> {
    let config = Config::load_or_default();
    let db = Database::open()?;
    let sink = TerminalEffects::new(&config);

    match action {
        TimerAction::Status => {
            let (_, timer) = load_session(&db, &config);
            print_event(&timer.snapshot())?;
        }
        TimerAction::Tick { count } => {
            let (key, mut timer) = load_session(&db, &config);
            for _ in 0..count {
                if let Some(event) = timer.tick() {
                    dispatch(&sink, &event, config.feedback.haptics);
                    print_event(&event)?;
                }
            }
            save_session(&db, &key, &timer);
            print_event(&timer.snapshot())?;
        }
        TimerAction::Toggle => {
            let (key, mut timer) = load_session(&db, &config);
            if let Some(event) = timer.toggle_running() {
                print_event(&event)?;
            }
            save_session(&db, &key, &timer);
        }
        TimerAction::SkipBreak => {
            let (key, mut timer) = load_session(&db, &config);
            match timer.skip_break() {
                Some(event) => print_event(&event)?,
                None => print_event(&timer.snapshot())?,
            }
            save_session(&db, &key, &timer);
        }
        TimerAction::Reset => {
            let (key, mut timer) = load_session(&db, &config);
            let event = timer.reset();
            dispatch(&sink, &event, config.feedback.haptics);
            print_event(&event)?;
            save_session(&db, &key, &timer);
        }
        TimerAction::Run => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_session(config, db))?;
        }
    }

    Ok(())
}

/// Foreground session over the real runtime: events stream to stdout as
/// JSON lines; Ctrl-C unmounts cleanly.
async fn run_session(config: Config, db: Database) -> Result<(), CoreError> {
    let key = SessionKey::today();
    let (_settings_tx, settings_rx) = watch::channel(config.session_settings());
    let runtime = SessionRuntime::new(Arc::new(db), Arc::new(TerminalEffects::new(&config)));
    let handle = runtime.mount(key, settings_rx);
    let mut events = handle.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    println!("{}", serde_json::to_string(&event)?);
                    if matches!(event, Event::SessionCompleted { .. }) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}
