//! Per-session driver task hosting a [`SessionTimer`].
//!
//! One mounted writing screen owns one runtime. The runtime serializes
//! everything that can mutate the engine -- ticks, commands, the debounced
//! settings reset -- onto a single `tokio::select!` loop, so the transition
//! decision and the persistence write of each step always derive from the
//! same observed state.
//!
//! Unmounting (shutdown, or dropping the [`SessionHandle`]) stops the
//! ticker and any pending delayed reset with the task, after flushing a
//! final snapshot to the progress store.

use std::future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use super::engine::SessionTimer;
use super::settings::{SessionKey, SessionSettings};
use crate::effects::{self, EffectSink};
use crate::events::Event;
use crate::progress::ProgressStore;

/// Fixed delay before the resume read, letting dependent configuration
/// settle after mount.
const SETTLE_DELAY: Duration = Duration::from_millis(150);
/// Re-arm delay applied to an explicit reset so the screen never flashes.
const RESET_REARM_DELAY: Duration = Duration::from_millis(200);
/// Debounce window for settings-driven resets; only the last change within
/// the window executes.
const SETTINGS_DEBOUNCE: Duration = Duration::from_millis(300);
const TICK_PERIOD: Duration = Duration::from_secs(1);

enum Command {
    Toggle,
    SkipBreak,
    Reset,
    SetScreenActive(bool),
    Shutdown,
}

/// Shared collaborators for mounting sessions.
pub struct SessionRuntime {
    store: Arc<dyn ProgressStore>,
    effects: Arc<dyn EffectSink>,
}

impl SessionRuntime {
    pub fn new(store: Arc<dyn ProgressStore>, effects: Arc<dyn EffectSink>) -> Self {
        Self { store, effects }
    }

    /// Mount a session for `key`, driven by the settings channel.
    ///
    /// The driver performs the resume-or-reset initialization before
    /// accepting any tick; settings changes racing the resume read are
    /// retained by the watch channel and observed only after
    /// `SessionStarted`.
    pub fn mount(
        &self,
        key: SessionKey,
        settings_rx: watch::Receiver<SessionSettings>,
    ) -> SessionHandle {
        let timer = Arc::new(Mutex::new(SessionTimer::new(
            settings_rx.borrow().clone(),
        )));
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(64);

        let task = tokio::spawn(drive(
            key,
            Arc::clone(&timer),
            Arc::clone(&self.store),
            Arc::clone(&self.effects),
            settings_rx,
            commands_rx,
            events_tx.clone(),
        ));

        SessionHandle {
            timer,
            commands: commands_tx,
            events: events_tx,
            task,
        }
    }
}

/// Handle held by the screen layer for one mounted session.
///
/// Dropping the handle closes the command channel; the driver notices,
/// flushes a last snapshot, and exits -- no orphaned ticker survives an
/// unmount.
pub struct SessionHandle {
    timer: Arc<Mutex<SessionTimer>>,
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<Event>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    /// Current state as a `StateSnapshot` event.
    pub fn snapshot(&self) -> Event {
        lock(&self.timer).snapshot()
    }

    /// Subscribe to the session's event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Toggle between running and paused.
    pub fn toggle(&self) {
        let _ = self.commands.send(Command::Toggle);
    }

    /// Cut the current break short.
    pub fn skip_break(&self) {
        let _ = self.commands.send(Command::SkipBreak);
    }

    /// Schedule a fresh restart of the session (applies after the re-arm
    /// delay).
    pub fn reset(&self) {
        let _ = self.commands.send(Command::Reset);
    }

    /// Gate tick delivery. Ticks arriving while the screen is inactive are
    /// dropped entirely, never queued.
    pub fn set_screen_active(&self, active: bool) {
        let _ = self.commands.send(Command::SetScreenActive(active));
    }

    /// Unmount: flush the last snapshot and stop the driver.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        let _ = self.task.await;
    }
}

fn lock(timer: &Mutex<SessionTimer>) -> MutexGuard<'_, SessionTimer> {
    timer.lock().unwrap_or_else(PoisonError::into_inner)
}

fn persist(store: &dyn ProgressStore, key: &SessionKey, timer: &Mutex<SessionTimer>) {
    let record = lock(timer).progress_record();
    if let Err(e) = store.set(key, &record) {
        warn!(session = %key, error = %e, "progress write dropped");
    }
}

async fn pending_fire(deadline: Option<Instant>) {
    match deadline {
        Some(d) => time::sleep_until(d).await,
        None => future::pending().await,
    }
}

async fn drive(
    key: SessionKey,
    timer: Arc<Mutex<SessionTimer>>,
    store: Arc<dyn ProgressStore>,
    effects: Arc<dyn EffectSink>,
    mut settings_rx: watch::Receiver<SessionSettings>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: broadcast::Sender<Event>,
) {
    // ── Initialization / resume ──────────────────────────────────────
    time::sleep(SETTLE_DELAY).await;
    let mut current = settings_rx.borrow_and_update().clone();
    lock(&timer).set_settings(current.clone());

    let stored = if current.preserve_progress {
        match store.get(&key) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(session = %key, error = %e, "progress read failed; starting clean");
                None
            }
        }
    } else {
        None
    };

    let started = lock(&timer).initialize(stored.as_ref());
    // Overwrites any stale record on a clean start.
    persist(store.as_ref(), &key, &timer);
    effects::dispatch(effects.as_ref(), &started, current.haptics_enabled);
    let _ = events.send(started);

    // ── Serialized tick/command loop ─────────────────────────────────
    let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut screen_active = true;
    // Single slot for the delayed reset; rescheduling supersedes.
    let mut pending_reset: Option<Instant> = None;
    let mut settings_open = true;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !screen_active {
                    continue;
                }
                let (accepted, event) = {
                    let mut t = lock(&timer);
                    let accepted = t.running() && !t.completed();
                    let event = if accepted { t.tick() } else { None };
                    (accepted, event)
                };
                if accepted {
                    persist(store.as_ref(), &key, &timer);
                    if let Some(event) = event {
                        effects::dispatch(effects.as_ref(), &event, current.haptics_enabled);
                        let _ = events.send(event);
                    }
                }
            }

            cmd = commands.recv() => {
                match cmd {
                    Some(Command::Toggle) => {
                        let event = lock(&timer).toggle_running();
                        if let Some(event) = event {
                            persist(store.as_ref(), &key, &timer);
                            effects::dispatch(effects.as_ref(), &event, current.haptics_enabled);
                            let _ = events.send(event);
                        }
                    }
                    Some(Command::SkipBreak) => {
                        let event = lock(&timer).skip_break();
                        if let Some(event) = event {
                            persist(store.as_ref(), &key, &timer);
                            effects::dispatch(effects.as_ref(), &event, current.haptics_enabled);
                            let _ = events.send(event);
                        }
                    }
                    Some(Command::Reset) => {
                        lock(&timer).suspend();
                        pending_reset = Some(Instant::now() + RESET_REARM_DELAY);
                    }
                    Some(Command::SetScreenActive(active)) => {
                        screen_active = active;
                    }
                    Some(Command::Shutdown) | None => break,
                }
            }

            changed = settings_rx.changed(), if settings_open => {
                match changed {
                    Ok(()) => {
                        let new = settings_rx.borrow_and_update().clone();
                        if new.write_secs != current.write_secs {
                            // A stale write duration must not survive into a
                            // resumed countdown: pause now, reset after the
                            // debounce window. A newer change supersedes.
                            lock(&timer).suspend();
                            pending_reset = Some(Instant::now() + SETTINGS_DEBOUNCE);
                            debug!(session = %key, "write duration changed; reset scheduled");
                        } else {
                            lock(&timer).set_settings(new.clone());
                        }
                        current = new;
                    }
                    Err(_) => settings_open = false,
                }
            }

            _ = pending_fire(pending_reset), if pending_reset.is_some() => {
                pending_reset = None;
                let event = {
                    let mut t = lock(&timer);
                    t.set_settings(current.clone());
                    t.reset()
                };
                persist(store.as_ref(), &key, &timer);
                effects::dispatch(effects.as_ref(), &event, current.haptics_enabled);
                let _ = events.send(event);
            }
        }
    }

    // ── Unmount ──────────────────────────────────────────────────────
    persist(store.as_ref(), &key, &timer);
    debug!(session = %key, "session unmounted");
}
