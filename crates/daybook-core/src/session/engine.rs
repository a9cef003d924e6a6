//! Writing session timer engine.
//!
//! The engine is a caller-driven state machine. It owns no clock and spawns
//! no threads - the hosting layer delivers one `tick()` per elapsed second
//! and invokes commands; every state change is reported as an [`Event`].
//!
//! ## Phase Transitions
//!
//! ```text
//! Writing --(boundary)--> Break --(boundary)--> Writing (next cycle)
//!                              \--(last cycle)--> completed
//! ```
//!
//! A tick that reaches the phase boundary applies the transition in the same
//! step: the decrement, the transition decision, and the new phase values
//! are all computed under one `&mut` borrow, so the decision always reads
//! the phase that was authoritative when the tick arrived. Two rapid ticks
//! can never both observe the pre-transition phase.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::settings::SessionSettings;
use crate::events::Event;
use crate::progress::PersistedProgress;

/// Current interval type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Writing,
    Break,
}

/// Core writing/break interval timer for one journaling session.
///
/// Serializable so hosts can checkpoint the whole machine between
/// invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTimer {
    settings: SessionSettings,
    phase: Phase,
    /// Remaining seconds in the current phase.
    remaining_secs: u32,
    /// 1-indexed writing cycle, never above `settings.total_cycles`.
    current_cycle: u32,
    running: bool,
    skip_break_available: bool,
    completed: bool,
    /// True until the one-time resume-or-reset decision has been made.
    #[serde(default)]
    initial_load: bool,
}

impl SessionTimer {
    /// Create an engine awaiting initialization.
    ///
    /// Ticks and commands are ignored until [`SessionTimer::initialize`]
    /// has made the resume-or-reset decision.
    pub fn new(settings: SessionSettings) -> Self {
        let remaining_secs = settings.write_secs;
        Self {
            settings,
            phase: Phase::Writing,
            remaining_secs,
            current_cycle: 1,
            running: false,
            skip_break_available: false,
            completed: false,
            initial_load: true,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn current_cycle(&self) -> u32 {
        self.current_cycle
    }

    pub fn total_cycles(&self) -> u32 {
        self.settings.total_cycles
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn skip_break_available(&self) -> bool {
        self.skip_break_available
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn is_initial_load(&self) -> bool {
        self.initial_load
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Full length of the current phase in seconds.
    pub fn phase_total_secs(&self) -> u32 {
        match self.phase {
            Phase::Writing => self.settings.write_secs,
            Phase::Break => self.settings.break_secs,
        }
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            total_secs: self.phase_total_secs(),
            current_cycle: self.current_cycle,
            total_cycles: self.settings.total_cycles,
            running: self.running,
            skip_break_available: self.skip_break_available,
            completed: self.completed,
            at: Utc::now(),
        }
    }

    /// The record the host writes to the progress store after each step.
    ///
    /// With `preserve_progress` off only the countdown value is written, so
    /// the next mount starts clean while draft-saving can still read a
    /// rough progress number.
    pub fn progress_record(&self) -> PersistedProgress {
        if self.settings.preserve_progress {
            PersistedProgress {
                remaining_secs: self.remaining_secs,
                phase: Some(self.phase),
                cycles_completed: Some(self.current_cycle),
                active: Some(self.running),
            }
        } else {
            PersistedProgress {
                remaining_secs: self.remaining_secs,
                phase: None,
                cycles_completed: None,
                active: None,
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Make the one-time resume-or-reset decision and start the session.
    ///
    /// A stored snapshot is honored only when `preserve_progress` is on and
    /// it still has time remaining; absent fields fall back to a fresh
    /// Writing phase at cycle 1. Anything else starts clean, and the caller
    /// is expected to overwrite the stale record with the fresh snapshot.
    pub fn initialize(&mut self, stored: Option<&PersistedProgress>) -> Event {
        let resumed = match stored {
            Some(p) if self.settings.preserve_progress && p.remaining_secs > 0 => {
                self.phase = p.phase.unwrap_or(Phase::Writing);
                self.remaining_secs = p.remaining_secs;
                // Clamp in case the cycle count shrank since the snapshot.
                self.current_cycle = p
                    .cycles_completed
                    .unwrap_or(1)
                    .clamp(1, self.settings.total_cycles.max(1));
                self.skip_break_available = self.phase == Phase::Break;
                true
            }
            _ => {
                self.apply_clean_state();
                false
            }
        };
        self.completed = false;
        self.initial_load = false;
        self.running = true;
        Event::SessionStarted {
            resumed,
            phase: self.phase,
            remaining_secs: self.remaining_secs,
            current_cycle: self.current_cycle,
            at: Utc::now(),
        }
    }

    /// Replace the settings snapshot without disturbing the countdown.
    ///
    /// The host decides when a change also warrants a [`SessionTimer::reset`]
    /// (a changed writing duration does; the rest take effect at the next
    /// boundary that reads them).
    pub fn set_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Advance the countdown by one second.
    ///
    /// Returns the transition event when this tick reached a phase
    /// boundary. Ticks are ignored while paused, completed, or still in
    /// initial load; an ignored tick is discarded, never applied later.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.running || self.completed || self.initial_load {
            return None;
        }
        let next = self.remaining_secs.saturating_sub(1);
        if next > 0 {
            self.remaining_secs = next;
            return None;
        }
        // Boundary reached: transition in the same step, decided from the
        // phase observed by this tick.
        match self.phase {
            Phase::Writing => {
                self.enter_break();
                Some(Event::BreakStarted {
                    current_cycle: self.current_cycle,
                    remaining_secs: self.remaining_secs,
                    at: Utc::now(),
                })
            }
            Phase::Break => {
                if self.advance_from_break() {
                    Some(Event::SessionCompleted {
                        total_cycles: self.settings.total_cycles,
                        at: Utc::now(),
                    })
                } else {
                    Some(Event::CycleStarted {
                        current_cycle: self.current_cycle,
                        remaining_secs: self.remaining_secs,
                        at: Utc::now(),
                    })
                }
            }
        }
    }

    /// Toggle between accepting and ignoring ticks.
    pub fn toggle_running(&mut self) -> Option<Event> {
        if self.completed || self.initial_load {
            return None;
        }
        self.running = !self.running;
        let at = Utc::now();
        Some(if self.running {
            Event::TimerResumed {
                remaining_secs: self.remaining_secs,
                at,
            }
        } else {
            Event::TimerPaused {
                remaining_secs: self.remaining_secs,
                at,
            }
        })
    }

    /// Stop accepting ticks without touching the countdown.
    ///
    /// Used by the host ahead of a delayed reset; emits nothing.
    pub fn suspend(&mut self) {
        self.running = false;
    }

    /// Cut the current break short.
    ///
    /// Applies the same cycle-advance / completion logic as the natural
    /// break end, but as an explicit user action it requests no effects.
    pub fn skip_break(&mut self) -> Option<Event> {
        if self.phase != Phase::Break || !self.skip_break_available || self.completed {
            return None;
        }
        let completed = self.advance_from_break();
        Some(Event::BreakSkipped {
            completed,
            current_cycle: self.current_cycle,
            at: Utc::now(),
        })
    }

    /// Return to a fresh Writing phase at cycle 1.
    pub fn reset(&mut self) -> Event {
        self.apply_clean_state();
        self.completed = false;
        self.running = true;
        Event::TimerReset {
            remaining_secs: self.remaining_secs,
            at: Utc::now(),
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn apply_clean_state(&mut self) {
        self.phase = Phase::Writing;
        self.remaining_secs = self.settings.write_secs;
        self.current_cycle = 1;
        self.skip_break_available = false;
    }

    fn enter_break(&mut self) {
        self.phase = Phase::Break;
        self.remaining_secs = self.settings.break_secs;
        self.skip_break_available = true;
    }

    /// Leave the Break phase: start the next cycle, or complete the
    /// session when the cycle count is exhausted. Returns true on
    /// completion.
    fn advance_from_break(&mut self) -> bool {
        self.skip_break_available = false;
        if self.current_cycle + 1 <= self.settings.total_cycles {
            self.current_cycle += 1;
            self.phase = Phase::Writing;
            self.remaining_secs = self.settings.write_secs;
            false
        } else {
            self.completed = true;
            self.running = false;
            self.remaining_secs = 0;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(write: u32, brk: u32, cycles: u32) -> SessionSettings {
        SessionSettings {
            write_secs: write,
            break_secs: brk,
            total_cycles: cycles,
            preserve_progress: true,
            haptics_enabled: true,
        }
    }

    fn started(write: u32, brk: u32, cycles: u32) -> SessionTimer {
        let mut timer = SessionTimer::new(settings(write, brk, cycles));
        timer.initialize(None);
        timer
    }

    fn tick_n(timer: &mut SessionTimer, n: u32) -> Vec<Event> {
        (0..n).filter_map(|_| timer.tick()).collect()
    }

    #[test]
    fn ticks_ignored_before_initialize() {
        let mut timer = SessionTimer::new(settings(60, 10, 2));
        assert!(timer.is_initial_load());
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_secs(), 60);
        assert!(timer.toggle_running().is_none());
    }

    #[test]
    fn clean_start_law() {
        let mut timer = SessionTimer::new(settings(60, 10, 2));
        let event = timer.initialize(None);
        assert!(matches!(event, Event::SessionStarted { resumed: false, .. }));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.remaining_secs(), 60);
        assert_eq!(timer.current_cycle(), 1);
        assert!(timer.running());
        assert!(!timer.is_initial_load());
    }

    #[test]
    fn clean_start_ignores_stale_record_when_preserve_disabled() {
        let mut s = settings(60, 10, 2);
        s.preserve_progress = false;
        let mut timer = SessionTimer::new(s);
        let stale = PersistedProgress {
            remaining_secs: 42,
            phase: Some(Phase::Break),
            cycles_completed: Some(2),
            active: Some(true),
        };
        let event = timer.initialize(Some(&stale));
        assert!(matches!(event, Event::SessionStarted { resumed: false, .. }));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.remaining_secs(), 60);
        assert_eq!(timer.current_cycle(), 1);
    }

    #[test]
    fn resume_law() {
        let mut timer = SessionTimer::new(settings(60, 10, 3));
        let stored = PersistedProgress {
            remaining_secs: 7,
            phase: Some(Phase::Break),
            cycles_completed: Some(2),
            active: Some(true),
        };
        let event = timer.initialize(Some(&stored));
        assert!(matches!(event, Event::SessionStarted { resumed: true, .. }));
        assert_eq!(timer.remaining_secs(), 7);
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.current_cycle(), 2);
        assert!(timer.skip_break_available());
    }

    #[test]
    fn resume_defaults_absent_fields() {
        let mut timer = SessionTimer::new(settings(60, 10, 3));
        let stored = PersistedProgress {
            remaining_secs: 30,
            phase: None,
            cycles_completed: None,
            active: None,
        };
        timer.initialize(Some(&stored));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.remaining_secs(), 30);
        assert_eq!(timer.current_cycle(), 1);
        assert!(!timer.skip_break_available());
    }

    #[test]
    fn drained_record_starts_clean() {
        let mut timer = SessionTimer::new(settings(60, 10, 3));
        let stored = PersistedProgress {
            remaining_secs: 0,
            phase: Some(Phase::Break),
            cycles_completed: Some(3),
            active: Some(false),
        };
        let event = timer.initialize(Some(&stored));
        assert!(matches!(event, Event::SessionStarted { resumed: false, .. }));
        assert_eq!(timer.remaining_secs(), 60);
    }

    #[test]
    fn full_session_scenario() {
        // write=60, break=10, cycles=2, start to finish.
        let mut timer = started(60, 10, 2);

        let events = tick_n(&mut timer, 60);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::BreakStarted { .. }));
        assert_eq!(timer.phase(), Phase::Break);
        assert_eq!(timer.remaining_secs(), 10);
        assert!(timer.skip_break_available());

        let events = tick_n(&mut timer, 10);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            Event::CycleStarted {
                current_cycle: 2,
                ..
            }
        ));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.current_cycle(), 2);
        assert_eq!(timer.remaining_secs(), 60);
        assert!(!timer.skip_break_available());

        let events = tick_n(&mut timer, 70);
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], Event::BreakStarted { .. }));
        assert!(matches!(events[1], Event::SessionCompleted { .. }));
        assert!(timer.completed());
        assert!(!timer.running());
    }

    #[test]
    fn skip_break_advances_cycle_without_waiting() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 60);
        assert_eq!(timer.phase(), Phase::Break);

        let event = timer.skip_break().unwrap();
        assert!(matches!(
            event,
            Event::BreakSkipped {
                completed: false,
                current_cycle: 2,
                ..
            }
        ));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.remaining_secs(), 60);
    }

    #[test]
    fn skip_break_on_final_cycle_completes_immediately() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 60); // break 1
        timer.skip_break().unwrap(); // cycle 2
        tick_n(&mut timer, 60); // break 2, final
        assert_eq!(timer.current_cycle(), 2);
        assert!(timer.skip_break_available());

        let event = timer.skip_break().unwrap();
        assert!(matches!(
            event,
            Event::BreakSkipped {
                completed: true,
                ..
            }
        ));
        assert!(timer.completed());
        assert!(!timer.running());
    }

    #[test]
    fn skip_break_invalid_outside_break() {
        let mut timer = started(60, 10, 2);
        assert!(timer.skip_break().is_none());
        tick_n(&mut timer, 60);
        tick_n(&mut timer, 10); // back in Writing
        assert!(timer.skip_break().is_none());
    }

    #[test]
    fn skip_available_iff_in_break() {
        let mut timer = started(60, 10, 2);
        for _ in 0..140 {
            if !timer.completed() {
                assert_eq!(timer.skip_break_available(), timer.phase() == Phase::Break);
            }
            timer.tick();
        }
    }

    #[test]
    fn reset_law_from_any_state() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 65); // mid-break
        let event = timer.reset();
        assert!(matches!(event, Event::TimerReset { remaining_secs: 60, .. }));
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.current_cycle(), 1);
        assert_eq!(timer.remaining_secs(), 60);
        assert!(!timer.skip_break_available());
        assert!(!timer.completed());
        assert!(timer.running());

        // Also from completed.
        tick_n(&mut timer, 200);
        assert!(timer.completed());
        timer.reset();
        assert!(!timer.completed());
        assert!(timer.running());
        assert_eq!(timer.remaining_secs(), 60);
    }

    #[test]
    fn settings_change_law() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 63); // mid-break
        assert_eq!(timer.phase(), Phase::Break);

        let mut new = settings(90, 10, 2);
        new.haptics_enabled = false;
        timer.set_settings(new);
        timer.reset();
        assert_eq!(timer.phase(), Phase::Writing);
        assert_eq!(timer.current_cycle(), 1);
        assert_eq!(timer.remaining_secs(), 90);
    }

    #[test]
    fn pause_gates_ticks() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 5);
        assert_eq!(timer.remaining_secs(), 55);

        let event = timer.toggle_running().unwrap();
        assert!(matches!(event, Event::TimerPaused { remaining_secs: 55, .. }));
        tick_n(&mut timer, 20);
        assert_eq!(timer.remaining_secs(), 55);

        let event = timer.toggle_running().unwrap();
        assert!(matches!(event, Event::TimerResumed { .. }));
        tick_n(&mut timer, 5);
        assert_eq!(timer.remaining_secs(), 50);
    }

    #[test]
    fn toggle_is_inert_after_completion() {
        let mut timer = started(1, 1, 1);
        tick_n(&mut timer, 2);
        assert!(timer.completed());
        assert!(timer.toggle_running().is_none());
        assert!(!timer.running());
    }

    #[test]
    fn zero_duration_transitions_on_next_tick() {
        let mut timer = started(1, 0, 2);
        let event = timer.tick().unwrap();
        assert!(matches!(event, Event::BreakStarted { .. }));
        assert_eq!(timer.remaining_secs(), 0);
        // Zero-length break: next tick leaves it immediately.
        let event = timer.tick().unwrap();
        assert!(matches!(event, Event::CycleStarted { current_cycle: 2, .. }));
    }

    #[test]
    fn progress_record_full_and_reduced() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 3);
        let record = timer.progress_record();
        assert_eq!(record.remaining_secs, 57);
        assert_eq!(record.phase, Some(Phase::Writing));
        assert_eq!(record.cycles_completed, Some(1));
        assert_eq!(record.active, Some(true));

        let mut s = settings(60, 10, 2);
        s.preserve_progress = false;
        let mut timer = SessionTimer::new(s);
        timer.initialize(None);
        timer.tick();
        let record = timer.progress_record();
        assert_eq!(record.remaining_secs, 59);
        assert_eq!(record.phase, None);
        assert_eq!(record.cycles_completed, None);
        assert_eq!(record.active, None);
    }

    #[test]
    fn completed_record_is_inactive_and_drained() {
        let mut timer = started(1, 1, 1);
        tick_n(&mut timer, 2);
        assert!(timer.completed());
        let record = timer.progress_record();
        assert_eq!(record.remaining_secs, 0);
        assert_eq!(record.active, Some(false));
    }

    #[test]
    fn engine_state_roundtrips_through_serde() {
        let mut timer = started(60, 10, 2);
        tick_n(&mut timer, 61);
        let json = serde_json::to_string(&timer).unwrap();
        let restored: SessionTimer = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.phase(), Phase::Break);
        assert_eq!(restored.remaining_secs(), timer.remaining_secs());
        assert_eq!(restored.current_cycle(), timer.current_cycle());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random commands interleaved with ticks.
        fn command_strategy() -> impl Strategy<Value = u8> {
            0u8..=4
        }

        proptest! {
            #[test]
            fn remaining_never_underflows_and_cycle_stays_bounded(
                write in 1u32..120,
                brk in 0u32..30,
                cycles in 1u32..5,
                commands in prop::collection::vec(command_strategy(), 0..400),
            ) {
                let mut timer = SessionTimer::new(SessionSettings {
                    write_secs: write,
                    break_secs: brk,
                    total_cycles: cycles,
                    preserve_progress: true,
                    haptics_enabled: true,
                });
                timer.initialize(None);
                for cmd in commands {
                    match cmd {
                        0..=2 => { timer.tick(); }
                        3 => { timer.toggle_running(); }
                        _ => { timer.skip_break(); }
                    }
                    if !timer.completed() {
                        prop_assert!(timer.current_cycle() >= 1);
                        prop_assert!(timer.current_cycle() <= timer.total_cycles());
                    } else {
                        prop_assert!(!timer.running());
                    }
                }
            }

            #[test]
            fn remaining_is_non_increasing_between_transitions(
                write in 2u32..120,
                ticks in 1u32..200,
            ) {
                let mut timer = SessionTimer::new(SessionSettings {
                    write_secs: write,
                    break_secs: 10,
                    total_cycles: 2,
                    preserve_progress: true,
                    haptics_enabled: true,
                });
                timer.initialize(None);
                let mut prev = timer.remaining_secs();
                for _ in 0..ticks {
                    let transitioned = timer.tick().is_some();
                    let now = timer.remaining_secs();
                    if !transitioned {
                        prop_assert!(now <= prev);
                    }
                    prev = now;
                }
            }
        }
    }
}
