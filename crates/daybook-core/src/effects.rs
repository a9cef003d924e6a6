//! Side-effect requests emitted at phase boundaries.
//!
//! The engine never touches audio or haptic hardware. It emits [`Event`]s;
//! [`effects_for`] maps each event to the effects that boundary owes, and
//! [`dispatch`] hands them to an injected [`EffectSink`]. A sink failure is
//! logged and dropped -- the countdown must keep running without the
//! affected side effect.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EffectError;
use crate::events::Event;

/// Fade-out duration for the completion cue, executed by the presentation
/// layer.
pub const FADE_OUT_MS: u64 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HapticLevel {
    Light,
    Medium,
    Success,
}

/// Visual transitions delegated to the screen layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cue", rename_all = "lowercase")]
pub enum VisualCue {
    FadeIn,
    FadeOut { duration_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Chime,
    Haptic(HapticLevel),
    Visual(VisualCue),
}

/// Capability surface for audio/haptic/visual feedback.
///
/// Implementations are host-specific (desktop notification, terminal bell,
/// mobile haptic motor). Every method may fail; callers must treat failure
/// as a no-op.
pub trait EffectSink: Send + Sync {
    fn play_chime(&self) -> Result<(), EffectError>;
    fn trigger_haptic(&self, level: HapticLevel) -> Result<(), EffectError>;
    fn visual_cue(&self, cue: VisualCue) -> Result<(), EffectError>;
}

/// Sink that does nothing. The default when no host capability is wired up.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEffects;

impl EffectSink for NullEffects {
    fn play_chime(&self) -> Result<(), EffectError> {
        Ok(())
    }

    fn trigger_haptic(&self, _level: HapticLevel) -> Result<(), EffectError> {
        Ok(())
    }

    fn visual_cue(&self, _cue: VisualCue) -> Result<(), EffectError> {
        Ok(())
    }
}

/// The effects owed by an event.
///
/// Explicit user actions (skip, pause/resume) request nothing; automatic
/// milestones request exactly the feedback for that boundary.
pub fn effects_for(event: &Event) -> Vec<Effect> {
    match event {
        Event::BreakStarted { .. } => vec![Effect::Haptic(HapticLevel::Medium)],
        Event::CycleStarted { .. } => {
            vec![Effect::Haptic(HapticLevel::Light), Effect::Chime]
        }
        Event::SessionCompleted { .. } => vec![
            Effect::Haptic(HapticLevel::Success),
            Effect::Chime,
            Effect::Visual(VisualCue::FadeOut {
                duration_ms: FADE_OUT_MS,
            }),
        ],
        Event::TimerReset { .. } => vec![Effect::Visual(VisualCue::FadeIn)],
        _ => Vec::new(),
    }
}

/// Deliver an event's effects to the sink.
///
/// Haptic requests are filtered out when haptics are disabled. Errors are
/// logged at warn level and swallowed.
pub fn dispatch(sink: &dyn EffectSink, event: &Event, haptics_enabled: bool) {
    for effect in effects_for(event) {
        let result = match effect {
            Effect::Chime => sink.play_chime(),
            Effect::Haptic(_) if !haptics_enabled => Ok(()),
            Effect::Haptic(level) => sink.trigger_haptic(level),
            Effect::Visual(cue) => sink.visual_cue(cue),
        };
        if let Err(e) = result {
            warn!(error = %e, ?effect, "effect dropped");
        }
    }
}
