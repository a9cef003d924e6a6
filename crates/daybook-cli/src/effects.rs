//! Desktop stand-ins for the mobile app's feedback capabilities.

use std::io::Write;

use notify_rust::Notification;
use tracing::debug;

use daybook_core::{Config, EffectError, EffectSink, HapticLevel, VisualCue};

/// Chime via terminal bell plus a desktop notification; haptics and visual
/// cues have no desktop hardware, so they are logged and dropped.
pub struct TerminalEffects {
    chime_enabled: bool,
}

impl TerminalEffects {
    pub fn new(config: &Config) -> Self {
        Self {
            chime_enabled: config.feedback.chime,
        }
    }
}

impl EffectSink for TerminalEffects {
    fn play_chime(&self) -> Result<(), EffectError> {
        if !self.chime_enabled {
            return Ok(());
        }
        let mut stdout = std::io::stdout();
        let _ = write!(stdout, "\x07");
        let _ = stdout.flush();
        Notification::new()
            .summary("Daybook")
            .body("Phase complete")
            .show()
            .map_err(|e| EffectError::Failed(e.to_string()))?;
        Ok(())
    }

    fn trigger_haptic(&self, level: HapticLevel) -> Result<(), EffectError> {
        debug!(?level, "haptic pulse has no desktop hardware");
        Ok(())
    }

    fn visual_cue(&self, cue: VisualCue) -> Result<(), EffectError> {
        debug!(?cue, "visual cue delegated to screen layer");
        Ok(())
    }
}
