//! # Daybook Core Library
//!
//! This library provides the core business logic for Daybook's focused
//! writing sessions. It implements a CLI-first philosophy where all
//! operations are available via a standalone CLI binary, with any GUI
//! screen being a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Session Timer**: A caller-driven state machine alternating writing
//!   and break phases across a configurable number of cycles
//! - **Session Runtime**: A per-mount tokio task that serializes ticks,
//!   commands, and the debounced settings reset onto one logical sequence
//! - **Progress Store**: Injected key-value persistence, namespaced by
//!   session date, with in-memory and SQLite implementations
//! - **Effects**: Chime/haptic/visual requests mapped from events and
//!   delivered to an injected sink that may fail without consequence
//!
//! ## Key Components
//!
//! - [`SessionTimer`]: Core timer state machine
//! - [`SessionRuntime`]: Driver hosting a timer for one mounted screen
//! - [`ProgressStore`]: Progress persistence abstraction
//! - [`Config`]: Application configuration management

pub mod effects;
pub mod error;
pub mod events;
pub mod progress;
pub mod session;
pub mod storage;

pub use effects::{EffectSink, HapticLevel, NullEffects, VisualCue};
pub use error::{ConfigError, CoreError, EffectError, StoreError};
pub use events::Event;
pub use progress::{MemoryProgressStore, PersistedProgress, ProgressStore};
pub use session::{Phase, SessionHandle, SessionKey, SessionRuntime, SessionSettings, SessionTimer};
pub use storage::{Config, Database};
