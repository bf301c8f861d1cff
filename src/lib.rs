pub mod coalescer;
pub mod config;
pub mod context;
pub mod engine;
pub mod event;
pub mod motion;
pub mod registry;
pub mod resolver;

pub use coalescer::InputCoalescer;
pub use config::EngineConfig;
pub use context::{ContextState, Cursor, EditorContext, Mode, Registers};
pub use engine::{Dispatch, Engine, LifecycleState, Stats};
pub use event::{normalize_key_event, KeystrokeEvent};
pub use motion::{register_builtin_motions, FindCharCommand, Motion, MotionCommand};
pub use registry::{Command, CommandRegistry, Validation, ValidationError};
pub use resolver::{Outcome, SequenceResolver};
