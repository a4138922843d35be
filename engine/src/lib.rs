//! A host-agnostic Vim-compatible modal editing engine. The engine owns
//! no text buffer of its own — every mutation is driven through
//! [`HostBridge`], which the embedding application implements over
//! whatever storage it already has. See `engine::Engine` for the entry
//! point.

pub mod dotcmd;
pub mod edit;
pub mod engine;
pub mod error;
pub mod ex;
pub mod ex_exec;
pub mod executor;
pub mod globals;
pub mod host;
pub mod input;
pub mod keymap;
pub mod message;
pub mod mode;
pub mod motion;
pub mod search;
pub mod settings;

pub use engine::{Engine, EventOutcome};
pub use error::EngineError;
pub use globals::EngineGlobals;
pub use host::HostBridge;
pub use input::{Input, Inputs, KeyCode, Modifiers, MAPPING_TIMEOUT};
pub use message::{Message, MessageLevel};
pub use mode::{Mode, VisualMode};
