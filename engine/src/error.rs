use thiserror::Error;

use crate::ex::ExError;
use crate::search::SearchError;
use crate::settings::SettingsError;

/// Every error the engine itself can raise. Per the error-handling design,
/// each of these is also rendered as a `Message` at the matching
/// `MessageLevel` and handed to `HostBridge::show_message` rather than
/// ever unwound out of `handle_event` — `handle_event` itself never
/// returns `Result`, only `EventOutcome`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("register \"{0} is empty")]
    EmptyRegister(char),
    #[error("mark '{0} is not set")]
    UnknownMark(char),
    #[error(transparent)]
    Ex(#[from] ExError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Script(#[from] vimscript::ScriptError),
    #[error("pattern not found: {0}")]
    PatternNotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn message(&self) -> crate::message::Message {
        crate::message::Message::error(self.to_string())
    }
}
