//! # Operator commands typed into the proxied client's chat.
//!
//! Chat lines starting with [`PREFIX`] never reach the server. The [`Dispatcher`]
//! looks the first word up in a [`Registry`] built once at startup and runs the
//! matching handler, which answers by pushing [`Effect`]s: notices and dialogs for
//! the local player, text or binary packets for the server.
//!
//! Handlers are plain functions of a [`Context`] and their arguments. The context
//! carries a fresh [`Snapshot`] of the session for every invocation.
mod builtin;
pub mod dialog;
mod dispatch;
mod effects;
mod registry;
mod snapshot;

pub use dispatch::{tokenize, Dispatcher, PREFIX};
pub use effects::{Effect, Effects};
pub use registry::{Command, Context, Handler, RegistrationConflict, Registry};
pub use snapshot::{Avatar, Snapshot};

/// Shown for a prefixed line that names no registered command.
pub const UNKNOWN_COMMAND: &str = "`4Unknown command. ``Enter `$!help`` for a list of valid commands.";
