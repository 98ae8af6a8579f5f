//! The command dispatcher runtime ("Weave"): commands, extensions, the
//! pending-feedback slot, and the invocation-string grammar.

pub mod builtins;
pub mod command;
pub mod dispatcher;
pub mod extensions;
pub mod invocation;

pub use command::{Command, CommandResult, CommandResultView, FeedbackRequest, Runtime};
pub use dispatcher::{PendingFeedback, Weave};
pub use extensions::Extension;
