//! The command capability: every built-in and host-provided command
//! implements this trait and is registered explicitly at startup. No
//! reflection-based auto-discovery.

use serde::Serialize;

use crate::error::ErrorKind;
use crate::value::{Registry, Value, ValueTag};

/// Shared state every command and extension executes against.
pub struct Runtime {
    pub registry: Registry,
    /// `(namespace, name, description)` for every registered command,
    /// populated by the dispatcher once at startup. Backs `list`/`help`.
    pub command_directory: Vec<(String, String, String)>,
}

impl Runtime {
    pub fn new() -> Self {
        Self { registry: Registry::new(), command_directory: Vec::new() }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// A prompt a command wants to show the user before it will continue,
/// paired with the closure that resumes the command once an answer
/// arrives. Lives only until the dispatcher turns it into a
/// `PendingFeedback` with an assigned request id.
pub struct FeedbackRequest {
    pub prompt: String,
    pub options: Vec<String>,
    pub continuation: Box<dyn FnMut(&str, &mut Runtime) -> CommandResult + Send>,
}

impl std::fmt::Debug for FeedbackRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackRequest").field("prompt", &self.prompt).field("options", &self.options).finish()
    }
}

/// The result of executing a command, an extension, or resuming a
/// feedback continuation.
#[derive(Debug)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub value: Option<Value>,
    pub feedback: Option<FeedbackRequest>,
    pub requires_confirmation: bool,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self { success: true, message: message.into(), value: None, feedback: None, requires_confirmation: false }
    }

    pub fn success_with_value(message: impl Into<String>, value: Value) -> Self {
        Self { success: true, message: message.into(), value: Some(value), feedback: None, requires_confirmation: false }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { success: false, message: format!("[{}] {}", kind, message.into()), value: None, feedback: None, requires_confirmation: false }
    }

    pub fn needs_confirmation(prompt: impl Into<String>, options: &[&str], continuation: impl FnMut(&str, &mut Runtime) -> CommandResult + Send + 'static) -> Self {
        Self {
            success: true,
            message: prompt.into(),
            value: None,
            requires_confirmation: true,
            feedback: Some(FeedbackRequest {
                prompt: String::new(),
                options: options.iter().map(|s| s.to_string()).collect(),
                continuation: Box::new(continuation),
            }),
        }
        .with_prompt_copied_into_message()
    }

    /// Like `needs_confirmation`, but for re-prompting after an answer
    /// that matched none of the accepted options: the answer itself was
    /// invalid, so the result is non-success, while still carrying a
    /// fresh feedback request with the same options.
    pub fn invalid_feedback_input(prompt: impl Into<String>, options: &[&str], continuation: impl FnMut(&str, &mut Runtime) -> CommandResult + Send + 'static) -> Self {
        let mut result = Self::needs_confirmation(prompt, options, continuation);
        result.success = false;
        result
    }

    fn with_prompt_copied_into_message(mut self) -> Self {
        if let Some(feedback) = &mut self.feedback {
            feedback.prompt = self.message.clone();
        }
        self
    }

    /// A serializable snapshot of this result, for the CLI's `--json`
    /// mode and any other host that needs to move a result across a
    /// process boundary. The feedback continuation closure cannot be
    /// serialized, so only its prompt/options survive.
    pub fn to_view(&self) -> CommandResultView {
        CommandResultView {
            success: self.success,
            message: self.message.clone(),
            value: self.value.clone(),
            value_tag: self.value.as_ref().map(|v| v.tag()),
            requires_confirmation: self.requires_confirmation,
            feedback_prompt: self.feedback.as_ref().map(|f| f.prompt.clone()),
            feedback_options: self.feedback.as_ref().map(|f| f.options.clone()),
        }
    }
}

/// The boundary shape of a `CommandResult`: everything a result carries
/// except the feedback continuation, which has no serializable form.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResultView {
    pub success: bool,
    pub message: String,
    pub value: Option<Value>,
    pub value_tag: Option<ValueTag>,
    pub requires_confirmation: bool,
    pub feedback_prompt: Option<String>,
    pub feedback_options: Option<Vec<String>>,
}

/// A registered, namespaced command. Dispatch is a hash-map lookup on
/// `(namespace, name)`; there is no runtime type introspection.
pub trait Command: Send {
    fn namespace(&self) -> &str;
    fn name(&self) -> &str;
    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult;

    /// Command-local extension handling, tried only after no global
    /// extension matches the name.
    fn invoke_extension(&self, ext_name: &str, _ext_args: &[String], _runtime: &mut Runtime, _command_args: &[String]) -> CommandResult {
        CommandResult::failure(ErrorKind::UnknownExtension, format!("unknown extension '{}'", ext_name))
    }

    /// One-line description shown by `help(name)`.
    fn describe(&self) -> String {
        format!("{}:{}", self.namespace(), self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_carries_value_and_tag_but_drops_continuation() {
        let result = CommandResult::success_with_value("9", Value::Double(9.0));
        let view = result.to_view();
        assert_eq!(view.value, Some(Value::Double(9.0)));
        assert_eq!(view.value_tag, Some(ValueTag::Wdouble));
        assert!(view.feedback_prompt.is_none());
    }

    #[test]
    fn view_serializes_feedback_prompt_and_options() {
        let result = CommandResult::needs_confirmation("delete it?", &["yes", "no"], |_answer, _runtime| CommandResult::success("done"));
        let view = result.to_view();
        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("delete it?"));
        assert!(json.contains("\"yes\""));
    }
}
