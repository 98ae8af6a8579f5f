//! The command dispatcher ("Weave"): owns the command registry, the
//! global extension registry, the runtime, and the single pending
//! feedback slot.

use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::error::{ErrorKind, WeaveError};
use crate::weave::builtins::{
    DeleteValueCommand, EvaluateCommand, FsDeleteCommand, GetValueCommand, HelpCommand, ListCommand, MemoryCommand, SetValueCommand,
};
use crate::weave::command::{Command, CommandResult, Runtime};
use crate::weave::extensions::{Extension, StoreExtension};
use crate::weave::invocation::parse_invocation;

/// An in-flight confirmation prompt, with an opaque id for callers that
/// want to correlate requests across a suspension.
pub struct PendingFeedback {
    pub request_id: u64,
    pub prompt: String,
    pub options: Vec<String>,
    continuation: Box<dyn FnMut(&str, &mut Runtime) -> CommandResult + Send>,
}

pub struct Weave {
    commands: HashMap<(String, String), Box<dyn Command>>,
    extensions: HashMap<String, Box<dyn Extension>>,
    runtime: Runtime,
    pending: Option<PendingFeedback>,
    next_request_id: u64,
}

impl Default for Weave {
    fn default() -> Self {
        Self::new()
    }
}

impl Weave {
    pub fn new() -> Self {
        let mut weave = Self {
            commands: HashMap::new(),
            extensions: HashMap::new(),
            runtime: Runtime::new(),
            pending: None,
            next_request_id: 1,
        };
        weave.register(Box::new(ListCommand));
        weave.register(Box::new(HelpCommand));
        weave.register(Box::new(SetValueCommand));
        weave.register(Box::new(GetValueCommand));
        weave.register(Box::new(DeleteValueCommand));
        weave.register(Box::new(MemoryCommand));
        weave.register(Box::new(EvaluateCommand));
        weave.register(Box::new(FsDeleteCommand));
        weave.register_extension(Box::new(StoreExtension));
        weave
    }

    fn key(namespace: &str, name: &str) -> (String, String) {
        (namespace.to_ascii_lowercase(), name.to_ascii_lowercase())
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.runtime.command_directory.push((command.namespace().to_string(), command.name().to_string(), command.describe()));
        self.commands.insert(Self::key(command.namespace(), command.name()), command);
    }

    pub fn register_extension(&mut self, extension: Box<dyn Extension>) {
        self.extensions.insert(extension.name().to_ascii_lowercase(), extension);
    }

    pub fn registry(&self) -> &crate::value::Registry {
        &self.runtime.registry
    }

    pub fn has_pending_feedback(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_prompt(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.prompt.as_str())
    }

    /// Steps 1-6 of the dispatcher's input processing algorithm.
    pub fn process(&mut self, input: &str) -> Result<CommandResult, WeaveError> {
        let trimmed = input.trim();

        if self.pending.is_some() {
            // Step 1: any input is forwarded to the pending continuation,
            // whether or not it matches one of the offered options — an
            // unrecognized answer is the continuation's own business to
            // reject and re-prompt (§8 scenario 6, "maybe").
            debug!(request_id = self.pending.as_ref().map(|p| p.request_id), input = trimmed, "resolving pending feedback");
            let mut pending = self.pending.take().unwrap();
            let result = (pending.continuation)(trimmed, &mut self.runtime);
            return Ok(self.absorb_feedback(result));
        }

        let invocation = parse_invocation(trimmed)?;
        let namespace = invocation.namespace.clone().unwrap_or_default();
        let key = Self::key(&namespace, &invocation.name);
        trace!(namespace = %namespace, name = %invocation.name, args = ?invocation.args, "dispatching command");

        let Some(command) = self.commands.get(&key) else {
            warn!(namespace = %namespace, name = %invocation.name, "unknown command");
            return Ok(CommandResult::failure(ErrorKind::UnknownCommand, format!("unknown command '{}'", invocation.name)));
        };

        // Step 3.
        let base_result = command.execute(&invocation.args, &mut self.runtime);

        let result = match &invocation.extension {
            None => base_result,
            Some((ext_name, ext_args)) => {
                let ext_key = ext_name.to_ascii_lowercase();
                match self.extensions.get(&ext_key) {
                    Some(extension) => {
                        let args = &invocation.args;
                        let mut replay = |runtime: &mut Runtime| -> CommandResult { command.execute(args, runtime) };
                        extension.invoke(ext_args, &mut self.runtime, &mut replay)
                    }
                    None => command.invoke_extension(ext_name, ext_args, &mut self.runtime, &invocation.args),
                }
            }
        };

        Ok(self.absorb_feedback(result))
    }

    /// Step 5/6: if the result carries a feedback request, move it into
    /// the pending slot with a fresh request id and hand back the result
    /// as-is (feedback field cleared, since it now lives in `self.pending`).
    fn absorb_feedback(&mut self, mut result: CommandResult) -> CommandResult {
        if let Some(feedback) = result.feedback.take() {
            let request_id = self.next_request_id;
            debug!(request_id, prompt = %feedback.prompt, options = ?feedback.options, "suspending on feedback request");
            self.pending = Some(PendingFeedback {
                request_id,
                prompt: feedback.prompt,
                options: feedback.options,
                continuation: feedback.continuation,
            });
            self.next_request_id += 1;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn setvalue_then_getvalue_round_trips() {
        let mut weave = Weave::new();
        weave.process("setValue(score, 100, Wint)").unwrap();
        let result = weave.process("getValue(score)").unwrap();
        assert!(result.success);
        assert_eq!(result.value, Some(Value::Int(100)));
    }

    #[test]
    fn unknown_command_fails_without_touching_pending() {
        let mut weave = Weave::new();
        let result = weave.process("nope()").unwrap();
        assert!(!result.success);
        assert!(!weave.has_pending_feedback());
    }

    #[test]
    fn store_extension_writes_evaluate_result() {
        let mut weave = Weave::new();
        weave.process("evaluate(4 + 5).store(total)").unwrap();
        assert_eq!(weave.registry().get("total"), Some(&Value::Double(9.0)));
    }

    #[test]
    fn feedback_round_trip_through_dispatcher() {
        let mut weave = Weave::new();
        let first = weave.process("fs:delete(myfile.txt)").unwrap();
        assert!(first.requires_confirmation);
        assert!(weave.has_pending_feedback());

        let second = weave.process("yes").unwrap();
        assert!(second.success);
        assert!(second.message.contains("deleted"));
        assert!(!weave.has_pending_feedback());
    }

    #[test]
    fn feedback_cancel_path() {
        let mut weave = Weave::new();
        weave.process("fs:delete(myfile.txt)").unwrap();
        let result = weave.process("no").unwrap();
        assert!(!result.success);
        assert!(result.message.contains("cancelled"));
    }
}
