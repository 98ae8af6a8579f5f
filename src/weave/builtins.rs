//! The command set the dispatcher registers at startup: introspection
//! (`list`, `help`), the four registry commands, `evaluate`, and the
//! reference feedback-driven command `fs:delete`.

use crate::error::ErrorKind;
use crate::eval;
use crate::value::{Registry, Value, ValueTag};
use crate::weave::command::{Command, CommandResult, Runtime};

pub struct ListCommand;

impl Command for ListCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "list"
    }

    fn execute(&self, _args: &[String], runtime: &mut Runtime) -> CommandResult {
        let mut names: Vec<String> = runtime
            .command_directory
            .iter()
            .map(|(ns, name, _)| if ns.is_empty() { name.clone() } else { format!("{}:{}", ns, name) })
            .collect();
        names.sort();
        CommandResult::success(names.join(", "))
    }
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "help"
    }

    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult {
        let Some(target) = args.first() else {
            return CommandResult::failure(ErrorKind::CommandFailed, "help requires a command name");
        };
        let found = runtime.command_directory.iter().find(|(ns, name, _)| {
            name.eq_ignore_ascii_case(target) || format!("{}:{}", ns, name).eq_ignore_ascii_case(target)
        });
        match found {
            Some((_, _, description)) => CommandResult::success(description.clone()),
            None => CommandResult::failure(ErrorKind::UnknownCommand, format!("no such command '{}'", target)),
        }
    }
}

pub struct SetValueCommand;

impl Command for SetValueCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "setValue"
    }

    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult {
        let [key, text, tag_name] = args else {
            return CommandResult::failure(ErrorKind::CommandFailed, "setValue requires (key, value, type)");
        };
        let Some(tag) = ValueTag::parse(tag_name) else {
            return CommandResult::failure(ErrorKind::InvalidValue, format!("unknown type tag '{}'", tag_name));
        };
        let value = match Value::parse(text, tag).or_else(|| evaluate_as_tag(text, tag, &runtime.registry)) {
            Some(value) => value,
            None => return CommandResult::failure(ErrorKind::InvalidValue, format!("'{}' is not a valid {}", text, tag_name)),
        };
        runtime.registry.set(key, value);
        CommandResult::success(format!("registered {}", key))
    }
}

/// Fallback for `setValue` when the raw text isn't a literal of the
/// requested tag: evaluate it as an expression against the live
/// registry instead, e.g. `setValue(counter, counter + 1, Wint)`.
fn evaluate_as_tag(text: &str, tag: ValueTag, registry: &Registry) -> Option<Value> {
    match tag {
        ValueTag::Wint => eval::evaluate_numeric(text, registry).ok().map(|n| Value::Int(n as i64)),
        ValueTag::Wdouble => eval::evaluate_numeric(text, registry).ok().map(Value::Double),
        ValueTag::Wbool => eval::evaluate_boolean(text, registry).ok().map(Value::Bool),
        ValueTag::Wstring => None,
    }
}

pub struct GetValueCommand;

impl Command for GetValueCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "getValue"
    }

    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult {
        let Some(key) = args.first() else {
            return CommandResult::failure(ErrorKind::CommandFailed, "getValue requires a key");
        };
        match runtime.registry.get(key) {
            Some(value) => CommandResult::success_with_value(value.display(), value.clone()),
            None => CommandResult::failure(ErrorKind::UnknownCommand, format!("'{}' not found", key)),
        }
    }
}

pub struct DeleteValueCommand;

impl Command for DeleteValueCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "deleteValue"
    }

    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult {
        let Some(key) = args.first() else {
            return CommandResult::failure(ErrorKind::CommandFailed, "deleteValue requires a key");
        };
        if runtime.registry.remove(key) {
            CommandResult::success(format!("deleted {}", key))
        } else {
            CommandResult::failure(ErrorKind::UnknownCommand, format!("'{}' not found", key))
        }
    }
}

pub struct MemoryCommand;

impl Command for MemoryCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "memory"
    }

    fn execute(&self, _args: &[String], runtime: &mut Runtime) -> CommandResult {
        if runtime.registry.is_empty() {
            return CommandResult::success("memory is empty");
        }
        let mut entries: Vec<String> = runtime.registry.enumerate().map(|(k, v)| format!("{} = {}", k, v.display())).collect();
        entries.sort();
        CommandResult::success(entries.join(", "))
    }
}

pub struct EvaluateCommand;

impl Command for EvaluateCommand {
    fn namespace(&self) -> &str {
        ""
    }

    fn name(&self) -> &str {
        "evaluate"
    }

    fn execute(&self, args: &[String], runtime: &mut Runtime) -> CommandResult {
        let Some(expr) = args.first() else {
            return CommandResult::failure(ErrorKind::CommandFailed, "evaluate requires an expression");
        };

        let evaluated = if eval::is_boolean_expression(expr) {
            eval::evaluate_boolean(expr, &runtime.registry).map(|b| (Value::Bool(b), if b { "True".to_string() } else { "False".to_string() }))
        } else {
            eval::evaluate_numeric(expr, &runtime.registry).map(|n| (Value::Double(n), Value::Double(n).display()))
        };

        match evaluated {
            Ok((value, display)) => {
                if let Some(store_key) = args.get(1) {
                    runtime.registry.set(store_key, value.clone());
                }
                CommandResult::success_with_value(display, value)
            }
            Err(err) => CommandResult::failure(err.kind, err.message),
        }
    }
}

/// `fs:delete(path)` models the confirmation/feedback round trip: the
/// first call always asks for confirmation; `yes` performs the
/// (simulated) deletion, `no`/`cancel` both cancel with the same
/// message, anything else re-prompts with the same option set.
pub struct FsDeleteCommand;

impl Command for FsDeleteCommand {
    fn namespace(&self) -> &str {
        "fs"
    }

    fn name(&self) -> &str {
        "delete"
    }

    fn execute(&self, args: &[String], _runtime: &mut Runtime) -> CommandResult {
        let Some(path) = args.first().cloned() else {
            return CommandResult::failure(ErrorKind::CommandFailed, "delete requires a path");
        };
        prompt_delete(path)
    }
}

fn prompt_delete(path: String) -> CommandResult {
    let prompt = format!("delete '{}'? (yes/no/cancel)", path);
    CommandResult::needs_confirmation(prompt, &["yes", "no", "cancel"], move |answer, _runtime| resolve_delete(&path, answer))
}

/// Re-prompt after an answer that wasn't `yes`/`no`/`cancel`. Unlike the
/// initial prompt, this one reports `success: false` — the answer itself
/// was rejected — while still carrying a fresh feedback request with the
/// same option set.
fn reprompt_delete(path: String) -> CommandResult {
    let prompt = format!("delete '{}'? (yes/no/cancel)", path);
    CommandResult::invalid_feedback_input(prompt, &["yes", "no", "cancel"], move |answer, _runtime| resolve_delete(&path, answer))
}

fn resolve_delete(path: &str, answer: &str) -> CommandResult {
    match answer.trim().to_ascii_lowercase().as_str() {
        "yes" => CommandResult::success(format!("deleted '{}'", path)),
        "no" | "cancel" => CommandResult::failure(ErrorKind::CommandFailed, "cancelled"),
        _ => reprompt_delete(path.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn set_then_get_round_trips_tag_and_display() {
        let mut runtime = Runtime::new();
        SetValueCommand.execute(&["k".into(), "100".into(), "Wint".into()], &mut runtime);
        let result = GetValueCommand.execute(&["k".into()], &mut runtime);
        assert!(result.success);
        assert_eq!(result.value, Some(Value::Int(100)));
    }

    #[test]
    fn set_with_unknown_tag_is_invalid_value() {
        let mut runtime = Runtime::new();
        let result = SetValueCommand.execute(&["k".into(), "1".into(), "Wnope".into()], &mut runtime);
        assert!(!result.success);
        assert!(result.message.contains("invalid_value"));
    }

    #[test]
    fn set_value_falls_back_to_expression_evaluation() {
        let mut runtime = Runtime::new();
        SetValueCommand.execute(&["counter".into(), "0".into(), "Wint".into()], &mut runtime);
        let result = SetValueCommand.execute(&["counter".into(), "counter+1".into(), "Wint".into()], &mut runtime);
        assert!(result.success);
        assert_eq!(runtime.registry.get("counter"), Some(&Value::Int(1)));
    }

    #[test]
    fn delete_then_get_is_not_found() {
        let mut runtime = Runtime::new();
        SetValueCommand.execute(&["k".into(), "1".into(), "Wint".into()], &mut runtime);
        DeleteValueCommand.execute(&["k".into()], &mut runtime);
        let result = GetValueCommand.execute(&["k".into()], &mut runtime);
        assert!(!result.success);
    }

    #[test]
    fn memory_reports_empty_when_registry_is_empty() {
        let mut runtime = Runtime::new();
        let result = MemoryCommand.execute(&[], &mut runtime);
        assert!(result.message.to_ascii_lowercase().contains("empty"));
    }

    #[test]
    fn evaluate_numeric_expression() {
        let mut runtime = Runtime::new();
        let result = EvaluateCommand.execute(&["1 + 2 + 3".into()], &mut runtime);
        assert!(result.success);
        assert_eq!(result.value, Some(Value::Double(6.0)));
    }

    #[test]
    fn fs_delete_round_trip_yes() {
        let mut runtime = Runtime::new();
        let first = FsDeleteCommand.execute(&["myfile.txt".into()], &mut runtime);
        assert!(first.requires_confirmation);
        let mut feedback = first.feedback.unwrap();
        assert!(feedback.prompt.contains("myfile.txt"));
        let resumed = (feedback.continuation)("yes", &mut runtime);
        assert!(resumed.success);
        assert!(resumed.message.contains("deleted"));
    }

    #[test]
    fn fs_delete_no_and_cancel_are_identical_cancellation() {
        let mut runtime = Runtime::new();
        let first = FsDeleteCommand.execute(&["myfile.txt".into()], &mut runtime);
        let mut feedback = first.feedback.unwrap();
        let no_result = (feedback.continuation)("no", &mut runtime);

        let first2 = FsDeleteCommand.execute(&["myfile.txt".into()], &mut runtime);
        let mut feedback2 = first2.feedback.unwrap();
        let cancel_result = (feedback2.continuation)("cancel", &mut runtime);

        assert_eq!(no_result.message, cancel_result.message);
        assert!(!no_result.success && !cancel_result.success);
    }

    #[test]
    fn fs_delete_unrecognized_answer_reprompts_with_same_options() {
        let mut runtime = Runtime::new();
        let first = FsDeleteCommand.execute(&["myfile.txt".into()], &mut runtime);
        let mut feedback = first.feedback.unwrap();
        let reprompted = (feedback.continuation)("maybe", &mut runtime);
        assert!(!reprompted.success);
        assert!(reprompted.requires_confirmation);
        let options = reprompted.feedback.as_ref().unwrap().options.clone();
        assert_eq!(options, vec!["yes".to_string(), "no".to_string(), "cancel".to_string()]);
    }
}
