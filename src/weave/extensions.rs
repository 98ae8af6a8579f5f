//! Global extensions: post-processors attached to any command invocation
//! via `.<name>(args)`, tried before a command's own local extensions.

use crate::value::Value;
use crate::weave::command::{CommandResult, Runtime};

pub trait Extension: Send {
    fn name(&self) -> &str;

    /// `replay` re-executes the original command call and returns its
    /// result; the extension decides what, if anything, to do with it.
    fn invoke(
        &self,
        ext_args: &[String],
        runtime: &mut Runtime,
        replay: &mut dyn FnMut(&mut Runtime) -> CommandResult,
    ) -> CommandResult;
}

/// `store([key])`: after a command whose result carries a value, write
/// that value into the registry under `key` (default `"result"`),
/// preserving its tag.
pub struct StoreExtension;

impl Extension for StoreExtension {
    fn name(&self) -> &str {
        "store"
    }

    fn invoke(&self, ext_args: &[String], runtime: &mut Runtime, replay: &mut dyn FnMut(&mut Runtime) -> CommandResult) -> CommandResult {
        let result = replay(runtime);
        if !result.success {
            return result;
        }
        let key = ext_args.first().map(|s| s.as_str()).unwrap_or("result");
        if let Some(value) = &result.value {
            runtime.registry.set(key, clone_value(value));
        }
        result
    }
}

fn clone_value(value: &Value) -> Value {
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn store_writes_replayed_value_under_key() {
        let mut runtime = Runtime::new();
        let ext = StoreExtension;
        let result = ext.invoke(&["total".to_string()], &mut runtime, &mut |_rt| {
            CommandResult::success_with_value("9", Value::Double(9.0))
        });
        assert!(result.success);
        assert_eq!(runtime.registry.get("total"), Some(&Value::Double(9.0)));
    }

    #[test]
    fn store_defaults_key_to_result() {
        let mut runtime = Runtime::new();
        let ext = StoreExtension;
        ext.invoke(&[], &mut runtime, &mut |_rt| CommandResult::success_with_value("1", Value::Int(1)));
        assert_eq!(runtime.registry.get("result"), Some(&Value::Int(1)));
    }
}
