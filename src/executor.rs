//! Stepping interpreter over the lowered instruction list. Sequences,
//! branches, loops and goto are all expressed as program-counter
//! movement — no recursion through the host call stack.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::error::{ErrorKind, WeaveError};
use crate::eval;
use crate::lowering::Instruction;
use crate::token::Span;
use crate::weave::{CommandResult, Weave};

const DEFAULT_INTERNAL_STEP_CAP: usize = 100_000;

pub struct Executor {
    instructions: Vec<Instruction>,
    label_map: HashMap<String, usize>,
    pc: usize,
    do_stack: Vec<usize>,
    awaiting_feedback: bool,
    internal_step_cap: usize,
}

impl Executor {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let label_map = instructions
            .iter()
            .enumerate()
            .filter_map(|(i, instr)| match instr {
                Instruction::Label(name) => Some((name.clone(), i)),
                _ => None,
            })
            .collect();

        Self {
            instructions,
            label_map,
            pc: 0,
            do_stack: Vec::new(),
            awaiting_feedback: false,
            internal_step_cap: DEFAULT_INTERNAL_STEP_CAP,
        }
    }

    pub fn with_internal_step_cap(mut self, cap: usize) -> Self {
        self.internal_step_cap = cap;
        self
    }

    pub fn finished(&self) -> bool {
        self.pc >= self.instructions.len() && !self.awaiting_feedback
    }

    pub fn awaiting_feedback(&self) -> bool {
        self.awaiting_feedback
    }

    /// Advance the program by exactly one dispatcher-visible step. A run
    /// of pure control-flow instructions (labels, loop markers, branch
    /// markers) is consumed silently within this call and does not
    /// produce its own result; the first command, assignment, or the end
    /// of the program yields the returned `CommandResult`.
    pub fn execute_next(&mut self, weave: &mut Weave, feedback_input: Option<&str>) -> Result<CommandResult, WeaveError> {
        if self.awaiting_feedback {
            let Some(input) = feedback_input else {
                return Err(WeaveError::new(ErrorKind::MissingFeedbackInput, "a pending feedback request requires input", Span::default()));
            };
            let result = weave.process(input)?;
            if !weave.has_pending_feedback() {
                self.awaiting_feedback = false;
                self.pc += 1;
            }
            return Ok(result);
        }

        let mut steps = 0usize;
        loop {
            if self.pc >= self.instructions.len() {
                return Ok(CommandResult::success("program finished"));
            }

            steps += 1;
            if steps > self.internal_step_cap {
                return Err(WeaveError::new(ErrorKind::MaxIterations, "max iterations reached", Span::default()));
            }

            match &self.instructions[self.pc] {
                Instruction::Label(_) => {
                    self.pc += 1;
                }
                Instruction::Goto(target) => match self.label_map.get(target) {
                    Some(index) => {
                        trace!(target = %target, from = self.pc, to = index + 1, "goto");
                        self.pc = index + 1;
                    }
                    None => return Err(WeaveError::new(ErrorKind::UnknownLabel, format!("unknown label '{}'", target), Span::default())),
                },
                Instruction::DoOpen => {
                    self.do_stack.push(self.pc + 1);
                    self.pc += 1;
                }
                Instruction::DoEnd => {
                    self.pc += 1;
                }
                Instruction::WhileCondition(expr) => match self.do_stack.last().copied() {
                    None => {
                        // Malformed program: a dangling while with no
                        // matching do. Not fatal — just move on.
                        warn!(pc = self.pc, "while condition with empty do-stack");
                        self.pc += 1;
                    }
                    Some(back_edge) => {
                        if eval::evaluate_boolean(expr, weave.registry())? {
                            trace!(back_edge, "do-while back-edge taken");
                            self.pc = back_edge;
                        } else {
                            self.do_stack.pop();
                            self.pc += 1;
                        }
                    }
                },
                Instruction::IfCondition(expr) => {
                    if eval::evaluate_boolean(expr, weave.registry())? {
                        self.pc += 1;
                    } else {
                        self.pc = self.skip_false_branch(self.pc)?;
                    }
                }
                Instruction::IfOpen(_) | Instruction::IfEnd(_) | Instruction::ElseOpen(_) | Instruction::ElseEnd(_) => {
                    self.pc += 1;
                }
                Instruction::Command(text) => {
                    return self.dispatch(weave, text.clone());
                }
                Instruction::CommandRewrite(payload) => {
                    let invocation = translate_rewrite(payload);
                    return self.dispatch(weave, invocation);
                }
                Instruction::Assignment { variable, expression } => {
                    let invocation = format!("evaluate({}, {})", expression, variable);
                    return self.dispatch(weave, invocation);
                }
            }
        }
    }

    fn dispatch(&mut self, weave: &mut Weave, invocation_text: String) -> Result<CommandResult, WeaveError> {
        let result = weave.process(&invocation_text)?;
        if weave.has_pending_feedback() {
            self.awaiting_feedback = true;
        } else {
            self.pc += 1;
        }
        Ok(result)
    }

    /// Scan forward from a false `If_Condition` at `if_condition_pc` to
    /// find the matching `If_End`, skipping over fully nested if/else
    /// statements by tracking `If_Condition`/`If_End` depth. Lands on the
    /// else body (just past `Else_Open`) when present, otherwise just
    /// past the `If_End`.
    fn skip_false_branch(&self, if_condition_pc: usize) -> Result<usize, WeaveError> {
        let mut i = if_condition_pc + 2; // past our own If_Condition and If_Open
        let mut depth = 0i32;
        loop {
            let Some(instr) = self.instructions.get(i) else {
                return Err(WeaveError::new(ErrorKind::Syntax, "unterminated if statement", Span::default()));
            };
            match instr {
                Instruction::IfCondition(_) => {
                    depth += 1;
                    i += 1;
                }
                Instruction::IfEnd(_) => {
                    if depth == 0 {
                        return Ok(match self.instructions.get(i + 1) {
                            Some(Instruction::ElseOpen(_)) => i + 2,
                            _ => i + 1,
                        });
                    }
                    depth -= 1;
                    i += 1;
                }
                _ => i += 1,
            }
        }
    }
}

/// Translate a lowering-produced rewrite payload into dispatcher
/// invocation syntax. `EvaluateCommand(expr, var)` becomes
/// `evaluate(expr, var)`; `<call>.Store(var)` becomes `<call>.store(var)`
/// (extension names are matched case-insensitively by the dispatcher).
fn translate_rewrite(payload: &str) -> String {
    if let Some(inner) = payload.strip_prefix("EvaluateCommand(").and_then(|s| s.strip_suffix(')')) {
        if let Some((expr, var)) = inner.rsplit_once(',') {
            return format!("evaluate({}, {})", expr.trim(), var.trim());
        }
    }
    if let Some(idx) = payload.find(".Store(") {
        let call = &payload[..idx];
        let rest = &payload[idx + ".Store(".len()..];
        let var = rest.trim_end_matches(')');
        return format!("{}.store({})", call.trim(), var.trim());
    }
    payload.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::lowering::lower;
    use crate::parser::Parser;
    use crate::value::Value;

    fn compile(src: &str) -> Vec<Instruction> {
        let tokens = Lexer::tokenize(src);
        let block = Parser::parse(&tokens).expect("parse");
        lower(&block, None).expect("lower")
    }

    fn run_to_completion(src: &str, weave: &mut Weave) {
        let mut executor = Executor::new(compile(src));
        let mut guard = 0;
        while !executor.finished() {
            executor.execute_next(weave, None).expect("step should succeed");
            guard += 1;
            assert!(guard < 10_000, "executor did not terminate");
        }
    }

    #[test]
    fn do_while_executes_body_exactly_three_times() {
        let mut weave = Weave::new();
        run_to_completion("setValue(counter, 0, Wint); do { counter = counter + 1; } while (counter < 3);", &mut weave);
        assert_eq!(weave.registry().get("counter"), Some(&Value::Double(3.0)));
    }

    #[test]
    fn do_while_runs_body_once_even_if_condition_starts_false() {
        let mut weave = Weave::new();
        run_to_completion("setValue(ran, 0, Wint); do { ran = ran + 1; } while (false);", &mut weave);
        assert_eq!(weave.registry().get("ran"), Some(&Value::Double(1.0)));
    }

    #[test]
    fn if_true_branch_only() {
        let mut weave = Weave::new();
        run_to_completion("setValue(x, 1, Wint); if (x > 0) { setValue(y, 10, Wint); } else { setValue(y, 20, Wint); }", &mut weave);
        assert_eq!(weave.registry().get("y"), Some(&Value::Int(10)));
    }

    #[test]
    fn if_false_branch_only() {
        let mut weave = Weave::new();
        run_to_completion("setValue(x, 0, Wint); if (x > 0) { setValue(y, 10, Wint); } else { setValue(y, 20, Wint); }", &mut weave);
        assert_eq!(weave.registry().get("y"), Some(&Value::Int(20)));
    }

    #[test]
    fn goto_unknown_label_fails() {
        let mut weave = Weave::new();
        let mut executor = Executor::new(compile("goto nowhere;"));
        let err = executor.execute_next(&mut weave, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownLabel);
    }

    #[test]
    fn feedback_suspends_then_resumes() {
        let mut weave = Weave::new();
        let mut executor = Executor::new(compile("fs:delete(myfile.txt);"));
        let first = executor.execute_next(&mut weave, None).unwrap();
        assert!(first.requires_confirmation);
        assert!(executor.awaiting_feedback());
        assert!(!executor.finished());

        let second = executor.execute_next(&mut weave, Some("yes")).unwrap();
        assert!(second.success);
        assert!(executor.finished());
    }

    #[test]
    fn arithmetic_store_scenario() {
        let mut weave = Weave::new();
        let mut executor = Executor::new(compile("evaluate(1 + 2 + 3);"));
        let result = executor.execute_next(&mut weave, None).unwrap();
        assert!(result.success);
        assert_eq!(result.message, "6");
    }
}
