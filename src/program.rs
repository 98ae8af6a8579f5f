//! One-shot compile (lex + parse + lower) and run (executor + dispatcher)
//! entry point.

use crate::ast::Block;
use crate::error::WeaveError;
use crate::executor::Executor;
use crate::lexer::Lexer;
use crate::lowering::{lower, Instruction};
use crate::parser::Parser;
use crate::weave::{CommandResult, Weave};

/// A compiled program: the source it was built from and its lowered
/// instruction list. Compiling the same text twice yields an equal
/// instruction sequence (compilation has no hidden state).
#[derive(Debug, Clone)]
pub struct Program {
    pub source: String,
    pub instructions: Vec<Instruction>,
}

impl Program {
    /// Lex, parse and lower `text`. No registry is available yet, so
    /// lowering does not attempt variable substitution.
    pub fn compile(text: &str) -> Result<Program, WeaveError> {
        let tokens = Lexer::tokenize(text);
        let ast: Block = Parser::parse(&tokens)?;
        let instructions = lower(&ast, None)?;
        Ok(Program { source: text.to_string(), instructions })
    }

    /// Run to completion, pumping `execute_next` until the program
    /// finishes or hits a pending feedback request it cannot resolve on
    /// its own. `max_iterations` bounds the total number of dispatcher
    /// steps; exceeding it surfaces as `WeaveError` with `max_iterations`.
    pub fn run(&self, weave: &mut Weave, max_iterations: usize) -> Result<Vec<CommandResult>, WeaveError> {
        let mut executor = self.stepper();
        let mut results = Vec::new();
        let mut iterations = 0usize;

        while !executor.finished() {
            if iterations >= max_iterations {
                return Err(WeaveError::new(
                    crate::error::ErrorKind::MaxIterations,
                    "max iterations reached",
                    crate::token::Span::default(),
                ));
            }
            let result = executor.execute_next(weave, None)?;
            if executor.awaiting_feedback() {
                results.push(result);
                break;
            }
            results.push(result);
            iterations += 1;
        }

        Ok(results)
    }

    /// An executor over this program's instructions, for interactive
    /// stepping (tests, debuggers, feedback-driven hosts).
    pub fn stepper(&self) -> Executor {
        Executor::new(self.instructions.clone())
    }
}
