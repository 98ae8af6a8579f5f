//! Flattens the typed AST into a linear, categorized instruction list that
//! the executor steps through without ever recursing through the host
//! call stack.

use crate::ast::{Block, NodeKind};
use crate::error::{ErrorKind, WeaveError};
use crate::lexer::Lexer;
use crate::token::{Span, TokenKind};
use crate::value::Registry;

/// The closed set of instruction categories. Payload semantics are
/// documented per-variant; categories with no payload carry `None`.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Label(String),
    Goto(String),
    Command(String),
    CommandRewrite(String),
    Assignment { variable: String, expression: String },
    IfCondition(String),
    IfOpen(String),
    IfEnd(String),
    ElseOpen(String),
    ElseEnd(String),
    DoOpen,
    DoEnd,
    WhileCondition(String),
}

/// Lower a parsed block into instructions. When `registry` is supplied,
/// known variables inside assignment expressions are substituted with
/// their literal values before the assignment is classified.
pub fn lower(block: &Block, registry: Option<&Registry>) -> Result<Vec<Instruction>, WeaveError> {
    let mut out = Vec::new();
    lower_block(block, registry, "", &mut out)?;
    Ok(out)
}

fn lower_block(block: &Block, registry: Option<&Registry>, path: &str, out: &mut Vec<Instruction>) -> Result<(), WeaveError> {
    for node in block {
        lower_node(node, registry, path, out)?;
    }
    Ok(())
}

fn lower_node(node: &crate::ast::Node, registry: Option<&Registry>, path: &str, out: &mut Vec<Instruction>) -> Result<(), WeaveError> {
    match &node.kind {
        NodeKind::Label(name) => out.push(Instruction::Label(name.clone())),
        NodeKind::Goto(target) => out.push(Instruction::Goto(target.clone())),
        NodeKind::Command(text) => out.push(Instruction::Command(text.clone())),
        NodeKind::Assignment { variable, expression } => {
            lower_assignment(variable, expression, registry, out)?;
        }
        NodeKind::If { condition, true_branch, false_branch } => {
            let true_path = format!("{}T", path);
            out.push(Instruction::IfCondition(condition.clone()));
            out.push(Instruction::IfOpen(true_path.clone()));
            lower_block(true_branch, registry, &true_path, out)?;
            out.push(Instruction::IfEnd(true_path));
            if let Some(false_branch) = false_branch {
                let false_path = format!("{}F", path);
                out.push(Instruction::ElseOpen(false_path.clone()));
                lower_block(false_branch, registry, &false_path, out)?;
                out.push(Instruction::ElseEnd(false_path));
            }
        }
        NodeKind::DoWhile { body, condition } => {
            out.push(Instruction::DoOpen);
            lower_block(body, registry, path, out)?;
            out.push(Instruction::DoEnd);
            out.push(Instruction::WhileCondition(condition.clone()));
        }
    }
    Ok(())
}

const EVALUATE_COMMAND_CHARS: &str = "+-*/<>=!&|";

fn lower_assignment(
    variable: &str,
    expression: &str,
    registry: Option<&Registry>,
    out: &mut Vec<Instruction>,
) -> Result<(), WeaveError> {
    let expression = match registry {
        Some(registry) => substitute_variables(expression, registry),
        None => expression.to_string(),
    };

    if let Some(call) = as_trailing_call(&expression) {
        out.push(Instruction::CommandRewrite(format!("{}.Store({})", call, variable)));
        return Ok(());
    }

    if expression.chars().all(|c| c.is_alphanumeric() || c.is_whitespace() || EVALUATE_COMMAND_CHARS.contains(c)) {
        out.push(Instruction::CommandRewrite(format!("EvaluateCommand({}, {})", expression, variable)));
        return Ok(());
    }

    Err(WeaveError::new(
        ErrorKind::UnsupportedExpression,
        format!("unsupported assignment right-hand side: '{}'", expression),
        Span::default(),
    ))
}

/// True iff `expr` is `<identifier> ( ... )` with the closing paren at
/// the very end of the trimmed text, i.e. the whole expression is one
/// command call.
fn as_trailing_call(expr: &str) -> Option<&str> {
    let trimmed = expr.trim();
    if !trimmed.ends_with(')') {
        return None;
    }
    let open = trimmed.find('(')?;
    let name = trimmed[..open].trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':') {
        return None;
    }
    let mut depth = 0i32;
    for (i, c) in trimmed.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return if i == trimmed.len() - 1 { Some(trimmed) } else { None };
                }
            }
            _ => {}
        }
    }
    None
}

/// Replace every identifier token that names a registry entry with that
/// entry's literal text. Strings are re-quoted; everything else uses its
/// invariant display form.
fn substitute_variables(expr: &str, registry: &Registry) -> String {
    let tokens = Lexer::tokenize(expr);
    let mut out = String::new();
    for tok in &tokens {
        if !out.is_empty() {
            out.push(' ');
        }
        if tok.kind == TokenKind::Identifier {
            if let Some(value) = registry.get(&tok.lexeme) {
                out.push_str(&value.as_literal());
                continue;
            }
        }
        if tok.kind == TokenKind::String {
            out.push('"');
            out.push_str(&tok.lexeme);
            out.push('"');
        } else {
            out.push_str(&tok.lexeme);
        }
    }
    out
}
