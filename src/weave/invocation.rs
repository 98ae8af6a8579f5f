//! Parses the command invocation grammar:
//! `[<namespace> ":"] <name> "(" [ <arg> ("," <arg>)* ] ")" [ "." <ext> "(" [ <ext_arg> ("," <ext_arg>)* ] ")" ]`

use crate::error::{ErrorKind, WeaveError};
use crate::token::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub namespace: Option<String>,
    pub name: String,
    pub args: Vec<String>,
    pub extension: Option<(String, Vec<String>)>,
}

pub fn parse_invocation(text: &str) -> Result<Invocation, WeaveError> {
    let chars: Vec<char> = text.chars().collect();
    let open = chars.iter().position(|c| *c == '(').ok_or_else(|| syntax_error("missing '(' in command invocation"))?;

    let head: String = chars[..open].iter().collect();
    let head = head.trim();
    if head.is_empty() {
        return Err(syntax_error("missing command name"));
    }
    let (namespace, name) = match head.split_once(':') {
        Some((ns, name)) => (Some(ns.trim().to_string()), name.trim().to_string()),
        None => (None, head.to_string()),
    };
    if name.is_empty() {
        return Err(syntax_error("missing command name"));
    }

    let (args, after_args) = split_call(&chars, open)?;

    let extension = if after_args < chars.len() && chars[after_args] == '.' {
        let ext_open = chars[after_args + 1..]
            .iter()
            .position(|c| *c == '(')
            .map(|p| p + after_args + 1)
            .ok_or_else(|| syntax_error("missing '(' in extension invocation"))?;
        let ext_name: String = chars[after_args + 1..ext_open].iter().collect();
        let ext_name = ext_name.trim().to_string();
        if ext_name.is_empty() {
            return Err(syntax_error("missing extension name"));
        }
        let (ext_args, _) = split_call(&chars, ext_open)?;
        Some((ext_name, ext_args))
    } else {
        None
    };

    Ok(Invocation { namespace, name, args, extension })
}

fn syntax_error(message: &str) -> WeaveError {
    WeaveError::new(ErrorKind::Syntax, message, Span::default())
}

/// `chars[start]` must be `(`. Returns the parsed, trimmed, unquoted
/// argument list and the index just past the matching `)`.
fn split_call(chars: &[char], start: usize) -> Result<(Vec<String>, usize), WeaveError> {
    debug_assert_eq!(chars[start], '(');
    let mut depth = 1i32;
    let mut i = start + 1;
    let mut arg_start = i;
    let mut args = Vec::new();
    let mut in_quote: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = in_quote {
            if c == q {
                in_quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '"' | '\'' => {
                in_quote = Some(c);
                i += 1;
            }
            '(' => {
                depth += 1;
                i += 1;
            }
            ')' => {
                depth -= 1;
                i += 1;
                if depth == 0 {
                    push_arg(chars, arg_start, i - 1, &mut args);
                    return Ok((args, i));
                }
            }
            ',' if depth == 1 => {
                push_arg(chars, arg_start, i, &mut args);
                i += 1;
                arg_start = i;
            }
            _ => i += 1,
        }
    }

    Err(syntax_error("unbalanced parentheses in command invocation"))
}

fn push_arg(chars: &[char], start: usize, end: usize, args: &mut Vec<String>) {
    if start == end {
        return;
    }
    let raw: String = chars[start..end].iter().collect();
    let trimmed = raw.trim();
    args.push(strip_quotes(trimmed).to_string());
}

fn strip_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return &text[1..text.len() - 1];
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespace_name_and_args() {
        let inv = parse_invocation("fs:delete(myfile.txt)").unwrap();
        assert_eq!(inv.namespace.as_deref(), Some("fs"));
        assert_eq!(inv.name, "delete");
        assert_eq!(inv.args, vec!["myfile.txt".to_string()]);
    }

    #[test]
    fn parses_quoted_args_with_commas_preserved() {
        let inv = parse_invocation("setValue(key, \"a, b\", Wstring)").unwrap();
        assert_eq!(inv.args, vec!["key".to_string(), "a, b".to_string(), "Wstring".to_string()]);
    }

    #[test]
    fn parses_extension() {
        let inv = parse_invocation("evaluate(1 + 2).store(total)").unwrap();
        assert_eq!(inv.name, "evaluate");
        let (ext_name, ext_args) = inv.extension.unwrap();
        assert_eq!(ext_name, "store");
        assert_eq!(ext_args, vec!["total".to_string()]);
    }

    #[test]
    fn no_args_call_parses_empty_list() {
        let inv = parse_invocation("list()").unwrap();
        assert_eq!(inv.args, Vec::<String>::new());
    }

    #[test]
    fn unbalanced_parens_fail() {
        let err = parse_invocation("setValue(key, 1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Syntax);
    }
}
