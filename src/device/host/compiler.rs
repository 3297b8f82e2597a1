//! Front-end checks the host device runs in place of a driver compiler.
//!
//! The host device never executes kernel source, but it rejects the same
//! class of mistakes a driver would reject before code generation so that
//! a broken kernel fails identically on every backend.

use crate::config::is_identifier;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'s> {
    Ident(&'s str),
    Punct(char),
}

struct Diagnostics {
    log: String,
}

impl Diagnostics {
    fn error(&mut self, line: usize, col: usize, msg: impl AsRef<str>) {
        let _ = writeln!(self.log, "<kernel>:{}:{}: error: {}", line, col, msg.as_ref());
    }

    fn option_error(&mut self, msg: impl AsRef<str>) {
        let _ = writeln!(self.log, "<command line>: error: {}", msg.as_ref());
    }

    fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

/// Validate `options` and `source`, returning the names of every kernel
/// function defined, or the build log.
pub(crate) fn build(source: &str, options: &str) -> Result<Vec<String>, String> {
    let mut diag = Diagnostics { log: String::new() };

    check_options(options, &mut diag);
    let tokens = scan(source, &mut diag);

    if !diag.is_empty() {
        return Err(diag.log);
    }
    Ok(kernel_names(&tokens))
}

fn check_options(options: &str, diag: &mut Diagnostics) {
    for opt in options.split_whitespace() {
        if let Some(def) = opt.strip_prefix("-D") {
            let (name, value) = match def.split_once('=') {
                Some((n, v)) => (n, Some(v)),
                None => (def, None),
            };
            if !is_identifier(name) {
                diag.option_error(format!("invalid macro name in `{}`", opt));
            }
            if let Some(v) = value {
                if v.parse::<i64>().is_err() {
                    diag.option_error(format!("macro value in `{}` is not an integer", opt));
                }
            }
        } else if !opt.starts_with("-cl-") && !opt.starts_with("-I") {
            diag.option_error(format!("unrecognized build option `{}`", opt));
        }
    }
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Tokenize outside comments and literals while checking delimiter balance.
fn scan<'s>(source: &'s str, diag: &mut Diagnostics) -> Vec<Token<'s>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut stack: Vec<(char, usize, usize)> = Vec::new();
    let (mut line, mut col) = (1usize, 1usize);
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;

        if c == '\n' {
            line += 1;
            col = 1;
            i += 1;
            continue;
        }

        if c == '/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
            continue;
        }

        if c == '/' && bytes.get(i + 1) == Some(&b'*') {
            let (start_line, start_col) = (line, col);
            i += 2;
            col += 2;
            let mut closed = false;
            while i < bytes.len() {
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    i += 2;
                    col += 2;
                    closed = true;
                    break;
                }
                if bytes[i] == b'\n' {
                    line += 1;
                    col = 1;
                } else {
                    col += 1;
                }
                i += 1;
            }
            if !closed {
                diag.error(start_line, start_col, "unterminated /* comment");
            }
            continue;
        }

        if c == '"' || c == '\'' {
            let (start_line, start_col) = (line, col);
            i += 1;
            col += 1;
            let mut closed = false;
            while i < bytes.len() && bytes[i] != b'\n' {
                if bytes[i] == b'\\' {
                    i += 2;
                    col += 2;
                    continue;
                }
                if bytes[i] as char == c {
                    i += 1;
                    col += 1;
                    closed = true;
                    break;
                }
                i += 1;
                col += 1;
            }
            if !closed {
                let what = if c == '"' { "string" } else { "character" };
                diag.error(start_line, start_col, format!("missing terminating {} quote", what));
            }
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            col += i - start;
            tokens.push(Token::Ident(&source[start..i]));
            continue;
        }

        match c {
            '(' | '[' | '{' => stack.push((c, line, col)),
            ')' | ']' | '}' => match stack.pop() {
                Some((open, _, _)) if closer_for(open) == c => {}
                Some((open, l, cl)) => {
                    diag.error(
                        line,
                        col,
                        format!("expected `{}` to match `{}` at {}:{}, found `{}`", closer_for(open), open, l, cl, c),
                    );
                }
                None => diag.error(line, col, format!("unmatched `{}`", c)),
            },
            _ => {}
        }

        if !c.is_ascii_whitespace() {
            tokens.push(Token::Punct(c));
        }

        // multi-byte characters only ever appear in comments and literals
        // of valid kernels; step over the whole code point
        let width = source[i..].chars().next().map_or(1, char::len_utf8);
        i += width;
        col += 1;
    }

    for (open, l, cl) in stack {
        diag.error(l, cl, format!("`{}` is never closed", open));
    }

    tokens
}

/// Names following `kernel`/`__kernel` ... `void`.
fn kernel_names(tokens: &[Token<'_>]) -> Vec<String> {
    let mut names = Vec::new();

    for (i, tok) in tokens.iter().enumerate() {
        if !matches!(tok, Token::Ident("kernel") | Token::Ident("__kernel")) {
            continue;
        }

        let rest = &tokens[i + 1..];
        let Some(void_at) = rest
            .iter()
            .take_while(|t| !matches!(t, Token::Punct(';') | Token::Punct('{')))
            .position(|t| *t == Token::Ident("void"))
        else {
            continue;
        };

        if let (Some(Token::Ident(name)), Some(Token::Punct('('))) =
            (rest.get(void_at + 1), rest.get(void_at + 2))
        {
            names.push(name.to_string());
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"
        #define A(i, j) A[(j) * M + (i)]
        /* block comment with ) unbalanced text */
        __kernel void scale(__global double* A, int M) {
            const int i = get_global_id(0); // trailing ( comment
            A(i, 0) *= 2.0;
        }
        kernel __attribute__((reqd_work_group_size(1, 1, 1))) void other(int x) { }
        void helper(int x) { }
    "#;

    #[test]
    fn test_discovers_kernel_names() {
        let names = build(GOOD, " -DTHREAD_BLOCK_SIZE=32 -DLOWER=0").unwrap();
        assert_eq!(names, vec!["scale".to_string(), "other".to_string()]);
    }

    #[test]
    fn test_unbalanced_brace_is_reported() {
        let log = build("__kernel void f(int x) {\n  if (x) {\n}\n", "").unwrap_err();
        assert!(log.contains("never closed"), "{}", log);
        assert!(log.contains(":1:"), "{}", log);
    }

    #[test]
    fn test_mismatched_closer() {
        let log = build("__kernel void f(int x] { }", "").unwrap_err();
        assert!(log.contains("expected `)`"), "{}", log);
    }

    #[test]
    fn test_unterminated_comment_and_string() {
        assert!(build("/* open", "").unwrap_err().contains("unterminated"));
        assert!(build("const char* s = \"abc;\n", "")
            .unwrap_err()
            .contains("terminating string"));
    }

    #[test]
    fn test_bad_options() {
        assert!(build(GOOD, "-D9BAD=1").is_err());
        assert!(build(GOOD, "-DGOOD=x").is_err());
        assert!(build(GOOD, "--fast").is_err());
        assert!(build(GOOD, "-cl-fast-relaxed-math -DFLAG").is_ok());
    }

    #[test]
    fn test_no_kernels() {
        assert!(build("void helper() {}", "").unwrap().is_empty());
    }
}
