//! Logical-line tokenizer for the Python subset the analyzer understands.
//!
//! Physical lines are joined into logical lines (bracket nesting, backslash
//! continuation, triple-quoted strings) so the parser can work on one
//! statement at a time with its indentation column.

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Ident(String),
    Number(String),
    /// String literal with quotes stripped and common escapes decoded.
    Str(String),
    Op(String),
}

impl Tok {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self, Tok::Op(o) if o == op)
    }

    pub fn is_ident(&self, name: &str) -> bool {
        matches!(self, Tok::Ident(i) if i == name)
    }
}

/// One statement's worth of tokens, with the indentation column and the
/// 1-based source line where it starts.
#[derive(Debug, Clone)]
pub struct LogicalLine {
    pub indent: usize,
    pub line: usize,
    pub toks: Vec<Tok>,
}

// Multi-character operators, longest first so the scan is greedy.
const OPS3: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const OPS2: &[&str] = &[
    "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const OPS1: &str = "+-*/%@&|^~<>=()[]{},:.;!";

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<LogicalLine>, String> {
    let mut lx = Lexer {
        src: source.as_bytes(),
        pos: 0,
        line: 1,
    };
    lx.run()
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, off: usize) -> Option<u8> {
        self.src.get(self.pos + off).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn run(&mut self) -> Result<Vec<LogicalLine>, String> {
        let mut lines = Vec::new();
        while self.pos < self.src.len() {
            if let Some(ll) = self.logical_line()? {
                lines.push(ll);
            }
        }
        Ok(lines)
    }

    /// Consume one logical line. Returns `None` for blank or comment-only
    /// lines.
    fn logical_line(&mut self) -> Result<Option<LogicalLine>, String> {
        // Measure indentation of the first physical line.
        let mut indent = 0usize;
        loop {
            match self.peek() {
                Some(b' ') => {
                    indent += 1;
                    self.pos += 1;
                }
                Some(b'\t') => {
                    indent += 8 - (indent % 8);
                    self.pos += 1;
                }
                _ => break,
            }
        }
        let start_line = self.line;

        let mut toks = Vec::new();
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => break,
                Some(b'\n') => {
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                    // implicit line joining inside brackets
                }
                Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b' ') | Some(b'\t') => {
                    self.pos += 1;
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\r') => {
                    self.pos += 1;
                    self.pos += 1;
                    if self.peek() == Some(b'\n') {
                        self.bump();
                    }
                }
                Some(b'\'') | Some(b'"') => {
                    let s = self.string_literal(false)?;
                    toks.push(Tok::Str(s));
                }
                Some(c) if c.is_ascii_digit() => {
                    toks.push(self.number());
                }
                Some(b'.') if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                    toks.push(self.number());
                }
                Some(c) if c.is_ascii_alphabetic() || c == b'_' => {
                    let ident = self.ident();
                    if is_string_prefix(&ident)
                        && matches!(self.peek(), Some(b'\'') | Some(b'"'))
                    {
                        let raw = ident.to_ascii_lowercase().contains('r');
                        let s = self.string_literal(raw)?;
                        toks.push(Tok::Str(s));
                    } else {
                        toks.push(Tok::Ident(ident));
                    }
                }
                Some(_) => {
                    let op = self.operator();
                    match op.as_str() {
                        "(" | "[" | "{" => depth += 1,
                        ")" | "]" | "}" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    toks.push(Tok::Op(op));
                }
            }
        }

        if toks.is_empty() {
            Ok(None)
        } else {
            Ok(Some(LogicalLine {
                indent,
                line: start_line,
                toks,
            }))
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == b'_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    fn number(&mut self) -> Tok {
        let start = self.pos;
        let mut prev = 0u8;
        while let Some(c) = self.peek() {
            let take = c.is_ascii_alphanumeric()
                || c == b'.'
                || c == b'_'
                || ((c == b'+' || c == b'-') && (prev == b'e' || prev == b'E'));
            if !take {
                break;
            }
            prev = c;
            self.pos += 1;
        }
        Tok::Number(String::from_utf8_lossy(&self.src[start..self.pos]).into_owned())
    }

    fn operator(&mut self) -> String {
        let rest = &self.src[self.pos..];
        for op in OPS3 {
            if rest.starts_with(op.as_bytes()) {
                self.pos += 3;
                return (*op).to_string();
            }
        }
        for op in OPS2 {
            if rest.starts_with(op.as_bytes()) {
                self.pos += 2;
                return (*op).to_string();
            }
        }
        let c = self.src[self.pos];
        self.pos += 1;
        if OPS1.as_bytes().contains(&c) {
            (c as char).to_string()
        } else {
            // Unknown byte (unicode operator, stray char): pass through as an
            // opaque op so the statement around it still parses.
            (c as char).to_string()
        }
    }

    fn string_literal(&mut self, raw: bool) -> Result<String, String> {
        let quote = self.bump().expect("caller checked quote");
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }
        let start_line = self.line;
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(format!(
                    "unterminated string literal starting at line {}",
                    start_line
                ));
            };
            if c == b'\\' {
                let Some(esc) = self.bump() else {
                    return Err(format!(
                        "unterminated string literal starting at line {}",
                        start_line
                    ));
                };
                if raw {
                    out.push('\\');
                    out.push(esc as char);
                } else {
                    match esc {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'r' => out.push('\r'),
                        b'\\' => out.push('\\'),
                        b'\'' => out.push('\''),
                        b'"' => out.push('"'),
                        b'\n' => {}
                        other => {
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                }
                continue;
            }
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.bump();
                    self.bump();
                    break;
                }
                out.push(quote as char);
                continue;
            }
            if c == b'\n' && !triple {
                return Err(format!(
                    "unterminated string literal starting at line {}",
                    start_line
                ));
            }
            out.push(c as char);
        }
        Ok(out)
    }
}

fn is_string_prefix(ident: &str) -> bool {
    ident.len() <= 2
        && !ident.is_empty()
        && ident
            .chars()
            .all(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'f' | 'u'))
}
