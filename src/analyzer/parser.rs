//! Indentation-based statement parser.
//!
//! Builds a statement tree that keeps exactly what the analyzer needs:
//! imports, definitions, assignments, returns and the raw token runs of
//! expression positions (for usage extraction). Expressions are not parsed
//! into trees; classification happens on token spans.

use super::lexer::{tokenize, LogicalLine, Tok};

#[derive(Debug, Clone)]
pub struct ImportAlias {
    pub name: String,
    pub asname: Option<String>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Import {
        names: Vec<ImportAlias>,
        line: usize,
    },
    FromImport {
        module: String,
        names: Vec<ImportAlias>,
        line: usize,
    },
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        line: usize,
    },
    ClassDef {
        name: String,
        body: Vec<Stmt>,
        line: usize,
    },
    If {
        /// Condition tokens per `if`/`elif` arm (the `else` arm has none).
        headers: Vec<Vec<Tok>>,
        branches: Vec<Vec<Stmt>>,
        line: usize,
    },
    /// `for` or `while`; the header tokens are the iterable / condition.
    Loop {
        header: Vec<Tok>,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
        line: usize,
    },
    Try {
        headers: Vec<Vec<Tok>>,
        bodies: Vec<Vec<Stmt>>,
        line: usize,
    },
    With {
        header: Vec<Tok>,
        body: Vec<Stmt>,
        line: usize,
    },
    Return {
        value: Vec<Tok>,
        line: usize,
    },
    Global {
        names: Vec<String>,
        line: usize,
    },
    Assign {
        /// Simple name targets (`x = ...`, `x = y = ...`).
        targets: Vec<String>,
        /// Tokens of non-name targets (`a[0]`, `obj.attr`), kept for usage
        /// extraction.
        target_toks: Vec<Tok>,
        value: Vec<Tok>,
        line: usize,
    },
    /// Any other statement; tokens kept for usage extraction.
    Expr {
        toks: Vec<Tok>,
        line: usize,
    },
}

pub fn parse(source: &str) -> Result<Vec<Stmt>, String> {
    let lines = tokenize(source)?;
    if lines.is_empty() {
        return Ok(Vec::new());
    }
    let indent = lines[0].indent;
    let mut pos = 0;
    Ok(parse_block(&lines, &mut pos, indent))
}

fn parse_block(lines: &[LogicalLine], pos: &mut usize, indent: usize) -> Vec<Stmt> {
    let mut out = Vec::new();
    while *pos < lines.len() {
        let ll = &lines[*pos];
        if ll.indent < indent {
            break;
        }
        if ll.indent > indent {
            // Stray over-indented line; record it as a bare statement so the
            // surrounding block still parses.
            *pos += 1;
            out.extend(parse_simple(&ll.toks, ll.line));
            continue;
        }
        parse_stmt(lines, pos, &mut out);
    }
    out
}

/// Parse the suite of a compound statement: either the indented block that
/// follows, or the inline remainder after the header colon.
fn parse_suite(
    lines: &[LogicalLine],
    pos: &mut usize,
    parent_indent: usize,
    inline: Option<(&[Tok], usize)>,
) -> Vec<Stmt> {
    if let Some((toks, line)) = inline {
        if !toks.is_empty() {
            return parse_simple(toks, line);
        }
    }
    match lines.get(*pos) {
        Some(next) if next.indent > parent_indent => parse_block(lines, pos, next.indent),
        _ => Vec::new(),
    }
}

fn parse_stmt(lines: &[LogicalLine], pos: &mut usize, out: &mut Vec<Stmt>) {
    let ll = lines[*pos].clone();
    *pos += 1;
    let toks = &ll.toks;
    let line = ll.line;
    let indent = ll.indent;

    let mut head = 0;
    if toks[0].is_ident("async") {
        head = 1;
    }
    let keyword = match toks.get(head) {
        Some(Tok::Ident(k)) => k.as_str(),
        _ => "",
    };

    match keyword {
        "import" => out.push(parse_import(&toks[head + 1..], line)),
        "from" => out.push(parse_from_import(&toks[head + 1..], line)),
        "def" => {
            let (name, params, inline) = parse_def_header(&toks[head + 1..]);
            let body = parse_suite(lines, pos, indent, inline.map(|t| (t, line)));
            out.push(Stmt::FunctionDef {
                name,
                params,
                body,
                line,
            });
        }
        "class" => {
            let name = match toks.get(head + 1) {
                Some(Tok::Ident(n)) => n.clone(),
                _ => String::new(),
            };
            let inline = after_header_colon(&toks[head + 1..]);
            let body = parse_suite(lines, pos, indent, inline.map(|t| (t, line)));
            out.push(Stmt::ClassDef { name, body, line });
        }
        "if" => {
            let mut headers = Vec::new();
            let mut branches = Vec::new();
            let (cond, inline) = split_header_colon(&toks[head + 1..]);
            headers.push(cond.to_vec());
            branches.push(parse_suite(lines, pos, indent, inline.map(|t| (t, line))));
            while let Some(next) = lines.get(*pos) {
                if next.indent != indent {
                    break;
                }
                match next.toks.first() {
                    Some(t) if t.is_ident("elif") => {
                        let next = next.clone();
                        *pos += 1;
                        let (cond, inline) = split_header_colon(&next.toks[1..]);
                        headers.push(cond.to_vec());
                        branches.push(parse_suite(
                            lines,
                            pos,
                            indent,
                            inline.map(|t| (t, next.line)),
                        ));
                    }
                    Some(t) if t.is_ident("else") => {
                        let next = next.clone();
                        *pos += 1;
                        let (_, inline) = split_header_colon(&next.toks[1..]);
                        branches.push(parse_suite(
                            lines,
                            pos,
                            indent,
                            inline.map(|t| (t, next.line)),
                        ));
                        break;
                    }
                    _ => break,
                }
            }
            out.push(Stmt::If {
                headers,
                branches,
                line,
            });
        }
        "for" | "while" => {
            let (header_toks, inline) = split_header_colon(&toks[head + 1..]);
            // For `for x in xs:` only the iterable is an expression position.
            let header = if keyword == "for" {
                match header_toks.iter().position(|t| t.is_ident("in")) {
                    Some(i) => header_toks[i + 1..].to_vec(),
                    None => header_toks.to_vec(),
                }
            } else {
                header_toks.to_vec()
            };
            let body = parse_suite(lines, pos, indent, inline.map(|t| (t, line)));
            let mut orelse = Vec::new();
            if let Some(next) = lines.get(*pos) {
                if next.indent == indent && next.toks.first().is_some_and(|t| t.is_ident("else")) {
                    let next = next.clone();
                    *pos += 1;
                    let (_, inline) = split_header_colon(&next.toks[1..]);
                    orelse = parse_suite(lines, pos, indent, inline.map(|t| (t, next.line)));
                }
            }
            out.push(Stmt::Loop {
                header,
                body,
                orelse,
                line,
            });
        }
        "try" => {
            let mut headers = Vec::new();
            let mut bodies = Vec::new();
            let (_, inline) = split_header_colon(&toks[head + 1..]);
            bodies.push(parse_suite(lines, pos, indent, inline.map(|t| (t, line))));
            while let Some(next) = lines.get(*pos) {
                if next.indent != indent {
                    break;
                }
                let clause = match next.toks.first() {
                    Some(Tok::Ident(k))
                        if k == "except" || k == "else" || k == "finally" =>
                    {
                        k.clone()
                    }
                    _ => break,
                };
                let next = next.clone();
                *pos += 1;
                let (header, inline) = split_header_colon(&next.toks[1..]);
                if clause == "except" {
                    headers.push(header.to_vec());
                }
                bodies.push(parse_suite(lines, pos, indent, inline.map(|t| (t, next.line))));
            }
            out.push(Stmt::Try {
                headers,
                bodies,
                line,
            });
        }
        "with" => {
            let (header, inline) = split_header_colon(&toks[head + 1..]);
            let body = parse_suite(lines, pos, indent, inline.map(|t| (t, line)));
            out.push(Stmt::With {
                header: header.to_vec(),
                body,
                line,
            });
        }
        _ => out.extend(parse_simple(toks, line)),
    }
}

/// Parse a run of simple statements (split on top-level `;`).
fn parse_simple(toks: &[Tok], line: usize) -> Vec<Stmt> {
    split_top_level(toks, ";")
        .into_iter()
        .filter(|part| !part.is_empty())
        .map(|part| parse_one_simple(part, line))
        .collect()
}

fn parse_one_simple(toks: &[Tok], line: usize) -> Stmt {
    match toks.first() {
        Some(t) if t.is_ident("return") => Stmt::Return {
            value: toks[1..].to_vec(),
            line,
        },
        Some(t) if t.is_ident("global") => Stmt::Global {
            names: ident_list(&toks[1..]),
            line,
        },
        Some(t) if t.is_ident("import") => parse_import(&toks[1..], line),
        Some(t) if t.is_ident("from") => parse_from_import(&toks[1..], line),
        _ => {
            if let Some(stmt) = try_parse_assign(toks, line) {
                stmt
            } else {
                Stmt::Expr {
                    toks: toks.to_vec(),
                    line,
                }
            }
        }
    }
}

/// Plain `=` assignment (possibly chained). Augmented and annotated
/// assignments fall through to `Expr`, matching what an `ast.Assign` visit
/// would see.
fn try_parse_assign(toks: &[Tok], line: usize) -> Option<Stmt> {
    let segments = split_top_level(toks, "=");
    if segments.len() < 2 {
        return None;
    }
    // A lambda in the value would also contain no top-level `=`; the split is
    // only valid when every target segment is a plausible assignment target.
    let mut targets = Vec::new();
    let mut target_toks = Vec::new();
    for seg in &segments[..segments.len() - 1] {
        if seg.is_empty() {
            return None;
        }
        if seg.len() == 1 {
            if let Tok::Ident(name) = &seg[0] {
                if !is_keyword(name) {
                    targets.push(name.clone());
                    continue;
                }
                return None;
            }
        }
        // Annotated targets (`x: int`) are not plain assignments.
        if seg.iter().any(|t| t.is_op(":")) && !seg.iter().any(|t| t.is_op("[")) {
            return None;
        }
        target_toks.extend(seg.iter().cloned());
    }
    Some(Stmt::Assign {
        targets,
        target_toks,
        value: segments[segments.len() - 1].to_vec(),
        line,
    })
}

fn parse_import(toks: &[Tok], line: usize) -> Stmt {
    Stmt::Import {
        names: parse_alias_list(toks),
        line,
    }
}

fn parse_from_import(toks: &[Tok], line: usize) -> Stmt {
    let mut module = String::new();
    let mut i = 0;
    while i < toks.len() && !toks[i].is_ident("import") {
        match &toks[i] {
            Tok::Ident(part) => module.push_str(part),
            Tok::Op(o) if o == "." => module.push('.'),
            _ => {}
        }
        i += 1;
    }
    let names = if i < toks.len() {
        parse_alias_list(&toks[i + 1..])
    } else {
        Vec::new()
    };
    Stmt::FromImport {
        module,
        names,
        line,
    }
}

/// `a.b.c as d, e, f as g` (parenthesized lists and `*` included).
fn parse_alias_list(toks: &[Tok]) -> Vec<ImportAlias> {
    let mut out = Vec::new();
    for part in split_top_level(toks, ",") {
        let mut name = String::new();
        let mut asname = None;
        let mut iter = part.iter().peekable();
        while let Some(t) = iter.next() {
            match t {
                Tok::Ident(i) if i == "as" => {
                    if let Some(Tok::Ident(a)) = iter.next() {
                        asname = Some(a.clone());
                    }
                }
                Tok::Ident(i) => name.push_str(i),
                Tok::Op(o) if o == "." => name.push('.'),
                Tok::Op(o) if o == "*" => name.push('*'),
                _ => {}
            }
        }
        if !name.is_empty() {
            out.push(ImportAlias { name, asname });
        }
    }
    out
}

/// Header of a `def`: name, formal parameter names (declaration order,
/// excluding `*args`/`**kwargs`/positional markers), and the inline suite if
/// the body follows the colon on the same line.
fn parse_def_header(toks: &[Tok]) -> (String, Vec<String>, Option<&[Tok]>) {
    let name = match toks.first() {
        Some(Tok::Ident(n)) => n.clone(),
        _ => String::new(),
    };
    let mut params = Vec::new();
    let mut inline = None;
    if let Some(open) = toks.iter().position(|t| t.is_op("(")) {
        if let Some(close) = matching_bracket(toks, open) {
            for part in split_top_level(&toks[open + 1..close], ",") {
                let mut skip = false;
                for t in part {
                    match t {
                        Tok::Op(o) if o == "*" || o == "**" || o == "/" => skip = true,
                        _ => {}
                    }
                }
                if skip {
                    continue;
                }
                if let Some(Tok::Ident(p)) = part.first() {
                    params.push(p.clone());
                }
            }
            // Anything after the header colon is an inline body.
            if let Some(colon) = toks[close..].iter().position(|t| t.is_op(":")) {
                let rest = &toks[close + colon + 1..];
                if !rest.is_empty() {
                    inline = Some(rest);
                }
            }
        }
    }
    (name, params, inline)
}

fn after_header_colon(toks: &[Tok]) -> Option<&[Tok]> {
    let (_, inline) = split_header_colon(toks);
    inline
}

/// Split a compound header at the first bracket-level colon: returns the
/// header expression tokens and the inline suite (if non-empty).
fn split_header_colon(toks: &[Tok]) -> (&[Tok], Option<&[Tok]>) {
    let mut depth = 0usize;
    for (i, t) in toks.iter().enumerate() {
        if let Tok::Op(o) = t {
            match o.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                ":" if depth == 0 => {
                    let rest = &toks[i + 1..];
                    return (&toks[..i], if rest.is_empty() { None } else { Some(rest) });
                }
                _ => {}
            }
        }
    }
    (toks, None)
}

fn ident_list(toks: &[Tok]) -> Vec<String> {
    toks.iter()
        .filter_map(|t| match t {
            Tok::Ident(i) => Some(i.clone()),
            _ => None,
        })
        .collect()
}

/// Split a token run on a separator op at bracket depth zero.
pub fn split_top_level<'a>(toks: &'a [Tok], sep: &str) -> Vec<&'a [Tok]> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, t) in toks.iter().enumerate() {
        if let Tok::Op(o) = t {
            match o.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => depth = depth.saturating_sub(1),
                o if o == sep && depth == 0 => {
                    out.push(&toks[start..i]);
                    start = i + 1;
                }
                _ => {}
            }
        }
    }
    out.push(&toks[start..]);
    out
}

/// Index of the bracket matching `toks[open]`.
pub fn matching_bracket(toks: &[Tok], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in toks.iter().enumerate().skip(open) {
        if let Tok::Op(o) = t {
            match o.as_str() {
                "(" | "[" | "{" => depth += 1,
                ")" | "]" | "}" => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

pub fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "False"
            | "None"
            | "True"
            | "and"
            | "as"
            | "assert"
            | "async"
            | "await"
            | "break"
            | "class"
            | "continue"
            | "def"
            | "del"
            | "elif"
            | "else"
            | "except"
            | "finally"
            | "for"
            | "from"
            | "global"
            | "if"
            | "import"
            | "in"
            | "is"
            | "lambda"
            | "nonlocal"
            | "not"
            | "or"
            | "pass"
            | "raise"
            | "return"
            | "try"
            | "while"
            | "with"
            | "yield"
    )
}
