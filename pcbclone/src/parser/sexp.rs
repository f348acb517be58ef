use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Parse error at position {0}: {1}")]
    ParseError(usize, String),
}

/// A node of a KiCad S-expression document.
///
/// Quoted strings are kept apart from bare symbols so that a document can be
/// written back with the same quoting it was read with.
#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    Str(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(s: impl Into<String>) -> Self {
        SExp::Atom(s.into())
    }

    pub fn string(s: impl Into<String>) -> Self {
        SExp::Str(s.into())
    }

    pub fn number(value: f64) -> Self {
        SExp::Atom(format_number(value))
    }

    /// Returns the text of a symbol or quoted string.
    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) | SExp::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_atom().and_then(|s| s.parse().ok())
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<SExp>> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// Head symbol of a list, e.g. `segment` for `(segment (start 0 0) ...)`.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|first| first.as_atom())
    }

    pub fn is_tag(&self, key: &str) -> bool {
        self.tag() == Some(key)
    }

    pub fn get(&self, key: &str) -> Option<&SExp> {
        if let SExp::List(items) = self {
            for item in items {
                // Check if this item is a list starting with the key
                if let SExp::List(sublist) = item {
                    if let Some(first) = sublist.first() {
                        if first.as_atom() == Some(key) {
                            // Return the content after the key (as a new list or the second element)
                            if sublist.len() == 2 {
                                return Some(&sublist[1]);
                            } else if sublist.len() > 2 {
                                // The caller can access sublist[1], sublist[2], etc.
                                return Some(item);
                            }
                        }
                    }
                }
            }
        }
        None
    }

    pub fn get_all(&self, key: &str) -> Vec<&SExp> {
        let mut results = Vec::new();
        if let SExp::List(items) = self {
            for item in items {
                if item.is_tag(key) {
                    results.push(item);
                }
            }
        }
        results
    }

    /// First child list tagged `key`, always returned whole.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.as_list()?.iter().find(|item| item.is_tag(key))
    }

    pub fn child_mut(&mut self, key: &str) -> Option<&mut SExp> {
        self.as_list_mut()?.iter_mut().find(|item| item.is_tag(key))
    }

    /// Replaces the values of the child list tagged `key`, appending the
    /// child when it does not exist yet.
    pub fn set_child(&mut self, key: &str, values: Vec<SExp>) {
        let mut node = vec![SExp::atom(key)];
        node.extend(values);
        if let Some(existing) = self.child_mut(key) {
            *existing = SExp::List(node);
        } else if let Some(items) = self.as_list_mut() {
            items.push(SExp::List(node));
        }
    }

    /// Calls `f` on this node and every node below it, parents first.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut SExp)) {
        f(self);
        if let SExp::List(items) = self {
            for item in items.iter_mut() {
                item.walk_mut(f);
            }
        }
    }

    /// Writes the node using KiCad's layout: lists holding only atoms (or
    /// short leaf lists) stay on one line, everything else nests one tab per
    /// level.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    /// Appends the node to `out` as if it were nested `depth` levels deep.
    pub fn write_pretty(&self, out: &mut String, depth: usize) {
        let items = match self {
            SExp::List(items) => items,
            atom => {
                out.push_str(&atom.to_string());
                return;
            }
        };

        if self.fits_on_one_line() {
            out.push_str(&self.to_string());
            return;
        }

        out.push('(');
        let mut wrapped = false;
        for (i, item) in items.iter().enumerate() {
            if item.as_list().is_some() || wrapped {
                wrapped = true;
                out.push('\n');
                push_indent(out, depth + 1);
                item.write_pretty(out, depth + 1);
            } else {
                if i > 0 {
                    out.push(' ');
                }
                item.write_pretty(out, depth + 1);
            }
        }
        out.push('\n');
        push_indent(out, depth);
        out.push(')');
    }

    fn fits_on_one_line(&self) -> bool {
        let Some(items) = self.as_list() else {
            return true;
        };
        let nested_leaves = items.iter().all(|item| match item {
            SExp::List(inner) => inner.iter().all(|i| i.as_list().is_none()),
            _ => true,
        });
        let has_lists = items.iter().any(|item| item.as_list().is_some());
        !has_lists || (nested_leaves && self.to_string().len() <= 80 && !self.is_tag("pts"))
    }
}

fn push_indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

/// Formats a millimetre or degree value the way KiCad writes it: integral
/// values without a fraction, others with at most six decimals.
pub fn format_number(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded == 0.0 {
        return "0".to_string();
    }
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        return format!("{}", rounded as i64);
    }
    let text = format!("{:.6}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::Atom(s) => {
                // Quote strings that need quoting
                if s.contains(' ') || s.is_empty() || s.starts_with('(') || s.starts_with(')') {
                    write!(f, "\"{}\"", escape(s))
                } else {
                    write!(f, "{}", s)
                }
            }
            SExp::Str(s) => write!(f, "\"{}\"", escape(s)),
            SExp::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let root = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::ParseError(
                self.pos,
                "trailing content after root expression".to_string(),
            ));
        }
        Ok(root)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::ParseError(self.pos, "unbalanced ')'".to_string())),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        loop {
            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }
            let ch = self.peek();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    '\\' => s.push('\\'),
                    '"' => s.push('"'),
                    _ => s.push(ch),
                }
                escaped = false;
                self.advance();
            } else if ch == '\\' {
                escaped = true;
                self.advance();
            } else if ch == '"' {
                self.advance();
                break;
            } else {
                s.push(ch);
                self.advance();
            }
        }

        Ok(SExp::Str(s))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken("empty symbol".to_string()))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        if self.pos < self.input.len() {
            self.input[self.pos]
        } else {
            '\0'
        }
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected '{}', found '{}'",
                expected, ch
            )))
        }
    }
}
