//! Structural scanner for Python source.
//!
//! Tokenizes the script without executing or importing anything and reports
//! the errors a Python parser would raise for malformed layout: unterminated
//! strings, unbalanced brackets, inconsistent indentation and block headers
//! without a body. The token stream feeds the safety rules.

use std::fmt;

/// Token kinds the safety rules care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    /// String literal body without prefix and quotes.
    Str(String),
    Number(String),
    Op(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    /// First token of a logical line.
    pub line_start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxIssue {
    pub line: usize,
    pub message: String,
}

impl fmt::Display for SyntaxIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

/// Result of scanning a script.
#[derive(Debug, Clone, Default)]
pub struct ScanOutput {
    pub tokens: Vec<Token>,
    pub issues: Vec<SyntaxIssue>,
}

impl ScanOutput {
    pub fn is_well_formed(&self) -> bool {
        self.issues.is_empty()
    }

    /// Module paths named by `import` and `from ... import` statements.
    pub fn imported_modules(&self) -> Vec<(String, usize)> {
        let mut modules = Vec::new();
        let mut i = 0;
        while i < self.tokens.len() {
            let token = &self.tokens[i];
            if !token.line_start {
                i += 1;
                continue;
            }
            match &token.kind {
                TokenKind::Name(word) if word == "import" => {
                    i += 1;
                    loop {
                        let (path, next) = self.dotted_path(i);
                        if !path.is_empty() {
                            modules.push((path, token.line));
                        }
                        i = next;
                        if let Some(TokenKind::Name(word)) = self.kind_at(i) {
                            if word == "as" {
                                i += 2;
                            }
                        }
                        if self.kind_at(i) == Some(&TokenKind::Op(',')) && !self.starts_line(i) {
                            i += 1;
                            continue;
                        }
                        break;
                    }
                }
                TokenKind::Name(word) if word == "from" => {
                    let (path, next) = self.dotted_path(i + 1);
                    if !path.is_empty() {
                        modules.push((path, token.line));
                    }
                    i = next;
                }
                _ => i += 1,
            }
        }
        modules
    }

    fn kind_at(&self, index: usize) -> Option<&TokenKind> {
        self.tokens.get(index).map(|t| &t.kind)
    }

    fn starts_line(&self, index: usize) -> bool {
        self.tokens.get(index).is_some_and(|t| t.line_start)
    }

    fn dotted_path(&self, mut index: usize) -> (String, usize) {
        let mut path = String::new();
        while let Some(token) = self.tokens.get(index) {
            if !path.is_empty() && token.line_start {
                break;
            }
            match &token.kind {
                TokenKind::Name(name) if path.is_empty() || path.ends_with('.') => {
                    path.push_str(name);
                }
                TokenKind::Op('.') => path.push('.'),
                _ => break,
            }
            index += 1;
        }
        (path, index)
    }
}

/// Scan Python source into tokens and structural issues.
pub fn scan(source: &str) -> ScanOutput {
    Scanner::new(source).run()
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    out: ScanOutput,
    brackets: Vec<(char, usize)>,
    indents: Vec<usize>,
    expect_block: Option<usize>,
    last_significant: Option<char>,
    at_line_start: bool,
    continuation: bool,
}

impl Scanner {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            out: ScanOutput::default(),
            brackets: Vec::new(),
            indents: vec![0],
            expect_block: None,
            last_significant: None,
            at_line_start: true,
            continuation: false,
        }
    }

    fn run(mut self) -> ScanOutput {
        let mut pending_line_start = true;
        while self.pos < self.chars.len() {
            if self.at_line_start {
                self.at_line_start = false;
                if self.brackets.is_empty() && !self.continuation {
                    if !self.handle_indentation() {
                        continue;
                    }
                    pending_line_start = true;
                }
                self.continuation = false;
            }

            let c = self.chars[self.pos];
            match c {
                '\n' => {
                    self.pos += 1;
                    self.end_physical_line();
                }
                '#' => self.skip_comment(),
                '\\' => {
                    if self.peek(1) == Some('\n') {
                        self.pos += 2;
                        self.line += 1;
                        self.at_line_start = true;
                        self.continuation = true;
                    } else if self.peek(1) == Some('\r') && self.peek(2) == Some('\n') {
                        self.pos += 3;
                        self.line += 1;
                        self.at_line_start = true;
                        self.continuation = true;
                    } else {
                        self.issue("unexpected character after line continuation");
                        self.pos += 1;
                    }
                }
                ' ' | '\t' | '\r' | '\x0c' => self.pos += 1,
                '"' | '\'' => {
                    let start_line = self.line;
                    let body = self.read_string();
                    self.push(TokenKind::Str(body), start_line, &mut pending_line_start);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let start_line = self.line;
                    let word = self.read_word();
                    if is_string_prefix(&word)
                        && matches!(self.chars.get(self.pos), Some('"') | Some('\''))
                    {
                        let body = self.read_string();
                        let fields = if word.contains(['f', 'F']) {
                            format_fields(&body)
                        } else {
                            Vec::new()
                        };
                        self.push(TokenKind::Str(body), start_line, &mut pending_line_start);
                        // Replacement fields are code; their tokens follow the literal.
                        for field in fields {
                            self.out.tokens.extend(scan(&field).tokens.into_iter().map(|token| {
                                Token {
                                    kind: token.kind,
                                    line: start_line,
                                    line_start: false,
                                }
                            }));
                        }
                    } else {
                        self.push(TokenKind::Name(word), start_line, &mut pending_line_start);
                    }
                }
                c if c.is_ascii_digit() => {
                    let start_line = self.line;
                    let number = self.read_number();
                    self.push(TokenKind::Number(number), start_line, &mut pending_line_start);
                }
                '(' | '[' | '{' => {
                    self.brackets.push((c, self.line));
                    self.push_op(c, &mut pending_line_start);
                }
                ')' | ']' | '}' => {
                    match self.brackets.pop() {
                        Some((open, _)) if matching(open) == c => {}
                        Some((open, line)) => self.issue(&format!(
                            "closing '{}' does not match '{}' opened on line {}",
                            c, open, line
                        )),
                        None => self.issue(&format!("unmatched '{}'", c)),
                    }
                    self.push_op(c, &mut pending_line_start);
                }
                _ => self.push_op(c, &mut pending_line_start),
            }
        }

        self.end_logical_line();
        for (open, line) in std::mem::take(&mut self.brackets) {
            self.out.issues.push(SyntaxIssue {
                line,
                message: format!("'{}' was never closed", open),
            });
        }
        if let Some(line) = self.expect_block.take() {
            self.out.issues.push(SyntaxIssue {
                line,
                message: "expected an indented block".to_string(),
            });
        }
        self.out
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn issue(&mut self, message: &str) {
        self.out.issues.push(SyntaxIssue {
            line: self.line,
            message: message.to_string(),
        });
    }

    fn push(&mut self, kind: TokenKind, line: usize, pending_line_start: &mut bool) {
        self.last_significant = match &kind {
            TokenKind::Op(c) => Some(*c),
            _ => Some('x'),
        };
        self.out.tokens.push(Token {
            kind,
            line,
            line_start: *pending_line_start,
        });
        *pending_line_start = false;
    }

    fn push_op(&mut self, c: char, pending_line_start: &mut bool) {
        let line = self.line;
        self.pos += 1;
        self.push(TokenKind::Op(c), line, pending_line_start);
    }

    /// Measures indentation of the next non-blank line. Returns false when the
    /// line was blank or comment-only and has been consumed.
    fn handle_indentation(&mut self) -> bool {
        let mut width = 0usize;
        let mut saw_space = false;
        let mut saw_tab = false;
        while let Some(c) = self.chars.get(self.pos) {
            match c {
                ' ' => {
                    saw_space = true;
                    width += 1;
                }
                '\t' => {
                    saw_tab = true;
                    width = (width / 8 + 1) * 8;
                }
                '\x0c' => width = 0,
                _ => break,
            }
            self.pos += 1;
        }

        match self.chars.get(self.pos) {
            None => return false,
            Some('\n') => {
                self.pos += 1;
                self.line += 1;
                self.at_line_start = true;
                return false;
            }
            Some('\r') if self.peek(1) == Some('\n') => {
                self.pos += 2;
                self.line += 1;
                self.at_line_start = true;
                return false;
            }
            Some('#') => {
                self.skip_comment();
                if self.chars.get(self.pos) == Some(&'\n') {
                    self.pos += 1;
                    self.line += 1;
                    self.at_line_start = true;
                }
                return false;
            }
            _ => {}
        }

        if saw_space && saw_tab {
            self.issue("inconsistent use of tabs and spaces in indentation");
        }
        let current = *self.indents.last().unwrap_or(&0);
        if width > current {
            if self.expect_block.take().is_none() {
                self.issue("unexpected indent");
            }
            self.indents.push(width);
        } else {
            if let Some(line) = self.expect_block.take() {
                self.out.issues.push(SyntaxIssue {
                    line,
                    message: "expected an indented block".to_string(),
                });
            }
            if width < current {
                while self.indents.last().is_some_and(|level| *level > width) {
                    self.indents.pop();
                }
                if self.indents.last() != Some(&width) {
                    self.issue("unindent does not match any outer indentation level");
                    self.indents.push(width);
                }
            }
        }
        true
    }

    fn end_physical_line(&mut self) {
        self.line += 1;
        self.at_line_start = true;
        if self.brackets.is_empty() {
            self.end_logical_line();
        }
    }

    fn end_logical_line(&mut self) {
        if self.last_significant == Some(':') {
            self.expect_block = Some(self.line.saturating_sub(1).max(1));
        }
        self.last_significant = None;
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.chars.get(self.pos) {
            if *c == '\n' {
                break;
            }
            self.pos += 1;
        }
    }

    fn read_word(&mut self) -> String {
        let mut word = String::new();
        while let Some(c) = self.chars.get(self.pos) {
            if c.is_alphanumeric() || *c == '_' {
                word.push(*c);
                self.pos += 1;
            } else {
                break;
            }
        }
        word
    }

    fn read_number(&mut self) -> String {
        let mut number = String::new();
        while let Some(c) = self.chars.get(self.pos) {
            let exponent_sign = (*c == '+' || *c == '-')
                && number
                    .chars()
                    .last()
                    .is_some_and(|prev| prev == 'e' || prev == 'E')
                && !number.starts_with("0x")
                && !number.starts_with("0X");
            if c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || exponent_sign {
                number.push(*c);
                self.pos += 1;
            } else {
                break;
            }
        }
        number
    }

    fn read_string(&mut self) -> String {
        let quote = self.chars[self.pos];
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let start_line = self.line;
        self.pos += if triple { 3 } else { 1 };
        let mut body = String::new();

        loop {
            let Some(c) = self.chars.get(self.pos).copied() else {
                self.out.issues.push(SyntaxIssue {
                    line: start_line,
                    message: if triple {
                        "unterminated triple-quoted string literal".to_string()
                    } else {
                        "unterminated string literal".to_string()
                    },
                });
                return body;
            };
            match c {
                '\\' => {
                    body.push(c);
                    if let Some(next) = self.peek(1) {
                        body.push(next);
                        if next == '\n' {
                            self.line += 1;
                        }
                    }
                    self.pos += 2;
                }
                '\n' if !triple => {
                    self.out.issues.push(SyntaxIssue {
                        line: start_line,
                        message: "unterminated string literal".to_string(),
                    });
                    return body;
                }
                '\n' => {
                    body.push(c);
                    self.line += 1;
                    self.pos += 1;
                }
                c if c == quote => {
                    if !triple {
                        self.pos += 1;
                        return body;
                    }
                    if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                        self.pos += 3;
                        return body;
                    }
                    body.push(c);
                    self.pos += 1;
                }
                _ => {
                    body.push(c);
                    self.pos += 1;
                }
            }
        }
    }
}

fn is_string_prefix(word: &str) -> bool {
    word.len() <= 2
        && !word.is_empty()
        && word.chars().all(|c| matches!(c.to_ascii_lowercase(), 'r' | 'b' | 'f' | 'u'))
}

/// Replacement fields of an f-string body, without their braces. `{{` and
/// `}}` are literal braces.
fn format_fields(body: &str) -> Vec<String> {
    let chars: Vec<char> = body.chars().collect();
    let mut fields = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '{' {
            i += 1;
            continue;
        }
        if chars.get(i + 1) == Some(&'{') {
            i += 2;
            continue;
        }
        let mut depth = 1;
        let mut field = String::new();
        i += 1;
        while let Some(&c) = chars.get(i) {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            field.push(c);
            i += 1;
        }
        i += 1;
        fields.push(field);
    }
    fields
}

fn matching(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}
