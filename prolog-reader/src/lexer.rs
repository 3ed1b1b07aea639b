//! A streaming lexer for Prolog source.
//!
//! The lexer lifts a buffered reader into a lazy, ordered sequence of
//! [`Lexeme`]s with 1-based line and column positions. Input is normalised
//! to NFC line by line before tokenisation. Whitespace and comments are
//! emitted as explicit lexemes so that consumers can reconstruct source
//! positions; the parser simply skips them.
//!
//! The lexer is a deterministic state machine over characters. On a panic
//! path (invalid encoding, unterminated quote, bad escape, unrecognised
//! character) it emits a single [`LexKind::Err`] lexeme and halts. At end
//! of stream it synthesises a final [`LexKind::Terminal`] unless one was
//! just emitted, so every clause ends with a terminator.
//!
//! [`Lexer`] implements [`Iterator`] for cooperative use; [`Lexer::spawn`]
//! runs it on its own thread behind a small bounded channel.

use crate::error::SyntaxError;
use once_cell::sync::Lazy;
use prolog_terms::Symbol;
use regex::Regex;
use smartstring::alias::String;
use std::collections::VecDeque;
use std::fmt;
use std::io::BufRead;
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread;
use unicode_normalization::UnicodeNormalization;

/// How many lexemes [`Lexer::spawn`] buffers ahead of the consumer.
pub const READ_AHEAD: usize = 4;

/// ASCII characters that form symbolic functor runs.
const ASCII_SYMBOLS: &str = "~!@#$%^&*-+=|\\:;<,>./?";

/// Non-ASCII characters of the Symbol, Dash, Connector, and
/// Other-punctuation categories also form symbolic runs.
static SYMBOLIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{S}\p{Pd}\p{Pc}\p{Po}]").expect("static pattern"));

/// Connector punctuation, allowed in identifier tails.
static CONNECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Pc}").expect("static pattern"));

fn is_symbolic(c: char) -> bool {
    if c.is_ascii() {
        ASCII_SYMBOLS.contains(c)
    } else {
        SYMBOLIC.is_match(c.encode_utf8(&mut [0u8; 4]))
    }
}

fn is_ident(c: char) -> bool {
    c == '_'
        || c.is_alphanumeric()
        || (!c.is_ascii() && CONNECTOR.is_match(c.encode_utf8(&mut [0u8; 4])))
}

/// Classifies a [`Lexeme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexKind {
    /// A run of whitespace.
    Space,
    /// A `%` comment, to end of line.
    Comment,
    /// A functor: bare identifier, symbolic run, cut, comma, or quoted atom.
    Funct,
    /// A double-quoted string. Interpretation is deferred downstream.
    Str,
    /// A numeric literal.
    Num,
    /// A variable.
    Var,
    ParenOpen,
    ParenClose,
    BracketOpen,
    BracketClose,
    BraceOpen,
    BraceClose,
    /// The clause terminator.
    Terminal,
    /// A fatal lexical error; the stream halts after this.
    Err,
}

impl fmt::Display for LexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LexKind::Space => "Whitespace",
            LexKind::Comment => "Comment",
            LexKind::Funct => "Functor",
            LexKind::Str => "String",
            LexKind::Num => "Number",
            LexKind::Var => "Variable",
            LexKind::ParenOpen
            | LexKind::ParenClose
            | LexKind::BracketOpen
            | LexKind::BracketClose
            | LexKind::BraceOpen
            | LexKind::BraceClose => "Paren",
            LexKind::Terminal => "Terminal",
            LexKind::Err => "Lex Error",
        })
    }
}

/// A lexical item of a Prolog source.
///
/// `line` and `col` give the 1-based position of the first character.
/// Functors, strings, numbers, and variables carry their parsed value; for
/// error lexemes `text` holds the message.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexKind,
    pub value: Option<Symbol>,
    pub text: String,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Lexeme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self.text, self.kind)
    }
}

/// The lexer state machine over a buffered reader.
pub struct Lexer<B> {
    rd: B,
    raw: std::string::String,
    pending: VecDeque<char>,
    cur: Option<char>,
    buf: String,
    val: String,
    depth: i32,
    line: u32,
    col: u32,
    tok_line: u32,
    tok_col: u32,
    eof: bool,
    halted: bool,
    terminal_fresh: bool,
    err: Option<SyntaxError>,
}

impl<B: BufRead> Lexer<B> {
    /// Constructs a lexer over `reader`. The first line is read eagerly.
    pub fn new(reader: B) -> Self {
        let mut lexer = Self {
            rd: reader,
            raw: std::string::String::with_capacity(128),
            pending: VecDeque::with_capacity(128),
            cur: None,
            buf: String::new(),
            val: String::new(),
            depth: 0,
            line: 1,
            col: 1,
            tok_line: 1,
            tok_col: 1,
            eof: false,
            halted: false,
            terminal_fresh: false,
            err: None,
        };
        lexer.cur = lexer.pull();
        lexer
    }

    /// Runs a lexer over `reader` on its own thread and returns the
    /// receiving end of a bounded channel of lexemes. Dropping the receiver
    /// cancels the thread at its next emission.
    pub fn spawn(reader: B) -> Receiver<Lexeme>
    where
        B: Send + 'static,
    {
        let (tx, rx) = sync_channel(READ_AHEAD);
        thread::spawn(move || {
            for lexeme in Lexer::new(reader) {
                if tx.send(lexeme).is_err() {
                    return;
                }
            }
        });
        rx
    }

    // Character plumbing
    // --------------------------------------------------

    /// Takes the next normalised character, refilling line by line.
    fn pull(&mut self) -> Option<char> {
        loop {
            if let Some(c) = self.pending.pop_front() {
                return Some(c);
            }
            if self.eof || self.err.is_some() {
                return None;
            }
            self.fill_line();
        }
    }

    fn fill_line(&mut self) {
        self.raw.clear();
        match self.rd.read_line(&mut self.raw) {
            Ok(0) => self.eof = true,
            Ok(_) => self.pending.extend(self.raw.as_str().nfc()),
            Err(e) => {
                self.eof = true;
                let message = if e.kind() == std::io::ErrorKind::InvalidData {
                    String::from("input must be UTF-8")
                } else {
                    String::from(format!("read error: {e}"))
                };
                self.err = Some(SyntaxError::lexical(self.line, self.col, message));
            }
        }
    }

    /// Looks `n` characters past the current one without consuming.
    fn peek(&mut self, n: usize) -> Option<char> {
        while self.pending.len() < n && !self.eof && self.err.is_none() {
            self.fill_line();
        }
        self.pending.get(n - 1).copied()
    }

    /// Consumes the current character into the token buffer and advances.
    fn bump(&mut self) {
        if let Some(c) = self.cur.take() {
            self.buf.push(c);
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.cur = self.pull();
    }

    fn emit(&mut self, kind: LexKind, value: Option<Symbol>) -> Lexeme {
        let text = std::mem::take(&mut self.buf);
        let lexeme = Lexeme { kind, value, text, line: self.tok_line, col: self.tok_col };
        log::trace!("lexeme {lexeme} at {}:{}", lexeme.line, lexeme.col);
        lexeme
    }

    fn fail(&mut self, err: SyntaxError) -> Lexeme {
        self.halted = true;
        self.buf.clear();
        Lexeme {
            kind: LexKind::Err,
            value: None,
            text: err.message.clone(),
            line: err.line,
            col: err.col,
        }
    }

    // States
    // --------------------------------------------------

    fn scan(&mut self, c: char) -> Result<Lexeme, SyntaxError> {
        match c {
            c if c.is_whitespace() => Ok(self.scan_space()),
            '%' => Ok(self.scan_comment()),
            // cut and comma never glue to their surroundings
            '!' | ',' => {
                self.bump();
                let sym = Symbol::Functor(self.buf.clone());
                Ok(self.emit(LexKind::Funct, Some(sym)))
            }
            '.' => self.scan_dot(),
            '(' | ')' | '[' | ']' | '{' | '}' => Ok(self.scan_paren(c)),
            '-' => {
                self.bump();
                if matches!(self.cur, Some(d) if d.is_ascii_digit()) {
                    self.scan_number()
                } else {
                    Ok(self.scan_symbols())
                }
            }
            '0'..='9' => self.scan_number(),
            '\'' | '"' => self.scan_quote(c),
            c if c == '_' || c.is_uppercase() => {
                self.scan_ident();
                let sym = Symbol::Variable(self.buf.clone());
                Ok(self.emit(LexKind::Var, Some(sym)))
            }
            c if c.is_alphabetic() => {
                self.scan_ident();
                let sym = Symbol::Functor(self.buf.clone());
                Ok(self.emit(LexKind::Funct, Some(sym)))
            }
            c if is_symbolic(c) => Ok(self.scan_symbols()),
            c => Err(SyntaxError::lexical(
                self.line,
                self.col,
                String::from(format!("unrecognised character {c:?}")),
            )),
        }
    }

    fn scan_space(&mut self) -> Lexeme {
        while matches!(self.cur, Some(c) if c.is_whitespace()) {
            self.bump();
        }
        self.emit(LexKind::Space, None)
    }

    fn scan_comment(&mut self) -> Lexeme {
        while let Some(c) = self.cur {
            self.bump();
            if c == '\n' {
                break;
            }
        }
        self.emit(LexKind::Comment, None)
    }

    fn scan_paren(&mut self, c: char) -> Lexeme {
        self.bump();
        let kind = match c {
            '(' => LexKind::ParenOpen,
            ')' => LexKind::ParenClose,
            '[' => LexKind::BracketOpen,
            ']' => LexKind::BracketClose,
            '{' => LexKind::BraceOpen,
            _ => LexKind::BraceClose,
        };
        match kind {
            LexKind::ParenOpen | LexKind::BracketOpen | LexKind::BraceOpen => self.depth += 1,
            _ => self.depth -= 1,
        }
        self.emit(kind, None)
    }

    /// A bare `.` terminates the clause iff no bracket is open and the next
    /// character is whitespace or end of stream; otherwise it starts a
    /// symbolic run.
    fn scan_dot(&mut self) -> Result<Lexeme, SyntaxError> {
        self.bump();
        if self.depth == 0 && self.cur.map_or(true, |c| c.is_whitespace()) {
            return Ok(self.emit(LexKind::Terminal, None));
        }
        Ok(self.scan_symbols())
    }

    fn scan_ident(&mut self) {
        while matches!(self.cur, Some(c) if is_ident(c)) {
            self.bump();
        }
    }

    fn scan_symbols(&mut self) -> Lexeme {
        while matches!(self.cur, Some(c) if c != '!' && c != ',' && is_symbolic(c)) {
            self.bump();
        }
        let sym = Symbol::Functor(self.buf.clone());
        self.emit(LexKind::Funct, Some(sym))
    }

    fn scan_number(&mut self) -> Result<Lexeme, SyntaxError> {
        while matches!(self.cur, Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        // a fraction only if a digit follows the dot, else the dot is left
        // for the terminator test
        if self.cur == Some('.') && matches!(self.peek(1), Some(c) if c.is_ascii_digit()) {
            self.bump();
            while matches!(self.cur, Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.cur, Some('e') | Some('E')) {
            self.bump();
            if matches!(self.cur, Some('+') | Some('-')) {
                self.bump();
            }
            while matches!(self.cur, Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        match Symbol::parse_number(&self.buf) {
            Some(sym) => Ok(self.emit(LexKind::Num, Some(sym))),
            None => Err(SyntaxError::lexical(
                self.tok_line,
                self.tok_col,
                String::from(format!("malformed number {:?}", self.buf)),
            )),
        }
    }

    fn scan_quote(&mut self, quote: char) -> Result<Lexeme, SyntaxError> {
        self.bump();
        loop {
            match self.cur {
                None => {
                    if let Some(err) = self.err.take() {
                        return Err(err);
                    }
                    return Err(SyntaxError::lexical(
                        self.tok_line,
                        self.tok_col,
                        "unterminated quote",
                    ));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.scan_escape()?;
                }
                Some(c) => {
                    self.val.push(c);
                    self.bump();
                }
            }
        }
        let text = std::mem::take(&mut self.val);
        let (kind, sym) = match quote {
            '\'' => (LexKind::Funct, Symbol::Functor(text)),
            _ => (LexKind::Str, Symbol::Functor(text)),
        };
        Ok(self.emit(kind, Some(sym)))
    }

    /// Decodes one escape sequence after the backslash into the value
    /// buffer.
    fn scan_escape(&mut self) -> Result<(), SyntaxError> {
        let (line, col) = (self.line, self.col);
        let bad = |c: Option<char>| {
            SyntaxError::lexical(
                line,
                col,
                String::from(match c {
                    Some(c) => format!("invalid escape sequence \\{c}"),
                    None => "unterminated escape sequence".to_owned(),
                }),
            )
        };
        let c = self.cur.ok_or_else(|| bad(None))?;
        let decoded = match c {
            'a' => '\u{0007}',
            'b' => '\u{0008}',
            't' => '\t',
            'n' => '\n',
            'v' => '\u{000B}',
            'f' => '\u{000C}',
            'r' => '\r',
            '"' => '"',
            '\'' => '\'',
            '\\' => '\\',
            '0'..='7' => {
                let code = self.read_radix(3, 8)?;
                return self.push_scalar(code, line, col);
            }
            'x' => {
                self.bump();
                let code = self.read_radix(2, 16)?;
                return self.push_scalar(code, line, col);
            }
            'u' => {
                self.bump();
                let code = self.read_radix(4, 16)?;
                return self.push_scalar(code, line, col);
            }
            'U' => {
                self.bump();
                let code = self.read_radix(8, 16)?;
                return self.push_scalar(code, line, col);
            }
            c => return Err(bad(Some(c))),
        };
        self.val.push(decoded);
        self.bump();
        Ok(())
    }

    /// Reads exactly `digits` digits in the given radix, starting at the
    /// current character.
    fn read_radix(&mut self, digits: u32, radix: u32) -> Result<u32, SyntaxError> {
        let mut code = 0u32;
        for _ in 0..digits {
            let d = self
                .cur
                .and_then(|c| c.to_digit(radix))
                .ok_or_else(|| {
                    SyntaxError::lexical(self.line, self.col, "invalid escape sequence")
                })?;
            code = code.wrapping_mul(radix).wrapping_add(d);
            self.bump();
        }
        Ok(code)
    }

    fn push_scalar(&mut self, code: u32, line: u32, col: u32) -> Result<(), SyntaxError> {
        match char::from_u32(code) {
            Some(c) => {
                self.val.push(c);
                Ok(())
            }
            None => Err(SyntaxError::lexical(
                line,
                col,
                String::from(format!("escape \\{code:x} is not a Unicode scalar")),
            )),
        }
    }
}

impl<B: BufRead> Iterator for Lexer<B> {
    type Item = Lexeme;

    fn next(&mut self) -> Option<Lexeme> {
        if self.halted {
            return None;
        }
        self.tok_line = self.line;
        self.tok_col = self.col;
        self.buf.clear();
        self.val.clear();

        let Some(c) = self.cur else {
            self.halted = true;
            if let Some(err) = self.err.take() {
                return Some(self.fail(err));
            }
            // synthesise the final terminator
            if self.terminal_fresh {
                return None;
            }
            return Some(self.emit(LexKind::Terminal, None));
        };

        let lexeme = match self.scan(c) {
            Ok(lexeme) => lexeme,
            Err(err) => return Some(self.fail(err)),
        };
        self.terminal_fresh = lexeme.kind == LexKind::Terminal;
        Some(lexeme)
    }
}
