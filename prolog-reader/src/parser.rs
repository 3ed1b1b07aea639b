//! The operator-precedence clause reader.
//!
//! A [`Reader`] turns a byte stream into a sequence of [`ParsedClause`]s.
//! Lexing and parsing each run on their own thread: the lexer feeds a small
//! bounded channel of lexemes, the parser consumes it, consults the shared
//! operator table, interns symbols into the shared namespace, and pushes
//! finished clauses into a bounded output channel.
//!
//! The parsing algorithm is the classical Edinburgh `read_term`: a primary
//! is read, then extended by prefix, infix, and postfix operators under the
//! precedence and associativity rules of their declarations. Argument lists
//! are read at precedence 999 so that `,` at 1000 separates arguments, and
//! a whole term is read at 1200 and must be followed by the terminator.
//!
//! After emitting a clause whose root is `:-/1` the parser performs a
//! rendezvous with the caller and consumes nothing further until the caller
//! acknowledges. That window is the sanctioned moment to mutate the
//! operator table or query the namespace; see [`Reader::next_clause`].

use crate::error::{ErrorKind, SyntaxError};
use crate::lexer::{LexKind, Lexeme, Lexer};
use prolog_terms::{
    Clause, Fixity, Name, Namespace, OpClass, OpTable, Oper, Subterm, Symbol, ARG_PREC, MAX_PREC,
};
use smartstring::alias::String;
use std::io::BufRead;
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread;

/// How many finished clauses the parser may run ahead of the caller.
const OUT_AHEAD: usize = 4;

/// Initial capacity of the scratch clause heap.
const HEAP_SIZE: usize = 1024;

/// One unit of reader output: a valid clause, or the non-empty list of
/// errors that prevented one. The two are mutually exclusive per clause.
#[derive(Debug)]
pub struct ParsedClause {
    pub clause: Result<Clause, Vec<SyntaxError>>,
    /// True if the clause's root is the functor `:-` of arity 1. The
    /// parser is paused after such a clause until the caller acknowledges.
    pub directive: bool,
}

/// The caller-side handle of a running reader.
///
/// Construction spawns the lexer and parser threads. Dropping the reader
/// closes the channels; both threads observe that at their next emission
/// and finalise without delivering partial clauses.
pub struct Reader {
    ops: Arc<RwLock<OpTable>>,
    symbols: Arc<Mutex<Namespace>>,
    clauses: Receiver<ParsedClause>,
    gate: Receiver<()>,
    paused: bool,
}

impl Reader {
    /// Starts a reader over `input` with the standard operator table.
    pub fn new(input: impl BufRead + Send + 'static) -> Self {
        Self::with_ops(input, OpTable::default())
    }

    /// Starts a reader over `input` with a caller-provided operator table.
    pub fn with_ops(input: impl BufRead + Send + 'static, ops: OpTable) -> Self {
        let ops = Arc::new(RwLock::new(ops));
        let symbols = Arc::new(Mutex::new(Namespace::new()));
        let (out_tx, out_rx) = sync_channel(OUT_AHEAD);
        // zero capacity: the pause token is handed over, not buffered
        let (gate_tx, gate_rx) = sync_channel(0);

        let lexemes = Lexer::spawn(input);
        let neck = lock(&symbols).neck();
        let parser = Parser {
            lexemes,
            out: out_tx,
            gate: gate_tx,
            ops: ops.clone(),
            symbols: symbols.clone(),
            buf: None,
            last_pos: (1, 1),
            heap: Vec::with_capacity(HEAP_SIZE),
            errors: Vec::new(),
            fatal: false,
            neck,
        };
        thread::spawn(move || parser.run());

        Reader { ops, symbols, clauses: out_rx, gate: gate_rx, paused: false }
    }

    /// Returns the next clause, or `None` when the stream is exhausted.
    ///
    /// If the previously returned clause was a directive, the parser is
    /// still paused; this call acknowledges the pause first, so any
    /// operator-table or namespace mutation done since then is visible to
    /// the parse of the clause returned here.
    pub fn next_clause(&mut self) -> Option<ParsedClause> {
        self.resume();
        let unit = self.clauses.recv().ok()?;
        self.paused = unit.directive;
        Some(unit)
    }

    /// Acknowledges a pending directive pause, letting the parser advance.
    /// Called implicitly by [`next_clause`](Self::next_clause).
    pub fn resume(&mut self) {
        if self.paused {
            let _ = self.gate.recv();
            self.paused = false;
        }
    }

    /// The operator table shared with the parser. Mutation is legal only
    /// while the parser is paused at a directive or the stream is drained.
    pub fn op_table(&self) -> Arc<RwLock<OpTable>> {
        self.ops.clone()
    }

    /// The namespace shared with the parser. Queries are legal at any
    /// time; interning never invalidates previously issued names.
    pub fn symbols(&self) -> Arc<Mutex<Namespace>> {
        self.symbols.clone()
    }
}

impl Iterator for Reader {
    type Item = ParsedClause;

    fn next(&mut self) -> Option<ParsedClause> {
        self.next_clause()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// Parser task
// --------------------------------------------------

struct Parser {
    lexemes: Receiver<Lexeme>,
    out: SyncSender<ParsedClause>,
    gate: SyncSender<()>,
    ops: Arc<RwLock<OpTable>>,
    symbols: Arc<Mutex<Namespace>>,
    buf: Option<Lexeme>,
    last_pos: (u32, u32),
    heap: Vec<Subterm>,
    errors: Vec<SyntaxError>,
    fatal: bool,
    neck: Name,
}

impl Parser {
    /// The entry point of the parser thread: one clause per iteration.
    fn run(mut self) {
        self.advance();
        loop {
            self.skip_space();
            let Some(kind) = self.cur_kind() else { break };
            match kind {
                // the terminator of the previous clause, or an empty clause
                LexKind::Terminal => {
                    self.advance();
                    continue;
                }
                LexKind::Err => {
                    let err = self.lex_error();
                    let _ = self.out.send(ParsedClause {
                        clause: Err(vec![err]),
                        directive: false,
                    });
                    break;
                }
                _ => {}
            }

            self.ns().begin_clause();
            self.heap.clear();
            self.errors.clear();

            let root = self.read(MAX_PREC);
            self.skip_space();
            match self.cur_kind() {
                Some(LexKind::Terminal) | None => {}
                Some(LexKind::Err) => {
                    if !self.fatal {
                        let err = self.lex_error();
                        self.errors.push(err);
                        self.fatal = true;
                    }
                }
                Some(_) => {
                    if root.is_some() {
                        self.report(ErrorKind::Precedence, "operator priority clash");
                    } else {
                        let msg = format!("expected a term, found {}", self.cur_desc());
                        self.report(ErrorKind::Syntax, msg);
                    }
                    self.recover();
                }
            }

            let unit = match root {
                Some(root) if self.errors.is_empty() => {
                    self.heap.push(root);
                    let clause = Clause::from(self.heap.clone());
                    debug_assert!(clause.is_well_formed());
                    let directive = clause.is_directive(self.neck);
                    log::debug!("clause: {} subterms, directive: {directive}", clause.len());
                    ParsedClause { clause: Ok(clause), directive }
                }
                _ => {
                    if self.errors.is_empty() {
                        self.report(ErrorKind::Syntax, "expected a term");
                    }
                    ParsedClause {
                        clause: Err(std::mem::take(&mut self.errors)),
                        directive: false,
                    }
                }
            };

            let directive = unit.directive;
            if self.out.send(unit).is_err() {
                return; // caller hung up
            }
            // pause after a directive until the caller acknowledges; the
            // terminator of the directive is still the current lexeme
            if directive && self.gate.send(()).is_err() {
                return;
            }
            if self.fatal {
                return;
            }
        }
    }

    // Lexeme plumbing
    // --------------------------------------------------

    fn advance(&mut self) {
        if let Some(t) = &self.buf {
            self.last_pos = (t.line, t.col);
        }
        self.buf = self.lexemes.recv().ok();
    }

    fn cur_kind(&self) -> Option<LexKind> {
        self.buf.as_ref().map(|t| t.kind)
    }

    fn cur_desc(&self) -> String {
        match &self.buf {
            Some(t) => String::from(format!("{t}")),
            None => String::from("end of input"),
        }
    }

    /// True if the current lexeme is a functor whose value is `text`.
    fn cur_is_funct(&self, text: &str) -> bool {
        matches!(&self.buf, Some(t) if t.kind == LexKind::Funct
            && matches!(&t.value, Some(Symbol::Functor(s)) if s == text))
    }

    fn skip_space(&mut self) {
        while matches!(self.cur_kind(), Some(LexKind::Space) | Some(LexKind::Comment)) {
            self.advance();
        }
    }

    /// Discards lexemes up to and including the next terminator.
    fn recover(&mut self) {
        loop {
            match self.cur_kind() {
                None | Some(LexKind::Terminal) => return,
                Some(LexKind::Err) => {
                    if !self.fatal {
                        let err = self.lex_error();
                        self.errors.push(err);
                        self.fatal = true;
                    }
                    return;
                }
                Some(_) => self.advance(),
            }
        }
    }

    fn position(&self) -> (u32, u32) {
        self.buf.as_ref().map(|t| (t.line, t.col)).unwrap_or(self.last_pos)
    }

    fn report(&mut self, kind: ErrorKind, message: impl Into<String>) {
        let (line, col) = self.position();
        let err = SyntaxError { line, col, kind, message: message.into() };
        log::debug!("report: {err}");
        self.errors.push(err);
    }

    fn lex_error(&self) -> SyntaxError {
        match &self.buf {
            Some(t) => SyntaxError::lexical(t.line, t.col, t.text.clone()),
            None => {
                let (line, col) = self.last_pos;
                SyntaxError::lexical(line, col, "lexeme stream closed")
            }
        }
    }

    // Shared state
    // --------------------------------------------------

    fn ns(&self) -> MutexGuard<'_, Namespace> {
        lock(&self.symbols)
    }

    fn intern(&self, tok: &Lexeme) -> Name {
        let mut ns = self.ns();
        match &tok.value {
            Some(sym) => ns.name_of(sym),
            None => ns.name_of(&Symbol::Functor(tok.text.clone())),
        }
    }

    fn op_in(&self, name: &str, fixity: Fixity) -> Option<Oper> {
        self.ops
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .find(name, fixity)
            .cloned()
    }

    /// The functor text of an atom, if `t` is one interned here.
    fn atom_text(&self, t: &Subterm) -> Option<String> {
        if !t.is_atom() {
            return None;
        }
        match self.ns().value_of(t.name) {
            Ok(Symbol::Functor(text)) => Some(text),
            _ => None,
        }
    }

    // Term reading
    // --------------------------------------------------

    /// Reads the next term of precedence at most `max_prec`. Returns
    /// `None`, consuming nothing, when the stream offers no primary here.
    fn read(&mut self, max_prec: u32) -> Option<Subterm> {
        self.skip_space();
        let tok = self.buf.clone()?;
        let lhs = match tok.kind {
            LexKind::Terminal
            | LexKind::ParenClose
            | LexKind::BracketClose
            | LexKind::BraceClose => return None,
            LexKind::Err => {
                if !self.fatal {
                    let err = self.lex_error();
                    self.errors.push(err);
                    self.fatal = true;
                }
                return None;
            }
            LexKind::Funct => self.read_functor(&tok),
            LexKind::Var | LexKind::Num | LexKind::Str => {
                let name = self.intern(&tok);
                self.advance();
                Subterm::atomic(name)
            }
            LexKind::ParenOpen => self.read_group()?,
            LexKind::BracketOpen => self.read_list()?,
            LexKind::BraceOpen => {
                self.report(ErrorKind::Syntax, "curly-brace terms are not supported");
                self.advance();
                return None;
            }
            LexKind::Space | LexKind::Comment => unreachable!("skipped above"),
        };
        Some(self.read_op(lhs, 0, max_prec))
    }

    /// Extends `lhs` with operators while the precedence rules admit them.
    ///
    /// An atom may first be reinterpreted as a prefix operator applied to
    /// the term that follows. After that, infix and postfix declarations of
    /// the next functor are considered; when a functor declares both, the
    /// infix reading is preferred and postfix is the fallback, which gives
    /// the conventional greedy-operator behaviour.
    fn read_op(&mut self, lhs: Subterm, lhs_prec: u32, max_prec: u32) -> Subterm {
        if let Some(text) = self.atom_text(&lhs) {
            if let Some(op) = self.op_in(&text, Fixity::Prefix) {
                self.skip_space();
                // a comma or bar can only separate, never start an operand
                if op.prec <= max_prec && !self.cur_is_funct(",") && !self.cur_is_funct("|") {
                    let operand_max = match op.class {
                        OpClass::Fy => op.prec,
                        _ => op.prec - 1, // fx
                    };
                    if let Some(rhs) = self.read(operand_max) {
                        let off = self.heap.len() as u32;
                        self.heap.push(rhs);
                        let t = Subterm::compound(lhs.name, 1, off);
                        return self.read_op(t, op.prec, max_prec);
                    }
                }
            }
        }

        self.skip_space();
        let Some(tok) = self.buf.clone() else { return lhs };
        if tok.kind != LexKind::Funct {
            return lhs;
        }
        let Some(Symbol::Functor(text)) = tok.value.clone() else {
            return lhs;
        };

        let infix = self
            .op_in(&text, Fixity::Infix)
            .filter(|op| admissible(op, lhs_prec, max_prec));
        let postfix = self
            .op_in(&text, Fixity::Postfix)
            .filter(|op| admissible(op, lhs_prec, max_prec));
        if infix.is_none() && postfix.is_none() {
            return lhs;
        }

        let name = self.intern(&tok);
        self.advance();

        if let Some(op) = &infix {
            let rhs_max = match op.class {
                OpClass::Xfy => op.prec,
                _ => op.prec - 1, // xfx, yfx
            };
            if let Some(rhs) = self.read(rhs_max) {
                let off = self.heap.len() as u32;
                self.heap.push(lhs);
                self.heap.push(rhs);
                let t = Subterm::compound(name, 2, off);
                return self.read_op(t, op.prec, max_prec);
            }
        }
        if let Some(op) = &postfix {
            let off = self.heap.len() as u32;
            self.heap.push(lhs);
            let t = Subterm::compound(name, 1, off);
            return self.read_op(t, op.prec, max_prec);
        }

        let msg = format!("expected a term after operator {text:?}");
        self.report(ErrorKind::Syntax, msg);
        lhs
    }

    /// Reads a functor primary. A compound is only recognised when `(`
    /// follows the functor with no intervening whitespace.
    fn read_functor(&mut self, tok: &Lexeme) -> Subterm {
        let name = self.intern(tok);
        self.advance();
        if self.cur_kind() == Some(LexKind::ParenOpen) {
            let args = self.read_args();
            let off = self.heap.len() as u32;
            let arity = args.len() as u32;
            self.heap.extend(args);
            Subterm::compound(name, arity, off)
        } else {
            Subterm::atomic(name)
        }
    }

    /// Reads a parenthesised, comma-separated argument list. Arguments are
    /// read at precedence 999 so the `,` at 1000 separates them.
    fn read_args(&mut self) -> Vec<Subterm> {
        let mut args = Vec::with_capacity(4);
        loop {
            self.advance(); // the '(' or the ','
            if let Some(arg) = self.read(ARG_PREC) {
                args.push(arg);
            }
            self.skip_space();
            if self.cur_kind() == Some(LexKind::Err) {
                // the lexical error is already recorded
                return args;
            }
            if self.cur_is_funct(",") {
                continue;
            }
            if self.cur_kind() == Some(LexKind::ParenClose) {
                self.advance();
                return args;
            }
            let msg = format!("expected ',' or ')', found {}", self.cur_desc());
            self.report(ErrorKind::Syntax, msg);
            return args;
        }
    }

    /// Reads a parenthesised group at full precedence.
    fn read_group(&mut self) -> Option<Subterm> {
        self.advance(); // the '('
        let t = self.read(MAX_PREC);
        self.skip_space();
        if self.cur_kind() == Some(LexKind::ParenClose) {
            self.advance();
        } else {
            let msg = format!("expected ')', found {}", self.cur_desc());
            self.report(ErrorKind::Syntax, msg);
        }
        t
    }

    /// Reads list notation and desugars it onto the clause heap:
    /// `[]` is the empty-list atom and `[a, b | T]` becomes
    /// `'.'(a, '.'(b, T))`, built bottom-up.
    fn read_list(&mut self) -> Option<Subterm> {
        self.advance(); // the '['
        self.skip_space();
        if self.cur_kind() == Some(LexKind::BracketClose) {
            self.advance();
            let nil = self.ns().name_of(&Symbol::Functor("[]".into()));
            return Some(Subterm::atomic(nil));
        }

        let mut elems = Vec::new();
        let mut tail = None;
        loop {
            match self.read(ARG_PREC) {
                Some(t) => elems.push(t),
                None => {
                    let msg = format!("expected a list element, found {}", self.cur_desc());
                    self.report(ErrorKind::Syntax, msg);
                    break;
                }
            }
            self.skip_space();
            if self.cur_is_funct(",") {
                self.advance();
                continue;
            }
            if self.cur_is_funct("|") {
                self.advance();
                tail = self.read(ARG_PREC);
                if tail.is_none() {
                    let msg = format!("expected a list tail, found {}", self.cur_desc());
                    self.report(ErrorKind::Syntax, msg);
                }
                self.skip_space();
            }
            if self.cur_kind() == Some(LexKind::BracketClose) {
                self.advance();
            } else {
                let msg = format!("expected ',', '|' or ']', found {}", self.cur_desc());
                self.report(ErrorKind::Syntax, msg);
            }
            break;
        }

        let (dot, nil) = {
            let mut ns = self.ns();
            (
                ns.name_of(&Symbol::Functor(".".into())),
                ns.name_of(&Symbol::Functor("[]".into())),
            )
        };
        let mut list = tail.unwrap_or(Subterm::atomic(nil));
        for elem in elems.into_iter().rev() {
            let off = self.heap.len() as u32;
            self.heap.push(elem);
            self.heap.push(list);
            list = Subterm::compound(dot, 2, off);
        }
        Some(list)
    }
}

/// The admissibility rule for infix and postfix declarations: the operator
/// must fit under the ceiling, and the left operand must be strictly
/// tighter for `x`-side classes or at most as loose for `y`-side ones.
fn admissible(op: &Oper, lhs_prec: u32, max_prec: u32) -> bool {
    if op.prec > max_prec {
        return false;
    }
    match op.class {
        OpClass::Xf | OpClass::Xfx | OpClass::Xfy => lhs_prec < op.prec,
        OpClass::Yf | OpClass::Yfx => lhs_prec <= op.prec,
        OpClass::Fx | OpClass::Fy => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolog_terms::SymbolKind;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn read_all(src: &'static str) -> (Vec<ParsedClause>, Arc<Mutex<Namespace>>) {
        let mut reader = Reader::new(src.as_bytes());
        let symbols = reader.symbols();
        let units: Vec<ParsedClause> = reader.by_ref().collect();
        (units, symbols)
    }

    /// Canonical forms of all valid clauses in `src`.
    fn canon(src: &'static str) -> Vec<std::string::String> {
        let (units, symbols) = read_all(src);
        let ns = lock(&symbols);
        units
            .iter()
            .filter_map(|u| u.clause.as_ref().ok())
            .map(|c| c.display(&ns).to_string())
            .collect()
    }

    #[test]
    fn precedence_and_associativity() {
        init_logger();
        assert_eq!(canon("a + b * c - d."), vec!["-(+(a,*(b,c)),d)"]);
        assert_eq!(canon("a + b + c."), vec!["+(+(a,b),c)"]);
        assert_eq!(canon("a ^ b ^ c."), vec!["^(a,^(b,c))"]);
        assert_eq!(canon("X = 1 + 2."), vec!["=(X,+(1,2))"]);
    }

    #[test]
    fn functor_arguments() {
        assert_eq!(canon("foo(bar, Baz)."), vec!["foo(bar,Baz)"]);
        assert_eq!(canon("f(g(1), h)."), vec!["f(g(1),h)"]);
        // parens after whitespace are a group, not an argument list
        let (units, _) = read_all("foo (bar).");
        assert!(units[0].clause.is_err());
    }

    #[test]
    fn prefix_operators() {
        assert_eq!(canon("- 1 + 2."), vec!["+(-(1),2)"]);
        assert_eq!(canon(":- hello."), vec![":-(hello)"]);
        assert_eq!(canon("a * - b."), vec!["*(a,-(b))"]);
        // a prefix operator with no operand is a plain atom
        assert_eq!(canon("X = -."), vec!["=(X,-)"]);
    }

    #[test]
    fn prefix_atoms_before_separators_stay_atoms() {
        assert_eq!(canon("f(-, 1)."), vec!["f(-,1)"]);
        assert_eq!(canon("[-, a]."), vec![".(-,.(a,[]))"]);
    }

    #[test]
    fn parenthesised_groups() {
        assert_eq!(canon("(a , b)."), vec![",(a,b)"]);
        assert_eq!(canon("f((a , b))."), vec!["f(,(a,b))"]);
        assert_eq!(canon("2 * (3 + 4)."), vec!["*(2,+(3,4))"]);
    }

    #[test]
    fn argument_lists_cap_precedence_at_999() {
        // `,` separates arguments
        let (units, _) = read_all("f(a, b).");
        assert!(units[0].clause.is_ok());
        // an unparenthesised 1200 operator cannot live in argument position
        let (units, _) = read_all("f(a, b :- c).");
        let errors = units[0].clause.as_ref().unwrap_err();
        assert!(errors.iter().any(|e| e.message.contains("expected ',' or ')'")));
        // parenthesised it is fine
        assert_eq!(canon("f(a, (b :- c))."), vec!["f(a,:-(b,c))"]);
    }

    #[test]
    fn interning_is_shared_within_a_clause() {
        let (units, _) = read_all("foo(bar, bar).");
        let clause = units[0].clause.as_ref().unwrap();
        let root = clause.root();
        let args = clause.args(&root);
        assert_eq!(args[0].name, args[1].name);
    }

    #[test]
    fn variables_are_clause_scoped() {
        let (units, _) = read_all("f(X, X). g(X).");
        let first = units[0].clause.as_ref().unwrap();
        let second = units[1].clause.as_ref().unwrap();
        let a = first.args(&first.root())[0];
        let b = first.args(&first.root())[1];
        assert_eq!(a.name, b.name);
        let c = second.args(&second.root())[0];
        assert_eq!(c.name.kind(), SymbolKind::Variable);
        assert_ne!(a.name, c.name);
    }

    #[test]
    fn emitted_clauses_are_well_formed() {
        let (units, _) = read_all("a + b * c - d. foo(bar, baz(1, [x, y])). - f(X).");
        for unit in &units {
            let clause = unit.clause.as_ref().unwrap();
            assert!(clause.is_well_formed());
        }
    }

    #[test]
    fn quoted_atoms_keep_escapes() {
        assert_eq!(canon("'hello\\nworld'."), vec!["hello\nworld"]);
    }

    #[test]
    fn list_notation_desugars() {
        assert_eq!(canon("[]."), vec!["[]"]);
        assert_eq!(canon("[a]."), vec![".(a,[])"]);
        assert_eq!(canon("[a, b | T]."), vec![".(a,.(b,T))"]);
        assert_eq!(canon("[a, b]."), vec![".(a,.(b,[]))"]);
    }

    #[test]
    fn empty_clauses_are_skipped() {
        let (units, _) = read_all(" . . foo . .");
        assert_eq!(units.len(), 1);
        assert!(units[0].clause.is_ok());
    }

    #[test]
    fn missing_close_paren_at_end_of_input() {
        let (units, _) = read_all("foo(bar");
        assert_eq!(units.len(), 1);
        let errors = units[0].clause.as_ref().unwrap_err();
        assert!(errors[0].message.contains("expected ',' or ')'"));
    }

    #[test]
    fn mismatched_brackets_point_at_the_offender() {
        let (units, _) = read_all("f(a].");
        let errors = units[0].clause.as_ref().unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Syntax);
        assert_eq!((errors[0].line, errors[0].col), (1, 4));
    }

    #[test]
    fn priority_clash_is_reported() {
        let (units, _) = read_all("foo bar.");
        let errors = units[0].clause.as_ref().unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ErrorKind::Precedence));
    }

    #[test]
    fn recovery_resumes_after_the_terminator() {
        init_logger();
        let (units, _) = read_all("f(a b). ok. also(fine).");
        assert_eq!(units.len(), 3);
        assert!(units[0].clause.is_err());
        assert!(units[1].clause.is_ok());
        assert!(units[2].clause.is_ok());
    }

    #[test]
    fn lexical_errors_are_fatal() {
        let (units, _) = read_all("f('unclosed). later.");
        let last = units.last().unwrap();
        let errors = last.clause.as_ref().unwrap_err();
        assert!(errors.iter().any(|e| e.kind == ErrorKind::Lexical));
        // nothing after the fatal error is parsed
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn directive_handshake_applies_operator_mutation() {
        init_logger();
        let src = ":- op(700, xfx, likes). alice likes bob.";
        let mut reader = Reader::new(src.as_bytes());
        let symbols = reader.symbols();
        let ops = reader.op_table();

        let first = reader.next_clause().unwrap();
        assert!(first.directive);
        let directive = first.clause.unwrap();
        {
            let ns = lock(&symbols);
            let op = Oper::from_directive(&directive, &ns).unwrap();
            assert_eq!(op.name, "likes");
            assert_eq!(op.prec, 700);
            assert_eq!(op.class, OpClass::Xfx);
            ops.write().unwrap().insert(op);
        }

        let second = reader.next_clause().unwrap();
        let clause = second.clause.unwrap();
        let ns = lock(&symbols);
        assert_eq!(clause.display(&ns).to_string(), "likes(alice,bob)");
        drop(ns);
        assert!(reader.next_clause().is_none());
    }

    #[test]
    fn without_the_declaration_the_same_clause_fails() {
        let (units, _) = read_all("alice likes bob.");
        assert!(units[0].clause.is_err());
    }

    #[test]
    fn deleting_an_operator_affects_the_next_clause() {
        let src = ":- noop. a + b.";
        let mut reader = Reader::new(src.as_bytes());
        let ops = reader.op_table();
        let first = reader.next_clause().unwrap();
        assert!(first.directive);
        {
            let mut tab = ops.write().unwrap();
            let plus = tab.find("+", Fixity::Infix).cloned().unwrap();
            tab.delete(&plus);
        }
        let second = reader.next_clause().unwrap();
        assert!(second.clause.is_err());
    }

    #[test]
    fn dropping_the_reader_cancels_the_tasks() {
        let mut reader = Reader::new("a. b. c. d. e. f. g. h.".as_bytes());
        let _ = reader.next_clause();
        drop(reader); // both threads must unblock and exit
    }
}
