//! Operator declarations and the user-extensible operator table.
//!
//! Operators carry a name, a precedence in `1..=1200`, and a class encoding
//! their position and associativity (`fx fy xfx xfy yfx xf yf`). The table
//! keeps at most one declaration per name and positional class, so up to
//! three declarations may share a name: one prefix, one infix, one postfix.

use crate::{Clause, Namespace, Symbol, TermError};
use indexmap::IndexMap;
use smartstring::alias::String;
use std::fmt;
use std::str::FromStr;

/// The syntactic position of an operator declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fixity {
    /// Before its operand, e.g. `- x`.
    Prefix = 0,
    /// Between operands, e.g. `x + y`.
    Infix = 1,
    /// After its operand, e.g. `x !`.
    Postfix = 2,
}

impl Fixity {
    /// The total number of fixity variants.
    pub const COUNT: usize = 3;
}

/// An operator class: position plus associativity.
///
/// `x` marks an operand of strictly lower precedence, `y` one of at most
/// the operator's own precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpClass {
    /// Non-associative prefix.
    Fx,
    /// Right-associative prefix.
    Fy,
    /// Non-associative infix.
    Xfx,
    /// Right-associative infix.
    Xfy,
    /// Left-associative infix.
    Yfx,
    /// Non-associative postfix.
    Xf,
    /// Left-associative postfix.
    Yf,
}

impl OpClass {
    /// Canonical lowercase spellings, in declaration order.
    pub const STRS: &[&str] = &["fx", "fy", "xfx", "xfy", "yfx", "xf", "yf"];

    /// The positional class of this operator class.
    pub fn fixity(self) -> Fixity {
        match self {
            OpClass::Fx | OpClass::Fy => Fixity::Prefix,
            OpClass::Xfx | OpClass::Xfy | OpClass::Yfx => Fixity::Infix,
            OpClass::Xf | OpClass::Yf => Fixity::Postfix,
        }
    }

    /// The number of operands the class requires.
    pub fn arity(self) -> u32 {
        match self.fixity() {
            Fixity::Infix => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for OpClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::STRS[*self as usize])
    }
}

impl FromStr for OpClass {
    type Err = TermError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fx" => Ok(OpClass::Fx),
            "fy" => Ok(OpClass::Fy),
            "xfx" => Ok(OpClass::Xfx),
            "xfy" => Ok(OpClass::Xfy),
            "yfx" => Ok(OpClass::Yfx),
            "xf" => Ok(OpClass::Xf),
            "yf" => Ok(OpClass::Yf),
            other => Err(TermError::InvalidClass(String::from(other))),
        }
    }
}

/// A single operator declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Oper {
    /// The functor text of the operator.
    pub name: String,
    /// Precedence in `1..=1200`; lower binds tighter.
    pub prec: u32,
    /// Position and associativity.
    pub class: OpClass,
}

/// Maximum operator precedence, the precedence of a whole term.
pub const MAX_PREC: u32 = 1200;

/// Maximum precedence of an argument inside an argument list, one below the
/// precedence of `,`.
pub const ARG_PREC: u32 = 999;

impl Oper {
    /// Creates a declaration, validating the precedence range.
    ///
    /// # Errors
    /// [`TermError::PrecedenceRange`] if `prec` is outside `1..=1200`.
    pub fn new(name: impl Into<String>, prec: u32, class: OpClass) -> Result<Self, TermError> {
        if prec < 1 || prec > MAX_PREC {
            return Err(TermError::PrecedenceRange(prec as i64));
        }
        Ok(Self { name: name.into(), prec, class })
    }

    /// Extracts an operator declaration from an `:- op(Prec, Class, Name)`
    /// directive clause.
    ///
    /// # Errors
    /// [`TermError::NotADirective`] if the clause has a different shape;
    /// [`TermError::PrecedenceRange`] / [`TermError::InvalidClass`] if the
    /// arguments are out of range.
    pub fn from_directive(clause: &Clause, ns: &Namespace) -> Result<Oper, TermError> {
        let root = clause.root();
        if root.arity != 1 || ns.value_of(root.name)? != Symbol::Functor(":-".into()) {
            return Err(TermError::NotADirective);
        }
        let op = clause.args(&root)[0];
        if op.arity != 3 || ns.value_of(op.name)? != Symbol::Functor("op".into()) {
            return Err(TermError::NotADirective);
        }
        let [prec, class, name] = clause.args(&op) else {
            return Err(TermError::NotADirective);
        };

        let prec = match prec.name.as_int() {
            Some(p) if (1..=MAX_PREC as i64).contains(&p) => p as u32,
            Some(p) => return Err(TermError::PrecedenceRange(p)),
            None => return Err(TermError::NotADirective),
        };
        let Symbol::Functor(class) = ns.value_of(class.name)? else {
            return Err(TermError::NotADirective);
        };
        let Symbol::Functor(name) = ns.value_of(name.name)? else {
            return Err(TermError::NotADirective);
        };
        Oper::new(name, prec, class.parse()?)
    }
}

impl fmt::Display for Oper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op({}, {}, {})", self.prec, self.class, self.name)
    }
}

/// The declarations sharing one name, one slot per [`Fixity`].
#[derive(Debug, Clone, Default)]
pub struct OpEntry {
    tab: [Option<Oper>; Fixity::COUNT],
}

impl OpEntry {
    /// The declaration in the given positional class, if any.
    pub fn get(&self, fixity: Fixity) -> Option<&Oper> {
        self.tab[fixity as usize].as_ref()
    }

    /// Iterates over the declarations present, prefix slot first.
    pub fn iter(&self) -> impl Iterator<Item = &Oper> {
        self.tab.iter().flatten()
    }

    fn is_empty(&self) -> bool {
        self.tab.iter().all(|s| s.is_none())
    }
}

impl std::ops::Index<Fixity> for OpEntry {
    type Output = Option<Oper>;

    fn index(&self, i: Fixity) -> &Self::Output {
        &self.tab[i as usize]
    }
}

impl std::ops::IndexMut<Fixity> for OpEntry {
    fn index_mut(&mut self, i: Fixity) -> &mut Self::Output {
        &mut self.tab[i as usize]
    }
}

/// The operator table consulted by the parser.
///
/// Mutation is legal only between clauses; in a running reader that means
/// during a directive pause. The reader wraps the table in a reader/writer
/// lock so that lookups during parsing stay consistent.
#[derive(Debug, Clone)]
pub struct OpTable {
    map: IndexMap<String, OpEntry>,
}

/// Shared empty entry for names with no declarations.
static EMPTY_ENTRY: OpEntry = OpEntry { tab: [None, None, None] };

impl Default for OpTable {
    /// Seeds the standard Prolog operator set.
    fn default() -> Self {
        let mut tab = Self::new();
        for &(name, prec, class) in DEFAULT_OPS {
            // the defaults are all in range
            if let Ok(op) = Oper::new(name, prec, class) {
                tab.insert(op);
            }
        }
        tab
    }
}

impl OpTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self { map: IndexMap::new() }
    }

    /// The declarations bearing `name`, prefix first, then infix, then
    /// postfix. Yields nothing for undeclared names.
    pub fn lookup(&self, name: &str) -> impl Iterator<Item = &Oper> {
        self.entry(name).iter()
    }

    /// The slot table for `name`.
    pub fn entry(&self, name: &str) -> &OpEntry {
        self.map.get(name).unwrap_or(&EMPTY_ENTRY)
    }

    /// The declaration of `name` in the given positional class, if any.
    pub fn find(&self, name: &str, fixity: Fixity) -> Option<&Oper> {
        self.entry(name).get(fixity)
    }

    /// Adds a declaration, replacing any existing one of the same name and
    /// positional class. Returns true if a declaration was replaced.
    pub fn insert(&mut self, op: Oper) -> bool {
        let entry = self.map.entry(op.name.clone()).or_default();
        let slot = &mut entry[op.class.fixity()];
        let existed = slot.is_some();
        *slot = Some(op);
        existed
    }

    /// Removes a declaration that matches `op` exactly. Idempotent: returns
    /// false if no such declaration exists.
    pub fn delete(&mut self, op: &Oper) -> bool {
        let Some(entry) = self.map.get_mut(op.name.as_str()) else {
            return false;
        };
        let slot = &mut entry[op.class.fixity()];
        if slot.as_ref() != Some(op) {
            return false;
        }
        *slot = None;
        if entry.is_empty() {
            self.map.swap_remove(op.name.as_str());
        }
        true
    }

    /// The number of declarations in the table.
    pub fn len(&self) -> usize {
        self.map.values().map(|e| e.iter().count()).sum()
    }

    /// Returns true if the table holds no declarations.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Iterates over every declaration.
    pub fn iter(&self) -> impl Iterator<Item = &Oper> {
        self.map.values().flat_map(|e| e.iter())
    }
}

/// The standard operator set.
#[rustfmt::skip]
const DEFAULT_OPS: &[(&str, u32, OpClass)] = &[
    (":-",   1200, OpClass::Xfx), (":-",   1200, OpClass::Fx),
    ("-->",  1200, OpClass::Xfx),
    (";",    1100, OpClass::Xfy), ("|",    1100, OpClass::Xfy),
    ("->",   1050, OpClass::Xfy), ("*->",  1050, OpClass::Xfy),
    (",",    1000, OpClass::Xfy),
    (":=",    990, OpClass::Xfx),
    ("\\+",   900, OpClass::Fy),
    ("=",     700, OpClass::Xfx), ("\\=",   700, OpClass::Xfx),
    ("==",    700, OpClass::Xfx), ("\\==",  700, OpClass::Xfx),
    ("=@=",   700, OpClass::Xfx), ("\\=@=", 700, OpClass::Xfx),
    ("=..",   700, OpClass::Xfx), ("is",    700, OpClass::Xfx),
    ("=:=",   700, OpClass::Xfx), ("=\\=",  700, OpClass::Xfx),
    ("<",     700, OpClass::Xfx), (">",     700, OpClass::Xfx),
    ("=<",    700, OpClass::Xfx), (">=",    700, OpClass::Xfx),
    ("@<",    700, OpClass::Xfx), ("@>",    700, OpClass::Xfx),
    ("@=<",   700, OpClass::Xfx), ("@>=",   700, OpClass::Xfx),
    (":<",    700, OpClass::Xfx), (">:<",   700, OpClass::Xfx),
    ("as",    700, OpClass::Xfx),
    (":",     600, OpClass::Xfy),
    ("+",     500, OpClass::Yfx), ("-",     500, OpClass::Yfx),
    ("/\\",   500, OpClass::Yfx), ("\\/",   500, OpClass::Yfx),
    ("xor",   500, OpClass::Yfx),
    ("?",     500, OpClass::Fx),
    ("*",     400, OpClass::Yfx), ("/",     400, OpClass::Yfx),
    ("//",    400, OpClass::Yfx), ("mod",   400, OpClass::Yfx),
    ("div",   400, OpClass::Yfx), ("rdiv",  400, OpClass::Yfx),
    ("rem",   400, OpClass::Yfx),
    ("<<",    400, OpClass::Yfx), (">>",    400, OpClass::Yfx),
    ("**",    200, OpClass::Xfx), ("^",     200, OpClass::Xfy),
    ("+",     200, OpClass::Fy),  ("-",     200, OpClass::Fy),
    ("\\",    200, OpClass::Fy),
    (".",     100, OpClass::Yfx),
    ("$",       1, OpClass::Fx),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_spellings_round_trip() {
        for &s in OpClass::STRS {
            let class: OpClass = s.parse().unwrap();
            assert_eq!(class.to_string(), s);
        }
        assert!(matches!(
            "zfz".parse::<OpClass>(),
            Err(TermError::InvalidClass(_))
        ));
    }

    #[test]
    fn class_arities() {
        assert_eq!(OpClass::Fy.arity(), 1);
        assert_eq!(OpClass::Yfx.arity(), 2);
        assert_eq!(OpClass::Xf.arity(), 1);
    }

    #[test]
    fn precedence_is_validated() {
        assert!(Oper::new("+", 0, OpClass::Yfx).is_err());
        assert!(Oper::new("+", 1201, OpClass::Yfx).is_err());
        assert!(Oper::new("+", 500, OpClass::Yfx).is_ok());
    }

    #[test]
    fn default_table_shape() {
        let tab = OpTable::default();
        // ":-" declares both xfx and fx
        let neck: Vec<_> = tab.lookup(":-").collect();
        assert_eq!(neck.len(), 2);
        // "-" is both infix 500 and prefix 200
        assert_eq!(tab.find("-", Fixity::Infix).unwrap().prec, 500);
        assert_eq!(tab.find("-", Fixity::Prefix).unwrap().prec, 200);
        assert_eq!(tab.find(",", Fixity::Infix).unwrap().prec, 1000);
        assert!(tab.lookup("likes").next().is_none());
    }

    #[test]
    fn insert_replaces_same_position_only() {
        let mut tab = OpTable::new();
        assert!(!tab.insert(Oper::new("-", 500, OpClass::Yfx).unwrap()));
        assert!(!tab.insert(Oper::new("-", 200, OpClass::Fy).unwrap()));
        assert_eq!(tab.lookup("-").count(), 2);
        // replacing the infix declaration keeps the prefix one
        assert!(tab.insert(Oper::new("-", 400, OpClass::Xfx).unwrap()));
        assert_eq!(tab.find("-", Fixity::Infix).unwrap().prec, 400);
        assert_eq!(tab.find("-", Fixity::Prefix).unwrap().prec, 200);
    }

    #[test]
    fn delete_is_exact_and_idempotent() {
        let mut tab = OpTable::new();
        let op = Oper::new("-", 500, OpClass::Yfx).unwrap();
        tab.insert(op.clone());
        let other = Oper::new("-", 501, OpClass::Yfx).unwrap();
        assert!(!tab.delete(&other));
        assert!(tab.delete(&op));
        assert!(!tab.delete(&op));
        assert!(tab.is_empty());
    }
}
