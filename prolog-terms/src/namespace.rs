//! The interning namespace: assigns compact [`Name`] handles to [`Symbol`]s.
//!
//! A [`Name`] carries the minimum information to compare and hash the named
//! symbol without touching the symbol itself: the kind and an ordering key.
//! Functors and variables receive fractional `f64` addresses from an ordered
//! treap, assigned on first insertion so that address order agrees with
//! lexicographic order. Integers within `i64` and all floats are *implicit*:
//! their value is embedded in the name directly and nothing is retained.
//!
//! Names from different namespaces are incomparable; every name embeds the
//! identifier of the namespace that minted it, and ordering names across
//! namespaces panics rather than mis-ordering silently.

use crate::symbol::{normal_float, Symbol, SymbolKind};
use crate::TermError;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use smartstring::alias::String;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A compact, copyable handle for an interned [`Symbol`].
///
/// Two names from the same [`Namespace`] compare equal iff the underlying
/// symbols are equal, and their ordering agrees with the standard order of
/// terms. Comparing names minted by different namespaces panics.
///
/// Variable identity is scoped to one clause: textually equal variables
/// interned on either side of [`Namespace::begin_clause`] receive distinct
/// names.
#[derive(Debug, Clone, Copy)]
pub struct Name {
    ns: u32,
    key: NameKey,
}

/// The ordering payload of a [`Name`].
///
/// Variants are declared in the standard order of terms, with the integer
/// kind split into three bands so that retained integers below `i64::MIN`
/// and above `i64::MAX` sort on the correct side of the implicit values.
#[derive(Debug, Clone, Copy)]
enum NameKey {
    /// Treap address of a variable, tagged with its clause generation.
    Var { clause: u32, addr: f64 },
    /// The normalised float value itself.
    Float(f64),
    /// Treap address of a retained integer below `i64::MIN`.
    IntNeg(f64),
    /// An integer value embedded directly.
    Int(i64),
    /// Treap address of a retained integer above `i64::MAX`.
    IntPos(f64),
    /// Treap address of a functor.
    Funct(f64),
}

impl NameKey {
    fn rank(&self) -> u8 {
        match self {
            NameKey::Var { .. } => 0,
            NameKey::Float(_) => 1,
            NameKey::IntNeg(_) => 2,
            NameKey::Int(_) => 3,
            NameKey::IntPos(_) => 4,
            NameKey::Funct(_) => 5,
        }
    }
}

impl Name {
    /// Returns the kind of the named symbol.
    pub fn kind(&self) -> SymbolKind {
        match self.key {
            NameKey::Var { .. } => SymbolKind::Variable,
            NameKey::Float(_) => SymbolKind::Float,
            NameKey::IntNeg(_) | NameKey::Int(_) | NameKey::IntPos(_) => SymbolKind::Integer,
            NameKey::Funct(_) => SymbolKind::Functor,
        }
    }

    /// Returns the embedded integer value, if this name is an implicit
    /// integer.
    pub fn as_int(&self) -> Option<i64> {
        match self.key {
            NameKey::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the embedded float value, if this name is a float.
    pub fn as_float(&self) -> Option<f64> {
        match self.key {
            NameKey::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.ns == other.ns && self.key.cmp_key(&other.key) == Ordering::Equal
    }
}

impl Eq for Name {}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    /// Orders names by the standard order of the symbols they denote.
    ///
    /// # Panics
    /// Panics if the names were minted by different namespaces.
    fn cmp(&self, other: &Self) -> Ordering {
        assert_eq!(
            self.ns, other.ns,
            "cannot compare names from different namespaces"
        );
        self.key.cmp_key(&other.key)
    }
}

impl NameKey {
    fn cmp_key(&self, other: &Self) -> Ordering {
        match (self, other) {
            (
                NameKey::Var { clause: ga, addr: aa },
                NameKey::Var { clause: gb, addr: ab },
            ) => ga.cmp(gb).then_with(|| aa.total_cmp(ab)),
            (NameKey::Float(a), NameKey::Float(b)) => a.total_cmp(b),
            (NameKey::IntNeg(a), NameKey::IntNeg(b)) => a.total_cmp(b),
            (NameKey::Int(a), NameKey::Int(b)) => a.cmp(b),
            (NameKey::IntPos(a), NameKey::IntPos(b)) => a.total_cmp(b),
            (NameKey::Funct(a), NameKey::Funct(b)) => a.total_cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ns.hash(state);
        self.key.rank().hash(state);
        match self.key {
            NameKey::Var { clause, addr } => {
                clause.hash(state);
                addr.to_bits().hash(state);
            }
            NameKey::Int(v) => v.hash(state),
            NameKey::Float(a)
            | NameKey::IntNeg(a)
            | NameKey::IntPos(a)
            | NameKey::Funct(a) => a.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            NameKey::Int(v) => write!(f, "{}", v),
            NameKey::Float(v) => write!(f, "{}", v),
            key => write!(f, "<{}:{:?}>", self.kind(), key),
        }
    }
}

/// Interns [`Symbol`]s and issues [`Name`]s for them.
///
/// The namespace keeps one address space per retained kind: functors,
/// variables, and out-of-range integers. The mapping is append-only; once a
/// name is issued it refers to the same symbol for the life of the
/// namespace. Variable names are additionally tagged with the current
/// clause generation: [`begin_clause`](Self::begin_clause) advances it, so
/// names of textually equal variables in different clauses never compare
/// equal while both still resolve to their text.
#[derive(Debug)]
pub struct Namespace {
    id: u32,
    clause: u32,
    vars: Treap<String>,
    functs: Treap<String>,
    ints: Treap<BigInt>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Creates an empty namespace with a fresh random identifier.
    pub fn new() -> Self {
        Self {
            id: rand::random(),
            clause: 0,
            vars: Treap::new(),
            functs: Treap::new(),
            ints: Treap::new(),
        }
    }

    /// Interns `symbol` if it has not been seen and returns its name.
    ///
    /// For any two symbols ever interned here, the ordering of the returned
    /// names agrees with the standard order of the symbols.
    pub fn name_of(&mut self, symbol: &Symbol) -> Name {
        let key = match symbol {
            Symbol::Variable(text) => NameKey::Var {
                clause: self.clause,
                addr: self.vars.address(text),
            },
            Symbol::Float(value) => NameKey::Float(normal_float(*value)),
            Symbol::Integer(value) => match value.to_i64() {
                Some(v) => NameKey::Int(v),
                None if value.sign() == num_bigint::Sign::Minus => {
                    NameKey::IntNeg(self.ints.address(value))
                }
                None => NameKey::IntPos(self.ints.address(value)),
            },
            Symbol::Functor(text) => NameKey::Funct(self.functs.address(text)),
        };
        Name { ns: self.id, key }
    }

    /// Retrieves the symbol a name refers to.
    ///
    /// # Errors
    /// [`TermError::ForeignName`] if the name was minted by another
    /// namespace; [`TermError::UnknownName`] if it carries an address this
    /// namespace never issued.
    pub fn value_of(&self, name: Name) -> Result<Symbol, TermError> {
        if name.ns != self.id {
            return Err(TermError::ForeignName(name));
        }
        match name.key {
            NameKey::Var { addr, .. } => self
                .vars
                .get(addr)
                .map(|text| Symbol::Variable(text.clone()))
                .ok_or(TermError::UnknownName(name)),
            NameKey::Float(value) => Ok(Symbol::Float(value)),
            NameKey::Int(value) => Ok(Symbol::Integer(BigInt::from(value))),
            NameKey::IntNeg(addr) | NameKey::IntPos(addr) => self
                .ints
                .get(addr)
                .map(|value| Symbol::Integer(value.clone()))
                .ok_or(TermError::UnknownName(name)),
            NameKey::Funct(addr) => self
                .functs
                .get(addr)
                .map(|text| Symbol::Functor(text.clone()))
                .ok_or(TermError::UnknownName(name)),
        }
    }

    /// The name of the neck functor `:-`.
    pub fn neck(&mut self) -> Name {
        self.name_of(&Symbol::Functor(":-".into()))
    }

    /// Starts a new clause: advances the clause generation carried by
    /// variable names, so variable identity cannot leak between clauses.
    pub fn begin_clause(&mut self) {
        self.clause = self.clause.wrapping_add(1);
    }

    /// The number of retained symbols (functors, variables, and
    /// out-of-range integers).
    pub fn len(&self) -> usize {
        self.functs.len() + self.vars.len() + self.ints.len()
    }

    /// Returns true if nothing is retained.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// Treap
// --------------------------------------------------

/// Subdivision weight for fresh addresses. An even split produces dyadic
/// fractions that spend one mantissa bit per level; an off-centre split
/// keeps entropy in the low bits, so millions of insertions fit without
/// address collisions.
const WEIGHT: f64 = 1.0 / 3.0;

/// An ordered treap assigning each value a stable fractional address in
/// `(0, 1)`. Address order agrees with value order, and random priorities
/// keep the expected depth logarithmic regardless of insertion order.
#[derive(Debug)]
struct Treap<T> {
    root: Option<Box<TreapNode<T>>>,
    len: usize,
}

#[derive(Debug)]
struct TreapNode<T> {
    value: T,
    addr: f64,
    prio: u64,
    left: Option<Box<TreapNode<T>>>,
    right: Option<Box<TreapNode<T>>>,
}

impl<T: Ord + Clone> Treap<T> {
    fn new() -> Self {
        Self { root: None, len: 0 }
    }

    fn len(&self) -> usize {
        self.len
    }

    /// Returns the address of `value`, retaining it first if it is new.
    fn address(&mut self, value: &T) -> f64 {
        let (addr, inserted) = Self::insert(&mut self.root, value, 0.0, 1.0);
        if inserted {
            self.len += 1;
        }
        addr
    }

    /// Retrieves the value retained at `addr`.
    fn get(&self, addr: f64) -> Option<&T> {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            if addr == node.addr {
                return Some(&node.value);
            }
            cur = if addr < node.addr {
                node.left.as_deref()
            } else {
                node.right.as_deref()
            };
        }
        None
    }

    fn insert(
        slot: &mut Option<Box<TreapNode<T>>>,
        value: &T,
        lo: f64,
        hi: f64,
    ) -> (f64, bool) {
        let Some(node) = slot else {
            let addr = lo * WEIGHT + hi * (1.0 - WEIGHT);
            *slot = Some(Box::new(TreapNode {
                value: value.clone(),
                addr,
                prio: rand::random(),
                left: None,
                right: None,
            }));
            return (addr, true);
        };
        match value.cmp(&node.value) {
            Ordering::Equal => (node.addr, false),
            Ordering::Less => {
                let lo_hi = node.addr;
                let res = Self::insert(&mut node.left, value, lo, lo_hi);
                if node.left.as_ref().is_some_and(|l| l.prio > node.prio) {
                    Self::rotate_right(slot);
                }
                res
            }
            Ordering::Greater => {
                let hi_lo = node.addr;
                let res = Self::insert(&mut node.right, value, hi_lo, hi);
                if node.right.as_ref().is_some_and(|r| r.prio > node.prio) {
                    Self::rotate_left(slot);
                }
                res
            }
        }
    }

    /// Lifts the left child above its parent. Addresses are fixed at
    /// insertion, so rotations only reshape the tree.
    fn rotate_right(slot: &mut Option<Box<TreapNode<T>>>) {
        if let Some(mut node) = slot.take() {
            match node.left.take() {
                Some(mut pivot) => {
                    node.left = pivot.right.take();
                    pivot.right = Some(node);
                    *slot = Some(pivot);
                }
                None => *slot = Some(node),
            }
        }
    }

    /// Lifts the right child above its parent.
    fn rotate_left(slot: &mut Option<Box<TreapNode<T>>>) {
        if let Some(mut node) = slot.take() {
            match node.right.take() {
                Some(mut pivot) => {
                    node.right = pivot.left.take();
                    pivot.left = Some(node);
                    *slot = Some(pivot);
                }
                None => *slot = Some(node),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funct(text: &str) -> Symbol {
        Symbol::Functor(text.into())
    }

    #[test]
    fn interning_is_idempotent() {
        let mut ns = Namespace::new();
        let a = ns.name_of(&funct("foo"));
        let b = ns.name_of(&funct("foo"));
        assert_eq!(a, b);
        assert_eq!(ns.len(), 1);
    }

    #[test]
    fn names_round_trip() {
        let mut ns = Namespace::new();
        for sym in [
            funct("foo"),
            funct("+"),
            Symbol::Variable("X".into()),
            Symbol::Integer(5.into()),
            Symbol::Float(0.25),
            Symbol::Integer("123456789012345678901234567890".parse().unwrap()),
        ] {
            let name = ns.name_of(&sym);
            assert_eq!(ns.value_of(name).unwrap(), sym);
        }
    }

    #[test]
    fn order_preservation() {
        let mut ns = Namespace::new();
        let mut syms = vec![
            Symbol::Variable("Abc".into()),
            Symbol::Variable("Zed".into()),
            Symbol::Float(-1.5),
            Symbol::Float(2.25),
            Symbol::Integer((-7).into()),
            Symbol::Integer(0.into()),
            Symbol::Integer("99999999999999999999999999".parse().unwrap()),
            Symbol::Integer("-99999999999999999999999999".parse().unwrap()),
            funct("alpha"),
            funct("zeta"),
            funct("=="),
        ];
        // insertion order must not matter
        syms.reverse();
        let names: Vec<(Name, Symbol)> =
            syms.iter().map(|s| (ns.name_of(s), s.clone())).collect();
        for (na, sa) in &names {
            for (nb, sb) in &names {
                assert_eq!(na.cmp(nb), sa.cmp(sb), "{sa} vs {sb}");
            }
        }
    }

    #[test]
    fn big_integers_band_correctly() {
        let mut ns = Namespace::new();
        let huge_pos: Symbol = Symbol::Integer("123456789012345678901234567890".parse().unwrap());
        let huge_neg: Symbol = Symbol::Integer("-123456789012345678901234567890".parse().unwrap());
        let small = Symbol::Integer(7.into());
        let n_pos = ns.name_of(&huge_pos);
        let n_neg = ns.name_of(&huge_neg);
        let n_small = ns.name_of(&small);
        assert!(n_neg < n_small);
        assert!(n_small < n_pos);
        assert_eq!(ns.value_of(n_pos).unwrap(), huge_pos);
    }

    #[test]
    fn variables_do_not_leak_across_clauses() {
        let mut ns = Namespace::new();
        let x1 = ns.name_of(&Symbol::Variable("X".into()));
        let y1 = ns.name_of(&Symbol::Variable("X".into()));
        assert_eq!(x1, y1);
        ns.begin_clause();
        let x2 = ns.name_of(&Symbol::Variable("X".into()));
        // same text, different clause: distinct identity, both resolve
        assert_ne!(x1, x2);
        assert_eq!(ns.value_of(x1).unwrap(), Symbol::Variable("X".into()));
        assert_eq!(ns.value_of(x2).unwrap(), Symbol::Variable("X".into()));
    }

    #[test]
    fn foreign_names_are_detected() {
        let mut ns1 = Namespace::new();
        let mut ns2 = Namespace::new();
        let a = ns1.name_of(&funct("foo"));
        let b = ns2.name_of(&funct("foo"));
        assert_ne!(a, b);
        assert!(matches!(ns2.value_of(a), Err(TermError::ForeignName(_))));
    }

    #[test]
    #[should_panic(expected = "different namespaces")]
    fn foreign_names_do_not_order() {
        let mut ns1 = Namespace::new();
        let mut ns2 = Namespace::new();
        let a = ns1.name_of(&funct("foo"));
        let b = ns2.name_of(&funct("bar"));
        let _ = a.cmp(&b);
    }

    #[test]
    fn neck_names_the_neck() {
        let mut ns = Namespace::new();
        let neck = ns.neck();
        assert_eq!(ns.value_of(neck).unwrap(), funct(":-"));
    }

    #[test]
    fn treap_addresses_survive_adversarial_insertion() {
        let mut treap: Treap<std::string::String> = Treap::new();
        let mut addrs = Vec::new();
        // ascending insertion forces the deepest right-spine intervals
        for i in 0..100_000u32 {
            let key = format!("{i:08}");
            addrs.push(treap.address(&key));
        }
        for pair in addrs.windows(2) {
            assert!(pair[0] < pair[1], "addresses must stay ordered and distinct");
        }
        // re-inserting returns the original address
        assert_eq!(treap.address(&format!("{:08}", 0)), addrs[0]);
        assert_eq!(treap.len(), 100_000);
    }
}
