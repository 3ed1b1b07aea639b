//! Symbol kinds and literal symbol values.
//!
//! A [`Symbol`] is a literal as the lexer saw it: a functor text, a number,
//! or a variable name. Symbols are ordered by the standard order of terms
//! and are interned into a [`Namespace`](crate::Namespace), which issues
//! compact [`Name`](crate::Name) handles for them.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use smartstring::alias::String;
use std::cmp::Ordering;
use std::fmt;

/// The Prolog type of a [`Symbol`].
///
/// Variants are declared in the standard order of terms, so the derived
/// ordering is the one used for term comparison:
/// `Variable < Float < Integer < Functor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum SymbolKind {
    /// A logic variable.
    Variable = 0,
    /// A floating point number.
    Float = 1,
    /// An arbitrary-precision integer.
    Integer = 2,
    /// A function symbol.
    Functor = 3,
}

impl SymbolKind {
    /// The total number of kinds.
    pub const COUNT: usize = 4;

    /// Canonical lowercase names, in declaration order.
    pub const STRS: &[&str] = &["variable", "float", "integer", "functor"];
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(Self::STRS[*self as usize])
    }
}

/// A literal symbol of a Prolog program.
///
/// Functor texts are either bare identifiers, runs of symbolic characters,
/// the cut `!`, the comma `,`, or the unescaped content of a quoted atom.
/// Variable texts begin with an uppercase letter or an underscore.
///
/// Floats are kept *normalised*: a numeric literal is first converted to an
/// exact rational, integral values become [`Symbol::Integer`], and all other
/// values round to the nearest IEEE-754 double. Two float literals denote
/// the same symbol iff they round to the same double.
#[derive(Debug, Clone)]
pub enum Symbol {
    Variable(String),
    Float(f64),
    Integer(BigInt),
    Functor(String),
}

impl Symbol {
    /// Returns the kind of this symbol.
    pub fn kind(&self) -> SymbolKind {
        match self {
            Symbol::Variable(_) => SymbolKind::Variable,
            Symbol::Float(_) => SymbolKind::Float,
            Symbol::Integer(_) => SymbolKind::Integer,
            Symbol::Functor(_) => SymbolKind::Functor,
        }
    }

    /// Parses a numeric literal in Prolog syntax: decimal digits, an
    /// optional fraction, and an optional exponent, with an optional
    /// leading minus. The literal is evaluated exactly; integral values
    /// yield [`Symbol::Integer`] and everything else a normalised
    /// [`Symbol::Float`].
    ///
    /// Returns `None` if `text` is not a well-formed numeral.
    pub fn parse_number(text: &str) -> Option<Symbol> {
        let mut chars = text.chars().peekable();
        let mut mantissa = std::string::String::with_capacity(text.len());
        let mut scale = 0i64;
        let mut exponent = 0i64;

        if chars.peek() == Some(&'-') {
            mantissa.push('-');
            chars.next();
        }

        let mut any = false;
        while let Some(c) = chars.peek().filter(|c| c.is_ascii_digit()) {
            mantissa.push(*c);
            any = true;
            chars.next();
        }
        if !any {
            return None;
        }

        if chars.peek() == Some(&'.') {
            chars.next();
            let mut any = false;
            while let Some(c) = chars.peek().filter(|c| c.is_ascii_digit()) {
                mantissa.push(*c);
                scale += 1;
                any = true;
                chars.next();
            }
            if !any {
                return None;
            }
        }

        if matches!(chars.peek(), Some('e') | Some('E')) {
            chars.next();
            let negative = match chars.peek() {
                Some('-') => {
                    chars.next();
                    true
                }
                Some('+') => {
                    chars.next();
                    false
                }
                _ => false,
            };
            let mut digits = std::string::String::new();
            while let Some(c) = chars.peek().filter(|c| c.is_ascii_digit()) {
                digits.push(*c);
                chars.next();
            }
            exponent = digits.parse().ok()?;
            if negative {
                exponent = -exponent;
            }
        }

        if chars.next().is_some() {
            return None;
        }

        let mantissa: BigInt = mantissa.parse().ok()?;
        let shift = exponent - scale;
        let value = if shift >= 0 {
            let factor = num_traits::pow(BigInt::from(10), shift as usize);
            BigRational::from_integer(mantissa * factor)
        } else {
            let factor = num_traits::pow(BigInt::from(10), (-shift) as usize);
            BigRational::new(mantissa, factor)
        };

        if value.is_integer() {
            Some(Symbol::Integer(value.to_integer()))
        } else {
            Some(Symbol::Float(normal_float(value.to_f64()?)))
        }
    }
}

/// Collapses the two IEEE zeros so float symbols have a single identity.
pub(crate) fn normal_float(f: f64) -> f64 {
    if f == 0.0 { 0.0 } else { f }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Symbol {}

impl PartialOrd for Symbol {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Symbol {
    /// The standard order of terms: kinds first, then text for functors and
    /// variables, numeric value for integers and floats.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Symbol::Variable(a), Symbol::Variable(b)) => a.cmp(b),
            (Symbol::Float(a), Symbol::Float(b)) => {
                normal_float(*a).total_cmp(&normal_float(*b))
            }
            (Symbol::Integer(a), Symbol::Integer(b)) => a.cmp(b),
            (Symbol::Functor(a), Symbol::Functor(b)) => a.cmp(b),
            _ => self.kind().cmp(&other.kind()),
        }
    }
}

impl fmt::Display for Symbol {
    /// Canonical text of the symbol: the functor or variable text verbatim,
    /// decimal digits for numbers.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Variable(name) => f.write_str(name),
            Symbol::Float(v) => write!(f, "{}", v),
            Symbol::Integer(v) => write!(f, "{}", v),
            Symbol::Functor(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_standard_order() {
        assert!(SymbolKind::Variable < SymbolKind::Float);
        assert!(SymbolKind::Float < SymbolKind::Integer);
        assert!(SymbolKind::Integer < SymbolKind::Functor);
        assert_eq!(SymbolKind::STRS.len(), SymbolKind::COUNT);
    }

    #[test]
    fn parse_integers() {
        assert_eq!(
            Symbol::parse_number("123"),
            Some(Symbol::Integer(BigInt::from(123)))
        );
        assert_eq!(
            Symbol::parse_number("-42"),
            Some(Symbol::Integer(BigInt::from(-42)))
        );
        // an integral value is an integer regardless of spelling
        assert_eq!(
            Symbol::parse_number("1.5e1"),
            Some(Symbol::Integer(BigInt::from(15)))
        );
        assert_eq!(
            Symbol::parse_number("1e3"),
            Some(Symbol::Integer(BigInt::from(1000)))
        );
    }

    #[test]
    fn parse_floats() {
        assert_eq!(Symbol::parse_number("0.5"), Some(Symbol::Float(0.5)));
        assert_eq!(Symbol::parse_number("456.789"), Some(Symbol::Float(456.789)));
        assert_eq!(Symbol::parse_number("1e-1"), Some(Symbol::Float(0.1)));
        assert_eq!(Symbol::parse_number("-1.23"), Some(Symbol::Float(-1.23)));
    }

    #[test]
    fn exponents_that_shift_out_the_fraction_are_integers() {
        let digits = format!("8765{}", "0".repeat(40));
        assert_eq!(
            Symbol::parse_number("8.765e43"),
            Some(Symbol::Integer(digits.parse().unwrap()))
        );
    }

    #[test]
    fn parse_huge_integer_is_exact() {
        let sym = Symbol::parse_number("123456789012345678901234567890").unwrap();
        match sym {
            Symbol::Integer(v) => {
                assert_eq!(v.to_string(), "123456789012345678901234567890");
            }
            other => panic!("expected integer, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        assert_eq!(Symbol::parse_number(""), None);
        assert_eq!(Symbol::parse_number("abc"), None);
        assert_eq!(Symbol::parse_number("1."), None);
        assert_eq!(Symbol::parse_number("1.2.3"), None);
    }

    #[test]
    fn standard_order_across_kinds() {
        let var = Symbol::Variable("X".into());
        let float = Symbol::Float(9.9);
        let int = Symbol::Integer(BigInt::from(-1));
        let funct = Symbol::Functor("a".into());
        assert!(var < float);
        assert!(float < int);
        assert!(int < funct);
    }

    #[test]
    fn order_within_kinds() {
        assert!(Symbol::Functor("bar".into()) < Symbol::Functor("foo".into()));
        assert!(Symbol::Variable("A".into()) < Symbol::Variable("B".into()));
        assert!(Symbol::Integer(BigInt::from(1)) < Symbol::Integer(BigInt::from(2)));
        assert!(Symbol::Float(-0.5) < Symbol::Float(0.5));
        assert_eq!(Symbol::Float(0.0), Symbol::Float(-0.0));
    }
}
