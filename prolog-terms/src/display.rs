//! Defines [`ClauseDisplay`], the canonical formatter for clauses.
//!
//! The canonical form is purely compositional: a name renders as its text
//! and a compound renders as `NAME(A1,A2,…,An)` with no spaces. List and
//! operator sugar is never reintroduced.

use crate::{Clause, Namespace, Subterm};
use std::fmt;

/// Ties a [`Clause`] to the [`Namespace`] holding its names so the clause
/// can be rendered with [`fmt::Display`].
///
/// ```ignore
/// println!("{}", clause.display(&namespace));
/// ```
pub struct ClauseDisplay<'a> {
    clause: &'a Clause,
    ns: &'a Namespace,
}

impl Clause {
    /// Returns a [`ClauseDisplay`] rendering this clause canonically.
    pub fn display<'a>(&'a self, ns: &'a Namespace) -> ClauseDisplay<'a> {
        ClauseDisplay { clause: self, ns }
    }
}

impl fmt::Display for ClauseDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_term(
            f: &mut fmt::Formatter<'_>,
            clause: &Clause,
            ns: &Namespace,
            t: &Subterm,
        ) -> fmt::Result {
            let symbol = ns.value_of(t.name).map_err(|_| fmt::Error)?;
            write!(f, "{}", symbol)?;
            if t.arity == 0 {
                return Ok(());
            }
            f.write_str("(")?;
            for (i, arg) in clause.args(t).iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                write_term(f, clause, ns, arg)?;
            }
            f.write_str(")")
        }

        write_term(f, self.clause, self.ns, &self.clause.root())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Namespace, Symbol};

    #[test]
    fn canonical_form_is_compositional() {
        let mut ns = Namespace::new();
        let bar = Subterm::atomic(ns.name_of(&Symbol::Functor("bar".into())));
        let baz = Subterm::atomic(ns.name_of(&Symbol::Variable("Baz".into())));
        let foo = ns.name_of(&Symbol::Functor("foo".into()));
        let clause = Clause::from(vec![bar, baz, Subterm::compound(foo, 2, 0)]);
        assert_eq!(clause.display(&ns).to_string(), "foo(bar,Baz)");
    }

    #[test]
    fn numbers_render_by_value() {
        let mut ns = Namespace::new();
        let one = Subterm::atomic(ns.name_of(&Symbol::Integer(1.into())));
        let half = Subterm::atomic(ns.name_of(&Symbol::Float(0.5)));
        let plus = ns.name_of(&Symbol::Functor("+".into()));
        let clause = Clause::from(vec![one, half, Subterm::compound(plus, 2, 0)]);
        assert_eq!(clause.display(&ns).to_string(), "+(1,0.5)");
    }
}
