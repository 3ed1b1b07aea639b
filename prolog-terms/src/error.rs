//! Defines [`TermError`], the unified error type for term operations.

use crate::Name;
use smartstring::alias::String;
use thiserror::Error;

/// Represents all possible errors that can occur in the term layer.
///
/// [`TermError`] provides a single error surface for namespace lookups and
/// operator-table updates. Callers can match on the variant or propagate
/// with `?`.
#[derive(Debug, Clone, Error)]
pub enum TermError {
    /// The name refers to a symbol this namespace no longer retains.
    #[error("unknown name {0}")]
    UnknownName(Name),

    /// The name was minted by a different namespace.
    #[error("name {0} belongs to a different namespace")]
    ForeignName(Name),

    /// Operator precedence outside `1..=1200`.
    #[error("operator precedence {0} out of range 1..=1200")]
    PrecedenceRange(i64),

    /// Not a recognised operator class.
    #[error("invalid operator class: {0}")]
    InvalidClass(String),

    /// A clause that was expected to be an `op/3` directive is not one.
    #[error("not an op/3 directive")]
    NotADirective,
}
