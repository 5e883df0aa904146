use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The language-neutral condition operator alphabet.
///
/// A finite dispatch table rather than the source's dynamically-built and
/// `exec`'d comparison expression (see `DESIGN.md`): `apply` takes an already
/// computed [`Ordering`] (or a numeric-parse failure) and returns the boolean
/// result, so there is no code path that interprets operand text as code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
}

/// Returned when a condition's `evaluationOperator` is not one of the six
/// recognized tokens. Per the evaluator's contract this is not a hard error —
/// it just forces the trigger verdict to `false` — but the type lets callers
/// express that case distinctly from a successful parse.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized evaluation operator: {0}")]
pub struct ParseOperatorError(pub String);

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            ">=" => Ok(Self::Ge),
            ">" => Ok(Self::Gt),
            other => Err(ParseOperatorError(other.to_owned())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Ge => ">=",
            Self::Gt => ">",
        };
        f.write_str(s)
    }
}

impl Operator {
    /// Apply this operator to a pre-computed [`Ordering`] between two operands.
    #[must_use]
    pub fn apply(self, ordering: Ordering) -> bool {
        match self {
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Ge => ordering != Ordering::Less,
            Self::Gt => ordering == Ordering::Greater,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_six_tokens() {
        assert_eq!("<".parse(), Ok(Operator::Lt));
        assert_eq!("<=".parse(), Ok(Operator::Le));
        assert_eq!("==".parse(), Ok(Operator::Eq));
        assert_eq!("!=".parse(), Ok(Operator::Ne));
        assert_eq!(">=".parse(), Ok(Operator::Ge));
        assert_eq!(">".parse(), Ok(Operator::Gt));
    }

    #[test]
    fn rejects_unknown_token() {
        let err = "=~".parse::<Operator>().unwrap_err();
        assert_eq!(err, ParseOperatorError("=~".to_owned()));
    }

    #[test]
    fn apply_matches_ordering_semantics() {
        assert!(Operator::Lt.apply(Ordering::Less));
        assert!(!Operator::Lt.apply(Ordering::Equal));
        assert!(Operator::Le.apply(Ordering::Equal));
        assert!(Operator::Ge.apply(Ordering::Greater));
        assert!(Operator::Ne.apply(Ordering::Less));
        assert!(!Operator::Eq.apply(Ordering::Greater));
    }

    #[test]
    fn display_round_trips_through_parse() {
        for op in [
            Operator::Lt,
            Operator::Le,
            Operator::Eq,
            Operator::Ne,
            Operator::Ge,
            Operator::Gt,
        ] {
            let s = op.to_string();
            assert_eq!(s.parse::<Operator>().unwrap(), op);
        }
    }
}
