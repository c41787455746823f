//! The error hierarchy shared by every component of the core (spec §7).
//!
//! Per-candidate and per-spectrum errors are always caught by the caller and
//! translated into a skip; only [`ErrorKind::Fatal`] is meant to propagate
//! out of the pipeline entirely.

use context_error::{BasicKind, BoxedError, Context, CreateError};

/// The single error type used across the crate. A thin wrapper around
/// [`context_error::BoxedError`] so every component gets the same rich,
/// contextual diagnostics without inventing a bespoke error enum per module.
pub type CoreError = BoxedError<'static, BasicKind>;

/// The four error kinds named in the spec. This is not the `kind` carried by
/// [`CoreError`] itself (that stays `BasicKind`, matching the rest of the
/// teacher codebase) but a classification used by callers to decide how to
/// react: [`Self::InvalidInput`] and [`Self::Fatal`] abort the enclosing
/// scope, [`Self::NumericLimit`] and [`Self::EmptyCandidate`] are informational.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Unsorted spectrum, out-of-range configuration parameter.
    InvalidInput,
    /// `CumBinom` clamp was triggered; informational, not a failure.
    NumericLimit,
    /// No cross-link species survived precursor tolerance for a spectrum.
    EmptyCandidate,
    /// Process-wide failure (I/O, configuration parsing) delegated to a collaborator.
    Fatal,
}

impl ErrorKind {
    const fn title(self) -> &'static str {
        match self {
            Self::InvalidInput => "Invalid input",
            Self::NumericLimit => "Numeric limit reached",
            Self::EmptyCandidate => "No candidates within tolerance",
            Self::Fatal => "Fatal error",
        }
    }
}

/// Build a [`CoreError`] of the given [`ErrorKind`] with a free-form message.
pub fn core_error(kind: ErrorKind, message: impl Into<String>) -> CoreError {
    BoxedError::new(BasicKind::Error, kind.title(), message.into(), Context::none())
}

/// Shorthand for [`ErrorKind::InvalidInput`].
pub fn invalid_input(message: impl Into<String>) -> CoreError {
    core_error(ErrorKind::InvalidInput, message)
}

/// Shorthand for [`ErrorKind::NumericLimit`].
pub fn numeric_limit(message: impl Into<String>) -> CoreError {
    core_error(ErrorKind::NumericLimit, message)
}

/// Shorthand for [`ErrorKind::EmptyCandidate`].
pub fn empty_candidate(message: impl Into<String>) -> CoreError {
    core_error(ErrorKind::EmptyCandidate, message)
}

/// Shorthand for [`ErrorKind::Fatal`].
pub fn fatal(message: impl Into<String>) -> CoreError {
    core_error(ErrorKind::Fatal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_distinct() {
        let kinds = [
            ErrorKind::InvalidInput,
            ErrorKind::NumericLimit,
            ErrorKind::EmptyCandidate,
            ErrorKind::Fatal,
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a.title(), b.title());
            }
        }
    }

    #[test]
    fn builds_an_error() {
        let err = invalid_input("spectrum is not sorted by m/z");
        assert!(err.to_string().contains("spectrum is not sorted"));
    }
}
