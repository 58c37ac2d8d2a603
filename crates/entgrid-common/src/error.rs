//! Engine error representation that is ergonomic **now**
//! *and* flexible enough to grow new, data-rich variants later.
//!
//! - **`EngineErrorKind`** : the canonical error taxonomy
//! - **`ErrorContext`**    : lightweight location info (parameter, class, expression)
//! - **`EngineError`**     : one struct that glues the two together
//!
//! Wildcard ambiguity is deliberately *not* a kind: an ambiguous
//! wildcard lookup resolves to nothing without raising.

use std::{error::Error, fmt};

/// All recognised engine error kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum EngineErrorKind {
    /// Parameter undefined for the given entity under a strict lookup.
    NotFound,
    /// A filter or binding names something the target class does not carry.
    BadFilter,
    /// Failure while realizing a deferred expression.
    Evaluation,
    /// Programmer error: out-of-order slice, mismatched dimensions,
    /// unknown value-type tag, malformed grammar.
    Invariant,
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotFound => "not found",
            Self::BadFilter => "bad filter",
            Self::Evaluation => "evaluation failed",
            Self::Invariant => "invariant violated",
        })
    }
}

/// Generic, lightweight metadata that *any* error may carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ErrorContext {
    /// Parameter name involved, if any.
    pub parameter: Option<String>,
    /// Class name involved, if any.
    pub class: Option<String>,
    /// Rendering of the offending expression or argument list.
    pub expression: Option<String>,
}

impl ErrorContext {
    fn is_empty(&self) -> bool {
        self.parameter.is_none() && self.class.is_none() && self.expression.is_none()
    }
}

/// The single error struct the API passes around.
///
/// * **kind**    – the mandatory taxonomy entry
/// * **message** – optional human explanation
/// * **context** – optional parameter/class/expression info
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: Option<String>,
    pub context: Option<ErrorContext>,
}

/* ───────────────────── Constructors & helpers ─────────────────────── */

impl From<EngineErrorKind> for EngineError {
    fn from(kind: EngineErrorKind) -> Self {
        Self {
            kind,
            message: None,
            context: None,
        }
    }
}

impl EngineError {
    /// Basic constructor (no message, no context).
    pub fn new(kind: EngineErrorKind) -> Self {
        kind.into()
    }

    pub fn not_found() -> Self {
        Self::new(EngineErrorKind::NotFound)
    }

    pub fn bad_filter() -> Self {
        Self::new(EngineErrorKind::BadFilter)
    }

    pub fn evaluation() -> Self {
        Self::new(EngineErrorKind::Evaluation)
    }

    pub fn invariant() -> Self {
        Self::new(EngineErrorKind::Invariant)
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Attach the parameter name involved.
    pub fn with_parameter<S: Into<String>>(mut self, parameter: S) -> Self {
        self.context
            .get_or_insert_with(ErrorContext::default)
            .parameter = Some(parameter.into());
        self
    }

    /// Attach the class name involved.
    pub fn with_class<S: Into<String>>(mut self, class: S) -> Self {
        self.context.get_or_insert_with(ErrorContext::default).class = Some(class.into());
        self
    }

    /// Attach a rendering of the offending expression.
    pub fn with_expression<S: Into<String>>(mut self, expression: S) -> Self {
        self.context
            .get_or_insert_with(ErrorContext::default)
            .expression = Some(expression.into());
        self
    }
}

/* ───────────────────────── Display / Error ────────────────────────── */

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Start with the canonical kind:
        write!(f, "{}", self.kind)?;

        // Optional human message.
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }

        // Optional context - keep it terse for logs.
        if let Some(ref ctx) = self.context {
            if ctx.is_empty() {
                return Ok(());
            }
            match (&ctx.parameter, &ctx.class) {
                (Some(p), Some(c)) => write!(f, " (parameter {p}, class {c})")?,
                (Some(p), None) => write!(f, " (parameter {p})")?,
                (None, Some(c)) => write!(f, " (class {c})")?,
                (None, None) => {}
            }
            if let Some(ref expr) = ctx.expression {
                write!(f, " [in {expr}]")?;
            }
        }

        Ok(())
    }
}

impl Error for EngineError {}

impl From<EngineError> for String {
    fn from(error: EngineError) -> Self {
        format!("{error}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let e = EngineError::not_found()
            .with_message("no value stored")
            .with_parameter("demand")
            .with_class("node");
        assert_eq!(e.kind, EngineErrorKind::NotFound);
        let shown = e.to_string();
        assert!(shown.contains("not found"));
        assert!(shown.contains("no value stored"));
        assert!(shown.contains("demand"));
        assert!(shown.contains("node"));
    }

    #[test]
    fn test_plain_kind_display() {
        let e = EngineError::invariant();
        assert_eq!(e.to_string(), "invariant violated");
    }
}
