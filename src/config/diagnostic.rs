//! Startup diagnostics collected while loading configuration.
//!
//! Loading never aborts on its own: every problem is recorded with a severity
//! and the bootstrap decides what to do after logging all of them.

use std::fmt;

/// Severity of a startup diagnostic, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Panic,
}

impl Severity {
    /// Fatal and panic diagnostics prevent the server from starting.
    pub fn is_fatal(&self) -> bool {
        *self >= Severity::Fatal
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Debug => "debug",
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
            Severity::Panic => "panic",
        };
        f.write_str(name)
    }
}

/// A single message produced during configuration loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, message)
    }

    /// Emits the diagnostic through `tracing` at the matching level.
    pub fn log(&self) {
        let message = self.message.as_str();
        match self.severity {
            Severity::Debug => tracing::debug!("{message}"),
            Severity::Info => tracing::info!("{message}"),
            Severity::Warn => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
            Severity::Fatal | Severity::Panic => {
                tracing::error!(severity = %self.severity, "{message}")
            }
        }
    }
}

/// Number of diagnostics that must abort startup.
pub fn fatal_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.severity.is_fatal()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_fatal_and_panic_abort() {
        assert!(!Severity::Error.is_fatal());
        assert!(Severity::Fatal.is_fatal());
        assert!(Severity::Panic.is_fatal());

        let mut diagnostics = vec![Diagnostic::info("a"), Diagnostic::warn("b")];
        assert_eq!(fatal_count(&diagnostics), 0);
        diagnostics.push(Diagnostic::new(Severity::Panic, "c"));
        diagnostics.push(Diagnostic::fatal("d"));
        assert_eq!(fatal_count(&diagnostics), 2);
    }
}
