//! Destinations for non-fatal diagnostics.

use fngraph_types::{Diagnostic, Severity};
use tracing::{error, warn};

pub trait DiagnosticsSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Collects diagnostics for the caller.
impl DiagnosticsSink for Vec<Diagnostic> {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.push(diagnostic);
    }
}

/// Forwards diagnostics to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(code = %diagnostic.code, "{diagnostic}"),
            Severity::Error => error!(code = %diagnostic.code, "{diagnostic}"),
        }
    }
}
