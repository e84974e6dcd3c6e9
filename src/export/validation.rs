/// What to do about a model validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationDecision {
    /// Record the failure and keep building.
    Ignore,
    /// Abort the build.
    Abort,
}

/// Decides, per failure, whether model validation failures abort a build.
///
/// Any `FnMut(&str) -> ValidationDecision` closure is a handler.
pub trait ValidationFailureHandler {
    /// Called once for every validation failure found while building.
    fn on_failure(&mut self, message: &str) -> ValidationDecision;
}

impl<F> ValidationFailureHandler for F
where
    F: FnMut(&str) -> ValidationDecision,
{
    fn on_failure(&mut self, message: &str) -> ValidationDecision {
        self(message)
    }
}

/// Ignores every failure; they are reported with the build output.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreViolations;

impl ValidationFailureHandler for IgnoreViolations {
    fn on_failure(&mut self, _message: &str) -> ValidationDecision {
        ValidationDecision::Ignore
    }
}

/// Aborts on the first failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbortOnViolation;

impl ValidationFailureHandler for AbortOnViolation {
    fn on_failure(&mut self, _message: &str) -> ValidationDecision {
        ValidationDecision::Abort
    }
}
