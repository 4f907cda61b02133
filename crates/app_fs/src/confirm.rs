//! Confirmation port called before mutating operations commit

/// Asks the user (or a policy) whether an operation may proceed
pub trait Confirm: Send + Sync {
    /// `prompt` describes the pending change, usually the target path
    fn confirm(&self, prompt: &str) -> bool;
}

/// Approves everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-approved: {}", prompt);
        true
    }
}

/// Declines everything
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoDecline;

impl Confirm for AutoDecline {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Auto-declined: {}", prompt);
        false
    }
}
