//! Gates supplied by the surrounding application before mutating operations.

use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;

use crate::state::game::Stat;

/// Answers whether the current user may edit stats.
pub trait EditCapability: Send + Sync {
    /// Re-checked at the start of every mutating operation.
    fn may_edit(&self) -> bool;
}

/// Yes/no prompt shown before a committed stat is deleted.
pub trait DeleteConfirmation: Send + Sync {
    /// Resolve to `true` when the user confirms deleting `stat`.
    fn confirm(&self, stat: &Stat) -> BoxFuture<'static, bool>;
}

/// Capability backed by a flag that can be flipped at runtime.
#[derive(Debug, Default)]
pub struct CapabilityFlag(AtomicBool);

impl CapabilityFlag {
    /// Create the flag with an initial value.
    pub fn new(may_edit: bool) -> Self {
        Self(AtomicBool::new(may_edit))
    }

    /// Grant or revoke editing.
    pub fn set(&self, may_edit: bool) {
        self.0.store(may_edit, Ordering::SeqCst);
    }
}

impl EditCapability for CapabilityFlag {
    fn may_edit(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Confirmation that always gives the same answer, for unattended runs.
#[derive(Debug, Clone, Copy)]
pub struct AutoConfirm(pub bool);

impl DeleteConfirmation for AutoConfirm {
    fn confirm(&self, _stat: &Stat) -> BoxFuture<'static, bool> {
        let answer = self.0;
        Box::pin(async move { answer })
    }
}
