//! Guard that deletes a sandbox when it goes out of scope.

use std::ops::{Deref, DerefMut};

use sandboxai_core::Result;

use crate::handle::Sandbox;

/// A [`Sandbox`] that is deleted when the guard is dropped.
///
/// Drop cannot report failures, so a failed delete is only logged. Call
/// [`close`](Self::close) to delete explicitly and get the error back.
pub struct ScopedSandbox {
    sandbox: Sandbox,
    closed: bool,
}

impl ScopedSandbox {
    pub(crate) fn new(sandbox: Sandbox) -> Self {
        Self {
            sandbox,
            closed: false,
        }
    }

    /// Delete the sandbox now. Dropping the guard afterwards does nothing.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.sandbox.delete()
    }
}

impl Deref for ScopedSandbox {
    type Target = Sandbox;

    fn deref(&self) -> &Sandbox {
        &self.sandbox
    }
}

impl DerefMut for ScopedSandbox {
    fn deref_mut(&mut self) -> &mut Sandbox {
        &mut self.sandbox
    }
}

impl Drop for ScopedSandbox {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.sandbox.delete() {
            tracing::error!(
                space = %self.sandbox.space(),
                name = %self.sandbox.name(),
                error = %e,
                "Failed to delete sandbox on scope exit"
            );
        }
    }
}
