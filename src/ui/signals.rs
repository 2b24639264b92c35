//! Interrupt handling for batch runs.
//!
//! A [`CancelToken`] is shared by the batch loop and the parser. The batch
//! checks it between documents and the parser between container members, so
//! an interrupted archive stops without rendering its remaining members.

use crate::error::{ParseError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cloneable cancellation flag. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark as cancelled. Returns whether it already was.
    pub fn cancel(&self) -> bool {
        self.cancelled.swap(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancelled.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(ParseError::Cancelled);
        }
        Ok(())
    }
}

/// Route Ctrl+C to `token`. The first interrupt lets the current member
/// finish; the second exits with status 130.
pub fn install_interrupt_handler(token: &CancelToken) -> Result<()> {
    let token = token.clone();
    ctrlc::set_handler(move || {
        if token.cancel() {
            eprintln!("\n💀 Interrupted again, exiting");
            std::process::exit(130);
        }
        eprintln!("\n🛑 Stopping after the current document member (Ctrl+C again exits now)");
    })
    .map_err(|e| ParseError::Config {
        message: format!("Failed to install interrupt handler: {}", e),
    })
}
