//! # referral-engine: Use-Case Pipelines
//!
//! Orchestration layer of the referral discount engine. Everything here is
//! sequencing: decisions live in `referral-core`, SQL in `referral-db`, and
//! this crate wires them together with the email capability.
//!
//! ## Pipelines
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        referral-engine                              │
//! │                                                                     │
//! │  send_discount:                                                     │
//! │   ┌──────────┐   ┌─────────┐   ┌──────────────────────────────┐    │
//! │   │ validate │──►│ compute │──►│ persist: referrer ► email ►  │    │
//! │   │ (6 gates)│   │ (pure)  │   │          mark sent           │    │
//! │   └──────────┘   └─────────┘   └──────────────────────────────┘    │
//! │                                                                     │
//! │  reset_discount:  find sent tx ► reset flags ► correction email    │
//! │  list_discounts:  group by referrer ► derive levels ► split rows   │
//! │  delete:          remove tx ► recompute referrer from base price   │
//! │                                                                     │
//! │  Capabilities injected at construction:                             │
//! │   Notifier (email transport)    EmailTemplates (content)           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`service`] - [`DiscountEngine`] facade and wire DTOs
//! - [`validate`] - ordered precondition gates for a send
//! - [`compute`] - pure assembly of email + update payloads
//! - [`persist`] - the referrer-first write sequence
//! - [`reset`] - sent → pending transition with correction email
//! - [`list`] - display rows with derived bonus levels; delete + recompute
//! - [`notifier`] - the async email transport seam
//! - [`templates`] - notification content rendering
//! - [`error`] - the engine error type

// =============================================================================
// Module Declarations
// =============================================================================

pub mod compute;
pub mod error;
pub mod list;
pub mod notifier;
pub mod persist;
pub mod reset;
pub mod service;
pub mod templates;
pub mod validate;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{EngineError, EngineResult};
pub use notifier::{EmailMessage, LogNotifier, Notifier};
pub use service::DiscountEngine;
pub use templates::{DefaultTemplates, EmailTemplates};

use std::time::Duration;

// =============================================================================
// Engine Configuration
// =============================================================================

/// Tunables for the pipelines.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on a single notification attempt. A notifier that hangs
    /// past this is treated as failed; the transaction stays unsent.
    pub notify_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            notify_timeout: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Sets the notification timeout.
    pub fn notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }
}
