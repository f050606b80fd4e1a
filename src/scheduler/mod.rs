//! Background reconciliation of pending verifications.

pub mod reconciler;

pub use reconciler::Reconciler;
