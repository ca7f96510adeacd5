//! Core engine
//!
//! Contains the folder index, the rotation scheduler and the event plumbing

pub mod events;
pub mod index;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types
pub use events::{ChangerEvent, Notifier, PhotoFile, PhotoFolder};
pub use index::{FolderIndex, Reconciliation};
pub use scheduler::{Epoch, RotationScheduler, RotationState};
