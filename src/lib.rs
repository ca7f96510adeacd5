pub mod applier;
pub mod changer;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod lister;
pub mod store;
pub mod watcher;

pub use applier::*;
pub use changer::*;
pub use crate::core::*;
pub use error::*;
pub use filter::*;
pub use lister::*;
pub use store::*;
pub use watcher::*;
