#![forbid(unsafe_code)]

//! Core domain model and business logic for Petpal, a virtual pet shared
//! by a couple.
//!
//! This crate provides:
//! - Domain types (couples, pets, stats, action records)
//! - Catalog of pet and action types
//! - Time-based decay, leveling and the action resolver
//! - Persistence (in-memory and file-backed stores with an action WAL)
//! - The engine tying them together, plus boundary JSON responses

pub mod types;
pub mod error;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod clock;
pub mod decay;
pub mod leveling;
pub mod resolver;
pub mod store;
pub mod history;
pub mod response;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, ErrorKind, Result};
pub use types::*;
pub use catalog::{build_default_catalog, get_default_catalog};
pub use config::Config;
pub use clock::{Clock, DefaultClock, FixedClock, SharedClock};
pub use leveling::{level_for, LevelProgress};
pub use store::{FileStore, MemoryStore, PetStore, PetWrite};
pub use engine::{ActionOutcome, PetEngine, UserStatus};
