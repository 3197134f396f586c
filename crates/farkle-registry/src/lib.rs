//! Session registry for the Farkle server.
//!
//! Maps game codes to live sessions and evicts finished ones once their
//! retention window has passed.
//!
//! # Locking
//!
//! One lock guards the code → session map; each session has its own lock.
//! The map lock is only ever taken *before* a session lock (create,
//! sweep), never while one is held, so the two can't deadlock.
//!
//! # Key types
//!
//! - [`Registry`]: create / join / find / discard / sweep
//! - [`Seated`]: the result of a create or join, still holding the session lock
//! - [`RegistryConfig`]: code shape, retention, sweep interval

mod config;
mod error;
mod reaper;
mod registry;

pub use config::{RegistryConfig, DEFAULT_CODE_ALPHABET};
pub use error::RegistryError;
pub use registry::{Registry, Seated, SharedSession};
