//! In-memory session storage with per-session TTLs.
//!
//! Sessions are opaque-id key/value bags held in a concurrent map. Expiry is
//! lazy (checked on lookup) with an optional background sweeper so abandoned
//! entries do not accumulate.

pub mod store;

pub use store::{Session, SessionStore};
