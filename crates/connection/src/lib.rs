//! # Namematch Connection
//!
//! The two-party match reconciliation engine.
//!
//! ## Flow
//!
//! ```text
//! Device A                         Remote store                  Device B
//!     │  create (snapshot likes)       │                             │
//!     ├───────────────────────────────>│   join code (snapshot)      │
//!     │                                │<────────────────────────────┤
//!     │  like/unlike ──> read-modify-reconcile-write (versioned)     │
//!     │                                │                             │
//!     └── subscribe ──> feed of Option<Connection> <── subscribe ────┘
//! ```
//!
//! Matches are claims present in both pending sets; reconciliation moves them
//! into the shared matched set, where each side tracks its own read flag.

mod claim;
mod code;
mod document;
mod engine;
mod error;
mod json;
mod memory;
mod remote;

pub use claim::{LikedClaim, Side};
pub use code::{generate_code, now_epoch_millis, CODE_SUFFIX_DIGITS};
pub use document::{Connection, ToggleEffect};
pub use engine::{
    ConnectionDeps, ConnectionEngine, JoinOutcome, LinkState, WatchSession,
    DEFAULT_EXISTENCE_TIMEOUT,
};
pub use error::{ConnectionError, Result};
pub use json::JsonConnectionStore;
pub use memory::MemoryConnectionStore;
pub use remote::{collection_name, ConnectionFeed, ConnectionStore, CreateOutcome, PutOutcome};
