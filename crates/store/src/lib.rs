//! # Namematch Store
//!
//! Local durable state: the seen-name store (every swipe decision ever made
//! on this device) and the preference store (filter selections, sort order,
//! device identity, last-known-connection pointer).
//!
//! Both gateways are traits so the engine never depends on the backing
//! mechanics; the bundled implementations persist a JSON document per store
//! and commit the whole file on every mutation.

mod error;
mod prefs;
mod seen;

pub use error::{Result, StoreError};
pub use prefs::{JsonPreferences, Preferences, PreferencesExt};
pub use seen::{split_history_by_gender, JsonSeenStore, SeenStore};
