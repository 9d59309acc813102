//! # Recipients Feature
//!
//! Maps display usernames to delivery addresses. Resolution is batch and
//! best-effort: the resolver reports which names resolved and which did
//! not, and callers decide what to do about the misses.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

pub mod directory;

pub use directory::StaticDirectory;

/// A username -> address lookup source.
pub trait RecipientDirectory: Send + Sync {
    fn lookup(&self, username: &str) -> Option<String>;
}

/// Outcome of a batch resolution. `resolved` keeps input order and passes
/// duplicates through; `unresolved` holds the names that had no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub resolved: Vec<String>,
    pub unresolved: Vec<String>,
}

impl Resolution {
    pub fn is_partial(&self) -> bool {
        !self.unresolved.is_empty()
    }
}

/// Resolve every username against the directory.
pub fn resolve(directory: &dyn RecipientDirectory, usernames: &[String]) -> Resolution {
    let mut resolution = Resolution::default();
    for name in usernames {
        match directory.lookup(name) {
            Some(address) => resolution.resolved.push(address),
            None => resolution.unresolved.push(name.clone()),
        }
    }
    resolution
}
