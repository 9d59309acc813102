//! YAML-backed username directory
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0

use anyhow::Result;
use log::{error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::RecipientDirectory;

#[derive(Debug, Clone, Deserialize, Serialize)]
struct DirectoryFile {
    users: Vec<DirectoryEntry>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct DirectoryEntry {
    username: String,
    address: String,
}

/// In-memory username -> address map, loaded once at startup. Lookups are
/// exact and case-sensitive.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    entries: HashMap<String, String>,
}

impl StaticDirectory {
    /// Load the directory from a YAML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load, but degrade to an empty directory when the file is missing or
    /// broken. Every lookup then comes back unresolved, which the resolver
    /// already tolerates.
    pub fn load_or_empty(path: &str) -> Self {
        match Self::load(path) {
            Ok(directory) => directory,
            Err(e) => {
                if std::path::Path::new(path).exists() {
                    error!("failed to load recipient directory {path}: {e}");
                } else {
                    warn!("no recipient directory at {path}, lookups will not resolve");
                }
                Self::default()
            }
        }
    }

    /// Parse directory contents from a YAML string.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let file: DirectoryFile = serde_yaml::from_str(contents)?;
        Ok(Self::from_entries(
            file.users.into_iter().map(|e| (e.username, e.address)),
        ))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        StaticDirectory {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecipientDirectory for StaticDirectory {
    fn lookup(&self, username: &str) -> Option<String> {
        self.entries.get(username).cloned()
    }
}
