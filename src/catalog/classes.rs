//! Class Registry
//!
//! The ordered list of food labels the model can emit. The position of a
//! label in the registry is the index of the matching score in the model's
//! output vector, so order is preserved exactly as read from disk.

use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::utils::error::{FoodVisionError, Result, ResultExt};

/// Label used when no class names could be loaded
pub const SENTINEL_LABEL: &str = "Unknown";

/// Ordered, index-addressable set of class labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassRegistry {
    labels: Vec<String>,
}

impl ClassRegistry {
    /// Build a registry from already-parsed labels
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// The degraded registry holding only the sentinel label
    pub fn sentinel() -> Self {
        Self::from_labels([SENTINEL_LABEL])
    }

    /// Parse newline-delimited class names
    ///
    /// Entries are trimmed and blank lines dropped. Fails with a
    /// configuration error when nothing usable remains.
    pub fn parse(contents: &str) -> Result<Self> {
        let labels: Vec<String> = contents
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if labels.is_empty() {
            return Err(FoodVisionError::Configuration(
                "class name list contains no entries".to_string(),
            ));
        }

        Ok(Self { labels })
    }

    /// Read the class-name file strictly
    pub fn try_load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context_as(FoodVisionError::Configuration, || {
            format!("cannot read class names from {:?}", path)
        })?;
        Self::parse(&contents)
    }

    /// Read the class-name file, degrading to the sentinel registry on failure
    ///
    /// A missing or empty class list keeps the service alive with a single
    /// `"Unknown"` class instead of aborting startup.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(registry) => {
                info!("Loaded {} class names from {:?}", registry.len(), path);
                registry
            }
            Err(e) => {
                warn!("{}; falling back to sentinel class '{}'", e, SENTINEL_LABEL);
                Self::sentinel()
            }
        }
    }

    /// Label at `index`, if the registry has one
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label at `index`, or a synthetic `Class_<index>` when out of range
    pub fn resolve(&self, index: usize) -> String {
        self.get(index)
            .map(str::to_string)
            .unwrap_or_else(|| format!("Class_{}", index))
    }

    /// Whether this registry is the degraded sentinel fallback
    pub fn is_sentinel(&self) -> bool {
        self.labels.len() == 1 && self.labels[0] == SENTINEL_LABEL
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}
