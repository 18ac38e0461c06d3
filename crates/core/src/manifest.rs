//! Version manifest stored alongside the card catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which data release a catalog was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CatalogManifest {
    /// Data release or points document version, e.g. `"2.5.0"`.
    #[serde(default)]
    pub version: Option<String>,
    /// When the card data was exported.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CatalogManifest {
    /// Trim the version and drop it when nothing is left.
    pub fn normalized(self) -> Self {
        let version = self
            .version
            .map(|version| version.trim().to_string())
            .filter(|version| !version.is_empty());
        Self { version, ..self }
    }

    /// Label used in logs and listings.
    pub fn label(&self) -> String {
        match (&self.version, &self.updated_at) {
            (Some(version), Some(updated_at)) => {
                format!("{version} ({})", updated_at.format("%Y-%m-%d"))
            }
            (Some(version), None) => version.clone(),
            (None, Some(updated_at)) => format!("unversioned ({})", updated_at.format("%Y-%m-%d")),
            (None, None) => "unversioned".to_string(),
        }
    }
}
