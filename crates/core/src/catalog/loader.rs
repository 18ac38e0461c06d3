use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    manifest::CatalogManifest,
    models::{Pilot, Ship, Upgrade},
};

use super::{Catalog, CatalogBuilder};

const MANIFEST_FILE: &str = "manifest.json";
const SHIPS_DIR: &str = "ships";
const PILOTS_DIR: &str = "pilots";
const UPGRADES_DIR: &str = "upgrades";

/// Loads a [`Catalog`] from a directory of JSON card files.
///
/// ```text
/// <root>/manifest.json      optional version metadata
/// <root>/ships/**/*.json    one ship or an array of ships per file
/// <root>/pilots/**/*.json
/// <root>/upgrades/**/*.json
/// ```
///
/// Files are read in file name order so listings are stable between runs.
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    root: PathBuf,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(records) => records,
            OneOrMany::One(record) => vec![record],
        }
    }
}

impl CatalogLoader {
    /// Loader for the catalog rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Catalog directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read every card file and build the catalog.
    pub fn load(&self) -> Result<Catalog> {
        if !self.root.is_dir() {
            bail!("catalog directory {} does not exist", self.root.display());
        }

        let manifest = read_manifest(&self.root.join(MANIFEST_FILE))?;
        let label = manifest.label();
        let mut builder = CatalogBuilder::default().manifest(manifest);

        for ship in read_section::<Ship>(&self.root.join(SHIPS_DIR))? {
            builder.push_ship(ship);
        }
        for pilot in read_section::<Pilot>(&self.root.join(PILOTS_DIR))? {
            builder.push_pilot(pilot);
        }
        for upgrade in read_section::<Upgrade>(&self.root.join(UPGRADES_DIR))? {
            builder.push_upgrade(upgrade);
        }

        let catalog = builder
            .build()
            .with_context(|| format!("invalid catalog in {}", self.root.display()))?;
        info!(
            root = %self.root.display(),
            version = %label,
            ships = catalog.ships().len(),
            pilots = catalog.pilots().len(),
            upgrades = catalog.upgrades().len(),
            "Catalog loaded"
        );
        Ok(catalog)
    }
}

fn read_manifest(path: &Path) -> Result<CatalogManifest> {
    if !path.is_file() {
        debug!(path = %path.display(), "No catalog manifest; data is unversioned");
        return Ok(CatalogManifest::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog manifest {}", path.display()))?;
    let manifest: CatalogManifest = serde_json::from_str(&content)
        .with_context(|| format!("catalog manifest {} is not valid", path.display()))?;
    Ok(manifest.normalized())
}

fn read_section<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "Catalog section missing; skipping");
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some("json")
        {
            continue;
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let parsed: OneOrMany<T> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        let parsed = parsed.into_vec();
        debug!(file = %path.display(), records = parsed.len(), "Read catalog file");
        records.extend(parsed);
    }
    Ok(records)
}
