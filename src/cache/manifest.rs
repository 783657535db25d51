//! Build manifest
//!
//! Records when each route was last generated so a server started over an
//! existing build knows which pages are already stale.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tokio::time::Instant;

use super::{PageBody, PageCache};
use crate::error::Result;

/// Manifest directory, relative to the site root
const MANIFEST_DIR: &str = ".spacetraveling";

/// Manifest file, relative to the site root
const MANIFEST_FILE: &str = ".spacetraveling/manifest.json";

/// A generated route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Output path relative to the public dir
    pub output_path: String,
    pub generated_at: DateTime<Utc>,
    pub revalidate_secs: u64,
}

/// Generated routes of the last build, keyed by route
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Manifest {
    pub version: u32,
    pub pages: BTreeMap<String, ManifestEntry>,
}

impl Manifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest, or an empty one if it is missing or outdated
    pub fn load(base_dir: &Path) -> Self {
        let path = base_dir.join(MANIFEST_FILE);
        if let Ok(content) = fs::read_to_string(&path) {
            match serde_json::from_str::<Manifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Manifest version mismatch, ignoring previous build"),
                Err(e) => tracing::warn!("Unreadable manifest {:?}: {}", path, e),
            }
        }
        Self::new()
    }

    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(MANIFEST_DIR))?;
        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }

    pub fn record(&mut self, route: &str, output_path: &str, revalidate_secs: u64) {
        self.pages.insert(
            route.to_string(),
            ManifestEntry {
                output_path: output_path.to_string(),
                generated_at: Utc::now(),
                revalidate_secs,
            },
        );
    }
}

/// Load the pages of a previous build into `cache`, keeping their age
///
/// Returns the number of pages seeded. Entries whose output file is gone
/// are skipped.
pub fn seed_cache(cache: &PageCache, manifest: &Manifest, public_dir: &Path) -> usize {
    let now = Utc::now();
    let mut seeded = 0;

    for (route, entry) in &manifest.pages {
        let html = match fs::read_to_string(public_dir.join(&entry.output_path)) {
            Ok(html) => html,
            Err(e) => {
                tracing::debug!("Skipping {}: {}", route, e);
                continue;
            }
        };

        let age = (now - entry.generated_at).to_std().unwrap_or_default();
        let Some(generated_at) = Instant::now().checked_sub(age) else {
            continue;
        };

        cache.seed(route, PageBody::Html(html), generated_at);
        seeded += 1;
    }

    tracing::info!("Seeded {} pages from previous build", seeded);
    seeded
}
