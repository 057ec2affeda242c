//! Classifier port: the external collaborator that turns one file into
//! entities, relationships and an export fragment.
//!
//! The core never looks inside a classification beyond the fields below. How
//! a classifier reaches its model, retries, or prices a call is its own
//! business.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Boxed future returned by [`Classifier::classify`]; keeps the trait
/// dyn-compatible so the mapper can hold an `Arc<dyn Classifier>`.
pub type ClassifierFuture<'a> =
    Pin<Box<dyn Future<Output = anyhow::Result<Classification>> + Send + 'a>>;

/// A single extracted entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A relationship between two extracted entities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Result of classifying one file.
///
/// `cached` is set by the cache on the way out and is never trusted from a
/// classifier. `cost_usd` is what the original computation cost, so a cached
/// copy still reports it; callers wanting the cost of *this* call use
/// [`Classification::incremental_cost_usd`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Classification {
    pub title: String,
    pub domain: String,
    pub doc_type: String,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    /// Graph statements for this file, newline separated.
    pub export_fragment: String,
    pub cost_usd: f64,
    pub cached: bool,
}

impl Classification {
    pub fn incremental_cost_usd(&self) -> f64 {
        if self.cached { 0.0 } else { self.cost_usd }
    }

    /// Copy flagged as served from the cache.
    pub fn into_cached(mut self) -> Self {
        self.cached = true;
        self
    }
}

/// A discovered file together with its classification.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClassifiedFile {
    pub path: PathBuf,
    /// Root-relative, `/`-separated.
    pub relative_path: String,
    pub digest: String,
    pub classification: Classification,
}

/// Produces a [`Classification`] for a file path.
///
/// Called once per cache miss. A rejection is reported as a per-file failure
/// by the orchestrator; implementations should not panic.
pub trait Classifier: Send + Sync {
    fn classify<'a>(&'a self, path: &'a Path) -> ClassifierFuture<'a>;
}
