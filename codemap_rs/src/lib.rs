//! # codemap
//!
//! **Project mapping core** - walks a codebase, decides which files matter,
//! extracts cross-file dependencies, finds import cycles and drives a
//! cached, window-bounded classification of every file through an external
//! [`Classifier`].
//!
//! ## Features
//!
//! - **Gitignore-style matching** - cascading ignore files, `!` negation, `**` globs
//! - **Lexical import scanning** - TS/JS, Python, Rust, Java, Go, C/C++
//! - **Cycle detection** - one cycle per back-edge, linear in graph size
//! - **Content-addressed cache** - identical bytes are classified once
//! - **Window-bounded batches** - fixed concurrency ceiling, continue-on-error
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use codemap::{Classification, Classifier, ClassifierFuture, ProjectMapper};
//!
//! struct TitleOnly;
//!
//! impl Classifier for TitleOnly {
//!     fn classify<'a>(&'a self, path: &'a Path) -> ClassifierFuture<'a> {
//!         Box::pin(async move {
//!             Ok(Classification {
//!                 title: path.display().to_string(),
//!                 ..Default::default()
//!             })
//!         })
//!     }
//! }
//!
//! # async fn run() -> codemap::Result<()> {
//! let root = Path::new(".");
//! let mapper = ProjectMapper::from_config(Arc::new(TitleOnly), root);
//! let result = mapper.map_project(root).await?;
//! println!("{} files, {} cycles", result.files.len(), result.cycles.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Core Modules
// ============================================================================

/// Per-language dependency scanners, the dependency graph and cycle detection.
pub mod analyzer;

/// Window-bounded batch orchestration.
pub mod batch;

/// Content-addressed classification cache.
pub mod cache;

/// The external classifier contract.
pub mod classifier;

pub mod config;

/// Project type detection from manifest files.
pub mod detect;

pub mod error;

/// Graph-database export statements.
pub mod export;

/// File discovery.
pub mod fs_utils;

/// Gitignore-style ignore rules.
pub mod ignore;

pub mod mapper;

pub mod types;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use analyzer::{DependencyExtractor, DependencyGraph, find_cycles};

pub use batch::{
    BatchOptions, BatchOrchestrator, BatchOutput, BatchReport, BatchStats, WindowObserver,
    WindowProgress, WindowReport,
};

pub use cache::{CacheStats, ContentCache, content_digest};

pub use classifier::{Classification, ClassifiedFile, Classifier, ClassifierFuture};

pub use config::{CodemapConfig, MapOptions};

pub use detect::{ProjectInfo, detect_project};

pub use error::{MapError, Result};

pub use ignore::{IgnoreMatcher, IgnorePattern};

pub use mapper::{ProjectMapResult, ProjectMapper};

pub use types::{DependencyEdge, EdgeKind, Language};
