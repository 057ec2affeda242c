//! Project mapping coordinator.
//!
//! One run goes: detect project → build ignore rules → discover files →
//! classify them window by window (content cache first, classifier on a
//! miss) → extract dependencies → build the graph and look for cycles →
//! assemble the result and its export.
//!
//! A run always finishes with partial results and an explicit failure list,
//! unless fail-fast was configured.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::analyzer::cycles::format_cycle;
use crate::analyzer::{DependencyExtractor, DependencyGraph};
use crate::batch::{BatchOrchestrator, BatchOutput, BatchStats, WindowObserver};
use crate::cache::{CacheStats, ContentCache, content_digest};
use crate::classifier::{Classification, ClassifiedFile, Classifier};
use crate::config::{CodemapConfig, MapOptions};
use crate::detect::{ProjectInfo, detect_project};
use crate::error::{MapError, Result};
use crate::export::{build_export, render_export};
use crate::fs_utils::{
    DiscoveryOptions, DiscoveryStatistics, ScannedFile, discovery_statistics, gather_files,
    is_test_file,
};
use crate::ignore::IgnoreMatcher;
use crate::types::DependencyEdge;

impl BatchOutput for ClassifiedFile {
    fn incremental_cost_usd(&self) -> f64 {
        self.classification.incremental_cost_usd()
    }

    fn is_cached(&self) -> bool {
        self.classification.cached
    }
}

/// Which step a file failed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Classification,
    Extraction,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FileFailure {
    pub relative_path: String,
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ProjectStatistics {
    /// Files that survived ignore rules and the extension allow-list.
    pub candidate_files: usize,
    /// Candidates left after the optional test-file exclusion.
    pub total_files: usize,
    pub classified_files: usize,
    pub failed_files: usize,
    pub total_entities: usize,
    pub total_relationships: usize,
    pub by_domain: BTreeMap<String, usize>,
    pub by_doc_type: BTreeMap<String, usize>,
    /// Cost of this run only; cache hits add nothing.
    pub total_cost_usd: f64,
    pub internal_edges: usize,
    pub external_edges: usize,
    pub cycle_count: usize,
    pub processing_time_ms: u64,
    pub batch: BatchStats,
    pub cache: CacheStats,
    pub discovery: DiscoveryStatistics,
}

/// Everything one mapping run produced.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectMapResult {
    pub project: ProjectInfo,
    pub files: Vec<ClassifiedFile>,
    pub failures: Vec<FileFailure>,
    pub edges: Vec<DependencyEdge>,
    pub cycles: Vec<Vec<String>>,
    pub statistics: ProjectStatistics,
    /// Graph statements in load order.
    pub export: Vec<String>,
}

impl ProjectMapResult {
    pub fn export_script(&self) -> String {
        render_export(&self.export)
    }
}

pub struct ProjectMapper {
    classifier: Arc<dyn Classifier>,
    options: MapOptions,
}

impl ProjectMapper {
    pub fn new(classifier: Arc<dyn Classifier>, options: MapOptions) -> Self {
        Self {
            classifier,
            options,
        }
    }

    /// Mapper configured from `<root>/.codemap/config.toml` (or defaults).
    pub fn from_config(classifier: Arc<dyn Classifier>, root: &Path) -> Self {
        let config = CodemapConfig::load(root);
        Self::new(classifier, MapOptions::from(&config))
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    /// Defaults, then ignore files from `root` upward (ancestors first), then
    /// configured extra patterns. Later rules win. Ignore files below `root`
    /// are picked up during discovery.
    pub fn build_matcher(&self, root: &Path) -> IgnoreMatcher {
        let mut matcher = IgnoreMatcher::with_defaults().with_file_name(&self.options.ignore_file);
        if self.options.use_gitignore {
            matcher.load_cascading(root, None);
        }
        matcher.add_patterns(&self.options.extra_ignore_patterns, "config");
        matcher
    }

    pub async fn map_project(&self, root: &Path) -> Result<ProjectMapResult> {
        self.map_project_with(root, None).await
    }

    /// Like [`map_project`](Self::map_project), reporting every settled
    /// classification window to `observer`.
    pub async fn map_project_with(
        &self,
        root: &Path,
        observer: Option<&mut dyn WindowObserver<ScannedFile, ClassifiedFile>>,
    ) -> Result<ProjectMapResult> {
        let started = Instant::now();
        // absolute, so `.` gets a project name and its ancestors get scanned for ignore files
        let root = match tokio::fs::canonicalize(root).await {
            Ok(resolved) if resolved.is_dir() => resolved,
            _ => return Err(MapError::RootNotFound(root.to_path_buf())),
        };
        let root = root.as_path();
        let orchestrator = BatchOrchestrator::new(self.options.batch)?;

        let project = detect_project(root);
        info!(project = %project.name, root = %root.display(), "mapping project");

        let cache = ContentCache::new(self.options.cache_dir_for(root), self.options.cache_enabled);
        cache.initialize().await;
        if let Some(days) = self.options.cache_max_age_days {
            cache.clear_older_than(days).await;
        }

        let matcher = self.build_matcher(root);
        let discovery = DiscoveryOptions {
            include_tests: true,
            nested_ignore_files: self.options.use_gitignore,
            ..self.options.discovery.clone()
        };
        let candidates =
            gather_files(root, &discovery, &matcher).map_err(|err| MapError::io(root, err))?;
        let candidate_count = candidates.len();
        let files: Vec<ScannedFile> = if self.options.discovery.include_tests {
            candidates
        } else {
            candidates
                .into_iter()
                .filter(|f| !is_test_file(&f.relative_path))
                .collect()
        };
        info!(candidates = candidate_count, files = files.len(), "discovered files");

        let classifier = &self.classifier;
        let cache_ref = &cache;
        let report = orchestrator
            .run(
                files.clone(),
                move |file: ScannedFile| async move {
                    classify_file(&**classifier, cache_ref, &file).await
                },
                observer,
            )
            .await?;

        let mut failures: Vec<FileFailure> = report
            .results
            .iter()
            .filter_map(|r| {
                r.outcome.as_ref().err().map(|message| FileFailure {
                    relative_path: r.item.relative_path.clone(),
                    stage: FailureStage::Classification,
                    message: message.clone(),
                })
            })
            .collect();
        let classified: Vec<ClassifiedFile> =
            report.successes().map(|(_, out)| out.clone()).collect();

        let (edges, extraction_failures) = self.extract_all(root, &files).await;
        failures.extend(extraction_failures);

        let graph = DependencyGraph::build(&edges);
        let cycles = graph.detect_cycles();
        for cycle in &cycles {
            warn!(cycle = %format_cycle(cycle), "circular dependency");
        }

        let export = build_export(&project, &classified, &edges);

        let mut statistics = ProjectStatistics {
            candidate_files: candidate_count,
            total_files: files.len(),
            classified_files: classified.len(),
            failed_files: report.stats.failure_count,
            total_cost_usd: report.stats.total_cost_usd,
            internal_edges: edges.iter().filter(|e| !e.is_external).count(),
            external_edges: graph.external_edges().len(),
            cycle_count: cycles.len(),
            batch: report.stats.clone(),
            cache: cache.get_stats().await,
            discovery: discovery_statistics(&files),
            ..Default::default()
        };
        tally_classifications(&mut statistics, &classified);
        statistics.processing_time_ms = started.elapsed().as_millis() as u64;

        info!(
            classified = statistics.classified_files,
            failed = failures.len(),
            edges = edges.len(),
            cycles = statistics.cycle_count,
            cost_usd = statistics.total_cost_usd,
            elapsed_ms = statistics.processing_time_ms,
            "project mapped"
        );

        Ok(ProjectMapResult {
            project,
            files: classified,
            failures,
            edges,
            cycles,
            statistics,
            export,
        })
    }

    /// Dependency extraction over every discovered file, independent of
    /// classification. A file that cannot be read is recorded, not fatal.
    async fn extract_all(
        &self,
        root: &Path,
        files: &[ScannedFile],
    ) -> (Vec<DependencyEdge>, Vec<FileFailure>) {
        let extractor = DependencyExtractor::new(root);
        let extractor = &extractor;
        let outcomes: Vec<(String, std::io::Result<Vec<DependencyEdge>>)> =
            futures::stream::iter(files.iter().map(|file| async move {
                (
                    file.relative_path.clone(),
                    extractor.extract_file(&file.path).await,
                )
            }))
            .buffered(self.options.batch.concurrency)
            .collect()
            .await;

        let mut edges = Vec::new();
        let mut failures = Vec::new();
        for (relative_path, outcome) in outcomes {
            match outcome {
                Ok(found) => edges.extend(found),
                Err(err) => {
                    warn!(file = %relative_path, error = %err, "dependency extraction failed");
                    failures.push(FileFailure {
                        relative_path,
                        stage: FailureStage::Extraction,
                        message: err.to_string(),
                    });
                }
            }
        }
        (edges, failures)
    }
}

/// Cache first, classifier on a miss, then populate the cache.
async fn classify_file(
    classifier: &dyn Classifier,
    cache: &ContentCache,
    file: &ScannedFile,
) -> anyhow::Result<ClassifiedFile> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .with_context(|| format!("reading {}", file.relative_path))?;
    let digest = content_digest(&bytes);

    let classification = match cache.get(&digest).await {
        Some(hit) => hit,
        None => {
            let mut fresh: Classification = classifier.classify(&file.path).await?;
            fresh.cached = false;
            cache.set(&digest, &fresh).await;
            fresh
        }
    };

    Ok(ClassifiedFile {
        path: file.path.clone(),
        relative_path: file.relative_path.clone(),
        digest,
        classification,
    })
}

fn tally_classifications(statistics: &mut ProjectStatistics, files: &[ClassifiedFile]) {
    for file in files {
        let c = &file.classification;
        statistics.total_entities += c.entities.len();
        statistics.total_relationships += c.relationships.len();
        *statistics.by_domain.entry(label_or_unknown(&c.domain)).or_default() += 1;
        *statistics
            .by_doc_type
            .entry(label_or_unknown(&c.doc_type))
            .or_default() += 1;
    }
}

fn label_or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::classifier::ClassifierFuture;

    struct Echo {
        calls: AtomicUsize,
    }

    impl Classifier for Echo {
        fn classify<'a>(&'a self, path: &'a Path) -> ClassifierFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if name.starts_with("broken") {
                    anyhow::bail!("provider rejected {name}");
                }
                Ok(Classification {
                    title: name,
                    domain: "code".into(),
                    doc_type: "module".into(),
                    cost_usd: 0.01,
                    ..Default::default()
                })
            })
        }
    }

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(path, body).expect("write");
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let mapper = ProjectMapper::new(
            Arc::new(Echo {
                calls: AtomicUsize::new(0),
            }),
            MapOptions::default(),
        );
        let err = mapper
            .map_project(Path::new("/definitely/not/here"))
            .await
            .unwrap_err();
        assert!(matches!(err, MapError::RootNotFound(_)));
    }

    #[tokio::test]
    async fn zero_concurrency_fails_before_any_work() {
        let tmp = tempfile::tempdir().expect("tmp dir");
        let classifier = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let mut options = MapOptions::default();
        options.batch.concurrency = 0;
        let mapper = ProjectMapper::new(classifier.clone(), options);
        let err = mapper.map_project(tmp.path()).await.unwrap_err();
        assert!(matches!(err, MapError::InvalidConcurrency(0)));
        assert_eq!(classifier.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn maps_a_small_project() {
        let tmp = tempfile::tempdir().expect("tmp dir");
        let root = tmp.path();
        write(root, "package.json", r#"{"name":"demo"}"#);
        write(root, "src/index.ts", "import { util } from './util';\nimport fs from 'fs';\n");
        write(root, "src/util.ts", "export const util = 1;\n");
        write(root, "src/broken.ts", "export {};\n");
        write(root, "src/util.test.ts", "import { util } from './util';\n");
        write(root, "node_modules/pkg/index.js", "module.exports = {};\n");

        let classifier = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let mapper = ProjectMapper::new(classifier.clone(), MapOptions::default());
        let result = mapper.map_project(root).await.expect("map");

        assert_eq!(result.project.name, "demo");
        let stats = &result.statistics;
        assert_eq!(stats.candidate_files, 5);
        assert_eq!(stats.total_files, 4);
        assert_eq!(stats.classified_files, 3);
        assert_eq!(stats.failed_files, 1);
        assert_eq!(stats.by_domain.get("code"), Some(&3));
        assert_eq!(stats.internal_edges, 1);
        assert_eq!(stats.external_edges, 1);
        assert_eq!(stats.cycle_count, 0);

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].relative_path, "src/broken.ts");
        assert_eq!(result.failures[0].stage, FailureStage::Classification);
        assert!(result.failures[0].message.contains("provider rejected"));

        assert!(result.export[1].starts_with("CREATE (project:Project {name: \"demo\""));
        assert!(result.export_script().contains(":IMPORTS"));
        assert_eq!(result.files.len(), 3);
        assert!(root.join(".classify-cache").is_dir());
    }
}
