//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use codemap::classifier::Entity;
use codemap::{Classification, Classifier, ClassifierFuture, MapOptions};

/// Install a stderr subscriber once; `RUST_LOG` controls verbosity.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// In-memory classifier that counts its calls. Files whose name contains
/// `fail` are rejected.
pub struct CountingClassifier {
    calls: AtomicUsize,
    cost_usd: f64,
}

impl CountingClassifier {
    pub fn new(cost_usd: f64) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            cost_usd,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for CountingClassifier {
    fn classify<'a>(&'a self, path: &'a Path) -> ClassifierFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if name.contains("fail") {
                anyhow::bail!("classifier rejected {name}");
            }
            let extension = path
                .extension()
                .map(|e| e.to_string_lossy().into_owned())
                .unwrap_or_default();

            let mut properties = serde_json::Map::new();
            properties.insert("name".into(), serde_json::Value::String(name.clone()));
            Ok(Classification {
                title: name.clone(),
                domain: extension,
                doc_type: "source".into(),
                confidence: 0.9,
                entities: vec![Entity {
                    kind: "File".into(),
                    properties,
                }],
                export_fragment: format!("CREATE (:Document {{title: \"{name}\"}})"),
                cost_usd: self.cost_usd,
                ..Default::default()
            })
        })
    }
}

pub fn write(root: &Path, rel: &str, body: impl AsRef<[u8]>) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(path, body).expect("write");
}

pub fn options(concurrency: usize) -> MapOptions {
    let mut options = MapOptions::default();
    options.batch.concurrency = concurrency;
    options
}
