//! Static dependency analysis
//!
//! Builds the forward and reverse dependency graph of the project's PHP
//! sources once, then scores each file on autoload membership, tooling and
//! configuration conventions, and how connected it is.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::debug;

use super::autoload::is_under;
use super::source_tree::{file_name, SourceTree};
use super::tokens;
use super::Analyzer;
use crate::models::{FileAnalysisResult, FileCategory};

/// Files required by package managers, the web server or the runtime
const TOOLING_FILES: &[&str] = &[
    "composer.json",
    "composer.lock",
    "package.json",
    "package-lock.json",
    "yarn.lock",
    ".htaccess",
    "public/.htaccess",
    "web.config",
    "public/web.config",
    ".env",
    ".env.example",
    "Dockerfile",
    "docker-compose.yml",
];

/// Directories holding the application's runtime configuration
const CONFIG_DIRS: &[&str] = &["config", "app/config", "src/config", "src/Config", "bootstrap"];

const WEIGHT_AUTOLOAD: u32 = 30;
const WEIGHT_TOOLING: u32 = 40;
const WEIGHT_CONFIG: u32 = 35;
const WEIGHT_MIGRATION: u32 = 35;
const WEIGHT_ENTRY: u32 = 40;
const WEIGHT_MANY_DEPENDENCIES: u32 = 15;
const WEIGHT_MANY_REFERENCES: u32 = 20;
const WEIGHT_PER_EDGE: u32 = 5;
const DEPENDENCY_THRESHOLD: usize = 3;
const REFERENCE_THRESHOLD: usize = 2;
const CONFIDENCE_FLOOR: u32 = 10;

/// Classifies files by how the rest of the project depends on them
pub struct DependencyAnalyzer {
    tree: Arc<SourceTree>,
    forward: HashMap<String, BTreeSet<String>>,
    reverse: HashMap<String, BTreeSet<String>>,
}

impl DependencyAnalyzer {
    pub const NAME: &'static str = "dependency";

    pub fn new(tree: Arc<SourceTree>) -> Self {
        let forward: HashMap<String, BTreeSet<String>> = tree
            .files()
            .par_iter()
            .filter(|path| tokens::is_source_file(path))
            .filter_map(|path| {
                let content = tree.content(path)?;
                let deps = tokens::resolved_dependencies(&tree, path, content);
                (!deps.is_empty()).then(|| (path.clone(), deps))
            })
            .collect();

        let mut reverse: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (from, deps) in &forward {
            for dep in deps {
                reverse.entry(dep.clone()).or_default().insert(from.clone());
            }
        }

        debug!(
            "Dependency graph: {} files with dependencies, {} referenced",
            forward.len(),
            reverse.len()
        );

        Self {
            tree,
            forward,
            reverse,
        }
    }

    fn is_tooling_required(path: &str) -> bool {
        TOOLING_FILES.contains(&path)
    }

    fn is_core_config(path: &str) -> bool {
        CONFIG_DIRS.iter().any(|dir| is_under(path, dir))
            || (matches!(file_name(path), "config.php" | "settings.php") && !path.contains('/'))
    }
}

impl Analyzer for DependencyAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn analyze(&self, path: &str) -> FileAnalysisResult {
        let empty = BTreeSet::new();
        let deps = self.forward.get(path).unwrap_or(&empty);
        let refs = self.reverse.get(path).unwrap_or(&empty);

        let mut builder = FileAnalysisResult::builder(path, Self::NAME)
            .dependencies(deps.iter().cloned())
            .references(refs.iter().cloned());
        let mut strong = false;

        let autoload_root = self.tree.autoload().root_for(path);
        let autoloaded = self.tree.autoload().is_autoloaded(path);
        if autoloaded {
            strong = true;
            let reason = match autoload_root {
                Some(root) => format!(
                    "Inside autoload root {}\\ ({}/)",
                    root.namespace, root.directory
                ),
                None => "Listed in autoload files or classmap".to_string(),
            };
            builder = builder.add_confidence(WEIGHT_AUTOLOAD).reason(reason);
        }

        let tooling = Self::is_tooling_required(path);
        if tooling {
            strong = true;
            builder = builder
                .add_confidence(WEIGHT_TOOLING)
                .reason(format!("Required by tooling: {}", path));
        }

        let core_config = Self::is_core_config(path);
        if core_config {
            strong = true;
            builder = builder
                .add_confidence(WEIGHT_CONFIG)
                .reason("Core configuration file");
        }

        let migration = tokens::is_migration(path);
        if migration {
            strong = true;
            builder = builder
                .add_confidence(WEIGHT_MIGRATION)
                .reason("Database migration");
        }

        let entry_point = tokens::is_entry_point(path);
        if entry_point {
            strong = true;
            builder = builder
                .add_confidence(WEIGHT_ENTRY)
                .reason("Application entry point");
        }

        if deps.len() > DEPENDENCY_THRESHOLD {
            builder = builder
                .add_confidence(WEIGHT_MANY_DEPENDENCIES)
                .reason(format!("Depends on {} project files", deps.len()));
        } else if !deps.is_empty() {
            builder = builder.add_confidence(WEIGHT_PER_EDGE * deps.len() as u32);
        }

        if refs.len() > REFERENCE_THRESHOLD {
            builder = builder
                .add_confidence(WEIGHT_MANY_REFERENCES)
                .reason(format!("Referenced by {} project files", refs.len()));
        } else if !refs.is_empty() {
            builder = builder
                .add_confidence(WEIGHT_PER_EDGE * refs.len() as u32)
                .reason(format!("Referenced by {} project file(s)", refs.len()));
        }

        let connected = deps.len() > DEPENDENCY_THRESHOLD || refs.len() > REFERENCE_THRESHOLD;
        let category = if strong || connected {
            FileCategory::Essential
        } else {
            FileCategory::Uncertain
        };

        if category == FileCategory::Uncertain && deps.is_empty() && refs.is_empty() {
            builder = builder.reason("No static dependency evidence");
        }

        let mut builder = builder
            .category(category)
            .confidence_floor(CONFIDENCE_FLOOR)
            .metadata("autoloaded", autoloaded)
            .metadata("tooling_required", tooling)
            .metadata("core_config", core_config)
            .metadata("migration", migration)
            .metadata("entry_point", entry_point)
            .metadata("dependency_count", deps.len())
            .metadata("reference_count", refs.len());
        if let Some(root) = autoload_root {
            builder = builder.metadata("namespace", root.namespace.clone());
        }

        builder.build()
    }

    fn priority(&self) -> u8 {
        90
    }
}
