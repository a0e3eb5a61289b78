//! Usage analysis
//!
//! Scans the whole tree once for asset references, include edges, template
//! renders, migration ordering and API endpoint definitions, then answers
//! per file whether anything actually uses it.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use super::source_tree::{extension, file_name, SourceTree};
use super::tokens;
use super::Analyzer;
use crate::models::{FileAnalysisResult, FileCategory};

/// Files scanned for asset and template mentions
const REFERRER_EXTENSIONS: &[&str] = &["php", "phtml", "html", "htm", "twig", "tpl", "css"];

/// Names that usually belong to one-off or abandoned files
static ORPHAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|/)(test|debug|temp|tmp|old|backup|copy|sample|example|demo|scratch|fix|check|quick|try)[^/]*$|[_\-](old|bak|copy|new|v\d+|\d{8})\.[a-z0-9]+$",
    )
    .expect("valid orphan regex")
});

const WEIGHT_ENTRY: u32 = 40;
const WEIGHT_MIGRATION: u32 = 35;
const WEIGHT_API: u32 = 35;
const WEIGHT_ASSET: u32 = 20;
const WEIGHT_INCLUDES: u32 = 25;
const WEIGHT_SINGLE_INCLUDE: u32 = 10;
const WEIGHT_TEMPLATE: u32 = 30;
const WEIGHT_PER_REFERENCE: u32 = 5;
const UNUSED_CONFIDENCE: u32 = 60;
const NO_EVIDENCE_CONFIDENCE: u32 = 20;

#[derive(Debug, Default)]
struct MigrationLinks {
    position: usize,
    previous: Option<String>,
    next: Option<String>,
}

/// Classifies files by whether anything in the project uses them
pub struct UsageAnalyzer {
    tree: Arc<SourceTree>,
    asset_refs: HashMap<String, BTreeSet<String>>,
    includes: HashMap<String, BTreeSet<String>>,
    included_by: HashMap<String, BTreeSet<String>>,
    template_refs: HashMap<String, BTreeSet<String>>,
    migrations: HashMap<String, MigrationLinks>,
    migration_count: usize,
    api_actions: HashMap<String, Vec<String>>,
}

/// Everything one file mentions
#[derive(Default)]
struct FileScan {
    assets: BTreeSet<String>,
    includes: BTreeSet<String>,
    templates: BTreeSet<String>,
    api_actions: Option<Vec<String>>,
}

impl UsageAnalyzer {
    pub const NAME: &'static str = "usage";

    pub fn new(tree: Arc<SourceTree>) -> Self {
        let templates = TemplateIndex::new(&tree);

        let scans: Vec<(String, FileScan)> = tree
            .files()
            .par_iter()
            .filter_map(|path| {
                let ext = extension(path).to_lowercase();
                if !REFERRER_EXTENSIONS.contains(&ext.as_str()) && !is_api_path(path) {
                    return None;
                }
                let content = tree.content(path)?;
                Some((path.clone(), scan_file(&tree, &templates, path, content)))
            })
            .collect();

        let mut analyzer = Self {
            asset_refs: HashMap::new(),
            includes: HashMap::new(),
            included_by: HashMap::new(),
            template_refs: HashMap::new(),
            migrations: HashMap::new(),
            migration_count: 0,
            api_actions: HashMap::new(),
            tree,
        };

        for (path, scan) in scans {
            for asset in scan.assets {
                analyzer.asset_refs.entry(asset).or_default().insert(path.clone());
            }
            for target in &scan.includes {
                analyzer
                    .included_by
                    .entry(target.clone())
                    .or_default()
                    .insert(path.clone());
            }
            for template in scan.templates {
                analyzer
                    .template_refs
                    .entry(template)
                    .or_default()
                    .insert(path.clone());
            }
            if let Some(actions) = scan.api_actions {
                analyzer.api_actions.insert(path.clone(), actions);
            }
            if !scan.includes.is_empty() {
                analyzer.includes.insert(path, scan.includes);
            }
        }

        analyzer.index_migrations();

        debug!(
            "Usage index: {} assets, {} included files, {} templates, {} migrations, {} endpoints",
            analyzer.asset_refs.len(),
            analyzer.included_by.len(),
            analyzer.template_refs.len(),
            analyzer.migration_count,
            analyzer.api_actions.len()
        );

        analyzer
    }

    /// Order migrations by numeric prefix and link neighbours
    fn index_migrations(&mut self) {
        let mut ordered: Vec<(u64, &String)> = self
            .tree
            .files()
            .iter()
            .filter(|path| tokens::is_migration(path))
            .filter_map(|path| tokens::migration_sequence(path).map(|seq| (seq, path)))
            .collect();
        ordered.sort();

        self.migration_count = ordered.len();
        for (idx, (_, path)) in ordered.iter().enumerate() {
            let links = MigrationLinks {
                position: idx + 1,
                previous: idx
                    .checked_sub(1)
                    .map(|prev| ordered[prev].1.clone()),
                next: ordered.get(idx + 1).map(|(_, next)| (*next).clone()),
            };
            self.migrations.insert((*path).clone(), links);
        }
    }

    /// Actions dispatched by an API endpoint file
    pub fn api_actions(&self, path: &str) -> Option<&[String]> {
        self.api_actions.get(path).map(Vec::as_slice)
    }

    fn is_potentially_unused(&self, path: &str, reference_count: usize) -> bool {
        reference_count == 0
            && !tokens::is_entry_point(path)
            && !self.tree.autoload().is_autoloaded(path)
            && ORPHAN_RE.is_match(path)
    }
}

fn is_api_path(path: &str) -> bool {
    path.split('/').any(|segment| segment.eq_ignore_ascii_case("api"))
        && extension(path).eq_ignore_ascii_case("php")
}

fn scan_file(tree: &SourceTree, templates: &TemplateIndex, path: &str, content: &str) -> FileScan {
    let mut scan = FileScan::default();

    for mention in tokens::asset_mentions(content) {
        if let Some(asset) = tokens::resolve_asset(path, &mention)
            .into_iter()
            .find(|candidate| tree.contains(candidate))
        {
            if asset != path {
                scan.assets.insert(asset);
            }
        }
    }

    if tokens::is_source_file(path) {
        scan.includes = tokens::resolved_includes(tree, path, content);

        for name in tokens::template_mentions(content) {
            scan.templates.extend(templates.resolve(&name));
        }

        let actions = tokens::case_literals(content);
        if tokens::reads_request(content) && (!actions.is_empty() || is_api_path(path)) {
            scan.api_actions = Some(actions);
        }
    }

    scan
}

/// Template files keyed by their name without template dir or extension
struct TemplateIndex {
    by_name: HashMap<String, Vec<String>>,
}

impl TemplateIndex {
    fn new(tree: &SourceTree) -> Self {
        let mut by_name: HashMap<String, Vec<String>> = HashMap::new();
        for path in tree.files().iter().filter(|p| tokens::is_template(p)) {
            let segments: Vec<&str> = path.split('/').collect();
            let start = segments
                .iter()
                .position(|s| tokens::TEMPLATE_DIRS.contains(&s.to_lowercase().as_str()))
                .map(|i| i + 1)
                .unwrap_or(0);
            let inner = segments[start..].join("/");
            let key = strip_template_extension(&inner);
            by_name.entry(key).or_default().push(path.clone());
        }
        Self { by_name }
    }

    fn resolve(&self, name: &str) -> Vec<String> {
        let key = strip_template_extension(name.trim_start_matches('/'));
        self.by_name.get(&key).cloned().unwrap_or_default()
    }
}

fn strip_template_extension(name: &str) -> String {
    let mut key = name.to_string();
    // `show.html.twig` carries two extensions
    for _ in 0..2 {
        let ext = extension(&key).to_lowercase();
        if tokens::TEMPLATE_EXTENSIONS.contains(&ext.as_str()) {
            key.truncate(key.len() - ext.len() - 1);
        }
    }
    key
}

impl Analyzer for UsageAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn analyze(&self, path: &str) -> FileAnalysisResult {
        let empty = BTreeSet::new();
        let assets = self.asset_refs.get(path).unwrap_or(&empty);
        let included_by = self.included_by.get(path).unwrap_or(&empty);
        let templates = self.template_refs.get(path).unwrap_or(&empty);
        let includes = self.includes.get(path).unwrap_or(&empty);

        let mut builder = FileAnalysisResult::builder(path, Self::NAME)
            .dependencies(includes.iter().cloned())
            .references(assets.iter().cloned())
            .references(included_by.iter().cloned())
            .references(templates.iter().cloned());
        let mut essential = false;

        let entry_point = tokens::is_entry_point(path);
        if entry_point {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_ENTRY)
                .reason("Application entry point");
        }

        if let Some(links) = self.migrations.get(path) {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_MIGRATION)
                .reason(format!(
                    "Migration {} of {} in sequence",
                    links.position, self.migration_count
                ))
                .metadata("migration_order", links.position);
            if let Some(previous) = &links.previous {
                builder = builder.dependency(previous.clone());
            }
            if let Some(next) = &links.next {
                builder = builder.references([next.clone()]);
            }
        } else if tokens::is_migration(path) {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_MIGRATION)
                .reason("Database migration");
        }

        if let Some(actions) = self.api_actions.get(path) {
            essential = true;
            let reason = if actions.is_empty() {
                "Defines an API endpoint".to_string()
            } else {
                format!("Defines API endpoint actions: {}", actions.join(", "))
            };
            builder = builder
                .add_confidence(WEIGHT_API)
                .reason(reason)
                .metadata("api_actions", actions.clone());
        }

        if !assets.is_empty() {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_ASSET + WEIGHT_PER_REFERENCE * assets.len().min(6) as u32)
                .reason(format!("Asset referenced by {} file(s)", assets.len()));
        }

        if included_by.len() > 1 {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_INCLUDES + WEIGHT_PER_REFERENCE * included_by.len().min(6) as u32)
                .reason(format!("Included by {} files", included_by.len()));
        } else if included_by.len() == 1 {
            builder = builder
                .add_confidence(WEIGHT_SINGLE_INCLUDE)
                .reason("Included by 1 file");
        }

        if !templates.is_empty() {
            essential = true;
            builder = builder
                .add_confidence(WEIGHT_TEMPLATE)
                .reason(format!("Template rendered by {} file(s)", templates.len()));
        }

        let reference_count = assets.len() + included_by.len() + templates.len();
        let unused = !essential && self.is_potentially_unused(path, reference_count);

        let category = if essential {
            FileCategory::Essential
        } else if unused {
            builder = builder
                .add_confidence(UNUSED_CONFIDENCE)
                .reason(format!(
                    "Potentially unused: no references and name looks orphaned ({})",
                    file_name(path)
                ));
            FileCategory::NonEssential
        } else {
            if reference_count == 0 {
                builder = builder.reason("No usage found");
            }
            builder = builder.raise_confidence(NO_EVIDENCE_CONFIDENCE);
            FileCategory::Uncertain
        };

        builder
            .category(category)
            .metadata("entry_point", entry_point)
            .metadata("asset_reference_count", assets.len())
            .metadata("include_reference_count", included_by.len())
            .metadata("template_reference_count", templates.len())
            .metadata("potentially_unused", unused)
            .build()
    }

    fn priority(&self) -> u8 {
        80
    }
}
