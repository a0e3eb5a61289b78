//! Regex-level token extraction for PHP sources
//!
//! Nothing here parses PHP. The patterns find `use` imports, `require` /
//! `include` statements, fully-qualified instantiations and a few other
//! markers, and the helpers resolve what they name onto project paths.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::source_tree::{extension, file_name, parent_dir, SourceTree};
use crate::config::paths::normalize_relative;

/// `use A\B\C;`, `use A\B\{C, D as E};`, `use function A\b;`
static USE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*use\s+([^;(]+);").expect("valid use regex"));

/// `require_once __DIR__ . '/x.php'`, `include('x.php')`, ...
static INCLUDE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(?:require|include)(?:_once)?\s*\(?\s*((?:__DIR__|dirname\s*\(\s*__FILE__\s*\))\s*\.\s*)?['"]([^'"]+)['"]"#,
    )
    .expect("valid include regex")
});

/// `new \App\Foo\Bar(` and `new App\Foo\Bar(`
static NEW_FQCN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bnew\s+(\\?[A-Za-z_][A-Za-z0-9_]*(?:\\[A-Za-z_][A-Za-z0-9_]*)+)")
        .expect("valid instantiation regex")
});

/// Direct access to request input
static REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$_(?:GET|POST|REQUEST)\b|\$_SERVER\s*\[\s*['"]REQUEST_METHOD['"]|php://input"#)
        .expect("valid request regex")
});

/// `case 'action':` literals in a dispatch switch
static CASE_LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\bcase\s+['"]([A-Za-z0-9_\-]+)['"]\s*:"#).expect("valid case regex")
});

/// Stylesheet, script, image and font paths inside string literals or `url()`
static ASSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)[\s'"(=]([A-Za-z0-9_./\-]+\.(?:css|js|png|jpe?g|gif|svg|webp|ico|woff2?|ttf))\b"#,
    )
    .expect("valid asset regex")
});

/// `render('pets/show')`, `view("layout")`, ...
static TEMPLATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?:render|view|template|display|partial)\s*\(\s*['"]([A-Za-z0-9_./\-]+)['"]"#)
        .expect("valid template regex")
});

/// Leading numeric ordering prefix of a migration file name
static MIGRATION_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)[_\-.]").expect("valid migration prefix regex"));

const ENTRY_NAMES: &[&str] = &["index.php", "router.php", "bootstrap.php", ".htaccess"];
const ENTRY_DIRS: &[&str] = &["", "public", "web", "www", "public_html"];
const MIGRATION_DIRS: &[&str] = &["migrations", "migration"];
const SOURCE_EXTENSIONS: &[&str] = &["php", "phtml", "inc"];
pub const TEMPLATE_DIRS: &[&str] = &["templates", "views", "layouts", "partials"];
pub const TEMPLATE_EXTENSIONS: &[&str] = &["php", "phtml", "html", "htm", "twig", "tpl"];

/// Whether the file is a web or CLI entry point
pub fn is_entry_point(path: &str) -> bool {
    let name = file_name(path).to_lowercase();
    ENTRY_NAMES.contains(&name.as_str()) && ENTRY_DIRS.contains(&parent_dir(path))
}

/// Whether the file lives in a database migration directory
pub fn is_migration(path: &str) -> bool {
    let ext = extension(path).to_lowercase();
    (ext == "php" || ext == "sql")
        && parent_dir(path)
            .split('/')
            .any(|segment| MIGRATION_DIRS.contains(&segment.to_lowercase().as_str()))
}

/// Whether the file contains PHP worth scanning for tokens
pub fn is_source_file(path: &str) -> bool {
    SOURCE_EXTENSIONS.contains(&extension(path).to_lowercase().as_str())
}

/// Whether the file sits under a template directory
pub fn is_template(path: &str) -> bool {
    TEMPLATE_EXTENSIONS.contains(&extension(path).to_lowercase().as_str())
        && path
            .split('/')
            .any(|segment| TEMPLATE_DIRS.contains(&segment.to_lowercase().as_str()))
}

/// Numeric ordering prefix of a migration file
pub fn migration_sequence(path: &str) -> Option<u64> {
    MIGRATION_PREFIX_RE
        .captures(file_name(path))
        .and_then(|caps| caps[1].parse().ok())
}

/// Fully-qualified class names imported by `use` statements
pub fn use_imports(content: &str) -> Vec<String> {
    let mut classes = Vec::new();
    for caps in USE_RE.captures_iter(content) {
        let body = caps[1].trim();
        let body = body
            .strip_prefix("function ")
            .or_else(|| body.strip_prefix("const "))
            .unwrap_or(body)
            .trim();

        if let Some((prefix, rest)) = body.split_once('{') {
            let prefix = prefix.trim().trim_end_matches('\\');
            for member in rest.trim_end_matches('}').split(',') {
                let member = strip_alias(member);
                if !member.is_empty() {
                    classes.push(format!("{}\\{}", prefix, member));
                }
            }
        } else {
            for item in body.split(',') {
                let item = strip_alias(item);
                if !item.is_empty() {
                    classes.push(item.to_string());
                }
            }
        }
    }
    classes
}

fn strip_alias(item: &str) -> &str {
    let item = item.trim();
    let item = item.split_whitespace().next().unwrap_or("");
    item.trim_start_matches('\\')
}

/// Classes instantiated by fully-qualified name
pub fn instantiations(content: &str) -> Vec<String> {
    NEW_FQCN_RE
        .captures_iter(content)
        .map(|caps| caps[1].trim_start_matches('\\').to_string())
        .collect()
}

/// One `require`/`include` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeTarget {
    pub target: String,
    /// Anchored to the including file's directory (`__DIR__ . '...'`)
    pub anchored: bool,
}

pub fn includes(content: &str) -> Vec<IncludeTarget> {
    INCLUDE_RE
        .captures_iter(content)
        .map(|caps| IncludeTarget {
            target: caps[2].to_string(),
            anchored: caps.get(1).is_some(),
        })
        .collect()
}

/// Candidate project paths for an include, most specific first
pub fn resolve_include(from: &str, include: &IncludeTarget) -> Vec<String> {
    let target = include.target.replace('\\', "/");
    let dir = parent_dir(from);
    let mut candidates = Vec::new();

    let joined = if dir.is_empty() {
        target.trim_start_matches('/').to_string()
    } else {
        format!("{}/{}", dir, target.trim_start_matches('/'))
    };
    if let Some(path) = normalize_relative(&joined) {
        candidates.push(path);
    }

    if !include.anchored {
        if let Some(path) = normalize_relative(target.trim_start_matches('/')) {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
    }
    candidates
}

/// Project files a source file statically depends on
pub fn resolved_dependencies(tree: &SourceTree, path: &str, content: &str) -> BTreeSet<String> {
    let autoload = tree.autoload();
    let mut deps = BTreeSet::new();

    for class in use_imports(content).iter().chain(instantiations(content).iter()) {
        if let Some(file) = autoload.resolve_class(class) {
            if tree.contains(&file) {
                deps.insert(file);
            }
        }
    }

    for include in includes(content) {
        if let Some(file) = resolve_include(path, &include)
            .into_iter()
            .find(|candidate| tree.contains(candidate))
        {
            deps.insert(file);
        }
    }

    deps.remove(path);
    deps
}

/// Include targets of a file that resolve inside the tree
pub fn resolved_includes(tree: &SourceTree, path: &str, content: &str) -> BTreeSet<String> {
    includes(content)
        .iter()
        .filter_map(|include| {
            resolve_include(path, include)
                .into_iter()
                .find(|candidate| tree.contains(candidate))
        })
        .filter(|file| file != path)
        .collect()
}

/// Whether the content reads request input directly
pub fn reads_request(content: &str) -> bool {
    REQUEST_RE.is_match(content)
}

/// Action names dispatched by `case '<action>':` labels
pub fn case_literals(content: &str) -> Vec<String> {
    let mut actions: Vec<String> = CASE_LITERAL_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect();
    actions.sort();
    actions.dedup();
    actions
}

/// Asset paths mentioned in the content
pub fn asset_mentions(content: &str) -> Vec<String> {
    ASSET_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .filter(|mention| !mention.contains("://"))
        .collect()
}

/// Template names passed to rendering helpers
pub fn template_mentions(content: &str) -> Vec<String> {
    TEMPLATE_RE
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Candidate project paths for an asset mention
pub fn resolve_asset(from: &str, mention: &str) -> Vec<String> {
    let mention = mention.trim_start_matches("./");
    let mut candidates = Vec::new();
    let mut push = |path: Option<String>| {
        if let Some(path) = path {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }
    };

    if !mention.starts_with('/') {
        let dir = parent_dir(from);
        if !dir.is_empty() {
            push(normalize_relative(&format!("{}/{}", dir, mention)));
        }
    }
    let rooted = mention.trim_start_matches('/');
    push(normalize_relative(rooted));
    for web_root in ["public", "web", "www", "public_html"] {
        push(normalize_relative(&format!("{}/{}", web_root, rooted)));
    }
    candidates
}
