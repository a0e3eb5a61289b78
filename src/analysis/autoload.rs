//! Autoload configuration
//!
//! Reads the PSR-4 namespace map, `files` list and `classmap` roots declared
//! under `autoload` in the project's `composer.json`. Development-only
//! `autoload-dev` roots are deliberately ignored: test namespaces must not
//! make test files look load-bearing.

use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::paths::normalize_relative;

/// One namespace prefix mapped to a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Psr4Root {
    /// Namespace prefix without the trailing separator, e.g. `App`
    pub namespace: String,
    /// Project-relative directory, empty for the project root
    pub directory: String,
}

/// Namespace → directory map from the dependency manifest
#[derive(Debug, Clone, Default)]
pub struct AutoloadMap {
    psr4: Vec<Psr4Root>,
    files: Vec<String>,
    classmap: Vec<String>,
}

impl AutoloadMap {
    /// Load the map from a JSON manifest in the project root
    ///
    /// A missing or unparsable manifest yields an empty map.
    pub fn load(project_root: &Path, manifest_name: &str) -> Self {
        let path = project_root.join(manifest_name);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(_) => {
                debug!("No autoload manifest at {}", path.display());
                return Self::default();
            }
        };

        match serde_json::from_str::<Value>(&contents) {
            Ok(value) => Self::from_manifest(&value),
            Err(e) => {
                warn!("Ignoring unparsable {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Build the map from an already-parsed manifest
    pub fn from_manifest(manifest: &Value) -> Self {
        let mut map = Self::default();
        let Some(autoload) = manifest.get("autoload") else {
            return map;
        };

        if let Some(psr4) = autoload.get("psr-4").and_then(Value::as_object) {
            for (namespace, dirs) in psr4 {
                let namespace = namespace.trim_end_matches('\\').to_string();
                for dir in string_or_list(dirs) {
                    if let Some(directory) = normalize_relative(&dir) {
                        map.psr4.push(Psr4Root {
                            namespace: namespace.clone(),
                            directory,
                        });
                    }
                }
            }
        }

        if let Some(files) = autoload.get("files") {
            map.files = string_or_list(files)
                .iter()
                .filter_map(|f| normalize_relative(f))
                .collect();
        }

        if let Some(classmap) = autoload.get("classmap") {
            map.classmap = string_or_list(classmap)
                .iter()
                .filter_map(|f| normalize_relative(f))
                .collect();
        }

        // Longest namespace first so resolution picks the most specific root
        map.psr4
            .sort_by(|a, b| b.namespace.len().cmp(&a.namespace.len()));
        map
    }

    pub fn psr4_roots(&self) -> &[Psr4Root] {
        &self.psr4
    }

    pub fn is_empty(&self) -> bool {
        self.psr4.is_empty() && self.files.is_empty() && self.classmap.is_empty()
    }

    /// The PSR-4 root containing a path, if any
    pub fn root_for(&self, path: &str) -> Option<&Psr4Root> {
        self.psr4.iter().find(|root| {
            if root.directory.is_empty() {
                path.ends_with(".php")
            } else {
                is_under(path, &root.directory)
            }
        })
    }

    /// Whether the autoloader would load this path
    pub fn is_autoloaded(&self, path: &str) -> bool {
        self.root_for(path).is_some()
            || self.files.iter().any(|f| f == path)
            || self.classmap.iter().any(|dir| dir == path || is_under(path, dir))
    }

    /// Map a fully-qualified class name onto a project-relative file path
    pub fn resolve_class(&self, class: &str) -> Option<String> {
        let class = class.trim_start_matches('\\');
        self.psr4.iter().find_map(|root| {
            let rest = if root.namespace.is_empty() {
                class
            } else {
                class
                    .strip_prefix(&root.namespace)?
                    .strip_prefix('\\')?
            };
            let relative = format!("{}.php", rest.replace('\\', "/"));
            if root.directory.is_empty() {
                Some(relative)
            } else {
                Some(format!("{}/{}", root.directory, relative))
            }
        })
    }
}

/// Whether `path` lies inside directory `dir`
pub fn is_under(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .map(|rest| rest.starts_with('/'))
        .unwrap_or(false)
}

fn string_or_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn composer() -> Value {
        json!({
            "autoload": {
                "psr-4": {
                    "App\\": "src/",
                    "App\\Legacy\\": ["lib/legacy/"]
                },
                "files": ["src/helpers.php"],
                "classmap": ["database/"]
            },
            "autoload-dev": {
                "psr-4": { "Tests\\": "tests/" }
            }
        })
    }

    #[test]
    fn test_membership() {
        let map = AutoloadMap::from_manifest(&composer());
        assert!(map.is_autoloaded("src/Domain/Pet/Pet.php"));
        assert!(map.is_autoloaded("lib/legacy/Old.php"));
        assert!(map.is_autoloaded("database/seeds/PetSeeder.php"));
        assert!(!map.is_autoloaded("tests/FooTest.php"));
        assert!(!map.is_autoloaded("srcfoo/Bar.php"));
    }

    #[test]
    fn test_resolve_class_prefers_longest_namespace() {
        let map = AutoloadMap::from_manifest(&composer());
        assert_eq!(
            map.resolve_class("\\App\\Domain\\Pet\\Pet").as_deref(),
            Some("src/Domain/Pet/Pet.php")
        );
        assert_eq!(
            map.resolve_class("App\\Legacy\\Mailer").as_deref(),
            Some("lib/legacy/Mailer.php")
        );
        assert_eq!(map.resolve_class("Vendor\\Thing"), None);
    }

    #[test]
    fn test_missing_autoload_section() {
        let map = AutoloadMap::from_manifest(&json!({"name": "acme/app"}));
        assert!(map.is_empty());
    }
}
