//! Naming-convention analysis
//!
//! Path-only heuristics driven by data tables: regex families for
//! well-known non-essential naming conventions, an extension table, a
//! directory-prefix table, and a whitelist of paths that are always kept.

use regex::Regex;
use tracing::debug;

use super::source_tree::extension;
use super::Analyzer;
use crate::error::{StowawayError, StowawayResult};
use crate::models::{FileAnalysisResult, FileCategory};

/// A named group of regexes sharing one weight
struct FamilySpec {
    name: &'static str,
    weight: u32,
    patterns: &'static [&'static str],
}

const FAMILIES: &[FamilySpec] = &[
    FamilySpec {
        name: "test file",
        weight: 85,
        patterns: &[
            r"(?i)(^|/)tests?/",
            r"(?i)test\.php$",
            r"(?i)(^|/)test[_\-][^/]*$",
            r"(?i)\.(spec|test)\.(js|ts)$",
            r"(?i)(^|/)phpunit\.xml(\.dist)?$",
        ],
    },
    FamilySpec {
        name: "debug file",
        weight: 90,
        patterns: &[
            r"(?i)(^|/)debug[^/]*\.php$",
            r"(?i)(^|/)[^/]*[_\-]debug\.php$",
            r"(?i)(^|/)(phpinfo|info)\.php$",
            r"(?i)(^|/)(check|diagnose|troubleshoot)[_\-][^/]*\.php$",
        ],
    },
    FamilySpec {
        name: "backup file",
        weight: 95,
        patterns: &[
            r"(?i)\.(bak|backup|old|orig|save|swp)$",
            r"~$",
            r"(?i)[_.\-](backup|old|copy)\.[a-z0-9]+$",
            r"(?i)(^|/)copy of ",
        ],
    },
    FamilySpec {
        name: "documentation",
        weight: 70,
        patterns: &[
            r"(?i)(^|/)docs?/",
            r"(?i)(^|/)(readme|changelog|contributing|todo|notes)[^/]*$",
            r"(?i)\.(md|markdown|rst)$",
        ],
    },
    FamilySpec {
        name: "temporary file",
        weight: 90,
        patterns: &[
            r"(?i)\.(tmp|temp|cache|log)$",
            r"(?i)(^|/)(tmp|temp)/",
            r"(?i)(^|/)\.ds_store$",
            r"(?i)(^|/)thumbs\.db$",
        ],
    },
    FamilySpec {
        name: "development script",
        weight: 75,
        patterns: &[
            r"(?i)(^|/)(setup|install|seed|fix|migrate|deploy|cleanup|reset|import|generate)[_\-][^/]*\.(php|sh)$",
            r"(?i)(^|/)scripts?/",
            r"(?i)\.(sh|bat)$",
        ],
    },
    FamilySpec {
        name: "project report",
        weight: 80,
        patterns: &[
            r"(?i)(^|/)[^/]*(report|summary|analysis|audit|status)[^/]*\.(md|txt|html|json|csv)$",
            r"(?i)(^|/)(implementation|progress|phase)[_\-][^/]*\.md$",
        ],
    },
];

/// Extension → weight for extensions that are never served or loaded
const EXTENSIONS: &[(&str, u32)] = &[
    ("log", 85),
    ("bak", 95),
    ("tmp", 90),
    ("orig", 90),
    ("swp", 95),
    ("md", 60),
    ("txt", 50),
    ("csv", 55),
    ("zip", 70),
    ("tar", 70),
    ("gz", 70),
];

/// Directory prefix → weight
const DIRECTORIES: &[(&str, u32)] = &[
    ("tests/", 85),
    ("test/", 85),
    ("docs/", 70),
    ("doc/", 70),
    ("tmp/", 90),
    ("temp/", 90),
    ("logs/", 85),
    ("backup/", 90),
    ("backups/", 90),
    ("old/", 85),
    ("debug/", 90),
    ("scripts/", 70),
];

/// Paths that must stay regardless of naming
const WHITELIST: &[&str] = &[
    r"^(public/)?index\.php$",
    r"^composer\.(json|lock)$",
    r"^package(-lock)?\.json$",
    r"(^|/)\.htaccess$",
    r"^(public/)?robots\.txt$",
    r"^\.env(\.example)?$",
    r"^(database|db)/migrations/",
    r"^config/",
];

const WHITELIST_CONFIDENCE: u32 = 90;
const UNMATCHED_CONFIDENCE: u32 = 25;

struct CompiledFamily {
    name: &'static str,
    weight: u32,
    patterns: Vec<Regex>,
}

/// Classifies files by naming convention alone
pub struct PatternAnalyzer {
    families: Vec<CompiledFamily>,
    whitelist: Vec<Regex>,
}

impl PatternAnalyzer {
    pub const NAME: &'static str = "pattern";

    pub fn new() -> StowawayResult<Self> {
        let families = FAMILIES
            .iter()
            .map(|spec| {
                Ok(CompiledFamily {
                    name: spec.name,
                    weight: spec.weight,
                    patterns: compile_all(spec.patterns)?,
                })
            })
            .collect::<StowawayResult<Vec<_>>>()?;

        Ok(Self {
            families,
            whitelist: compile_all(WHITELIST)?,
        })
    }

    fn extension_weight(path: &str) -> Option<(&'static str, u32)> {
        let ext = extension(path).to_lowercase();
        EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(e, w)| (*e, *w))
    }

    fn directory_weight(path: &str) -> Option<(&'static str, u32)> {
        let lower = path.to_lowercase();
        DIRECTORIES
            .iter()
            .find(|(prefix, _)| lower.starts_with(prefix))
            .map(|(p, w)| (*p, *w))
    }
}

fn compile_all(patterns: &[&str]) -> StowawayResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| StowawayError::Pattern(format!("{}: {}", p, e)))
        })
        .collect()
}

impl Analyzer for PatternAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn analyze(&self, path: &str) -> FileAnalysisResult {
        let builder = FileAnalysisResult::builder(path, Self::NAME);

        if let Some(re) = self.whitelist.iter().find(|re| re.is_match(path)) {
            return builder
                .category(FileCategory::Essential)
                .add_confidence(WHITELIST_CONFIDENCE)
                .reason(format!("Matches essential path pattern: {}", re.as_str()))
                .metadata("pattern_type", "essential")
                .build();
        }

        let mut builder = builder;
        let mut matched: Vec<&str> = Vec::new();
        for family in &self.families {
            if let Some(re) = family.patterns.iter().find(|re| re.is_match(path)) {
                if matched.is_empty() {
                    builder = builder
                        .category(FileCategory::NonEssential)
                        .metadata("pattern_type", family.name);
                }
                builder = builder
                    .raise_confidence(family.weight)
                    .reason(format!("Matches {} pattern: {}", family.name, re.as_str()));
                matched.push(family.name);
            }
        }

        let name_matched = !matched.is_empty();
        for (label, hit) in [
            ("extension", Self::extension_weight(path)),
            ("directory", Self::directory_weight(path)),
        ] {
            let Some((value, weight)) = hit else { continue };
            if name_matched {
                builder = builder.raise_confidence(weight);
            } else {
                builder = builder
                    .category(FileCategory::NonEssential)
                    .raise_confidence(weight)
                    .reason(format!("Non-essential {}: {}", label, value))
                    .metadata_if_absent("pattern_type", label.into());
            }
        }

        if builder.current_category() == FileCategory::Uncertain {
            debug!("No naming pattern matched {}", path);
            builder = builder
                .add_confidence(UNMATCHED_CONFIDENCE)
                .reason("No known naming pattern matched");
        }

        if !matched.is_empty() {
            let families: Vec<String> = matched.iter().map(|s| s.to_string()).collect();
            builder = builder.metadata("matched_families", families);
        }

        builder.build()
    }

    fn priority(&self) -> u8 {
        70
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendedAction;

    fn analyzer() -> PatternAnalyzer {
        PatternAnalyzer::new().unwrap()
    }

    #[test]
    fn test_file_in_tests_dir_is_non_essential() {
        let result = analyzer().analyze("tests/FooTest.php");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.recommended_action(), RecommendedAction::Move);
        assert!(result.confidence_score() >= 80);
        assert!(result.reasons()[0].contains("test file pattern"));
    }

    #[test]
    fn test_max_weight_across_families() {
        // test file (85) and backup file (95)
        let result = analyzer().analyze("tests/FooTest.php.bak");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.confidence_score(), 95);
        assert_eq!(
            result.metadata().get("pattern_type").map(|v| v.to_string()).as_deref(),
            Some("test file")
        );
    }

    #[test]
    fn test_extension_only_raises() {
        // documentation (70) then extension md (60) must not lower it
        let result = analyzer().analyze("NOTES.md");
        assert_eq!(result.confidence_score(), 70);

        // extension alone can decide
        let result = analyzer().analyze("exports/archive.zip");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.confidence_score(), 70);
        assert_eq!(result.reasons(), &["Non-essential extension: zip".to_string()]);
    }

    #[test]
    fn test_whitelist_wins() {
        let result = analyzer().analyze("public/index.php");
        assert_eq!(result.category(), FileCategory::Essential);
        let result = analyzer().analyze("config/debug.php");
        assert_eq!(result.category(), FileCategory::Essential);
    }

    #[test]
    fn test_unmatched_is_uncertain() {
        let result = analyzer().analyze("src/Domain/Pet/Pet.php");
        assert_eq!(result.category(), FileCategory::Uncertain);
        assert_eq!(result.confidence_score(), 25);
    }

    #[test]
    fn test_debug_scripts() {
        for path in ["debug_login.php", "phpinfo.php", "public/check-db.php"] {
            let result = analyzer().analyze(path);
            assert_eq!(result.category(), FileCategory::NonEssential, "{}", path);
            assert!(result.confidence_score() >= 90, "{}", path);
        }
    }
}
