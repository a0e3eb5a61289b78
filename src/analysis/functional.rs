//! Functional role analysis
//!
//! Infers what a file is for from the shape of its path alone: its
//! structural role, the environment it serves and, for loose scripts, what
//! kind of utility it is.

use std::fmt;

use super::source_tree::{extension, file_name, parent_dir};
use super::tokens;
use super::Analyzer;
use crate::models::{FileAnalysisResult, FileCategory};

/// Structural role of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Domain,
    ApplicationService,
    Infrastructure,
    Controller,
    Migration,
    Seed,
    Stylesheet,
    Javascript,
    Template,
    WebEntry,
    Test,
    Config,
    Documentation,
    Script,
    Other,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::ApplicationService => "application_service",
            Self::Infrastructure => "infrastructure",
            Self::Controller => "controller",
            Self::Migration => "migration",
            Self::Seed => "seed",
            Self::Stylesheet => "stylesheet",
            Self::Javascript => "javascript",
            Self::Template => "template",
            Self::WebEntry => "web_entry",
            Self::Test => "test",
            Self::Config => "config",
            Self::Documentation => "documentation",
            Self::Script => "script",
            Self::Other => "other",
        }
    }

    /// Roles the application cannot run without
    pub fn is_core(self) -> bool {
        matches!(
            self,
            Self::Domain
                | Self::ApplicationService
                | Self::Infrastructure
                | Self::Controller
                | Self::Migration
        )
    }

    /// Infer the role from path shape
    pub fn from_path(path: &str) -> Self {
        let lower = path.to_lowercase();
        let ext = extension(&lower).to_string();
        let name = file_name(&lower).to_string();
        let dirs: Vec<&str> = parent_dir(&lower).split('/').collect();
        let in_dir = |names: &[&str]| dirs.iter().any(|d| names.contains(d));

        if in_dir(&["tests", "test", "spec"])
            || name.ends_with("test.php")
            || name.ends_with(".test.js")
            || name.ends_with(".spec.js")
        {
            Self::Test
        } else if tokens::is_migration(path) {
            Self::Migration
        } else if in_dir(&["seeds", "seeders", "fixtures"]) || name.contains("seeder") {
            Self::Seed
        } else if in_dir(&["docs", "doc"])
            || (matches!(ext.as_str(), "md" | "markdown" | "rst" | "txt") && name != "robots.txt")
        {
            Self::Documentation
        } else if in_dir(&["domain", "entity", "entities", "model", "models"]) {
            Self::Domain
        } else if in_dir(&["application", "service", "services", "usecase", "usecases"]) {
            Self::ApplicationService
        } else if in_dir(&["infrastructure", "repository", "repositories", "persistence", "database"]) {
            Self::Infrastructure
        } else if in_dir(&["controller", "controllers", "handlers", "http", "api"])
            || name.ends_with("controller.php")
        {
            Self::Controller
        } else if ConfigType::from_path(path).is_some() {
            Self::Config
        } else if matches!(ext.as_str(), "css" | "scss" | "sass" | "less") {
            Self::Stylesheet
        } else if matches!(ext.as_str(), "js" | "mjs" | "ts") {
            Self::Javascript
        } else if tokens::is_template(path) || matches!(ext.as_str(), "twig" | "phtml" | "tpl" | "html") {
            Self::Template
        } else if ext == "php" && matches!(parent_dir(&lower), "" | "public" | "web" | "www" | "public_html") {
            Self::WebEntry
        } else if in_dir(&["scripts", "script", "bin", "tools"])
            || matches!(ext.as_str(), "sh" | "bat" | "py")
        {
            Self::Script
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment a file serves, from keywords in its path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Both,
    Unknown,
}

impl Environment {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Both => "both",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_path(path: &str) -> Self {
        let tokens = path_tokens(path);
        let dev = tokens.iter().any(|t| DEVELOPMENT_KEYWORDS.contains(&t.as_str()));
        let prod = tokens.iter().any(|t| PRODUCTION_KEYWORDS.contains(&t.as_str()));
        match (dev, prod) {
            (true, false) => Self::Development,
            (false, true) => Self::Production,
            (true, true) => Self::Both,
            (false, false) => Self::Unknown,
        }
    }
}

const DEVELOPMENT_KEYWORDS: &[&str] = &[
    "test", "tests", "debug", "dev", "development", "mock", "mocks", "fixture", "fixtures",
    "sample", "example", "demo", "scratch", "tmp", "temp", "backup", "old", "bak", "phpinfo",
    "seed", "seeder", "benchmark", "profiler", "playground",
];

const PRODUCTION_KEYWORDS: &[&str] = &[
    "prod", "production", "public", "dist", "release", "live", "index", "bootstrap", "router",
    "kernel",
];

/// Lowercased alphanumeric words of a path, splitting camelCase too
fn path_tokens(path: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for ch in path.chars() {
        if !ch.is_ascii_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if ch.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = ch.is_ascii_lowercase() || ch.is_ascii_digit();
        current.push(ch.to_ascii_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Kind of configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigType {
    Composer,
    Environment,
    WebServer,
    Application,
    Build,
    Testing,
    Lint,
    Other,
}

impl ConfigType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::Environment => "environment",
            Self::WebServer => "web_server",
            Self::Application => "application",
            Self::Build => "build",
            Self::Testing => "testing",
            Self::Lint => "lint",
            Self::Other => "other",
        }
    }

    /// Config types whose absence breaks the running application
    pub fn is_always_essential(self) -> bool {
        matches!(
            self,
            Self::Composer | Self::Environment | Self::WebServer | Self::Application
        )
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_lowercase();
        let name = file_name(&lower);
        let ext = extension(name);
        let dir = parent_dir(&lower);

        let kind = if name.starts_with("composer.") {
            Self::Composer
        } else if name == ".env" || name.starts_with(".env.") {
            Self::Environment
        } else if matches!(name, ".htaccess" | "web.config" | "nginx.conf" | ".user.ini") {
            Self::WebServer
        } else if dir.split('/').any(|d| d == "config")
            || matches!(name, "config.php" | "settings.php")
        {
            Self::Application
        } else if (name.starts_with("package") && ext == "json")
            || name.starts_with("webpack.")
            || name.starts_with("vite.config.")
            || name == "yarn.lock"
        {
            Self::Build
        } else if name.starts_with("phpunit.") || name.starts_with("jest.config.") {
            Self::Testing
        } else if name == ".editorconfig"
            || name.starts_with(".php-cs-fixer")
            || name.starts_with("phpstan.")
            || name.starts_with(".eslintrc")
        {
            Self::Lint
        } else if matches!(ext, "ini" | "yml" | "yaml" | "neon" | "xml" | "toml") {
            Self::Other
        } else {
            return None;
        };
        Some(kind)
    }
}

/// What a loose script is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtilitySubtype {
    Setup,
    Deploy,
    Test,
    Debug,
    Fix,
    Data,
    Maintenance,
}

impl UtilitySubtype {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Deploy => "deploy",
            Self::Test => "test",
            Self::Debug => "debug",
            Self::Fix => "fix",
            Self::Data => "data",
            Self::Maintenance => "maintenance",
        }
    }

    /// Match on substrings of the file name; debugging wins over the rest
    pub fn from_path(path: &str) -> Option<Self> {
        let name = file_name(path).to_lowercase();
        SUBTYPES
            .iter()
            .find(|(_, needles)| needles.iter().any(|n| name.contains(n)))
            .map(|(subtype, _)| *subtype)
    }
}

const SUBTYPES: &[(UtilitySubtype, &[&str])] = &[
    (
        UtilitySubtype::Debug,
        &["debug", "phpinfo", "dump", "trace", "troubleshoot", "diagnos"],
    ),
    (UtilitySubtype::Test, &["test", "check", "verify"]),
    (UtilitySubtype::Fix, &["fix", "repair", "patch"]),
    (UtilitySubtype::Setup, &["setup", "install", "init"]),
    (UtilitySubtype::Deploy, &["deploy", "release", "build"]),
    (UtilitySubtype::Data, &["seed", "import", "export", "fixture"]),
    (
        UtilitySubtype::Maintenance,
        &["clean", "purge", "backup", "reset", "cache"],
    ),
];

const WEIGHT_ENTRY: u32 = 40;
const WEIGHT_CORE_ROLE: u32 = 35;
const WEIGHT_ESSENTIAL_CONFIG: u32 = 40;
const WEIGHT_PRODUCTION: u32 = 20;
const WEIGHT_DEVELOPMENT: u32 = 25;
const WEIGHT_DEV_ROLE: u32 = 30;
const WEIGHT_DEBUG_TOOL: u32 = 30;
const WEIGHT_KNOWN_ROLE: u32 = 10;
const CONFIDENCE_FLOOR: u32 = 10;

/// Classifies files by their functional role
#[derive(Debug, Default)]
pub struct FunctionalAnalyzer;

impl FunctionalAnalyzer {
    pub const NAME: &'static str = "functional";

    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for FunctionalAnalyzer {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn analyze(&self, path: &str) -> FileAnalysisResult {
        let role = Role::from_path(path);
        let environment = Environment::from_path(path);
        let config_type = ConfigType::from_path(path);
        let subtype = match role {
            Role::Script | Role::WebEntry | Role::Other => UtilitySubtype::from_path(path),
            _ => None,
        };
        let entry_point = tokens::is_entry_point(path);

        let mut essential_score = 0;
        let mut essential_reasons = Vec::new();
        if entry_point {
            essential_score += WEIGHT_ENTRY;
            essential_reasons.push("Application entry point".to_string());
        }
        if role.is_core() {
            essential_score += WEIGHT_CORE_ROLE;
            essential_reasons.push(format!("Core {} role", role));
        }
        if let Some(kind) = config_type.filter(|k| k.is_always_essential()) {
            essential_score += WEIGHT_ESSENTIAL_CONFIG;
            essential_reasons.push(format!("Essential {} configuration", kind.as_str()));
        }
        if environment == Environment::Production {
            essential_score += WEIGHT_PRODUCTION;
            essential_reasons.push("Serves the production environment".to_string());
        }

        let mut non_essential_score = 0;
        let mut non_essential_reasons = Vec::new();
        if environment == Environment::Development {
            non_essential_score += WEIGHT_DEVELOPMENT;
            non_essential_reasons.push("Development-only keywords in path".to_string());
        }
        if matches!(role, Role::Test | Role::Documentation) {
            non_essential_score += WEIGHT_DEV_ROLE;
            non_essential_reasons.push(format!("{} role is not needed at runtime", role));
        }
        if subtype == Some(UtilitySubtype::Debug) {
            non_essential_score += WEIGHT_DEBUG_TOOL;
            non_essential_reasons.push("Debugging or troubleshooting tool".to_string());
        }

        let builder = FileAnalysisResult::builder(path, Self::NAME);
        let builder = if !essential_reasons.is_empty() {
            essential_reasons
                .into_iter()
                .fold(builder.category(FileCategory::Essential), |b, r| b.reason(r))
                .add_confidence(essential_score)
        } else if !non_essential_reasons.is_empty() {
            non_essential_reasons
                .into_iter()
                .fold(builder.category(FileCategory::NonEssential), |b, r| b.reason(r))
                .add_confidence(non_essential_score)
        } else {
            let weight = if role == Role::Other { 0 } else { WEIGHT_KNOWN_ROLE };
            builder
                .category(FileCategory::Uncertain)
                .add_confidence(weight)
                .reason(format!("No decisive functional signal for {} role", role))
        };

        let mut builder = builder
            .confidence_floor(CONFIDENCE_FLOOR)
            .metadata("role", role.as_str())
            .metadata("environment", environment.as_str())
            .metadata("entry_point", entry_point);
        if let Some(kind) = config_type {
            builder = builder.metadata("config_type", kind.as_str());
        }
        if let Some(subtype) = subtype {
            builder = builder.metadata("utility_subtype", subtype.as_str());
        }
        builder.build()
    }

    fn priority(&self) -> u8 {
        75
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_from_path() {
        assert_eq!(Role::from_path("src/Domain/Pet/Pet.php"), Role::Domain);
        assert_eq!(Role::from_path("src/Application/PetService.php"), Role::ApplicationService);
        assert_eq!(Role::from_path("src/Infrastructure/PdoPetRepository.php"), Role::Infrastructure);
        assert_eq!(Role::from_path("src/Http/PetController.php"), Role::Controller);
        assert_eq!(Role::from_path("database/migrations/001_pets.sql"), Role::Migration);
        assert_eq!(Role::from_path("database/seeds/PetSeeder.php"), Role::Seed);
        assert_eq!(Role::from_path("public/css/app.css"), Role::Stylesheet);
        assert_eq!(Role::from_path("public/js/app.js"), Role::Javascript);
        assert_eq!(Role::from_path("templates/pets/show.php"), Role::Template);
        assert_eq!(Role::from_path("login.php"), Role::WebEntry);
        assert_eq!(Role::from_path("tests/Unit/PetTest.php"), Role::Test);
        assert_eq!(Role::from_path("config/database.php"), Role::Config);
        assert_eq!(Role::from_path("README.md"), Role::Documentation);
        assert_eq!(Role::from_path("scripts/deploy.sh"), Role::Script);
        assert_eq!(Role::from_path("storage/app.bin"), Role::Other);
    }

    #[test]
    fn test_environment_keywords() {
        assert_eq!(Environment::from_path("tests/DebugHelper.php"), Environment::Development);
        assert_eq!(Environment::from_path("public/css/app.css"), Environment::Production);
        assert_eq!(Environment::from_path("public/test.php"), Environment::Both);
        assert_eq!(Environment::from_path("src/Domain/Pet.php"), Environment::Unknown);
        assert_eq!(path_tokens("src/DebugBar.php"), vec!["src", "debug", "bar", "php"]);
    }

    #[test]
    fn test_core_role_is_essential() {
        let result = FunctionalAnalyzer::new().analyze("src/Domain/Pet/Pet.php");
        assert_eq!(result.category(), FileCategory::Essential);
        assert_eq!(result.confidence_score(), 35);
    }

    #[test]
    fn test_always_essential_config() {
        let result = FunctionalAnalyzer::new().analyze("composer.json");
        assert_eq!(result.category(), FileCategory::Essential);
        let result = FunctionalAnalyzer::new().analyze(".env");
        assert_eq!(result.category(), FileCategory::Essential);
    }

    #[test]
    fn test_development_files_are_non_essential() {
        let result = FunctionalAnalyzer::new().analyze("tests/Unit/PetTest.php");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.confidence_score(), 55);

        let result = FunctionalAnalyzer::new().analyze("dump_session.php");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(
            result.metadata().get("utility_subtype").map(|v| v.to_string()).as_deref(),
            Some("debug")
        );
    }

    #[test]
    fn test_undecided_file_gets_floor() {
        let result = FunctionalAnalyzer::new().analyze("storage/app.bin");
        assert_eq!(result.category(), FileCategory::Uncertain);
        assert_eq!(result.confidence_score(), 10);
    }
}
