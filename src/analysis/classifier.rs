//! Verdict aggregation
//!
//! Runs every applicable analyzer on a file and reconciles their verdicts:
//! the highest-priority analyzer with a decided (non-Uncertain) verdict
//! wins, ties going to the more confident one. Confidence is the maximum
//! among analyzers agreeing with the winner.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info};

use super::{
    Analyzer, DependencyAnalyzer, FunctionalAnalyzer, PatternAnalyzer, SourceTree, UsageAnalyzer,
};
use crate::error::StowawayResult;
use crate::models::{FileAnalysisResult, FileCategory, MetadataValue};

pub const CLASSIFIER_NAME: &str = "classifier";

/// Runs a set of analyzers and reconciles their verdicts
pub struct Classifier {
    analyzers: Vec<Box<dyn Analyzer>>,
}

impl Classifier {
    /// Analyzers are consulted in descending priority
    pub fn new(mut analyzers: Vec<Box<dyn Analyzer>>) -> Self {
        analyzers.sort_by(|a, b| b.priority().cmp(&a.priority()));
        Self { analyzers }
    }

    /// The four standard analyzers over one source tree
    pub fn standard(tree: Arc<SourceTree>) -> StowawayResult<Self> {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(DependencyAnalyzer::new(Arc::clone(&tree))),
            Box::new(UsageAnalyzer::new(Arc::clone(&tree))),
            Box::new(FunctionalAnalyzer::new()),
            Box::new(PatternAnalyzer::new()?),
        ];
        Ok(Self::new(analyzers))
    }

    pub fn analyzer_names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Classify one file
    pub fn classify(&self, path: &str) -> FileAnalysisResult {
        let verdicts: Vec<Verdict> = self
            .analyzers
            .iter()
            .filter(|a| a.can_analyze(path))
            .map(|a| Verdict {
                priority: a.priority(),
                result: a.analyze(path),
            })
            .collect();

        let result = reconcile(path, verdicts);
        debug!(
            "{} -> {} ({}%)",
            path,
            result.category(),
            result.confidence_score()
        );
        result
    }

    /// Classify many files in parallel
    pub fn classify_all(&self, files: &[String]) -> BTreeMap<String, FileAnalysisResult> {
        let results: BTreeMap<String, FileAnalysisResult> = files
            .par_iter()
            .map(|path| (path.clone(), self.classify(path)))
            .collect();

        let candidates = results.values().filter(|r| r.is_move_candidate()).count();
        info!(
            "Classified {} files, {} move candidates",
            results.len(),
            candidates
        );
        results
    }
}

/// One analyzer's verdict with the priority it was produced at
#[derive(Debug, Clone)]
pub struct Verdict {
    pub priority: u8,
    pub result: FileAnalysisResult,
}

/// Merge several analyzers' verdicts for the same file into one
pub fn reconcile(path: &str, verdicts: Vec<Verdict>) -> FileAnalysisResult {
    let winner = verdicts
        .iter()
        .filter(|v| v.result.category() != FileCategory::Uncertain)
        .max_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(a.result.confidence_score().cmp(&b.result.confidence_score()))
        });

    let (category, confidence, reconciled_by) = match winner {
        Some(winner) => {
            let category = winner.result.category();
            let confidence = verdicts
                .iter()
                .filter(|v| v.result.category() == category)
                .map(|v| v.result.confidence_score())
                .max()
                .unwrap_or(0);
            (category, confidence, winner.result.analyzer().to_string())
        }
        None => {
            let confidence = verdicts
                .iter()
                .map(|v| v.result.confidence_score())
                .max()
                .unwrap_or(0);
            (FileCategory::Uncertain, confidence, "none".to_string())
        }
    };

    let mut builder = FileAnalysisResult::builder(path, CLASSIFIER_NAME)
        .category(category)
        .add_confidence(u32::from(confidence));

    // Winner's metadata first so it takes precedence
    let mut ordered: Vec<&Verdict> = verdicts.iter().collect();
    if let Some(winner) = winner {
        ordered.sort_by_key(|v| !std::ptr::eq(*v, winner));
    }
    for verdict in &ordered {
        for (key, value) in verdict.result.metadata() {
            builder = builder.metadata_if_absent(key.clone(), value.clone());
        }
    }

    let mut summary = Vec::with_capacity(verdicts.len());
    for verdict in &verdicts {
        let result = &verdict.result;
        for reason in result.reasons() {
            builder = builder.reason(format!("[{}] {}", result.analyzer(), reason));
        }
        builder = builder
            .dependencies(result.dependencies().iter().cloned())
            .references(result.references().iter().cloned());
        summary.push(format!(
            "{}: {} ({}%)",
            result.analyzer(),
            result.category().as_str(),
            result.confidence_score()
        ));
    }

    builder
        .metadata("verdicts", MetadataValue::List(summary))
        .metadata("reconciled_by", reconciled_by)
        .build()
}

/// Results recommending a move, in path order
pub fn move_candidates(
    results: &BTreeMap<String, FileAnalysisResult>,
) -> Vec<&FileAnalysisResult> {
    results.values().filter(|r| r.is_move_candidate()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        priority: u8,
        category: FileCategory,
        confidence: u32,
    }

    impl Analyzer for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn analyze(&self, path: &str) -> FileAnalysisResult {
            FileAnalysisResult::builder(path, self.name)
                .category(self.category)
                .add_confidence(self.confidence)
                .reason(format!("{} says so", self.name))
                .metadata("source", self.name)
                .build()
        }

        fn priority(&self) -> u8 {
            self.priority
        }
    }

    fn fixed(name: &'static str, priority: u8, category: FileCategory, confidence: u32) -> Box<dyn Analyzer> {
        Box::new(Fixed {
            name,
            priority,
            category,
            confidence,
        })
    }

    #[test]
    fn test_highest_priority_decided_verdict_wins() {
        let classifier = Classifier::new(vec![
            fixed("pattern", 70, FileCategory::NonEssential, 90),
            fixed("dependency", 90, FileCategory::Essential, 30),
            fixed("functional", 75, FileCategory::Essential, 60),
        ]);
        let result = classifier.classify("src/Debug/Bar.php");
        assert_eq!(result.category(), FileCategory::Essential);
        // max among analyzers agreeing with the winner
        assert_eq!(result.confidence_score(), 60);
        assert_eq!(
            result.metadata().get("reconciled_by"),
            Some(&MetadataValue::Text("dependency".into()))
        );
        assert_eq!(
            result.metadata().get("source"),
            Some(&MetadataValue::Text("dependency".into()))
        );
        assert_eq!(result.analyzer(), CLASSIFIER_NAME);
    }

    #[test]
    fn test_uncertain_verdicts_do_not_win() {
        let classifier = Classifier::new(vec![
            fixed("dependency", 90, FileCategory::Uncertain, 10),
            fixed("usage", 80, FileCategory::Uncertain, 20),
            fixed("pattern", 70, FileCategory::NonEssential, 85),
        ]);
        let result = classifier.classify("tests/FooTest.php");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.confidence_score(), 85);
        assert!(result.is_move_candidate());
        assert!(result
            .reasons()
            .iter()
            .any(|r| r == "[pattern] pattern says so"));
    }

    #[test]
    fn test_all_uncertain() {
        let classifier = Classifier::new(vec![
            fixed("dependency", 90, FileCategory::Uncertain, 10),
            fixed("pattern", 70, FileCategory::Uncertain, 25),
        ]);
        let result = classifier.classify("notes.bin");
        assert_eq!(result.category(), FileCategory::Uncertain);
        assert_eq!(result.confidence_score(), 25);
        assert_eq!(
            result.metadata().get("reconciled_by"),
            Some(&MetadataValue::Text("none".into()))
        );
    }

    #[test]
    fn test_same_priority_tie_goes_to_confidence() {
        let classifier = Classifier::new(vec![
            fixed("a", 50, FileCategory::Essential, 40),
            fixed("b", 50, FileCategory::NonEssential, 70),
        ]);
        let result = classifier.classify("x.php");
        assert_eq!(result.category(), FileCategory::NonEssential);
        assert_eq!(result.confidence_score(), 70);
    }

    #[test]
    fn test_classify_all_and_candidates() {
        let classifier = Classifier::new(vec![fixed("pattern", 70, FileCategory::NonEssential, 80)]);
        let files = vec!["a.md".to_string(), "b.md".to_string()];
        let results = classifier.classify_all(&files);
        assert_eq!(results.len(), 2);
        assert_eq!(move_candidates(&results).len(), 2);
    }
}
