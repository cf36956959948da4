//! Suggestion generation: file size, per-function size and complexity,
//! and duplicate patterns, emitted in that order without cross-suppression.

use serde::{Deserialize, Serialize};

use crate::core::duplicates::DuplicateMatch;
use crate::core::functions::FunctionRecord;
use crate::infra::config::AnalysisConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    SplitFile,
    SplitFunction,
    ReduceComplexity,
    ExtractDuplicate,
}

impl std::fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SuggestionKind::SplitFile => "split_file",
            SuggestionKind::SplitFunction => "split_function",
            SuggestionKind::ReduceComplexity => "reduce_complexity",
            SuggestionKind::ExtractDuplicate => "extract_duplicate",
        };
        f.write_str(s)
    }
}

/// Kind-specific data carried by a suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Payload {
    Function { function_name: String },
    Duplicate { pattern: String, duplicate_line: usize },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub priority: Priority,
    pub message: String,
    pub line: usize,
    pub auto_applicable: bool,
    #[serde(skip_serializing_if = "Payload::is_none")]
    pub payload: Payload,
}

impl Payload {
    pub fn is_none(&self) -> bool {
        matches!(self, Payload::None)
    }
}

pub fn generate_suggestions(
    line_count: usize,
    functions: &[FunctionRecord],
    duplicates: &[DuplicateMatch],
    cfg: &AnalysisConfig,
) -> Vec<Suggestion> {
    let mut out = Vec::new();

    if line_count > cfg.file_size {
        out.push(Suggestion {
            kind: SuggestionKind::SplitFile,
            priority: Priority::High,
            message: format!(
                "File has {line_count} lines. Consider splitting into smaller modules."
            ),
            line: 1,
            auto_applicable: true,
            payload: Payload::None,
        });
    }

    for func in functions {
        if func.line_count > cfg.function_length {
            out.push(Suggestion {
                kind: SuggestionKind::SplitFunction,
                priority: Priority::Medium,
                message: format!(
                    "Function {} has {} lines. Consider breaking it down.",
                    func.name, func.line_count
                ),
                line: func.start_line,
                auto_applicable: false,
                payload: Payload::Function {
                    function_name: func.name.clone(),
                },
            });
        }
        if func.complexity > cfg.complexity {
            out.push(Suggestion {
                kind: SuggestionKind::ReduceComplexity,
                priority: Priority::High,
                message: format!(
                    "Function {} has high complexity ({}). Consider simplifying.",
                    func.name, func.complexity
                ),
                line: func.start_line,
                auto_applicable: false,
                payload: Payload::Function {
                    function_name: func.name.clone(),
                },
            });
        }
    }

    // Flagged applicable although no extraction rewrite exists.
    out.extend(duplicates.iter().map(|dup| Suggestion {
        kind: SuggestionKind::ExtractDuplicate,
        priority: Priority::Medium,
        message: "Duplicate code pattern found. Consider extracting to a function.".to_string(),
        line: dup.first_line,
        auto_applicable: true,
        payload: Payload::Duplicate {
            pattern: dup.pattern(),
            duplicate_line: dup.duplicate_line,
        },
    }));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, line_count: usize, complexity: usize) -> FunctionRecord {
        FunctionRecord {
            name: name.to_string(),
            start_line: 10,
            end_line: 10 + line_count - 1,
            line_count,
            complexity,
            parameter_names: Vec::new(),
            docstring: None,
            called_names: Vec::new(),
            is_method: false,
        }
    }

    #[test]
    fn emits_in_fixed_order() {
        let dup = DuplicateMatch {
            first_line: 3,
            duplicate_line: 40,
            pattern_lines: vec!["a()".into(), "b()".into(), "c()".into()],
        };
        let out = generate_suggestions(
            600,
            &[record("big", 80, 12)],
            &[dup],
            &AnalysisConfig::default(),
        );
        let kinds: Vec<SuggestionKind> = out.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SuggestionKind::SplitFile,
                SuggestionKind::SplitFunction,
                SuggestionKind::ReduceComplexity,
                SuggestionKind::ExtractDuplicate,
            ]
        );
        assert_eq!(out[0].priority, Priority::High);
        assert!(out[0].auto_applicable);
        assert!(!out[1].auto_applicable);
        assert_eq!(
            out[3].payload,
            Payload::Duplicate {
                pattern: "a()\nb()\nc()".into(),
                duplicate_line: 40
            }
        );
    }

    #[test]
    fn thresholds_are_strict() {
        let out = generate_suggestions(
            500,
            &[record("edge", 50, 10)],
            &[],
            &AnalysisConfig::default(),
        );
        assert!(out.is_empty());
    }

    #[test]
    fn payload_serializes_flat() {
        let out = generate_suggestions(10, &[record("f", 60, 1)], &[], &AnalysisConfig::default());
        let v = serde_json::to_value(&out[0]).expect("json");
        assert_eq!(v["kind"], "split_function");
        assert_eq!(v["payload"]["function_name"], "f");
    }
}
