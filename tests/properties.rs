use proptest::prelude::*;
use pyrefine::core::naming::to_lower_snake;
use pyrefine::{AnalysisConfig, FixOptions, RewriteOutcome, analyze_source, rewrite_source};

/// Top-level statements that always parse on their own.
const PIECES: &[&str] = &[
    "import os",
    "import sys",
    "import requests",
    "from . import sibling",
    "from collections import OrderedDict",
    "x = 1",
    "badName = 2",
    "def compute(a, b):\n    if a and b:\n        return a\n    return b",
    "def one(): return 1",
    "class Holder:\n    def get(self):\n        return 1",
    "s = \"\"\"keep  \n\n\n  this\"\"\"",
    "# a comment",
];

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (
            prop::sample::select(PIECES),
            0usize..4, // blank lines after
            0usize..3, // trailing spaces
        ),
        1..12,
    )
    .prop_map(|parts| {
        let mut out = String::new();
        for (piece, blanks, spaces) in parts {
            out.push_str(piece);
            out.push_str(&" ".repeat(spaces));
            out.push('\n');
            out.push_str(&"\n".repeat(blanks));
        }
        out
    })
}

fn small_file_config() -> AnalysisConfig {
    AnalysisConfig {
        file_size: 8,
        ..AnalysisConfig::default()
    }
}

proptest! {
    #[test]
    fn lower_snake_is_idempotent(name in "[A-Za-z_][A-Za-z0-9_]{0,24}") {
        let once = to_lower_snake(&name);
        prop_assert_eq!(to_lower_snake(&once), once);
    }

    #[test]
    fn rewrite_is_idempotent(src in program(), docstrings: bool, annotate: bool) {
        let opts = FixOptions { add_docstrings: docstrings, annotate_large_files: annotate };
        let cfg = small_file_config();

        let first = rewrite_source(&src, opts, &cfg);
        prop_assert!(first.failures.is_empty(), "{:?}", first.failures);

        let once = first.text(&src).to_string();
        let second = rewrite_source(&once, opts, &cfg);
        prop_assert_eq!(second.outcome, RewriteOutcome::Unchanged);
    }

    #[test]
    fn ordered_import_blocks_are_left_byte_identical(
        stdlib in prop::sample::subsequence(vec!["abc", "json", "os", "re", "sys"], 1..=5),
        third in prop::sample::subsequence(vec!["attr", "numpy", "requests"], 0..=3),
    ) {
        let render = |mods: &[&str]| {
            mods.iter().map(|m| format!("import {m}")).collect::<Vec<_>>().join("\n")
        };
        let mut groups = Vec::new();
        if !stdlib.is_empty() {
            groups.push(render(&stdlib));
        }
        if !third.is_empty() {
            groups.push(render(&third));
        }
        let src = format!("{}\n\nvalue = 1\n", groups.join("\n\n"));

        let out = rewrite_source(&src, FixOptions::default(), &AnalysisConfig::default());
        prop_assert_eq!(out.outcome, RewriteOutcome::Unchanged);
    }

    #[test]
    fn each_branch_adds_exactly_one(branches in 0usize..12, extra_operands in 0usize..6) {
        let mut src = String::from("def f(x):\n");
        for _ in 0..branches {
            src.push_str("    if x:\n        pass\n");
        }
        let operands = vec!["x"; extra_operands + 1].join(" and ");
        src.push_str(&format!("    y = {operands}\n    return y\n"));

        let analysis = analyze_source(&src, &AnalysisConfig::default()).unwrap();
        prop_assert_eq!(analysis.functions[0].complexity, 1 + branches + extra_operands);
    }

    #[test]
    fn analysis_is_deterministic(src in program()) {
        let cfg = AnalysisConfig::default();
        let a = analyze_source(&src, &cfg).unwrap();
        let b = analyze_source(&src, &cfg).unwrap();
        prop_assert_eq!(a, b);
    }
}
