//! Split planning for large modules.
//!
//! Proposes sibling files for the module's top-level functions, its large
//! classes, and its module-level assignments. Definitions are copied
//! verbatim; references between moved definitions are not rewritten, so a
//! plan is advice and not a behavior-preserving refactor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::{AppContext, SplitArgs};
use crate::core::syntax::{NodeKind, ParseFailure, SourceParser, SyntaxNode};
use crate::infra::config::{AnalysisConfig, load_config};
use crate::infra::io::{read_source, write_atomic};
use crate::infra::line_index::PositionIndex;
use crate::parsers::PythonParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlannedKind {
    Utilities,
    Class,
    Constants,
}

/// One proposed output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub kind: PlannedKind,
    /// Names of the definitions copied into the file.
    pub members: Vec<String>,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitPlan {
    pub source: PathBuf,
    pub files: Vec<PlannedFile>,
}

impl SplitPlan {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A definition or statement copied out of the module.
struct Copied {
    names: Vec<String>,
    text: String,
}

#[derive(Default)]
struct TopLevel {
    imports: Vec<String>,
    functions: Vec<Copied>,
    /// Classes with their line counts.
    classes: Vec<(Copied, usize)>,
    constants: Vec<Copied>,
}

struct Draft {
    kind: PlannedKind,
    header: String,
    members: Vec<String>,
    blocks: Vec<String>,
}

pub fn plan_split(
    path: &Path,
    text: &str,
    cfg: &AnalysisConfig,
) -> Result<SplitPlan, ParseFailure> {
    plan_with(&PythonParser::new(), path, text, cfg)
}

#[instrument(level = "debug", skip(parser, text, cfg), fields(path = %path.display()))]
pub fn plan_with(
    parser: &dyn SourceParser,
    path: &Path,
    text: &str,
    cfg: &AnalysisConfig,
) -> Result<SplitPlan, ParseFailure> {
    let root = parser.parse(text)?;
    let pos = PositionIndex::new(text);
    let top = collect_top_level(&root, &pos);

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    let dir = path.parent().unwrap_or_else(|| Path::new(""));

    // Keyed by output file name; class names that lowercase alike share a file.
    let mut drafts: IndexMap<String, Draft> = IndexMap::new();

    if !top.functions.is_empty() {
        let draft = drafts
            .entry(format!("{stem}_utils.py"))
            .or_insert_with(|| Draft {
                kind: PlannedKind::Utilities,
                header: "\"\"\"Utility functions.\"\"\"".to_string(),
                members: Vec::new(),
                blocks: Vec::new(),
            });
        for func in top.functions {
            draft.members.extend(func.names);
            draft.blocks.push(func.text);
        }
    }

    for (class, line_count) in top.classes {
        if line_count <= cfg.split_class_length {
            continue;
        }
        let Some(name) = class.names.first().cloned() else {
            continue;
        };
        let draft = drafts
            .entry(format!("{stem}_{}.py", name.to_lowercase()))
            .or_insert_with(|| Draft {
                kind: PlannedKind::Class,
                header: format!("\"\"\"{name} class module.\"\"\""),
                members: Vec::new(),
                blocks: Vec::new(),
            });
        draft.members.push(name);
        draft.blocks.push(class.text);
    }

    if !top.constants.is_empty() {
        let draft = drafts
            .entry(format!("{stem}_constants.py"))
            .or_insert_with(|| Draft {
                kind: PlannedKind::Constants,
                header: "\"\"\"Module constants.\"\"\"".to_string(),
                members: Vec::new(),
                blocks: Vec::new(),
            });
        for constant in top.constants {
            draft.members.extend(constant.names);
            draft.blocks.push(constant.text);
        }
    }

    let files: Vec<PlannedFile> = drafts
        .into_iter()
        .map(|(name, draft)| PlannedFile {
            path: dir.join(name),
            kind: draft.kind,
            contents: render(&draft, &top.imports),
            members: draft.members,
        })
        .collect();

    debug!(files = files.len(), "split planned");
    Ok(SplitPlan {
        source: path.to_path_buf(),
        files,
    })
}

fn collect_top_level(root: &SyntaxNode, pos: &PositionIndex) -> TopLevel {
    let mut top = TopLevel::default();

    for stmt in &root.children {
        let node = definition_of(stmt);
        match &node.kind {
            NodeKind::FunctionDef(def) => top.functions.push(Copied {
                names: vec![def.name.clone()],
                text: span_text(pos, def.outer_start_line, node.span.end_line),
            }),
            NodeKind::ClassDef(def) => top.classes.push((
                Copied {
                    names: vec![def.name.clone()],
                    text: span_text(pos, def.outer_start_line, node.span.end_line),
                },
                node.span.line_count(),
            )),
            NodeKind::Import(_) => top
                .imports
                .extend(pos.lines_between(node.span.start_line, node.span.end_line)),
            NodeKind::Assign => {
                let names = node
                    .walk()
                    .filter_map(|n| match &n.kind {
                        NodeKind::StoreName(name) => Some(name.clone()),
                        NodeKind::Module
                        | NodeKind::FunctionDef(_)
                        | NodeKind::ClassDef(_)
                        | NodeKind::If
                        | NodeKind::While
                        | NodeKind::For { .. }
                        | NodeKind::Try
                        | NodeKind::ExceptHandler
                        | NodeKind::With { .. }
                        | NodeKind::BoolOp { .. }
                        | NodeKind::Call { .. }
                        | NodeKind::Import(_)
                        | NodeKind::Assign
                        | NodeKind::Lambda
                        | NodeKind::Other(_) => None,
                    })
                    .collect();
                top.constants.push(Copied {
                    names,
                    text: span_text(pos, node.span.start_line, node.span.end_line),
                });
            }
            NodeKind::Module
            | NodeKind::If
            | NodeKind::While
            | NodeKind::For { .. }
            | NodeKind::Try
            | NodeKind::ExceptHandler
            | NodeKind::With { .. }
            | NodeKind::BoolOp { .. }
            | NodeKind::Call { .. }
            | NodeKind::StoreName(_)
            | NodeKind::Lambda
            | NodeKind::Other(_) => {}
        }
    }
    top
}

/// The `def`/`class` wrapped by a decorator list, or the statement itself.
fn definition_of(stmt: &SyntaxNode) -> &SyntaxNode {
    if !matches!(stmt.kind, NodeKind::Other("decorated_definition")) {
        return stmt;
    }
    stmt.children
        .iter()
        .find(|c| matches!(c.kind, NodeKind::FunctionDef(_) | NodeKind::ClassDef(_)))
        .unwrap_or(stmt)
}

fn span_text(pos: &PositionIndex, start_line: usize, end_line: usize) -> String {
    pos.lines_between(start_line, end_line).join("\n")
}

fn render(draft: &Draft, imports: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&draft.header);
    out.push_str("\n\n");

    let separator = match draft.kind {
        PlannedKind::Utilities | PlannedKind::Class => {
            if !imports.is_empty() {
                out.push_str(&imports.join("\n"));
                out.push_str("\n\n");
            }
            "\n\n"
        }
        PlannedKind::Constants => "\n",
    };

    out.push_str(&draft.blocks.join(separator));
    out.push('\n');
    out
}

/// Print the plan for one file; with `--write`, create the proposed files.
pub fn run(args: SplitArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let text = read_source(&args.file)?;
    let plan = plan_split(&args.file, &text, &config.analysis)
        .with_context(|| format!("cannot plan a split for {}", args.file.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&plan).context("serialize split plan")?;
        println!("{json}");
    } else if plan.is_empty() {
        if !ctx.quiet {
            println!("Nothing to split in {}", args.file.display());
        }
    } else {
        for file in &plan.files {
            let header = format!("==> {} ({})", file.path.display(), file.members.join(", "));
            if ctx.no_color {
                println!("{header}");
            } else {
                println!("{}", header.bold());
            }
            println!("{}", file.contents);
        }
    }

    if args.write {
        write_plan(&plan, ctx)?;
    }
    Ok(())
}

fn write_plan(plan: &SplitPlan, ctx: &AppContext) -> Result<()> {
    if let Some(existing) = plan.files.iter().find(|f| f.path.exists()) {
        bail!("refusing to overwrite {}", existing.path.display());
    }

    for file in &plan.files {
        if ctx.dry_run {
            eprintln!("Would write {}", file.path.display());
            continue;
        }
        write_atomic(&file.path, file.contents.as_bytes())
            .with_context(|| format!("write {}", file.path.display()))?;
        if !ctx.quiet {
            eprintln!("Wrote {}", file.path.display());
        }
    }
    Ok(())
}
