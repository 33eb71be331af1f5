//! The analyzer pipeline.
//!
//! Each pass reads the immutable [`Program`] and returns its own diagnostics.
//! Passes never see each other's output; the validator merges and sorts
//! everything afterwards, so the order passes run in does not change the
//! result.

mod builtins;
mod capabilities;
mod cfg;
mod constant;
mod flow;
mod portability;
mod quality;
mod semantic;
mod syntax;

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use prism_core::{
    Diagnostic, ShaderFormat,
    ast::{Block, Program, UnparsedRegion, Visitor},
};

pub use flow::FlowChecker;
pub use portability::PortabilityChecker;
pub use quality::{QualityChecker, measure};
pub use semantic::SemanticChecker;
pub use syntax::SyntaxChecker;

/// One analyzer pass, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pass {
    Syntax,
    Semantic,
    Flow,
    Portability,
    Quality,
}

impl Pass {
    pub const ALL: [Pass; 5] = [
        Pass::Syntax,
        Pass::Semantic,
        Pass::Flow,
        Pass::Portability,
        Pass::Quality,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Pass::Syntax => "syntax",
            Pass::Semantic => "semantic",
            Pass::Flow => "flow",
            Pass::Portability => "portability",
            Pass::Quality => "quality",
        }
    }

    pub fn analyzer(&self) -> &'static dyn Analyzer {
        match self {
            Pass::Syntax => &SyntaxChecker,
            Pass::Semantic => &SemanticChecker,
            Pass::Flow => &FlowChecker,
            Pass::Portability => &PortabilityChecker,
            Pass::Quality => &QualityChecker,
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a pass may look at besides the program.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub program: &'a Program,
    pub format: ShaderFormat,
    /// The caller's requested language version, used when a stage has no `#version`.
    pub declared_version: Option<&'a str>,
    pub complexity_threshold: u32,
    pub naming_pattern: &'a Regex,
}

/// A read-only pass over the program.
pub trait Analyzer: Send + Sync {
    fn pass(&self) -> Pass;

    fn analyze(&self, context: &AnalysisContext<'_>) -> Vec<Diagnostic>;
}

/// Whether error recovery skipped anything inside the block.
fn contains_unparsed(block: &Block) -> bool {
    struct Finder(bool);

    impl Visitor for Finder {
        fn visit_unparsed(&mut self, _region: &UnparsedRegion) {
            self.0 = true;
        }
    }

    let mut finder = Finder(false);
    finder.visit_block(block);
    finder.0
}
