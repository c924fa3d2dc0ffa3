//! Template evaluation - the interpreter that turns a matched template
//! into literal output text.
//!
//! The evaluator walks the template tree and dispatches each element
//! through a fixed tag table:
//! 1. **Captures**: `star`, `thatstar`, `topicstar` splice in wildcard
//!    captures by ordinal
//! 2. **Reduction**: `srai` (and its `sr` shortcut) resubmit a synthetic
//!    utterance through the whole normalize→match→evaluate pipeline
//! 3. **History**: `input` and `that` splice in sentences from past turns
//! 4. **State**: `get`/`set` read and write per-user predicates; `bot` and
//!    `version` read the global settings object
//!
//! Malformed tags never escape: they are reported as diagnostics and
//! contribute empty text while the rest of the template still renders.

mod markup;

pub use markup::*;

use std::time::Instant;

use conversation::{BotSettings, ConversationHistory, PredicateStore, UserId};

use crate::engine::EngineConfig;
use crate::error::Diagnostic;
use crate::graph::{Graphmaster, MatchCapture, PathBuilder, Segment};
use crate::history::HistoryIndex;
use crate::normalize::{NormalizeMode, Normalizer};

/// The fixed set of tag behaviors, keyed by (lowercased) tag name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Star,
    ThatStar,
    TopicStar,
    Sr,
    Srai,
    Input,
    That,
    Get,
    Set,
    Bot,
    Version,
}

impl TagKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "star" => Some(Self::Star),
            "thatstar" => Some(Self::ThatStar),
            "topicstar" => Some(Self::TopicStar),
            "sr" => Some(Self::Sr),
            "srai" => Some(Self::Srai),
            "input" => Some(Self::Input),
            "that" => Some(Self::That),
            "get" => Some(Self::Get),
            "set" => Some(Self::Set),
            "bot" => Some(Self::Bot),
            "version" => Some(Self::Version),
            _ => None,
        }
    }
}

/// The parsed state of an `index` attribute.
///
/// An absent attribute defaults to `1` in every dimension, while a
/// present-but-empty one contributes nothing at all. The asymmetry is
/// long-standing observable behavior; keep it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IndexAttr {
    Absent,
    Empty,
    Value(usize, usize),
    Invalid(String),
}

fn parse_index(el: &TemplateNode) -> IndexAttr {
    let Some(value) = el.attribute("index") else {
        return IndexAttr::Absent;
    };
    if value.is_empty() {
        return IndexAttr::Empty;
    }

    let parts: Vec<&str> = value.split(',').collect();
    let parsed = match parts.as_slice() {
        [first] => parse_positive(first).map(|n| (n, 1)),
        [first, second] => parse_positive(first).zip(parse_positive(second)),
        _ => None,
    };
    match parsed {
        Some((primary, secondary)) => IndexAttr::Value(primary, secondary),
        None => IndexAttr::Invalid(value.to_string()),
    }
}

fn parse_positive(text: &str) -> Option<usize> {
    text.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .map(|n| n as usize)
}

/// Mutable state carried through one top-level evaluation, including every
/// symbolic reduction it triggers.
#[derive(Debug)]
pub struct EvalScope {
    pub user: UserId,
    /// The raw utterance that started this evaluation, for diagnostics.
    pub raw_input: String,
    /// The prior bot utterance, reused when reductions rebuild the path.
    pub that_context: String,
    pub captures: MatchCapture,
    depth: u32,
    deadline: Option<Instant>,
    timed_out: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl EvalScope {
    /// Create a scope for one top-level evaluation.
    pub fn new(
        user: UserId,
        raw_input: impl Into<String>,
        that_context: impl Into<String>,
        captures: MatchCapture,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            user,
            raw_input: raw_input.into(),
            that_context: that_context.into(),
            captures,
            depth: 0,
            deadline,
            timed_out: false,
            diagnostics: Vec::new(),
        }
    }

    /// Whether the deadline expired at any point during evaluation.
    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(input = %self.raw_input, "{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

/// Recursive tree-walking interpreter over a matched template.
pub struct TemplateEvaluator<'a> {
    pub graph: &'a Graphmaster,
    pub normalizer: &'a Normalizer,
    pub path: &'a PathBuilder,
    pub settings: &'a BotSettings,
    pub history: &'a dyn ConversationHistory,
    pub predicates: &'a dyn PredicateStore,
    pub config: &'a EngineConfig,
}

impl<'a> TemplateEvaluator<'a> {
    /// Evaluate a template node's children in order, splicing tag output
    /// in place.
    pub fn evaluate(&self, node: &TemplateNode, scope: &mut EvalScope) -> String {
        if self.expired(scope) {
            return String::new();
        }

        let mut output = String::new();
        for child in &node.children {
            match child {
                TemplateChild::Text(text) => output.push_str(text),
                TemplateChild::Element(element) => {
                    output.push_str(&self.evaluate_element(element, scope));
                }
            }
        }
        output
    }

    fn evaluate_element(&self, el: &TemplateNode, scope: &mut EvalScope) -> String {
        match TagKind::from_name(&el.name) {
            Some(TagKind::Star) => self.capture_tag(el, scope, Segment::Pattern),
            Some(TagKind::ThatStar) => self.capture_tag(el, scope, Segment::That),
            Some(TagKind::TopicStar) => self.capture_tag(el, scope, Segment::Topic),
            Some(TagKind::Sr) => self.sr_tag(scope),
            Some(TagKind::Srai) => self.srai_tag(el, scope),
            Some(TagKind::Input) => self.history_tag(el, scope, false),
            Some(TagKind::That) => self.history_tag(el, scope, true),
            Some(TagKind::Get) => self.get_tag(el, scope),
            Some(TagKind::Set) => self.set_tag(el, scope),
            Some(TagKind::Bot) => self.bot_tag(el),
            Some(TagKind::Version) => self
                .settings
                .get("version")
                .unwrap_or_default()
                .to_string(),
            None => {
                // Unrecognized elements are transparent containers.
                tracing::debug!(tag = %el.name, "unrecognized template tag");
                self.evaluate(el, scope)
            }
        }
    }

    /// `star` / `thatstar` / `topicstar`: splice a wildcard capture by
    /// 1-based ordinal.
    fn capture_tag(&self, el: &TemplateNode, scope: &mut EvalScope, segment: Segment) -> String {
        let ordinal = match parse_index(el) {
            IndexAttr::Absent => 1,
            IndexAttr::Empty => return String::new(),
            IndexAttr::Invalid(value) => {
                scope.report(Diagnostic::TagError {
                    tag: el.name.clone(),
                    attribute: "index".to_string(),
                    value,
                });
                return String::new();
            }
            IndexAttr::Value(ordinal, _) => ordinal,
        };

        let capture = match segment {
            Segment::Pattern => scope.captures.star(ordinal),
            Segment::That => scope.captures.that_star(ordinal),
            Segment::Topic => scope.captures.topic_star(ordinal),
        };
        match capture {
            Some(text) => text.to_string(),
            None => {
                let available = scope.captures.segment_len(segment);
                scope.report(Diagnostic::CaptureRange {
                    tag: el.name.clone(),
                    ordinal,
                    available,
                });
                String::new()
            }
        }
    }

    /// `srai`: evaluate the children into a synthetic utterance and
    /// resubmit it through the whole pipeline.
    fn srai_tag(&self, el: &TemplateNode, scope: &mut EvalScope) -> String {
        let utterance = self.evaluate(el, scope).trim().to_string();
        self.reduce(&utterance, scope)
    }

    /// `sr`: shortcut for `<srai><star/></srai>`.
    fn sr_tag(&self, scope: &mut EvalScope) -> String {
        let Some(utterance) = scope.captures.star(1).map(str::to_string) else {
            let available = scope.captures.segment_len(Segment::Pattern);
            scope.report(Diagnostic::CaptureRange {
                tag: "sr".to_string(),
                ordinal: 1,
                available,
            });
            return String::new();
        };
        self.reduce(&utterance, scope)
    }

    /// Symbolic reduction: one more trip through
    /// normalize→build→match→evaluate, bounded by the depth budget.
    fn reduce(&self, utterance: &str, scope: &mut EvalScope) -> String {
        if scope.depth >= self.config.max_recursion_depth {
            scope.report(Diagnostic::RecursionLimit {
                limit: self.config.max_recursion_depth,
            });
            return String::new();
        }

        let topic = self.predicates.topic(scope.user);
        let Some(key) = self.path.build(
            self.normalizer,
            utterance,
            &scope.that_context,
            &topic,
            NormalizeMode::Runtime,
        ) else {
            return String::new();
        };

        let Some(result) = self.graph.find(&key) else {
            tracing::debug!(%utterance, "symbolic reduction found no match");
            return String::new();
        };

        let saved_captures = std::mem::replace(&mut scope.captures, result.captures);
        scope.depth += 1;
        let output = self.evaluate(&result.category.template, scope);
        scope.depth -= 1;
        scope.captures = saved_captures;
        output
    }

    /// `input` / `that`: splice a sentence from a historical turn by
    /// (turn, sentence) index, both 1-based at the tag surface.
    fn history_tag(&self, el: &TemplateNode, scope: &mut EvalScope, bot_side: bool) -> String {
        let (turn, sentence) = match parse_index(el) {
            IndexAttr::Absent => (1, 1),
            IndexAttr::Empty => return String::new(),
            IndexAttr::Invalid(value) => {
                scope.report(Diagnostic::TagError {
                    tag: el.name.clone(),
                    attribute: "index".to_string(),
                    value,
                });
                return String::new();
            }
            IndexAttr::Value(turn, sentence) => (turn, sentence),
        };

        let index = HistoryIndex::new(self.history, scope.user);
        let found = if bot_side {
            index.that_sentence(turn - 1, sentence - 1)
        } else {
            index.input_sentence(turn - 1, sentence - 1)
        };
        match found {
            Some(text) => text,
            None => {
                scope.report(Diagnostic::HistoryRange {
                    tag: el.name.clone(),
                    turn,
                    sentence,
                });
                String::new()
            }
        }
    }

    /// `get`: read a named per-user predicate.
    fn get_tag(&self, el: &TemplateNode, scope: &mut EvalScope) -> String {
        match el.attribute("name") {
            Some(name) if !name.is_empty() => self.predicates.get(scope.user, name),
            other => {
                scope.report(Diagnostic::TagError {
                    tag: el.name.clone(),
                    attribute: "name".to_string(),
                    value: other.unwrap_or_default().to_string(),
                });
                String::new()
            }
        }
    }

    /// `set`: evaluate the children, store the result as a named
    /// predicate, and emit the stored value.
    fn set_tag(&self, el: &TemplateNode, scope: &mut EvalScope) -> String {
        let Some(name) = el.attribute("name").filter(|name| !name.is_empty()) else {
            scope.report(Diagnostic::TagError {
                tag: el.name.clone(),
                attribute: "name".to_string(),
                value: el.attribute("name").unwrap_or_default().to_string(),
            });
            return String::new();
        };
        let name = name.to_string();

        let value = self.evaluate(el, scope).trim().to_string();
        self.predicates.set(scope.user, &name, &value);
        value
    }

    /// `bot`: read a named global setting.
    fn bot_tag(&self, el: &TemplateNode) -> String {
        let name = el.attribute("name").unwrap_or_default();
        match self.settings.get(name) {
            Some(value) => value.to_string(),
            None => {
                tracing::debug!(setting = %name, "unknown bot setting");
                String::new()
            }
        }
    }

    fn expired(&self, scope: &mut EvalScope) -> bool {
        let Some(deadline) = scope.deadline else {
            return false;
        };
        if Instant::now() < deadline {
            return false;
        }
        if !scope.timed_out {
            scope.timed_out = true;
            let timeout_ms = self.config.timeout_ms.unwrap_or_default();
            scope.report(Diagnostic::Timeout { timeout_ms });
        }
        true
    }
}
