//! The graphmaster trie - ordered pattern index with wildcard matching.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::path::{is_separator, THAT_MARKER, TOPIC_MARKER};
use crate::normalize::{MANY_WORD_WILDCARD, ONE_WORD_WILDCARD};
use crate::template::TemplateNode;

/// Which match-key segment a token (or capture) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Pattern,
    That,
    Topic,
}

/// A rule's terminal payload: the template to evaluate and where the rule
/// came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub template: TemplateNode,
    pub provenance: String,
}

impl Category {
    /// Create a new category.
    pub fn new(template: TemplateNode, provenance: impl Into<String>) -> Self {
        Self {
            template,
            provenance: provenance.into(),
        }
    }
}

/// Wildcard captures from one lookup, grouped by originating segment.
///
/// Within each segment, captures are ordered left-to-right; across
/// segments the pattern captures come first, then that, then topic -
/// matching the traversal order of the key itself. Ordinals at the tag
/// surface are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCapture {
    pattern: Vec<String>,
    that: Vec<String>,
    topic: Vec<String>,
}

impl MatchCapture {
    /// Record a capture for a segment.
    pub fn push(&mut self, segment: Segment, text: impl Into<String>) {
        self.segment_mut(segment).push(text.into());
    }

    /// Pattern-segment capture by 1-based ordinal.
    pub fn star(&self, ordinal: usize) -> Option<&str> {
        Self::nth(&self.pattern, ordinal)
    }

    /// That-segment capture by 1-based ordinal.
    pub fn that_star(&self, ordinal: usize) -> Option<&str> {
        Self::nth(&self.that, ordinal)
    }

    /// Topic-segment capture by 1-based ordinal.
    pub fn topic_star(&self, ordinal: usize) -> Option<&str> {
        Self::nth(&self.topic, ordinal)
    }

    /// Number of captures in a segment.
    pub fn segment_len(&self, segment: Segment) -> usize {
        self.segment(segment).len()
    }

    /// Total number of captures across all segments.
    pub fn len(&self) -> usize {
        self.pattern.len() + self.that.len() + self.topic.len()
    }

    /// Whether the lookup traversed no wildcards at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn nth(values: &[String], ordinal: usize) -> Option<&str> {
        if ordinal == 0 {
            return None;
        }
        values.get(ordinal - 1).map(String::as_str)
    }

    fn segment(&self, segment: Segment) -> &Vec<String> {
        match segment {
            Segment::Pattern => &self.pattern,
            Segment::That => &self.that,
            Segment::Topic => &self.topic,
        }
    }

    fn segment_mut(&mut self, segment: Segment) -> &mut Vec<String> {
        match segment {
            Segment::Pattern => &mut self.pattern,
            Segment::That => &mut self.that,
            Segment::Topic => &mut self.topic,
        }
    }

    fn mark(&self) -> (usize, usize, usize) {
        (self.pattern.len(), self.that.len(), self.topic.len())
    }

    fn rollback(&mut self, mark: (usize, usize, usize)) {
        self.pattern.truncate(mark.0);
        self.that.truncate(mark.1);
        self.topic.truncate(mark.2);
    }
}

/// A successful lookup: the matched category plus its wildcard captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub category: Category,
    pub captures: MatchCapture,
}

/// One trie node. Each node exclusively owns its children; the structure
/// is acyclic by construction and carries no parent pointers - recursion
/// holds the path implicitly during matching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Node {
    children: HashMap<String, Node>,
    category: Option<Category>,
}

impl Node {
    /// Depth-first search with ordered backtracking. At every node the
    /// precedence is: literal child, then the one-word wildcard, then the
    /// many-word wildcard. The first terminal reached under this order is
    /// the match.
    fn walk<'a>(
        &'a self,
        tokens: &[&str],
        segment: Segment,
        captures: &mut MatchCapture,
    ) -> Option<&'a Category> {
        let Some((&first, rest)) = tokens.split_first() else {
            return self.category.as_ref();
        };

        // Tokens past a separator belong to the next segment.
        let next_segment = match first {
            THAT_MARKER => Segment::That,
            TOPIC_MARKER => Segment::Topic,
            _ => segment,
        };

        if let Some(child) = self.children.get(first) {
            if let Some(category) = child.walk(rest, next_segment, captures) {
                return Some(category);
            }
        }

        // Separators only ever match their literal child.
        if is_separator(first) {
            return None;
        }

        if let Some(child) = self.children.get(ONE_WORD_WILDCARD) {
            let mark = captures.mark();
            captures.push(segment, first);
            if let Some(category) = child.walk(rest, segment, captures) {
                return Some(category);
            }
            captures.rollback(mark);
        }

        if let Some(child) = self.children.get(MANY_WORD_WILDCARD) {
            // Consume one-or-more tokens while remaining at this wildcard
            // node, shortest extension first.
            let mut consumed = vec![first];
            let mut remaining = rest;
            loop {
                let mark = captures.mark();
                captures.push(segment, consumed.join(" "));
                if let Some(category) = child.walk(remaining, segment, captures) {
                    return Some(category);
                }
                captures.rollback(mark);

                match remaining.split_first() {
                    Some((&next, rest_after)) if !is_separator(next) => {
                        consumed.push(next);
                        remaining = rest_after;
                    }
                    _ => break,
                }
            }
        }

        None
    }
}

/// The pattern index: an ordered trie from canonical match keys to
/// categories.
///
/// Once built, the graphmaster is read-only on the query path; bulk
/// (re)population happens on a fresh instance which the engine swaps in
/// atomically.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Graphmaster {
    root: Node,
    size: usize,
}

impl Graphmaster {
    /// Create an empty graphmaster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of terminals (distinct rules) in the trie.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Insert a category at the given canonical key.
    ///
    /// Reinsertion at an occupied terminal is last-writer-wins: the new
    /// category replaces the old one and the terminal count is unchanged,
    /// which makes rebuilding from an identical rule set idempotent.
    ///
    /// Returns the running terminal count for diagnostics.
    pub fn insert(&mut self, key: &str, category: Category) -> usize {
        let mut node = &mut self.root;
        for token in key.split_whitespace() {
            node = node.children.entry(token.to_string()).or_default();
        }
        if node.category.replace(category).is_none() {
            self.size += 1;
        }
        self.size
    }

    /// Best-match lookup for a canonical query key.
    ///
    /// `None` is an expected outcome, not an error: coverage is the rule
    /// author's responsibility via a catch-all `*` rule, which this search
    /// order guarantees will match anything.
    pub fn find(&self, key: &str) -> Option<MatchResult> {
        let tokens: Vec<&str> = key.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }

        let mut captures = MatchCapture::default();
        let category = self.root.walk(&tokens, Segment::Pattern, &mut captures)?;
        Some(MatchResult {
            category: category.clone(),
            captures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::PathBuilder;
    use crate::normalize::{NormalizeMode, Normalizer};

    fn category(label: &str) -> Category {
        let template = TemplateNode::parse(&format!("<template>{}</template>", label)).unwrap();
        Category::new(template, "test.rules")
    }

    fn key(pattern: &str, that: &str, topic: &str, mode: NormalizeMode) -> String {
        PathBuilder::default()
            .build(&Normalizer::default(), pattern, that, topic, mode)
            .unwrap()
    }

    fn graph(patterns: &[&str]) -> Graphmaster {
        let mut graph = Graphmaster::new();
        for pattern in patterns {
            graph.insert(
                &key(pattern, "*", "*", NormalizeMode::Authoring),
                category(pattern),
            );
        }
        graph
    }

    #[test]
    fn test_exact_key_round_trip_zero_captures() {
        let graph = graph(&["HELLO WORLD"]);

        let result = graph
            .find(&key("hello world!", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert!(result.captures.is_empty());
        assert_eq!(result.category, category("HELLO WORLD"));
    }

    #[test]
    fn test_literal_beats_wildcards() {
        let graph = graph(&["HELLO", "HELLO _", "HELLO *"]);

        let result = graph
            .find(&key("HELLO", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("HELLO"));
        assert!(result.captures.is_empty());
    }

    #[test]
    fn test_one_word_wildcard_beats_many_word() {
        let graph = graph(&["HELLO", "HELLO _", "HELLO *"]);

        let result = graph
            .find(&key("HELLO WORLD", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("HELLO _"));
        assert_eq!(result.captures.star(1), Some("WORLD"));
    }

    #[test]
    fn test_many_word_wildcard_consumes_run() {
        let graph = graph(&["HELLO", "HELLO _", "HELLO *"]);

        let result = graph
            .find(&key("HELLO A B C", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("HELLO *"));
        assert_eq!(result.captures.star(1), Some("A B C"));
    }

    #[test]
    fn test_multi_wildcard_captures_in_order() {
        let graph = graph(&["* WORLD *"]);

        let result = graph
            .find(&key("A B WORLD C D", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.captures.star(1), Some("A B"));
        assert_eq!(result.captures.star(2), Some("C D"));
        assert_eq!(result.captures.segment_len(Segment::Pattern), 2);
    }

    #[test]
    fn test_captures_tagged_by_segment() {
        let mut graph = Graphmaster::new();
        graph.insert(
            &key("HI *", "NICE *", "TOPIC *", NormalizeMode::Authoring),
            category("segmented"),
        );

        let result = graph
            .find(&key(
                "HI THERE",
                "NICE DAY",
                "TOPIC GARDENING TIPS",
                NormalizeMode::Runtime,
            ))
            .unwrap();

        assert_eq!(result.captures.star(1), Some("THERE"));
        assert_eq!(result.captures.that_star(1), Some("DAY"));
        assert_eq!(result.captures.topic_star(1), Some("GARDENING TIPS"));
    }

    #[test]
    fn test_catch_all_matches_anything() {
        let graph = graph(&["*"]);

        for utterance in ["HI", "WHAT A LOVELY DAY", "X"] {
            let result = graph.find(&key(utterance, "", "", NormalizeMode::Runtime));
            assert!(result.is_some(), "catch-all failed on {utterance:?}");
        }
    }

    #[test]
    fn test_no_match_is_none() {
        let graph = graph(&["HELLO"]);

        assert!(graph
            .find(&key("GOODBYE", "", "", NormalizeMode::Runtime))
            .is_none());
    }

    #[test]
    fn test_wildcard_never_crosses_segments() {
        // A trailing pattern wildcard must stop at the that boundary
        // rather than swallowing the rest of the key.
        let graph = graph(&["HELLO *"]);

        let result = graph
            .find(&key(
                "HELLO THERE FRIEND",
                "SOME PRIOR OUTPUT",
                "",
                NormalizeMode::Runtime,
            ))
            .unwrap();
        assert_eq!(result.captures.star(1), Some("THERE FRIEND"));
        assert_eq!(result.captures.segment_len(Segment::That), 1);
    }

    #[test]
    fn test_backtracking_discards_failed_captures() {
        let mut graph = Graphmaster::new();
        // "_ B C" forces the matcher to first try the one-word wildcard,
        // capture "A", fail on "X", and roll the capture back before the
        // many-word wildcard succeeds.
        graph.insert(
            &key("_ B C", "*", "*", NormalizeMode::Authoring),
            category("one-word"),
        );
        graph.insert(
            &key("* X", "*", "*", NormalizeMode::Authoring),
            category("many-word"),
        );

        let result = graph
            .find(&key("A B X", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("many-word"));
        assert_eq!(result.captures.star(1), Some("A B"));
    }

    #[test]
    fn test_last_writer_wins_on_reinsert() {
        let mut graph = Graphmaster::new();
        let path = key("HELLO", "*", "*", NormalizeMode::Authoring);

        assert_eq!(graph.insert(&path, category("first")), 1);
        assert_eq!(graph.insert(&path, category("second")), 1);

        let result = graph
            .find(&key("HELLO", "", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("second"));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let patterns = ["HELLO", "HELLO *", "BYE _"];
        let first = graph(&patterns);
        let second = graph(&patterns);

        assert_eq!(first.size(), second.size());
        for utterance in ["HELLO", "HELLO THERE", "BYE NOW"] {
            let query = key(utterance, "", "", NormalizeMode::Runtime);
            assert_eq!(first.find(&query), second.find(&query));
        }
    }

    #[test]
    fn test_that_context_distinguishes_rules() {
        let mut graph = Graphmaster::new();
        graph.insert(
            &key("YES", "DO YOU LIKE TEA", "*", NormalizeMode::Authoring),
            category("tea"),
        );
        graph.insert(
            &key("YES", "*", "*", NormalizeMode::Authoring),
            category("generic"),
        );

        let result = graph
            .find(&key("YES", "Do you like tea?", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("tea"));

        let result = graph
            .find(&key("YES", "Anything else", "", NormalizeMode::Runtime))
            .unwrap();
        assert_eq!(result.category, category("generic"));
    }

    #[test]
    fn test_graphmaster_serde_round_trip() {
        let graph = graph(&["HELLO *"]);

        let json = serde_json::to_string(&graph).unwrap();
        let back: Graphmaster = serde_json::from_str(&json).unwrap();

        assert_eq!(back.size(), graph.size());
        let query = key("HELLO THERE", "", "", NormalizeMode::Runtime);
        assert_eq!(back.find(&query), graph.find(&query));
    }
}
