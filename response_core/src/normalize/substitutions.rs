//! Phrase substitution - the configurable dictionary applied before
//! tokenization.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

/// An ordered substitution dictionary.
///
/// All entries are compiled into a single case-insensitive,
/// word-boundary-anchored alternation and applied in one pass over the
/// text. Alternatives are ordered longest-pattern-first, so the longest
/// phrase wins where entries overlap, and because the whole dictionary
/// runs as one pass the output of a substitution is never re-substituted.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    finds: Vec<String>,
    replacements: HashMap<String, String>,
    matcher: Option<Regex>,
}

impl Substitutions {
    /// Create an empty dictionary.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add a substitution, builder style.
    pub fn with(mut self, find: impl Into<String>, replace: impl Into<String>) -> Self {
        let find = find.into().trim().to_string();
        if find.is_empty() {
            return self;
        }
        let key = find.to_lowercase();
        if !self.replacements.contains_key(&key) {
            self.finds.push(find);
        }
        self.replacements.insert(key, replace.into());
        self.recompile();
        self
    }

    /// Build a dictionary from `(find, replace)` pairs.
    pub fn from_pairs<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        pairs
            .into_iter()
            .fold(Self::empty(), |dict, (find, replace)| dict.with(find, replace))
    }

    /// Number of entries in the dictionary.
    pub fn len(&self) -> usize {
        self.finds.len()
    }

    /// Whether the dictionary is empty.
    pub fn is_empty(&self) -> bool {
        self.finds.is_empty()
    }

    /// Apply the dictionary to text in one pass.
    pub fn apply(&self, text: &str) -> String {
        let Some(matcher) = &self.matcher else {
            return text.to_string();
        };
        matcher
            .replace_all(text, |caps: &regex::Captures<'_>| {
                let matched = caps[0].to_lowercase();
                self.replacements
                    .get(&matched)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }

    fn recompile(&mut self) {
        // Longest pattern first, so overlapping entries prefer the longer
        // phrase at the same position.
        let mut ordered: Vec<&String> = self.finds.iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = ordered
            .iter()
            .map(|find| regex::escape(find))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = format!(r"\b(?:{})\b", alternation);

        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(matcher) => self.matcher = Some(matcher),
            Err(error) => {
                tracing::warn!(%error, "failed to compile substitution dictionary");
                self.matcher = None;
            }
        }
    }
}
