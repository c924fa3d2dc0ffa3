//! The response engine - the top-level entry combining
//! normalize→build→match→evaluate.
//!
//! The engine owns the active graphmaster behind an atomically swappable
//! reference: lookups clone the `Arc` and never hold a lock while
//! matching, and bulk (re)population builds a fresh trie which `commit`
//! swaps in. In-flight queries against the old structure stay valid until
//! they finish.

use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use conversation::{BotSettings, ConversationHistory, ConversationTurn, PredicateStore, UserId};

use crate::error::{Diagnostic, LoadError};
use crate::graph::{Category, Graphmaster, PathBuilder};
use crate::history::HistoryIndex;
use crate::normalize::{NormalizeMode, Normalizer, Substitutions};
use crate::template::{EvalScope, TemplateEvaluator, TemplateNode};

/// Tunables for matching and evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// That-contexts longer than this many tokens collapse to the full
    /// wildcard when keys are built.
    pub max_that_tokens: usize,

    /// How deep symbolic reduction may nest before the branch is aborted.
    pub max_recursion_depth: u32,

    /// Wall-clock budget for one `respond` call; `None` disables the
    /// deadline.
    pub timeout_ms: Option<u64>,

    /// Characters that end a sentence when utterances are split.
    pub sentence_splitters: Vec<char>,

    /// Trust authored rules to be pre-canonicalized and skip normalizing
    /// them at load time.
    pub trust_authored: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_that_tokens: 32,
            max_recursion_depth: 16,
            timeout_ms: Some(2000),
            sentence_splitters: vec!['.', '!', '?', ';'],
            trust_authored: false,
        }
    }
}

/// One rule as supplied by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub pattern: String,
    pub that: String,
    pub topic: String,
    pub template: String,
    pub provenance: String,
}

impl RuleDefinition {
    /// Create a rule definition.
    pub fn new(
        pattern: impl Into<String>,
        that: impl Into<String>,
        topic: impl Into<String>,
        template: impl Into<String>,
        provenance: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            that: that.into(),
            topic: topic.into(),
            template: template.into(),
            provenance: provenance.into(),
        }
    }
}

/// Outcome of a bulk rule load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    /// Terminals in the freshly built graph.
    pub loaded: usize,
    /// Rules reported and skipped.
    pub skipped: usize,
}

/// The rendered answer to one utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// All output sentences, re-joined.
    pub text: String,

    /// Output sentence per matched input sentence.
    pub sentences: Vec<String>,

    /// Provenance of the rule behind each output sentence.
    pub provenance: Vec<String>,

    /// Wall-clock time spent evaluating.
    pub duration_ms: u64,

    /// Whether the deadline expired and the output is partial.
    pub timed_out: bool,

    /// Everything reported while evaluating.
    pub diagnostics: Vec<Diagnostic>,
}

/// The decision core: rule index plus evaluator plus the state services
/// they consult.
pub struct ResponseEngine {
    active: RwLock<Arc<Graphmaster>>,
    pending: Mutex<Graphmaster>,
    normalizer: Normalizer,
    path: PathBuilder,
    settings: BotSettings,
    history: Arc<dyn ConversationHistory>,
    predicates: Arc<dyn PredicateStore>,
    config: EngineConfig,
}

impl ResponseEngine {
    /// Create an engine with an empty rule set.
    pub fn new(
        settings: BotSettings,
        history: Arc<dyn ConversationHistory>,
        predicates: Arc<dyn PredicateStore>,
        config: EngineConfig,
    ) -> Self {
        let path = PathBuilder {
            max_that_tokens: config.max_that_tokens,
            trust_authored: config.trust_authored,
        };
        Self {
            active: RwLock::new(Arc::new(Graphmaster::new())),
            pending: Mutex::new(Graphmaster::new()),
            normalizer: Normalizer::default(),
            path,
            settings,
            history,
            predicates,
            config,
        }
    }

    /// Replace the substitution dictionary, builder style.
    pub fn with_substitutions(mut self, substitutions: Substitutions) -> Self {
        self.normalizer = Normalizer::new(substitutions);
        self
    }

    /// Terminals in the active graph.
    pub fn graph_size(&self) -> usize {
        self.active_graph().size()
    }

    /// Stage one rule into the pending graph.
    ///
    /// Returns the pending graph's running terminal count. The rule is not
    /// live until [`commit`](Self::commit) swaps the pending graph in.
    pub fn load_rule(
        &self,
        pattern: &str,
        that: &str,
        topic: &str,
        template_markup: &str,
        provenance: &str,
    ) -> Result<usize, LoadError> {
        let (key, category) =
            self.build_category(pattern, that, topic, template_markup, provenance)?;
        let mut pending = self.pending.lock().expect("pending graph lock poisoned");
        let count = pending.insert(&key, category);
        tracing::debug!(%provenance, terminals = count, "staged rule");
        Ok(count)
    }

    /// Make the pending graph active.
    ///
    /// The whole rule set is replaced, never patched: committing starts
    /// the next staging cycle from an empty pending graph.
    pub fn commit(&self) {
        let mut pending = self.pending.lock().expect("pending graph lock poisoned");
        let fresh = std::mem::take(&mut *pending);
        drop(pending);

        tracing::info!(terminals = fresh.size(), "activating rule graph");
        *self.active.write().expect("active graph lock poisoned") = Arc::new(fresh);
    }

    /// Build a fresh graph from a whole rule set and activate it.
    ///
    /// Malformed rules are reported and skipped; the load continues.
    pub fn rebuild<I>(&self, rules: I) -> LoadSummary
    where
        I: IntoIterator<Item = RuleDefinition>,
    {
        let mut graph = Graphmaster::new();
        let mut skipped = 0;

        for rule in rules {
            match self.build_category(
                &rule.pattern,
                &rule.that,
                &rule.topic,
                &rule.template,
                &rule.provenance,
            ) {
                Ok((key, category)) => {
                    graph.insert(&key, category);
                }
                Err(error) => {
                    tracing::warn!(%error, "skipping rule");
                    skipped += 1;
                }
            }
        }

        let loaded = graph.size();
        tracing::info!(terminals = loaded, skipped, "activating rule graph");
        *self.active.write().expect("active graph lock poisoned") = Arc::new(graph);

        LoadSummary { loaded, skipped }
    }

    /// Answer one utterance given its conversational context.
    ///
    /// The caller supplies the prior bot utterance and active topic, and
    /// is responsible for appending the finished turn to history (or use
    /// [`chat`](Self::chat), which does both).
    pub fn respond(
        &self,
        user: UserId,
        raw_utterance: &str,
        prior_that: &str,
        current_topic: &str,
    ) -> Response {
        let started = Instant::now();
        let deadline = self
            .config
            .timeout_ms
            .map(|ms| started + Duration::from_millis(ms));

        let graph = self.active_graph();
        let evaluator = TemplateEvaluator {
            graph: &graph,
            normalizer: &self.normalizer,
            path: &self.path,
            settings: &self.settings,
            history: self.history.as_ref(),
            predicates: self.predicates.as_ref(),
            config: &self.config,
        };

        let mut sentences = Vec::new();
        let mut provenance = Vec::new();
        let mut diagnostics = Vec::new();
        let mut timed_out = false;

        for input_sentence in split_sentences(raw_utterance, &self.config.sentence_splitters) {
            let Some(key) = self.path.build(
                &self.normalizer,
                &input_sentence,
                prior_that,
                current_topic,
                NormalizeMode::Runtime,
            ) else {
                continue;
            };

            let Some(result) = graph.find(&key) else {
                tracing::debug!(sentence = %input_sentence, "no matching rule");
                continue;
            };

            let mut scope = EvalScope::new(
                user,
                raw_utterance,
                prior_that,
                result.captures,
                deadline,
            );
            let output = evaluator
                .evaluate(&result.category.template, &mut scope)
                .trim()
                .to_string();

            timed_out |= scope.timed_out();
            diagnostics.append(&mut scope.diagnostics);

            if !output.is_empty() {
                sentences.push(output);
                provenance.push(result.category.provenance);
            }
        }

        Response {
            text: sentences.join(" "),
            sentences,
            provenance,
            duration_ms: started.elapsed().as_millis() as u64,
            timed_out,
            diagnostics,
        }
    }

    /// Answer one utterance, deriving the conversational context from the
    /// user's state and appending the finished turn to history.
    pub fn chat(&self, user: UserId, raw_utterance: &str) -> Response {
        let prior_that = HistoryIndex::new(self.history.as_ref(), user).last_output();
        let topic = self.predicates.topic(user);

        let response = self.respond(user, raw_utterance, &prior_that, &topic);

        let turn = ConversationTurn::new(
            split_sentences(raw_utterance, &self.config.sentence_splitters),
            response.sentences.clone(),
        )
        .with_duration_ms(response.duration_ms)
        .with_timed_out(response.timed_out);
        self.history.append(user, turn);

        response
    }

    fn active_graph(&self) -> Arc<Graphmaster> {
        self.active
            .read()
            .expect("active graph lock poisoned")
            .clone()
    }

    fn build_category(
        &self,
        pattern: &str,
        that: &str,
        topic: &str,
        template_markup: &str,
        provenance: &str,
    ) -> Result<(String, Category), LoadError> {
        if pattern.trim().is_empty() {
            return Err(LoadError::MissingPattern {
                provenance: provenance.to_string(),
            });
        }
        if template_markup.trim().is_empty() {
            return Err(LoadError::MissingTemplate {
                provenance: provenance.to_string(),
            });
        }

        let template =
            TemplateNode::parse(template_markup).map_err(|source| LoadError::MalformedTemplate {
                provenance: provenance.to_string(),
                source,
            })?;

        let key = self
            .path
            .build(&self.normalizer, pattern, that, topic, NormalizeMode::Authoring)
            .ok_or_else(|| LoadError::EmptyPattern {
                provenance: provenance.to_string(),
            })?;

        Ok((key, Category::new(template, provenance)))
    }
}

/// Split an utterance on terminator characters, dropping empty sentences.
pub fn split_sentences(text: &str, splitters: &[char]) -> Vec<String> {
    text.split(|c| splitters.contains(&c))
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(str::to_string)
        .collect()
}
