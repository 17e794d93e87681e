//! Rule store.
//!
//! A [`Rule`] pairs a regular-expression source with a literal response. A
//! [`RuleSet`] is the ordered, immutable collection of rules the
//! [`Dispatcher`](crate::Dispatcher) scans for every inbound message:
//! declaration order is match priority.
//!
//! # Rules File
//!
//! Rules are loaded from a JSON array:
//!
//! ```json
//! [
//!   { "regex": "^hello", "response": "hi!" },
//!   { "regex": "(?i)\\bping\\b", "response": "pong" }
//! ]
//! ```
//!
//! # Compilation
//!
//! Each rule compiles its pattern at most once and keeps the compiled
//! matcher for its whole lifetime. Every `RuleSet` constructor compiles all
//! patterns up front, so an invalid pattern is reported at startup and a
//! constructed `RuleSet` never fails to match.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{PatternError, RuleSetError, RuleSetResult};

// =============================================================================
// Rule
// =============================================================================

/// A pattern-response pair governing one possible automated reply.
#[derive(Serialize, Deserialize)]
pub struct Rule {
    /// Regular-expression source, as written in the rules file.
    #[serde(rename = "regex")]
    pattern: String,

    /// Literal text sent when `pattern` matches.
    response: String,

    #[serde(skip)]
    matcher: OnceLock<Regex>,
}

impl Rule {
    /// Creates a rule. The pattern is not compiled until first use.
    pub fn new(pattern: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            response: response.into(),
            matcher: OnceLock::new(),
        }
    }

    /// Returns the pattern source.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the response text.
    pub fn response(&self) -> &str {
        &self.response
    }

    /// Returns whether the matcher has been compiled yet.
    pub fn is_compiled(&self) -> bool {
        self.matcher.get().is_some()
    }

    /// Returns the compiled matcher, compiling and caching it on first use.
    ///
    /// Concurrent first calls may each compile the pattern, but only one
    /// result is ever published; every caller observes that same matcher.
    pub fn matcher(&self) -> Result<&Regex, PatternError> {
        if let Some(matcher) = self.matcher.get() {
            return Ok(matcher);
        }

        trace!(pattern = %self.pattern, "Compiling pattern");
        let compiled = Regex::new(&self.pattern).map_err(|source| PatternError {
            pattern: self.pattern.clone(),
            source,
        })?;

        Ok(self.matcher.get_or_init(|| compiled))
    }

    /// Tests `text` against this rule's pattern.
    ///
    /// The pattern may match anywhere in the text unless it is anchored.
    pub fn is_match(&self, text: &str) -> Result<bool, PatternError> {
        Ok(self.matcher()?.is_match(text))
    }
}

impl Clone for Rule {
    fn clone(&self) -> Self {
        let matcher = OnceLock::new();
        if let Some(compiled) = self.matcher.get() {
            let _ = matcher.set(compiled.clone());
        }
        Self {
            pattern: self.pattern.clone(),
            response: self.response.clone(),
            matcher,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("pattern", &self.pattern)
            .field("response", &self.response)
            .field("compiled", &self.is_compiled())
            .finish()
    }
}

// =============================================================================
// RuleSet
// =============================================================================

/// The ordered, immutable collection of all rules.
///
/// Insertion order is match priority. There are no mutation operations: a
/// `RuleSet` is built once at startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Builds a rule set, compiling every pattern.
    ///
    /// Fails on the first rule (in declaration order) whose pattern does
    /// not compile.
    pub fn new(rules: Vec<Rule>) -> RuleSetResult<Self> {
        for (index, rule) in rules.iter().enumerate() {
            rule.matcher()
                .map_err(|source| RuleSetError::Pattern { index, source })?;
        }

        debug!(count = rules.len(), "Rule set compiled");
        Ok(Self { rules })
    }

    /// Parses a JSON array of `{regex, response}` records.
    pub fn from_json(source: &str) -> RuleSetResult<Self> {
        let rules: Vec<Rule> = serde_json::from_str(source)?;
        Self::new(rules)
    }

    /// Parses a JSON array of `{regex, response}` records from a reader.
    pub fn from_reader<R: Read>(reader: R) -> RuleSetResult<Self> {
        let rules: Vec<Rule> = serde_json::from_reader(reader)?;
        Self::new(rules)
    }

    /// Loads the rules file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> RuleSetResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| RuleSetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_reader(BufReader::new(file))
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns whether the set holds no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the rule at `index`.
    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    /// Iterates over the rules in priority order.
    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Returns the lowest-index rule matching `text`, with its index.
    pub fn first_match(&self, text: &str) -> Option<(usize, &Rule)> {
        self.rules.iter().enumerate().find(|(index, rule)| {
            // Every pattern compiled in `RuleSet::new`.
            let matched = rule.is_match(text).unwrap_or(false);
            trace!(index, pattern = %rule.pattern, matched, "Checked rule");
            matched
        })
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_from_json_preserves_order() {
        let rules = RuleSet::from_json(
            r#"[
                {"regex": "cat", "response": "meow"},
                {"regex": "cat|dog", "response": "animal"},
                {"regex": "^hello", "response": "hi!"}
            ]"#,
        )
        .unwrap();

        let responses: Vec<_> = rules.iter().map(Rule::response).collect();
        assert_eq!(responses, ["meow", "animal", "hi!"]);
        assert_eq!(rules.get(2).unwrap().pattern(), "^hello");
    }

    #[test]
    fn test_from_json_compiles_every_rule() {
        let rules = RuleSet::from_json(r#"[{"regex": "a", "response": "b"}]"#).unwrap();
        assert!(rules.iter().all(Rule::is_compiled));
    }

    #[test]
    fn test_from_json_ignores_unknown_fields() {
        let rules =
            RuleSet::from_json(r#"[{"regex": "a", "response": "b", "comment": "x"}]"#).unwrap();
        assert_eq!(rules.len(), 1);
    }

    #[test]
    fn test_empty_rule_set() {
        let rules = RuleSet::from_json("[]").unwrap();
        assert!(rules.is_empty());
        assert!(rules.first_match("anything").is_none());
    }

    #[test]
    fn test_malformed_structure_is_rejected() {
        let err = RuleSet::from_json(r#"{"regex": "a", "response": "b"}"#).unwrap_err();
        assert!(matches!(err, RuleSetError::Parse(_)));

        let err = RuleSet::from_json(r#"[{"regex": "a"}]"#).unwrap_err();
        assert!(matches!(err, RuleSetError::Parse(_)));

        let err = RuleSet::from_json(r#"[{"regex": 1, "response": "b"}]"#).unwrap_err();
        assert!(matches!(err, RuleSetError::Parse(_)));

        let err = RuleSet::from_json("not json").unwrap_err();
        assert!(matches!(err, RuleSetError::Parse(_)));
    }

    #[test]
    fn test_invalid_pattern_fails_the_whole_set() {
        let err = RuleSet::from_json(
            r#"[
                {"regex": "fine", "response": "ok"},
                {"regex": "(unclosed", "response": "never"}
            ]"#,
        )
        .unwrap_err();

        match err {
            RuleSetError::Pattern { index, source } => {
                assert_eq!(index, 1);
                assert_eq!(source.pattern, "(unclosed");
            }
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = RuleSet::load("/definitely/not/here/rules.json").unwrap_err();
        assert!(matches!(err, RuleSetError::Read { .. }));
    }

    #[test]
    fn test_matcher_is_lazy_and_memoized() {
        let rule = Rule::new("^hello", "hi!");
        assert!(!rule.is_compiled());

        let first = rule.matcher().unwrap();
        let second = rule.matcher().unwrap();
        assert!(rule.is_compiled());
        assert!(std::ptr::eq(first, second));

        for text in ["hello there", "hello", "say hello", ""] {
            assert_eq!(first.is_match(text), second.is_match(text));
        }
    }

    #[test]
    fn test_invalid_pattern_stays_uncompiled() {
        let rule = Rule::new("[", "x");
        assert!(rule.matcher().is_err());
        assert!(rule.is_match("[").is_err());
        assert!(!rule.is_compiled());
    }

    #[test]
    fn test_clone_keeps_compiled_matcher() {
        let rule = Rule::new("abc", "x");
        rule.matcher().unwrap();
        let cloned = rule.clone();
        assert!(cloned.is_compiled());
        assert!(cloned.is_match("xxabcxx").unwrap());
    }

    #[test]
    fn test_concurrent_first_use_publishes_one_matcher() {
        let rule = Arc::new(Rule::new(r"\bcat\b", "meow"));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rule = Arc::clone(&rule);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let matcher = rule.matcher().unwrap();
                    (
                        matcher as *const Regex as usize,
                        matcher.is_match("a cat sat"),
                        matcher.is_match("concatenate"),
                    )
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let published = rule.matcher().unwrap() as *const Regex as usize;
        for (addr, hit, miss) in results {
            assert_eq!(addr, published);
            assert!(hit);
            assert!(!miss);
        }
    }

    #[test]
    fn test_first_match_picks_lowest_index() {
        let rules = RuleSet::new(vec![
            Rule::new("cat", "meow"),
            Rule::new("cat|dog", "animal"),
        ])
        .unwrap();

        let (index, rule) = rules.first_match("I have a cat").unwrap();
        assert_eq!(index, 0);
        assert_eq!(rule.response(), "meow");

        let (index, rule) = rules.first_match("I have a dog").unwrap();
        assert_eq!(index, 1);
        assert_eq!(rule.response(), "animal");

        assert!(rules.first_match("I have a fish").is_none());
    }
}
