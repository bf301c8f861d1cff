//! Keystroke sequence resolution
//!
//! Owns the pattern table and the single pending sequence. Tokens are fed
//! one at a time; each feed steps the grammar and reports whether the
//! accumulated input matched a command, is still a viable prefix, or is a
//! dead end.
//!
//! Count grammar is `[1-9][0-9]*`: a leading '0' is never a count digit
//! (it is the line-start command), but once a count has begun '0' extends
//! it ("10j").

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::trace;

use crate::config::{clamp_staleness, STALENESS_DEFAULT_MS};

/// Result of feeding one token to the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The buffer exactly matched a registered pattern
    Matched {
        /// Name of the command owning the pattern
        command: String,
        /// The literal pattern that matched
        pattern: String,
        /// Resolved count prefix (1 if none was typed)
        count: usize,
    },
    /// The buffer is a strict prefix of at least one pattern; need more input
    Waiting,
    /// No pattern matches and none can; pending state was reset
    Invalid,
}

/// The keystroke grammar interpreter
#[derive(Debug)]
pub struct SequenceResolver {
    /// pattern -> owning command name
    patterns: HashMap<String, String>,
    /// Every strict prefix of every registered pattern
    prefixes: HashSet<String>,
    /// Literal tokens accumulated since the last dispatch or reset
    buffer: String,
    /// Digit-string count prefix, accumulated separately
    count: String,
    /// When the pending sequence last advanced
    last_fed: Option<Instant>,
    /// How long a pending sequence may wait for its next token
    staleness: Duration,
}

impl Default for SequenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceResolver {
    pub fn new() -> Self {
        Self {
            patterns: HashMap::new(),
            prefixes: HashSet::new(),
            buffer: String::new(),
            count: String::new(),
            last_fed: None,
            staleness: Duration::from_millis(STALENESS_DEFAULT_MS),
        }
    }

    /// Register a pattern for a command; last writer wins on conflict
    ///
    /// Callers wanting conflict detection should pre-check through
    /// `CommandRegistry::is_pattern_available`.
    pub fn register_pattern(&mut self, pattern: &str, command: &str) {
        if pattern.is_empty() {
            return;
        }
        self.patterns
            .insert(pattern.to_string(), command.to_string());
        for prefix in strict_prefixes(pattern) {
            self.prefixes.insert(prefix);
        }
    }

    /// Remove a pattern; the prefix set is rebuilt from what remains
    pub fn unregister_pattern(&mut self, pattern: &str) {
        if self.patterns.remove(pattern).is_some() {
            self.rebuild_prefixes();
        }
    }

    /// Remove every pattern owned by the given command
    pub fn unregister_command(&mut self, command: &str) {
        let before = self.patterns.len();
        self.patterns.retain(|_, owner| owner != command);
        if self.patterns.len() != before {
            self.rebuild_prefixes();
        }
    }

    /// Drop every registered pattern
    pub fn unregister_all(&mut self) {
        self.patterns.clear();
        self.prefixes.clear();
    }

    fn rebuild_prefixes(&mut self) {
        self.prefixes.clear();
        let mut prefixes = HashSet::new();
        for pattern in self.patterns.keys() {
            for prefix in strict_prefixes(pattern) {
                prefixes.insert(prefix);
            }
        }
        self.prefixes = prefixes;
    }

    /// Pure pattern lookup, independent of the stateful `feed` stepping
    pub fn match_pattern(&self, buffer: &str) -> Option<&str> {
        self.patterns.get(buffer).map(String::as_str)
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Feed one token; `now` drives the staleness clock
    pub fn feed(&mut self, token: &str, now: Instant) -> Outcome {
        self.last_fed = Some(now);

        // Count digits accumulate before any literal token arrives.
        // A leading '0' is a command in its own right, never a count digit.
        if self.buffer.is_empty() && is_count_digit(token, &self.count) {
            self.count.push_str(token);
            trace!(count = %self.count, "accumulating count prefix");
            return Outcome::Waiting;
        }

        self.buffer.push_str(token);

        if let Some(command) = self.patterns.get(&self.buffer).cloned() {
            let outcome = Outcome::Matched {
                command,
                pattern: std::mem::take(&mut self.buffer),
                count: self.take_count(),
            };
            self.last_fed = None;
            trace!(?outcome, "sequence matched");
            return outcome;
        }

        if self.prefixes.contains(&self.buffer) {
            trace!(buffer = %self.buffer, "partial sequence, waiting");
            return Outcome::Waiting;
        }

        // Dead end: the triggering token is discarded with the rest of the
        // pending state, not reinterpreted as a new sequence start.
        trace!(buffer = %self.buffer, "invalid sequence");
        self.reset();
        Outcome::Invalid
    }

    /// Clear the pending sequence and count accumulator
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.count.clear();
        self.last_fed = None;
    }

    /// True while a partial sequence or count prefix is pending
    pub fn is_pending(&self) -> bool {
        !self.buffer.is_empty() || !self.count.is_empty()
    }

    /// The literal tokens accumulated so far
    pub fn pending_literal(&self) -> &str {
        &self.buffer
    }

    /// Reset a pending sequence that has waited too long for its next token
    ///
    /// Driven by an external clock (the engine's tick), never an internal
    /// timer. Returns true when a stale sequence was discarded.
    pub fn expire_stale(&mut self, now: Instant) -> bool {
        if !self.is_pending() {
            return false;
        }
        match self.last_fed {
            Some(at) if now.duration_since(at) >= self.staleness => {
                trace!(buffer = %self.buffer, "pending sequence went stale");
                self.reset();
                true
            }
            _ => false,
        }
    }

    /// Adjust the staleness window, clamped to its valid range
    pub fn set_staleness_window(&mut self, ms: u64) {
        self.staleness = Duration::from_millis(clamp_staleness(ms));
    }

    pub fn staleness_window(&self) -> Duration {
        self.staleness
    }

    fn take_count(&mut self) -> usize {
        let digits = std::mem::take(&mut self.count);
        if digits.is_empty() {
            1
        } else {
            // The accumulator only ever holds ASCII digits and the grammar
            // caps realistic counts far below usize::MAX; saturate anyway.
            digits.parse::<usize>().unwrap_or(usize::MAX)
        }
    }
}

/// Is this token a digit that extends the count accumulator?
fn is_count_digit(token: &str, accumulated: &str) -> bool {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_digit() => c != '0' || !accumulated.is_empty(),
        _ => false,
    }
}

/// Every strict prefix of a pattern, by char boundary
fn strict_prefixes(pattern: &str) -> Vec<String> {
    pattern
        .char_indices()
        .skip(1)
        .map(|(i, _)| pattern[..i].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(patterns: &[(&str, &str)]) -> SequenceResolver {
        let mut resolver = SequenceResolver::new();
        for (pattern, command) in patterns {
            resolver.register_pattern(pattern, command);
        }
        resolver
    }

    fn now() -> Instant {
        Instant::now()
    }

    #[test]
    fn test_empty_registry_is_invalid() {
        let mut resolver = SequenceResolver::new();
        assert_eq!(resolver.feed("z", now()), Outcome::Invalid);
        assert!(!resolver.is_pending());
    }

    #[test]
    fn test_single_token_match() {
        let mut resolver = resolver_with(&[("h", "move_left")]);
        let outcome = resolver.feed("h", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "move_left".into(),
                pattern: "h".into(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_two_token_sequence() {
        let mut resolver = resolver_with(&[("dd", "delete_line")]);
        assert_eq!(resolver.feed("d", now()), Outcome::Waiting);
        let outcome = resolver.feed("d", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "delete_line".into(),
                pattern: "dd".into(),
                count: 1,
            }
        );
        assert!(!resolver.is_pending());
    }

    #[test]
    fn test_prefix_then_dead_end() {
        let mut resolver = resolver_with(&[("gg", "file_start"), ("g_", "last_non_blank")]);
        assert_eq!(resolver.feed("g", now()), Outcome::Waiting);
        assert_eq!(resolver.feed("x", now()), Outcome::Invalid);
        assert!(!resolver.is_pending());
        // The 'x' was discarded, not replayed: the next 'g' starts fresh
        assert_eq!(resolver.feed("g", now()), Outcome::Waiting);
    }

    #[test]
    fn test_count_prefix_applies() {
        let mut resolver = resolver_with(&[("g_", "last_non_blank")]);
        assert_eq!(resolver.feed("3", now()), Outcome::Waiting);
        assert_eq!(resolver.feed("g", now()), Outcome::Waiting);
        let outcome = resolver.feed("_", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "last_non_blank".into(),
                pattern: "g_".into(),
                count: 3,
            }
        );
    }

    #[test]
    fn test_count_defaults_to_one() {
        let mut resolver = resolver_with(&[("g_", "last_non_blank")]);
        resolver.feed("g", now());
        let outcome = resolver.feed("_", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "last_non_blank".into(),
                pattern: "g_".into(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_leading_zero_is_a_command() {
        let mut resolver = resolver_with(&[("0", "line_start"), ("j", "move_down")]);
        let outcome = resolver.feed("0", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "line_start".into(),
                pattern: "0".into(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_zero_extends_started_count() {
        let mut resolver = resolver_with(&[("j", "move_down")]);
        assert_eq!(resolver.feed("1", now()), Outcome::Waiting);
        assert_eq!(resolver.feed("0", now()), Outcome::Waiting);
        let outcome = resolver.feed("j", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "move_down".into(),
                pattern: "j".into(),
                count: 10,
            }
        );
    }

    #[test]
    fn test_digits_after_literal_are_literal() {
        // Once a literal token arrived, digits no longer extend the count
        let mut resolver = resolver_with(&[("f1", "find_one")]);
        assert_eq!(resolver.feed("f", now()), Outcome::Waiting);
        let outcome = resolver.feed("1", now());
        assert_eq!(
            outcome,
            Outcome::Matched {
                command: "find_one".into(),
                pattern: "f1".into(),
                count: 1,
            }
        );
    }

    #[test]
    fn test_replay_is_deterministic() {
        let feed_all = |resolver: &mut SequenceResolver| -> Vec<Outcome> {
            ["2", "g", "g", "z", "d", "d"]
                .iter()
                .map(|t| resolver.feed(t, now()))
                .collect()
        };
        let mut a = resolver_with(&[("gg", "file_start"), ("dd", "delete_line")]);
        let mut b = resolver_with(&[("gg", "file_start"), ("dd", "delete_line")]);
        assert_eq!(feed_all(&mut a), feed_all(&mut b));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut resolver = resolver_with(&[("x", "old_owner")]);
        resolver.register_pattern("x", "new_owner");
        assert_eq!(resolver.match_pattern("x"), Some("new_owner"));
        assert_eq!(resolver.pattern_count(), 1);
    }

    #[test]
    fn test_unregister_rebuilds_prefixes() {
        let mut resolver = resolver_with(&[("gg", "file_start")]);
        resolver.unregister_pattern("gg");
        assert_eq!(resolver.feed("g", now()), Outcome::Invalid);
    }

    #[test]
    fn test_unregister_command_drops_all_patterns() {
        let mut resolver = resolver_with(&[("fa", "find"), ("fb", "find"), ("h", "left")]);
        resolver.unregister_command("find");
        assert_eq!(resolver.pattern_count(), 1);
        assert_eq!(resolver.feed("f", now()), Outcome::Invalid);
    }

    #[test]
    fn test_match_pattern_is_pure() {
        let mut resolver = resolver_with(&[("gg", "file_start")]);
        resolver.feed("g", now());
        // Lookup does not disturb the pending buffer
        assert_eq!(resolver.match_pattern("gg"), Some("file_start"));
        assert_eq!(resolver.pending_literal(), "g");
    }

    #[test]
    fn test_staleness_resets_pending() {
        let mut resolver = resolver_with(&[("gg", "file_start")]);
        resolver.set_staleness_window(100);
        let t0 = now();
        assert_eq!(resolver.feed("g", t0), Outcome::Waiting);
        assert!(!resolver.expire_stale(t0 + Duration::from_millis(50)));
        assert!(resolver.is_pending());
        assert!(resolver.expire_stale(t0 + Duration::from_millis(150)));
        assert!(!resolver.is_pending());
    }

    #[test]
    fn test_expire_without_pending_is_noop() {
        let mut resolver = resolver_with(&[("gg", "file_start")]);
        assert!(!resolver.expire_stale(now() + Duration::from_secs(60)));
    }
}
