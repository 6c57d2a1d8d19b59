//! Identifier matching
//!
//! A prefix tree over case-folded schema identifiers. Finding every known
//! identifier in a line costs time proportional to the text length times the
//! length of the walk at each word start, independent of how many identifiers
//! are indexed.
//!
//! Matches are whole words only (a word being a maximal run of alphanumeric
//! or underscore characters), never overlap, and the longest identifier wins
//! at any start position.

use std::collections::HashMap;

use crate::types::Match;

/// Whether `c` can be part of an identifier word
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    /// Identifier as it was added, present when a path ends here
    terminal: Option<String>,
}

/// Multi-pattern matcher for schema identifiers.
///
/// The index is built once and then only read, so one matcher can be shared
/// across threads scanning independent inputs.
#[derive(Debug, Default, Clone)]
pub struct IdentifierMatcher {
    root: TrieNode,
    len: usize,
}

impl IdentifierMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index one identifier. Empty identifiers are ignored, and adding an
    /// identifier that is already present (in any case) keeps the first spelling.
    pub fn add(&mut self, identifier: &str) {
        if identifier.is_empty() {
            return;
        }

        let mut node = &mut self.root;
        for c in identifier.chars().flat_map(char::to_lowercase) {
            node = node.children.entry(c).or_default();
        }

        if node.terminal.is_none() {
            node.terminal = Some(identifier.to_string());
            self.len += 1;
        }
    }

    pub fn add_all<I, S>(&mut self, identifiers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for identifier in identifiers {
            self.add(identifier.as_ref());
        }
    }

    /// Case-insensitive membership check
    pub fn contains(&self, identifier: &str) -> bool {
        self.get(identifier).is_some()
    }

    /// Look up the indexed spelling of an identifier, ignoring case
    pub fn get(&self, identifier: &str) -> Option<&str> {
        if identifier.is_empty() {
            return None;
        }

        let mut node = &self.root;
        for c in identifier.chars().flat_map(char::to_lowercase) {
            node = node.children.get(&c)?;
        }
        node.terminal.as_deref()
    }

    /// Drop every indexed identifier
    pub fn clear(&mut self) {
        self.root = TrieNode::default();
        self.len = 0;
    }

    /// Number of distinct identifiers indexed
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Find all identifier occurrences, ignoring case
    pub fn find_all(&self, text: &str) -> Vec<Match> {
        self.find_all_with_case(text, false)
    }

    /// Find all identifier occurrences in left-to-right order.
    ///
    /// With `case_sensitive` set, an occurrence must be spelled exactly as the
    /// identifier was added.
    pub fn find_all_with_case(&self, text: &str, case_sensitive: bool) -> Vec<Match> {
        let mut matches = Vec::new();
        if text.is_empty() || self.is_empty() {
            return matches;
        }

        let chars: Vec<(usize, char)> = text.char_indices().collect();
        let mut pos = 0;

        while pos < chars.len() {
            // Nothing can start in the middle of a word
            if pos > 0 && is_word_char(chars[pos - 1].1) {
                pos += 1;
                continue;
            }

            match self.longest_at(text, &chars, pos, case_sensitive) {
                Some((next, m)) => {
                    matches.push(m);
                    pos = next;
                }
                None => pos += 1,
            }
        }

        matches
    }

    /// Walk the trie from `start` and return the longest terminal that ends on
    /// a word boundary, with the char index to resume scanning from.
    fn longest_at(
        &self,
        text: &str,
        chars: &[(usize, char)],
        start: usize,
        case_sensitive: bool,
    ) -> Option<(usize, Match)> {
        let mut node = &self.root;
        let mut terminals: Vec<(usize, &str)> = Vec::new();

        'walk: for (idx, &(_, c)) in chars.iter().enumerate().skip(start) {
            for folded in c.to_lowercase() {
                match node.children.get(&folded) {
                    Some(child) => node = child,
                    None => break 'walk,
                }
            }
            if let Some(identifier) = node.terminal.as_deref() {
                terminals.push((idx + 1, identifier));
            }
        }

        let start_byte = chars[start].0;
        terminals.into_iter().rev().find_map(|(end, identifier)| {
            if end < chars.len() && is_word_char(chars[end].1) {
                return None;
            }
            let end_byte = chars.get(end).map_or(text.len(), |&(byte, _)| byte);
            if case_sensitive && &text[start_byte..end_byte] != identifier {
                return None;
            }
            Some((end, Match::new(identifier, start_byte, end_byte)))
        })
    }
}

impl<S: AsRef<str>> FromIterator<S> for IdentifierMatcher {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut matcher = IdentifierMatcher::new();
        matcher.add_all(iter);
        matcher
    }
}

impl<S: AsRef<str>> Extend<S> for IdentifierMatcher {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.add_all(iter);
    }
}
