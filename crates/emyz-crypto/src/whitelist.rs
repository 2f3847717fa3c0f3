//! Key whitelists
//!
//! An empty whitelist accepts every key. Whitelist files hold one key per
//! line; the catalog's beacon whitelist may carry a comment after the key,
//! separated by a single space or tab.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use emyz_core::{EmyzResult, PeerKey, KEY_Z85_LEN, MAX_PUBLICKEYS_FILE_LINE_LEN};

/// Set of authorized public keys
#[derive(Clone, Debug, Default)]
pub struct Whitelist {
    keys: HashSet<PeerKey>,
}

impl Whitelist {
    pub fn new() -> Self {
        Whitelist {
            keys: HashSet::new(),
        }
    }

    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut whitelist = Whitelist::new();
        whitelist.extend(keys);
        whitelist
    }

    /// Add a key; returns false if it was already present
    pub fn insert(&mut self, key: &str) -> bool {
        self.keys.insert(PeerKey::new(key))
    }

    /// Remove a key; returns false if it was absent
    pub fn remove(&mut self, key: &str) -> bool {
        self.keys.remove(&PeerKey::new(key))
    }

    pub fn extend<I, S>(&mut self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.keys
            .extend(keys.into_iter().map(|k| PeerKey::new(k.as_ref())));
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn contains(&self, key: &PeerKey) -> bool {
        self.keys.contains(key)
    }

    /// Empty whitelist or listed key
    pub fn permits(&self, key: &PeerKey) -> bool {
        self.keys.is_empty() || self.keys.contains(key)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerKey> {
        self.keys.iter()
    }

    /// Add every key of a whitelist file; returns the number of keys read
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> EmyzResult<usize> {
        let keys = read_keys_file(path)?;
        let count = keys.len();
        self.keys.extend(keys);
        Ok(count)
    }
}

/// Key and comment parsed from one whitelist line
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyLine {
    pub key: PeerKey,
    pub comment: String,
}

fn parse_line(line: &str) -> Option<KeyLine> {
    let line = line.strip_suffix('\r').unwrap_or(line);

    let mut end = line.len().min(MAX_PUBLICKEYS_FILE_LINE_LEN - 1);
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    let line = &line[..end];

    let key = line.get(..KEY_Z85_LEN)?;
    // One separator character, then a non-empty comment
    let comment = line
        .get(KEY_Z85_LEN..)
        .and_then(|rest| {
            let mut chars = rest.chars();
            chars.next()?;
            Some(chars.as_str())
        })
        .unwrap_or("");

    Some(KeyLine {
        key: PeerKey::new(key),
        comment: comment.to_owned(),
    })
}

/// Parse whitelist text, keeping comments
pub fn parse_keys_with_comments(text: &str) -> Vec<KeyLine> {
    text.lines().filter_map(parse_line).collect()
}

/// Parse whitelist text, ignoring comments
pub fn parse_keys(text: &str) -> Vec<PeerKey> {
    text.lines()
        .filter_map(parse_line)
        .map(|line| line.key)
        .collect()
}

pub fn read_keys_file(path: impl AsRef<Path>) -> EmyzResult<Vec<PeerKey>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_keys(&text))
}

pub fn read_keys_with_comments_file(path: impl AsRef<Path>) -> EmyzResult<Vec<KeyLine>> {
    let text = fs::read_to_string(path)?;
    Ok(parse_keys_with_comments(&text))
}
