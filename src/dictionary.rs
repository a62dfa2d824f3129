use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("dictionary file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Candidate word pool plus a denylist.
///
/// Entries are lowercase and trimmed. The pool is only ever replaced wholesale.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    words: Vec<String>,
    blacklist: HashSet<String>,
}

fn normalized_lines(text: &str) -> impl Iterator<Item = String> + '_ {
    text.lines()
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
}

fn read_text(path: &Path) -> Result<String, DictionaryError> {
    fs::read_to_string(path).map_err(|source| DictionaryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dict = Self::new();
        dict.words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        dict
    }

    pub fn with_blacklist<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.blacklist = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// Replace the pool with the contents of `path`. Returns the number of words loaded.
    ///
    /// The previous pool is dropped even when loading fails.
    pub fn load(&mut self, path: &Path) -> Result<usize, DictionaryError> {
        self.words.clear();
        if !path.exists() {
            return Err(DictionaryError::NotFound(path.to_path_buf()));
        }
        let text = read_text(path)?;
        self.words = normalized_lines(&text).collect();
        Ok(self.words.len())
    }

    /// Replace the blacklist. A missing file simply means an empty blacklist.
    pub fn load_blacklist(&mut self, path: &Path) -> Result<usize, DictionaryError> {
        self.blacklist.clear();
        if !path.exists() {
            return Ok(0);
        }
        let text = read_text(path)?;
        self.blacklist = normalized_lines(&text).collect();
        Ok(self.blacklist.len())
    }

    /// Every non-blacklisted word containing `fragment`, in dictionary order.
    pub fn filter(&self, fragment: &str) -> Vec<&str> {
        let fragment = fragment.to_lowercase();
        self.words
            .iter()
            .filter(|w| w.contains(fragment.as_str()) && !self.blacklist.contains(w.as_str()))
            .map(String::as_str)
            .collect()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn blacklist_len(&self) -> usize {
        self.blacklist.len()
    }

    pub fn is_blacklisted(&self, word: &str) -> bool {
        self.blacklist.contains(&word.to_lowercase())
    }
}
