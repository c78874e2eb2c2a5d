//! Spell-check dictionary capability.
//!
//! Built once at boot and shared immutably. A disabled dictionary treats
//! every word as correct, so typo detection degrades to a no-op instead of
//! failing the pipeline.

use std::collections::HashSet;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Default)]
pub struct Dictionary {
    words: Option<HashSet<String>>,
}

impl Dictionary {
    /// A dictionary that accepts every word.
    pub fn disabled() -> Self {
        Self { words: None }
    }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: HashSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words: Some(words) }
    }

    /// Loads a plain word list (one word per line) or a Hunspell `.dic` file
    /// (leading entry count, `/FLAGS` suffixes).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut lines = content.lines().peekable();
        if let Some(first) = lines.peek() {
            if first.trim().chars().all(|c| c.is_ascii_digit()) {
                lines.next();
            }
        }

        let words = lines
            .map(|line| line.split('/').next().unwrap_or_default())
            .filter(|word| !word.trim_start().starts_with('#'));

        Ok(Self::from_words(words))
    }

    /// Boot-time constructor: a missing or unreadable file disables typo
    /// detection with a warning.
    pub fn load_or_disabled(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            tracing::info!("No dictionary configured, typo detection disabled");
            return Self::disabled();
        };

        match Self::load(path) {
            Ok(dictionary) => {
                tracing::info!(words = dictionary.len(), "Dictionary loaded");
                dictionary
            }
            Err(e) => {
                tracing::warn!("Dictionary unavailable, typo detection disabled: {}", e);
                Self::disabled()
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.words.is_some()
    }

    pub fn len(&self) -> usize {
        self.words.as_ref().map_or(0, HashSet::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive lookup. Always true when disabled.
    pub fn is_correct(&self, word: &str) -> bool {
        match &self.words {
            Some(words) => words.contains(&word.to_lowercase()),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disabled_accepts_everything() {
        let dictionary = Dictionary::disabled();
        assert!(!dictionary.is_ready());
        assert!(dictionary.is_correct("prontosaurvi"));
    }

    #[test]
    fn test_from_words_is_case_insensitive() {
        let dictionary = Dictionary::from_words(["Frozen", "ribs"]);
        assert!(dictionary.is_ready());
        assert!(dictionary.is_correct("FROZEN"));
        assert!(dictionary.is_correct("Ribs"));
        assert!(!dictionary.is_correct("frogen"));
    }

    #[test]
    fn test_load_hunspell_format() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "3").unwrap();
        writeln!(file, "frozen/AB").unwrap();
        writeln!(file, "# comment").unwrap();
        writeln!(file, "ribs").unwrap();
        writeln!(file, "beef/S").unwrap();

        let dictionary = Dictionary::load(file.path()).unwrap();
        assert_eq!(dictionary.len(), 3);
        assert!(dictionary.is_correct("beef"));
        assert!(!dictionary.is_correct("3"));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let result = Dictionary::load(Path::new("/nonexistent/words.dic"));
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_load_or_disabled_falls_back() {
        let dictionary = Dictionary::load_or_disabled(Some(Path::new("/nonexistent/words.dic")));
        assert!(!dictionary.is_ready());
        assert!(!Dictionary::load_or_disabled(None).is_ready());
    }
}
