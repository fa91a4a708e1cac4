use anyhow::Result;
use once_cell::sync::Lazy;
use porter_stemmer::stem;
use std::collections::HashSet;

static STOP_WORDS: Lazy<HashSet<String>> = Lazy::new(|| {
    stop_words::get(stop_words::LANGUAGE::English)
        .into_iter()
        .map(|x| x.to_string())
        .collect()
});

/// A character filter receives the original text as a stream of characters and can transform the
/// stream by adding, removing, or changing characters before tokenization.
pub trait CharacterFilter: Send + Sync {
    fn filter(&self, text: String) -> String;
}

/// Collapses all runs of whitespace (including newlines and form feeds left over from page
/// extraction) into single spaces.
#[derive(Debug, Default)]
pub struct WhitespaceNormalizeFilter;

impl CharacterFilter for WhitespaceNormalizeFilter {
    fn filter(&self, text: String) -> String {
        text.split_whitespace().collect::<Vec<&str>>().join(" ")
    }
}

/// A tokenizer receives a stream of characters, breaks it up into individual tokens (usually
/// individual words), and outputs a stream of tokens.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: String) -> Vec<String>;
}

pub struct WhiteSpaceTokenizer;

impl Tokenizer for WhiteSpaceTokenizer {
    fn tokenize(&self, text: String) -> Vec<String> {
        text.split_whitespace()
            .map(|w| w.to_string())
            .collect::<Vec<String>>()
    }
}

/// A token filter receives the token stream and may add, remove, or change tokens.
/// For example, a lowercase token filter converts all tokens to lowercase and a stop token
/// filter removes common words (stop words) like "the" from the token stream.
pub trait TokenFilter: Send + Sync {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken>;
}

pub struct LowerCaseTokenFilter;

impl TokenFilter for LowerCaseTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut t| {
                t.term = t.term.to_lowercase();
                t
            })
            .collect()
    }
}

pub struct StopWordTokenFilter;

impl TokenFilter for StopWordTokenFilter {
    fn filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens.retain(|w| !STOP_WORDS.contains(&w.term));
        tokens
    }
}

pub struct PorterStemmerTokenFilter;

impl TokenFilter for PorterStemmerTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .map(|mut w| {
                w.term = stem(&w.term);
                w
            })
            .collect::<Vec<TextToken>>()
    }
}

/// Strips punctuation from tokens and filters out tokens that become empty or are too short
pub struct PunctuationStripFilter {
    min_length: usize,
}

impl PunctuationStripFilter {
    pub fn new(min_length: usize) -> Self {
        Self { min_length }
    }
}

impl Default for PunctuationStripFilter {
    fn default() -> Self {
        Self { min_length: 2 }
    }
}

impl TokenFilter for PunctuationStripFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter_map(|mut token| {
                // Strip leading and trailing punctuation
                let trimmed: String = token
                    .term
                    .trim_matches(|c: char| !c.is_alphanumeric())
                    .to_string();

                if trimmed.len() >= self.min_length && trimmed.chars().any(|c| c.is_alphanumeric())
                {
                    token.term = trimmed;
                    Some(token)
                } else {
                    None
                }
            })
            .collect()
    }
}

/// Filters out tokens that are purely numeric (like "123", "45.67", page numbers, etc.)
pub struct NumericTokenFilter;

impl TokenFilter for NumericTokenFilter {
    fn filter(&self, tokens: Vec<TextToken>) -> Vec<TextToken> {
        tokens
            .into_iter()
            .filter(|token| token.term.chars().any(|c| c.is_alphabetic()))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextToken {
    pub term: String,
    pub pos: usize,
}

impl std::ops::Deref for TextToken {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.term
    }
}

/// Pure text analysis pipeline - no async, no I/O, just text transformations
pub struct TextAnalyzer {
    char_filters: Vec<Box<dyn CharacterFilter>>,
    tokenizer: Box<dyn Tokenizer>,
    token_filters: Vec<Box<dyn TokenFilter>>,
}

impl TextAnalyzer {
    pub fn new(
        char_filters: Vec<Box<dyn CharacterFilter>>,
        tokenizer: Box<dyn Tokenizer>,
        token_filters: Vec<Box<dyn TokenFilter>>,
    ) -> Self {
        Self {
            char_filters,
            tokenizer,
            token_filters,
        }
    }

    /// The standard pipeline used for both page text and queries. Queries MUST go through the
    /// same pipeline as indexed pages or their terms will never match the vocabulary.
    pub fn standard() -> Self {
        Self::new(
            vec![Box::new(WhitespaceNormalizeFilter)],
            Box::new(WhiteSpaceTokenizer),
            vec![
                Box::new(PunctuationStripFilter::default()),
                Box::new(LowerCaseTokenFilter),
                Box::new(NumericTokenFilter),
                Box::new(StopWordTokenFilter),
                Box::new(PorterStemmerTokenFilter),
            ],
        )
    }

    pub fn char_filter(&self, mut content: String) -> String {
        for filter in self.char_filters.iter() {
            content = filter.filter(content);
        }
        content
    }

    pub fn tokenize(&self, content: String) -> Vec<TextToken> {
        let tokens = self.tokenizer.tokenize(content);
        tokens
            .iter()
            .enumerate()
            .map(|(idx, tok)| TextToken {
                term: tok.clone(),
                pos: idx,
            })
            .collect()
    }

    pub fn token_filter(&self, mut tokens: Vec<TextToken>) -> Vec<TextToken> {
        for filter in self.token_filters.iter() {
            tokens = filter.filter(tokens);
        }
        tokens
    }

    /// Analyzes raw content and returns a list of tokens
    pub fn analyze(&self, raw_content: String) -> Result<Vec<TextToken>> {
        let content = self.char_filter(raw_content);

        let mut tokens = self.tokenize(content);

        tokens = self.token_filter(tokens);
        Ok(tokens)
    }
}
