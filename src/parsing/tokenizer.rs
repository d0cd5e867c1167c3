//! Statement tokenizing
//!
//! The tokenizer is a cursor over the statement string. `read_word` returns
//! the next maximal run of non-separator characters, where "separator" is
//! decided by a per-call, swappable [`SeparatorSet`]. Sets receive callbacks
//! as the cursor crosses separators and finds words; [`CountingSeparators`]
//! uses them to keep per-character counts and the separator sequence crossed
//! since the last word, which is how downstream parsers reconstruct operators
//! (`<`, `=` crossed back to back is `<=`) and tell a trailing table alias
//! from a comma-delimited next table without look-ahead.
//!
//! Quoted strings are captured by temporarily installing a set in which
//! everything except the matching quote is a non-separator, then restoring
//! the caller's set at the closing quote.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// A word returned by the tokenizer. Quoted words had their surrounding
/// quotes stripped; callers use the flag to tell text literals from bare
/// identifiers and numerals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Word<'a> {
    pub text: &'a str,
    pub quoted: bool,
}

impl Word<'_> {
    /// Case-insensitive keyword check, never matching quoted words.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        !self.quoted && self.text.eq_ignore_ascii_case(keyword)
    }
}

/// Decides which characters split words, and observes the scan.
pub trait SeparatorSet {
    fn is_separator(&self, c: char) -> bool;

    /// Fired for every separator character the cursor crosses.
    fn separator_crossed(&mut self, _c: char) {}

    /// Fired when a complete word has been read.
    fn word_found(&mut self, _word: &str) {}
}

/// A plain separator set over a fixed character list.
#[derive(Clone, Debug)]
pub struct CharSeparators {
    chars: Vec<char>,
}

impl CharSeparators {
    pub fn new(chars: &str) -> Self {
        CharSeparators {
            chars: chars.chars().collect(),
        }
    }
}

impl SeparatorSet for CharSeparators {
    fn is_separator(&self, c: char) -> bool {
        self.chars.contains(&c)
    }
}

/// The quoted-string set: everything except the matching quote character is a
/// non-separator. Installed by the tokenizer while scanning a quoted word.
struct QuoteBounded {
    quote: char,
}

impl SeparatorSet for QuoteBounded {
    fn is_separator(&self, c: char) -> bool {
        c == self.quote
    }
}

/// A separator set that additionally records, since the last reset, how many
/// times each separator was seen, plus the separator sequence crossed between
/// the previous word and the one just read (the "gap").
#[derive(Clone, Debug, Default)]
pub struct CountingSeparators {
    chars: Vec<char>,
    counts: HashMap<char, usize>,
    pending: Vec<char>,
    last_gap: Vec<char>,
}

impl CountingSeparators {
    pub fn new(chars: &str) -> Self {
        CountingSeparators {
            chars: chars.chars().collect(),
            ..Default::default()
        }
    }

    /// Times `c` was crossed since the last reset.
    pub fn count(&self, c: char) -> usize {
        self.counts.get(&c).copied().unwrap_or(0)
    }

    /// Separators crossed between the previous word and the last one read.
    pub fn last_gap(&self) -> &[char] {
        &self.last_gap
    }

    /// Separators crossed after the last word, when the statement ended
    /// before another word was found.
    pub fn pending(&self) -> &[char] {
        &self.pending
    }

    pub fn reset(&mut self) {
        self.counts.clear();
        self.pending.clear();
        self.last_gap.clear();
    }
}

impl SeparatorSet for CountingSeparators {
    fn is_separator(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    fn separator_crossed(&mut self, c: char) {
        *self.counts.entry(c).or_insert(0) += 1;
        self.pending.push(c);
    }

    fn word_found(&mut self, _word: &str) {
        self.last_gap = std::mem::take(&mut self.pending);
    }
}

/// A cursor over one statement string.
pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer { input, pos: 0 }
    }

    /// The unscanned remainder of the statement.
    pub fn remainder(&self) -> &'a str {
        &self.input[self.pos..]
    }

    /// Reads the next word under the given separator set, or `None` at the
    /// end of the statement. Leading separators are crossed (firing the
    /// set's callback per character); the terminating separator is left for
    /// the next call, so it lands in the following word's gap.
    pub fn read_word(&mut self, seps: &mut dyn SeparatorSet) -> Result<Option<Word<'a>>> {
        // Cross separators up to the next word.
        let mut chars = self.input[self.pos..].char_indices();
        let (start, first) = loop {
            match chars.next() {
                Some((_, c)) if seps.is_separator(c) => seps.separator_crossed(c),
                Some((offset, c)) => break (self.pos + offset, c),
                None => {
                    self.pos = self.input.len();
                    return Ok(None);
                }
            }
        };

        if first == '\'' || first == '"' {
            return self.read_quoted(seps, start, first).map(Some);
        }

        // Scan to the next separator; do not consume it.
        let mut end = self.input.len();
        for (offset, c) in self.input[start..].char_indices() {
            if seps.is_separator(c) {
                end = start + offset;
                break;
            }
        }
        self.pos = end;
        let word = &self.input[start..end];
        seps.word_found(word);
        Ok(Some(Word {
            text: word,
            quoted: false,
        }))
    }

    /// Scans a quoted word under a temporarily installed quote-bounded set;
    /// the caller's set resumes at the closing quote.
    fn read_quoted(
        &mut self,
        seps: &mut dyn SeparatorSet,
        open: usize,
        quote: char,
    ) -> Result<Word<'a>> {
        let bounded = QuoteBounded { quote };
        let body = open + quote.len_utf8();
        for (offset, c) in self.input[body..].char_indices() {
            if bounded.is_separator(c) {
                let word = &self.input[body..body + offset];
                self.pos = body + offset + c.len_utf8();
                seps.word_found(word);
                return Ok(Word {
                    text: word,
                    quoted: true,
                });
            }
        }
        Err(Error::UnterminatedQuote(self.input[open..].to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(input: &str, seps: &str) -> Vec<String> {
        let mut tok = Tokenizer::new(input);
        let mut set = CharSeparators::new(seps);
        let mut out = Vec::new();
        while let Some(word) = tok.read_word(&mut set).unwrap() {
            out.push(word.text.to_string());
        }
        out
    }

    #[test]
    fn splits_on_separator_set() {
        assert_eq!(
            words("SELECT name,id FROM host", " ,"),
            ["SELECT", "name", "id", "FROM", "host"]
        );
    }

    #[test]
    fn separator_set_is_swappable_per_call() {
        let mut tok = Tokenizer::new("a,b c");
        let mut spaces = CharSeparators::new(" ");
        let mut commas = CharSeparators::new(" ,");
        assert_eq!(
            tok.read_word(&mut spaces).unwrap().unwrap().text,
            "a,b" // comma is not a separator under this set
        );
        assert_eq!(tok.read_word(&mut commas).unwrap().unwrap().text, "c");
    }

    #[test]
    fn quoted_words_keep_separators() {
        let mut tok = Tokenizer::new("('g1,g2', 5)");
        let mut set = CountingSeparators::new(" ,()");
        let w = tok.read_word(&mut set).unwrap().unwrap();
        assert_eq!(w.text, "g1,g2");
        assert!(w.quoted);
        assert_eq!(set.last_gap(), ['(']);

        let w = tok.read_word(&mut set).unwrap().unwrap();
        assert_eq!(w.text, "5");
        assert!(!w.quoted);
        assert_eq!(set.last_gap(), [',', ' ']);
    }

    #[test]
    fn unterminated_quote_is_an_error() {
        let mut tok = Tokenizer::new("WHERE name='alpha");
        let mut set = CharSeparators::new(" =");
        tok.read_word(&mut set).unwrap();
        tok.read_word(&mut set).unwrap();
        assert!(matches!(
            tok.read_word(&mut set),
            Err(Error::UnterminatedQuote(_))
        ));
    }

    #[test]
    fn counting_records_gap_and_totals() {
        let mut tok = Tokenizer::new("host h, hostgroup");
        let mut set = CountingSeparators::new(" ,");
        tok.read_word(&mut set).unwrap(); // host
        assert_eq!(set.last_gap(), [] as [char; 0]);
        tok.read_word(&mut set).unwrap(); // h
        assert_eq!(set.last_gap(), [' ']);
        tok.read_word(&mut set).unwrap(); // hostgroup
        assert_eq!(set.last_gap(), [',', ' ']);
        assert_eq!(set.count(','), 1);
        assert_eq!(set.count(' '), 2);
    }

    #[test]
    fn trailing_separators_stay_pending() {
        let mut tok = Tokenizer::new("(1, 2)");
        let mut set = CountingSeparators::new(" ,()");
        tok.read_word(&mut set).unwrap(); // 1
        tok.read_word(&mut set).unwrap(); // 2
        assert_eq!(tok.read_word(&mut set).unwrap(), None);
        assert_eq!(set.pending(), [')']);
    }

    #[test]
    fn operator_characters_land_in_the_gap() {
        let mut tok = Tokenizer::new("clock<=12345");
        let mut set = CountingSeparators::new(" <>=!");
        tok.read_word(&mut set).unwrap(); // clock
        let w = tok.read_word(&mut set).unwrap().unwrap();
        assert_eq!(w.text, "12345");
        assert_eq!(set.last_gap(), ['<', '=']);
    }
}
