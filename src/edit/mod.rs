//! The sentence/word edit engine (§4.9): tokenisation, edit-script parsing, and
//! structured application of word insertions to a document body.
//!
//! A document body is logically a finite ordered sequence of sentences, each a
//! finite ordered sequence of words (§3 `FileBody`). Edits never touch arbitrary
//! byte ranges — they insert whole words at a (sentence-index, word-index)
//! coordinate, which is what lets two users hold locks on different sentences of
//! the same document without interfering (§4.4).

use crate::error::Error;

/// Sentences longer than this are chopped at the boundary rather than left as one
/// unbounded run (§4.9 "Sentences beyond a configured maximum-count or
/// maximum-length are split at the boundary").
pub const MAX_SENTENCE_LEN: usize = 2048;
/// Hard ceiling on the number of sentences tracked for a single document.
pub const MAX_SENTENCE_COUNT: usize = 100_000;
/// Hard ceiling on a single word's length.
pub const MAX_WORD_LEN: usize = 1024;
/// Hard ceiling on the number of words in a single sentence.
pub const MAX_WORDS_PER_SENTENCE: usize = 4096;

/// One (word-index, word) insertion, in the order it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditPair {
    pub word_index: usize,
    pub word: String,
}

/// A parsed edit script: an insertion batch targeting a single sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditScript {
    pub sentence_index: usize,
    pub pairs: Vec<EditPair>,
}

/// Cached derived statistics for a document body (§3 `FileRecord`/`FileMetadata`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub word_count: u64,
    pub char_count: u64,
}

/// Parses the wire edit-script payload: `<sentence-index>|<word-index>|<word>|...`.
///
/// The `<word>` field may not itself contain `|` (§9 "edit-script injectivity");
/// an empty pair list (payload is just `<sentence-index>` or `<sentence-index>|`)
/// parses to a no-op script, which is valid (§8: "WriteCommit with an empty edit
/// pair list is a no-op on the body but still snapshots current into the undo slot").
pub fn parse_edit_script(payload: &str) -> Result<EditScript, Error> {
    let mut fields = crate::wire::decode_fields(payload).into_iter();
    let sentence_index: usize =
        fields.next().ok_or(Error::InvalidParameters)?.parse().map_err(|_| Error::InvalidParameters)?;

    let mut pairs = Vec::new();
    loop {
        let Some(idx_field) = fields.next() else { break };
        let word_index: usize = idx_field.parse().map_err(|_| Error::InvalidParameters)?;
        let word = fields.next().ok_or(Error::InvalidParameters)?.to_owned();
        pairs.push(EditPair { word_index, word });
    }

    Ok(EditScript { sentence_index, pairs })
}

/// Serializes an [`EditScript`] back into its wire form (used by the client and by tests).
pub fn encode_edit_script(script: &EditScript) -> String {
    let mut out = script.sentence_index.to_string();
    for pair in &script.pairs {
        out.push('|');
        out.push_str(&pair.word_index.to_string());
        out.push('|');
        out.push_str(&pair.word);
    }
    out
}

/// Splits `body` into sentences: maximal runs terminated by `.`, `!` or `?` (the
/// terminator stays attached), with leading/trailing whitespace trimmed, plus a
/// residual non-terminated tail if it is non-empty after trimming.
pub fn split_sentences(body: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    for ch in body.chars() {
        current.push(ch);
        if matches!(ch, '.' | '!' | '?') {
            let trimmed = current.trim().to_owned();
            if !trimmed.is_empty() {
                sentences.extend(enforce_length_bound(trimmed));
            }
            current.clear();
        }
    }
    let trimmed = current.trim().to_owned();
    if !trimmed.is_empty() {
        sentences.extend(enforce_length_bound(trimmed));
    }
    sentences.truncate(MAX_SENTENCE_COUNT);
    sentences
}

/// Chops a single over-long sentence into `MAX_SENTENCE_LEN`-byte chunks.
fn enforce_length_bound(sentence: String) -> Vec<String> {
    if sentence.len() <= MAX_SENTENCE_LEN {
        return vec![sentence];
    }
    sentence
        .as_bytes()
        .chunks(MAX_SENTENCE_LEN)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect()
}

/// Splits a sentence on runs of whitespace into words, each bounded in length; the
/// total word count is bounded by [`MAX_WORDS_PER_SENTENCE`].
pub fn split_words(sentence: &str) -> Vec<String> {
    sentence
        .split_whitespace()
        .take(MAX_WORDS_PER_SENTENCE)
        .map(|w| {
            if w.len() > MAX_WORD_LEN {
                w[..MAX_WORD_LEN].to_owned()
            } else {
                w.to_owned()
            }
        })
        .collect()
}

/// Rebuilds a body from sentences, concatenating with single-space separators.
pub fn join_sentences(sentences: &[String]) -> String {
    sentences.join(" ")
}

/// Recomputes (word count, character count) from `body` by retokenising it (§8
/// invariant 4: cached counts must always equal what retokenising the current body
/// produces).
pub fn compute_stats(body: &str) -> Stats {
    let sentences = split_sentences(body);
    let word_count: u64 = sentences.iter().map(|s| split_words(s).len() as u64).sum();
    Stats { word_count, char_count: body.chars().count() as u64 }
}

/// Applies `script` to `body`, returning the new body.
///
/// The whole script is validated before anything is mutated: an out-of-range
/// sentence or word index aborts the commit atomically and leaves `body`
/// untouched (§4.9 step 3, §8 boundary behaviors).
pub fn apply_edit(body: &str, script: &EditScript) -> Result<String, Error> {
    let mut sentences = split_sentences(body);
    let n = sentences.len();

    if script.sentence_index > n {
        return Err(Error::InvalidIndex);
    }
    if script.sentence_index == n {
        sentences.push(String::new());
    }

    let mut working: Vec<String> = split_words(&sentences[script.sentence_index]);
    for pair in &script.pairs {
        let m = working.len();
        if pair.word_index > m {
            return Err(Error::InvalidIndex);
        }
        working.insert(pair.word_index, pair.word.clone());
    }

    let rebuilt_sentence = working.join(" ");
    let expanded = split_sentences(&rebuilt_sentence);
    let replacement = if expanded.is_empty() { vec![String::new()] } else { expanded };

    sentences.splice(script.sentence_index..=script.sentence_index, replacement);

    Ok(join_sentences(&sentences))
}

#[cfg(test)]
mod tests;
