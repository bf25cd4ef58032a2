//! Sentence splitting and greedy chunk packing for the knowledge corpus.
//!
//! Chunks never overlap and never reorder sentences: joining every chunk with a
//! single space gives back exactly the sentence sequence from [`split_sentences`].

use super::models::KnowledgeChunk;

fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

/// Splits `text` into sentences on `.`, `!` and `?`.
///
/// A run of terminators (`"?!"`, `"..."`) closes a single sentence. The first
/// terminator character is kept. Internal whitespace is collapsed to single
/// spaces and empty sentences are discarded. Trailing text without a
/// terminator becomes the last sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if is_terminator(ch) {
            while chars.peek().copied().is_some_and(is_terminator) {
                chars.next();
            }
            push_sentence(&mut sentences, &current, Some(ch));
            current.clear();
        } else {
            current.push(ch);
        }
    }
    push_sentence(&mut sentences, &current, None);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, body: &str, terminator: Option<char>) {
    let words: Vec<&str> = body.split_whitespace().collect();
    if words.is_empty() {
        return;
    }

    let mut sentence = words.join(" ");
    if let Some(terminator) = terminator {
        sentence.push(terminator);
    }
    sentences.push(sentence);
}

/// Packs sentences greedily into chunks of fewer than `max_chars` characters.
///
/// When appending the next sentence would make the buffer reach or exceed
/// `max_chars`, the buffer is flushed and the sentence starts a new one. A
/// single sentence that is already longer than the limit becomes its own chunk.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<KnowledgeChunk> {
    let mut chunks = Vec::new();
    let mut buffer = String::new();
    let mut buffer_chars = 0usize;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();

        if buffer.is_empty() {
            buffer = sentence;
            buffer_chars = sentence_chars;
            continue;
        }

        if buffer_chars + 1 + sentence_chars >= max_chars {
            chunks.push(KnowledgeChunk::new(std::mem::take(&mut buffer)));
            buffer = sentence;
            buffer_chars = sentence_chars;
        } else {
            buffer.push(' ');
            buffer.push_str(&sentence);
            buffer_chars += 1 + sentence_chars;
        }
    }

    if !buffer.is_empty() {
        chunks.push(KnowledgeChunk::new(buffer));
    }

    chunks
}
