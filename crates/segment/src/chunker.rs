/// Separator cascade, coarsest first. A piece that fits under the size
/// bound is never split further; one that does not falls through to the
/// next separator, ending in a hard character window.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

pub struct ChunkerConfig {
    /// Upper bound on chunk length, in characters, overlap included.
    pub chunk_size: usize,
    /// Characters carried from the tail of one chunk into the next.
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// Split text into overlapping chunks, each at most `chunk_size`
    /// characters. Empty or whitespace-only input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.config.chunk_size {
            return vec![text.to_string()];
        }

        // Pieces are bounded by chunk_size minus overlap so that a window
        // carrying an overlap tail still respects the size bound.
        let piece_limit = self.config.chunk_size.saturating_sub(self.config.overlap).max(1);
        let mut pieces = Vec::new();
        split_fitting(text, SEPARATORS, piece_limit, &mut pieces);

        let mut chunks: Vec<String> = Vec::new();
        let mut buffer = String::new();
        for piece in pieces {
            if !buffer.is_empty()
                && char_len(&buffer) + 1 + char_len(&piece) > self.config.chunk_size
            {
                let tail = self.overlap_tail(&buffer);
                chunks.push(std::mem::take(&mut buffer));
                buffer = tail;
            }
            if !buffer.is_empty() {
                buffer.push(' ');
            }
            buffer.push_str(&piece);
        }
        if !buffer.trim().is_empty() {
            chunks.push(buffer);
        }

        chunks
    }

    /// Tail of `text` worth roughly `overlap` characters, cut on a word
    /// boundary so no chunk opens mid-word.
    fn overlap_tail(&self, text: &str) -> String {
        let mut words: Vec<&str> = Vec::new();
        let mut size = 0;
        for word in text.split_whitespace().rev() {
            let word_len = char_len(word) + 1;
            if size + word_len > self.config.overlap {
                break;
            }
            size += word_len;
            words.push(word);
        }
        words.reverse();
        words.join(" ")
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Recursive separator cascade: split on the coarsest separator, keep the
/// parts that fit, push oversize parts down to the next separator. With
/// the cascade exhausted, fall back to fixed character windows.
fn split_fitting(text: &str, separators: &[&str], limit: usize, out: &mut Vec<String>) {
    if char_len(text) <= limit {
        if !text.trim().is_empty() {
            out.push(text.trim().to_string());
        }
        return;
    }

    let Some((sep, rest)) = separators.split_first() else {
        let chars: Vec<char> = text.chars().collect();
        for window in chars.chunks(limit) {
            let piece: String = window.iter().collect();
            if !piece.trim().is_empty() {
                out.push(piece.trim().to_string());
            }
        }
        return;
    };

    for part in text.split(sep) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if char_len(part) <= limit {
            out.push(part.to_string());
        } else {
            split_fitting(part, rest, limit, out);
        }
    }
}
