/// Largest block accepted by a single Append Block call (4 MiB).
pub const MAX_APPEND_BLOCK_SIZE: usize = 4 * 1024 * 1024;

/// Split `text` into ordered pieces of at most `max_len` bytes.
///
/// Pieces always end on a UTF-8 character boundary, so a piece can be
/// shorter than `max_len` when the next character would straddle the
/// limit. A single character wider than `max_len` forms a piece of its own.
/// For ASCII input this yields exactly `ceil(len / max_len)` pieces.
/// Empty input yields one empty piece.
///
/// # Panics
///
/// Panics if `max_len` is zero.
pub fn split(text: &str, max_len: usize) -> Vec<&str> {
    assert!(max_len > 0, "chunk size must be positive");

    if text.is_empty() {
        return vec![text];
    }

    let mut chunks = Vec::with_capacity(text.len().div_ceil(max_len));
    let mut rest = text;
    while !rest.is_empty() {
        let mut end = max_len.min(rest.len());
        while !rest.is_char_boundary(end) {
            end -= 1;
        }
        if end == 0 {
            // first char is wider than max_len
            end = rest.chars().next().map_or(rest.len(), char::len_utf8);
        }
        let (head, tail) = rest.split_at(end);
        chunks.push(head);
        rest = tail;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_pieces_are_full_except_last() {
        let text = "abcdefghij";
        let chunks = split(text, 3);
        assert_eq!(chunks, vec!["abc", "def", "ghi", "j"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn piece_count_is_ceil_of_length() {
        let text = "x".repeat(1000);
        for max_len in [1, 7, 100, 999, 1000, 1001, 4096] {
            let chunks = split(&text, max_len);
            assert_eq!(chunks.len(), text.len().div_ceil(max_len), "max_len = {max_len}");
            assert!(chunks.iter().all(|c| c.len() <= max_len));
            assert_eq!(chunks.concat(), text);
        }
    }

    #[test]
    fn exact_multiple_has_no_trailing_empty_piece() {
        assert_eq!(split("abcdef", 3), vec!["abc", "def"]);
    }

    #[test]
    fn empty_text_is_one_empty_piece() {
        assert_eq!(split("", 8), vec![""]);
    }

    #[test]
    fn never_splits_a_multibyte_character() {
        // "é" is two bytes; a 3-byte limit cannot hold "aé" + the next byte
        let text = "aéaéaé";
        let chunks = split(text, 3);
        assert_eq!(chunks, vec!["aé", "aé", "aé"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn wide_character_beyond_limit_gets_its_own_piece() {
        let text = "a€b";
        let chunks = split(text, 2);
        assert_eq!(chunks, vec!["a", "€", "b"]);
    }
}
