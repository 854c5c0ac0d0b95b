//! Post body rules applied before a body reaches the store.

use crate::error::{QuillError, Result};

/// Longest accepted body, in characters.
pub const MAX_BODY_CHARS: usize = 140;

/// Words masked out of published bodies.
pub const BANNED_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

const MASK: &str = "****";

/// Check the length limit and mask banned words.
///
/// Words are split on single spaces and compared case-insensitively, so
/// `Fornax!` is left alone while `FORNAX` is masked.
///
/// # Errors
///
/// Returns `QuillError::InvalidBody` if the body is longer than
/// [`MAX_BODY_CHARS`].
pub fn prepare_body(body: &str) -> Result<String> {
    let length = body.chars().count();
    if length > MAX_BODY_CHARS {
        return Err(QuillError::invalid_body(format!(
            "body is {length} characters, limit is {MAX_BODY_CHARS}"
        )));
    }

    Ok(body
        .split(' ')
        .map(|word| {
            if BANNED_WORDS.iter().any(|banned| word.eq_ignore_ascii_case(banned)) {
                MASK
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" "))
}
