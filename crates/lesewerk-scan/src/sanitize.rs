// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Result sanitizer flattens recognised text to one line and bounds its
// length to what the record store accepts.

use lesewerk_core::MAX_IMG_TEXT_LEN;

/// Outcome of [`ResultSanitizer::sanitize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub text: String,
    /// Character count after line-break folding, before truncation.
    pub original_len: usize,
    pub truncated: bool,
}

/// Line-break folding plus truncation to a fixed character count.
///
/// No escaping happens here; the record store only uses bound parameters.
#[derive(Debug, Clone, Copy)]
pub struct ResultSanitizer {
    max_len: usize,
}

impl Default for ResultSanitizer {
    fn default() -> Self {
        Self::new(MAX_IMG_TEXT_LEN)
    }
}

impl ResultSanitizer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Replace every `\r\n`, `\r` or `\n` with one space, then cut to
    /// `max_len` characters.
    pub fn sanitize(&self, raw: &str) -> Sanitized {
        let mut folded = String::with_capacity(raw.len());
        let mut chars = raw.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' => {
                    chars.next_if_eq(&'\n');
                    folded.push(' ');
                }
                '\n' => folded.push(' '),
                other => folded.push(other),
            }
        }

        let original_len = folded.chars().count();
        if original_len <= self.max_len {
            return Sanitized {
                text: folded,
                original_len,
                truncated: false,
            };
        }

        let text = folded.chars().take(self.max_len).collect();
        Sanitized {
            text,
            original_len,
            truncated: true,
        }
    }
}
