// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session-wide engine parameters.

/// Characters the engine is allowed to emit: Latin letters, German umlauts
/// and sharp s, digits, and a fixed punctuation set.
pub const WHITELIST_CHARS: &str = concat!(
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
    "abcdefghijklmnopqrstuvwxyz",
    "äöüÄÖÜß",
    "1234567890",
    " !?.,-+#*/\\\"$§()[]{}<>=%€",
);

/// Tesseract page segmentation mode. Lesewerk reads every page as one
/// uniform block of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    SingleBlock = 6,
}

/// Tesseract OCR engine modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    TesseractOnly = 0,
    /// Neural net LSTM recogniser.
    LstmOnly = 1,
    TesseractLstmCombined = 2,
    Default = 3,
}

/// Parameters applied once per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineParams {
    pub page_seg_mode: PageSegMode,
    /// Chosen at handle creation; Tesseract ignores it afterwards.
    pub engine_mode: EngineMode,
    pub whitelist: String,
    pub new_segsearch: bool,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            page_seg_mode: PageSegMode::SingleBlock,
            engine_mode: EngineMode::LstmOnly,
            whitelist: WHITELIST_CHARS.to_string(),
            new_segsearch: true,
        }
    }
}

impl EngineParams {
    /// Engine variables to set after initialisation, in order.
    pub fn variables(&self) -> Vec<(&'static str, String)> {
        vec![
            ("tessedit_pageseg_mode", (self.page_seg_mode as i32).to_string()),
            ("tessedit_char_whitelist", self.whitelist.clone()),
            (
                "enable_new_segsearch",
                if self.new_segsearch { "1" } else { "0" }.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_single_block_lstm() {
        let params = EngineParams::default();
        assert_eq!(params.page_seg_mode as i32, 6);
        assert_eq!(params.engine_mode as i32, 1);
        assert!(params.new_segsearch);
    }

    #[test]
    fn variables_are_in_configuration_order() {
        let vars = EngineParams::default().variables();
        let names: Vec<_> = vars.iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            ["tessedit_pageseg_mode", "tessedit_char_whitelist", "enable_new_segsearch"]
        );
        assert_eq!(vars[0].1, "6");
        assert_eq!(vars[2].1, "1");
    }

    #[test]
    fn whitelist_covers_letters_digits_and_umlauts() {
        for c in ['A', 'z', '0', '9', 'ä', 'ß', '€', '"', '\\'] {
            assert!(WHITELIST_CHARS.contains(c), "missing {c:?}");
        }
        assert!(!WHITELIST_CHARS.contains('\''));
        assert!(!WHITELIST_CHARS.contains('@'));
    }
}
