//! Devanagari character classes

/// DEVANAGARI VOWEL SIGN I, the matra written before its consonant
pub const VOWEL_SIGN_I: char = '\u{093F}';

/// Check if a character is Devanagari
pub fn is_devanagari_char(c: char) -> bool {
    // Devanagari: U+0900 to U+097F, Devanagari Extended: U+A8E0 to U+A8FF
    ('\u{0900}'..='\u{097F}').contains(&c) || ('\u{A8E0}'..='\u{A8FF}').contains(&c)
}

/// Characters a font must map before it is treated as Devanagari-capable
pub(crate) const COVERAGE_PROBE: [char; 5] = ['क', 'ि', '्', 'ं', 'श'];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_devanagari_char() {
        assert!(is_devanagari_char('क'));
        assert!(is_devanagari_char(VOWEL_SIGN_I));
        assert!(is_devanagari_char('०'));
        assert!(!is_devanagari_char('A'));
        assert!(!is_devanagari_char('ก'));
    }

    #[test]
    fn test_coverage_probe_is_devanagari() {
        assert!(COVERAGE_PROBE.iter().all(|&c| is_devanagari_char(c)));
    }
}
