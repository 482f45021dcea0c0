// src/cusip.rs

//! # CUSIP Instrument-Code Validator
//!
//! Scans free text for 9-character CUSIP candidates and keeps only those whose
//! mod-10 double-add-double check digit verifies. The scan is purely
//! combinatorial: a plain 9-character alphanumeric token that fails the
//! checksum is never accepted, so false positives from table noise are
//! filtered out before the transparency signal is raised.
//!
//! CUSIP alphabet: digits and uppercase letters excluding `I` and `O`; the
//! ninth character is always a decimal check digit. Candidates must be bounded
//! by separators or the string edges so substrings of longer tokens are not
//! picked up.

use once_cell::sync::Lazy;
use regex::Regex;

// Candidate shape: 8 characters of the CUSIP alphabet followed by a decimal
// check digit. Tokens are cut on separators first, so no bounds are needed
// inside the pattern itself.
static CUSIP_CORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-HJ-NP-Z0-9]{8}[0-9]$").expect("static CUSIP pattern compiles"));

/// Separators that bound a token candidate; anything else (including other
/// letters and digits) extends the current token and disqualifies embedded
/// matches.
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '|' | '\'' | '"')
}

/// Character value for checksum purposes: digits map to 0-9, letters to 10-35.
fn char_value(c: u8) -> u32 {
    if c.is_ascii_digit() {
        (c - b'0') as u32
    } else {
        (c - b'A') as u32 + 10
    }
}

/// Verifies the mod-10 double-add-double check digit of a 9-character,
/// already-uppercased candidate.
pub fn check_digit_ok(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 9 || !bytes[8].is_ascii_digit() {
        return false;
    }
    let mut sum = 0u32;
    for (i, &b) in bytes[..8].iter().enumerate() {
        let mut v = char_value(b);
        // 1-indexed even positions are doubled.
        if (i + 1) % 2 == 0 {
            v *= 2;
        }
        sum += v / 10 + v % 10;
    }
    let expected = (10 - (sum % 10)) % 10;
    expected == char_value(bytes[8])
}

/// Returns the distinct, checksum-valid CUSIPs found in `text`, in first-seen
/// order.
pub fn find_cusips(text: &str) -> Vec<String> {
    let upper = text.to_ascii_uppercase();
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for token in upper.split(is_separator) {
        if CUSIP_CORE.is_match(token) && check_digit_ok(token) && seen.insert(token.to_string()) {
            out.push(token.to_string());
        }
    }
    out
}

/// Transparency signal fed into the reserve risk score: did the document
/// disclose at least one verifiable instrument code?
pub fn has_valid_cusip(text: &str) -> bool {
    !find_cusips(text).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 912797MS3 and 912797RB5 are real Treasury-bill CUSIPs; 037833100 is
    // Apple common stock.
    const VALID: [&str; 3] = ["912797MS3", "912797RB5", "037833100"];

    #[test]
    fn test_known_cusips_verify() {
        for cusip in VALID {
            assert!(check_digit_ok(cusip), "{cusip} should verify");
        }
    }

    #[test]
    fn test_checksum_rejects_mutations() {
        // Flipping any single digit of a valid CUSIP must break the checksum.
        let original = "912797MS3";
        for i in 0..9 {
            let mut mutated = original.as_bytes().to_vec();
            mutated[i] = if mutated[i] == b'9' { b'8' } else { b'9' };
            let mutated = String::from_utf8(mutated).unwrap();
            if mutated != original {
                assert!(!check_digit_ok(&mutated), "{mutated} should not verify");
            }
        }
    }

    #[test]
    fn test_plain_nine_char_tokens_are_rejected() {
        assert!(!check_digit_ok("ABCDEFGH1"));
        assert!(!check_digit_ok("123456789"));
        // Correct length, alphabet, but bad check digit.
        assert!(!check_digit_ok("912797MS4"));
    }

    #[test]
    fn test_find_respects_token_bounds() {
        // Embedded in a longer run: not a candidate.
        assert!(find_cusips("XX912797MS3YY").is_empty());
        // Bounded by separators and edges: found.
        assert_eq!(find_cusips("912797MS3"), vec!["912797MS3"]);
        assert_eq!(find_cusips("hold 912797MS3, plus cash"), vec!["912797MS3"]);
    }

    #[test]
    fn test_find_deduplicates_and_orders() {
        let text = "912797RB5 912797MS3 912797RB5";
        assert_eq!(find_cusips(text), vec!["912797RB5", "912797MS3"]);
    }

    #[test]
    fn test_lowercase_input_is_normalized() {
        assert!(has_valid_cusip("cusip 912797ms3 listed"));
    }

    #[test]
    fn test_letters_i_and_o_excluded_from_alphabet() {
        // 'I' would alias '1' visually; the alphabet excludes it outright.
        assert!(find_cusips("91279IMS3").is_empty());
    }
}
