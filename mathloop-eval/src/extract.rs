//! Answer extraction and matching.
//!
//! Free-form model output mentions many numbers along the way; the final
//! answer has to be dug out with the most explicit marker available.
//! [`extract_answer`] tries three strategies in strict priority order and
//! returns the first hit:
//!
//! 1. the GSM8K `####` marker,
//! 2. a natural-language cue ("answer is", "equals", ...),
//! 3. the last numeric token anywhere in the text.
//!
//! A miss is the empty string, not an error: an empty prediction simply
//! never matches a non-empty gold answer.

use once_cell::sync::Lazy;
use regex::Regex;

/// `#### 1,234` — the canonical gold-answer marker.
static MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"####\s*([0-9,.]+)").expect("marker regex is valid")
});

/// Cue phrases followed by a numeric token.
static CUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:answer is|final answer is|answer:|equals?)\s*([0-9,.]+)")
        .expect("cue regex is valid")
});

/// Any numeric token, for the last-number fallback.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9,.]+").expect("number regex is valid"));

/// Extract a canonical numeric answer from free-form text.
///
/// Returns the empty string when no numeric token is found by any
/// strategy. Commas (thousands separators) are stripped from the result.
///
/// # Example
///
/// ```
/// use mathloop_eval::extract_answer;
///
/// assert_eq!(extract_answer("9 * 2 = 18\n#### 18"), "18");
/// assert_eq!(extract_answer("So the answer is 1,234 dollars"), "1234");
/// assert_eq!(extract_answer("we get 13, then 9, then 42"), "42");
/// assert_eq!(extract_answer("no digits here"), "");
/// ```
pub fn extract_answer(text: &str) -> String {
    if let Some(token) = MARKER_RE
        .captures(text)
        .and_then(|c| clean_token(&c[1]))
    {
        return token;
    }

    if let Some(token) = CUE_RE.captures(text).and_then(|c| clean_token(&c[1])) {
        return token;
    }

    // Last resort: the final numeric token anywhere in the text.
    NUMBER_RE
        .find_iter(text)
        .filter_map(|m| clean_token(m.as_str()))
        .last()
        .unwrap_or_default()
}

/// Strip commas and reject tokens with no digits (a stray "." or ","
/// would otherwise slip through the `[0-9,.]` character class).
fn clean_token(token: &str) -> Option<String> {
    let cleaned = token.replace(',', "");
    if cleaned.bytes().any(|b| b.is_ascii_digit()) {
        Some(cleaned)
    } else {
        None
    }
}

/// Normalize an answer string for comparison.
///
/// Strips commas and all whitespace, then leading zeros (an all-zero
/// string collapses to `"0"`). The empty string stays empty so that a
/// missing prediction can never equal a real answer. Idempotent.
pub fn normalize_answer(answer: &str) -> String {
    let stripped: String = answer
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if stripped.is_empty() {
        return stripped;
    }

    let trimmed = stripped.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Compare a predicted answer against the gold answer.
///
/// Both sides are normalized identically and compared for exact string
/// equality — deliberately no numeric tolerance, so `"42.0"` and `"42"`
/// do not match. An empty side never matches.
pub fn answers_match(pred: &str, gold: &str) -> bool {
    let pred_norm = normalize_answer(pred);
    let gold_norm = normalize_answer(gold);
    !pred_norm.is_empty() && pred_norm == gold_norm
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    // Strategy 1: #### marker wins over any earlier numbers.
    #[rstest]
    #[case::simple("#### 18", "18")]
    #[case::with_reasoning("16 - 3 - 4 = 9, then 9 * 2 = 18\n#### 18", "18")]
    #[case::commas("Total revenue.\n#### 1,234,567", "1234567")]
    #[case::decimal("#### 3.5", "3.5")]
    #[case::marker_beats_cue("the answer is 99\n#### 7", "7")]
    fn test_marker_extraction(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(extract_answer(text), expected);
    }

    // Strategy 2: cue phrases, case-insensitive.
    #[rstest]
    #[case::answer_is("So the answer is 42", "42")]
    #[case::final_answer("The final answer is 42", "42")]
    #[case::answer_colon("Answer: 123", "123")]
    #[case::equals("which equals 56", "56")]
    #[case::equal("they are equal 56", "56")]
    #[case::uppercase("THE ANSWER IS 9", "9")]
    #[case::cue_with_commas("the answer is 12,000", "12000")]
    #[case::cue_beats_last_number("the answer is 8, trust me on 99 points", "8")]
    fn test_cue_extraction(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(extract_answer(text), expected);
    }

    // Strategy 3: last number in the text.
    #[rstest]
    #[case::single("there are 7 apples", "7")]
    #[case::several("first 13, later 9, finally 42", "42")]
    #[case::commas("we counted 1,500 in the end", "1500")]
    fn test_last_number_fallback(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(extract_answer(text), expected);
    }

    #[rstest]
    #[case::empty("")]
    #[case::prose("I could not solve this problem.")]
    #[case::stray_punctuation("Well, that went badly.")]
    fn test_no_number_returns_empty(#[case] text: &str) {
        assert_eq!(extract_answer(text), "");
    }

    #[rstest]
    #[case::plain("42", "42")]
    #[case::commas("1,234", "1234")]
    #[case::whitespace(" 4 2 ", "42")]
    #[case::leading_zeros("0042", "42")]
    #[case::all_zeros("000", "0")]
    #[case::zero("0", "0")]
    #[case::empty("", "")]
    #[case::decimal_below_one("0.5", ".5")]
    fn test_normalize_answer(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_answer(input), expected);
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in ["1,234", "0042", "000", "", " 7 "] {
            let once = normalize_answer(raw);
            assert_eq!(normalize_answer(&once), once);
        }
    }

    #[rstest]
    #[case::exact("42", "42", true)]
    #[case::leading_zeros("0042", "42", true)]
    #[case::commas("1,234", "1234", true)]
    #[case::whitespace(" 42 ", "42", true)]
    #[case::zero_forms("000", "0", true)]
    #[case::different("41", "42", false)]
    #[case::empty_pred_vs_zero("", "0", false)]
    #[case::empty_pred("", "42", false)]
    #[case::strict_no_tolerance("42.0", "42", false)]
    fn test_answers_match(#[case] pred: &str, #[case] gold: &str, #[case] expected: bool) {
        assert_eq!(answers_match(pred, gold), expected);
        // Matching is symmetric.
        assert_eq!(answers_match(gold, pred), expected);
    }
}
