use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STRIP: Regex = Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex");
}

/// Splits `text` into lowercase tokens of letters and digits only.
///
/// The text is NFD-decomposed so diacritics separate from their base
/// letters; combining marks and every character that is neither
/// alphanumeric nor whitespace are stripped, then the remainder is
/// lowercased and split on whitespace runs. Order is preserved and
/// duplicates are kept.
pub fn parse(text: &str) -> Vec<String> {
    let decomposed: String = text.nfd().filter(|c| !is_combining_mark(*c)).collect();
    let cleaned = STRIP.replace_all(&decomposed, "").to_lowercase();
    cleaned.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_splits() {
        assert_eq!(parse("The Quick  Brown\tFox"), ["the", "quick", "brown", "fox"]);
    }

    #[test]
    fn strips_punctuation_in_place() {
        // Punctuation is removed, not replaced by a boundary.
        assert_eq!(parse("can't stop-start"), ["cant", "stopstart"]);
    }

    #[test]
    fn keeps_digits() {
        assert_eq!(parse("route 66!"), ["route", "66"]);
    }

    #[test]
    fn drops_diacritics() {
        assert_eq!(parse("café naïve"), ["cafe", "naive"]);
    }

    #[test]
    fn empty_and_symbol_only_input() {
        assert!(parse("").is_empty());
        assert!(parse("!!! ... ###").is_empty());
    }

    #[test]
    fn preserves_order_and_duplicates() {
        assert_eq!(parse("b a b"), ["b", "a", "b"]);
    }
}
