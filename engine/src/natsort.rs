//! Natural ("human") ordering for match numbers.
//!
//! Match numbers are strings such as `"2"`, `"10"` or `"qf1"`. Plain string
//! order puts `"10"` before `"2"`, so comparison is done token by token:
//!
//! 1. Split each string into runs of ASCII digits and runs of everything else
//! 2. Digit runs compare as unbounded integers (leading zeros ignored)
//! 3. Text runs compare lexicographically
//! 4. A digit run sorts before a text run at the same position
//! 5. A string that is a token-prefix of another sorts first
//!
//! Strings that compare equal token-wise (`"01"` vs `"1"`) fall back to
//! plain string order so the ordering stays total.

use std::cmp::Ordering;

/// A run of characters produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    Number(&'a str),
    Text(&'a str),
}

impl Token<'_> {
    fn cmp_token(&self, other: &Token<'_>) -> Ordering {
        match (self, other) {
            (Token::Number(a), Token::Number(b)) => cmp_digits(a, b),
            (Token::Text(a), Token::Text(b)) => a.cmp(b),
            (Token::Number(_), Token::Text(_)) => Ordering::Less,
            (Token::Text(_), Token::Number(_)) => Ordering::Greater,
        }
    }
}

/// Split a string on digit / non-digit boundaries.
pub fn tokenize(s: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, ch) in s.char_indices() {
        let digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                tokens.push(make_token(&s[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }

    if let Some(digit) = in_digits {
        tokens.push(make_token(&s[start..], digit));
    }

    tokens
}

fn make_token(run: &str, digit: bool) -> Token<'_> {
    if digit {
        Token::Number(run)
    } else {
        Token::Text(run)
    }
}

/// Compare two digit runs numerically without parsing into a fixed width.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim
        .len()
        .cmp(&b_trim.len())
        .then_with(|| a_trim.cmp(b_trim))
}

/// Natural comparison of two strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ta = tokenize(a);
    let tb = tokenize(b);

    for (x, y) in ta.iter().zip(tb.iter()) {
        match x.cmp_token(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    ta.len().cmp(&tb.len()).then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tokenize_splits_on_boundaries() {
        assert_eq!(
            tokenize("qf10m2"),
            vec![
                Token::Text("qf"),
                Token::Number("10"),
                Token::Text("m"),
                Token::Number("2"),
            ]
        );
        assert_eq!(tokenize("42"), vec![Token::Number("42")]);
        assert_eq!(tokenize("final"), vec![Token::Text("final")]);
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn numbers_compare_numerically() {
        assert_eq!(natural_cmp("2", "10"), Ordering::Less);
        assert_eq!(natural_cmp("10", "9"), Ordering::Greater);
        assert_eq!(natural_cmp("100", "100"), Ordering::Equal);
    }

    #[test]
    fn qualifiers_sort_after_plain_numbers() {
        assert_eq!(natural_cmp("10", "qf1"), Ordering::Less);
        assert_eq!(natural_cmp("qf2", "qf10"), Ordering::Less);
        assert_eq!(natural_cmp("qf10", "sf1"), Ordering::Less);
    }

    #[test]
    fn leading_zeros_fall_back_to_string_order() {
        assert_eq!(cmp_digits("007", "7"), Ordering::Equal);
        assert_eq!(natural_cmp("07", "7"), Ordering::Less);
        assert_eq!(natural_cmp("7", "07"), Ordering::Greater);
    }

    #[test]
    fn huge_numbers_do_not_overflow() {
        let big = "184467440737095516160";
        assert_eq!(natural_cmp("18446744073709551615", big), Ordering::Less);
    }

    #[test]
    fn sorts_a_realistic_schedule() {
        let mut matches = vec!["qf1", "10", "f1", "2", "sf2", "1", "qf10", "qf2", "sf1"];
        matches.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(
            matches,
            vec!["1", "2", "10", "f1", "qf1", "qf2", "qf10", "sf1", "sf2"]
        );
    }

    proptest! {
        #[test]
        fn ordering_is_antisymmetric(a in "[a-z0-9]{0,8}", b in "[a-z0-9]{0,8}") {
            prop_assert_eq!(natural_cmp(&a, &b), natural_cmp(&b, &a).reverse());
        }

        #[test]
        fn equal_only_when_identical(a in "[a-z0-9]{0,8}", b in "[a-z0-9]{0,8}") {
            prop_assert_eq!(natural_cmp(&a, &b) == Ordering::Equal, a == b);
        }

        #[test]
        fn integers_follow_numeric_order(a in 0u64..100_000, b in 0u64..100_000) {
            prop_assert_eq!(natural_cmp(&a.to_string(), &b.to_string()), a.cmp(&b));
        }
    }
}
