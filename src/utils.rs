//! Small text helpers shared by the derivation and report code.

use crate::error::{ReportError, Result};

const ONES: [&str; 20] = [
    "zero",
    "one",
    "two",
    "three",
    "four",
    "five",
    "six",
    "seven",
    "eight",
    "nine",
    "ten",
    "eleven",
    "twelve",
    "thirteen",
    "fourteen",
    "fifteen",
    "sixteen",
    "seventeen",
    "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

/// Largest first; `u64::MAX` is about 18 quintillion.
const SCALES: [(u64, &str); 6] = [
    (1_000_000_000_000_000_000, "quintillion"),
    (1_000_000_000_000_000, "quadrillion"),
    (1_000_000_000_000, "trillion"),
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Turn a list into a comma- and/or and-separated string.
///
/// `["A"]` -> `"A"`, `["A", "B"]` -> `"A and B"`,
/// `["A", "B", "C"]` -> `"A, B, and C"`.
pub fn list_to_str<S: AsRef<str>>(items: &[S]) -> Result<String> {
    match items {
        [] => Err(ReportError::EmptyList),
        [only] => Ok(only.as_ref().to_string()),
        [first, second] => Ok(format!("{} and {}", first.as_ref(), second.as_ref())),
        [head @ .., last] => {
            let head: Vec<&str> = head.iter().map(AsRef::as_ref).collect();
            Ok(format!("{}, and {}", head.join(", "), last.as_ref()))
        }
    }
}

/// Format a number with at most two decimals, dropping trailing zeros.
///
/// `21.0` -> `"21"`, `2.500` -> `"2.5"`, `3.0` -> `"3"`.
pub fn num_to_str(num: f64) -> String {
    let formatted = format!("{:.2}", num);
    if !formatted.contains('.') {
        return formatted;
    }
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Unique elements in first-seen order.
pub fn remove_duplicates<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

/// English cardinal words, e.g. `21` -> `"twenty-one"`.
pub fn cardinal(n: u64) -> String {
    match n {
        0..=19 => ONES[n as usize].to_string(),
        20..=99 => {
            let tens = TENS[(n / 10) as usize];
            match n % 10 {
                0 => tens.to_string(),
                rest => format!("{}-{}", tens, ONES[rest as usize]),
            }
        }
        100..=999 => {
            let hundreds = format!("{} hundred", ONES[(n / 100) as usize]);
            match n % 100 {
                0 => hundreds,
                rest => format!("{} and {}", hundreds, cardinal(rest)),
            }
        }
        _ => {
            let (scale, word) = SCALES
                .iter()
                .copied()
                .find(|(scale, _)| n >= *scale)
                .unwrap_or(SCALES[SCALES.len() - 1]);
            let head = format!("{} {}", cardinal(n / scale), word);
            match n % scale {
                0 => head,
                rest if rest < 100 => format!("{} and {}", head, cardinal(rest)),
                rest => format!("{}, {}", head, cardinal(rest)),
            }
        }
    }
}

/// English ordinal words, e.g. `2` -> `"second"`, `21` -> `"twenty-first"`.
pub fn ordinal(n: u64) -> String {
    let words = cardinal(n);
    // Only the final word changes form.
    let split_at = words
        .rfind(|c| c == ' ' || c == '-')
        .map(|i| i + 1)
        .unwrap_or(0);
    let (head, last) = words.split_at(split_at);
    let last = match last {
        "one" => "first".to_string(),
        "two" => "second".to_string(),
        "three" => "third".to_string(),
        "five" => "fifth".to_string(),
        "eight" => "eighth".to_string(),
        "nine" => "ninth".to_string(),
        "twelve" => "twelfth".to_string(),
        w if w.ends_with('y') => format!("{}ieth", &w[..w.len() - 1]),
        w => format!("{}th", w),
    };
    format!("{}{}", head, last)
}

/// Capitalize the first letter of every word, treating `-` as a word break.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphanumeric();
    }
    out
}

/// Remind users about things they need to do after generating the report.
pub fn reminder() -> &'static str {
    "Remember to double-check everything and to replace <deg> with a degree symbol."
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_to_str() {
        assert_eq!(list_to_str(&["A"]).unwrap(), "A");
        assert_eq!(list_to_str(&["A", "B"]).unwrap(), "A and B");
        assert_eq!(list_to_str(&["A", "B", "C"]).unwrap(), "A, B, and C");
        assert_eq!(
            list_to_str(&["A", "B", "C", "D"]).unwrap(),
            "A, B, C, and D"
        );
    }

    #[test]
    fn test_list_to_str_empty() {
        let empty: [&str; 0] = [];
        assert!(matches!(list_to_str(&empty), Err(ReportError::EmptyList)));
    }

    #[test]
    fn test_num_to_str() {
        assert_eq!(num_to_str(2.500), "2.5");
        assert_eq!(num_to_str(21.0), "21");
        assert_eq!(num_to_str(3.0), "3");
        assert_eq!(num_to_str(2000.0), "2000");
        assert_eq!(num_to_str(0.0), "0");
        assert_eq!(num_to_str(1.256), "1.26");
        assert_eq!(num_to_str(0.03 * 1000.0), "30");
    }

    #[test]
    fn test_remove_duplicates_keeps_order() {
        assert_eq!(remove_duplicates(&[3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(remove_duplicates(&[0.5, 0.5, 0.0]), vec![0.5, 0.0]);
    }

    #[test]
    fn test_cardinal() {
        assert_eq!(cardinal(0), "zero");
        assert_eq!(cardinal(2), "two");
        assert_eq!(cardinal(13), "thirteen");
        assert_eq!(cardinal(40), "forty");
        assert_eq!(cardinal(64), "sixty-four");
        assert_eq!(cardinal(101), "one hundred and one");
        assert_eq!(cardinal(1200), "one thousand, two hundred");
    }

    #[test]
    fn test_cardinal_large_scales() {
        assert_eq!(cardinal(2_000_000), "two million");
        assert_eq!(cardinal(1_000_001), "one million and one");
        assert_eq!(
            cardinal(3_250_000),
            "three million, two hundred and fifty thousand"
        );
        assert_eq!(cardinal(7_000_000_000), "seven billion");
        assert_eq!(ordinal(1_000_000), "one millionth");
        assert_eq!(ordinal(1_000_000_000), "one billionth");
    }

    #[test]
    fn test_ordinal() {
        assert_eq!(ordinal(1), "first");
        assert_eq!(ordinal(2), "second");
        assert_eq!(ordinal(3), "third");
        assert_eq!(ordinal(4), "fourth");
        assert_eq!(ordinal(12), "twelfth");
        assert_eq!(ordinal(20), "twentieth");
        assert_eq!(ordinal(21), "twenty-first");
        assert_eq!(ordinal(100), "one hundredth");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("two"), "Two");
        assert_eq!(title_case("twenty-one"), "Twenty-One");
        assert_eq!(title_case("one hundred and one"), "One Hundred And One");
    }
}
