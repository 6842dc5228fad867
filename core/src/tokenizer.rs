use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}]+").expect("valid regex");
}

/// Tokenize text into index terms using NFKC normalization and lowercasing.
///
/// Splits on every non-alphanumeric boundary, so `GROUP_WORK` yields `group` and `work`.
/// Index time and query time both go through this function.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Study group, for CALCULUS!");
        assert_eq!(t, vec!["study", "group", "for", "calculus"]);
    }
}
