//! Approximate string matching for index search.
//!
//! Matching is case-insensitive. A query matches an indexed value when it is
//! within the allowed edit distance of the whole value or of any whitespace
//! separated token of it.

/// Edits tolerated for a query of `len` characters. Short queries must match
/// exactly.
pub fn allowed_edits(len: usize) -> usize {
    match len {
        0..=3 => 0,
        4..=7 => 1,
        8..=15 => 2,
        _ => 3,
    }
}

/// Prepared query for repeated matching against many values.
#[derive(Debug, Clone)]
pub struct FuzzyQuery {
    needle: Vec<char>,
    max_edits: usize,
}

impl FuzzyQuery {
    /// Prepare `query` with the length-scaled edit threshold.
    pub fn new(query: &str) -> Self {
        let needle: Vec<char> = query.trim().to_lowercase().chars().collect();
        let max_edits = allowed_edits(needle.len());
        Self { needle, max_edits }
    }

    /// Whether the prepared query has no characters.
    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Whether `value` approximately matches the query.
    pub fn matches(&self, value: &str) -> bool {
        if self.needle.is_empty() {
            return false;
        }
        let value = value.trim().to_lowercase();
        if self.within(&value) {
            return true;
        }
        value.split_whitespace().any(|token| self.within(token))
    }

    fn within(&self, candidate: &str) -> bool {
        let len = candidate.chars().count();
        if len.abs_diff(self.needle.len()) > self.max_edits {
            return false;
        }
        levenshtein_with_max(candidate, &self.needle, self.max_edits) <= self.max_edits
    }
}

/// Edit distance between `value` and `needle`, saturating at `max_dist + 1`.
fn levenshtein_with_max(value: &str, needle: &[char], max_dist: usize) -> usize {
    if max_dist == 0 {
        return if value.chars().eq(needle.iter().copied()) {
            0
        } else {
            1
        };
    }

    let n = needle.len();
    if n == 0 {
        return value.chars().count();
    }

    // Two DP rows over `value[..i]` and `needle[..j]`
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];

        for j in 1..=n {
            let cost = usize::from(c != needle[j - 1]);
            let d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }

        if row_min > max_dist {
            return max_dist + 1;
        }

        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_edits_scale_with_length() {
        assert_eq!(allowed_edits(3), 0);
        assert_eq!(allowed_edits(4), 1);
        assert_eq!(allowed_edits(8), 2);
        assert_eq!(allowed_edits(20), 3);
    }

    #[test]
    fn test_exact_and_case_insensitive() {
        let query = FuzzyQuery::new("Homo sapiens");
        assert!(query.matches("Homo sapiens"));
        assert!(query.matches("homo SAPIENS"));
    }

    #[test]
    fn test_padded_value_matches() {
        assert!(FuzzyQuery::new("Homo sapiens").matches("  Homo sapiens "));
        assert!(FuzzyQuery::new("Homo sapiens").matches("Homo sapien\t"));
        assert!(FuzzyQuery::new("abc").matches(" abc "));
        assert!(!FuzzyQuery::new("abc").matches(" abd "));
    }

    #[test]
    fn test_token_match() {
        let query = FuzzyQuery::new("sapiens");
        assert!(query.matches("Homo sapiens"));
        assert!(query.matches("Homo sapien"));
        assert!(!query.matches("Pan troglodytes"));
    }

    #[test]
    fn test_short_queries_are_exact() {
        let query = FuzzyQuery::new("Pan");
        assert!(query.matches("Pan troglodytes"));
        assert!(!query.matches("Pon troglodytes"));
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let query = FuzzyQuery::new("   ");
        assert!(query.is_empty());
        assert!(!query.matches("anything"));
    }

    #[test]
    fn test_levenshtein_with_max() {
        let needle: Vec<char> = "kitten".chars().collect();
        assert_eq!(levenshtein_with_max("sitting", &needle, 3), 3);
        assert_eq!(levenshtein_with_max("sitting", &needle, 1), 2);
    }
}
