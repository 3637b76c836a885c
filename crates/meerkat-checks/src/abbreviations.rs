//! # Clinical Abbreviation Expansion
//!
//! A pure function over a fixed table, used by both the entailment adapter
//! and its heuristic fallback. No hidden global state, so tests can exercise
//! it directly (see Design Notes: "Clinical preprocessing as a library, not
//! a check").

/// `(abbreviation, expansion)` pairs, matched whole-word and case-sensitively
/// on the abbreviation's conventional clinical casing.
const TABLE: &[(&str, &str)] = &[
    ("BID", "twice daily"),
    ("TID", "three times daily"),
    ("QID", "four times daily"),
    ("QD", "once daily"),
    ("QHS", "at bedtime"),
    ("PRN", "as needed"),
    ("T2DM", "type 2 diabetes mellitus"),
    ("T1DM", "type 1 diabetes mellitus"),
    ("NKDA", "no known drug allergies"),
    ("RA", "room air"),
    ("CXR", "chest X-ray"),
    ("BP", "blood pressure"),
    ("HR", "heart rate"),
    ("SOB", "shortness of breath"),
    ("HTN", "hypertension"),
    ("DM", "diabetes mellitus"),
    ("MI", "myocardial infarction"),
    ("CHF", "congestive heart failure"),
    ("COPD", "chronic obstructive pulmonary disease"),
    ("UTI", "urinary tract infection"),
    ("WNL", "within normal limits"),
];

fn is_word_boundary(c: Option<char>) -> bool {
    !matches!(c, Some(c) if c.is_alphanumeric())
}

/// Expand clinical abbreviations to their full form. Idempotent: running it
/// twice on already-expanded text is a no-op, since expansions never
/// reintroduce a bare abbreviation token.
pub fn expand(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let mut matched = false;
        for (abbrev, expansion) in TABLE {
            let len = abbrev.chars().count();
            if i + len > chars.len() {
                continue;
            }
            let candidate: String = chars[i..i + len].iter().collect();
            if candidate != *abbrev {
                continue;
            }
            let before = if i == 0 { None } else { Some(chars[i - 1]) };
            let after = chars.get(i + len).copied();
            if is_word_boundary(before) && is_word_boundary(after) {
                result.push_str(expansion);
                i += len;
                matched = true;
                break;
            }
        }
        if !matched {
            result.push(chars[i]);
            i += 1;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_abbreviations() {
        assert_eq!(expand("Take 10mg BID"), "Take 10mg twice daily");
        assert_eq!(expand("Patient has T2DM and HTN"), "Patient has type 2 diabetes mellitus and hypertension");
    }

    #[test]
    fn does_not_expand_inside_longer_words() {
        assert_eq!(expand("RADIUS"), "RADIUS");
    }

    #[test]
    fn expansion_is_idempotent() {
        let once = expand("Patient NKDA, CXR clear");
        let twice = expand(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_unknown_tokens_untouched() {
        assert_eq!(expand("the patient improved"), "the patient improved");
    }
}
