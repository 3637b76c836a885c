//! # Clinically-Aware Sentence Splitting
//!
//! A pure function used by the entailment adapter to split AI output into
//! sentences without breaking on decimals (`39.1`) or common non-terminal
//! abbreviations (`Dr.`, `Mr.`, `vs.`).

const NON_TERMINAL_ABBREVIATIONS: &[&str] = &[
    "dr", "mr", "mrs", "ms", "vs", "etc", "e.g", "i.e", "fig", "no", "st",
];

fn ends_with_non_terminal_abbreviation(buffer: &str) -> bool {
    let trimmed = buffer.trim_end_matches('.');
    let last_word = trimmed
        .rsplit(|c: char| c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    NON_TERMINAL_ABBREVIATIONS.contains(&last_word.as_str())
}

/// Split `text` into trimmed, non-empty sentences on `.`, `!`, `?`, skipping
/// boundaries that are actually a decimal point or a known abbreviation.
pub fn split(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut buffer = String::new();

    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        buffer.push(c);

        if matches!(c, '.' | '!' | '?') {
            let prev_digit = i > 0 && chars[i - 1].is_ascii_digit();
            let next_digit = chars.get(i + 1).is_some_and(|c| c.is_ascii_digit());
            let is_decimal = c == '.' && prev_digit && next_digit;
            let is_abbreviation = c == '.' && ends_with_non_terminal_abbreviation(&buffer);

            if !is_decimal && !is_abbreviation {
                let trimmed = buffer.trim().to_string();
                if !trimmed.is_empty() {
                    sentences.push(trimmed);
                }
                buffer.clear();
            }
        }
        i += 1;
    }

    let trailing = buffer.trim();
    if !trailing.is_empty() {
        sentences.push(trailing.to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_sentence_boundaries() {
        let sentences = split("The patient improved. Vitals are stable.");
        assert_eq!(sentences, vec!["The patient improved.", "Vitals are stable."]);
    }

    #[test]
    fn does_not_split_on_decimals() {
        let sentences = split("Blood glucose was 39.1 mmol/L this morning.");
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].contains("39.1"));
    }

    #[test]
    fn does_not_split_on_non_terminal_abbreviations() {
        let sentences = split("Dr. Smith reviewed the chart. No changes needed.");
        assert_eq!(sentences.len(), 2);
        assert!(sentences[0].starts_with("Dr. Smith"));
    }

    #[test]
    fn handles_trailing_text_without_terminal_punctuation() {
        let sentences = split("No period at the end");
        assert_eq!(sentences, vec!["No period at the end"]);
    }
}
