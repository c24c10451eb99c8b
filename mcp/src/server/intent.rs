// Keyword-triggered search detection for the chat tool. A convenience
// heuristic, not a protocol guarantee: callers treat this as a replaceable
// strategy and must work identically if it never fires.

/// Words and phrases that make a chat message read as a search request.
const TRIGGER_PHRASES: [&str; 2] = ["look up", "look for"];
const TRIGGER_WORDS: [&str; 2] = ["search", "find"];

/// Filler stripped from the residual query once a trigger matched.
const FILLER_WORDS: [&str; 6] = ["for", "about", "papers", "paper", "me", "please"];

/// If `message` looks like a search request, extract the query to run.
/// Returns `None` when the message should be answered from existing
/// context instead.
pub fn detect_search_intent(message: &str) -> Option<String> {
    let lower = message.to_lowercase();

    let phrase_hit = TRIGGER_PHRASES.iter().any(|p| lower.contains(p));
    let word_hit = lower
        .split_whitespace()
        .any(|w| TRIGGER_WORDS.contains(&w.trim_matches(|c: char| !c.is_alphanumeric())));
    if !phrase_hit && !word_hit {
        return None;
    }

    let mut cleaned = lower;
    for phrase in TRIGGER_PHRASES {
        cleaned = cleaned.replace(phrase, " ");
    }

    let query = cleaned
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '-'))
        .filter(|w| !w.is_empty())
        .filter(|w| !TRIGGER_WORDS.contains(w))
        .filter(|w| !FILLER_WORDS.contains(w))
        .collect::<Vec<_>>()
        .join(" ");

    if query.is_empty() {
        None
    } else {
        Some(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_questions_are_not_searches() {
        assert_eq!(detect_search_intent("what methods do these papers use?"), None);
        assert_eq!(detect_search_intent("summarize the second paper"), None);
    }

    #[test]
    fn trigger_words_extract_the_query() {
        assert_eq!(
            detect_search_intent("search for papers about quantum computing"),
            Some("quantum computing".to_string())
        );
        assert_eq!(
            detect_search_intent("find transformer architectures"),
            Some("transformer architectures".to_string())
        );
        assert_eq!(
            detect_search_intent("please look up diffusion models"),
            Some("diffusion models".to_string())
        );
    }

    #[test]
    fn bare_trigger_without_query_is_not_a_search() {
        assert_eq!(detect_search_intent("search"), None);
        assert_eq!(detect_search_intent("find papers please"), None);
    }

    #[test]
    fn trigger_must_be_a_whole_word() {
        // "finding" is not "find"
        assert_eq!(detect_search_intent("the finding was surprising"), None);
    }
}
