//! Ingest-time window tagging for catalog categories.
//!
//! Tags are resolved once, when the catalog is synced; selection only ever
//! reads the stored tag.

/// Keyword fragments mapped to window tags.
///
/// Matching is case-insensitive substring on the category title; the first
/// hit wins, so earlier sections take precedence for mixed titles like
/// "morning and evening remembrance".
const WINDOW_KEYWORDS: &[(&str, &str)] = &[
    // Morning
    ("صباح", "morning"),    // morning
    ("فجر", "morning"),     // dawn
    ("استيقاظ", "morning"), // waking up
    ("morning", "morning"),
    ("dawn", "morning"),
    // Midday
    ("عمل", "midday"),  // work
    ("كسب", "midday"),  // earning
    ("بيع", "midday"),  // trade
    ("طعام", "midday"), // food
    ("work", "midday"),
    ("food", "midday"),
    // Afternoon
    ("علم", "afternoon"),   // knowledge
    ("قرآن", "afternoon"),  // the Quran
    ("تعليم", "afternoon"), // teaching
    ("knowledge", "afternoon"),
    ("quran", "afternoon"),
    // Evening
    ("مساء", "evening"), // evening
    ("نوم", "evening"),  // sleep
    ("ليل", "evening"),  // night
    ("evening", "evening"),
    ("night", "evening"),
    ("sleep", "evening"),
];

/// Resolve a category title to its window tag, `general` when no keyword
/// matches.
pub fn tag_for_title(title: &str) -> &'static str {
    let lower = title.to_lowercase();

    for (keyword, tag) in WINDOW_KEYWORDS {
        if lower.contains(keyword) {
            return tag;
        }
    }

    "general"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arabic_titles() {
        assert_eq!(tag_for_title("أذكار الصباح"), "morning");
        assert_eq!(tag_for_title("آداب النوم"), "evening");
        assert_eq!(tag_for_title("فضل طلب العلم"), "afternoon");
        assert_eq!(tag_for_title("أحكام البيع"), "midday");
    }

    #[test]
    fn test_english_titles_are_case_insensitive() {
        assert_eq!(tag_for_title("Morning remembrance"), "morning");
        assert_eq!(tag_for_title("NIGHT prayers"), "evening");
        assert_eq!(tag_for_title("Seeking Knowledge"), "afternoon");
    }

    #[test]
    fn test_first_match_wins_for_mixed_titles() {
        // Both morning and evening keywords appear; table order decides.
        assert_eq!(tag_for_title("أذكار الصباح والمساء"), "morning");
    }

    #[test]
    fn test_untagged_titles_fall_back_to_general() {
        assert_eq!(tag_for_title("الفضائل والآداب"), "general");
        assert_eq!(tag_for_title("Good character"), "general");
        assert_eq!(tag_for_title(""), "general");
    }
}
