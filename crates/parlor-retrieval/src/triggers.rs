// SPDX-FileCopyrightText: 2026 Parlor Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cheap pre-retrieval heuristics: whether to search at all, which
//! content types to filter by, and how many results to ask for.

use parlor_core::ContentType;

/// Whether the message warrants a knowledge-base search.
///
/// Membership test against the configured trigger keywords; greetings
/// and small talk skip retrieval entirely.
pub fn needs_search(message: &str, trigger_keywords: &[String]) -> bool {
    let message = message.to_lowercase();
    trigger_keywords
        .iter()
        .any(|keyword| message.contains(&keyword.to_lowercase()))
}

const PROJECT_KEYWORDS: &[&str] = &[
    "project",
    "projects",
    "built",
    "app",
    "application",
    "system",
    "stack",
    "technologies",
];

const EXPERIENCE_KEYWORDS: &[&str] = &[
    "experience",
    "experienced",
    "background",
    "career",
    "job",
    "work history",
    "leadership",
];

const ABOUT_KEYWORDS: &[&str] = &[
    "personal",
    "background",
    "interests",
    "hobbies",
    "leadership",
    "fun",
    "facts",
    "likes",
    "dislikes",
];

/// Keyword-derived content type filter. `None` means search everything.
/// Buckets overlap on purpose; a message can select several types.
pub fn detect_content_types(message: &str) -> Option<Vec<ContentType>> {
    let message = message.to_lowercase();
    let mut types = Vec::new();

    if PROJECT_KEYWORDS.iter().any(|k| message.contains(k)) {
        types.push(ContentType::Project);
    }
    if EXPERIENCE_KEYWORDS.iter().any(|k| message.contains(k)) {
        types.push(ContentType::Experience);
    }
    if ABOUT_KEYWORDS.iter().any(|k| message.contains(k)) {
        types.push(ContentType::About);
    }

    if types.is_empty() { None } else { Some(types) }
}

const COMPREHENSIVE_KEYWORDS: &[&str] = &[
    "all",
    "list",
    "every",
    "each",
    "show me all",
    "everything",
    "complete",
    "entire",
    "full",
    "comprehensive",
    "overview",
    "summary",
];

/// Result budget: comprehensive queries get the larger limit so that
/// every document is represented after neighbor expansion doubles it.
pub fn search_limit(message: &str, focused: usize, comprehensive: usize) -> usize {
    let message = message.to_lowercase();
    if COMPREHENSIVE_KEYWORDS.iter().any(|k| message.contains(k)) {
        comprehensive
    } else {
        focused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords() -> Vec<String> {
        ["project", "experience", "skills"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn small_talk_skips_search() {
        assert!(!needs_search("hi there!", &keywords()));
        assert!(needs_search("what projects have you built?", &keywords()));
        assert!(needs_search("Tell me about your EXPERIENCE", &keywords()));
    }

    #[test]
    fn content_type_detection_can_select_several() {
        let types = detect_content_types("projects and work history").unwrap();
        assert!(types.contains(&ContentType::Project));
        assert!(types.contains(&ContentType::Experience));

        assert!(detect_content_types("hello").is_none());
    }

    #[test]
    fn background_selects_experience_and_about() {
        let types = detect_content_types("what's your background?").unwrap();
        assert!(types.contains(&ContentType::Experience));
        assert!(types.contains(&ContentType::About));
    }

    #[test]
    fn comprehensive_queries_get_larger_budget() {
        assert_eq!(search_limit("list every project", 5, 14), 14);
        assert_eq!(search_limit("how was the api built", 5, 14), 5);
    }
}
