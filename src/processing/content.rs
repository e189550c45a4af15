/// Content extraction and validation: strip markup, normalize whitespace,
/// and reject pages that don't clear the configured word-count floor.
use anyhow::Error;
use scraper::Html;

use crate::core::ContentProcessor;

pub struct ContentExtractor {
    min_word_count: usize,
}

impl ContentExtractor {
    pub fn new(min_word_count: usize) -> Self {
        Self { min_word_count }
    }

    fn normalize_text(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn count_words(text: &str) -> usize {
        text.split_whitespace().count()
    }
}

impl ContentProcessor for ContentExtractor {
    async fn extract_and_validate(&self, content: &str) -> Result<(String, usize), Error> {
        if content.is_empty() {
            return Ok((String::new(), 0));
        }

        let text = self.extract_text_from_cleaned_html(content);
        let word_count = Self::count_words(&text);

        if word_count < self.min_word_count {
            return Ok((String::new(), 0));
        }

        Ok((text, word_count))
    }

    fn extract_text_from_cleaned_html(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let text: String = document
            .root_element()
            .text()
            .collect::<Vec<_>>()
            .join(" ");
        Self::normalize_text(&text)
    }
}

/// Extract the `<title>` element's text, if present.
pub fn extract_title_from_html(content: &str) -> Option<String> {
    let document = Html::parse_document(content);
    let selector = scraper::Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}
