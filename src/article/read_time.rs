//! Reading time estimate

use super::ArticleContent;
use crate::config::ArticleConfig;
use crate::richtext::as_text;

/// Number of whitespace-separated words across every block body
pub fn word_count(content: &ArticleContent) -> usize {
    content
        .content
        .iter()
        .map(|block| as_text(&block.body).split_whitespace().count())
        .sum()
}

/// Minutes needed to read `words` at `words_per_minute`, rounded up
///
/// The result is raised to `min_minutes`; with a floor of 0 an article
/// without words reads in 0 minutes.
pub fn read_time_for_words(words: usize, words_per_minute: usize, min_minutes: u32) -> u32 {
    let minutes = words.div_ceil(words_per_minute.max(1));
    u32::try_from(minutes).unwrap_or(u32::MAX).max(min_minutes)
}

/// Estimated reading time of an article in whole minutes
pub fn compute_read_time(content: &ArticleContent, config: &ArticleConfig) -> u32 {
    read_time_for_words(
        word_count(content),
        config.words_per_minute,
        config.min_read_time,
    )
}
