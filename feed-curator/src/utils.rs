/// Check if a word is a common stop word
pub fn is_stop_word(word: &str) -> bool {
    matches!(
        word,
        "the" | "and" | "or" | "but" | "in" | "on" | "at" | "to" | "for" | "of" | "with" | "by" |
        "a" | "an" | "is" | "are" | "was" | "were" | "be" | "been" | "have" | "has" | "had" |
        "do" | "does" | "did" | "will" | "would" | "could" | "should" | "may" | "might" | "must" |
        "can" | "this" | "that" | "these" | "those" | "how" | "why" | "what" | "when" | "where" |
        "your" | "you" | "from" | "into" | "its" | "our"
    )
}

/// Text processing utilities
pub mod text {
    /// Lowercased word tokens; anything that is not alphanumeric or `_` separates words
    pub fn words(text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|word| !word.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    /// Truncate to at most `max_chars` characters, breaking at a space when possible
    pub fn truncate_chars(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            return text.to_string();
        }

        let truncated: String = text.chars().take(max_chars).collect();
        match truncated.rfind(' ') {
            Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
            _ => format!("{}...", truncated),
        }
    }

    /// Strip markup and feed noise from a summary or body: tags, common
    /// entities, control characters, separator runs and repeated whitespace
    pub fn clean_text(raw: &str) -> String {
        let stripped = strip_tags(raw);
        let decoded = decode_entities(&stripped);

        decoded
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect::<String>()
            .split_whitespace()
            .filter(|token| !is_separator_run(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn strip_tags(html: &str) -> String {
        html.chars()
            .fold((String::new(), false), |(mut text, in_tag), c| match c {
                '<' => (text, true),
                '>' if in_tag => {
                    text.push(' ');
                    (text, false)
                }
                _ if !in_tag => {
                    text.push(c);
                    (text, in_tag)
                }
                _ => (text, in_tag),
            })
            .0
    }

    fn decode_entities(text: &str) -> String {
        text.replace("&nbsp;", " ")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&#39;", "'")
            .replace("&#8217;", "’")
            .replace("&hellip;", "...")
            .replace("&amp;", "&")
    }

    /// Tokens like `-----` or `=====` left over from feed templates
    fn is_separator_run(token: &str) -> bool {
        token.chars().count() >= 3 && token.chars().all(|c| matches!(c, '-' | '=' | '_' | '*' | '~' | '|' | '•'))
    }

    /// Lowercased `#word` tokens in order of first appearance
    pub fn extract_hashtags(text: &str) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        let mut chars = text.char_indices().peekable();

        while let Some((_, c)) = chars.next() {
            if c != '#' {
                continue;
            }
            let mut tag = String::new();
            while let Some(&(_, next)) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    tag.extend(next.to_lowercase());
                    chars.next();
                } else {
                    break;
                }
            }
            if !tag.is_empty() {
                let tag = format!("#{}", tag);
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
        }

        tags
    }
}

/// URL utilities
pub mod url {
    use url::Url;

    /// Validate feed or article URL format
    pub fn is_http_url(url_str: &str) -> bool {
        if let Ok(url) = Url::parse(url_str) {
            url.scheme() == "http" || url.scheme() == "https"
        } else {
            false
        }
    }
}

/// Time utilities
pub mod time {
    use chrono::{DateTime, Utc};

    /// Hours elapsed since `published`; future timestamps count as zero
    pub fn age_hours(published: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let seconds = now.signed_duration_since(published).num_seconds().max(0);
        seconds as f64 / 3600.0
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_markup_and_separators() {
        let cleaned = text::clean_text("<p>Hello&nbsp;<b>world</b></p>\n\n------\n\tNext &amp; last");
        assert_eq!(cleaned, "Hello world Next & last");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let truncated = text::truncate_chars("héllo wörld ünïcode", 12);
        assert_eq!(truncated, "héllo wörld...");
        assert_eq!(text::truncate_chars("short", 10), "short");
    }

    #[test]
    fn test_hashtags_lowercased_and_unique() {
        let tags = text::extract_hashtags("Ship it #Rust #WebDev and again #rust.");
        assert_eq!(tags, vec!["#rust", "#webdev"]);
    }

    #[test]
    fn test_words_split_on_punctuation() {
        assert_eq!(text::words("Rust's async-await, explained!"), vec!["rust", "s", "async", "await", "explained"]);
    }

    #[test]
    fn test_only_http_urls_accepted() {
        assert!(url::is_http_url("https://example.com/post"));
        assert!(!url::is_http_url("ftp://example.com"));
        assert!(!url::is_http_url("/relative/path"));
    }
}
