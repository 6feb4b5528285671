//! Block parser for generated scripts.
//!
//! Total and deterministic: any text yields a [`ParsedScript`], possibly
//! with no scenes.

use std::sync::LazyLock;

use regex::Regex;
use storybook_models::Scene;

/// Narration used when a block has neither captions nor quotes.
pub const PENDING_NARRATION: &str = "illustration pending";

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)page ?(\d+)").unwrap());

static LOCALIZED_CAPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)(?:中文文案|中文旁白|旁白|中文)[ \t]*[:：][ \t]*(.*?)[ \t\r]*$").unwrap());

static ENGLISH_CAPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)(?:English Caption|English Narration|English)[ \t]*[:：][ \t]*(.*?)[ \t\r]*$").unwrap()
});

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"\n]+)"|“([^”\n]+)”"#).unwrap());

/// Scenes recognized in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedScript {
    /// Scenes numbered densely from 1
    pub scenes: Vec<Scene>,
    /// Set when no block carried a page label and trailing blocks were used instead
    pub degraded: bool,
}

impl ParsedScript {
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Parse a sentinel-delimited script.
///
/// Pages are matched by label in order (`Page 1`, `Page 2`, ...) and matching
/// stops at the first missing number. When no block is labeled at all and
/// at least `fallback_pages` blocks exist, the last `fallback_pages` blocks
/// become the pages.
pub fn parse_script(text: &str, sentinel: &str, fallback_pages: usize) -> ParsedScript {
    let blocks: Vec<&str> = text
        .split(sentinel)
        .map(str::trim)
        .filter(|b| !b.is_empty())
        .collect();

    let mut accepted = vec![false; blocks.len()];
    let mut scenes = Vec::new();

    for page in 1u32.. {
        let found = blocks
            .iter()
            .enumerate()
            .find(|(idx, block)| !accepted[*idx] && has_page_marker(block, page));

        match found {
            Some((idx, block)) => {
                accepted[idx] = true;
                scenes.push(scene_from_block(page, block));
            }
            None => break,
        }
    }

    if scenes.is_empty() && fallback_pages > 0 && blocks.len() >= fallback_pages {
        let tail = &blocks[blocks.len() - fallback_pages..];
        let scenes = tail
            .iter()
            .zip(1u32..)
            .map(|(block, page)| scene_from_block(page, block))
            .collect();
        return ParsedScript {
            scenes,
            degraded: true,
        };
    }

    ParsedScript {
        scenes,
        degraded: false,
    }
}

/// `Page {n}` or `Page{n}`, case-insensitive, not followed by another digit.
pub fn has_page_marker(block: &str, page: u32) -> bool {
    PAGE_MARKER
        .captures_iter(block)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .any(|n| n == page)
}

fn scene_from_block(page: u32, block: &str) -> Scene {
    Scene::new(page, extract_narration(block), block)
}

/// Narration by strategy: captions, then quotes, then the pending marker.
pub fn extract_narration(block: &str) -> String {
    let localized = first_caption(&LOCALIZED_CAPTION, block);
    let english = first_caption(&ENGLISH_CAPTION, block);

    match (localized, english) {
        (Some(zh), Some(en)) => return format!("{}\n{}", zh, en),
        (Some(caption), None) | (None, Some(caption)) => return caption,
        (None, None) => {}
    }

    let quotes: Vec<&str> = QUOTED
        .captures_iter(block)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .take(2)
        .collect();
    if !quotes.is_empty() {
        return quotes.join("\n");
    }

    PENDING_NARRATION.to_string()
}

fn first_caption(pattern: &Regex, block: &str) -> Option<String> {
    pattern
        .captures_iter(block)
        .filter_map(|c| c.get(1))
        .map(|m| strip_wrapping_quotes(m.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn strip_wrapping_quotes(text: &str) -> &str {
    let text = text.trim();
    for (open, close) in [('"', '"'), ('“', '”'), ('「', '」')] {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim();
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: &str = "<<<BREAK>>>";

    fn script(blocks: &[&str]) -> String {
        blocks.join(&format!("\n{}\n", SEP))
    }

    #[test]
    fn test_three_labeled_pages() {
        let text = script(&[
            "Cover: the moon kite",
            "Introduction: meet Mia",
            "Page 1\n中文文案：她找到了风筝。",
            "Page 2\n中文文案：风筝飞起来了。",
            "Page 3\n中文文案：她到了月亮上。",
        ]);
        let parsed = parse_script(&text, SEP, 3);

        assert!(!parsed.degraded);
        let pages: Vec<u32> = parsed.scenes.iter().map(|s| s.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(parsed.scenes[1].narration, "风筝飞起来了。");
        assert!(parsed.scenes[0].image_prompt.starts_with("Page 1"));
    }

    #[test]
    fn test_labels_out_of_order_and_compact() {
        let text = script(&["PAGE2 second", "page1 first", "Page 3 third"]);
        let parsed = parse_script(&text, SEP, 3);
        assert_eq!(parsed.scenes.len(), 3);
        assert!(parsed.scenes[0].image_prompt.contains("first"));
        assert!(parsed.scenes[1].image_prompt.contains("second"));
    }

    #[test]
    fn test_stops_at_first_missing_page() {
        let text = script(&["Page 1 a", "Page 3 c"]);
        let parsed = parse_script(&text, SEP, 3);
        assert_eq!(parsed.scenes.len(), 1);
        assert!(!parsed.degraded);
    }

    #[test]
    fn test_page_ten_is_not_page_one() {
        assert!(!has_page_marker("Page 10", 1));
        assert!(has_page_marker("Page 10", 10));
        assert!(has_page_marker("see page1.", 1));
    }

    #[test]
    fn test_block_is_not_accepted_twice() {
        // One block mentions both pages; the second page must come from another block
        let text = script(&["Page 1 and Page 2 together"]);
        let parsed = parse_script(&text, SEP, 3);
        assert_eq!(parsed.scenes.len(), 1);
    }

    #[test]
    fn test_fallback_uses_last_blocks() {
        let text = script(&["cover", "intro", "alpha", "beta", "gamma"]);
        let parsed = parse_script(&text, SEP, 3);

        assert!(parsed.degraded);
        let prompts: Vec<&str> = parsed.scenes.iter().map(|s| s.image_prompt.as_str()).collect();
        assert_eq!(prompts, vec!["alpha", "beta", "gamma"]);
        let pages: Vec<u32> = parsed.scenes.iter().map(|s| s.page_number).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[test]
    fn test_too_few_blocks_yields_nothing() {
        let parsed = parse_script(&script(&["one", "two"]), SEP, 3);
        assert!(parsed.is_empty());
        assert!(!parsed.degraded);
        assert!(parse_script("", SEP, 3).is_empty());
    }

    #[test]
    fn test_empty_blocks_are_discarded() {
        let text = format!("{s}\n \n{s}Page 1 x{s}   {s}", s = SEP);
        let parsed = parse_script(&text, SEP, 3);
        assert_eq!(parsed.scenes.len(), 1);
        assert_eq!(parsed.scenes[0].image_prompt, "Page 1 x");
    }

    #[test]
    fn test_localized_caption_alone() {
        assert_eq!(extract_narration("Page 1\n中文文案：你好"), "你好");
        assert_eq!(extract_narration("中文文案: “你好”\nComposition: wide"), "你好");
    }

    #[test]
    fn test_both_captions_are_joined() {
        let block = "Page 2\n中文文案：小猫跳起来。\nEnglish Caption: The kitten jumps.";
        assert_eq!(extract_narration(block), "小猫跳起来。\nThe kitten jumps.");
    }

    #[test]
    fn test_english_caption_alone() {
        assert_eq!(extract_narration("english caption: Hello moon"), "Hello moon");
    }

    #[test]
    fn test_quoted_fallback() {
        assert_eq!(extract_narration(r#"She said "A" then "B" then "C""#), "A\nB");
        assert_eq!(extract_narration("他说“早上好”"), "早上好");
    }

    #[test]
    fn test_pending_placeholder() {
        assert_eq!(extract_narration("Page 1 a quiet forest"), PENDING_NARRATION);
        assert_eq!(extract_narration("中文文案：   "), PENDING_NARRATION);
    }
}
