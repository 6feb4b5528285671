//! Prompt text for the generation stages.

use serde_json::json;
use storybook_models::Metadata;

/// Separator between blocks in the generated script.
pub const BLOCK_SENTINEL: &str = "<<<STORYBOOK_PAGE_BREAK>>>";

/// Label introducing the localized caption line of a page.
pub const LOCALIZED_CAPTION_LABEL: &str = "中文文案";

/// Label introducing the English caption line of a page.
pub const ENGLISH_CAPTION_LABEL: &str = "English Caption";

/// Appended to every page prompt sent to the image service.
pub const ILLUSTRATION_STYLE: &str = "masterpiece, best quality, soft watercolor picture-book art, \
hand-painted on textured paper, gentle lighting, keep the child from the reference photo \
recognizable on every page";

/// System instruction for the metadata stage.
pub const METADATA_INSTRUCTION: &str = r#"You are the editor of a children's picture book.
You receive two short videos.
- The first video shows the child who will be the hero of the book. Study their apparent age, gender, hair, glasses and clothing.
- The second video is the child telling a story idea. Extract the plot and turn it into a warm, imaginative fairy tale.

Return one JSON object with:
- title: a short book title in Chinese
- summary: two or three sentences summarising the story
- characterAge: the hero's apparent age, e.g. "6-year-old"
- characterGender: "boy" or "girl" or a neutral description
- characterClothing: precise English tags for hair and clothing, e.g. "double buns black hair, round red glasses, pink hoodie with cat print"

Never describe anything dark or scary."#;

/// User prompt for the metadata stage.
pub const METADATA_PROMPT: &str = "Analyze both videos and return the story metadata.";

/// Gemini `responseSchema` for [`Metadata`].
pub fn metadata_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": { "type": "STRING" },
            "summary": { "type": "STRING" },
            "characterAge": { "type": "STRING" },
            "characterGender": { "type": "STRING" },
            "characterClothing": {
                "type": "STRING",
                "description": "Precise English visual tags for hair, accessories and clothing"
            }
        },
        "required": ["title", "summary", "characterAge", "characterGender", "characterClothing"]
    })
}

/// Instruction for the script stage.
pub fn script_prompt(metadata: &Metadata, page_count: usize) -> String {
    let mut pages = String::new();
    for page in 1..=page_count {
        pages.push_str(&format!(
            "{sentinel}\nPage {page}\n\
{zh}：<one or two Chinese sentences for this page>\n\
{en}: <the same line in simple English>\n\
Composition: <camera angle, where the hero stands, what they are doing, the setting>\n\
Lettering: leave calm space at the bottom third for the captions above\n",
            sentinel = BLOCK_SENTINEL,
            page = page,
            zh = LOCALIZED_CAPTION_LABEL,
            en = ENGLISH_CAPTION_LABEL,
        ));
    }

    format!(
        r#"Write the page-by-page script of a watercolor picture book.

Book title: {title}
Story summary: {summary}
Hero: a {age} {gender}, wearing {clothing}

The first video shows the hero. The second video is the story they told.
Every page must show the same hero with exactly these features: {age}, {gender}, {clothing}.

Output plain text only, no JSON and no markdown. Produce exactly {total} blocks separated by the line {sentinel}:
1. A cover block starting with "Cover" that describes the cover illustration and the title lettering.
2. An introduction block starting with "Introduction" that presents the hero.
3. Exactly {page_count} story page blocks, in order, each shaped like this:
{pages}
Rules:
- Never write the word "Page" in the cover or introduction blocks.
- Keep captions short, kind and easy for a five-year-old to follow.
- Art style: soft watercolor, hand-painted texture, whimsical and bright. No photorealism, no 3D render, nothing dark or scary.
"#,
        title = metadata.title,
        summary = metadata.summary,
        age = metadata.character_age,
        gender = metadata.character_gender,
        clothing = metadata.character_clothing,
        total = page_count + 2,
        sentinel = BLOCK_SENTINEL,
        page_count = page_count,
        pages = pages,
    )
}

/// Final text sent to the image service for one page.
pub fn illustration_prompt(page_prompt: &str) -> String {
    format!("{}\n\n{}", page_prompt.trim(), ILLUSTRATION_STYLE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> Metadata {
        Metadata {
            title: "月亮船".into(),
            summary: "A girl sails to the moon.".into(),
            character_age: "6-year-old".into(),
            character_gender: "girl".into(),
            character_clothing: "pink hoodie".into(),
        }
    }

    #[test]
    fn test_script_prompt_embeds_every_metadata_field() {
        let prompt = script_prompt(&metadata(), 3);
        for field in ["月亮船", "A girl sails to the moon.", "6-year-old", "girl", "pink hoodie"] {
            assert!(prompt.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn test_script_prompt_lists_each_page() {
        let prompt = script_prompt(&metadata(), 3);
        assert!(prompt.contains("Page 1\n"));
        assert!(prompt.contains("Page 3\n"));
        assert!(!prompt.contains("Page 4\n"));
        assert_eq!(prompt.matches(BLOCK_SENTINEL).count(), 4);
        assert!(prompt.contains("exactly 5 blocks"));
    }

    #[test]
    fn test_schema_requires_all_fields() {
        let schema = metadata_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 5);
    }
}
