//! Finished story structure.

use serde::{Deserialize, Serialize};

/// One illustrated page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    /// 1-based, dense page number
    pub page_number: u32,
    /// Narration shown under the illustration
    pub narration: String,
    /// Full page block, used verbatim as the image prompt
    pub image_prompt: String,
    /// Generated illustration or placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Scene {
    pub fn new(page_number: u32, narration: impl Into<String>, image_prompt: impl Into<String>) -> Self {
        Self {
            page_number,
            narration: narration.into(),
            image_prompt: image_prompt.into(),
            image_url: None,
        }
    }

    /// Returns the scene with its illustration set.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

/// Main character of the story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Character {
    pub name: String,
    pub visual_description: String,
}

/// Terminal output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub title: String,
    pub character: Character,
    pub scenes: Vec<Scene>,
}

impl Story {
    /// Build a story, ordering scenes by page number.
    pub fn new(title: impl Into<String>, character: Character, mut scenes: Vec<Scene>) -> Self {
        scenes.sort_by_key(|s| s.page_number);
        Self {
            title: title.into(),
            character,
            scenes,
        }
    }
}
