//! Story metadata produced by the analysis stage.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Compact structured summary of both clips.
///
/// Produced once per request and embedded verbatim into the script prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Story title
    #[validate(length(min = 1))]
    pub title: String,
    /// Plot synopsis
    #[validate(length(min = 1))]
    pub summary: String,
    /// Estimated age of the main character
    #[validate(length(min = 1))]
    pub character_age: String,
    /// Gender presentation of the main character
    #[validate(length(min = 1))]
    pub character_gender: String,
    /// Clothing description of the main character
    #[validate(length(min = 1))]
    pub character_clothing: String,
}

impl Metadata {
    /// Trim surrounding whitespace from every field.
    pub fn normalized(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            summary: self.summary.trim().to_string(),
            character_age: self.character_age.trim().to_string(),
            character_gender: self.character_gender.trim().to_string(),
            character_clothing: self.character_clothing.trim().to_string(),
        }
    }

    /// One-line visual description of the main character.
    pub fn visual_description(&self) -> String {
        format!(
            "{}, {}, wearing {}",
            self.character_age, self.character_gender, self.character_clothing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Metadata {
        Metadata {
            title: "The Moon Kite".to_string(),
            summary: "A girl flies a kite to the moon.".to_string(),
            character_age: "about 6 years old".to_string(),
            character_gender: "girl".to_string(),
            character_clothing: "yellow raincoat".to_string(),
        }
    }

    #[test]
    fn test_metadata_deserializes_camel_case() {
        let json = r#"{
            "title": "The Moon Kite",
            "summary": "A girl flies a kite to the moon.",
            "characterAge": "about 6 years old",
            "characterGender": "girl",
            "characterClothing": "yellow raincoat"
        }"#;
        let metadata: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(metadata, sample());
    }

    #[test]
    fn test_blank_field_fails_validation() {
        let mut metadata = sample();
        metadata.character_clothing = "   ".to_string();
        assert!(metadata.clone().normalized().validate().is_err());
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_visual_description() {
        assert_eq!(
            sample().visual_description(),
            "about 6 years old, girl, wearing yellow raincoat"
        );
    }
}
