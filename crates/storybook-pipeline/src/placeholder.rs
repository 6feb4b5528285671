//! Placeholder illustrations for failed pages.

use crate::ports::PlaceholderProvider;

/// URL template with a `{page}` slot.
#[derive(Debug, Clone)]
pub struct TemplatePlaceholder {
    template: String,
}

impl TemplatePlaceholder {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

impl PlaceholderProvider for TemplatePlaceholder {
    fn placeholder(&self, page_number: u32) -> String {
        self.template.replace("{page}", &page_number.to_string())
    }
}
