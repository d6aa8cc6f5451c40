use serde::{Deserialize, Serialize};

/// Localized text (`TranslatedText` in ODM).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedText {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    pub value: String,
}

impl TranslatedText {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            lang: None,
            value: value.into(),
        }
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }
}

/// Reference to an external document (`def:DocumentRef`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub leaf_id: String,
    /// Page references as written in the PDFPageRef element (e.g. "12 14").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
}

/// First description value, the label shown for most entities.
pub fn first_text(texts: &[TranslatedText]) -> Option<&str> {
    texts.first().map(|text| text.value.as_str())
}
