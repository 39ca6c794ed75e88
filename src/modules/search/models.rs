use serde::{Deserialize, Serialize};

const UNKNOWN_TITLE: &str = "Unknown Title";
const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// A book found by remote search, not yet in the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookCandidate {
    pub id: String,
    pub title: String,
    /// Never empty.
    pub authors: Vec<String>,
    pub page_count: u32,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

impl BookCandidate {
    pub fn primary_author(&self) -> &str {
        self.authors
            .first()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_AUTHOR)
    }

    pub fn authors_text(&self) -> String {
        self.authors.join(", ")
    }
}

/// Body of a volumes search response.
#[derive(Debug, Deserialize)]
pub(crate) struct VolumesResponse {
    #[serde(default)]
    pub items: Option<Vec<VolumeItem>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeItem {
    pub id: String,
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VolumeInfo {
    pub title: Option<String>,
    pub authors: Option<Vec<String>>,
    pub page_count: Option<u32>,
    pub description: Option<String>,
    pub published_date: Option<String>,
    pub categories: Option<Vec<String>>,
    pub image_links: Option<ImageLinks>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ImageLinks {
    pub thumbnail: Option<String>,
}

impl From<VolumeItem> for BookCandidate {
    fn from(item: VolumeItem) -> Self {
        let info = item.volume_info;
        let authors = info
            .authors
            .filter(|authors| !authors.is_empty())
            .unwrap_or_else(|| vec![UNKNOWN_AUTHOR.to_string()]);

        Self {
            id: item.id,
            title: info.title.unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            authors,
            page_count: info.page_count.unwrap_or(0),
            thumbnail_url: info.image_links.and_then(|links| links.thumbnail),
            description: info.description,
            published_date: info.published_date,
            categories: info.categories,
        }
    }
}
