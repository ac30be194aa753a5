use serde::{Deserialize, Serialize};

/// File metadata, as returned by `getFile` and embedded in every media object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub file_id: String,
    #[serde(default)]
    pub file_unique_id: String,
    pub file_size: Option<i64>,
    /// Server-relative path, only present in `getFile` responses.
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoSize {
    #[serde(flatten)]
    pub file: File,
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(flatten)]
    pub file: File,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    #[serde(flatten)]
    pub file: File,
    pub duration: i64,
    pub performer: Option<String>,
    pub title: Option<String>,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Voice {
    #[serde(flatten)]
    pub file: File,
    pub duration: i64,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    #[serde(flatten)]
    pub file: File,
    pub width: i64,
    pub height: i64,
    pub duration: i64,
    pub mime_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sticker {
    #[serde(flatten)]
    pub file: File,
    pub width: i64,
    pub height: i64,
    pub emoji: Option<String>,
    #[serde(default)]
    pub is_animated: bool,
}
