use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A normalized feed item ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPost {
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub feed_id: i64,
    pub title: String,
    pub url: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn from_new(new: &NewPost) -> Self {
        Self {
            id: Self::generate_id(&new.url),
            feed_id: new.feed_id,
            title: new.title.clone(),
            url: new.url.clone(),
            description: new.description.clone(),
            published_at: new.published_at,
            created_at: Utc::now(),
        }
    }

    /// Posts are keyed by URL, so the ID is derived from it alone.
    pub fn generate_id(url: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            "(Untitled)"
        } else {
            &self.title
        }
    }
}

/// A post as shown to a user, with the name of the feed it came from.
#[derive(Debug, Clone)]
pub struct UserPost {
    pub post: Post,
    pub feed_name: String,
}
