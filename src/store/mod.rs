pub mod sqlite;

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, NewPost, Post, User, UserPost};

pub use sqlite::SqliteStore;

/// The storage surface the ingestion engine depends on.
///
/// Implementations classify a post whose URL already exists as
/// [`GatorError::DuplicateKey`](crate::app::GatorError::DuplicateKey), so the
/// engine never inspects storage-specific error codes.
pub trait FeedGateway {
    /// The least recently fetched feed, never-fetched feeds first.
    /// Fails with `NoFeedsAvailable` when there are no feeds.
    fn select_next_feed(&self) -> Result<Feed>;

    /// Set `last_fetched_at` to now. Never moves it backwards.
    fn mark_feed_fetched(&self, feed_id: i64) -> Result<()>;

    fn create_post(&self, post: &NewPost) -> Result<Post>;
}

pub trait Store {
    // User operations
    fn create_user(&self, name: &str) -> Result<User>;
    fn get_user(&self, name: &str) -> Result<Option<User>>;
    fn get_users(&self) -> Result<Vec<User>>;
    fn reset_users(&self) -> Result<()>;

    // Feed operations
    fn create_feed(&self, feed: &Feed) -> Result<Feed>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_feeds(&self) -> Result<Vec<Feed>>;

    // Follow operations
    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;
    fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>>;
    fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<bool>;

    // Post operations
    fn get_post_by_url(&self, url: &str) -> Result<Option<Post>>;
    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>>;
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<UserPost>>;
}
