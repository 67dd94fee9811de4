use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, NewPost, Post, User, UserPost};
use crate::store::{FeedGateway, Store};

const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at, updated_at";
const POST_COLUMNS: &str = "id, feed_id, title, url, description, published_at, created_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GatorError::Migration(e.to_string()))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// Fixed-width UTC timestamps so that text order matches time order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn decode_datetime(raw: &str, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        Self::parse_datetime(raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                Type::Text,
                format!("invalid timestamp {:?}", raw).into(),
            )
        })
    }

    fn required_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        Self::decode_datetime(&row.get::<_, String>(idx)?, idx)
    }

    fn optional_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
        row.get::<_, Option<String>>(idx)?
            .map(|s| Self::decode_datetime(&s, idx))
            .transpose()
    }

    fn feed_from_row(row: &Row<'_>) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            last_fetched_at: Self::optional_datetime(row, 4)?,
            created_at: Self::required_datetime(row, 5)?,
            updated_at: Self::required_datetime(row, 6)?,
        })
    }

    fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: Self::optional_datetime(row, 5)?,
            created_at: Self::required_datetime(row, 6)?,
        })
    }

    fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: Self::required_datetime(row, 2)?,
            updated_at: Self::required_datetime(row, 3)?,
        })
    }

    fn follow_from_row(row: &Row<'_>) -> rusqlite::Result<FeedFollow> {
        Ok(FeedFollow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            feed_id: row.get(2)?,
            user_name: row.get(3)?,
            feed_name: row.get(4)?,
            created_at: Self::required_datetime(row, 5)?,
        })
    }

    /// Map unique and primary-key violations to `DuplicateKey`.
    fn classify(err: rusqlite::Error, key: &str) -> GatorError {
        match &err {
            rusqlite::Error::SqliteFailure(e, _)
                if e.code == ErrorCode::ConstraintViolation
                    && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
            {
                GatorError::DuplicateKey(key.to_string())
            }
            _ => GatorError::Database(err),
        }
    }
}

impl FeedGateway for SqliteStore {
    fn select_next_feed(&self) -> Result<Feed> {
        let conn = self.conn()?;

        conn.query_row(
            &format!(
                "SELECT {FEED_COLUMNS} FROM feeds
                 ORDER BY last_fetched_at IS NOT NULL, last_fetched_at ASC, id ASC
                 LIMIT 1"
            ),
            [],
            Self::feed_from_row,
        )
        .optional()?
        .ok_or(GatorError::NoFeedsAvailable)
    }

    fn mark_feed_fetched(&self, feed_id: i64) -> Result<()> {
        let conn = self.conn()?;
        let now = Self::format_datetime(&Utc::now());

        let updated = conn.execute(
            "UPDATE feeds
             SET last_fetched_at = CASE
                     WHEN last_fetched_at IS NULL OR last_fetched_at < ?1 THEN ?1
                     ELSE last_fetched_at
                 END,
                 updated_at = ?1
             WHERE id = ?2",
            params![now, feed_id],
        )?;

        if updated == 0 {
            return Err(GatorError::FeedNotFound(feed_id.to_string()));
        }

        Ok(())
    }

    fn create_post(&self, post: &NewPost) -> Result<Post> {
        let conn = self.conn()?;
        let stored = Post::from_new(post);
        let created_at = Self::format_datetime(&stored.created_at);

        conn.execute(
            "INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                stored.id,
                stored.feed_id,
                stored.title,
                stored.url,
                stored.description,
                stored.published_at.as_ref().map(Self::format_datetime),
                created_at,
            ],
        )
        .map_err(|e| Self::classify(e, &stored.url))?;

        Ok(stored)
    }
}

impl Store for SqliteStore {
    fn create_user(&self, name: &str) -> Result<User> {
        let conn = self.conn()?;
        let now = Utc::now();
        let stamp = Self::format_datetime(&now);

        conn.execute(
            "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?2)",
            params![name, stamp],
        )
        .map_err(|e| Self::classify(e, name))?;

        Ok(User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    fn get_user(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT id, name, created_at, updated_at FROM users WHERE name = ?1",
                params![name],
                Self::user_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut stmt =
            conn.prepare("SELECT id, name, created_at, updated_at FROM users ORDER BY name")?;

        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn reset_users(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM users", [])?;
        Ok(())
    }

    fn create_feed(&self, feed: &Feed) -> Result<Feed> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (name, url, user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                Self::format_datetime(&feed.created_at),
                Self::format_datetime(&feed.updated_at),
            ],
        )
        .map_err(|e| Self::classify(e, &feed.url))?;

        Ok(Feed {
            id: conn.last_insert_rowid(),
            last_fetched_at: None,
            ..feed.clone()
        })
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY user_id, name, url"
        ))?;

        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn create_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.conn()?;
        let stamp = Self::format_datetime(&Utc::now());

        conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![user_id, feed_id, stamp],
        )
        .map_err(|e| Self::classify(e, &format!("follow {user_id}/{feed_id}")))?;

        let follow = conn.query_row(
            "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, ff.created_at
             FROM feed_follows ff
             JOIN users u ON u.id = ff.user_id
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.id = ?1",
            params![conn.last_insert_rowid()],
            Self::follow_from_row,
        )?;

        Ok(follow)
    }

    fn get_feed_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, ff.created_at
             FROM feed_follows ff
             JOIN users u ON u.id = ff.user_id
             JOIN feeds f ON f.id = ff.feed_id
             WHERE ff.user_id = ?1
             ORDER BY f.name",
        )?;

        let follows = stmt
            .query_map(params![user_id], Self::follow_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn delete_feed_follow(&self, user_id: i64, feed_id: i64) -> Result<bool> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id, feed_id],
        )?;

        Ok(deleted > 0)
    }

    fn get_post_by_url(&self, url: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE url = ?1"),
                params![url],
                Self::post_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE feed_id = ?1
             ORDER BY published_at IS NULL, published_at DESC, created_at DESC"
        ))?;

        let posts = stmt
            .query_map(params![feed_id], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<UserPost>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, f.name
             FROM posts p
             JOIN feed_follows ff ON ff.feed_id = p.feed_id
             JOIN feeds f ON f.id = p.feed_id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at IS NULL, p.published_at DESC, p.created_at DESC
             LIMIT ?2",
        )?;

        let posts = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(UserPost {
                    post: Self::post_from_row(row)?,
                    feed_name: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }
}
