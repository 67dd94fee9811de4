use std::collections::HashMap;

use crate::app::{AppContext, CancelToken, GatorError, Result};
use crate::domain::Feed;
use crate::sanitizer::strip_markup;
use crate::scheduler::{cancel_on_shutdown_signal, PollInterval, Scheduler};
use crate::store::Store;

pub fn register(ctx: &mut AppContext, name: &str) -> Result<()> {
    // A taken name surfaces as DuplicateKey.
    let user = ctx.store.create_user(name)?;

    ctx.config.set_user(&user.name)?;
    println!("Registered user: {}", user.name);
    Ok(())
}

pub fn login(ctx: &mut AppContext, name: &str) -> Result<()> {
    let user = ctx
        .store
        .get_user(name)?
        .ok_or_else(|| GatorError::UserNotFound(name.to_string()))?;

    ctx.config.set_user(&user.name)?;
    println!("Logged in as: {}", user.name);
    Ok(())
}

pub fn list_users(ctx: &AppContext) -> Result<()> {
    let users = ctx.store.get_users()?;

    if users.is_empty() {
        println!("No users");
        return Ok(());
    }

    let current = ctx.config.current_user_name.as_deref();
    for user in users {
        if Some(user.name.as_str()) == current {
            println!("* {} (current)", user.name);
        } else {
            println!("* {}", user.name);
        }
    }

    Ok(())
}

pub fn reset(ctx: &AppContext) -> Result<()> {
    ctx.store.reset_users()?;
    println!("Database reset");
    Ok(())
}

/// Add a feed owned by the current user, who also starts following it.
pub fn add_feed(ctx: &AppContext, name: &str, url: &str) -> Result<Feed> {
    let user = ctx.current_user()?;
    url::Url::parse(url)?;

    let feed = ctx
        .store
        .create_feed(&Feed::new(name.to_string(), url.to_string(), user.id))?;
    ctx.store.create_feed_follow(user.id, feed.id)?;

    println!("Added feed: {} ({})", feed.display_title(), feed.url);
    Ok(feed)
}

pub fn list_feeds(ctx: &AppContext) -> Result<()> {
    let feeds = ctx.store.get_feeds()?;

    if feeds.is_empty() {
        println!("No feeds");
        return Ok(());
    }

    let owners: HashMap<i64, String> = ctx
        .store
        .get_users()?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    for feed in feeds {
        let owner = owners.get(&feed.user_id).map(String::as_str).unwrap_or("?");
        println!("{} ({})\n  {}", feed.display_title(), owner, feed.url);
    }

    Ok(())
}

pub fn follow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))?;

    match ctx.store.create_feed_follow(user.id, feed.id) {
        Ok(follow) => println!("{} now follows {}", follow.user_name, follow.feed_name),
        Err(GatorError::DuplicateKey(_)) => {
            println!("{} already follows {}", user.name, feed.display_title())
        }
        Err(e) => return Err(e),
    }

    Ok(())
}

pub fn list_following(ctx: &AppContext) -> Result<()> {
    let user = ctx.current_user()?;
    let follows = ctx.store.get_feed_follows_for_user(user.id)?;

    if follows.is_empty() {
        println!("{} follows no feeds", user.name);
        return Ok(());
    }

    for follow in follows {
        println!("* {}", follow.feed_name);
    }

    Ok(())
}

pub fn unfollow(ctx: &AppContext, url: &str) -> Result<()> {
    let user = ctx.current_user()?;
    let feed = ctx
        .store
        .get_feed_by_url(url)?
        .ok_or_else(|| GatorError::FeedNotFound(url.to_string()))?;

    if ctx.store.delete_feed_follow(user.id, feed.id)? {
        println!("Unfollowed {}", feed.display_title());
    } else {
        println!("{} does not follow {}", user.name, feed.display_title());
    }

    Ok(())
}

/// Poll feeds until Ctrl-C or SIGTERM.
pub async fn aggregate(ctx: &AppContext, interval: Option<&str>) -> Result<()> {
    let interval: PollInterval = match interval {
        Some(raw) => raw.parse()?,
        None => ctx.config.aggregator.poll_interval()?,
    };

    let cancel = CancelToken::new();
    cancel_on_shutdown_signal(cancel.clone());

    Scheduler::new(ctx.aggregator(), interval).run(&cancel).await;
    Ok(())
}

pub fn browse(ctx: &AppContext, limit: usize) -> Result<()> {
    let user = ctx.current_user()?;
    let posts = ctx.store.get_posts_for_user(user.id, limit)?;

    if posts.is_empty() {
        println!("No posts yet, run `gator agg` to collect some");
        return Ok(());
    }

    for entry in posts {
        let post = &entry.post;
        let date = post
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "          ".to_string());

        println!("{} {} | {}", date, entry.feed_name, post.display_title());
        if let Some(description) = post.description.as_deref() {
            let text = strip_markup(description);
            if !text.is_empty() {
                println!("  {}", text);
            }
        }
        println!("  {}", post.url);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::domain::NewPost;
    use crate::store::FeedGateway;

    fn context(dir: &tempfile::TempDir) -> AppContext {
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        AppContext::in_memory(config).unwrap()
    }

    #[test]
    fn test_register_logs_in() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);

        register(&mut ctx, "lane").unwrap();

        assert_eq!(ctx.config.current_user_name.as_deref(), Some("lane"));
        assert_eq!(ctx.current_user().unwrap().name, "lane");
        let reloaded = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(reloaded.current_user_name.as_deref(), Some("lane"));
    }

    #[test]
    fn test_register_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);

        register(&mut ctx, "lane").unwrap();
        assert!(matches!(
            register(&mut ctx, "lane").unwrap_err(),
            GatorError::DuplicateKey(_)
        ));
    }

    #[test]
    fn test_login_unknown_user() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);

        assert!(matches!(
            login(&mut ctx, "ghost").unwrap_err(),
            GatorError::UserNotFound(_)
        ));
        assert!(ctx.config.current_user_name.is_none());
    }

    #[test]
    fn test_add_feed_follows_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();

        let feed = add_feed(&ctx, "Lanes", "https://example.com/index.xml").unwrap();

        let user = ctx.current_user().unwrap();
        let follows = ctx.store.get_feed_follows_for_user(user.id).unwrap();
        assert_eq!(follows.len(), 1);
        assert_eq!(follows[0].feed_id, feed.id);
    }

    #[test]
    fn test_add_feed_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();

        assert!(matches!(
            add_feed(&ctx, "Broken", "not a url").unwrap_err(),
            GatorError::InvalidUrl(_)
        ));
        assert!(ctx.store.get_feeds().unwrap().is_empty());
    }

    #[test]
    fn test_add_feed_requires_login() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);

        assert!(matches!(
            add_feed(&ctx, "Lanes", "https://example.com/index.xml").unwrap_err(),
            GatorError::NotLoggedIn
        ));
    }

    #[test]
    fn test_follow_and_unfollow() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();
        add_feed(&ctx, "Lanes", "https://example.com/index.xml").unwrap();
        register(&mut ctx, "kahya").unwrap();

        follow(&ctx, "https://example.com/index.xml").unwrap();
        // Following twice is reported, not an error.
        follow(&ctx, "https://example.com/index.xml").unwrap();

        let kahya = ctx.current_user().unwrap();
        assert_eq!(ctx.store.get_feed_follows_for_user(kahya.id).unwrap().len(), 1);

        unfollow(&ctx, "https://example.com/index.xml").unwrap();
        assert!(ctx.store.get_feed_follows_for_user(kahya.id).unwrap().is_empty());
    }

    #[test]
    fn test_follow_unknown_feed() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();

        assert!(matches!(
            follow(&ctx, "https://example.com/missing.xml").unwrap_err(),
            GatorError::FeedNotFound(_)
        ));
    }

    #[test]
    fn test_reset_clears_users() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();
        add_feed(&ctx, "Lanes", "https://example.com/index.xml").unwrap();

        reset(&ctx).unwrap();

        assert!(ctx.store.get_users().unwrap().is_empty());
        assert!(ctx.store.get_feeds().unwrap().is_empty());
    }

    #[test]
    fn test_browse_with_posts() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(&dir);
        register(&mut ctx, "lane").unwrap();
        let feed = add_feed(&ctx, "Lanes", "https://example.com/index.xml").unwrap();

        ctx.store
            .create_post(&NewPost {
                feed_id: feed.id,
                title: "Hello".into(),
                url: "https://example.com/hello".into(),
                description: Some("<p>Hi</p>".into()),
                published_at: None,
            })
            .unwrap();

        browse(&ctx, 2).unwrap();
    }

    #[tokio::test]
    async fn test_aggregate_rejects_bad_interval() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir);

        assert!(matches!(
            aggregate(&ctx, Some("soon")).await.unwrap_err(),
            GatorError::InvalidInterval(_)
        ));
    }
}
