pub mod feed;
pub mod post;
pub mod user;

pub use feed::{Feed, FeedFollow};
pub use post::{NewPost, Post, UserPost};
pub use user::User;
