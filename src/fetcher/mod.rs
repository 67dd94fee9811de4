pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::{CancelToken, Result};

pub use http_fetcher::HttpFetcher;

#[async_trait]
pub trait Fetcher {
    /// Retrieve the raw body at `url`.
    ///
    /// Only a `200 OK` response yields bytes. The call returns
    /// [`GatorError::Cancelled`](crate::app::GatorError::Cancelled) as soon
    /// as `cancel` fires.
    async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>>;
}
