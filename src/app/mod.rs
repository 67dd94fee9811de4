pub mod cancel;
pub mod context;
pub mod error;

pub use cancel::CancelToken;
pub use context::AppContext;
pub use error::{GatorError, Result};
