pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, HostError, InlayError, WebViewError};
pub use id::{HandleId, Tag, WindowId};
pub use types::{Insets, Metric, Point};

pub type Result<T> = std::result::Result<T, InlayError>;
