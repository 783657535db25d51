//! Helper functions for templates and serializers

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use self::url::*;
