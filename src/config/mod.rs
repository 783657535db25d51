//! Configuration module

mod site;

pub use site::ArticleConfig;
pub use site::CmsConfig;
pub use site::ListingConfig;
pub use site::SiteConfig;
pub use site::{ACCESS_TOKEN_ENV, ENDPOINT_ENV};
