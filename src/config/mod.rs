//! Configuration module

mod site;

pub use site::CollisionPolicy;
pub use site::HighlightConfig;
pub use site::SiteConfig;
