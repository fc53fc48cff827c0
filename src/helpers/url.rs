//! URL helper functions

use crate::config::SiteConfig;

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "2021/02/20/my-post/") // -> "/blog/2021/02/20/my-post/"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "categories/ios/") // -> "https://example.com/blog/categories/ios/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Site-relative path of a page address, with a trailing slash
pub fn page_path(config: &SiteConfig, address: &str) -> String {
    url_for(config, &format!("{}/", address.trim_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SiteConfig {
        SiteConfig {
            url: "https://example.com/".to_string(),
            root: "/blog/".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_url_for() {
        let config = test_config();
        assert_eq!(url_for(&config, "/css/style.css"), "/blog/css/style.css");
        assert_eq!(url_for(&config, ""), "/blog/");
    }

    #[test]
    fn test_full_url_for() {
        let config = test_config();
        assert_eq!(
            full_url_for(&config, "/categories/ios/"),
            "https://example.com/blog/categories/ios/"
        );
    }

    #[test]
    fn test_page_path_with_default_root() {
        let config = SiteConfig::default();
        assert_eq!(
            page_path(&config, "2021/02/20/nsoperation-subclassing"),
            "/2021/02/20/nsoperation-subclassing/"
        );
    }
}
