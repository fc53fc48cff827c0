//! Canonical page addresses derived from a post's date and title

use super::error::{ParseError, ParseErrorKind};
use super::FrontMatter;

/// Separator used in place of whitespace runs
const SEPARATOR: char = '-';

/// Derive `YYYY/MM/DD/<slug>` from the front matter.
///
/// The date is formatted in the offset it was written with, so the address
/// matches the calendar day shown in the source.
pub fn derive_address(front_matter: &FrontMatter) -> Result<String, ParseError> {
    let slug = slugify_title(&front_matter.title);
    if slug.is_empty() {
        return Err(ParseError::new(
            1,
            ParseErrorKind::EmptySlug(front_matter.title.clone()),
        ));
    }
    Ok(format!("{}/{}", front_matter.date.format("%Y/%m/%d"), slug))
}

/// Lower-case, join whitespace runs with `-`, keep only `[a-z0-9_-]`
pub fn slugify_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let joined = lowered.split_whitespace().collect::<Vec<_>>().join("-");

    let mut slug = String::with_capacity(joined.len());
    for c in joined.chars() {
        let allowed = c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == SEPARATOR;
        if !allowed || (c == SEPARATOR && slug.ends_with(SEPARATOR)) {
            continue;
        }
        slug.push(c);
    }

    slug.trim_matches(SEPARATOR).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn front_matter(title: &str, date: &str) -> FrontMatter {
        let content = format!(
            "---\nlayout: post\ntitle: {}\ndate: {}\n---\n",
            title, date
        );
        FrontMatter::parse(&content).unwrap().0
    }

    #[test]
    fn test_derive_address() {
        let fm = front_matter("NSOperation Subclassing", "2021-02-20");
        assert_eq!(
            derive_address(&fm).unwrap(),
            "2021/02/20/nsoperation-subclassing"
        );
    }

    #[test]
    fn test_derive_address_is_idempotent() {
        let fm = front_matter("UIColor & Friends: A History", "2021-02-20 23:30:00 -0800");
        let first = derive_address(&fm).unwrap();
        let second = derive_address(&fm).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, "2021/02/20/uicolor-friends-a-history");
    }

    #[test]
    fn test_slugify_title() {
        assert_eq!(slugify_title("  Hello   World  "), "hello-world");
        assert_eq!(slugify_title("snake_case - dashes"), "snake_case-dashes");
        assert_eq!(slugify_title("C++ in 2021?"), "c-in-2021");
        assert_eq!(slugify_title("Tabs\tand\nnewlines"), "tabs-and-newlines");
    }

    #[test]
    fn test_empty_slug_is_an_error() {
        let fm = front_matter("\"!!!\"", "2021-02-20");
        let err = derive_address(&fm).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptySlug("!!!".to_string()));
    }
}
