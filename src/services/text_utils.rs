//! Title normalization used to match folder names against library entries

use std::sync::LazyLock;

use regex::Regex;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:19|20)\d{2}").expect("valid regex"));

/// Normalize a title for matching.
/// Dots, dashes and underscores become spaces; quotes and colons go away.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace(['\'', '\u{2019}', ':', ','], "")
        .replace(['.', '-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn opens_year(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '-' | '_' | '(' | '[')
}

fn closes_year(c: char) -> bool {
    c.is_whitespace() || matches!(c, '.' | '-' | '_' | ')' | ']')
}

/// Split a release-style folder name into a normalized title and year.
///
/// Handles `Pathaan.2023`, `Pathaan (2023)`, `Pathaan [2023] 1080p` and
/// `Pathaan 2023 2160p WEB-DL`. The last plausible year wins, so titles that
/// are themselves years (`1917 (2019)`, `Blade.Runner.2049.2017`) keep their name.
pub fn split_title_year(folder_name: &str) -> (String, Option<i32>) {
    // The separators stay outside the match so adjacent years are both seen
    let last = YEAR_RE
        .find_iter(folder_name)
        .filter(|m| {
            let before = folder_name[..m.start()].chars().next_back();
            let after = folder_name[m.end()..].chars().next();
            before.is_some_and(opens_year) && after.is_none_or(closes_year)
        })
        .last();

    match last {
        Some(m) => {
            // Drop the opening separator with the year
            let title_end = folder_name[..m.start()]
                .char_indices()
                .next_back()
                .map_or(0, |(i, _)| i);
            let title = normalize_title(&folder_name[..title_end]);
            (title, m.as_str().parse().ok())
        }
        None => (normalize_title(folder_name), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("K.G.F: Chapter 2"), "k g f chapter 2");
        assert_eq!(normalize_title("Zindagi_Na_Milegi-Dobara"), "zindagi na milegi dobara");
        assert_eq!(normalize_title("Ocean's Eleven"), "oceans eleven");
    }

    #[test]
    fn test_split_dotted() {
        assert_eq!(split_title_year("Pathaan.2023"), ("pathaan".to_string(), Some(2023)));
    }

    #[test]
    fn test_split_parenthesized() {
        assert_eq!(split_title_year("RRR (2022)"), ("rrr".to_string(), Some(2022)));
        assert_eq!(
            split_title_year("Baahubali 2 [2017] 1080p"),
            ("baahubali 2".to_string(), Some(2017))
        );
    }

    #[test]
    fn test_split_release_name() {
        assert_eq!(
            split_title_year("Inception.2010.2160p.WEB-DL"),
            ("inception".to_string(), Some(2010))
        );
    }

    #[test]
    fn test_year_as_title() {
        assert_eq!(split_title_year("1917 (2019)"), ("1917".to_string(), Some(2019)));
    }

    #[test]
    fn test_numeric_title_followed_by_year() {
        assert_eq!(
            split_title_year("Blade.Runner.2049.2017.1080p"),
            ("blade runner 2049".to_string(), Some(2017))
        );
        assert_eq!(split_title_year("Movie.2012.2019"), ("movie 2012".to_string(), Some(2019)));
    }

    #[test]
    fn test_year_inside_longer_number_is_ignored() {
        assert_eq!(split_title_year("Dhoom.12019"), ("dhoom 12019".to_string(), None));
    }

    #[test]
    fn test_no_year() {
        assert_eq!(split_title_year("Lagaan"), ("lagaan".to_string(), None));
    }
}
