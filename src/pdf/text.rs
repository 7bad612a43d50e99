//! Page text helpers.

/// Title used for pages without text.
pub const UNTITLED_SLIDE: &str = "Untitled slide";

/// Split page text into its first non-empty line and the remainder.
pub fn split_title(text: &str) -> (String, String) {
    let mut lines = text.lines();
    for line in lines.by_ref() {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let rest: Vec<&str> = lines.collect();
            return (trimmed.to_string(), rest.join("\n"));
        }
    }
    (UNTITLED_SLIDE.to_string(), String::new())
}

/// Trim lines, drop empty ones and collapse all whitespace to single spaces.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_title_skips_blank_lines() {
        let (title, body) = split_title("\n  \n Cell Biology \nMitosis\nMeiosis");
        assert_eq!(title, "Cell Biology");
        assert_eq!(body, "Mitosis\nMeiosis");
    }

    #[test]
    fn test_split_title_of_empty_page() {
        assert_eq!(split_title("  \n"), (UNTITLED_SLIDE.to_string(), String::new()));
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a   b \n\n  c\t d  "), "a b c d");
        assert_eq!(clean_text("\n \n"), "");
    }
}
