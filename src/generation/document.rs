/// Characters that are not allowed in file names on common platforms.
const FORBIDDEN: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// File name of the document sent to the user.
pub fn file_name(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if FORBIDDEN.contains(&c) || c.is_control() { '_' } else { c })
        .collect();
    let stem = if stem.is_empty() { "book".to_string() } else { stem };
    format!("{stem}.txt")
}

/// Renders the book as UTF-8 plain text with the title as a heading.
pub fn render(title: &str, text: &str) -> Vec<u8> {
    let underline = "=".repeat(title.chars().count());
    format!("{title}\n{underline}\n\n{}\n", text.trim_end()).into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_name_replaces_forbidden_characters() {
        assert_eq!(file_name("Dune"), "Dune.txt");
        assert_eq!(file_name("AC/DC: \"Live\""), "AC_DC_ _Live_.txt");
        assert_eq!(file_name("   "), "book.txt");
    }

    #[test]
    fn test_render_has_heading() {
        let bytes = render("Идиот", "Текст\n\n");
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "Идиот\n=====\n\nТекст\n");
    }
}
