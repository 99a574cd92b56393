use indexmap::IndexMap;
use owo_colors::OwoColorize;

/// Header line as shown to the user; credentials are masked.
fn display_header(key: &str, value: &str) -> (String, bool) {
    let lower = key.to_lowercase();
    if lower == "authorization" || lower.contains("token") || lower.contains("api-key") {
        (format!("{}: ****", key), true)
    } else {
        (format!("{}: {}", key, value), false)
    }
}

/// Boxed rendering of the request every VU sends, printed in the run plan.
pub fn render_request_box(method: &str, url: &str, headers: &IndexMap<String, String>) -> Vec<String> {
    let request_line = format!("{} {}", method, url);
    let header_lines: Vec<(String, bool)> = headers
        .iter()
        .map(|(k, v)| display_header(k, v))
        .collect();

    let width = header_lines
        .iter()
        .map(|(line, _)| line.chars().count())
        .chain(std::iter::once(request_line.chars().count()))
        .max()
        .unwrap_or(0)
        .clamp(46, 96)
        + 4;

    let title = " Request ";
    let left = (width - title.len() - 2) / 2;
    let right = width - title.len() - 2 - left;

    let mut lines = Vec::with_capacity(header_lines.len() + 3);
    lines.push(format!("╭─{}{}{}─╮", "─".repeat(left), title, "─".repeat(right)));

    let pad = |plain_len: usize| " ".repeat(width.saturating_sub(plain_len + 2));
    lines.push(format!(
        "│ {} {}{} │",
        method.bright_green(),
        url,
        pad(request_line.chars().count())
    ));
    for (line, masked) in &header_lines {
        let shown = if *masked {
            line.dimmed().to_string()
        } else {
            line.clone()
        };
        lines.push(format!("│ {}{} │", shown, pad(line.chars().count())));
    }
    lines.push(format!("╰{}╯", "─".repeat(width)));
    lines
}

pub fn print_request_box(method: &str, url: &str, headers: &IndexMap<String, String>) {
    for line in render_request_box(method, url, headers) {
        println!("{}", line);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks_credentials() {
        let mut headers = IndexMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        headers.insert("Authorization".to_string(), "Bearer secret".to_string());

        let lines = render_request_box("GET", "https://example.com/posts", &headers);
        let joined = lines.join("\n");
        assert!(joined.contains("Accept: application/json"));
        assert!(!joined.contains("secret"));
        assert!(joined.contains("Authorization: ****"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn test_borders_line_up() {
        let headers = IndexMap::new();
        let lines = render_request_box("GET", "https://example.com/posts", &headers);
        let top = lines.first().unwrap().chars().count();
        let bottom = lines.last().unwrap().chars().count();
        assert_eq!(top, bottom);
    }
}
