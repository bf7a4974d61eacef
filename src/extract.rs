//! Turn a raw message file into the text that gets tokenized.
//!
//! Input may be a bare body, a full RFC 5322 message (optionally with an
//! mbox `From ` line) or HTML. Headers are never part of the result.

use mail_parser::MessageParser;

/// Extract the body text of a raw message.
///
/// Bytes that are not valid UTF-8 are decoded as Windows-1252. When nothing
/// readable is found the decoded input is returned unchanged.
pub fn extract_text(raw: &[u8]) -> String {
    let raw = skip_from_line(raw);
    let decoded = decode(raw);

    let body = if has_header_block(&decoded) {
        parsed_body(raw).unwrap_or_else(|| body_after_headers(&decoded).to_string())
    } else {
        decoded.clone()
    };

    let text = if looks_like_html(&body) {
        html_to_text(&body)
    } else {
        body
    };

    if text.trim().is_empty() {
        decoded
    } else {
        text
    }
}

fn decode(raw: &[u8]) -> String {
    match std::str::from_utf8(raw) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(raw);
            text.into_owned()
        }
    }
}

/// Drop a UTF-8 BOM and a leading mbox `From ` separator line.
fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// True if the first line is a `Name: value` header field.
fn has_header_block(text: &str) -> bool {
    let first = text.lines().next().unwrap_or("");
    match first.split_once(':') {
        Some((name, _)) => {
            !name.is_empty()
                && name
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        }
        None => false,
    }
}

fn parsed_body(raw: &[u8]) -> Option<String> {
    let message = MessageParser::default().parse(raw)?;
    message
        .body_text(0)
        .map(|text| text.into_owned())
        .or_else(|| message.body_html(0).map(|html| html_to_text(&html)))
        .filter(|text| !text.trim().is_empty())
}

fn body_after_headers(text: &str) -> &str {
    let crlf = text.find("\r\n\r\n").map(|p| p + 4);
    let lf = text.find("\n\n").map(|p| p + 2);
    match (crlf, lf) {
        (Some(a), Some(b)) => &text[a.min(b)..],
        (Some(p), None) | (None, Some(p)) => &text[p..],
        (None, None) => "",
    }
}

fn looks_like_html(text: &str) -> bool {
    let head: String = text.chars().take(4096).collect::<String>().to_lowercase();
    ["<html", "<body", "<div", "<p>", "<br", "<table", "</p>"]
        .iter()
        .any(|marker| head.contains(marker))
}

const BLOCK_TAGS: [&str; 14] = [
    "br", "p", "div", "tr", "li", "ul", "ol", "table", "h1", "h2", "h3", "h4", "h5", "h6",
];

/// Convert HTML to plain text: drop script and style content, turn block
/// elements into line breaks, strip the remaining tags, decode entities and
/// collapse blank lines.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tag = &rest[start..];
        let Some(end) = tag.find('>') else {
            rest = "";
            break;
        };
        let name = tag_name(&tag[1..end]);
        rest = &tag[end + 1..];

        if name == "script" || name == "style" {
            let close = format!("</{name}");
            rest = match rest.to_ascii_lowercase().find(&close) {
                Some(pos) => rest[pos..].find('>').map_or("", |gt| &rest[pos + gt + 1..]),
                None => "",
            };
        } else if BLOCK_TAGS.contains(&name.trim_start_matches('/')) {
            out.push('\n');
        }
    }
    out.push_str(rest);

    collapse_blank_lines(&decode_entities(&out))
}

fn tag_name(inner: &str) -> String {
    inner
        .trim()
        .split(|c: char| c.is_whitespace() || c == '>')
        .next()
        .unwrap_or("")
        .trim_end_matches('/')
        .to_ascii_lowercase()
}

fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let decoded = after
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| entity(&after[..semi]).map(|c| (c, semi)));
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &after[semi + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            match char::from_u32(code)? {
                '\u{a0}' => Some(' '),
                c => Some(c),
            }
        }
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(text.len());
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }
    cleaned.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_body_unchanged() {
        assert_eq!(extract_text(b"cheap pills now"), "cheap pills now");
    }

    #[test]
    fn test_headers_dropped() {
        let raw = b"From: a@example.com\r\nSubject: hello\r\n\r\nBuy cheap pills\r\n";
        let text = extract_text(raw);
        assert!(text.contains("Buy cheap pills"));
        assert!(!text.contains("Subject"));
    }

    #[test]
    fn test_mbox_from_line_skipped() {
        let raw = b"From sender@example.com Mon Jan  1 00:00:00 2024\nSubject: x\n\nbody text\n";
        let text = extract_text(raw);
        assert!(text.contains("body text"));
        assert!(!text.contains("sender@example.com"));
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "caf\xe9" is not valid UTF-8
        assert_eq!(extract_text(b"caf\xe9 cr\xe8me"), "café crème");
    }

    #[test]
    fn test_html_to_text_basic() {
        let text = html_to_text("<p>Hello</p><p>World</p>");
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_html_to_text_entities() {
        assert_eq!(html_to_text("A &amp; B &lt; C&#33; &#x41;"), "A & B < C! A");
        assert_eq!(html_to_text("fish &chips"), "fish &chips");
    }

    #[test]
    fn test_html_to_text_removes_scripts_and_styles() {
        let text = html_to_text(
            "<style>p { color: red }</style>Hello<SCRIPT type=\"x\">alert('x')</SCRIPT> World",
        );
        assert_eq!(text, "Hello World");
    }

    #[test]
    fn test_html_body_converted() {
        let raw = b"<html><body><div>Win a <b>prize</b></div></body></html>";
        assert_eq!(extract_text(raw), "Win a prize");
    }

    #[test]
    fn test_empty_result_falls_back_to_input() {
        assert_eq!(extract_text(b"<br>"), "<br>");
    }

    #[test]
    fn test_header_block_detection() {
        assert!(has_header_block("Subject: hi\n\nbody"));
        assert!(has_header_block("X-Spam-Flag: YES\n"));
        assert!(!has_header_block("Dear friend: hello"));
        assert!(!has_header_block("just text"));
    }
}
