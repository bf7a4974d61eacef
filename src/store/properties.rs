//! Reading and writing `key=value` properties files.
//!
//! Format:
//!
//! ```text
//! #
//! #Mon Feb 09 10:00:00 UTC 2015
//! free=3
//! king's=2
//! two\ words=1
//! ```
//!
//! Lines starting with `#` or `!` are comments. A key ends at the first
//! unescaped `=`, `:` or whitespace. A line ending in an odd number of
//! backslashes continues on the next line. `\t \n \r \f` and `\uXXXX`
//! escapes are decoded; any other escaped character stands for itself.

use std::collections::HashMap;

/// Parse properties text into entries, in file order.
pub fn parse(input: &str) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    let mut lines = input.lines();

    while let Some(line) = lines.next() {
        let mut logical = line.trim_start().to_string();
        if logical.is_empty() || logical.starts_with('#') || logical.starts_with('!') {
            continue;
        }
        while ends_with_continuation(&logical) {
            logical.pop();
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }
        entries.push(split_entry(&logical));
    }

    entries
}

/// Parse properties text into a map. Later duplicates win.
pub fn parse_map(input: &str) -> HashMap<String, String> {
    parse(input).into_iter().collect()
}

/// Render entries sorted by key, preceded by a timestamp comment header.
pub fn render<K, V, I>(entries: I) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
    I: IntoIterator<Item = (K, V)>,
{
    let mut lines: Vec<String> = entries
        .into_iter()
        .map(|(k, v)| format!("{}={}", escape(k.as_ref(), true), escape(v.as_ref(), false)))
        .collect();
    lines.sort_unstable();

    let mut out = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum::<usize>() + 48);
    out.push_str("#\n#");
    out.push_str(
        &chrono::Utc::now()
            .format("%a %b %d %H:%M:%S UTC %Y")
            .to_string(),
    );
    out.push('\n');
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (String, String) {
    let chars: Vec<char> = line.chars().collect();
    let mut key_end = chars.len();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            }
            _ => i += 1,
        }
    }

    let mut j = key_end;
    while j < chars.len() && is_blank(chars[j]) {
        j += 1;
    }
    if j < chars.len() && (chars[j] == '=' || chars[j] == ':') {
        j += 1;
        while j < chars.len() && is_blank(chars[j]) {
            j += 1;
        }
    }

    (unescape(&chars[..key_end]), unescape(&chars[j..]))
}

fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\x0c')
}

fn unescape(chars: &[char]) -> String {
    let mut out = String::with_capacity(chars.len());
    // \uXXXX escapes may encode surrogate pairs, so collect UTF-16 units first
    let mut units: Vec<u16> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            let next = chars[i + 1];
            if next == 'u' {
                let hex: String = chars[i + 2..(i + 6).min(chars.len())].iter().collect();
                if let (4, Ok(unit)) = (hex.len(), u16::from_str_radix(&hex, 16)) {
                    units.push(unit);
                    i += 6;
                    continue;
                }
            }
            flush_units(&mut units, &mut out);
            out.push(match next {
                't' => '\t',
                'n' => '\n',
                'r' => '\r',
                'f' => '\x0c',
                other => other,
            });
            i += 2;
            continue;
        }
        flush_units(&mut units, &mut out);
        if c != '\\' {
            out.push(c);
        }
        i += 1;
    }
    flush_units(&mut units, &mut out);
    out
}

fn flush_units(units: &mut Vec<u16>, out: &mut String) {
    if units.is_empty() {
        return;
    }
    out.extend(
        char::decode_utf16(units.drain(..)).map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
    );
}

fn escape(value: &str, is_key: bool) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for (i, c) in value.chars().enumerate() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x0c' => out.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            ' ' if is_key || i == 0 => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
    out
}
