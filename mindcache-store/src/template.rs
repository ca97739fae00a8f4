/// Single-pass `{{name}}` (and, in legacy mode, `{name}`) placeholder
/// expansion. Expanded values are not themselves re-scanned for further
/// placeholders, matching `TEMPLATE_MAX_DEPTH`.
pub fn expand(text: &str, legacy: bool, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if legacy && bytes[i] == b'{' && (i + 1 >= bytes.len() || bytes[i + 1] != b'{') {
            if let Some(end) = find_close(text, i + 1, '}') {
                let name = &text[i + 1..end];
                match lookup(name) {
                    Some(value) => {
                        out.push_str(&value);
                        i = end + 1;
                        continue;
                    }
                    None => {
                        i = end + 1;
                        continue;
                    }
                }
            }
        }
        if bytes[i] == b'{' && i + 1 < bytes.len() && bytes[i + 1] == b'{' {
            if let Some(end) = text[i + 2..].find("}}") {
                let close = i + 2 + end;
                let name = text[i + 2..close].trim();
                match lookup(name) {
                    Some(value) => {
                        out.push_str(&value);
                        i = close + 2;
                        continue;
                    }
                    None => {
                        i = close + 2;
                        continue;
                    }
                }
            }
        }
        let ch_len = text[i..].chars().next().map(|c| c.len_utf8()).unwrap_or(1);
        out.push_str(&text[i..i + ch_len]);
        i += ch_len;
    }
    out
}

fn find_close(text: &str, from: usize, ch: char) -> Option<usize> {
    text[from..].find(ch).map(|p| from + p)
}
