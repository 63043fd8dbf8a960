//! HTML escaping and block markup

/// Append `input` to `out`, escaping `&`, `<`, `>`, `"` and `'`.
pub fn push_escaped(out: &mut String, input: &str) {
    let mut start = 0;

    for (i, c) in input.char_indices() {
        let entity = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&#39;",
            _ => continue,
        };
        out.push_str(&input[start..i]);
        out.push_str(entity);
        start = i + c.len_utf8();
    }
    out.push_str(&input[start..]);
}

/// Escape text for use in HTML content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    push_escaped(&mut out, input);
    out
}

/// Wrap inline markup in the outer code block. `content` must already be
/// escaped; the attribute values are escaped here.
///
/// ```text
/// <pre class="treelight {theme_class}" style="background-color: {bg}; color: {fg}"><code>…</code></pre>
/// ```
pub fn code_block(content: &str, theme_class: &str, background: &str, foreground: &str) -> String {
    let mut out = String::with_capacity(content.len() + 96);
    out.push_str(r#"<pre class="treelight "#);
    push_escaped(&mut out, theme_class);
    out.push_str(r#"" style="background-color: "#);
    push_escaped(&mut out, background);
    out.push_str("; color: ");
    push_escaped(&mut out, foreground);
    out.push_str(r#""><code>"#);
    out.push_str(content);
    out.push_str("</code></pre>");
    out
}
