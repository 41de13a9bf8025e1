/// Pulls the HTML document out of a model reply.
///
/// A ```` ```html ```` block wins; otherwise the first generic fenced block;
/// otherwise the whole reply, trimmed.
pub fn extract_html(reply: &str) -> String {
    if let Some(body) = fenced_block(reply, "```html") {
        return body;
    }
    if let Some(body) = fenced_block(reply, "```") {
        return body;
    }
    reply.trim().to_string()
}

fn fenced_block(reply: &str, opener: &str) -> Option<String> {
    let start = reply.find(opener)? + opener.len();
    let rest = &reply[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}
