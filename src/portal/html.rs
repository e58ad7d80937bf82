//! Minimal HTML scraping for the SSO login pages.
//!
//! The login form and its result page are small and server-rendered, so a
//! couple of anchored regexes are enough; no DOM is built.

use std::sync::LazyLock;

use regex::Regex;

static INPUT_TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?is)<input\b[^>]*>"));
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
});
static MSG_ELEMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(r#"(?is)<[a-z][a-z0-9]*\b[^>]*\sid\s*=\s*["']msg["'][^>]*>(.*?)</"#)
});
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"(?s)<[^>]*>"));

/// Compiles a regex literal known to be valid.
///
/// # Panics
///
/// Panics if `pattern` is not a valid regex; only called with static patterns.
pub(crate) fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Returns the value of the first `<input name="{name}">` in `html`.
pub(crate) fn input_value(html: &str, name: &str) -> Option<String> {
    INPUT_TAG_RE.find_iter(html).find_map(|tag| {
        let mut field_name: Option<String> = None;
        let mut value: Option<String> = None;

        for attr in ATTR_RE.captures_iter(tag.as_str()) {
            let key = attr.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let attr_value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .map_or("", |m| m.as_str());
            match key.as_str() {
                "name" => field_name = Some(attr_value.to_string()),
                "value" => value = Some(html_unescape_basic(attr_value)),
                _ => {}
            }
        }

        if field_name.as_deref() == Some(name) {
            value
        } else {
            None
        }
    })
}

/// Returns the trimmed text of the element with `id="msg"`, if present.
pub(crate) fn message_text(html: &str) -> Option<String> {
    MSG_ELEMENT_RE.captures(html).map(|captures| {
        let inner = captures.get(1).map_or("", |m| m.as_str());
        html_unescape_basic(TAG_RE.replace_all(inner, "").trim())
    })
}

fn html_unescape_basic(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", "\u{00a0}")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOGIN_FORM: &str = r#"
        <form id="fm1" action="/cas/login" method="post">
          <input id="username" name="username" type="text" value="" />
          <input type="hidden" name="lt" value="LT-1234-abcDEF" />
          <input type="hidden" name="execution" value="e1s1" />
        </form>"#;

    #[test]
    fn test_input_value_finds_hidden_ticket() {
        assert_eq!(
            input_value(LOGIN_FORM, "lt").as_deref(),
            Some("LT-1234-abcDEF")
        );
        assert_eq!(input_value(LOGIN_FORM, "execution").as_deref(), Some("e1s1"));
    }

    #[test]
    fn test_input_value_attribute_order_and_quotes() {
        let html = "<INPUT value='LT-9&amp;x' type='hidden' name='lt'>";
        assert_eq!(input_value(html, "lt").as_deref(), Some("LT-9&x"));
    }

    #[test]
    fn test_input_value_missing() {
        assert_eq!(input_value("<html><body>maintenance</body></html>", "lt"), None);
    }

    #[test]
    fn test_message_text_strips_markup() {
        let html = r#"<div id="msg" class="errors"><span>Bad credentials</span></div>"#;
        assert_eq!(message_text(html).as_deref(), Some("Bad credentials"));
    }

    #[test]
    fn test_message_text_absent() {
        assert_eq!(message_text(LOGIN_FORM), None);
        assert_eq!(message_text(r#"<div id="message">x</div>"#), None);
    }

    #[test]
    fn test_message_text_ignores_prefixed_id_attributes() {
        let html = r#"<div data-id="msg" class="banner">Scheduled maintenance</div>"#;
        assert_eq!(message_text(html), None);

        let html = r#"<p class="x"
            id='msg'>Bad credentials</p>"#;
        assert_eq!(message_text(html).as_deref(), Some("Bad credentials"));
    }
}
