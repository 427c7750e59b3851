//! The `[paywall_payment]` marker grammar.
//!
//! ```text
//! open   := "[" TAG (WS attrs)? ("/")? "]"
//! close  := "[/" TAG "]"
//! attrs  := attr (WS attr)*
//! attr   := NAME "=" value | value
//! value  := '"' [^"]* '"' | "'" [^']* "'" | [^\s]+
//! ```
//!
//! Extraction is lexical: the tokenizer finds a start token, then the first
//! `]` that is not inside a quoted attribute value. Nothing else about the
//! surrounding content is parsed.

/// Tag name of the paywall marker.
pub const MARKER_TAG: &str = "paywall_payment";

const OPEN_PREFIX: &str = "[paywall_payment";
const CLOSE_TOKEN: &str = "[/paywall_payment]";

/// A lexical token of content that may contain paywall markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    /// Free text between markers.
    Text(&'a str),
    /// A complete start (or self-closing) marker.
    Open(OpenTag<'a>),
    /// An end marker, `[/paywall_payment]`.
    Close(&'a str),
    /// A start token without a closing bracket. Spans to the end of the content.
    Unterminated(&'a str),
}

/// A complete `[paywall_payment ...]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTag<'a> {
    raw: &'a str,
    attribute_source: &'a str,
    self_closing: bool,
}

impl<'a> OpenTag<'a> {
    /// The token exactly as it appeared in the content.
    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Everything between the tag name and the closing bracket, minus a
    /// trailing self-closing `/`. Leading whitespace is kept.
    pub fn attribute_source(&self) -> &'a str {
        self.attribute_source
    }

    pub fn is_self_closing(&self) -> bool {
        self.self_closing
    }

    pub fn attributes(&self) -> Vec<Attribute<'a>> {
        parse_attributes(self.attribute_source)
    }

    /// Value of the first attribute named `name`, compared case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.attributes()
            .into_iter()
            .find(|a| a.name.is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|a| a.value)
    }

    /// Rebuild the start token from its parts.
    pub fn reconstruct(&self) -> String {
        let slash = if self.self_closing { "/" } else { "" };
        format!("{OPEN_PREFIX}{}{slash}]", self.attribute_source)
    }
}

/// One attribute of an open tag. Positional attributes have no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub name: Option<&'a str>,
    pub value: &'a str,
}

/// Iterator over the [`Token`]s of a piece of content.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    src: &'a str,
    pos: usize,
}

pub fn tokenize(content: &str) -> Tokenizer<'_> {
    Tokenizer {
        src: content,
        pos: 0,
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.src.get(self.pos..).filter(|r| !r.is_empty())?;

        let next_token = rest
            .match_indices('[')
            .find_map(|(i, _)| match_token(&rest[i..]).map(|found| (i, found)));

        match next_token {
            Some((0, (token, len))) => {
                self.pos += len;
                Some(token)
            }
            Some((i, _)) => {
                self.pos += i;
                Some(Token::Text(&rest[..i]))
            }
            None => {
                self.pos = self.src.len();
                Some(Token::Text(rest))
            }
        }
    }
}

/// Try to read a marker token at the very start of `s`.
fn match_token(s: &str) -> Option<(Token<'_>, usize)> {
    if s.starts_with(CLOSE_TOKEN) {
        return Some((Token::Close(&s[..CLOSE_TOKEN.len()]), CLOSE_TOKEN.len()));
    }

    let after = s.strip_prefix(OPEN_PREFIX)?;
    match after.chars().next() {
        None => return Some((Token::Unterminated(s), s.len())),
        Some(c) if c == ']' || c == '/' || c.is_whitespace() => {}
        // `[paywall_payments]` and friends are a different tag.
        Some(_) => return None,
    }

    let Some(end) = find_closing_bracket(after) else {
        return Some((Token::Unterminated(s), s.len()));
    };

    let inner = &after[..end];
    let len = OPEN_PREFIX.len() + end + 1;
    let (attribute_source, self_closing) = match inner.trim_end().strip_suffix('/') {
        Some(attrs) => (attrs, true),
        None => (inner, false),
    };

    Some((
        Token::Open(OpenTag {
            raw: &s[..len],
            attribute_source,
            self_closing,
        }),
        len,
    ))
}

/// Byte offset of the first `]` outside a quoted attribute value.
///
/// A quote only opens a value when it follows `=`, whitespace or the tag name,
/// so apostrophes inside bare words do not swallow the rest of the content.
fn find_closing_bracket(s: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut prev: Option<char> = None;

    for (i, c) in s.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == ']' => return Some(i),
            None if (c == '"' || c == '\'')
                && prev.is_none_or(|p| p == '=' || p.is_whitespace()) =>
            {
                quote = Some(c)
            }
            None => {}
        }
        prev = Some(c);
    }
    None
}

fn parse_attributes(src: &str) -> Vec<Attribute<'_>> {
    let mut attributes = Vec::new();
    let mut rest = src;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let name_len = rest
            .find(|c: char| c == '=' || c.is_whitespace())
            .unwrap_or(rest.len());
        let has_name = name_len > 0
            && rest[name_len..].starts_with('=')
            && !rest.starts_with(['"', '\'']);

        let (name, value_src) = if has_name {
            (Some(&rest[..name_len]), &rest[name_len + 1..])
        } else {
            (None, rest)
        };

        let (value, consumed) = read_value(value_src);
        attributes.push(Attribute { name, value });
        rest = &value_src[consumed..];
    }

    attributes
}

fn read_value(s: &str) -> (&str, usize) {
    match s.chars().next() {
        Some(q @ ('"' | '\'')) => match s[1..].find(q) {
            Some(end) => (&s[1..1 + end], end + 2),
            None => (&s[1..], s.len()),
        },
        _ => {
            let end = s.find(char::is_whitespace).unwrap_or(s.len());
            (&s[..end], end)
        }
    }
}

/// Whether the content contains a paywall start token, complete or not.
pub fn contains_marker(content: &str) -> bool {
    tokenize(content).any(|t| matches!(t, Token::Open(_) | Token::Unterminated(_)))
}

/// The first complete start token in the content.
pub fn first_marker(content: &str) -> Option<OpenTag<'_>> {
    tokenize(content).find_map(|t| match t {
        Token::Open(tag) => Some(tag),
        _ => None,
    })
}

/// Locked rendering: the text before the first marker followed by that marker
/// rebuilt with its original attributes. Nothing after the marker survives.
///
/// When the first start token is unterminated only the preceding text is
/// returned.
pub fn truncate_at_marker(content: &str) -> String {
    let mut out = String::new();
    for token in tokenize(content) {
        match token {
            Token::Text(text) | Token::Close(text) => out.push_str(text),
            Token::Open(tag) => {
                out.push_str(&tag.reconstruct());
                return out;
            }
            Token::Unterminated(_) => return out,
        }
    }
    out
}

/// Granted rendering: every start and end token removed, all text kept.
///
/// Removal repeats until no complete token is left, so the result never
/// contains a marker that a second pass would strip.
pub fn strip_markers(content: &str) -> String {
    let (mut current, mut removed) = strip_once(content);
    while removed {
        (current, removed) = strip_once(&current);
    }
    current
}

fn strip_once(content: &str) -> (String, bool) {
    let mut removed = false;
    let mut out = String::with_capacity(content.len());
    for token in tokenize(content) {
        match token {
            Token::Text(text) | Token::Unterminated(text) => out.push_str(text),
            Token::Open(_) | Token::Close(_) => removed = true,
        }
    }
    (out, removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "intro [paywall_payment price=5]secret text[/paywall_payment]";

    #[test]
    fn test_tokenize_scenario() {
        let tokens: Vec<_> = tokenize(SCENARIO).collect();
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0], Token::Text("intro "));
        match &tokens[1] {
            Token::Open(tag) => {
                assert_eq!(tag.raw(), "[paywall_payment price=5]");
                assert_eq!(tag.attribute_source(), " price=5");
                assert!(!tag.is_self_closing());
            }
            other => panic!("expected open tag, got {other:?}"),
        }
        assert_eq!(tokens[2], Token::Text("secret text"));
        assert_eq!(tokens[3], Token::Close("[/paywall_payment]"));
    }

    #[test]
    fn test_truncate_scenario() {
        assert_eq!(truncate_at_marker(SCENARIO), "intro [paywall_payment price=5]");
    }

    #[test]
    fn test_strip_scenario() {
        assert_eq!(strip_markers(SCENARIO), "intro secret text");
    }

    #[test]
    fn test_content_without_marker() {
        let content = "just [a shortcode] and text";
        assert!(!contains_marker(content));
        assert_eq!(strip_markers(content), content);
        assert_eq!(truncate_at_marker(content), content);
        assert_eq!(tokenize("").count(), 0);
    }

    #[test]
    fn test_tag_name_must_end_at_boundary() {
        let content = "a [paywall_payments price=1] b";
        assert!(!contains_marker(content));
        assert_eq!(tokenize(content).count(), 1);
    }

    #[test]
    fn test_self_closing_marker_is_preserved() {
        let content = "free [paywall_payment price=\"10\" currency=SATS /] paid";
        let tag = first_marker(content).unwrap();
        assert!(tag.is_self_closing());
        assert_eq!(tag.reconstruct(), "[paywall_payment price=\"10\" currency=SATS /]");
        assert_eq!(
            truncate_at_marker(content),
            "free [paywall_payment price=\"10\" currency=SATS /]"
        );

        let bare = "x[paywall_payment/]y";
        assert_eq!(truncate_at_marker(bare), "x[paywall_payment/]");
        assert_eq!(strip_markers(bare), "xy");
    }

    #[test]
    fn test_attributes_are_parsed() {
        let tag = first_marker(
            "[paywall_payment Price=\"2.5\" currency='EUR' duration=24 button_text=\"Pay now\" legacy]",
        )
        .unwrap();

        assert_eq!(tag.attribute("price"), Some("2.5"));
        assert_eq!(tag.attribute("CURRENCY"), Some("EUR"));
        assert_eq!(tag.attribute("duration"), Some("24"));
        assert_eq!(tag.attribute("button_text"), Some("Pay now"));
        assert_eq!(tag.attribute("missing"), None);

        let attributes = tag.attributes();
        assert_eq!(attributes.len(), 5);
        assert_eq!(
            attributes[4],
            Attribute {
                name: None,
                value: "legacy"
            }
        );
    }

    #[test]
    fn test_bracket_inside_quoted_value() {
        let content = "a [paywall_payment title=\"see [1]\" price=3]hidden";
        let tag = first_marker(content).unwrap();
        assert_eq!(tag.attribute("title"), Some("see [1]"));
        assert_eq!(tag.attribute("price"), Some("3"));
        assert_eq!(
            truncate_at_marker(content),
            "a [paywall_payment title=\"see [1]\" price=3]"
        );
    }

    #[test]
    fn test_apostrophe_in_bare_word_does_not_open_quote() {
        let tag = first_marker("[paywall_payment label=don't price=1]rest").unwrap();
        assert_eq!(tag.attribute("label"), Some("don't"));
        assert_eq!(tag.attribute("price"), Some("1"));
    }

    #[test]
    fn test_unterminated_marker_fails_closed() {
        let content = "visible [paywall_payment price=5 secret text";
        assert!(contains_marker(content));
        assert!(first_marker(content).is_none());
        assert_eq!(truncate_at_marker(content), "visible ");
        assert_eq!(strip_markers(content), content);

        let unterminated_quote = "visible [paywall_payment title=\"oops] secret";
        assert_eq!(truncate_at_marker(unterminated_quote), "visible ");

        assert_eq!(truncate_at_marker("end [paywall_payment"), "end ");
    }

    #[test]
    fn test_nested_markers() {
        let content = "a [paywall_payment price=1]b [paywall_payment price=2]c[/paywall_payment]d[/paywall_payment]e";
        assert_eq!(truncate_at_marker(content), "a [paywall_payment price=1]");
        assert_eq!(strip_markers(content), "a b cde");
    }

    #[test]
    fn test_stray_close_before_marker_is_kept_as_text() {
        let content = "x[/paywall_payment]y[paywall_payment]z";
        assert_eq!(truncate_at_marker(content), "x[/paywall_payment]y[paywall_payment]");
        assert!(!contains_marker("only [/paywall_payment] here"));
    }

    #[test]
    fn test_strip_reaches_fixpoint() {
        let content = "[paywall_[paywall_payment]payment]inner[/paywall_[/paywall_payment]payment]";
        let stripped = strip_markers(content);
        assert_eq!(stripped, "inner");
        assert_eq!(strip_markers(&stripped), stripped);
    }

    #[test]
    fn test_render_is_idempotent() {
        let granted = strip_markers(SCENARIO);
        assert_eq!(strip_markers(&granted), granted);

        let locked = truncate_at_marker(SCENARIO);
        assert_eq!(truncate_at_marker(&locked), locked);
    }

    #[test]
    fn test_multibyte_text_around_markers() {
        let content = "héllo ✓ [paywall_payment prix=\"5€\"]gëheim[/paywall_payment] ünd";
        assert_eq!(truncate_at_marker(content), "héllo ✓ [paywall_payment prix=\"5€\"]");
        assert_eq!(strip_markers(content), "héllo ✓ gëheim ünd");
    }
}
