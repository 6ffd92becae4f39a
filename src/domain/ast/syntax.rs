//! Lexical tag syntax: `@name[attributes]{content}`

use crate::error::{FolioError, Result};
use regex::Regex;

const NAME: &str = "(?P<name>[A-Za-z][A-Za-z0-9_]*)";

/// Compiled patterns for one tag prefix character
#[derive(Debug, Clone)]
pub struct TagSyntax {
    prefix: char,
    open_tag: Regex,
    open_attributes: Regex,
}

/// A complete tag found in a string, braces balanced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagMatch<'a> {
    pub name: &'a str,
    pub attributes: Option<&'a str>,
    pub content: &'a str,
    /// The whole tag, prefix to closing brace
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

impl TagMatch<'_> {
    /// Byte offset of the content within `text`
    pub fn content_offset(&self) -> usize {
        self.text.len() - self.content.len() - 1
    }
}

impl TagSyntax {
    pub fn new(prefix: char) -> Result<Self> {
        let p = regex::escape(&prefix.to_string());
        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| {
                FolioError::Config(format!("Invalid tag syntax for '{}': {}", prefix, e))
            })
        };

        Ok(TagSyntax {
            prefix,
            open_tag: compile(format!(r"{}{}(?:\[(?P<attributes>[^\]]*)\])?\{{", p, NAME))?,
            open_attributes: compile(format!(r"{}{}\[[^\]]*\z", p, NAME))?,
        })
    }

    pub fn prefix(&self) -> char {
        self.prefix
    }

    /// Find the next tag starting at or after `from`.
    ///
    /// The content region ends at the brace balancing the opening one, so
    /// nested tags and plain `{...}` pairs stay inside it. Returns `None` when
    /// no tag opens after `from` or the next one never closes.
    pub fn find_tag<'a>(&self, text: &'a str, from: usize) -> Option<TagMatch<'a>> {
        let caps = self.open_tag.captures_at(text, from)?;
        let open = caps.get(0)?;
        let body_start = open.end();

        let mut depth = 1usize;
        for (i, c) in text[body_start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let close = body_start + i;
                        return Some(TagMatch {
                            name: caps.name("name")?.as_str(),
                            attributes: caps.name("attributes").map(|m| m.as_str()),
                            content: &text[body_start..close],
                            text: &text[open.start()..=close],
                            start: open.start(),
                            end: close + 1,
                        });
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Position and name of a tag opening with no matching close in `text`
    pub fn find_unclosed_tag<'a>(&self, text: &'a str) -> Option<(usize, &'a str)> {
        let caps = self.open_tag.captures(text)?;
        Some((caps.get(0)?.start(), caps.name("name")?.as_str()))
    }

    /// Position and name of an attribute bracket left open at the end of `text`
    pub fn find_unclosed_attributes<'a>(&self, text: &'a str) -> Option<(usize, &'a str)> {
        let caps = self.open_attributes.captures(text)?;
        Some((caps.get(0)?.start(), caps.name("name")?.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_simple_tag() {
        let syntax = TagSyntax::new('@').unwrap();
        let m = syntax.find_tag("a @b{c} d", 0).unwrap();
        assert_eq!(m.name, "b");
        assert_eq!(m.attributes, None);
        assert_eq!(m.content, "c");
        assert_eq!(m.text, "@b{c}");
        assert_eq!((m.start, m.end), (2, 7));
        assert_eq!(m.content_offset(), 3);
    }

    #[test]
    fn test_nested_braces_balanced() {
        let syntax = TagSyntax::new('@').unwrap();
        let text = "@b[id=x]{one @i{two} {three}} tail";
        let m = syntax.find_tag(text, 0).unwrap();
        assert_eq!(m.attributes, Some("id=x"));
        assert_eq!(m.content, "one @i{two} {three}");
        assert_eq!(&text[m.end..], " tail");
    }

    #[test]
    fn test_unclosed_tag_not_matched() {
        let syntax = TagSyntax::new('@').unwrap();
        assert!(syntax.find_tag("a @b{c d", 0).is_none());
        assert_eq!(syntax.find_unclosed_tag("a @b{c d"), Some((2, "b")));
    }

    #[test]
    fn test_text_without_braces_is_not_a_tag() {
        let syntax = TagSyntax::new('@').unwrap();
        assert!(syntax.find_tag("mail me@example.com", 0).is_none());
        assert!(syntax.find_tag("@1{x}", 0).is_none());
    }

    #[test]
    fn test_unclosed_attributes() {
        let syntax = TagSyntax::new('@').unwrap();
        assert_eq!(
            syntax.find_unclosed_attributes("see @fig[id=a"),
            Some((4, "fig"))
        );
        assert!(syntax.find_unclosed_attributes("@fig[id=a] x").is_none());
    }

    #[test]
    fn test_custom_prefix_is_escaped() {
        let syntax = TagSyntax::new('$').unwrap();
        let m = syntax.find_tag("cost $b{5}", 0).unwrap();
        assert_eq!(m.name, "b");
        assert!(syntax.find_tag("cost @b{5}", 0).is_none());
    }

    #[test]
    fn test_find_from_offset() {
        let syntax = TagSyntax::new('@').unwrap();
        let m = syntax.find_tag("@a{1} @b{2}", 5).unwrap();
        assert_eq!(m.name, "b");
        assert_eq!(m.start, 6);
    }
}
