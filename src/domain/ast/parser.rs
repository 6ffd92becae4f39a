//! Markup to tag tree
//!
//! The parser scans text for `@name[attributes]{content}` tags and descends
//! into their content. It also accepts trees that were already (partly)
//! parsed: resolved tags pass through untouched and only pending markup is
//! parsed, so running the parser over its own output changes nothing.

use super::factory::{StandardTagFactory, TagFactory};
use super::node::{Node, Tag, TagContent, ROOT_TAG};
use super::syntax::{TagMatch, TagSyntax};
use super::validate::{LineValidator, NoValidation, ParseValidator};
use crate::domain::project::DocumentContext;
use crate::error::{FolioError, Result};
use crate::infrastructure::Settings;
use std::sync::Arc;

/// Builds tag trees. Holds no per-document state, so one parser can serve
/// many documents on many threads.
#[derive(Clone)]
pub struct Parser {
    syntax: TagSyntax,
    max_depth: usize,
    line_offset: usize,
    factory: Arc<dyn TagFactory>,
}

impl Parser {
    pub fn new(settings: &Settings, factory: Arc<dyn TagFactory>) -> Result<Self> {
        settings.validate()?;
        Ok(Parser {
            syntax: TagSyntax::new(settings.tag_prefix)?,
            max_depth: settings.tag_max_depth,
            line_offset: settings.line_offset,
            factory,
        })
    }

    /// Parser with a [`StandardTagFactory`] for the configured verbatim tags
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let factory = StandardTagFactory::new(settings.verbatim_tags.iter().cloned());
        Self::new(settings, Arc::new(factory))
    }

    pub fn syntax(&self) -> &TagSyntax {
        &self.syntax
    }

    /// Parse a markup string into a root tag
    pub fn parse(&self, text: &str, context: &DocumentContext) -> Result<Tag> {
        self.parse_nodes(vec![Node::text(text)], context)
    }

    /// Parse a sequence of strings and tags into a root tag
    pub fn parse_nodes(&self, nodes: Vec<Node>, context: &DocumentContext) -> Result<Tag> {
        let mut validator = LineValidator::new(self.syntax.clone(), self.line_offset);
        self.parse_with(nodes, context, &mut validator)
    }

    /// Parse the children of an existing root tag again
    pub fn reparse(&self, root: Tag, context: &DocumentContext) -> Result<Tag> {
        let nodes = match root.content {
            TagContent::Nodes(children) => children,
            TagContent::Markup(markup) => vec![Node::Text(markup)],
        };
        self.parse_nodes(nodes, context)
    }

    /// Parse with a caller-supplied validation hook
    pub fn parse_with(
        &self,
        nodes: Vec<Node>,
        context: &DocumentContext,
        validator: &mut dyn ParseValidator,
    ) -> Result<Tag> {
        let children = self.parse_level(nodes, context, 1, validator)?;
        tracing::debug!(
            doc_id = %context.doc_id,
            children = children.len(),
            "parsed tag tree"
        );
        Ok(Tag::with_children(ROOT_TAG, children))
    }

    fn check_depth(&self, level: usize) -> Result<()> {
        if level >= self.max_depth {
            return Err(FolioError::DepthExceeded {
                max_depth: self.max_depth,
            });
        }
        Ok(())
    }

    fn parse_level(
        &self,
        nodes: Vec<Node>,
        context: &DocumentContext,
        level: usize,
        validator: &mut dyn ParseValidator,
    ) -> Result<Vec<Node>> {
        self.check_depth(level)?;

        let mut parsed = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Text(text) => {
                    parsed.extend(self.parse_text(&text, context, level, validator)?)
                }
                Node::Tag(tag) => {
                    parsed.push(Node::Tag(self.resolve_tag(tag, context, level, validator)?))
                }
            }
        }
        Ok(parsed)
    }

    /// Parse whatever markup is still pending inside an existing tag
    fn resolve_tag(
        &self,
        mut tag: Tag,
        context: &DocumentContext,
        level: usize,
        validator: &mut dyn ParseValidator,
    ) -> Result<Tag> {
        if tag.is_resolved() {
            return Ok(tag);
        }

        tag.content = match tag.content {
            TagContent::Markup(markup) if self.factory.is_verbatim(&tag.name) => {
                TagContent::Nodes(literal(&markup).into_iter().collect())
            }
            TagContent::Markup(markup) => {
                TagContent::Nodes(self.parse_text(&markup, context, level + 1, validator)?)
            }
            TagContent::Nodes(children) => {
                TagContent::Nodes(self.parse_level(children, context, level + 1, validator)?)
            }
        };
        Ok(tag)
    }

    fn parse_text(
        &self,
        text: &str,
        context: &DocumentContext,
        level: usize,
        validator: &mut dyn ParseValidator,
    ) -> Result<Vec<Node>> {
        self.check_depth(level)?;

        let mut nodes = Vec::new();
        let mut position = 0;

        while let Some(m) = self.syntax.find_tag(text, position) {
            let span = &text[position..m.start];
            validator.validate(span, Some(&m))?;
            nodes.extend(literal(span));
            nodes.push(Node::Tag(self.build_tag(&m, context, level)?));
            position = m.end;
        }

        let remainder = &text[position..];
        validator.validate(remainder, None)?;
        nodes.extend(literal(remainder));

        Ok(nodes)
    }

    fn build_tag(&self, m: &TagMatch<'_>, context: &DocumentContext, level: usize) -> Result<Tag> {
        let content = if self.factory.is_verbatim(m.name) {
            TagContent::Nodes(literal(m.content).into_iter().collect())
        } else {
            // The content was part of the validated match text already
            TagContent::Nodes(self.parse_text(m.content, context, level + 1, &mut NoValidation)?)
        };

        let mut tag = self.factory.tag(m.name, content, m.attributes, context)?;
        tag.offset = m.start;
        tracing::trace!(name = m.name, level, offset = m.start, "built tag");
        Ok(tag)
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("prefix", &self.syntax.prefix())
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

/// A literal span as a node; empty spans produce nothing
fn literal(span: &str) -> Option<Node> {
    (!span.is_empty()).then(|| Node::text(span))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> Parser {
        Parser::from_settings(&Settings::default()).unwrap()
    }

    fn context() -> DocumentContext {
        DocumentContext::standalone("main")
    }

    #[test]
    fn test_parse_simple_tag() {
        let root = parser().parse("a @b{c} d", &context()).unwrap();
        assert_eq!(root.name, ROOT_TAG);
        assert_eq!(
            root.children(),
            &[
                Node::text("a "),
                Node::Tag(Tag::with_children("b", vec![Node::text("c")])),
                Node::text(" d"),
            ]
        );
        assert_eq!(root.children()[1].as_tag().unwrap().offset, 2);
    }

    #[test]
    fn test_parse_nested_tags() {
        let root = parser().parse("@b{x @i{y} z}", &context()).unwrap();
        let b = root.children()[0].as_tag().unwrap();
        assert_eq!(b.children().len(), 3);
        assert_eq!(b.children()[1].as_tag().unwrap().name, "i");
        assert_eq!(b.default_fmt(), "x y z");
    }

    #[test]
    fn test_empty_content_and_attributes() {
        let root = parser().parse("@br[]{}", &context()).unwrap();
        let br = root.children()[0].as_tag().unwrap();
        assert_eq!(br.attributes.as_deref(), Some(""));
        assert!(br.children().is_empty());
        assert_eq!(root.children()[0].to_markup('@'), "@br[]{}");
    }

    #[test]
    fn test_verbatim_content_not_parsed() {
        let root = parser().parse("@verb{@b{x}}", &context()).unwrap();
        let verb = root.children()[0].as_tag().unwrap();
        assert_eq!(verb.children(), &[Node::text("@b{x}")]);
    }

    #[test]
    fn test_depth_limit() {
        let settings = Settings {
            tag_max_depth: 3,
            ..Settings::default()
        };
        let parser = Parser::from_settings(&settings).unwrap();
        assert!(parser.parse("@a{x}", &context()).is_ok());
        assert!(matches!(
            parser.parse("@a{@b{x}}", &context()),
            Err(FolioError::DepthExceeded { max_depth: 3 })
        ));
    }

    #[test]
    fn test_pending_tag_content_is_parsed() {
        let nodes = vec![Node::text("see "), Tag::pending("b", "x @i{y}").into()];
        let root = parser().parse_nodes(nodes, &context()).unwrap();
        let b = root.children()[1].as_tag().unwrap();
        assert_eq!(b.children()[1].as_tag().unwrap().name, "i");
    }

    #[test]
    fn test_resolved_tag_passes_through() {
        // Text inside a resolved tag is not rescanned
        let resolved = Tag::with_children("code", vec![Node::text("@b{x}")]);
        let root = parser()
            .parse_nodes(vec![resolved.clone().into()], &context())
            .unwrap();
        assert_eq!(root.children(), &[Node::Tag(resolved)]);
    }

    #[test]
    fn test_reparse_is_idempotent() {
        let parser = parser();
        let source = "intro @chapter[id=ch:1]{One} text @b{@i{deep}} end";
        let first = parser.parse(source, &context()).unwrap();
        let second = parser.reparse(first.clone(), &context()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.default_fmt(), second.default_fmt());
    }

    #[test]
    fn test_syntax_error_carries_line() {
        let result = parser().parse("line one\nline two @b{never closed\n", &context());
        match result {
            Err(FolioError::Syntax { line, message }) => {
                assert_eq!(line, 2);
                assert!(message.contains("'b'"));
            }
            other => panic!("Expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_validator_sees_every_character() {
        struct Collect(String);
        impl ParseValidator for Collect {
            fn validate(&mut self, span: &str, tag: Option<&TagMatch<'_>>) -> Result<()> {
                self.0.push_str(span);
                if let Some(tag) = tag {
                    self.0.push_str(tag.text);
                }
                Ok(())
            }
        }

        let source = "a @b{c @d{e}} f\n@g[x]{h}";
        let mut collect = Collect(String::new());
        parser()
            .parse_with(vec![Node::text(source)], &context(), &mut collect)
            .unwrap();
        assert_eq!(collect.0, source);
    }

    #[test]
    fn test_custom_prefix() {
        let settings = Settings {
            tag_prefix: '%',
            ..Settings::default()
        };
        let parser = Parser::from_settings(&settings).unwrap();
        let root = parser.parse("a @b{c} %i{d}", &context()).unwrap();
        assert_eq!(root.children()[0], Node::text("a @b{c} "));
        assert_eq!(root.children()[1].as_tag().unwrap().name, "i");
    }
}
