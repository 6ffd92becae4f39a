//! Validation of markup as it is parsed

use super::syntax::{TagMatch, TagSyntax};
use crate::error::{FolioError, Result};

/// Hook run by the parser over the input, in order.
///
/// For every input string the parser calls `validate` once before each
/// literal span it emits, with the tag that follows the span, and once at the
/// end of the string with `None`. Taken together the spans and tag texts cover
/// each input character exactly once.
pub trait ParseValidator {
    fn validate(&mut self, span: &str, tag: Option<&TagMatch<'_>>) -> Result<()>;
}

/// Accepts everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValidation;

impl ParseValidator for NoValidation {
    fn validate(&mut self, _span: &str, _tag: Option<&TagMatch<'_>>) -> Result<()> {
        Ok(())
    }
}

/// Reports unclosed tags, unclosed attribute brackets and unbalanced plain
/// braces with the 1-based line they occur on
#[derive(Debug, Clone)]
pub struct LineValidator {
    syntax: TagSyntax,
    line: usize,
    /// Lines of plain `{` still waiting for their `}`
    open_braces: Vec<usize>,
}

impl LineValidator {
    pub fn new(syntax: TagSyntax, line_offset: usize) -> Self {
        LineValidator {
            syntax,
            line: line_offset,
            open_braces: Vec::new(),
        }
    }

    /// Line of the next character to be validated
    pub fn line(&self) -> usize {
        self.line
    }

    fn error(line: usize, message: String) -> FolioError {
        FolioError::Syntax { line, message }
    }

    fn check_span(&mut self, span: &str) -> Result<()> {
        if let Some((pos, name)) = self.syntax.find_unclosed_tag(span) {
            return Err(Self::error(
                self.line + count_lines(&span[..pos]),
                format!("the tag '{}' was not closed", name),
            ));
        }
        if let Some((pos, name)) = self.syntax.find_unclosed_attributes(span) {
            return Err(Self::error(
                self.line + count_lines(&span[..pos]),
                format!("the attributes of tag '{}' were not closed", name),
            ));
        }

        let mut line = self.line;
        for c in span.chars() {
            match c {
                '\n' => line += 1,
                '{' => self.open_braces.push(line),
                '}' => {
                    if self.open_braces.pop().is_none() {
                        return Err(Self::error(line, "unmatched closing brace '}'".to_string()));
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn check_tag(&self, tag: &TagMatch<'_>) -> Result<()> {
        if let Some((pos, name)) = self.syntax.find_unclosed_attributes(tag.content) {
            let before = &tag.text[..tag.content_offset() + pos];
            return Err(Self::error(
                self.line + count_lines(before),
                format!("the attributes of tag '{}' were not closed", name),
            ));
        }
        Ok(())
    }
}

impl ParseValidator for LineValidator {
    fn validate(&mut self, span: &str, tag: Option<&TagMatch<'_>>) -> Result<()> {
        self.check_span(span)?;
        self.line += count_lines(span);

        match tag {
            Some(tag) => {
                self.check_tag(tag)?;
                self.line += count_lines(tag.text);
            }
            None => {
                if let Some(&line) = self.open_braces.first() {
                    return Err(Self::error(line, "unclosed brace '{'".to_string()));
                }
            }
        }
        Ok(())
    }
}

fn count_lines(s: &str) -> usize {
    s.bytes().filter(|b| *b == b'\n').count()
}
