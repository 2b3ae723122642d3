//! Minimal syntax-tree interface used by the extractor, with a thin adapter
//! over tree-sitter nodes.

use std::ops::Range;

/// Byte range and 0-based row range of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_line: usize,
    pub end_line: usize,
}

impl Span {
    #[must_use]
    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }
}

/// A node of a parsed syntax tree.
pub trait SyntaxNode: Sized {
    /// Grammar tag of the node (e.g. `method_declaration`).
    fn kind(&self) -> &str;

    fn span(&self) -> Span;

    /// Direct children in source order, named and anonymous.
    fn children(&self) -> Vec<Self>;

    /// Exact source slice covered by the node.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice is not valid UTF-8. A span outside the
    /// source yields an empty string.
    fn text<'s>(&self, source: &'s [u8]) -> Result<&'s str, std::str::Utf8Error> {
        let bytes = source.get(self.span().byte_range()).unwrap_or_default();
        std::str::from_utf8(bytes)
    }
}

/// Adapter exposing a `tree_sitter::Node` through [`SyntaxNode`].
#[derive(Debug, Clone, Copy)]
pub struct TsNode<'tree>(pub tree_sitter::Node<'tree>);

impl SyntaxNode for TsNode<'_> {
    fn kind(&self) -> &str {
        self.0.kind()
    }

    fn span(&self) -> Span {
        Span {
            start_byte: self.0.start_byte(),
            end_byte: self.0.end_byte(),
            start_line: self.0.start_position().row,
            end_line: self.0.end_position().row,
        }
    }

    fn children(&self) -> Vec<Self> {
        let mut cursor = self.0.walk();
        self.0.children(&mut cursor).map(TsNode).collect()
    }

    fn text<'s>(&self, source: &'s [u8]) -> Result<&'s str, std::str::Utf8Error> {
        self.0.utf8_text(source)
    }
}
