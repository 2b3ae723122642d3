//! Allow-list extraction of declaration nodes from a parsed source file.

use tree_sitter::{Parser, Tree};

use crate::chunk::Chunk;
use crate::error::{IndexError, Result};
use crate::languages::{Lang, NodeKind};
use crate::syntax::{SyntaxNode, TsNode};

/// Child tags holding a declaration's name.
const NAME_TAGS: &[&str] = &["identifier", "simple_identifier"];

/// Child tags preceding the name that belong in a signature.
const PREFIX_TAGS: &[&str] = &[
    "modifiers",
    "type_identifier",
    "simple_type",
    "void_type",
    "integral_type",
    "floating_point_type",
    "boolean_type",
    "generic_type",
    "array_type",
    "scoped_type_identifier",
];

/// Child tags holding a parameter list.
const PARAMS_TAGS: &[&str] = &[
    "formal_parameters",
    "function_value_parameters",
    "parameter_list",
];

/// Parse `source` with the grammar of `lang`.
///
/// Tree-sitter is error tolerant: malformed input still yields a tree with
/// `ERROR` nodes, which are traversed like any other node.
///
/// # Errors
///
/// Returns an error if no grammar is available or the parser gives up.
pub fn parse(source: &[u8], lang: Lang) -> Result<Tree> {
    let grammar = lang
        .grammar()
        .ok_or_else(|| IndexError::Parse(format!("no grammar for {}", lang.id())))?;

    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| IndexError::Parse(format!("set_language failed: {e}")))?;

    parser
        .parse(source, None)
        .ok_or_else(|| IndexError::Parse(format!("{} parser returned no tree", lang.id())))
}

/// Collect every allow-listed node under `root` in pre-order.
///
/// Nested matches are all kept: a method inside a class yields both nodes,
/// the class first.
pub fn collect_nodes<N: SyntaxNode>(root: N, lang: Lang) -> Vec<(NodeKind, N)> {
    let mut found = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let mut children = node.children();
        if let Some(kind) = lang.classify(node.kind()) {
            found.push((kind, node));
        }
        children.reverse();
        stack.extend(children);
    }

    found
}

/// Best-effort signature: modifiers and type tags before the name, the name,
/// then the parameter list. `None` when the node has no identifier child.
pub fn signature<N: SyntaxNode>(node: &N, source: &[u8]) -> Option<String> {
    let children = node.children();
    let name_pos = children
        .iter()
        .position(|c| NAME_TAGS.contains(&c.kind()))?;

    let mut parts: Vec<&str> = children[..name_pos]
        .iter()
        .filter(|c| PREFIX_TAGS.contains(&c.kind()))
        .filter_map(|c| c.text(source).ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    parts.push(children[name_pos].text(source).ok()?);

    if let Some(params) = children[name_pos + 1..]
        .iter()
        .find(|c| PARAMS_TAGS.contains(&c.kind()))
        .and_then(|c| c.text(source).ok())
    {
        parts.push(params);
    }

    Some(parts.join(" "))
}

/// Turn matched nodes into chunks, dropping (and logging) any that fail.
pub fn assemble<N: SyntaxNode>(
    nodes: Vec<(NodeKind, N)>,
    source: &[u8],
    project_id: &str,
    rel_path: &str,
    lang: Lang,
) -> Vec<Chunk> {
    nodes
        .into_iter()
        .filter_map(|(kind, node)| {
            match Chunk::from_node(&node, kind, source, project_id, rel_path, lang) {
                Ok(chunk) => Some(chunk),
                Err(e) => {
                    tracing::debug!(path = rel_path, kind = %kind, "chunk dropped: {e}");
                    None
                }
            }
        })
        .collect()
}

/// Parse one file and return its chunks in pre-order.
///
/// # Errors
///
/// Returns an error if the file cannot be parsed at all.
pub fn chunk_source(
    source: &[u8],
    project_id: &str,
    rel_path: &str,
    lang: Lang,
) -> Result<Vec<Chunk>> {
    let tree = parse(source, lang)?;
    let root = tree.root_node();
    if root.has_error() {
        tracing::debug!(path = rel_path, "syntax errors present, extracting best effort");
    }

    let nodes = collect_nodes(TsNode(root), lang);
    Ok(assemble(nodes, source, project_id, rel_path, lang))
}
