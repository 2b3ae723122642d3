//! Language detection, tree-sitter grammar registry, and the per-language
//! allow-list of extractable node kinds.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Supported language with its tree-sitter grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    Java,
    Kotlin,
    Xml,
    /// Gradle build scripts. Detected but never chunked: no grammar is bundled.
    Groovy,
}

impl Lang {
    /// Identifier stored in chunk metadata.
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Self::Java => "java",
            Self::Kotlin => "kotlin",
            Self::Xml => "xml",
            Self::Groovy => "groovy",
        }
    }

    /// Get the tree-sitter grammar. Returns `None` if the
    /// corresponding feature is not enabled.
    #[must_use]
    pub fn grammar(self) -> Option<tree_sitter::Language> {
        match self {
            #[cfg(feature = "lang-java")]
            Self::Java => Some(tree_sitter_java::LANGUAGE.into()),
            #[cfg(feature = "lang-kotlin")]
            Self::Kotlin => Some(tree_sitter_kotlin_ng::LANGUAGE.into()),
            #[cfg(feature = "lang-xml")]
            Self::Xml => Some(tree_sitter_xml::LANGUAGE_XML.into()),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    /// Node kinds collected by the extractor for this language.
    #[must_use]
    pub fn extractable_kinds(self) -> &'static [NodeKind] {
        match self {
            Self::Java => &[
                NodeKind::ClassDeclaration,
                NodeKind::MethodDeclaration,
                NodeKind::ConstructorDeclaration,
                NodeKind::InterfaceDeclaration,
                NodeKind::EnumDeclaration,
            ],
            Self::Kotlin => &[
                NodeKind::ClassDeclaration,
                NodeKind::FunctionDeclaration,
                NodeKind::ObjectDeclaration,
                NodeKind::CompanionObject,
                NodeKind::PropertyDeclaration,
            ],
            Self::Xml => &[NodeKind::Element],
            Self::Groovy => &[],
        }
    }

    /// Map a grammar node tag to an allow-listed kind for this language.
    #[must_use]
    pub fn classify(self, tag: &str) -> Option<NodeKind> {
        NodeKind::from_tag(tag).filter(|kind| self.extractable_kinds().contains(kind))
    }
}

impl std::fmt::Display for Lang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Syntax node kinds that become chunks.
///
/// Serialized as the grammar's own tag so persisted records stay readable by
/// consumers that only know the tree-sitter vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    ClassDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    InterfaceDeclaration,
    EnumDeclaration,
    FunctionDeclaration,
    ObjectDeclaration,
    CompanionObject,
    PropertyDeclaration,
    Element,
}

impl NodeKind {
    pub const ALL: [Self; 10] = [
        Self::ClassDeclaration,
        Self::MethodDeclaration,
        Self::ConstructorDeclaration,
        Self::InterfaceDeclaration,
        Self::EnumDeclaration,
        Self::FunctionDeclaration,
        Self::ObjectDeclaration,
        Self::CompanionObject,
        Self::PropertyDeclaration,
        Self::Element,
    ];

    /// Grammar tag of this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClassDeclaration => "class_declaration",
            Self::MethodDeclaration => "method_declaration",
            Self::ConstructorDeclaration => "constructor_declaration",
            Self::InterfaceDeclaration => "interface_declaration",
            Self::EnumDeclaration => "enum_declaration",
            Self::FunctionDeclaration => "function_declaration",
            Self::ObjectDeclaration => "object_declaration",
            Self::CompanionObject => "companion_object",
            Self::PropertyDeclaration => "property_declaration",
            Self::Element => "element",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Kinds for which a call signature is extracted.
    #[must_use]
    pub fn is_function_like(self) -> bool {
        matches!(self, Self::MethodDeclaration | Self::FunctionDeclaration)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detect language from file extension (case-insensitive).
#[must_use]
pub fn detect_language(path: &Path) -> Option<Lang> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "java" => Some(Lang::Java),
        "kt" | "kts" => Some(Lang::Kotlin),
        "xml" => Some(Lang::Xml),
        "gradle" => Some(Lang::Groovy),
        _ => None,
    }
}

/// Check if a file should be chunked (has a supported language with grammar).
#[must_use]
pub fn is_indexable(path: &Path) -> bool {
    detect_language(path).and_then(Lang::grammar).is_some()
}
