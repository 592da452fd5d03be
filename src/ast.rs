//! Narrow AST adapter shared by the SAST scanner and the prioritiser
//! (spec §4.1.3, §4.2, §9).
//!
//! The rest of the crate only depends on this module's three operations —
//! `parse`, `Tree::functions`, `Tree::imports` — exactly the contract spec §9
//! calls out as "a thin contract over any tree-sitter-style library". Here
//! it's backed by `ast-grep-core` / `ast-grep-language`; porting to a
//! different host means reimplementing this module alone, or (per §9)
//! falling back to a bracket-balance heuristic.

use ast_grep_core::{AstGrep, Node};
use ast_grep_core::source::StrDoc;
use ast_grep_language::SupportLang;

/// Languages the AST adapter understands. Mirrors the prioritiser's
/// "supported languages" set (spec §4.2 step 2) plus SAST's TSX/JSX split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLanguage {
    Go,
    Python,
    JavaScript,
    TypeScript,
    Tsx,
    Jsx,
}

impl SourceLanguage {
    /// Language tag used by the prioritiser for unsupported/other files.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Go => "go",
            Self::Python => "python",
            Self::JavaScript | Self::Jsx => "javascript",
            Self::TypeScript | Self::Tsx => "typescript",
        }
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "go" => Some(Self::Go),
            "py" => Some(Self::Python),
            "js" => Some(Self::JavaScript),
            "jsx" => Some(Self::Jsx),
            "ts" => Some(Self::TypeScript),
            "tsx" => Some(Self::Tsx),
            _ => None,
        }
    }

    fn support_lang(self) -> SupportLang {
        match self {
            Self::Go => SupportLang::Go,
            Self::Python => SupportLang::Python,
            Self::JavaScript | Self::Jsx => SupportLang::JavaScript,
            Self::TypeScript => SupportLang::TypeScript,
            Self::Tsx => SupportLang::Tsx,
        }
    }

    fn function_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Go => &["function_declaration", "method_declaration"],
            Self::Python => &["function_definition"],
            Self::JavaScript | Self::Jsx | Self::TypeScript | Self::Tsx => {
                &["function_declaration", "method_definition", "function"]
            }
        }
    }

    fn import_kinds(self) -> &'static [&'static str] {
        match self {
            Self::Go => &["import_declaration"],
            Self::Python => &["import_statement", "import_from_statement"],
            Self::JavaScript | Self::Jsx | Self::TypeScript | Self::Tsx => &["import_statement"],
        }
    }
}

/// A function/method range extracted from a parsed tree.
#[derive(Debug, Clone)]
pub struct FunctionRange {
    pub name: String,
    /// 1-indexed, inclusive.
    pub start_line: usize,
    /// 1-indexed, inclusive.
    pub end_line: usize,
}

/// A parsed source tree. Parsing is eager; there is no lazy reparse.
pub struct Tree {
    grep: AstGrep<StrDoc<SupportLang>>,
    language: SourceLanguage,
}

/// Parse `source` as `language`. Returns `None` on a parse failure instead of
/// propagating an error — callers treat an unparsable file the same as an
/// unreadable one (spec §4.1: "never panic... I/O and parse failures for a
/// single file are swallowed").
#[must_use]
pub fn parse(language: SourceLanguage, source: &str) -> Option<Tree> {
    let grep = AstGrep::new(source, language.support_lang());
    Some(Tree { grep, language })
}

impl Tree {
    /// All function/method definitions in the tree, in document order.
    #[must_use]
    pub fn functions(&self) -> Vec<FunctionRange> {
        let root = self.grep.root();
        let mut out = Vec::new();
        collect_by_kind(&root, self.language.function_kinds(), &mut |node| {
            let (start_line, end_line) = line_range(&node);
            let name = function_name(&node).unwrap_or_default();
            out.push(FunctionRange {
                name,
                start_line,
                end_line,
            });
        });
        out
    }

    /// Raw text of every import/require statement, in document order.
    #[must_use]
    pub fn imports(&self) -> Vec<String> {
        let root = self.grep.root();
        let mut out = Vec::new();
        collect_by_kind(&root, self.language.import_kinds(), &mut |node| {
            out.push(node.text().to_string());
        });
        out
    }

    /// No-op in Rust: the tree is freed when dropped. Kept so the adapter's
    /// shape matches the `Parse/Functions/Imports/Close` contract verbatim
    /// for ports to non-RAII hosts (spec §9).
    pub fn close(self) {
        drop(self);
    }
}

fn collect_by_kind<'t, D>(
    node: &Node<'t, D>,
    kinds: &[&str],
    visit: &mut impl FnMut(Node<'t, D>),
) where
    D: ast_grep_core::Doc,
{
    if kinds.contains(&node.kind().as_ref()) {
        visit(node.clone());
    }
    for child in node.children() {
        collect_by_kind(&child, kinds, visit);
    }
}

fn line_range<D: ast_grep_core::Doc>(node: &Node<'_, D>) -> (usize, usize) {
    let range = node.range();
    let start = node.start_pos();
    let end = node.end_pos();
    let _ = range;
    (start.line() + 1, end.line() + 1)
}

fn function_name<D: ast_grep_core::Doc>(node: &Node<'_, D>) -> Option<String> {
    node.field("name").map(|n| n.text().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_from_extension() {
        assert_eq!(SourceLanguage::from_extension("py"), Some(SourceLanguage::Python));
        assert_eq!(SourceLanguage::from_extension("tsx"), Some(SourceLanguage::Tsx));
        assert_eq!(SourceLanguage::from_extension("rb"), None);
    }

    #[test]
    fn tag_collapses_jsx_tsx_into_base_language() {
        assert_eq!(SourceLanguage::Jsx.tag(), "javascript");
        assert_eq!(SourceLanguage::Tsx.tag(), "typescript");
    }

    #[test]
    fn parse_python_function_yields_one_range() {
        let source = "def handle_request():\n    return do_thing()\n";
        let tree = parse(SourceLanguage::Python, source).expect("should parse");
        let functions = tree.functions();
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "handle_request");
        assert_eq!(functions[0].start_line, 1);
    }

    #[test]
    fn parse_go_imports_are_collected() {
        let source = "package main\n\nimport \"crypto/md5\"\n\nfunc main() {}\n";
        let tree = parse(SourceLanguage::Go, source).expect("should parse");
        let imports = tree.imports();
        assert!(imports.iter().any(|i| i.contains("crypto/md5")));
    }
}
