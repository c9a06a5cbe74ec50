use std::path::Path;

use crate::error::{IndexerError, Result};
use crate::indexer::syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

/// tree-sitter-php front end producing owned `SyntaxTree`s.
pub struct Parser {
    language: tree_sitter::Language,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_php::LANGUAGE_PHP.into(),
        }
    }

    /// Reads `path` as bytes; invalid UTF-8 (Latin-1 sources) is replaced
    /// rather than rejected.
    pub fn parse_file(&self, path: &Path) -> Result<SyntaxTree> {
        let bytes = std::fs::read(path)?;
        let source = String::from_utf8_lossy(&bytes);
        self.parse_source(&source, &path.to_string_lossy())
    }

    /// Parses `source`. The grammar recovers from local syntax errors, so a
    /// tree with error nodes is still converted; the broken subtrees are
    /// dropped. Only a file with no recoverable structure is rejected.
    pub fn parse_source(&self, source: &str, filename_hint: &str) -> Result<SyntaxTree> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| IndexerError::Parse(e.to_string()))?;

        let tree = parser
            .parse(source, None)
            .ok_or_else(|| IndexerError::Parse(format!("Failed to parse {}", filename_hint)))?;

        let root = tree.root_node();
        if root.is_error() {
            return Err(IndexerError::Parse(format!(
                "Syntax error in {}",
                filename_hint
            )));
        }
        if root.has_error() {
            tracing::debug!("Recovered from syntax errors in {}", filename_hint);
        }

        Ok(SyntaxTree {
            root: convert(root, source.as_bytes()),
            source_path: filename_hint.to_string(),
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Anonymous tokens, comments and error recovery carry nothing the
/// extractor can trust.
fn is_kept(node: &tree_sitter::Node) -> bool {
    node.is_named() && !node.is_extra() && !node.is_error() && !node.is_missing()
}

fn shallow(node: &tree_sitter::Node, field: Option<&'static str>, source: &[u8]) -> SyntaxNode {
    let kind = SyntaxKind::from_ts_kind(node.kind());
    let text = if kind.keeps_text() {
        node.utf8_text(source).unwrap_or("").to_string()
    } else {
        String::new()
    };

    SyntaxNode {
        kind,
        field,
        text,
        children: Vec::new(),
    }
}

/// Moves the finished node on top of `open` into its parent.
fn attach(open: &mut Vec<SyntaxNode>, root: &mut SyntaxNode) {
    if let Some(done) = open.pop() {
        match open.last_mut() {
            Some(parent) => parent.children.push(done),
            None => root.children.push(done),
        }
    }
}

/// Converts with an explicit stack; generated files nest expressions far
/// deeper than a worker thread's stack allows.
fn convert(node: tree_sitter::Node, source: &[u8]) -> SyntaxNode {
    let mut root = shallow(&node, None, source);
    // Kept ancestors of the cursor's current node, below `root`.
    let mut open: Vec<SyntaxNode> = Vec::new();

    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return root;
    }

    loop {
        let child = cursor.node();
        if is_kept(&child) {
            open.push(shallow(&child, cursor.field_name(), source));
            if cursor.goto_first_child() {
                continue;
            }
            attach(&mut open, &mut root);
        }

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if open.is_empty() || !cursor.goto_parent() {
                return root;
            }
            attach(&mut open, &mut root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(source: &str) -> SyntaxTree {
        Parser::new().parse_source(source, "test.php").unwrap()
    }

    #[test]
    fn test_parse_class() {
        let tree = parse("<?php\nclass Calculator {}\n");
        assert_eq!(tree.root_node().kind, SyntaxKind::Program);

        let class = tree
            .root_node()
            .descendants()
            .find(|n| n.kind == SyntaxKind::ClassDeclaration)
            .unwrap();
        assert_eq!(class.child_by_field("name").unwrap().text(), "Calculator");
    }

    #[test]
    fn test_parse_keeps_namespace_text() {
        let tree = parse("<?php\nnamespace App\\Models;\n");
        let ns = tree
            .root_node()
            .descendants()
            .find(|n| n.kind == SyntaxKind::NamespaceDefinition)
            .unwrap();
        assert_eq!(ns.child_by_field("name").unwrap().text(), "App\\Models");
    }

    #[test]
    fn test_parse_keeps_use_declaration_text() {
        let tree = parse("<?php\nuse App\\Models\\User as U;\n");
        let use_decl = tree
            .root_node()
            .descendants()
            .find(|n| n.kind == SyntaxKind::NamespaceUseDeclaration)
            .unwrap();
        assert!(use_decl.text().contains("App\\Models\\User as U"));
    }

    #[test]
    fn test_parse_drops_comments() {
        let tree = parse("<?php\n// note\n/** doc */\nclass A {}\n");
        assert!(tree
            .root_node()
            .descendants()
            .all(|n| n.kind != SyntaxKind::Other("comment".to_string())));
    }

    #[test]
    fn test_parse_drops_error_subtrees() {
        let tree = parse("<?php\nclass Before {}\n$x = ;\n");
        let root = tree.root_node();
        assert!(root
            .descendants()
            .all(|n| n.kind != SyntaxKind::Other("ERROR".to_string())));

        let names: Vec<&str> = root
            .descendants()
            .filter(|n| n.kind == SyntaxKind::ClassDeclaration)
            .filter_map(|n| n.child_by_field("name"))
            .map(|n| n.text())
            .collect();
        assert!(names.contains(&"Before"));
    }

    #[test]
    fn test_parse_keeps_enum_with_constant() {
        let tree = parse("<?php enum Suit { case Hearts; const Wild = self::Hearts; }");
        let suit = tree
            .root_node()
            .descendants()
            .find(|n| n.kind == SyntaxKind::EnumDeclaration)
            .unwrap();
        assert_eq!(suit.child_by_field("name").unwrap().text(), "Suit");
    }

    #[test]
    fn test_parse_deeply_nested_expression() {
        let terms = vec!["'a'"; 20_000].join(" . ");
        let source = format!("<?php\nclass Big {{ const X = {}; }}\n", terms);

        let tree = parse(&source);
        let nodes = tree.root_node().descendants().count();
        assert!(nodes > 20_000);
        drop(tree);
    }

    #[test]
    fn test_parse_latin1_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"<?php\n// Gr\xfc\xdfe\nclass Legacy { const LABEL = '\xe9t\xe9'; }\n")
            .unwrap();

        let tree = Parser::new().parse_file(file.path()).unwrap();
        assert!(tree
            .root_node()
            .descendants()
            .any(|n| n.kind == SyntaxKind::ClassDeclaration));
    }

    #[test]
    fn test_parse_empty_source() {
        let tree = parse("");
        assert!(tree.root_node().children.is_empty());
    }

    #[test]
    fn test_parse_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<?php\ninterface Printable {{}}\n").unwrap();

        let tree = Parser::new().parse_file(file.path()).unwrap();
        assert!(tree
            .root_node()
            .descendants()
            .any(|n| n.kind == SyntaxKind::InterfaceDeclaration));
    }

    #[test]
    fn test_parse_missing_file_is_io_error() {
        let result = Parser::new().parse_file(Path::new("/no/such/File.php"));
        assert!(matches!(result, Err(IndexerError::Io(_))));
    }
}
