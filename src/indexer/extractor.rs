use std::path::Path;

use crate::index::{Member, MemberKind, SymbolDef, SymbolKind, Visibility};
use crate::indexer::parser::Parser;
use crate::indexer::resolver::{parse_use_directive, NameResolver};
use crate::indexer::syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

/// Outcome of analysing one file. A failed read or parse yields no symbols
/// and records why in `failure`; it is never an error.
#[derive(Debug, Default)]
pub struct ExtractionResult {
    pub file_path: String,
    pub symbols: Vec<SymbolDef>,
    pub failure: Option<String>,
}

impl ExtractionResult {
    pub fn is_failure(&self) -> bool {
        self.failure.is_some()
    }
}

pub struct SymbolExtractor {
    parser: Parser,
}

impl SymbolExtractor {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Reads, parses and extracts `path`. Safe to call from many threads at
    /// once: each call owns its parser state and output.
    pub fn extract_file(&self, path: &Path) -> ExtractionResult {
        let file_path = path.to_string_lossy().to_string();
        match self.parser.parse_file(path) {
            Ok(tree) => ExtractionResult {
                symbols: self.extract(&tree, &file_path),
                file_path,
                failure: None,
            },
            Err(e) => ExtractionResult {
                file_path,
                symbols: Vec::new(),
                failure: Some(e.to_string()),
            },
        }
    }

    pub fn extract_source(&self, source: &str, file_path: &str) -> ExtractionResult {
        match self.parser.parse_source(source, file_path) {
            Ok(tree) => ExtractionResult {
                symbols: self.extract(&tree, file_path),
                file_path: file_path.to_string(),
                failure: None,
            },
            Err(e) => ExtractionResult {
                file_path: file_path.to_string(),
                symbols: Vec::new(),
                failure: Some(e.to_string()),
            },
        }
    }

    /// Symbol definitions of `tree` in declaration order.
    pub fn extract(&self, tree: &SyntaxTree, file_path: &str) -> Vec<SymbolDef> {
        let mut walk = ExtractionWalk {
            resolver: NameResolver::new(),
            file_path,
            symbols: Vec::new(),
        };
        walk.visit(tree.root_node());
        walk.symbols
    }
}

impl Default for SymbolExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct ExtractionWalk<'a> {
    resolver: NameResolver,
    file_path: &'a str,
    symbols: Vec<SymbolDef>,
}

impl ExtractionWalk<'_> {
    /// Pre-order walk outside type bodies, driven by an explicit stack.
    fn visit(&mut self, root: &SyntaxNode) {
        let mut pending = vec![root];

        while let Some(node) = pending.pop() {
            match &node.kind {
                SyntaxKind::NamespaceDefinition => {
                    let name = node
                        .child_by_field("name")
                        .or_else(|| node.first_child_of(&SyntaxKind::NamespaceName))
                        .map(|n| n.text())
                        .unwrap_or("");
                    self.resolver.enter_namespace(name);

                    pending.extend(
                        node.children
                            .iter()
                            .rev()
                            .filter(|c| c.kind != SyntaxKind::NamespaceName),
                    );
                }
                SyntaxKind::NamespaceUseDeclaration => {
                    for clause in parse_use_directive(node.text()) {
                        self.resolver.add_import(&clause.path, clause.alias.as_deref());
                    }
                }
                kind if kind.is_type_declaration() => self.visit_type_declaration(node),
                _ => pending.extend(node.children.iter().rev()),
            }
        }
    }

    fn visit_type_declaration(&mut self, node: &SyntaxNode) {
        let Some(name) = node
            .child_by_field("name")
            .map(|n| n.text().to_string())
            .filter(|n| !n.is_empty())
        else {
            return;
        };
        let kind = match node.kind {
            SyntaxKind::InterfaceDeclaration => SymbolKind::Interface,
            SyntaxKind::TraitDeclaration => SymbolKind::Trait,
            SyntaxKind::EnumDeclaration => SymbolKind::Enum,
            _ => SymbolKind::Class,
        };

        let mut symbol = SymbolDef::new(self.resolver.declare(&name), kind, self.file_path);
        // Declarations nested in this body are pushed while we scan; the
        // enclosing symbol goes in front of them.
        let slot = self.symbols.len();

        for child in node.children() {
            match child.kind {
                SyntaxKind::BaseClause => {
                    for parent in self.resolve_references(child) {
                        // Only the first declared parent feeds the inheritance index.
                        if symbol.parent_type.is_none() {
                            symbol.parent_type = Some(parent.clone());
                        }
                        symbol.dependencies.insert(parent);
                    }
                }
                SyntaxKind::ClassInterfaceClause => {
                    for interface in self.resolve_references(child) {
                        symbol.dependencies.insert(interface.clone());
                        symbol.interfaces.push(interface);
                    }
                }
                SyntaxKind::DeclarationList => self.scan_body(child, &mut symbol),
                _ => self.collect_dependencies(child, &mut symbol),
            }
        }

        tracing::trace!("{} {} in {}", kind.as_str(), symbol.fqn, self.file_path);
        self.symbols.insert(slot, symbol);
    }

    fn scan_body(&mut self, body: &SyntaxNode, symbol: &mut SymbolDef) {
        for item in body.children() {
            match item.kind {
                SyntaxKind::TraitUse => {
                    for mixin in self.resolve_references(item) {
                        symbol.dependencies.insert(mixin.clone());
                        symbol.mixins.push(mixin);
                    }
                }
                SyntaxKind::MethodDeclaration => {
                    if let Some(name) = item.child_by_field("name") {
                        symbol
                            .members
                            .push(member(name.text(), MemberKind::Method, item));
                    }
                    self.collect_dependencies(item, symbol);
                }
                SyntaxKind::PropertyDeclaration => {
                    for element in item
                        .children()
                        .filter(|c| c.kind == SyntaxKind::PropertyElement)
                    {
                        if let Some(var) = element.first_child_of(&SyntaxKind::VariableName) {
                            let name = var.text().trim_start_matches('$');
                            symbol
                                .members
                                .push(member(name, MemberKind::Property, item));
                        }
                    }
                    self.collect_dependencies(item, symbol);
                }
                SyntaxKind::ConstDeclaration => {
                    for element in item
                        .children()
                        .filter(|c| c.kind == SyntaxKind::ConstElement)
                    {
                        if let Some(name) = element.first_child_of(&SyntaxKind::Name) {
                            symbol
                                .members
                                .push(member(name.text(), MemberKind::Constant, item));
                        }
                    }
                    self.collect_dependencies(item, symbol);
                }
                _ => self.collect_dependencies(item, symbol),
            }
        }
    }

    /// Walks everything below `node`, picking up dependency-only edges:
    /// constructions, static accesses, parameter types and return types.
    fn collect_dependencies(&mut self, node: &SyntaxNode, symbol: &mut SymbolDef) {
        let mut pending = vec![node];

        while let Some(node) = pending.pop() {
            match &node.kind {
                kind if kind.is_type_declaration() => {
                    self.visit_type_declaration(node);
                    continue;
                }
                SyntaxKind::ObjectCreation => {
                    if let Some(class) = node.children().find(|c| c.kind.is_reference()) {
                        self.add_dependency(symbol, class.text());
                    }
                }
                kind if kind.is_static_access() => {
                    let scope = node
                        .child_by_field("scope")
                        .or_else(|| node.children.first());
                    if let Some(scope) = scope.filter(|s| s.kind.is_reference()) {
                        self.add_dependency(symbol, scope.text());
                    }
                }
                kind if kind.is_parameter() => {
                    if let Some(ty) = node.child_by_field("type") {
                        self.add_type_dependencies(ty, symbol);
                    }
                }
                // Anonymous classes: their parents count as plain dependencies.
                SyntaxKind::BaseClause | SyntaxKind::ClassInterfaceClause => {
                    for name in self.resolve_references(node) {
                        symbol.dependencies.insert(name);
                    }
                }
                _ => {}
            }

            if node.field == Some("return_type") {
                self.add_type_dependencies(node, symbol);
            }

            pending.extend(node.children.iter().rev());
        }
    }

    fn add_type_dependencies(&self, ty: &SyntaxNode, symbol: &mut SymbolDef) {
        for name in type_references(ty) {
            self.add_dependency(symbol, name);
        }
    }

    fn add_dependency(&self, symbol: &mut SymbolDef, reference: &str) {
        if let Some(resolved) = self.resolver.resolve(reference) {
            symbol.dependencies.insert(resolved);
        }
    }

    /// Resolved names listed directly under a clause (`extends A, B`).
    fn resolve_references(&self, clause: &SyntaxNode) -> Vec<String> {
        clause
            .children()
            .filter(|c| c.kind.is_reference())
            .filter_map(|c| self.resolver.resolve(c.text()))
            .collect()
    }
}

/// Named components of a type annotation (`?A`, `A|B`, `A&B`). Does not
/// descend into a qualified name, whose last segment is itself a `name`.
fn type_references(ty: &SyntaxNode) -> Vec<&str> {
    let mut names = Vec::new();
    let mut pending = vec![ty];
    while let Some(node) = pending.pop() {
        if node.kind.is_reference() {
            names.push(node.text());
        } else {
            pending.extend(node.children.iter().rev());
        }
    }
    names
}

fn member(name: &str, kind: MemberKind, declaration: &SyntaxNode) -> Member {
    let visibility = declaration
        .first_child_of(&SyntaxKind::VisibilityModifier)
        .and_then(|m| Visibility::from_str(m.text().trim()))
        .unwrap_or_default();
    let is_static = declaration
        .children()
        .any(|c| c.kind == SyntaxKind::StaticModifier);

    Member::new(name, kind)
        .with_visibility(visibility)
        .with_static(is_static)
}
