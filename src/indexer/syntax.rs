//! Owned syntax tree handed from the parser to the extractor.
//!
//! Node kinds the extractor cares about are a closed enum; everything else
//! lands in `SyntaxKind::Other` and is still traversed through `children`.

/// Node kinds of the PHP grammar the extractor dispatches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Program,
    NamespaceDefinition,
    NamespaceName,
    NamespaceUseDeclaration,
    ClassDeclaration,
    InterfaceDeclaration,
    TraitDeclaration,
    EnumDeclaration,
    BaseClause,
    ClassInterfaceClause,
    DeclarationList,
    /// `use SomeTrait;` inside a type body.
    TraitUse,
    UseList,
    MethodDeclaration,
    PropertyDeclaration,
    PropertyElement,
    ConstDeclaration,
    ConstElement,
    SimpleParameter,
    VariadicParameter,
    PromotedParameter,
    NamedType,
    OptionalType,
    UnionType,
    IntersectionType,
    PrimitiveType,
    ObjectCreation,
    ScopedCall,
    ScopedPropertyAccess,
    ClassConstantAccess,
    Name,
    QualifiedName,
    RelativeScope,
    VariableName,
    VisibilityModifier,
    StaticModifier,
    Other(String),
}

impl SyntaxKind {
    pub fn from_ts_kind(kind: &str) -> Self {
        match kind {
            "program" => SyntaxKind::Program,
            "namespace_definition" => SyntaxKind::NamespaceDefinition,
            "namespace_name" => SyntaxKind::NamespaceName,
            "namespace_use_declaration" => SyntaxKind::NamespaceUseDeclaration,
            "class_declaration" => SyntaxKind::ClassDeclaration,
            "interface_declaration" => SyntaxKind::InterfaceDeclaration,
            "trait_declaration" => SyntaxKind::TraitDeclaration,
            "enum_declaration" => SyntaxKind::EnumDeclaration,
            "base_clause" => SyntaxKind::BaseClause,
            "class_interface_clause" => SyntaxKind::ClassInterfaceClause,
            "declaration_list" | "enum_declaration_list" => SyntaxKind::DeclarationList,
            "use_declaration" => SyntaxKind::TraitUse,
            "use_list" => SyntaxKind::UseList,
            "method_declaration" => SyntaxKind::MethodDeclaration,
            "property_declaration" => SyntaxKind::PropertyDeclaration,
            "property_element" => SyntaxKind::PropertyElement,
            "const_declaration" => SyntaxKind::ConstDeclaration,
            "const_element" => SyntaxKind::ConstElement,
            "simple_parameter" => SyntaxKind::SimpleParameter,
            "variadic_parameter" => SyntaxKind::VariadicParameter,
            "property_promotion_parameter" => SyntaxKind::PromotedParameter,
            "named_type" => SyntaxKind::NamedType,
            "optional_type" => SyntaxKind::OptionalType,
            "union_type" => SyntaxKind::UnionType,
            "intersection_type" => SyntaxKind::IntersectionType,
            "primitive_type" => SyntaxKind::PrimitiveType,
            "object_creation_expression" => SyntaxKind::ObjectCreation,
            "scoped_call_expression" => SyntaxKind::ScopedCall,
            "scoped_property_access_expression" => SyntaxKind::ScopedPropertyAccess,
            "class_constant_access_expression" => SyntaxKind::ClassConstantAccess,
            "name" => SyntaxKind::Name,
            "qualified_name" => SyntaxKind::QualifiedName,
            "relative_scope" => SyntaxKind::RelativeScope,
            "variable_name" => SyntaxKind::VariableName,
            "visibility_modifier" => SyntaxKind::VisibilityModifier,
            "static_modifier" => SyntaxKind::StaticModifier,
            other => SyntaxKind::Other(other.to_string()),
        }
    }

    /// Kinds whose source text is retained on the node.
    pub fn keeps_text(&self) -> bool {
        matches!(
            self,
            SyntaxKind::NamespaceName
                | SyntaxKind::NamespaceUseDeclaration
                | SyntaxKind::PrimitiveType
                | SyntaxKind::Name
                | SyntaxKind::QualifiedName
                | SyntaxKind::RelativeScope
                | SyntaxKind::VariableName
                | SyntaxKind::VisibilityModifier
                | SyntaxKind::StaticModifier
        )
    }

    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            SyntaxKind::ClassDeclaration
                | SyntaxKind::InterfaceDeclaration
                | SyntaxKind::TraitDeclaration
                | SyntaxKind::EnumDeclaration
        )
    }

    pub fn is_parameter(&self) -> bool {
        matches!(
            self,
            SyntaxKind::SimpleParameter | SyntaxKind::VariadicParameter | SyntaxKind::PromotedParameter
        )
    }

    pub fn is_static_access(&self) -> bool {
        matches!(
            self,
            SyntaxKind::ScopedCall | SyntaxKind::ScopedPropertyAccess | SyntaxKind::ClassConstantAccess
        )
    }

    /// `name` or `qualified_name`: a reference that can be resolved.
    pub fn is_reference(&self) -> bool {
        matches!(self, SyntaxKind::Name | SyntaxKind::QualifiedName)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxNode {
    pub kind: SyntaxKind,
    /// Grammar field this node occupies in its parent (`name`, `body`, ...).
    pub field: Option<&'static str>,
    /// Source text, kept only for kinds where `SyntaxKind::keeps_text` holds.
    pub text: String,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(kind: SyntaxKind) -> Self {
        Self {
            kind,
            field: None,
            text: String::new(),
            children: Vec::new(),
        }
    }

    pub fn with_field(mut self, field: &'static str) -> Self {
        self.field = Some(field);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_child(mut self, child: SyntaxNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter()
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    pub fn first_child_of(&self, kind: &SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| &c.kind == kind)
    }

    /// Pre-order iterator over this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

// Unlinks children onto a worklist so dropping a deep tree does not recurse.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A parsed file: the converted root plus the path hint it was parsed for.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub root: SyntaxNode,
    pub source_path: String,
}

impl SyntaxTree {
    pub fn root_node(&self) -> &SyntaxNode {
        &self.root
    }
}
