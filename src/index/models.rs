use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Class,
    Interface,
    Trait,
    Enum,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Trait => "trait",
            SymbolKind::Enum => "enum",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "class" => Some(SymbolKind::Class),
            "interface" => Some(SymbolKind::Interface),
            "trait" => Some(SymbolKind::Trait),
            "enum" => Some(SymbolKind::Enum),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberKind {
    Method,
    Property,
    Constant,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberKind::Method => "method",
            MemberKind::Property => "property",
            MemberKind::Constant => "constant",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "public" | "var" => Some(Visibility::Public),
            "protected" => Some(Visibility::Protected),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// A method, property or constant declared in a type body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub name: String,
    pub kind: MemberKind,
    pub visibility: Visibility,
    #[serde(rename = "static")]
    pub is_static: bool,
}

impl Member {
    pub fn new(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            is_static: false,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

/// One declared type (class, interface, trait or enum) with its resolved
/// structural relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolDef {
    pub fqn: String,
    pub kind: SymbolKind,
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
    pub interfaces: Vec<String>,
    pub mixins: Vec<String>,
    pub dependencies: BTreeSet<String>,
    pub members: Vec<Member>,
}

impl SymbolDef {
    pub fn new(fqn: impl Into<String>, kind: SymbolKind, source_path: impl Into<String>) -> Self {
        Self {
            fqn: fqn.into(),
            kind,
            source_path: source_path.into(),
            parent_type: None,
            interfaces: Vec::new(),
            mixins: Vec::new(),
            dependencies: BTreeSet::new(),
            members: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        let parent = parent.into();
        self.dependencies.insert(parent.clone());
        self.parent_type = Some(parent);
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        let interface = interface.into();
        self.dependencies.insert(interface.clone());
        self.interfaces.push(interface);
        self
    }

    pub fn with_mixin(mut self, mixin: impl Into<String>) -> Self {
        let mixin = mixin.into();
        self.dependencies.insert(mixin.clone());
        self.mixins.push(mixin);
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.insert(dependency.into());
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Short name without the namespace path.
    pub fn short_name(&self) -> &str {
        self.fqn.rsplit('\\').next().unwrap_or(&self.fqn)
    }
}

/// Compact search hit returned by the query surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolSummary {
    pub fqn: String,
    pub kind: SymbolKind,
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_type: Option<String>,
}

impl From<&SymbolDef> for SymbolSummary {
    fn from(symbol: &SymbolDef) -> Self {
        Self {
            fqn: symbol.fqn.clone(),
            kind: symbol.kind,
            source_path: symbol.source_path.clone(),
            parent_type: symbol.parent_type.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub nodes: usize,
    pub files: usize,
    pub edges: usize,
}

/// Direct children and implementors of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InheritanceInfo {
    pub children: Vec<String>,
    pub implementors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_tracks_dependencies() {
        let symbol = SymbolDef::new("App\\Foo", SymbolKind::Class, "/src/Foo.php")
            .with_parent("App\\Bar")
            .with_interface("App\\Baz")
            .with_mixin("App\\MyTrait")
            .with_dependency("App\\Models\\User");

        assert_eq!(symbol.parent_type.as_deref(), Some("App\\Bar"));
        assert_eq!(symbol.interfaces, vec!["App\\Baz".to_string()]);
        assert_eq!(symbol.mixins, vec!["App\\MyTrait".to_string()]);
        assert_eq!(symbol.dependencies.len(), 4);
        assert_eq!(symbol.short_name(), "Foo");
    }

    #[test]
    fn test_member_defaults() {
        let member = Member::new("run", MemberKind::Method);
        assert_eq!(member.visibility, Visibility::Public);
        assert!(!member.is_static);
    }

    #[test]
    fn test_visibility_from_str() {
        assert_eq!(Visibility::from_str("PRIVATE"), Some(Visibility::Private));
        assert_eq!(Visibility::from_str("var"), Some(Visibility::Public));
        assert_eq!(Visibility::from_str("static"), None);
    }

    #[test]
    fn test_kind_round_trip_str() {
        for kind in [SymbolKind::Class, SymbolKind::Interface, SymbolKind::Trait, SymbolKind::Enum] {
            assert_eq!(SymbolKind::from_str(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_serialized_shape() {
        let symbol = SymbolDef::new("Foo", SymbolKind::Enum, "a.php")
            .with_member(Member::new("X", MemberKind::Constant).with_static(true));
        let json = serde_json::to_value(&symbol).unwrap();
        assert_eq!(json["kind"], "enum");
        assert_eq!(json["members"][0]["kind"], "constant");
        assert_eq!(json["members"][0]["static"], true);
        assert!(json.get("parent_type").is_none());
    }
}
