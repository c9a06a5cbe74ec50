//! Namespace-aware name resolution.
//!
//! Turns a raw type reference as written in source (`User`, `Models\User`,
//! `\App\Models\User`) into a canonical fully qualified name using the
//! file's active namespace and its `use` imports.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;

pub const NAMESPACE_SEPARATOR: char = '\\';

/// Lower-cased names that never become dependency edges.
static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "array", "bool", "boolean", "callable", "double", "false", "float", "int", "integer",
        "iterable", "mixed", "never", "null", "object", "parent", "resource", "self", "static",
        "string", "true", "void",
    ]
    .into_iter()
    .collect()
});

pub fn is_builtin_type(name: &str) -> bool {
    BUILTIN_TYPES.contains(name.to_ascii_lowercase().as_str())
}

/// Joins a namespace and a name with the namespace separator.
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{}{}{}", namespace, NAMESPACE_SEPARATOR, name)
    }
}

/// Alias -> canonical prefix table built from `use` directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportTable {
    aliases: HashMap<String, String>,
}

impl ImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `use <path> [as <alias>]`. Without an alias the last path
    /// segment is the alias.
    pub fn add(&mut self, path: &str, alias: Option<&str>) {
        let canonical = path.trim().trim_start_matches(NAMESPACE_SEPARATOR);
        if canonical.is_empty() {
            return;
        }
        let alias = alias
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| last_segment(canonical));
        self.aliases.insert(alias.to_string(), canonical.to_string());
    }

    pub fn get(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(|s| s.as_str())
    }

    pub fn clear(&mut self) {
        self.aliases.clear();
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit(NAMESPACE_SEPARATOR).next().unwrap_or(path)
}

/// Resolves `reference` against `namespace` and `imports`.
///
/// Returns `None` only for built-in types (and empty input); every other
/// reference resolves to some canonical name.
pub fn resolve(reference: &str, namespace: &str, imports: &ImportTable) -> Option<String> {
    let reference = reference.trim();
    if reference.is_empty() || is_builtin_type(reference) {
        return None;
    }

    if let Some(absolute) = reference.strip_prefix(NAMESPACE_SEPARATOR) {
        return (!absolute.is_empty()).then(|| absolute.to_string());
    }

    let (head, rest) = match reference.split_once(NAMESPACE_SEPARATOR) {
        Some((head, rest)) => (head, Some(rest)),
        None => (reference, None),
    };

    if let Some(prefix) = imports.get(head) {
        return Some(match rest {
            Some(rest) => qualify(prefix, rest),
            None => prefix.to_string(),
        });
    }

    Some(qualify(namespace, reference))
}

/// Per-file resolution state: the active namespace and its import table.
///
/// Entering a namespace declaration resets the imports, so each namespace
/// block of a multi-namespace file resolves against its own `use` list.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    namespace: String,
    imports: ImportTable,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter_namespace(&mut self, namespace: &str) {
        self.namespace = namespace
            .trim()
            .trim_matches(NAMESPACE_SEPARATOR)
            .to_string();
        self.imports.clear();
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn imports(&self) -> &ImportTable {
        &self.imports
    }

    pub fn add_import(&mut self, path: &str, alias: Option<&str>) {
        self.imports.add(path, alias);
    }

    pub fn resolve(&self, reference: &str) -> Option<String> {
        resolve(reference, &self.namespace, &self.imports)
    }

    /// Fqn of a type declared in the active namespace. Declared names never
    /// go through import resolution.
    pub fn declare(&self, name: &str) -> String {
        qualify(&self.namespace, name)
    }
}

/// One clause of a `use` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportClause {
    pub path: String,
    pub alias: Option<String>,
}

/// Parses the text of a `use` directive into its clauses.
///
/// Handles plain lists (`use A\B, C\D as E;`) and group imports
/// (`use A\{B, C as D};`). `use function` / `use const` yield nothing since
/// they never import types.
pub fn parse_use_directive(text: &str) -> Vec<ImportClause> {
    let body = text.trim();
    let body = body.strip_prefix("use").unwrap_or(body).trim();
    let body = body.trim_end_matches(';').trim();

    let lowered = body.to_ascii_lowercase();
    if lowered.starts_with("function ") || lowered.starts_with("const ") {
        return Vec::new();
    }

    let (prefix, list) = match (body.find('{'), body.rfind('}')) {
        (Some(open), Some(close)) if open < close => (
            body[..open].trim().trim_end_matches(NAMESPACE_SEPARATOR),
            &body[open + 1..close],
        ),
        _ => ("", body),
    };

    list.split(',')
        .filter_map(|item| parse_clause(item, prefix))
        .collect()
}

fn parse_clause(item: &str, prefix: &str) -> Option<ImportClause> {
    let item = item.trim();
    let mut parts = item.split_whitespace();
    let mut path = parts.next()?;

    // Mixed group imports may tag single entries: `use A\{function f, B}`.
    if path.eq_ignore_ascii_case("function") || path.eq_ignore_ascii_case("const") {
        return None;
    }

    let alias = match (parts.next(), parts.next()) {
        (Some(kw), Some(alias)) if kw.eq_ignore_ascii_case("as") => Some(alias.to_string()),
        _ => None,
    };

    path = path.trim_start_matches(NAMESPACE_SEPARATOR);
    let path = if prefix.is_empty() {
        path.to_string()
    } else {
        qualify(prefix.trim_start_matches(NAMESPACE_SEPARATOR), path)
    };

    Some(ImportClause { path, alias })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_to_namespace() {
        let imports = ImportTable::new();
        assert_eq!(resolve("C", "A\\B", &imports).as_deref(), Some("A\\B\\C"));
    }

    #[test]
    fn test_resolve_in_global_namespace() {
        let imports = ImportTable::new();
        assert_eq!(resolve("Foo", "", &imports).as_deref(), Some("Foo"));
        assert_eq!(resolve("Sub\\Foo", "", &imports).as_deref(), Some("Sub\\Foo"));
    }

    #[test]
    fn test_resolve_through_alias() {
        let mut imports = ImportTable::new();
        imports.add("X\\Y\\C", None);
        assert_eq!(resolve("C", "A\\B", &imports).as_deref(), Some("X\\Y\\C"));
    }

    #[test]
    fn test_resolve_alias_with_remaining_segments() {
        let mut imports = ImportTable::new();
        imports.add("Vendor\\Package", Some("Pkg"));
        assert_eq!(
            resolve("Pkg\\Sub\\Thing", "App", &imports).as_deref(),
            Some("Vendor\\Package\\Sub\\Thing")
        );
    }

    #[test]
    fn test_resolve_fully_qualified() {
        let mut imports = ImportTable::new();
        imports.add("Other\\X", None);
        assert_eq!(resolve("\\X\\Y", "A\\B", &imports).as_deref(), Some("X\\Y"));
    }

    #[test]
    fn test_resolve_builtins() {
        let imports = ImportTable::new();
        assert_eq!(resolve("int", "A", &imports), None);
        assert_eq!(resolve("STRING", "A", &imports), None);
        assert_eq!(resolve("self", "A", &imports), None);
        assert_eq!(resolve("Static", "A", &imports), None);
        assert_eq!(resolve("", "A", &imports), None);
        assert_eq!(resolve("\\", "A", &imports), None);
    }

    #[test]
    fn test_import_prefix_is_canonical() {
        let mut imports = ImportTable::new();
        imports.add("\\App\\Models\\User", None);
        assert_eq!(imports.get("User"), Some("App\\Models\\User"));
    }

    #[test]
    fn test_name_resolver_resets_imports_per_namespace() {
        let mut resolver = NameResolver::new();
        resolver.enter_namespace("First");
        resolver.add_import("Lib\\Thing", None);
        assert_eq!(resolver.resolve("Thing").as_deref(), Some("Lib\\Thing"));

        resolver.enter_namespace("Second");
        assert!(resolver.imports().is_empty());
        assert_eq!(resolver.resolve("Thing").as_deref(), Some("Second\\Thing"));
        assert_eq!(resolver.declare("Local"), "Second\\Local");
    }

    #[test]
    fn test_declare_ignores_imports() {
        let mut resolver = NameResolver::new();
        resolver.enter_namespace("App");
        resolver.add_import("Other\\Foo", None);
        assert_eq!(resolver.declare("Foo"), "App\\Foo");
    }

    #[test]
    fn test_parse_use_simple() {
        let clauses = parse_use_directive("use App\\Models\\User;");
        assert_eq!(
            clauses,
            vec![ImportClause {
                path: "App\\Models\\User".to_string(),
                alias: None
            }]
        );
    }

    #[test]
    fn test_parse_use_list_with_alias() {
        let clauses = parse_use_directive("use \\A\\B, C\\D as E;");
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].path, "A\\B");
        assert_eq!(clauses[1].path, "C\\D");
        assert_eq!(clauses[1].alias.as_deref(), Some("E"));
    }

    #[test]
    fn test_parse_use_group() {
        let clauses = parse_use_directive("use App\\Models\\{User, Post as P};");
        assert_eq!(clauses[0].path, "App\\Models\\User");
        assert_eq!(clauses[1].path, "App\\Models\\Post");
        assert_eq!(clauses[1].alias.as_deref(), Some("P"));
    }

    #[test]
    fn test_parse_use_function_and_const_ignored() {
        assert!(parse_use_directive("use function App\\helper;").is_empty());
        assert!(parse_use_directive("use const App\\LIMIT;").is_empty());

        let mixed = parse_use_directive("use App\\{function helper, Model};");
        assert_eq!(mixed.len(), 1);
        assert_eq!(mixed[0].path, "App\\Model");
    }
}
