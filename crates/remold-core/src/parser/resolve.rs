// Type resolution pass. Attaches static types to a parsed tree from the
// caller-supplied symbol table: declared variables, imports, constructor
// results, known method returns, and a supertype chain. Anything it cannot
// resolve stays `TypeRef::Unknown`; the engine treats unknown as non-match,
// never as an error.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::tree::{NodeId, NodeKind, PlaceholderKind, SyntaxTree, TypeRef};

/// Per-file symbol knowledge supplied by the surrounding tooling.
///
/// The engine queries it for assignability, subtype checks, and the
/// "is this symbol still referenced" question the import flush needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SymbolTable {
    vars: IndexMap<String, TypeRef>,
    types: IndexSet<String>,
    supertypes: IndexMap<String, String>,
    method_returns: IndexMap<String, TypeRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a variable with a known static type.
    pub fn declare_var(&mut self, name: impl Into<String>, ty: TypeRef) {
        self.vars.insert(name.into(), ty);
    }

    pub fn var_type(&self, name: &str) -> Option<&TypeRef> {
        self.vars.get(name)
    }

    /// Register a qualified name as a known class.
    pub fn declare_type(&mut self, qualified: impl Into<String>) {
        self.types.insert(qualified.into());
    }

    pub fn is_known_type(&self, qualified: &str) -> bool {
        self.types.contains(qualified)
    }

    /// Register `sub` as a direct subtype of `sup`. Both become known types.
    pub fn declare_subtype(&mut self, sub: impl Into<String>, sup: impl Into<String>) {
        let sub = sub.into();
        let sup = sup.into();
        self.types.insert(sub.clone());
        self.types.insert(sup.clone());
        self.supertypes.insert(sub, sup);
    }

    /// Register the return type of `owner.name(..)` so chained calls can be
    /// typed.
    pub fn declare_method(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        returns: TypeRef,
    ) {
        let key = format!("{}#{}", owner.into(), name.into());
        self.method_returns.insert(key, returns);
    }

    pub fn method_return(&self, owner: &str, name: &str) -> Option<&TypeRef> {
        self.method_returns.get(&format!("{owner}#{name}"))
    }

    /// Reflexive, transitive subtype check over the declared chain.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut current = sub;
        loop {
            if current == sup {
                return true;
            }
            match self.supertypes.get(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Whether a value of type `from` can stand where `to` is required.
    /// Unknown is never assignable in either direction.
    pub fn assignable(&self, from: &TypeRef, to: &TypeRef) -> bool {
        match (from, to) {
            (TypeRef::Named(sub), TypeRef::Named(sup)) => self.is_subtype(sub, sup),
            (TypeRef::Array(from_elem), TypeRef::Array(to_elem)) => {
                self.assignable(from_elem, to_elem)
            }
            _ => false,
        }
    }

    /// Conservative reference check used by the import flush: does any
    /// non-import node in the file name this symbol? Counts identifiers
    /// matching the simple or qualified name, constructor calls, and
    /// qualified field-access chains spelling the name out.
    pub fn is_referenced(&self, tree: &SyntaxTree, qualified: &str) -> bool {
        let simple = qualified.rsplit('.').next().unwrap_or(qualified);
        let body = match tree.kind(tree.root()) {
            NodeKind::Unit { body, .. } => body.clone(),
            _ => vec![tree.root()],
        };
        let mut found = false;
        for stmt in body {
            tree.walk(stmt, &mut |id| match tree.kind(id) {
                NodeKind::Identifier(name) => {
                    found |= name == simple || name == qualified;
                }
                NodeKind::New { class, .. } => {
                    found |= class == simple || class == qualified;
                }
                NodeKind::FieldAccess { .. } => {
                    if let Some(path) = tree.flatten_path(id) {
                        found |= path == qualified;
                    }
                }
                _ => {}
            });
            if found {
                return true;
            }
        }
        false
    }
}

/// Resolve types across a whole unit.
pub fn resolve(tree: &mut SyntaxTree, symbols: &SymbolTable) {
    let imports = import_map(tree);
    let mut locals: IndexMap<String, TypeRef> = IndexMap::new();
    let root = tree.root();
    resolve_node(tree, root, symbols, &imports, &mut locals);
}

/// Re-resolve only the subtree at `root`, in the context of the file's
/// imports and symbol table. Used after a template splice so the produced
/// replacement is coherently typed.
pub fn resolve_subtree(tree: &mut SyntaxTree, root: NodeId, symbols: &SymbolTable) {
    let imports = import_map(tree);
    let mut locals: IndexMap<String, TypeRef> = IndexMap::new();
    resolve_node(tree, root, symbols, &imports, &mut locals);
}

fn import_map(tree: &SyntaxTree) -> IndexMap<String, String> {
    tree.import_paths()
        .into_iter()
        .map(|path| {
            let simple = path.rsplit('.').next().unwrap_or(&path).to_string();
            (simple, path)
        })
        .collect()
}

fn resolve_node(
    tree: &mut SyntaxTree,
    id: NodeId,
    symbols: &SymbolTable,
    imports: &IndexMap<String, String>,
    locals: &mut IndexMap<String, TypeRef>,
) -> TypeRef {
    let kind = tree.kind(id).clone();
    let ty = match kind {
        NodeKind::Unit { body, .. } => {
            for stmt in body {
                resolve_node(tree, stmt, symbols, imports, locals);
            }
            TypeRef::Unknown
        }
        NodeKind::Import { .. } => TypeRef::Unknown,
        NodeKind::Decl { name, value } => {
            let value_ty = resolve_node(tree, value, symbols, imports, locals);
            locals.insert(name, value_ty.clone());
            value_ty
        }
        NodeKind::Assignment { target, value } => {
            resolve_node(tree, target, symbols, imports, locals);
            resolve_node(tree, value, symbols, imports, locals)
        }
        NodeKind::Call {
            receiver,
            name,
            args,
            block,
        } => {
            let receiver_ty = receiver.map(|r| resolve_node(tree, r, symbols, imports, locals));
            for arg in args {
                resolve_node(tree, arg, symbols, imports, locals);
            }
            if let Some(block) = block {
                resolve_node(tree, block, symbols, imports, locals);
            }
            match receiver_ty.as_ref().and_then(|ty| ty.name()) {
                Some(owner) => symbols
                    .method_return(owner, &name)
                    .cloned()
                    .unwrap_or(TypeRef::Unknown),
                None => TypeRef::Unknown,
            }
        }
        NodeKind::New { class, args } => {
            for arg in args {
                resolve_node(tree, arg, symbols, imports, locals);
            }
            let qualified = imports.get(&class).cloned().unwrap_or(class);
            TypeRef::Named(qualified)
        }
        NodeKind::FieldAccess { target, .. } => {
            resolve_node(tree, target, symbols, imports, locals);
            // A dotted chain that spells a known class is a class reference.
            match tree.flatten_path(id) {
                Some(path) if symbols.is_known_type(&path) => TypeRef::Named(path),
                _ => TypeRef::Unknown,
            }
        }
        NodeKind::Index { target, index } => {
            let target_ty = resolve_node(tree, target, symbols, imports, locals);
            resolve_node(tree, index, symbols, imports, locals);
            target_ty.element().cloned().unwrap_or(TypeRef::Unknown)
        }
        NodeKind::Identifier(name) => {
            if let Some(ty) = locals.get(&name).or_else(|| symbols.var_type(&name)) {
                ty.clone()
            } else if let Some(qualified) = imports.get(&name) {
                TypeRef::Named(qualified.clone())
            } else if symbols.is_known_type(&name) {
                TypeRef::Named(name)
            } else {
                TypeRef::Unknown
            }
        }
        NodeKind::StringLit(_) => TypeRef::named("String"),
        NodeKind::NumberLit(_) => TypeRef::named("int"),
        NodeKind::BoolLit(_) => TypeRef::named("boolean"),
        NodeKind::ArrayLit(elements) => {
            let mut element_ty: Option<TypeRef> = None;
            for element in elements {
                let ty = resolve_node(tree, element, symbols, imports, locals);
                element_ty = match element_ty {
                    None => Some(ty),
                    Some(prev) if prev == ty => Some(prev),
                    Some(_) => Some(TypeRef::Unknown),
                };
            }
            TypeRef::array_of(element_ty.unwrap_or(TypeRef::Unknown))
        }
        NodeKind::Block(statements) => {
            for stmt in statements {
                resolve_node(tree, stmt, symbols, imports, locals);
            }
            TypeRef::Unknown
        }
        NodeKind::Placeholder { kind: ref slot, .. } => match slot {
            PlaceholderKind::Expr(Some(ty)) => ty.clone(),
            PlaceholderKind::Array(Some(elem)) => TypeRef::array_of(elem.clone()),
            PlaceholderKind::Expr(None) | PlaceholderKind::Array(None) => TypeRef::Unknown,
        },
    };
    tree.set_ty(id, ty.clone());
    ty
}
