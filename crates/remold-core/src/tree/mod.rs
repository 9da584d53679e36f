// Arena-allocated syntax tree shared by the parser, the rewrite engine, and
// the printer. Nodes are addressed by stable indices; edits allocate new
// nodes along the spine to the change and reuse every other subtree.

pub mod print;
pub use print::ToSource;


use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable handle to a node inside a [`SyntaxTree`] arena.
///
/// Ids of unedited subtrees survive edits unchanged, which is what lets a
/// caller fall back to any previously produced root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Resolved static type attached to a node by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TypeRef {
    /// No type information. Matching treats this as "cannot classify".
    #[default]
    Unknown,
    /// A named (possibly qualified) type: `String`, `legacy.util.LegacyCodec`.
    Named(String),
    /// An array of an element type: `byte[]`.
    Array(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn array_of(elem: TypeRef) -> Self {
        TypeRef::Array(Box::new(elem))
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, TypeRef::Unknown)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    /// Element type of an array type, if this is one.
    pub fn element(&self) -> Option<&TypeRef> {
        match self {
            TypeRef::Array(elem) => Some(elem),
            _ => None,
        }
    }

    /// The qualified name of a named type, if this is one.
    pub fn name(&self) -> Option<&str> {
        match self {
            TypeRef::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unknown => write!(f, "?"),
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}

/// Constraint carried by a template placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlaceholderKind {
    /// `#{any(T)}` / `#{any()}`: any expression, optionally constrained to
    /// a type the capture must be assignable to.
    Expr(Option<TypeRef>),
    /// `#{anyArray(T)}` / `#{anyArray()}`: an array-typed expression,
    /// optionally constrained by element type.
    Array(Option<TypeRef>),
}

/// Closed set of node shapes. The matcher, printer and engine all dispatch
/// over this enum exhaustively, so adding a shape is compile-time checked
/// everywhere it matters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// One input file: import list followed by statements.
    Unit {
        imports: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    /// `import a.b.C`
    Import { path: String },
    /// `def name = value`
    Decl { name: String, value: NodeId },
    /// `target = value`; target is an identifier or field access.
    Assignment { target: NodeId, value: NodeId },
    /// `recv.name(args) { block }` / `name(args)` / `name { block }`
    Call {
        receiver: Option<NodeId>,
        name: String,
        args: Vec<NodeId>,
        block: Option<NodeId>,
    },
    /// `new Type(args)`
    New { class: String, args: Vec<NodeId> },
    /// `target.name`
    FieldAccess { target: NodeId, name: String },
    /// `target[index]`
    Index { target: NodeId, index: NodeId },
    Identifier(String),
    StringLit(String),
    NumberLit(i64),
    BoolLit(bool),
    /// `[e1, e2, ...]`
    ArrayLit(Vec<NodeId>),
    /// `{ statements }`
    Block(Vec<NodeId>),
    /// Template-internal capture slot; never present in a parsed file.
    Placeholder { index: usize, kind: PlaceholderKind },
}

/// A node: shape plus resolved type metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    pub ty: TypeRef,
}

/// Append-only node arena with a current root.
///
/// The arena only ever grows during a pass; "mutation" means allocating new
/// nodes and publishing a new root. Any root produced earlier in the pass
/// remains a consistent tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn new() -> Self {
        // Slot 0 holds an empty unit so `root` is always valid.
        let mut tree = SyntaxTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.alloc(NodeKind::Unit {
            imports: Vec::new(),
            body: Vec::new(),
        });
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        debug_assert!(root.index() < self.nodes.len());
        self.root = root;
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.alloc_typed(kind, TypeRef::Unknown)
    }

    pub fn alloc_typed(&mut self, kind: NodeKind, ty: TypeRef) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, ty });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn ty(&self, id: NodeId) -> &TypeRef {
        &self.nodes[id.index()].ty
    }

    /// Attach resolved type metadata. Only the resolver and the template
    /// binder call this; node *shape* is never mutated in place.
    pub fn set_ty(&mut self, id: NodeId, ty: TypeRef) {
        self.nodes[id.index()].ty = ty;
    }

    /// Child ids of a node, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        match self.kind(id) {
            NodeKind::Unit { imports, body } => {
                imports.iter().chain(body.iter()).copied().collect()
            }
            NodeKind::Import { .. } => Vec::new(),
            NodeKind::Decl { value, .. } => vec![*value],
            NodeKind::Assignment { target, value } => vec![*target, *value],
            NodeKind::Call {
                receiver,
                args,
                block,
                ..
            } => receiver
                .iter()
                .chain(args.iter())
                .chain(block.iter())
                .copied()
                .collect(),
            NodeKind::New { args, .. } => args.clone(),
            NodeKind::FieldAccess { target, .. } => vec![*target],
            NodeKind::Index { target, index } => vec![*target, *index],
            NodeKind::Identifier(_)
            | NodeKind::StringLit(_)
            | NodeKind::NumberLit(_)
            | NodeKind::BoolLit(_)
            | NodeKind::Placeholder { .. } => Vec::new(),
            NodeKind::ArrayLit(elements) => elements.clone(),
            NodeKind::Block(statements) => statements.clone(),
        }
    }

    /// Rebuild `kind` with each child id passed through `map`. Returns
    /// `None` when no child changed, so callers can keep the original node.
    pub fn map_children(
        &self,
        kind: &NodeKind,
        mut map: impl FnMut(NodeId) -> NodeId,
    ) -> Option<NodeKind> {
        let mut changed = false;
        let mut remap = |id: NodeId| {
            let new = map(id);
            changed |= new != id;
            new
        };
        let rebuilt = match kind {
            NodeKind::Unit { imports, body } => NodeKind::Unit {
                imports: imports.iter().map(|&c| remap(c)).collect(),
                body: body.iter().map(|&c| remap(c)).collect(),
            },
            NodeKind::Decl { name, value } => NodeKind::Decl {
                name: name.clone(),
                value: remap(*value),
            },
            NodeKind::Assignment { target, value } => NodeKind::Assignment {
                target: remap(*target),
                value: remap(*value),
            },
            NodeKind::Call {
                receiver,
                name,
                args,
                block,
            } => NodeKind::Call {
                receiver: receiver.map(&mut remap),
                name: name.clone(),
                args: args.iter().map(|&c| remap(c)).collect(),
                block: block.map(&mut remap),
            },
            NodeKind::New { class, args } => NodeKind::New {
                class: class.clone(),
                args: args.iter().map(|&c| remap(c)).collect(),
            },
            NodeKind::FieldAccess { target, name } => NodeKind::FieldAccess {
                target: remap(*target),
                name: name.clone(),
            },
            NodeKind::Index { target, index } => NodeKind::Index {
                target: remap(*target),
                index: remap(*index),
            },
            NodeKind::ArrayLit(elements) => {
                NodeKind::ArrayLit(elements.iter().map(|&c| remap(c)).collect())
            }
            NodeKind::Block(statements) => {
                NodeKind::Block(statements.iter().map(|&c| remap(c)).collect())
            }
            NodeKind::Import { .. }
            | NodeKind::Identifier(_)
            | NodeKind::StringLit(_)
            | NodeKind::NumberLit(_)
            | NodeKind::BoolLit(_)
            | NodeKind::Placeholder { .. } => return None,
        };
        changed.then_some(rebuilt)
    }

    /// Structural-sharing edit: produce a tree rooted at `root` in which the
    /// subtree at `target` is replaced by `replacement`. Only the spine from
    /// `root` down to `target` is reallocated; every unedited subtree keeps
    /// its id.
    pub fn replace(&mut self, root: NodeId, target: NodeId, replacement: NodeId) -> NodeId {
        if root == target {
            return replacement;
        }
        let old_children = self.children(root);
        let mut new_children = Vec::with_capacity(old_children.len());
        let mut changed = false;
        for &child in &old_children {
            let new = self.replace(child, target, replacement);
            changed |= new != child;
            new_children.push(new);
        }
        if !changed {
            return root;
        }
        let kind = self.kind(root).clone();
        let mut substituted = new_children.into_iter();
        let rebuilt = self
            .map_children(&kind, |_| substituted.next().expect("child arity"))
            .expect("changed node has children");
        let ty = self.ty(root).clone();
        self.alloc_typed(rebuilt, ty)
    }

    /// Deep-copy the subtree at `source` in `from` into this arena,
    /// substituting [`NodeKind::Placeholder`] slots via `bind`.
    pub fn graft(
        &mut self,
        from: &SyntaxTree,
        source: NodeId,
        bind: &mut impl FnMut(usize) -> NodeId,
    ) -> NodeId {
        let node = from.node(source);
        if let NodeKind::Placeholder { index, .. } = &node.kind {
            return bind(*index);
        }
        let kind = match &node.kind {
            NodeKind::Unit { imports, body } => NodeKind::Unit {
                imports: imports.iter().map(|&c| self.graft(from, c, bind)).collect(),
                body: body.iter().map(|&c| self.graft(from, c, bind)).collect(),
            },
            NodeKind::Import { path } => NodeKind::Import { path: path.clone() },
            NodeKind::Decl { name, value } => NodeKind::Decl {
                name: name.clone(),
                value: self.graft(from, *value, bind),
            },
            NodeKind::Assignment { target, value } => NodeKind::Assignment {
                target: self.graft(from, *target, bind),
                value: self.graft(from, *value, bind),
            },
            NodeKind::Call {
                receiver,
                name,
                args,
                block,
            } => NodeKind::Call {
                receiver: receiver.map(|c| self.graft(from, c, bind)),
                name: name.clone(),
                args: args.iter().map(|&c| self.graft(from, c, bind)).collect(),
                block: block.map(|c| self.graft(from, c, bind)),
            },
            NodeKind::New { class, args } => NodeKind::New {
                class: class.clone(),
                args: args.iter().map(|&c| self.graft(from, c, bind)).collect(),
            },
            NodeKind::FieldAccess { target, name } => NodeKind::FieldAccess {
                target: self.graft(from, *target, bind),
                name: name.clone(),
            },
            NodeKind::Index { target, index } => NodeKind::Index {
                target: self.graft(from, *target, bind),
                index: self.graft(from, *index, bind),
            },
            NodeKind::Identifier(name) => NodeKind::Identifier(name.clone()),
            NodeKind::StringLit(value) => NodeKind::StringLit(value.clone()),
            NodeKind::NumberLit(value) => NodeKind::NumberLit(*value),
            NodeKind::BoolLit(value) => NodeKind::BoolLit(*value),
            NodeKind::ArrayLit(elements) => NodeKind::ArrayLit(
                elements.iter().map(|&c| self.graft(from, c, bind)).collect(),
            ),
            NodeKind::Block(statements) => NodeKind::Block(
                statements
                    .iter()
                    .map(|&c| self.graft(from, c, bind))
                    .collect(),
            ),
            NodeKind::Placeholder { .. } => unreachable!("handled above"),
        };
        self.alloc_typed(kind, node.ty.clone())
    }

    /// Walk the subtree at `root` top-down, calling `visit` on every node.
    pub fn walk(&self, root: NodeId, visit: &mut impl FnMut(NodeId)) {
        visit(root);
        for child in self.children(root) {
            self.walk(child, visit);
        }
    }

    /// Simple member name of a call, field access, declaration or
    /// identifier; `None` for shapes that carry no name.
    pub fn simple_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Call { name, .. }
            | NodeKind::FieldAccess { name, .. }
            | NodeKind::Decl { name, .. } => Some(name),
            NodeKind::Identifier(name) => Some(name),
            NodeKind::New { class, .. } => Some(class),
            _ => None,
        }
    }

    /// Flatten a (possibly multi-hop) field access or identifier into its
    /// dot-joined component names: `a.b.c` yields `"a.b.c"`, not one opaque
    /// token. Returns `None` for any other shape.
    pub fn flatten_path(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::Identifier(name) => Some(name.clone()),
            NodeKind::FieldAccess { target, name } => {
                let prefix = self.flatten_path(*target)?;
                Some(format!("{prefix}.{name}"))
            }
            _ => None,
        }
    }

    /// Import paths currently present on the unit root.
    pub fn import_paths(&self) -> Vec<String> {
        match self.kind(self.root) {
            NodeKind::Unit { imports, .. } => imports
                .iter()
                .filter_map(|&id| match self.kind(id) {
                    NodeKind::Import { path } => Some(path.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}
