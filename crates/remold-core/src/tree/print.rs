// Source rendering from the arena tree. This is the seam toward the
// downstream serializer: it renders canonical formatting; byte-exact
// preservation of untouched regions belongs to the outer tooling layer.

use super::{NodeId, NodeKind, PlaceholderKind, SyntaxTree};

/// Types that can render themselves back to source text.
pub trait ToSource {
    fn to_source(&self) -> String;
}

impl ToSource for SyntaxTree {
    fn to_source(&self) -> String {
        render_node(self, self.root(), 0)
    }
}

/// Render one subtree. `indent` is the nesting depth of the node itself;
/// containers indent their children, nodes never pad themselves.
pub fn render_node(tree: &SyntaxTree, id: NodeId, indent: usize) -> String {
    match tree.kind(id) {
        NodeKind::Unit { imports, body } => {
            let mut out = String::new();
            for &import in imports {
                out.push_str(&render_node(tree, import, 0));
                out.push('\n');
            }
            if !imports.is_empty() && !body.is_empty() {
                out.push('\n');
            }
            for &stmt in body {
                out.push_str(&render_node(tree, stmt, 0));
                out.push('\n');
            }
            out
        }
        NodeKind::Import { path } => format!("import {path}"),
        NodeKind::Decl { name, value } => {
            format!("def {name} = {}", render_node(tree, *value, indent))
        }
        NodeKind::Assignment { target, value } => format!(
            "{} = {}",
            render_node(tree, *target, 0),
            render_node(tree, *value, indent)
        ),
        NodeKind::Call {
            receiver,
            name,
            args,
            block,
        } => {
            let mut out = String::new();
            if let Some(recv) = receiver {
                out.push_str(&render_node(tree, *recv, indent));
                out.push('.');
            }
            out.push_str(name);
            // DSL form `name { ... }` keeps its parenless shape.
            if !(args.is_empty() && block.is_some()) {
                out.push('(');
                out.push_str(&render_args(tree, args));
                out.push(')');
            }
            if let Some(block) = block {
                out.push(' ');
                out.push_str(&render_node(tree, *block, indent));
            }
            out
        }
        NodeKind::New { class, args } => {
            format!("new {class}({})", render_args(tree, args))
        }
        NodeKind::FieldAccess { target, name } => {
            format!("{}.{name}", render_node(tree, *target, 0))
        }
        NodeKind::Index { target, index } => format!(
            "{}[{}]",
            render_node(tree, *target, 0),
            render_node(tree, *index, 0)
        ),
        NodeKind::Identifier(name) => name.clone(),
        NodeKind::StringLit(value) => format!("\"{value}\""),
        NodeKind::NumberLit(value) => value.to_string(),
        NodeKind::BoolLit(value) => value.to_string(),
        NodeKind::ArrayLit(elements) => format!("[{}]", render_args(tree, elements)),
        NodeKind::Block(statements) => {
            let pad = "    ".repeat(indent);
            let child_pad = "    ".repeat(indent + 1);
            let mut out = String::from("{\n");
            for &stmt in statements {
                out.push_str(&child_pad);
                out.push_str(&render_node(tree, stmt, indent + 1));
                out.push('\n');
            }
            out.push_str(&pad);
            out.push('}');
            out
        }
        NodeKind::Placeholder { index, kind } => match kind {
            PlaceholderKind::Expr(_) => format!("#{{any:{index}}}"),
            PlaceholderKind::Array(_) => format!("#{{anyArray:{index}}}"),
        },
    }
}

fn render_args(tree: &SyntaxTree, args: &[NodeId]) -> String {
    args.iter()
        .map(|&arg| render_node(tree, arg, 0))
        .collect::<Vec<_>>()
        .join(", ")
}
