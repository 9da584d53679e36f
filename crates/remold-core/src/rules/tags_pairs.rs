// Migrates array-valued metric tags to the key/value pair form:
// `.tags(["region", "east"])` becomes `.tag("region", "east")` using the
// literal elements directly, and `.tags(pair)` for an array-typed variable
// becomes `.tag(pair[0], pair[1])`.

use crate::rewrite::{Precondition, Rewriter, Rule, Signature, Template};
use crate::tree::{NodeId, NodeKind, TypeRef};

pub struct TagsArrayToPairs {
    tags_call: Signature,
    pair_template: Template,
}

impl TagsArrayToPairs {
    pub fn new() -> Self {
        let tags_call = Signature::parse("metrics.MeterBuilder tags(String[])")
            .expect("valid signature pattern");
        let pair_template =
            Template::builder("#{any(metrics.MeterBuilder)}.tag(#{any(String)}, #{any(String)})")
                .build()
                .expect("valid template snippet");
        TagsArrayToPairs {
            tags_call,
            pair_template,
        }
    }
}

impl Default for TagsArrayToPairs {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for TagsArrayToPairs {
    fn name(&self) -> &'static str {
        "TagsArrayToPairs"
    }

    fn precondition(&self) -> Precondition {
        Precondition::UsesMethod(self.tags_call.clone())
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        if !self.tags_call.matches(rw.tree(), rw.symbols(), node) {
            return None;
        }
        let (receiver, payload) = match rw.tree().kind(node) {
            NodeKind::Call {
                receiver: Some(receiver),
                args,
                ..
            } if args.len() == 1 => (*receiver, args[0]),
            _ => return None,
        };

        let (key, value) = match rw.tree().kind(payload).clone() {
            // Inline pair literal: use the two elements directly. Other
            // literal shapes are not a pair; leave them alone.
            NodeKind::ArrayLit(elements) => {
                if elements.len() != 2 {
                    return None;
                }
                (elements[0], elements[1])
            }
            // An array-typed expression: index into it.
            _ if rw.tree().ty(payload).is_array() => {
                let element_ty = rw
                    .tree()
                    .ty(payload)
                    .element()
                    .cloned()
                    .unwrap_or(TypeRef::Unknown);
                let key = indexed(rw, payload, 0, element_ty.clone());
                let value = indexed(rw, payload, 1, element_ty);
                (key, value)
            }
            _ => return None,
        };

        rw.apply_template(&self.pair_template, node, &[receiver, key, value])
    }
}

fn indexed(rw: &mut Rewriter<'_>, target: NodeId, position: i64, ty: TypeRef) -> NodeId {
    let index = rw
        .tree_mut()
        .alloc_typed(NodeKind::NumberLit(position), TypeRef::named("int"));
    rw.tree_mut()
        .alloc_typed(NodeKind::Index { target, index }, ty)
}
