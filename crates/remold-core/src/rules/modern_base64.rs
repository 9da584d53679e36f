// Migrates the legacy codec API to the modern encoder: instance and static
// `encodeToString(byte[])` calls become `Modern.getEncoder().encodeToString(..)`,
// bare constructions of the legacy codec become `Modern.getEncoder()`, and
// the legacy import is dropped once nothing else references it.

use crate::rewrite::{Precondition, Rewriter, Rule, Signature, Template};
use crate::tree::{NodeId, NodeKind};

const LEGACY_CODEC: &str = "legacy.util.LegacyCodec";
const MODERN: &str = "modern.util.Modern";

pub struct UseModernBase64 {
    encode_call: Signature,
    legacy_ctor: Signature,
    encode_template: Template,
    encoder_template: Template,
}

impl UseModernBase64 {
    pub fn new() -> Self {
        let encode_call = Signature::parse("legacy.util.LegacyCodec encodeToString(byte[])")
            .expect("valid signature pattern");
        let legacy_ctor = Signature::parse("legacy.util.LegacyCodec <constructor>()")
            .expect("valid signature pattern");
        let encode_template =
            Template::builder("Modern.getEncoder().encodeToString(#{anyArray(byte)})")
                .imports([MODERN])
                .build()
                .expect("valid template snippet");
        let encoder_template = Template::builder("Modern.getEncoder()")
            .imports([MODERN])
            .build()
            .expect("valid template snippet");
        UseModernBase64 {
            encode_call,
            legacy_ctor,
            encode_template,
            encoder_template,
        }
    }
}

impl Default for UseModernBase64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Rule for UseModernBase64 {
    fn name(&self) -> &'static str {
        "UseModernBase64"
    }

    fn precondition(&self) -> Precondition {
        Precondition::UsesType(LEGACY_CODEC.to_string())
    }

    fn rewrite(&self, rw: &mut Rewriter<'_>, node: NodeId) -> Option<NodeId> {
        if self.encode_call.matches(rw.tree(), rw.symbols(), node) {
            let payload = match rw.tree().kind(node) {
                NodeKind::Call { args, .. } => args[0],
                _ => return None,
            };
            let replacement = rw.apply_template(&self.encode_template, node, &[payload])?;
            rw.remove_import(LEGACY_CODEC);
            return Some(replacement);
        }
        if self.legacy_ctor.matches(rw.tree(), rw.symbols(), node) {
            let replacement = rw.apply_template(&self.encoder_template, node, &[])?;
            rw.remove_import(LEGACY_CODEC);
            return Some(replacement);
        }
        None
    }
}
