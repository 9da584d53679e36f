// Parser module - the upstream collaborator of the rewrite engine. Parses
// the build-script fragment language into the arena tree; the resolver pass
// in `resolve` attaches type metadata afterwards.

use anyhow::{anyhow, bail, Result};
use pest::iterators::Pair;
use pest::Parser as PestParser;
use pest_derive::Parser;

use crate::tree::{NodeId, NodeKind, PlaceholderKind, SyntaxTree, TypeRef};

pub mod resolve;
pub use resolve::{resolve, resolve_subtree, SymbolTable};

#[cfg(test)]
mod tests;

#[cfg(test)]
mod resolve_tests;

#[derive(Parser)]
#[grammar = "parser/fragment.pest"]
struct FragmentParser;

/// Parse a whole input file into a tree rooted at a `Unit` node.
pub fn parse_unit(source: &str) -> Result<SyntaxTree> {
    let mut pairs = FragmentParser::parse(Rule::unit, source)
        .map_err(|e| anyhow!("parse error: {e}"))?;
    let unit = pairs.next().ok_or_else(|| anyhow!("empty parse result"))?;

    let mut builder = TreeBuilder::new();
    let mut imports = Vec::new();
    let mut body = Vec::new();
    for pair in unit.into_inner() {
        match pair.as_rule() {
            Rule::import_stmt => {
                let path = pair
                    .into_inner()
                    .next()
                    .ok_or_else(|| anyhow!("import without a path"))?
                    .as_str()
                    .to_string();
                imports.push(builder.tree.alloc(NodeKind::Import { path }));
            }
            Rule::statement => body.push(builder.statement(pair)?),
            Rule::EOI => {}
            other => bail!("unexpected rule in unit: {other:?}"),
        }
    }
    let root = builder.tree.alloc(NodeKind::Unit { imports, body });
    builder.tree.set_root(root);
    Ok(builder.tree)
}

/// Parse a template snippet: a single statement, rooted directly at that
/// statement node. Placeholder slots are numbered in source order.
pub fn parse_fragment(source: &str) -> Result<SyntaxTree> {
    let mut pairs = FragmentParser::parse(Rule::fragment, source)
        .map_err(|e| anyhow!("fragment parse error: {e}"))?;
    let fragment = pairs.next().ok_or_else(|| anyhow!("empty fragment"))?;

    let mut builder = TreeBuilder::new();
    let mut root = None;
    for pair in fragment.into_inner() {
        match pair.as_rule() {
            Rule::statement => root = Some(builder.statement(pair)?),
            Rule::EOI => {}
            other => bail!("unexpected rule in fragment: {other:?}"),
        }
    }
    let root = root.ok_or_else(|| anyhow!("fragment contained no statement"))?;
    builder.tree.set_root(root);
    Ok(builder.tree)
}

/// Parse a type name as written in a placeholder: `byte`, `String[]`,
/// `legacy.util.LegacyCodec`.
pub fn parse_type_name(text: &str) -> TypeRef {
    let mut base = text.trim();
    let mut depth = 0;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped;
        depth += 1;
    }
    let mut ty = TypeRef::named(base);
    for _ in 0..depth {
        ty = TypeRef::array_of(ty);
    }
    ty
}

struct TreeBuilder {
    tree: SyntaxTree,
    placeholders: usize,
}

impl TreeBuilder {
    fn new() -> Self {
        TreeBuilder {
            tree: SyntaxTree::new(),
            placeholders: 0,
        }
    }

    fn statement(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| anyhow!("empty statement"))?;
        match inner.as_rule() {
            Rule::decl => self.decl(inner),
            Rule::assignment => self.assignment(inner),
            Rule::expression => self.expression(inner),
            other => bail!("unexpected statement rule: {other:?}"),
        }
    }

    fn decl(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let mut inner = pair.into_inner();
        let name = inner
            .next()
            .ok_or_else(|| anyhow!("decl without a name"))?
            .as_str()
            .to_string();
        let value = self.expression(inner.next().ok_or_else(|| anyhow!("decl without a value"))?)?;
        Ok(self.tree.alloc(NodeKind::Decl { name, value }))
    }

    fn assignment(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let mut inner = pair.into_inner();
        let path = inner.next().ok_or_else(|| anyhow!("assignment without a target"))?;
        let target = self.path(path)?;
        let value =
            self.expression(inner.next().ok_or_else(|| anyhow!("assignment without a value"))?)?;
        Ok(self.tree.alloc(NodeKind::Assignment { target, value }))
    }

    /// A dotted target path becomes an identifier or a left-nested chain of
    /// field accesses.
    fn path(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let mut node = None;
        for ident in pair.into_inner() {
            let name = ident.as_str().to_string();
            node = Some(match node {
                None => self.tree.alloc(NodeKind::Identifier(name)),
                Some(target) => self.tree.alloc(NodeKind::FieldAccess { target, name }),
            });
        }
        node.ok_or_else(|| anyhow!("empty assignment target"))
    }

    fn expression(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let mut inner = pair.into_inner();
        let primary = inner.next().ok_or_else(|| anyhow!("empty expression"))?;
        let mut node = self.primary(primary)?;
        for postfix in inner {
            let suffix = postfix
                .into_inner()
                .next()
                .ok_or_else(|| anyhow!("empty postfix"))?;
            node = match suffix.as_rule() {
                Rule::call_suffix => {
                    let mut parts = suffix.into_inner();
                    let name = parts
                        .next()
                        .ok_or_else(|| anyhow!("call without a name"))?
                        .as_str()
                        .to_string();
                    let mut args = Vec::new();
                    let mut block = None;
                    for part in parts {
                        match part.as_rule() {
                            Rule::arg_list => args = self.arg_list(part)?,
                            Rule::block => block = Some(self.block(part)?),
                            other => bail!("unexpected call part: {other:?}"),
                        }
                    }
                    self.tree.alloc(NodeKind::Call {
                        receiver: Some(node),
                        name,
                        args,
                        block,
                    })
                }
                Rule::field_suffix => {
                    let name = suffix
                        .into_inner()
                        .next()
                        .ok_or_else(|| anyhow!("field access without a name"))?
                        .as_str()
                        .to_string();
                    self.tree.alloc(NodeKind::FieldAccess { target: node, name })
                }
                Rule::index_suffix => {
                    let index = self.expression(
                        suffix
                            .into_inner()
                            .next()
                            .ok_or_else(|| anyhow!("index without an expression"))?,
                    )?;
                    self.tree.alloc(NodeKind::Index {
                        target: node,
                        index,
                    })
                }
                other => bail!("unexpected postfix rule: {other:?}"),
            };
        }
        Ok(node)
    }

    fn primary(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| anyhow!("empty primary"))?;
        match inner.as_rule() {
            Rule::placeholder => self.placeholder(inner),
            Rule::new_expr => {
                let mut parts = inner.into_inner();
                let class = parts
                    .next()
                    .ok_or_else(|| anyhow!("new without a class"))?
                    .as_str()
                    .to_string();
                let args = match parts.next() {
                    Some(list) => self.arg_list(list)?,
                    None => Vec::new(),
                };
                Ok(self.tree.alloc(NodeKind::New { class, args }))
            }
            Rule::literal => self.literal(inner),
            Rule::array_lit => {
                let elements = inner
                    .into_inner()
                    .map(|e| self.expression(e))
                    .collect::<Result<Vec<_>>>()?;
                Ok(self.tree.alloc(NodeKind::ArrayLit(elements)))
            }
            Rule::bare_call => {
                let mut parts = inner.into_inner();
                let name = parts
                    .next()
                    .ok_or_else(|| anyhow!("call without a name"))?
                    .as_str()
                    .to_string();
                let mut args = Vec::new();
                let mut block = None;
                for part in parts {
                    match part.as_rule() {
                        Rule::arg_list => args = self.arg_list(part)?,
                        Rule::block => block = Some(self.block(part)?),
                        other => bail!("unexpected call part: {other:?}"),
                    }
                }
                Ok(self.tree.alloc(NodeKind::Call {
                    receiver: None,
                    name,
                    args,
                    block,
                }))
            }
            Rule::ident => {
                let name = inner.as_str().to_string();
                Ok(self.tree.alloc(NodeKind::Identifier(name)))
            }
            Rule::paren => self.expression(
                inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| anyhow!("empty parenthesized expression"))?,
            ),
            other => bail!("unexpected primary rule: {other:?}"),
        }
    }

    fn literal(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let inner = pair
            .into_inner()
            .next()
            .ok_or_else(|| anyhow!("empty literal"))?;
        match inner.as_rule() {
            Rule::string_lit => {
                let text = inner
                    .into_inner()
                    .next()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                Ok(self.tree.alloc(NodeKind::StringLit(text)))
            }
            Rule::number_lit => {
                let value: i64 = inner.as_str().parse()?;
                Ok(self.tree.alloc(NodeKind::NumberLit(value)))
            }
            Rule::bool_lit => {
                let value = inner.as_str() == "true";
                Ok(self.tree.alloc(NodeKind::BoolLit(value)))
            }
            other => bail!("unexpected literal rule: {other:?}"),
        }
    }

    fn placeholder(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let mut parts = pair.into_inner();
        let function = parts
            .next()
            .ok_or_else(|| anyhow!("placeholder without a function"))?
            .as_str()
            .to_string();
        let constraint = parts.next().map(|t| parse_type_name(t.as_str()));
        let kind = match function.as_str() {
            "any" => PlaceholderKind::Expr(constraint),
            "anyArray" => PlaceholderKind::Array(constraint),
            other => bail!("unknown placeholder function: {other}"),
        };
        let index = self.placeholders;
        self.placeholders += 1;
        Ok(self.tree.alloc(NodeKind::Placeholder { index, kind }))
    }

    fn arg_list(&mut self, pair: Pair<'_, Rule>) -> Result<Vec<NodeId>> {
        pair.into_inner().map(|e| self.expression(e)).collect()
    }

    fn block(&mut self, pair: Pair<'_, Rule>) -> Result<NodeId> {
        let statements = pair
            .into_inner()
            .map(|s| self.statement(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.tree.alloc(NodeKind::Block(statements)))
    }
}
