// Structural signature matching over call, constructor and field-access
// nodes. Matching is pure: it reads resolved type metadata, performs no
// inference, and answers false for anything it cannot classify.

use std::fmt;

use regex::Regex;

use crate::parser::{parse_type_name, SymbolTable};
use crate::rewrite::errors::RewriteError;
use crate::tree::{NodeId, NodeKind, SyntaxTree, TypeRef};

/// Member name used by constructor signatures.
pub const CONSTRUCTOR: &str = "<constructor>";

/// One parameter slot of a signature.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamPattern {
    /// Exact resolved type: `byte[]`, `String`.
    Type(TypeRef),
    /// `*`: any argument.
    Any,
    /// `*[]`: any array-typed argument.
    AnyArray,
    /// `T+`: any argument whose named type is `T` or a declared subtype.
    SubtypeOf(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Params {
    /// `..`: arity unconstrained.
    AnyArguments,
    Exact(Vec<ParamPattern>),
}

/// A structural pattern identifying a member by owner, name and parameter
/// shape. Parsed from compact text such as:
///
/// ```text
/// legacy.util.LegacyCodec encodeToString(byte[])
/// java.util.List+ toArray()
/// metrics.Registry counter(String, ..)
/// legacy.util.LegacyCodec <constructor>()
/// ```
///
/// `+` after the owner widens the match to declared subtypes; `*` in the
/// member name is a wildcard.
#[derive(Debug, Clone)]
pub struct Signature {
    owner: String,
    match_subtypes: bool,
    name: String,
    name_pattern: Option<Regex>,
    params: Params,
}

impl Signature {
    pub fn parse(pattern: &str) -> Result<Signature, RewriteError> {
        let text = pattern.trim();
        let (head, rest) = text
            .split_once(char::is_whitespace)
            .ok_or_else(|| RewriteError::signature_pattern(pattern, "missing member name"))?;

        let (owner, match_subtypes) = match head.strip_suffix('+') {
            Some(owner) => (owner.to_string(), true),
            None => (head.to_string(), false),
        };

        let rest = rest.trim();
        let open = rest
            .find('(')
            .ok_or_else(|| RewriteError::signature_pattern(pattern, "missing parameter list"))?;
        let close = rest
            .rfind(')')
            .ok_or_else(|| RewriteError::signature_pattern(pattern, "unclosed parameter list"))?;
        let name = rest[..open].trim().to_string();
        if name.is_empty() {
            return Err(RewriteError::signature_pattern(pattern, "empty member name"));
        }
        let param_text = rest[open + 1..close].trim();

        let params = if param_text == ".." {
            Params::AnyArguments
        } else if param_text.is_empty() {
            Params::Exact(Vec::new())
        } else {
            Params::Exact(
                param_text
                    .split(',')
                    .map(|p| Self::parse_param(p.trim()))
                    .collect(),
            )
        };

        let name_pattern = if name.contains('*') {
            let escaped = name.split('*').map(regex::escape).collect::<Vec<_>>();
            let source = format!("^{}$", escaped.join(".*"));
            Some(Regex::new(&source).map_err(|e| {
                RewriteError::signature_pattern(pattern, format!("bad name wildcard: {e}"))
            })?)
        } else {
            None
        };

        Ok(Signature {
            owner,
            match_subtypes,
            name,
            name_pattern,
            params,
        })
    }

    fn parse_param(text: &str) -> ParamPattern {
        match text {
            "*" => ParamPattern::Any,
            "*[]" => ParamPattern::AnyArray,
            _ => match text.strip_suffix('+') {
                Some(name) => ParamPattern::SubtypeOf(name.to_string()),
                None => ParamPattern::Type(parse_type_name(text)),
            },
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn member_name(&self) -> &str {
        &self.name
    }

    /// Whether this node matches the signature. Unclassifiable node kinds
    /// and unresolved receiver types answer false.
    pub fn matches(&self, tree: &SyntaxTree, symbols: &SymbolTable, id: NodeId) -> bool {
        match tree.kind(id) {
            NodeKind::Call {
                receiver: Some(receiver),
                name,
                args,
                ..
            } => {
                self.name != CONSTRUCTOR
                    && self.name_matches(name)
                    && self.owner_matches(tree.ty(*receiver), symbols)
                    && self.args_match(tree, symbols, args)
            }
            NodeKind::New { args, .. } => {
                self.name == CONSTRUCTOR
                    && self.owner_matches(tree.ty(id), symbols)
                    && self.args_match(tree, symbols, args)
            }
            // A field access is a member with no argument list.
            NodeKind::FieldAccess { target, name } => {
                matches!(self.params, Params::Exact(ref p) if p.is_empty())
                    && self.name_matches(name)
                    && self.owner_matches(tree.ty(*target), symbols)
            }
            _ => false,
        }
    }

    fn name_matches(&self, name: &str) -> bool {
        match &self.name_pattern {
            Some(pattern) => pattern.is_match(name),
            None => self.name == name,
        }
    }

    fn owner_matches(&self, ty: &TypeRef, symbols: &SymbolTable) -> bool {
        match ty.name() {
            Some(owner) if self.match_subtypes => symbols.is_subtype(owner, &self.owner),
            Some(owner) => owner == self.owner,
            None => false,
        }
    }

    fn args_match(&self, tree: &SyntaxTree, symbols: &SymbolTable, args: &[NodeId]) -> bool {
        let patterns = match &self.params {
            Params::AnyArguments => return true,
            Params::Exact(patterns) => patterns,
        };
        if args.len() != patterns.len() {
            return false;
        }
        patterns
            .iter()
            .zip(args)
            .all(|(pattern, &arg)| Self::param_matches(pattern, tree.ty(arg), symbols))
    }

    fn param_matches(pattern: &ParamPattern, ty: &TypeRef, symbols: &SymbolTable) -> bool {
        match pattern {
            ParamPattern::Any => true,
            ParamPattern::AnyArray => ty.is_array(),
            ParamPattern::Type(required) => ty == required,
            ParamPattern::SubtypeOf(sup) => match ty.name() {
                Some(name) => symbols.is_subtype(name, sup),
                None => false,
            },
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.owner)?;
        if self.match_subtypes {
            write!(f, "+")?;
        }
        write!(f, " {}(", self.name)?;
        match &self.params {
            Params::AnyArguments => write!(f, "..")?,
            Params::Exact(patterns) => {
                for (i, pattern) in patterns.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match pattern {
                        ParamPattern::Any => write!(f, "*")?,
                        ParamPattern::AnyArray => write!(f, "*[]")?,
                        ParamPattern::Type(ty) => write!(f, "{ty}")?,
                        ParamPattern::SubtypeOf(name) => write!(f, "{name}+")?,
                    }
                }
            }
        }
        write!(f, ")")
    }
}
