use pretty_assertions::assert_eq;

use super::resolve::{resolve, SymbolTable};
use super::parse_unit;
use crate::tree::{NodeKind, TypeRef};

fn body_of(tree: &crate::tree::SyntaxTree) -> Vec<crate::tree::NodeId> {
    match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    }
}

#[test]
fn test_constructor_type_resolves_through_imports() {
    let mut tree = parse_unit("import legacy.util.LegacyCodec\ndef codec = new LegacyCodec()\n")
        .unwrap();
    resolve(&mut tree, &SymbolTable::new());

    let body = body_of(&tree);
    assert_eq!(
        tree.ty(body[0]),
        &TypeRef::named("legacy.util.LegacyCodec")
    );
}

#[test]
fn test_declared_variable_types_flow_to_uses() {
    let mut tree = parse_unit("codec.encodeToString(data)\n").unwrap();
    let mut symbols = SymbolTable::new();
    symbols.declare_var("codec", TypeRef::named("legacy.util.LegacyCodec"));
    symbols.declare_var("data", TypeRef::array_of(TypeRef::named("byte")));
    resolve(&mut tree, &symbols);

    let body = body_of(&tree);
    let (receiver, args) = match tree.kind(body[0]) {
        NodeKind::Call { receiver, args, .. } => (receiver.unwrap(), args.clone()),
        other => panic!("expected call, got {other:?}"),
    };
    assert_eq!(tree.ty(receiver), &TypeRef::named("legacy.util.LegacyCodec"));
    assert_eq!(
        tree.ty(args[0]),
        &TypeRef::array_of(TypeRef::named("byte"))
    );
}

#[test]
fn test_static_receiver_resolves_as_class_reference() {
    let mut tree = parse_unit("import legacy.util.LegacyCodec\nLegacyCodec.encodeToString(data)\n")
        .unwrap();
    let mut symbols = SymbolTable::new();
    symbols.declare_var("data", TypeRef::array_of(TypeRef::named("byte")));
    resolve(&mut tree, &symbols);

    let body = body_of(&tree);
    let receiver = match tree.kind(body[0]) {
        NodeKind::Call { receiver, .. } => receiver.unwrap(),
        other => panic!("expected call, got {other:?}"),
    };
    assert_eq!(tree.ty(receiver), &TypeRef::named("legacy.util.LegacyCodec"));
}

#[test]
fn test_method_registry_types_chained_calls() {
    let mut tree = parse_unit("registry.counter(\"cpu\").tags(pair)\n").unwrap();
    let mut symbols = SymbolTable::new();
    symbols.declare_var("registry", TypeRef::named("metrics.Registry"));
    symbols.declare_var("pair", TypeRef::array_of(TypeRef::named("String")));
    symbols.declare_method(
        "metrics.Registry",
        "counter",
        TypeRef::named("metrics.MeterBuilder"),
    );
    resolve(&mut tree, &symbols);

    let body = body_of(&tree);
    let inner = match tree.kind(body[0]) {
        NodeKind::Call { receiver, .. } => receiver.unwrap(),
        other => panic!("expected call, got {other:?}"),
    };
    assert_eq!(tree.ty(inner), &TypeRef::named("metrics.MeterBuilder"));
}

#[test]
fn test_array_literals_unify_element_types() {
    let mut tree = parse_unit("[\"a\", \"b\"]\n[1, \"b\"]\npair[0]\n").unwrap();
    let mut symbols = SymbolTable::new();
    symbols.declare_var("pair", TypeRef::array_of(TypeRef::named("String")));
    resolve(&mut tree, &symbols);

    let body = body_of(&tree);
    assert_eq!(
        tree.ty(body[0]),
        &TypeRef::array_of(TypeRef::named("String"))
    );
    // Mixed element types stay an array of unknown.
    assert_eq!(tree.ty(body[1]), &TypeRef::array_of(TypeRef::Unknown));
    // Index access produces the element type.
    assert_eq!(tree.ty(body[2]), &TypeRef::named("String"));
}

#[test]
fn test_unresolved_names_stay_unknown() {
    let mut tree = parse_unit("mystery.call(x)\n").unwrap();
    resolve(&mut tree, &SymbolTable::new());

    let body = body_of(&tree);
    let receiver = match tree.kind(body[0]) {
        NodeKind::Call { receiver, .. } => receiver.unwrap(),
        other => panic!("expected call, got {other:?}"),
    };
    assert_eq!(tree.ty(receiver), &TypeRef::Unknown);
}

#[test]
fn test_subtype_chain_and_assignability() {
    let mut symbols = SymbolTable::new();
    symbols.declare_subtype("app.TlsSocket", "app.Socket");
    symbols.declare_subtype("app.Socket", "app.Closeable");

    assert!(symbols.is_subtype("app.TlsSocket", "app.Closeable"));
    assert!(symbols.is_subtype("app.Socket", "app.Socket"));
    assert!(!symbols.is_subtype("app.Closeable", "app.TlsSocket"));

    assert!(symbols.assignable(
        &TypeRef::named("app.TlsSocket"),
        &TypeRef::named("app.Socket")
    ));
    assert!(!symbols.assignable(&TypeRef::Unknown, &TypeRef::named("app.Socket")));
    assert!(symbols.assignable(
        &TypeRef::array_of(TypeRef::named("app.TlsSocket")),
        &TypeRef::array_of(TypeRef::named("app.Socket"))
    ));
}

#[test]
fn test_is_referenced_ignores_import_statements() {
    let mut tree = parse_unit("import legacy.util.LegacyCodec\nother.work()\n").unwrap();
    let symbols = SymbolTable::new();
    resolve(&mut tree, &symbols);

    // Imported but never used in the body.
    assert!(!symbols.is_referenced(&tree, "legacy.util.LegacyCodec"));

    let mut used = parse_unit("import legacy.util.LegacyCodec\ndef c = new LegacyCodec()\n")
        .unwrap();
    resolve(&mut used, &symbols);
    assert!(symbols.is_referenced(&used, "legacy.util.LegacyCodec"));
}
