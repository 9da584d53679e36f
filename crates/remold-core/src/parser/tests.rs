use pretty_assertions::assert_eq;

use super::*;

#[test]
fn test_parse_imports_and_statements() {
    let source = "import legacy.util.LegacyCodec\n\ndef codec = new LegacyCodec()\n";
    let tree = parse_unit(source).unwrap();

    assert_eq!(tree.import_paths(), vec!["legacy.util.LegacyCodec"]);
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };
    assert_eq!(body.len(), 1);
    match tree.kind(body[0]) {
        NodeKind::Decl { name, value } => {
            assert_eq!(name, "codec");
            match tree.kind(*value) {
                NodeKind::New { class, args } => {
                    assert_eq!(class, "LegacyCodec");
                    assert!(args.is_empty());
                }
                other => panic!("expected constructor call, got {other:?}"),
            }
        }
        other => panic!("expected declaration, got {other:?}"),
    }
}

#[test]
fn test_parse_chained_method_call() {
    let tree = parse_unit("codec.encodeToString(data)\n").unwrap();
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };
    match tree.kind(body[0]) {
        NodeKind::Call {
            receiver: Some(receiver),
            name,
            args,
            block,
        } => {
            assert_eq!(name, "encodeToString");
            assert_eq!(args.len(), 1);
            assert!(block.is_none());
            assert_eq!(tree.kind(*receiver), &NodeKind::Identifier("codec".to_string()));
            assert_eq!(tree.kind(args[0]), &NodeKind::Identifier("data".to_string()));
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn test_parse_nested_dsl_blocks() {
    let source = "jacocoTestReport {\n    reports {\n        xml {\n            enabled = false\n        }\n    }\n}\n";
    let tree = parse_unit(source).unwrap();
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };

    // Walk down the three block levels to the assignment.
    let mut current = body[0];
    for expected in ["jacocoTestReport", "reports", "xml"] {
        match tree.kind(current).clone() {
            NodeKind::Call {
                receiver: None,
                name,
                args,
                block: Some(block),
            } => {
                assert_eq!(name, expected);
                assert!(args.is_empty());
                match tree.kind(block) {
                    NodeKind::Block(statements) => current = statements[0],
                    other => panic!("expected block, got {other:?}"),
                }
            }
            other => panic!("expected DSL call {expected}, got {other:?}"),
        }
    }
    match tree.kind(current) {
        NodeKind::Assignment { target, .. } => {
            assert_eq!(tree.kind(*target), &NodeKind::Identifier("enabled".to_string()));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_parse_dotted_assignment_target() {
    let tree = parse_unit("reports.xml.enabled = true\n").unwrap();
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };
    match tree.kind(body[0]) {
        NodeKind::Assignment { target, value } => {
            assert_eq!(tree.flatten_path(*target), Some("reports.xml.enabled".to_string()));
            assert_eq!(tree.kind(*value), &NodeKind::BoolLit(true));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_parse_array_literal_and_index() {
    let tree = parse_unit("builder.tags([\"region\", \"east\"])\npair[0]\n").unwrap();
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };
    match tree.kind(body[0]) {
        NodeKind::Call { args, .. } => match tree.kind(args[0]) {
            NodeKind::ArrayLit(elements) => assert_eq!(elements.len(), 2),
            other => panic!("expected array literal, got {other:?}"),
        },
        other => panic!("expected call, got {other:?}"),
    }
    match tree.kind(body[1]) {
        NodeKind::Index { index, .. } => {
            assert_eq!(tree.kind(*index), &NodeKind::NumberLit(0));
        }
        other => panic!("expected index access, got {other:?}"),
    }
}

#[test]
fn test_parse_fragment_numbers_placeholders_in_order() {
    let tree =
        parse_fragment("#{any(metrics.MeterBuilder)}.tag(#{any(String)}, #{anyArray(byte)})")
            .unwrap();
    let mut slots = Vec::new();
    tree.walk(tree.root(), &mut |id| {
        if let NodeKind::Placeholder { index, kind } = tree.kind(id) {
            slots.push((*index, kind.clone()));
        }
    });
    slots.sort_by_key(|(index, _)| *index);
    assert_eq!(slots.len(), 3);
    assert_eq!(
        slots[0].1,
        PlaceholderKind::Expr(Some(TypeRef::named("metrics.MeterBuilder")))
    );
    assert_eq!(slots[1].1, PlaceholderKind::Expr(Some(TypeRef::named("String"))));
    assert_eq!(
        slots[2].1,
        PlaceholderKind::Array(Some(TypeRef::named("byte")))
    );
}

#[test]
fn test_parse_single_quoted_strings() {
    let tree = parse_unit("name = 'jacoco'\n").unwrap();
    let body = match tree.kind(tree.root()) {
        NodeKind::Unit { body, .. } => body.clone(),
        other => panic!("expected unit root, got {other:?}"),
    };
    match tree.kind(body[0]) {
        NodeKind::Assignment { value, .. } => {
            assert_eq!(tree.kind(*value), &NodeKind::StringLit("jacoco".to_string()));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_parse_type_name_array_suffixes() {
    assert_eq!(parse_type_name("byte"), TypeRef::named("byte"));
    assert_eq!(
        parse_type_name("byte[]"),
        TypeRef::array_of(TypeRef::named("byte"))
    );
    assert_eq!(
        parse_type_name("String[][]"),
        TypeRef::array_of(TypeRef::array_of(TypeRef::named("String")))
    );
}

#[test]
fn test_parse_error_reports_position() {
    let err = parse_unit("def = broken").unwrap_err();
    assert!(err.to_string().contains("parse error"));
}
