#![cfg(test)]

use pretty_assertions::assert_eq;

use protodesc::registry::{global_files, global_types};
use protodesc::types::{Cardinality, Kind};
use protodesc::{load_literal_json, register_literal, to_literal, to_wire, Builder, Descriptor, Error};

const INVENTORY: &str = r#"{
    "path": "sdk/inventory.proto",
    "package": "sdk.inventory",
    "syntax": "proto3",
    "enums": [
        { "name": "State", "values": [ { "name": "UNKNOWN", "number": 0 }, { "name": "STOCKED", "number": 1 } ] }
    ],
    "messages": [
        {
            "name": "Item",
            "fields": [
                { "name": "sku", "number": 1, "kind": "string" },
                { "name": "state", "number": 2, "kind": "enum", "type_name": ".sdk.inventory.State" },
                { "name": "counts", "number": 3, "kind": "int32", "cardinality": "repeated" }
            ]
        }
    ]
}"#;

#[test]
fn test_load_and_register() {
    let tree = load_literal_json(INVENTORY).expect("Failed to parse literal");
    let built = register_literal(tree.clone()).expect("Failed to register");

    // Check
    let found = global_files().find_file_by_path("sdk/inventory.proto").expect("file is registered");
    assert_eq!(found, built.file);
    let item = global_types()
        .find_message("sdk.inventory.Item")
        .expect("message is registered");
    assert!(!built.file.is_initialized());

    let state = item.field_by_name("state").expect("field exists");
    assert_eq!(state.kind(), Kind::Enum);
    assert_eq!(state.enum_type().map(|e| e.full_name().to_owned()).as_deref(), Some("sdk.inventory.State"));

    let counts = item.field_by_number(3).expect("field exists");
    assert_eq!(counts.cardinality(), Cardinality::Repeated);
    assert!(counts.is_packed());

    // Registering the same path again fails but still builds the file.
    match register_literal(tree) {
        Err(Error::Descriptor(err)) => assert_eq!(err.to_string(), "file \"sdk/inventory.proto\" is already registered"),
        other => panic!("expected a duplicate file error, got {:?}", other.map(|b| b.file)),
    }
}

#[test]
fn test_invalid_literal() {
    let err = load_literal_json(r#"{ "messages": [ { "fields": [ { "name": "x" } ] } ] }"#).unwrap_err();
    assert!(matches!(err, Error::Literal(_)));
}

#[test]
fn test_describe_round_trip() {
    let mut tree = load_literal_json(INVENTORY).expect("Failed to parse literal");
    tree.path = "sdk/described.proto".into();
    tree.package = "sdk.described".into();
    tree.messages[0].fields[1].type_name = ".sdk.described.State".into();
    let built = protodesc::LiteralBuilder::new(tree).build();

    let json = protodesc::describe_to_json(&built.file).expect("Failed to describe");
    let reloaded = load_literal_json(&json).expect("Failed to parse description");
    assert_eq!(reloaded, to_literal(&built.file));

    // Check the encoded form builds the same declarations.
    let wire = to_wire(&built.file).expect("not a placeholder");
    let rebuilt = Builder::new(wire.raw)
        .with_handles(wire.handles)
        .with_dependency_indexes(wire.dependency_indexes)
        .build();
    let names: Vec<_> = rebuilt.messages.iter().map(|m| Descriptor::full_name(m).to_owned()).collect();
    assert_eq!(names, vec!["sdk.described.Item".to_owned()]);
}
