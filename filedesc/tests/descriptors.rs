#![cfg(test)]

use std::sync::Arc;

use protodesc_filedesc::{
    Builder, Cardinality, DeclKind, DefaultValue, DescriptorError, FieldLiteral, FileLiteral, FileRegistry,
    ImportLiteral, Kind, LiteralBuilder, MessageLiteral, OptionsRegistry, RawOptions, Registries, Syntax,
    TypeHandle, TypeRegistry,
};
use protodesc_filedesc::{EnumLiteral, EnumValueLiteral, MethodLiteral, ServiceLiteral};
use protodesc_wire::ByteBufferMut;

fn enum_of(name: &str, values: &[(&str, i32)]) -> EnumLiteral {
    EnumLiteral {
        name: name.into(),
        values: values
            .iter()
            .map(|&(name, number)| EnumValueLiteral { name: name.into(), number, ..Default::default() })
            .collect(),
        ..Default::default()
    }
}

/// `message M { optional M1 f1 = 1; message M1 { repeated float f2 = 2; } }`
fn m_and_m1(syntax: Syntax) -> FileLiteral {
    FileLiteral {
        path: "test.proto".into(),
        syntax,
        messages: vec![MessageLiteral {
            name: "M".into(),
            fields: vec![FieldLiteral::new("f1", 1, Kind::Message).typed(".M.M1")],
            messages: vec![MessageLiteral {
                name: "M1".into(),
                fields: vec![FieldLiteral::new("f2", 2, Kind::Float).repeated()],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn m_handles() -> Vec<TypeHandle> {
    vec![TypeHandle::declared("M"), TypeHandle::declared("M1")]
}

#[test]
fn test_m_and_m1_from_wire() {
    for (syntax, packed) in [(Syntax::Proto2, false), (Syntax::Proto3, true)] {
        let built = Builder::new(m_and_m1(syntax).encode())
            .with_handles(m_handles())
            .with_dependency_indexes(vec![1])
            .build();

        // Check the file shell
        assert_eq!(built.file.path(), "test.proto");
        assert_eq!(built.file.syntax(), syntax);
        assert_eq!(built.messages.len(), 2);

        // Check M
        let m = &built.messages[0];
        assert_eq!(m.full_name(), "M");
        let f1 = m.field_by_number(1).expect("f1");
        assert_eq!(f1.kind(), Kind::Message);
        assert_eq!(f1.cardinality(), Cardinality::Optional);
        assert_eq!(f1.message_type().as_ref(), Some(&built.messages[1]));

        // Check M1
        let m1 = &built.messages[1];
        assert_eq!(m1.full_name(), "M.M1");
        assert_eq!(m1.parent_message().as_ref(), Some(m));
        let f2 = m1.field_by_name("f2").expect("f2");
        assert_eq!(f2.kind(), Kind::Float);
        assert_eq!(f2.cardinality(), Cardinality::Repeated);
        assert_eq!(f2.is_packed(), packed);
        assert_eq!(f2.json_name(), "f2");
    }
}

#[test]
fn test_handles_follow_flattened_order() {
    let tree = FileLiteral {
        path: "deep.proto".into(),
        package: "deep".into(),
        enums: vec![enum_of("Top", &[("TOP", 0)])],
        messages: vec![
            MessageLiteral {
                name: "A".into(),
                enums: vec![enum_of("AE", &[("AE0", 0)])],
                messages: vec![
                    MessageLiteral {
                        name: "B".into(),
                        messages: vec![MessageLiteral { name: "C".into(), ..Default::default() }],
                        enums: vec![enum_of("BE", &[("BE0", 0)])],
                        ..Default::default()
                    },
                    MessageLiteral { name: "AEntry".into(), is_map_entry: true, ..Default::default() },
                ],
                ..Default::default()
            },
            MessageLiteral { name: "D".into(), ..Default::default() },
        ],
        ..Default::default()
    };

    // enums: Top, AE, BE; messages: A, D, B, AEntry, C
    let handles = vec![
        TypeHandle::declared("deep.Top"),
        TypeHandle::declared("deep.A.AE"),
        TypeHandle::declared("deep.A.B.BE"),
        TypeHandle::declared("deep.A"),
        TypeHandle::declared("deep.D"),
        TypeHandle::declared("deep.A.B"),
        TypeHandle::Vacant,
        TypeHandle::declared("deep.A.B.C"),
    ];
    let built = Builder::new(tree.encode()).with_handles(handles).build();

    for e in &built.enums {
        assert_eq!(e.type_handle(), Some(e.full_name()));
    }
    for m in &built.messages {
        if m.is_map_entry() {
            assert_eq!(m.type_handle(), None);
        } else {
            assert_eq!(m.type_handle(), Some(m.full_name()));
        }
    }
    assert!(!built.file.is_initialized());
}

#[test]
fn test_dependency_subranges() {
    let tree = FileLiteral {
        path: "order.proto".into(),
        package: "ord".into(),
        enums: vec![enum_of("E", &[("ZERO", 0), ("ONE", 1)])],
        messages: vec![MessageLiteral {
            name: "M".into(),
            fields: vec![
                FieldLiteral::new("e", 1, Kind::Enum).typed(".ord.E").with_default("ONE"),
                FieldLiteral::new("n", 2, Kind::Int64),
            ],
            extension_ranges: vec![protodesc_filedesc::ExtensionRangeLiteral { start: 10, end: 20, ..Default::default() }],
            ..Default::default()
        }],
        extensions: vec![FieldLiteral::new("x", 10, Kind::Enum).typed(".ord.E").extending(".ord.M")],
        services: vec![ServiceLiteral {
            name: "S".into(),
            methods: vec![MethodLiteral {
                name: "Call".into(),
                input_type: ".ord.M".into(),
                output_type: ".ord.M".into(),
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    // extendee, field types, extension types, method input/output
    let built = Builder::new(tree.encode())
        .with_handles(vec![TypeHandle::declared("E"), TypeHandle::declared("M")])
        .with_dependency_indexes(vec![1, 0, 0, 1, 1])
        .build();

    let (e, m) = (&built.enums[0], &built.messages[0]);
    let x = &built.extensions[0];
    assert_eq!(x.extendee().as_ref(), Some(m));
    assert_eq!(x.enum_type().as_ref(), Some(e));

    let field = m.field_by_name("e").expect("e");
    assert_eq!(field.enum_type().as_ref(), Some(e));
    assert_eq!(field.default_value(), Some(DefaultValue::Enum(1)));
    assert_eq!(field.default_enum_value().expect("default").full_name(), "ord.ONE");

    let call = built.services[0].method_by_name("Call").expect("Call");
    assert_eq!(&call.input(), m);
    assert_eq!(&call.output(), m);
}

#[test]
#[should_panic(expected = "insufficient dependencies")]
fn test_dependency_list_too_short() {
    let built = Builder::new(m_and_m1(Syntax::Proto2).encode()).with_handles(m_handles()).build();
    built.messages[0].fields().count();
}

#[test]
#[should_panic(expected = "unused dependencies")]
fn test_dependency_list_too_long() {
    let built = Builder::new(m_and_m1(Syntax::Proto2).encode())
        .with_handles(m_handles())
        .with_dependency_indexes(vec![1, 0])
        .build();
    built.messages[0].fields().count();
}

#[test]
#[should_panic(expected = "is a message, want an enum")]
fn test_dependency_kind_mismatch() {
    let tree = FileLiteral {
        path: "kind.proto".into(),
        enums: vec![enum_of("E", &[("A", 0)])],
        messages: vec![MessageLiteral {
            name: "M".into(),
            fields: vec![FieldLiteral::new("e", 1, Kind::Enum).typed(".E")],
            ..Default::default()
        }],
        ..Default::default()
    };
    let built = Builder::new(tree.encode())
        .with_handles(vec![TypeHandle::declared("E"), TypeHandle::declared("M")])
        .with_dependency_indexes(vec![1])
        .build();
    built.messages[0].fields().count();
}

#[test]
#[should_panic(expected = "detected mutation on the default bytes for pkg.M.b")]
fn test_default_bytes_are_checked() {
    let tree = FileLiteral {
        path: "bytes.proto".into(),
        package: "pkg".into(),
        messages: vec![MessageLiteral {
            name: "M".into(),
            fields: vec![FieldLiteral::new("b", 1, Kind::Bytes).with_default("a\\001c")],
            ..Default::default()
        }],
        ..Default::default()
    };
    let built = LiteralBuilder::new(tree).build();
    let b = built.messages[0].field(0).expect("b");

    let value = b.default_value().expect("default");
    let bytes = value.as_bytes().expect("bytes");
    assert_eq!(bytes.to_vec(), b"a\x01c");

    bytes.write()[0] = b'z';
    b.default_value();
}

#[test]
fn test_name_resolution() {
    let tree = FileLiteral {
        path: "names.proto".into(),
        package: "pkg".into(),
        messages: vec![
            MessageLiteral {
                name: "Foo".into(),
                messages: vec![MessageLiteral {
                    name: "Bar".into(),
                    fields: vec![
                        FieldLiteral::new("baz", 1, Kind::Message).typed("pkg.Baz"),
                        FieldLiteral::new("missing", 2, Kind::Message).typed("pkg.Foo.NonExistent"),
                    ],
                    ..Default::default()
                }],
                ..Default::default()
            },
            MessageLiteral { name: "Baz".into(), ..Default::default() },
        ],
        ..Default::default()
    };
    let built = LiteralBuilder::new(tree).build();

    // messages: Foo, Baz, Foo.Bar
    let bar = &built.messages[2];
    assert_eq!(bar.full_name(), "pkg.Foo.Bar");

    let baz = bar.field_by_name("baz").expect("baz").message_type().expect("Baz");
    assert!(!baz.is_placeholder());
    assert_eq!(baz, built.messages[1]);

    let missing = bar.field_by_name("missing").expect("missing").message_type().expect("placeholder");
    assert!(missing.is_placeholder());
    assert_eq!(missing.full_name(), "pkg.Foo.NonExistent");
    assert_eq!(missing.name(), "NonExistent");
    assert_eq!(missing.fields().count(), 0);
}

#[test]
fn test_cross_file_enum_defaults() {
    let types = Arc::new(TypeRegistry::new());
    let registries = Registries { types: Some(types), ..Registries::none() };

    LiteralBuilder::new(FileLiteral {
        path: "color.proto".into(),
        package: "color".into(),
        enums: vec![enum_of("Color", &[("RED", 0), ("BLUE", 4)])],
        ..Default::default()
    })
    .with_registries(registries.clone())
    .build();

    let built = LiteralBuilder::new(FileLiteral {
        path: "paint.proto".into(),
        package: "paint".into(),
        messages: vec![MessageLiteral {
            name: "Can".into(),
            fields: vec![
                FieldLiteral::new("known", 1, Kind::Enum).typed(".color.Color").with_default("BLUE"),
                FieldLiteral::new("unknown", 2, Kind::Enum).typed(".nowhere.Shade").with_default("DARK"),
            ],
            ..Default::default()
        }],
        ..Default::default()
    })
    .with_registries(registries)
    .build();

    let can = &built.messages[0];
    let known = can.field_by_name("known").expect("known");
    assert_eq!(known.default_value(), Some(DefaultValue::Enum(4)));
    assert_eq!(known.default_enum_value().expect("BLUE").full_name(), "color.BLUE");

    let unknown = can.field_by_name("unknown").expect("unknown");
    assert!(unknown.enum_type().expect("placeholder").is_placeholder());
    assert_eq!(unknown.default_value(), Some(DefaultValue::Enum(0)));
    let value = unknown.default_enum_value().expect("placeholder value");
    assert!(value.is_placeholder());
    assert_eq!(value.full_name(), "nowhere.DARK");
}

#[test]
fn test_imports_and_duplicates() {
    let registries = Registries {
        files: Some(Arc::new(FileRegistry::new())),
        types: Some(Arc::new(TypeRegistry::new())),
        options: None,
    };
    let dep_tree = FileLiteral {
        path: "dep.proto".into(),
        package: "dep".into(),
        messages: vec![MessageLiteral { name: "D".into(), ..Default::default() }],
        ..Default::default()
    };
    let dep = LiteralBuilder::new(dep_tree.clone()).with_registries(registries.clone()).build();
    assert!(dep.errors.is_empty());

    let main = LiteralBuilder::new(FileLiteral {
        path: "main.proto".into(),
        package: "main".into(),
        imports: vec![
            ImportLiteral { path: "dep.proto".into(), public: true, ..Default::default() },
            ImportLiteral { path: "gone.proto".into(), weak: true, ..Default::default() },
        ],
        messages: vec![MessageLiteral {
            name: "M".into(),
            fields: vec![FieldLiteral::new("d", 1, Kind::Message).typed("dep.D")],
            ..Default::default()
        }],
        ..Default::default()
    })
    .with_registries(registries.clone())
    .build();

    let imports = main.file.imports();
    assert_eq!(imports.len(), 2);
    assert_eq!(imports[0].file, dep.file);
    assert!(imports[0].public);
    assert!(imports[1].file.is_placeholder());
    assert!(imports[1].weak);
    assert_eq!(
        main.messages[0].field(0).expect("d").message_type().as_ref(),
        Some(&dep.messages[0])
    );

    // A second build of the same file is usable but reports both clashes
    let again = LiteralBuilder::new(dep_tree).with_registries(registries.clone()).build();
    assert_eq!(
        again.errors,
        vec![
            DescriptorError::DuplicateFile { path: "dep.proto".into() },
            DescriptorError::DuplicateType { kind: "message", name: "dep.D".into() },
        ]
    );
    assert_eq!(again.messages[0].full_name(), "dep.D");

    let files = registries.files.expect("files");
    assert_eq!(files.files_by_package("dep"), vec![dep.file.clone()]);
}

#[test]
fn test_options_decode_on_demand() {
    let options = Arc::new(OptionsRegistry::new());
    options.register(DeclKind::Message, |raw: &[u8]| -> protodesc_filedesc::DecodedOptions { Arc::new(raw.len()) });

    let deprecated = vec![0x18, 0x01];
    let tree = FileLiteral {
        path: "opts.proto".into(),
        messages: vec![MessageLiteral {
            name: "M".into(),
            options: deprecated.clone(),
            fields: vec![FieldLiteral { options: deprecated.clone(), ..FieldLiteral::new("f", 1, Kind::Bool) }],
            ..Default::default()
        }],
        ..Default::default()
    };
    let built = LiteralBuilder::new(tree)
        .with_registries(Registries { options: Some(options), ..Registries::none() })
        .build();

    let m = &built.messages[0];
    assert_eq!(m.options().downcast_ref::<usize>(), Some(&2));
    assert_eq!(m.raw_options(), deprecated.as_slice());

    // No prototype for fields: the blob decodes schema-less
    let field_options = m.field(0).expect("f").options();
    let raw = field_options.downcast_ref::<RawOptions>().expect("raw options");
    assert_eq!(format!("{:?}", raw.0), "{3: 1}");
}

#[test]
#[should_panic(expected = "options requested on placeholder message pkg.Gone")]
fn test_placeholder_options_are_fatal() {
    protodesc_filedesc::MessageDescriptor::placeholder("pkg.Gone").options();
}

#[test]
fn test_split_message_options_merge() {
    // MessageOptions written as two chunks: {map_entry: true} then {deprecated: true}.
    let mut map_entry = ByteBufferMut::new();
    map_entry.write_bool_field(7, true);
    let mut deprecated = ByteBufferMut::new();
    deprecated.write_bool_field(3, true);

    let mut message = ByteBufferMut::new();
    message.write_string_field(1, "E");
    message.write_bytes_field(7, map_entry.as_slice());
    message.write_bytes_field(7, deprecated.as_slice());

    let mut file = ByteBufferMut::new();
    file.write_string_field(1, "split.proto");
    file.write_bytes_field(4, message.as_slice());

    let built = Builder::new(file.data()).with_handles(vec![TypeHandle::Vacant]).build();

    // Check
    let e = &built.messages[0];
    assert_eq!(e.full_name(), "E");
    assert!(e.is_map_entry());
    assert_eq!(e.type_handle(), None);
    assert_eq!(e.raw_options(), [0x38, 0x01, 0x18, 0x01]);
}
