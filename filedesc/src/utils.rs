use std::fmt;

/// Aborts construction: the encoded descriptor for `path` is structurally
/// broken. Inputs come from a trusted compiler, so there is no recovery.
pub(crate) fn malformed(path: &str, msg: impl fmt::Display) -> ! {
    panic!("malformed descriptor for {:?}: {}", path, msg);
}

/// Aborts construction: the caller supplied lists that do not line up with
/// the schema (handle counts, dependency indices, arena sizes).
pub(crate) fn mismatch(path: &str, msg: impl fmt::Display) -> ! {
    panic!("mismatching inputs for {:?}: {}", path, msg);
}

/// Aborts on a condition that can only come from misuse of a built
/// descriptor, such as a published default that was changed in place.
pub(crate) fn fatal(msg: impl fmt::Display) -> ! {
    panic!("{}", msg);
}

/// `parent.name`, or just `name` at the root of a file without package.
pub(crate) fn join_name(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        let mut full = String::with_capacity(parent.len() + 1 + name.len());
        full.push_str(parent);
        full.push('.');
        full.push_str(name);
        full
    }
}

/// The last dotted segment of a full name.
pub(crate) fn short_name(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(i) => &full_name[i + 1..],
        None => full_name,
    }
}

/// Everything before the last dotted segment of a full name.
pub(crate) fn parent_name(full_name: &str) -> &str {
    match full_name.rfind('.') {
        Some(i) => &full_name[..i],
        None => "",
    }
}

/// Converts a snake_case field name to the lowerCamelCase name used by the
/// JSON mapping: underscores are dropped and an ASCII lowercase letter that
/// follows one is uppercased.
pub fn json_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut was_underscore = false;

    for c in name.chars() {
        if c != '_' {
            if was_underscore && c.is_ascii_lowercase() {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        was_underscore = c == '_';
    }

    out
}
