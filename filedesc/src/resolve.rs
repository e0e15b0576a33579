//! Scoped resolution of dotted full names against one file's declarations.
//!
//! Starting from the referencing scope, walk outwards until reaching a scope
//! whose full name prefixes the target (the file root matches any target
//! when the package is empty), then walk inwards one segment at a time,
//! trying nested messages before nested enums.

use crate::file::FileInner;
use crate::seed::Parent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Found {
    Enum(usize),
    Message(usize),
}

/// `scope` is the arena index of the referencing message, or `None` at the
/// file root. A leading '.' on `target` is ignored.
pub(crate) fn resolve(file: &FileInner, scope: Option<usize>, target: &str) -> Option<Found> {
    let target = target.strip_prefix('.').unwrap_or(target);
    if target.is_empty() {
        return None;
    }

    let mut scope = scope;
    loop {
        match scope {
            Some(m) => {
                let base = &file.messages[m].base;
                if target == base.full_name {
                    return Some(Found::Message(m));
                }
                if let Some(rest) = strip_scope(target, &base.full_name) {
                    return descend(file, Some(m), rest);
                }
                scope = match base.parent {
                    Parent::File => None,
                    Parent::Message(parent) => Some(parent),
                };
            }
            None if file.package.is_empty() => return descend(file, None, target),
            None => return strip_scope(target, &file.package).and_then(|rest| descend(file, None, rest)),
        }
    }
}

fn strip_scope<'a>(target: &'a str, scope: &str) -> Option<&'a str> {
    target.strip_prefix(scope)?.strip_prefix('.')
}

fn descend(file: &FileInner, mut scope: Option<usize>, rest: &str) -> Option<Found> {
    let mut segments = rest.split('.').peekable();

    while let Some(segment) = segments.next() {
        let last = segments.peek().is_none();
        let (messages, enums) = match scope {
            None => (file.top.messages.clone(), file.top.enums.clone()),
            Some(m) => (file.messages[m].messages.clone(), file.messages[m].enums.clone()),
        };

        if let Some(m) = messages.into_iter().find(|&i| file.messages[i].base.name == segment) {
            if last {
                return Some(Found::Message(m));
            }
            scope = Some(m);
            continue;
        }

        // Enums have no nested declarations.
        return enums
            .into_iter()
            .find(|&i| file.enums[i].base.name == segment)
            .filter(|_| last)
            .map(Found::Enum);
    }

    None
}
