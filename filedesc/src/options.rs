//! Options blobs and their on-demand decoding.
//!
//! The engine does not know the options schema. Each declaration keeps its
//! encoded options and decodes them on first access with the prototype
//! registered for its [`DeclKind`], or as a [`RawOptions`] when none is.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use protodesc_wire::RawMessage;

use crate::types::DeclKind;
use crate::utils::malformed;

pub type DecodedOptions = Arc<dyn Any + Send + Sync>;

/// Decodes the options blob of one declaration kind.
pub trait OptionsPrototype: Send + Sync {
    fn decode(&self, raw: &[u8]) -> DecodedOptions;
}

impl<F> OptionsPrototype for F
where
    F: Fn(&[u8]) -> DecodedOptions + Send + Sync,
{
    fn decode(&self, raw: &[u8]) -> DecodedOptions {
        self(raw)
    }
}

/// Options decoded without a registered prototype.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawOptions(pub RawMessage);

#[derive(Default)]
pub struct OptionsRegistry {
    prototypes: RwLock<HashMap<DeclKind, Arc<dyn OptionsPrototype>>>,
}

impl OptionsRegistry {
    pub fn new() -> OptionsRegistry {
        OptionsRegistry::default()
    }

    /// Registers the prototype for `kind`, replacing any earlier one.
    pub fn register(&self, kind: DeclKind, prototype: impl OptionsPrototype + 'static) {
        self.prototypes.write().insert(kind, Arc::new(prototype));
    }

    pub fn get(&self, kind: DeclKind) -> Option<Arc<dyn OptionsPrototype>> {
        self.prototypes.read().get(&kind).cloned()
    }
}

/// An options blob plus its decoded form, computed once.
pub(crate) struct LazyOptions {
    kind: DeclKind,
    raw: Vec<u8>,
    decoded: OnceLock<DecodedOptions>,
}

impl LazyOptions {
    pub fn new(kind: DeclKind, raw: Vec<u8>) -> LazyOptions {
        LazyOptions {
            kind,
            raw,
            decoded: OnceLock::new(),
        }
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn get(&self, registry: Option<&OptionsRegistry>, owner: &str) -> DecodedOptions {
        self.decoded
            .get_or_init(|| match registry.and_then(|r| r.get(self.kind)) {
                Some(prototype) => prototype.decode(&self.raw),
                None => {
                    let message = RawMessage::decode(&self.raw)
                        .unwrap_or_else(|()| malformed(owner, format_args!("undecodable {:?} options", self.kind)));
                    Arc::new(RawOptions(message))
                }
            })
            .clone()
    }
}
