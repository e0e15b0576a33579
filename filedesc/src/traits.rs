use crate::enums::{EnumDescriptor, EnumValueDescriptor};
use crate::field::FieldDescriptor;
use crate::file::FileDescriptor;
use crate::message::{MessageDescriptor, OneofDescriptor};
use crate::registry::TypeDescriptor;
use crate::service::{MethodDescriptor, ServiceDescriptor};

/// Identity shared by every descriptor handle.
pub trait Descriptor {
    /// The last segment of the full name.
    fn name(&self) -> &str;

    /// Dotted, without a leading '.'.
    fn full_name(&self) -> &str;

    /// Whether this stands in for a declaration that could not be resolved.
    fn is_placeholder(&self) -> bool {
        false
    }
}

macro_rules! impl_descriptor {
    ($($ty:ty),* $(,)?) => {
        $(impl Descriptor for $ty {
            fn name(&self) -> &str {
                <$ty>::name(self)
            }

            fn full_name(&self) -> &str {
                <$ty>::full_name(self)
            }
        })*
    };
}

macro_rules! impl_placeholder_descriptor {
    ($($ty:ty),* $(,)?) => {
        $(impl Descriptor for $ty {
            fn name(&self) -> &str {
                <$ty>::name(self)
            }

            fn full_name(&self) -> &str {
                <$ty>::full_name(self)
            }

            fn is_placeholder(&self) -> bool {
                <$ty>::is_placeholder(self)
            }
        })*
    };
}

impl_descriptor!(FieldDescriptor, OneofDescriptor, ServiceDescriptor, MethodDescriptor);
impl_placeholder_descriptor!(EnumDescriptor, EnumValueDescriptor, MessageDescriptor);

/// Files are named by path; their full name is the package.
impl Descriptor for FileDescriptor {
    fn name(&self) -> &str {
        self.path()
    }

    fn full_name(&self) -> &str {
        self.package()
    }

    fn is_placeholder(&self) -> bool {
        FileDescriptor::is_placeholder(self)
    }
}

impl Descriptor for TypeDescriptor {
    fn name(&self) -> &str {
        self.as_dyn().name()
    }

    fn full_name(&self) -> &str {
        TypeDescriptor::full_name(self)
    }

    fn is_placeholder(&self) -> bool {
        self.as_dyn().is_placeholder()
    }
}

impl TypeDescriptor {
    pub fn as_dyn(&self) -> &dyn Descriptor {
        match self {
            TypeDescriptor::Enum(e) => e,
            TypeDescriptor::Message(m) => m,
            TypeDescriptor::Extension(x) => x,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(d: &dyn Descriptor) -> String {
        format!("{} ({}){}", d.name(), d.full_name(), if d.is_placeholder() { " ?" } else { "" })
    }

    #[test]
    fn placeholders_describe_themselves() {
        let m = TypeDescriptor::Message(MessageDescriptor::placeholder("pkg.Foo.Missing"));
        assert_eq!(describe(&m), "Missing (pkg.Foo.Missing) ?");
        assert_eq!(describe(&FileDescriptor::placeholder("a.proto")), "a.proto () ?");
    }
}
