use std::fmt;
use std::sync::Arc;

use crate::file::{FileDescriptor, FileInner};
use crate::full::{MethodL2, ServiceL2};
use crate::message::MessageDescriptor;
use crate::options::DecodedOptions;

/// A handle to a service declaration.
#[derive(Clone)]
pub struct ServiceDescriptor {
    file: Arc<FileInner>,
    index: usize,
}

impl ServiceDescriptor {
    pub(crate) fn node(file: Arc<FileInner>, index: usize) -> ServiceDescriptor {
        ServiceDescriptor { file, index }
    }

    fn l2(&self) -> &ServiceL2 {
        &self.file.lazy().services[self.index]
    }

    pub fn name(&self) -> &str {
        &self.file.services[self.index].base.name
    }

    pub fn full_name(&self) -> &str {
        &self.file.services[self.index].base.full_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn file(&self) -> FileDescriptor {
        FileDescriptor::node(self.file.clone())
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodDescriptor> + '_ {
        (0..self.l2().methods.len()).map(|i| MethodDescriptor::new(self.file.clone(), self.index, i))
    }

    pub fn method_by_name(&self, name: &str) -> Option<MethodDescriptor> {
        let l2 = self.l2();
        let i = l2.by_name.find(name, || l2.methods.iter().map(|m| m.name.clone()))?;
        Some(MethodDescriptor::new(self.file.clone(), self.index, i))
    }

    pub fn options(&self) -> DecodedOptions {
        self.l2().options.get(self.file.options_registry(), self.full_name())
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().options.raw()
    }
}

impl PartialEq for ServiceDescriptor {
    fn eq(&self, other: &ServiceDescriptor) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.index == other.index
    }
}

impl Eq for ServiceDescriptor {}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceDescriptor").field(&self.full_name()).finish()
    }
}

/// A handle to one method of a service.
#[derive(Clone)]
pub struct MethodDescriptor {
    file: Arc<FileInner>,
    service: usize,
    index: usize,
}

impl MethodDescriptor {
    fn new(file: Arc<FileInner>, service: usize, index: usize) -> MethodDescriptor {
        MethodDescriptor { file, service, index }
    }

    fn l2(&self) -> &MethodL2 {
        &self.file.lazy().services[self.service].methods[self.index]
    }

    pub fn name(&self) -> &str {
        &self.l2().name
    }

    pub fn full_name(&self) -> &str {
        &self.l2().full_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn service(&self) -> ServiceDescriptor {
        ServiceDescriptor::node(self.file.clone(), self.service)
    }

    pub fn input(&self) -> MessageDescriptor {
        self.l2().input.descriptor(&self.file)
    }

    pub fn output(&self) -> MessageDescriptor {
        self.l2().output.descriptor(&self.file)
    }

    pub fn is_client_streaming(&self) -> bool {
        self.l2().client_streaming
    }

    pub fn is_server_streaming(&self) -> bool {
        self.l2().server_streaming
    }

    pub fn options(&self) -> DecodedOptions {
        self.l2().options.get(self.file.options_registry(), self.full_name())
    }

    pub fn raw_options(&self) -> &[u8] {
        self.l2().options.raw()
    }
}

impl PartialEq for MethodDescriptor {
    fn eq(&self, other: &MethodDescriptor) -> bool {
        Arc::ptr_eq(&self.file, &other.file) && self.service == other.service && self.index == other.index
    }
}

impl Eq for MethodDescriptor {}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodDescriptor").field(&self.full_name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::literal::*;
    use crate::LiteralBuilder;

    #[test]
    fn methods_bind_messages() {
        let tree = FileLiteral {
            path: "svc.proto".into(),
            package: "svc".into(),
            messages: vec![
                MessageLiteral { name: "Req".into(), ..Default::default() },
                MessageLiteral { name: "Resp".into(), ..Default::default() },
            ],
            services: vec![ServiceLiteral {
                name: "Echo".into(),
                methods: vec![
                    MethodLiteral {
                        name: "Say".into(),
                        input_type: ".svc.Req".into(),
                        output_type: ".svc.Resp".into(),
                        ..Default::default()
                    },
                    MethodLiteral {
                        name: "Stream".into(),
                        input_type: "svc.Req".into(),
                        output_type: "ext.Remote".into(),
                        server_streaming: true,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            }],
            ..Default::default()
        };

        let built = LiteralBuilder::new(tree).build();
        let echo = &built.services[0];
        assert_eq!(echo.full_name(), "svc.Echo");
        assert_eq!(echo.methods().count(), 2);

        let say = echo.method_by_name("Say").unwrap();
        assert_eq!(say.full_name(), "svc.Echo.Say");
        assert_eq!(say.input(), built.messages[0]);
        assert_eq!(say.output(), built.messages[1]);
        assert!(!say.is_client_streaming());

        let stream = echo.method_by_name("Stream").unwrap();
        assert!(stream.is_server_streaming());
        assert!(stream.output().is_placeholder());
        assert_eq!(stream.output().full_name(), "ext.Remote");
        assert_eq!(stream.service(), *echo);
        assert!(echo.method_by_name("Nope").is_none());
    }
}
