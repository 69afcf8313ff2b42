use crate::transport::InferenceTransport;
use sensemux_core::GatewayError;
use std::collections::HashMap;

pub struct TransportRegistry {
    factories: HashMap<String, fn() -> Box<dyn InferenceTransport>>,
}

impl TransportRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register("null", || {
            Box::new(crate::null_transport::NullTransport::new())
        });
        registry.register("remote", || Box::new(crate::remote::RemoteTransport::new()));
        registry
    }

    pub fn register(&mut self, name: &str, factory: fn() -> Box<dyn InferenceTransport>) {
        self.factories.insert(name.to_string(), factory);
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn InferenceTransport>, GatewayError> {
        self.factories
            .get(name)
            .map(|f| f())
            .ok_or_else(|| GatewayError::TransportNotFound(name.to_string()))
    }

    pub fn list_transports(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new_has_builtin_transports() {
        let registry = TransportRegistry::new();
        assert!(registry.create("null").is_ok());
        assert!(registry.create("remote").is_ok());
    }

    #[test]
    fn test_registry_create_returns_correct_name() {
        let registry = TransportRegistry::new();
        assert_eq!(registry.create("null").unwrap().name(), "null");
        assert_eq!(registry.create("remote").unwrap().name(), "remote");
    }

    #[test]
    fn test_registry_create_unknown_returns_error() {
        let registry = TransportRegistry::new();
        match registry.create("nope") {
            Err(GatewayError::TransportNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected TransportNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_registry_list_transports() {
        let registry = TransportRegistry::new();
        let transports = registry.list_transports();
        assert!(transports.contains(&"null"));
        assert!(transports.contains(&"remote"));
    }
}
