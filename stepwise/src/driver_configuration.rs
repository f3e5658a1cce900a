use crate::correlation::{IdGenerator, UuidGenerator};
use std::{collections::HashMap, sync::Arc};

pub const DEFAULT_CORRELATION_HEADER: &str = "request-id";

#[derive(Debug, Clone)]
pub struct DriverConfiguration {
    correlation_header: Option<String>,
    default_headers: HashMap<String, String>,
    id_generator: Arc<dyn IdGenerator + Send + Sync>,
}

impl DriverConfiguration {
    pub fn new() -> Self {
        let mut default_headers = HashMap::new();
        default_headers.insert(String::from("Accept"), String::from("application/json"));
        default_headers.insert(
            String::from("Content-Type"),
            String::from("application/json"),
        );

        Self {
            correlation_header: Some(String::from(DEFAULT_CORRELATION_HEADER)),
            default_headers,
            id_generator: Arc::new(UuidGenerator),
        }
    }

    pub fn set_correlation_header<S: Into<String>>(&mut self, header_name: S) {
        self.correlation_header = Some(header_name.into());
    }

    /// Stops injecting the correlation header into calls. The read-model scope is still keyed
    /// by the generated identifier.
    pub fn disable_correlation(&mut self) {
        self.correlation_header = None;
    }

    pub fn correlation_header(&self) -> Option<&String> {
        self.correlation_header.as_ref()
    }

    pub fn set_default_header<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        let name = name.into();
        self.default_headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.insert(name, value.into());
    }

    pub fn remove_default_header<S: AsRef<str>>(&mut self, name: S) {
        self.default_headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(name.as_ref()));
    }

    pub fn default_headers(&self) -> &HashMap<String, String> {
        &self.default_headers
    }

    pub fn set_id_generator(&mut self, id_generator: Arc<dyn IdGenerator + Send + Sync>) {
        self.id_generator = id_generator;
    }

    pub fn id_generator(&self) -> Arc<dyn IdGenerator + Send + Sync> {
        self.id_generator.clone()
    }
}

impl Default for DriverConfiguration {
    fn default() -> Self {
        Self::new()
    }
}
