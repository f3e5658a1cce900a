use hyper::body::Bytes;
use std::collections::HashMap;

/// The most recent response produced by the request driver.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    pub status_code: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl CapturedResponse {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into()
    }

    pub fn header<S: AsRef<str>>(&self, name: S) -> Option<&String> {
        self.headers.get(&name.as_ref().to_lowercase())
    }
}
