use serde::Deserialize;

pub const DEFAULT_PEEK: usize = 16;
pub const DEFAULT_SNIFF_TIMEOUT_MS: u64 = 5000;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    pub listener: Vec<Listener>,
    pub route: Vec<Route>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Listener {
    pub name: String,
    pub endpoint: String,
    // 最多读取多少字节用于协议识别
    pub peek: Option<usize>,
    pub sniff_timeout_ms: Option<u64>,
    pub routes: Vec<String>,
    pub default: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Route {
    pub name: String,
    pub upstream: String,
    pub prefix: Option<String>,
    pub first_byte: Option<u8>,
}

impl Route {
    /// Whether the first bytes read from a client select this route.
    /// A route with neither `prefix` nor `first_byte` only serves as a default.
    pub fn matches(&self, head: &[u8]) -> bool {
        if let Some(b) = self.first_byte {
            if head.first() == Some(&b) {
                return true;
            }
        }
        match &self.prefix {
            Some(p) => !p.is_empty() && head.starts_with(p.as_bytes()),
            None => false,
        }
    }
}
