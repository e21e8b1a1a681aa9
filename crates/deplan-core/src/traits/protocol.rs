/// Registry of URL protocol handlers that may appear at runtime
pub trait ProtocolHandlers: Send + Sync {
    fn is_registered(&self, protocol: &str) -> bool;
}
