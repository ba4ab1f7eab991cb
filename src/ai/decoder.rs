//! Turns raw model output into the text handed to callers.

pub trait OutputDecoder: Send + Sync {
    fn decode(&self, raw: &str) -> String;
}

/// Passes model output through unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct StringDecoder;

impl OutputDecoder for StringDecoder {
    fn decode(&self, raw: &str) -> String {
        raw.to_string()
    }
}
