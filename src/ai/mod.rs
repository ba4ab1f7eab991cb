pub mod chat;
pub mod client;
pub mod decoder;
pub mod grammar;
pub mod pipeline;
pub mod prompt;
pub mod stream;

pub use client::{ModelClient, OpenAiClient};
pub use decoder::{OutputDecoder, StringDecoder};
pub use grammar::ReferenceGrammar;
pub use pipeline::{Generation, Pipeline};
pub use stream::FragmentStream;
