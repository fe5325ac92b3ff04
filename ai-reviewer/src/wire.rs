//! The outbound/inbound envelope for the AI endpoint's single-message
//! exchange — `{content[0].text, usage.input_tokens, usage.output_tokens}`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub(crate) struct Message<'a> {
    pub role: &'a str,
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
    pub messages: Vec<Message<'a>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ContentBlock {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}
