//! 类型模块：定义聊天补全请求与响应的线上数据结构。
//!
//! # Types Module
//!
//! Wire types for the single request/response shape the batch runner speaks.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Message`] | Chat message with role and text content |
//! | [`ChatCompletionRequest`] | `POST /chat/completions` body |
//! | [`ChatCompletionResponse`] | Response body, including the optional `error` object |
//! | [`Usage`] | Prompt / completion token counts |
//! | [`Completion`] | Decoded successful call: content plus usage |
//!
//! ## Example
//!
//! ```rust
//! use ai_batch_rust::types::ChatCompletionRequest;
//!
//! let req = ChatCompletionRequest::new("gpt-4o-mini", "Reply with JSON.", "Summarise: ...");
//! assert_eq!(req.messages.len(), 2);
//! ```

pub mod chat;
pub mod message;

pub use chat::{
    ApiError, ChatCompletionRequest, ChatCompletionResponse, Choice, Completion, ResponseFormat,
    Usage,
};
pub use message::{Message, MessageRole};
