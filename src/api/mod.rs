//! Axum HTTP handlers. The routing layer is deliberately thin: all
//! pipeline behavior lives in [`crate::pipeline`].

pub mod decode;
