// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Embedding API Module
//!
//! POST /embed (batch) and POST /embed/single, returning 768-dimensional
//! L2-normalized vectors from the loaded model.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::{embed_handler, embed_single_handler};
pub use request::{EmbedRequest, SingleTextParams};
pub use response::{EmbedResponse, SingleEmbedResponse};
