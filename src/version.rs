// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Fabstir Embedding Server

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-pubmedbert-embeddings-2025-11-04";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-04";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "batch-embed",
    "single-embed",
    "l2-normalized",
    "cuda",
    "coreml",
    "api-key-auth",
    "mock-backend",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Fabstir Embedding Server {} ({})", VERSION_NUMBER, BUILD_DATE)
}
