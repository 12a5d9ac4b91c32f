// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Real-model tests for the ONNX encoder
//!
//! These need the pubmedbert ONNX export on disk and are ignored by default:
//! `cargo test --test embeddings_tests -- --ignored`

use fabstir_embedding_server::embeddings::{
    cosine_similarity, ComputeDevice, ModelFiles, ModelHandle, OnnxEmbeddingModel,
    OnnxModelOptions, EMBEDDING_DIMENSION,
};
use std::path::PathBuf;
use std::sync::Arc;

const MODEL_DIR: &str = "/workspace/models/pubmedbert-base-embeddings";

fn model_files() -> ModelFiles {
    let dir = PathBuf::from(MODEL_DIR);
    ModelFiles {
        model_path: dir.join("onnx/model.onnx"),
        tokenizer_path: dir.join("tokenizer.json"),
    }
}

fn load_handle() -> ModelHandle {
    let model = OnnxEmbeddingModel::new(
        "NeuML/pubmedbert-base-embeddings",
        &model_files(),
        OnnxModelOptions {
            device: ComputeDevice::Cpu,
            intra_threads: 2,
            expected_dimension: EMBEDDING_DIMENSION,
        },
    )
    .expect("model should load");
    let device = model.device();
    ModelHandle::new(Arc::new(model), device)
}

#[tokio::test]
#[ignore]
async fn test_real_model_shape_and_norm() {
    let handle = load_handle();
    assert_eq!(handle.dimension(), 768);

    let vectors = handle
        .embed(vec![
            "Chest CT shows a 2 cm spiculated nodule".to_string(),
            "Normal sinus rhythm".to_string(),
        ])
        .await
        .unwrap();

    assert_eq!(vectors.len(), 2);
    for v in &vectors {
        assert_eq!(v.len(), 768);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }
}

#[tokio::test]
#[ignore]
async fn test_real_model_batch_matches_single() {
    let handle = load_handle();
    let short = "aspirin".to_string();
    let long =
        "acute myocardial infarction treated with percutaneous coronary intervention".to_string();

    // Padding in the batch must not change the short text's vector
    let batch = handle.embed(vec![short.clone(), long]).await.unwrap();
    let single = handle.embed_one(short).await.unwrap();

    let similarity = cosine_similarity(&batch[0], &single).unwrap();
    assert!(similarity > 0.999, "similarity {}", similarity);
}

#[tokio::test]
#[ignore]
async fn test_real_model_semantics() {
    let handle = load_handle();
    let vectors = handle
        .embed(vec![
            "heart attack".to_string(),
            "myocardial infarction".to_string(),
            "quarterly tax filing deadline".to_string(),
        ])
        .await
        .unwrap();

    let related = cosine_similarity(&vectors[0], &vectors[1]).unwrap();
    let unrelated = cosine_similarity(&vectors[0], &vectors[2]).unwrap();
    assert!(related > unrelated);
}

#[tokio::test]
#[ignore]
async fn test_real_model_long_input_truncated() {
    let handle = load_handle();
    let long = "pneumothorax ".repeat(2000);
    let vectors = handle.embed(vec![long]).await.unwrap();
    assert_eq!(vectors[0].len(), 768);
}
