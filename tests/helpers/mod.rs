//! Shared integration-test helpers: app construction, WAV synthesis,
//! multipart bodies.

// Not every test binary uses every helper.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use riffbank::similarity::SimilarityEngine;
use riffbank::store::RiffStore;
use riffbank::{build_router, AppState};

pub const SAMPLE_RATE: u32 = 22_050;

/// Build an app backed by a temp data directory.
pub async fn test_app() -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RiffStore::open(dir.path()).await.unwrap());
    let engine = SimilarityEngine::new(Duration::from_secs(30));
    let app = build_router(AppState::new(store, engine));
    (app, dir)
}

/// Mono 16-bit WAV of a sine tone.
pub fn wav_sine(freq: f32, seconds: f32) -> Vec<u8> {
    wav_from_samples(
        (0..(SAMPLE_RATE as f32 * seconds) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE as f32).sin() * 0.5),
    )
}

/// Mono 16-bit WAV of deterministic pseudo-random noise.
pub fn wav_noise(seconds: f32, seed: u64) -> Vec<u8> {
    let mut state = seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
    wav_from_samples((0..(SAMPLE_RATE as f32 * seconds) as usize).map(move |_| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((state >> 33) as f32 / (1u64 << 31) as f32 - 0.5) * 0.8
    }))
}

fn wav_from_samples(samples: impl Iterator<Item = f32>) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

const BOUNDARY: &str = "riffbank-test-boundary";

/// Build a multipart/form-data upload body for POST /riffs.
pub fn multipart_upload(name: &str, date: &str, filename: &str, audio: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    for (field, value) in [("name", name), ("date", date)] {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// POST a riff and return its parsed JSON, asserting success.
pub async fn upload_riff(app: &Router, name: &str, audio: &[u8]) -> Value {
    let (content_type, body) = multipart_upload(name, "2026-08-28", "clip.wav", audio);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/riffs")
                .header(header::CONTENT_TYPE, content_type)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

/// Issue a GET and return (status, parsed JSON body).
pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, json_body(response).await)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
