//! End-to-end similarity query tests
//!
//! Exercise the full pipeline over HTTP: upload synthesized audio, query
//! /similarity, check ranking semantics and error mapping.

mod helpers;

use axum::http::StatusCode;
use helpers::{get_json, test_app, upload_riff, wav_noise, wav_sine};

#[tokio::test]
async fn ranks_acoustically_similar_riff_first() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "target", &wav_sine(440.0, 1.0)).await;
    let close = upload_riff(&app, "close", &wav_sine(443.0, 1.0)).await;
    let far = upload_riff(&app, "far", &wav_noise(1.0, 7)).await;

    let target_id = target["id"].as_str().unwrap();
    let (status, body) = get_json(&app, &format!("/similarity/{target_id}?top_k=2")).await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 2);

    assert_eq!(results[0]["riff"]["id"], close["id"]);
    assert_eq!(results[1]["riff"]["id"], far["id"]);

    let d0 = results[0]["distance"].as_f64().unwrap();
    let d1 = results[1]["distance"].as_f64().unwrap();
    assert!(d0 >= 0.0 && d0 <= d1);

    // The target never appears in its own results.
    assert!(results.iter().all(|r| r["riff"]["id"] != *target_id));
}

#[tokio::test]
async fn default_top_k_is_three() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "t", &wav_sine(440.0, 0.8)).await;
    for (i, freq) in [550.0, 660.0, 770.0, 880.0].iter().enumerate() {
        upload_riff(&app, &format!("c{i}"), &wav_sine(*freq, 0.8)).await;
    }

    let target_id = target["id"].as_str().unwrap();
    let (status, body) = get_json(&app, &format!("/similarity/{target_id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn fewer_candidates_than_k_returns_what_exists() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "t", &wav_sine(440.0, 0.8)).await;
    upload_riff(&app, "only", &wav_sine(660.0, 0.8)).await;
    upload_riff(&app, "other", &wav_sine(880.0, 0.8)).await;

    let target_id = target["id"].as_str().unwrap();
    let (status, body) = get_json(&app, &format!("/similarity/{target_id}?top_k=10")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn identical_audio_ranks_at_distance_zero() {
    let (app, _dir) = test_app().await;

    let audio = wav_sine(440.0, 1.0);
    let target = upload_riff(&app, "orig", &audio).await;
    let twin = upload_riff(&app, "twin", &audio).await;
    upload_riff(&app, "noise", &wav_noise(1.0, 3)).await;

    let target_id = target["id"].as_str().unwrap();
    let (_, body) = get_json(&app, &format!("/similarity/{target_id}?top_k=2")).await;

    let results = body.as_array().unwrap();
    assert_eq!(results[0]["riff"]["id"], twin["id"]);
    let distance = results[0]["distance"].as_f64().unwrap();
    assert!(distance.abs() < 1e-6, "identical audio distance {distance}");
}

#[tokio::test]
async fn repeated_queries_are_idempotent() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "t", &wav_sine(440.0, 1.0)).await;
    upload_riff(&app, "a", &wav_sine(660.0, 1.0)).await;
    upload_riff(&app, "b", &wav_noise(1.0, 11)).await;

    let target_id = target["id"].as_str().unwrap();
    let (_, first) = get_json(&app, &format!("/similarity/{target_id}?top_k=3")).await;
    let (_, second) = get_json(&app, &format!("/similarity/{target_id}?top_k=3")).await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn unknown_target_is_not_found() {
    let (app, _dir) = test_app().await;
    upload_riff(&app, "bystander", &wav_sine(440.0, 0.5)).await;

    let (status, body) = get_json(&app, "/similarity/no-such-riff").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn undecodable_target_is_unprocessable() {
    let (app, _dir) = test_app().await;

    let broken = upload_riff(&app, "broken", b"not really audio").await;
    upload_riff(&app, "fine", &wav_sine(440.0, 0.5)).await;

    let broken_id = broken["id"].as_str().unwrap();
    let (status, body) = get_json(&app, &format!("/similarity/{broken_id}")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNPROCESSABLE");
}

#[tokio::test]
async fn broken_candidates_are_skipped() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "t", &wav_sine(440.0, 1.0)).await;
    upload_riff(&app, "broken", b"garbage bytes").await;
    let good = upload_riff(&app, "good", &wav_sine(550.0, 1.0)).await;

    let target_id = target["id"].as_str().unwrap();
    let (status, body) = get_json(&app, &format!("/similarity/{target_id}?top_k=5")).await;

    assert_eq!(status, StatusCode::OK);
    let results = body.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["riff"]["id"], good["id"]);
}

#[tokio::test]
async fn zero_top_k_is_bad_request() {
    let (app, _dir) = test_app().await;

    let target = upload_riff(&app, "t", &wav_sine(440.0, 0.5)).await;
    let target_id = target["id"].as_str().unwrap();

    let (status, body) = get_json(&app, &format!("/similarity/{target_id}?top_k=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn resampled_upload_is_comparable() {
    // Same tone uploaded at two different source rates should still be the
    // closest pair in the catalog after resampling to the analysis rate.
    let (app, _dir) = test_app().await;

    let native = upload_riff(&app, "native", &wav_sine(440.0, 1.0)).await;

    // 44.1 kHz rendition of the same tone.
    let hi_rate: Vec<u8> = {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..44_100 {
                let s = (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 44_100.0).sin() * 0.5;
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    };
    upload_riff(&app, "hi-rate", &hi_rate).await;
    upload_riff(&app, "noise", &wav_noise(1.0, 21)).await;

    let native_id = native["id"].as_str().unwrap();
    let (_, body) = get_json(&app, &format!("/similarity/{native_id}?top_k=2")).await;

    let results = body.as_array().unwrap();
    assert_eq!(results[0]["riff"]["name"], "hi-rate");
}
