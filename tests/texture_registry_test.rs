mod common;

use std::sync::Arc;

use common::test_utils::*;
use scene_ngin::{
    HeadlessApi,
    error::ContractViolation,
    gpu::{Sampling, headless::Call},
    resources::{
        AssetSource, LoadGate,
        media::PlaybackSignal,
        texture::{PLACEHOLDER_PIXEL, TextureDescriptor, TextureRegistry},
    },
};
use tokio::runtime::Handle;

fn request(
    registry: &mut TextureRegistry,
    api: &mut HeadlessApi,
    entries: Vec<TextureDescriptor>,
    assets: impl AssetSource + 'static,
    media: ScriptedMedia,
    gate: &LoadGate,
) {
    registry.request_load(
        api,
        entries,
        Arc::new(assets),
        Arc::new(media),
        &Handle::current(),
        gate,
    );
}

#[tokio::test]
async fn placeholder_is_uploaded_synchronously() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    let assets = GatedAssets::new(fixture_assets(), &["textures/red.png"]);
    request(
        &mut registry,
        &mut api,
        vec![TextureDescriptor::image("red", "textures/red.png")],
        assets,
        ScriptedMedia::default(),
        &LoadGate::new(),
    );

    let entry = registry.get("red").unwrap();
    let texture = entry.texture().unwrap();
    assert!(!entry.is_ready());
    assert_eq!(entry.unit(), 0);
    assert_eq!(api.texture_size(texture), Some((1, 1)));
    assert_eq!(api.texel(texture, 0, 0), Some(PLACEHOLDER_PIXEL));
    assert_eq!(api.texture_sampling(texture), Some(Sampling::default()));

    yield_many().await;
    assert_eq!(registry.poll_completions(), 0);
    registry.update_gpu_texture(&mut api, "red").unwrap();
    assert_eq!(api.bound_texture(0), Some(texture));
    assert_eq!(api.texel(texture, 0, 0), Some(PLACEHOLDER_PIXEL));
    assert!(api.errors().is_empty());
}

#[tokio::test]
async fn decoded_image_is_uploaded_flipped() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    request(
        &mut registry,
        &mut api,
        vec![TextureDescriptor::image("pair", "textures/red_over_blue.png")],
        fixture_assets(),
        ScriptedMedia::default(),
        &LoadGate::new(),
    );
    assert!(registry.next_delivery().await);
    assert!(registry.get("pair").unwrap().is_ready());
    assert!(registry.get("pair").unwrap().has_media());

    registry.update_gpu_texture(&mut api, "pair").unwrap();
    let texture = registry.get("pair").unwrap().texture().unwrap();
    assert_eq!(api.texture_size(texture), Some((1, 2)));
    assert_eq!(api.texel(texture, 0, 0), Some(BLUE));
    assert_eq!(api.texel(texture, 0, 1), Some(RED));

    assert!(!registry.next_delivery().await);
}

#[tokio::test]
async fn video_needs_playing_and_time_update() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    let media = ScriptedMedia::default();
    request(
        &mut registry,
        &mut api,
        vec![TextureDescriptor::video("clip", "textures/blue.png")],
        fixture_assets(),
        media.clone(),
        &LoadGate::new(),
    );
    assert!(registry.next_delivery().await);
    assert!(!registry.get("clip").unwrap().is_ready());
    let script = media.videos().remove(0);
    assert!(!script.is_paused());

    script.emit(PlaybackSignal::Playing);
    assert_eq!(registry.poll_completions(), 0);
    assert!(!registry.get("clip").unwrap().is_ready());
    registry.update_gpu_texture(&mut api, "clip").unwrap();
    let texture = registry.get("clip").unwrap().texture().unwrap();
    assert_eq!(api.texel(texture, 0, 0), Some(PLACEHOLDER_PIXEL));

    script.emit(PlaybackSignal::TimeUpdate);
    assert_eq!(registry.poll_completions(), 1);
    assert!(registry.get("clip").unwrap().video_signals().is_ready());
    registry.update_gpu_texture(&mut api, "clip").unwrap();
    assert_eq!(api.texture_size(texture), Some((2, 2)));
    assert_eq!(api.texel(texture, 1, 1), Some(BLUE));

    script.emit(PlaybackSignal::TimeUpdate);
    assert_eq!(registry.poll_completions(), 0);
}

#[tokio::test]
async fn failed_loads_keep_the_placeholder() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::image("garbage", "textures/not_an_image.png"),
            TextureDescriptor::image("absent", "textures/absent.png"),
            TextureDescriptor::image("red", "textures/red.png"),
        ],
        fixture_assets(),
        ScriptedMedia::default(),
        &LoadGate::new(),
    );
    while registry.next_delivery().await {}

    assert!(!registry.get("garbage").unwrap().is_ready());
    assert!(registry.get("garbage").unwrap().failure().is_some());
    let absent = registry.get("absent").unwrap();
    assert!(absent.failure().unwrap().contains("textures/absent.png"));
    assert!(registry.get("red").unwrap().is_ready());
    assert_eq!(registry.ready_count(), 1);
    assert!(!registry.is_all_ready());

    registry.update_gpu_texture(&mut api, "garbage").unwrap();
    let texture = registry.get("garbage").unwrap().texture().unwrap();
    assert_eq!(api.texel(texture, 0, 0), Some(PLACEHOLDER_PIXEL));
    assert!(api.errors().is_empty());
}

#[tokio::test]
async fn media_beyond_the_texture_limit_keeps_the_placeholder() {
    let mut api = HeadlessApi::new(8, 8).with_max_texture_dimension(2);
    let mut registry = TextureRegistry::new();
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::image("red", "textures/red.png"),
            TextureDescriptor::image("blue", "textures/blue.png"),
        ],
        fixture_assets(),
        ScriptedMedia::default(),
        &LoadGate::new(),
    );
    while registry.next_delivery().await {}

    let red = registry.get("red").unwrap();
    assert!(!red.is_ready());
    assert!(red.failure().unwrap().contains("4x4"));
    assert!(registry.get("blue").unwrap().is_ready());

    registry.update_gpu_texture(&mut api, "red").unwrap();
    let texture = registry.get("red").unwrap().texture().unwrap();
    assert_eq!(api.texture_size(texture), Some((1, 1)));
    assert_eq!(api.texel(texture, 0, 0), Some(PLACEHOLDER_PIXEL));
    registry.update_gpu_texture(&mut api, "blue").unwrap();
    assert!(api.errors().is_empty());
}

#[tokio::test]
async fn media_loads_one_after_another() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    let assets = GatedAssets::new(fixture_assets(), &["textures/red.png"]);
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::image("red", "textures/red.png"),
            TextureDescriptor::image("blue", "textures/blue.png"),
        ],
        assets.clone(),
        ScriptedMedia::default(),
        &LoadGate::new(),
    );
    yield_many().await;
    assert_eq!(registry.poll_completions(), 0);
    assert!(!registry.get("blue").unwrap().is_ready());

    assets.release();
    yield_many().await;
    assert_eq!(registry.poll_completions(), 2);
    assert!(registry.is_all_ready());
}

#[tokio::test]
async fn closed_gate_publishes_nothing() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    let media = ScriptedMedia::default();
    let gate = LoadGate::new();
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::video("clip", "textures/blue.png"),
            TextureDescriptor::image("red", "textures/red.png"),
        ],
        fixture_assets(),
        media.clone(),
        &gate,
    );
    gate.close();
    yield_many().await;

    assert_eq!(registry.poll_completions(), 0);
    assert!(!registry.next_delivery().await);
    assert!(media.videos().is_empty());
    assert_eq!(registry.len(), 2);
}

#[tokio::test]
async fn stop_and_release_detach_media() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    let media = ScriptedMedia::default();
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::video("clip", "textures/blue.png"),
            TextureDescriptor::image("red", "textures/red.png"),
        ],
        fixture_assets(),
        media.clone(),
        &LoadGate::new(),
    );
    while registry.next_delivery().await {}
    let script = media.videos().remove(0);
    script.emit(PlaybackSignal::Playing);
    script.emit(PlaybackSignal::TimeUpdate);
    assert_eq!(registry.poll_completions(), 1);

    registry.stop_all_media();
    assert!(script.is_paused());
    assert!(script.is_released());

    registry.release_all(&mut api);
    registry.release_all(&mut api);
    assert!(registry.is_empty());
    let deleted = api
        .calls()
        .iter()
        .filter(|c| matches!(c, Call::DeleteTexture(_)))
        .count();
    assert_eq!(deleted, 2);
    assert_eq!(api.live_objects().textures, 0);
    assert!(api.errors().is_empty());
}

#[tokio::test]
async fn unknown_texture_is_a_contract_violation() {
    let mut api = HeadlessApi::new(8, 8);
    let registry = TextureRegistry::new();
    let err = registry.update_gpu_texture(&mut api, "nope").unwrap_err();
    assert!(matches!(err, ContractViolation::UnknownEntry { kind: "texture", name } if name == "nope"));
}

#[tokio::test]
async fn repeated_names_are_requested_once() {
    let mut api = HeadlessApi::new(8, 8);
    let mut registry = TextureRegistry::new();
    request(
        &mut registry,
        &mut api,
        vec![
            TextureDescriptor::image("red", "textures/red.png"),
            TextureDescriptor::image("red", "textures/blue.png"),
        ],
        fixture_assets(),
        ScriptedMedia::default(),
        &LoadGate::new(),
    );
    assert_eq!(registry.len(), 1);
    assert_eq!(api.live_objects().textures, 1);
    while registry.next_delivery().await {}
    registry.update_gpu_texture(&mut api, "red").unwrap();
    let texture = registry.get("red").unwrap().texture().unwrap();
    assert_eq!(api.texel(texture, 0, 0), Some(RED));
}
