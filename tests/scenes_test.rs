use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::ValueEnum;
use scene_ngin::{
    EngineConfig, HeadlessApi, LifecycleState, SceneController,
    resources::{FileAssets, media::ImageMediaHost},
    scenes::SceneKind,
};
use tokio::runtime::Handle;

fn bundled_assets() -> FileAssets {
    FileAssets::new(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"))
}

fn viewer_controller(kind: SceneKind) -> SceneController<HeadlessApi> {
    SceneController::new(
        kind.build(),
        EngineConfig::default(),
        Arc::new(bundled_assets()),
        Arc::new(ImageMediaHost::new(Handle::current())),
        Handle::current(),
    )
}

#[tokio::test]
async fn every_bundled_scene_renders_headless() {
    for &kind in SceneKind::value_variants() {
        let mut controller = viewer_controller(kind);
        controller.activate_with(HeadlessApi::new(640, 480)).unwrap();
        controller.wait_until_ready().await.unwrap();
        assert_eq!(controller.state(), LifecycleState::Rendering, "{kind:?}");

        for _ in 0..3 {
            controller.tick().unwrap();
            tokio::task::yield_now().await;
        }
        let planned = controller.plan().len();
        let api = controller.api().unwrap();
        assert_eq!(api.draws().len(), planned * 3, "{kind:?}");
        assert_eq!(api.frames_presented(), 3, "{kind:?}");
        assert!(api.errors().is_empty(), "{kind:?}: {:?}", api.errors());

        controller.teardown();
        assert!(controller.api().unwrap().errors().is_empty(), "{kind:?}");
    }
}

#[tokio::test]
async fn gallery_uses_its_own_clear_colour() {
    let mut controller = viewer_controller(SceneKind::Gallery);
    controller.activate_with(HeadlessApi::new(640, 480)).unwrap();
    controller.wait_until_ready().await.unwrap();
    controller.tick().unwrap();
    let clear = controller.api().unwrap().clear_colour();
    assert_eq!((clear.r, clear.g, clear.b), (0.8, 0.5, 0.8));
    assert_eq!(controller.textures().len(), 4);
    assert_eq!(controller.expected_shaders(), 3);
}

#[tokio::test]
async fn gallery_media_reaches_ready() {
    let mut controller = viewer_controller(SceneKind::Gallery);
    controller.activate_with(HeadlessApi::new(640, 480)).unwrap();
    controller.wait_until_ready().await.unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(10), async {
        while controller.textures().ready_count() < 4 {
            controller.tick().unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(settled.is_ok(), "ready: {}", controller.textures().ready_count());
    assert!(controller.textures().is_all_ready());
    for name in ["crate", "gradient", "pulse", "stripes"] {
        let entry = controller.textures().get(name).unwrap();
        assert!(entry.failure().is_none(), "{name}: {:?}", entry.failure());
    }
    assert!(controller.api().unwrap().errors().is_empty());
}
