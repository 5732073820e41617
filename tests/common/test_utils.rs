use std::{
    collections::HashSet,
    io::Cursor,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{FutureExt, channel::mpsc};
use image::{ImageFormat, Rgba, RgbaImage};
use instant::Duration;
use scene_ngin::{
    EngineConfig, HeadlessApi, Scene, SceneController, SceneError,
    data_structures::{
        cube::Cube, draw_plan::DrawInstruction, plane::Plane, transform::Transform,
    },
    error::{FrameError, MediaError},
    render::Frame,
    resources::{
        AssetSource, LoadFuture, MemoryAssets,
        media::{MediaHost, PlaybackSignal, VideoElement},
        mesh::MeshDescriptor,
        shader::ShaderDescriptor,
        texture::TextureDescriptor,
    },
};
use tokio::{runtime::Handle, sync::watch};

pub const FLAT_VS: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) a_position: vec2<f32>,
    @location(1) a_color: vec3<f32>,
}
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec3<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model * vec4<f32>(in.a_position, 0.0, 1.0);
    out.color = in.a_color;
    return out;
}
"#;

pub const COLOUR_FS: &str = r#"
@fragment
fn fs_main(@location(0) color: vec3<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(color, 1.0);
}
"#;

pub const TEXTURED_VS: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) a_position: vec3<f32>,
    @location(2) a_texcoord: vec2<f32>,
}
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model * vec4<f32>(in.a_position, 1.0);
    out.tex_coords = in.a_texcoord;
    return out;
}
"#;

pub const TEXTURED_FS: &str = r#"
@group(1) @binding(0) var t_diffuse: texture_2d<f32>;
@group(1) @binding(1) var s_diffuse: sampler;

@fragment
fn fs_main(@location(0) tex_coords: vec2<f32>) -> @location(0) vec4<f32> {
    return textureSample(t_diffuse, s_diffuse, tex_coords);
}
"#;

pub const LIT_VS: &str = r#"
struct Uniforms {
    projection: mat4x4<f32>,
    model: mat4x4<f32>,
    normal: mat4x4<f32>,
}
@group(0) @binding(0) var<uniform> u: Uniforms;

struct VertexInput {
    @location(0) a_position: vec3<f32>,
    @location(1) a_normal: vec3<f32>,
    @location(2) a_texcoord: vec2<f32>,
}
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) tex_coords: vec2<f32>,
    @location(1) world_normal: vec3<f32>,
}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = u.projection * u.model * vec4<f32>(in.a_position, 1.0);
    out.tex_coords = in.a_texcoord;
    out.world_normal = (u.normal * vec4<f32>(in.a_normal, 0.0)).xyz;
    return out;
}
"#;

pub const LIT_FS: &str = r#"
@group(1) @binding(0) var t_diffuse: texture_2d<f32>;
@group(1) @binding(1) var s_diffuse: sampler;

@fragment
fn fs_main(
    @location(0) tex_coords: vec2<f32>,
    @location(1) world_normal: vec3<f32>,
) -> @location(0) vec4<f32> {
    let light = max(dot(normalize(world_normal), vec3<f32>(0.0, 0.0, 1.0)), 0.0);
    return textureSample(t_diffuse, s_diffuse, tex_coords) * (0.3 + light);
}
"#;

/// Reads a location the vertex stage never writes, so linking fails.
pub const UNLINKABLE_FS: &str = r#"
@fragment
fn fs_main(@location(5) uv: vec2<f32>) -> @location(0) vec4<f32> {
    return vec4<f32>(uv, 0.0, 1.0);
}
"#;

pub const BROKEN_WGSL: &str = "@vertex fn vs_main( -> {";

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];

pub fn png_bytes(image: &RgbaImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// One pixel wide: red on top, blue below.
pub fn red_over_blue() -> RgbaImage {
    let mut image = RgbaImage::new(1, 2);
    image.put_pixel(0, 0, Rgba(RED));
    image.put_pixel(0, 1, Rgba(BLUE));
    image
}

pub fn solid(width: u32, height: u32, colour: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(colour))
}

/// Every shader fixture under `shaders/` plus a few textures under `textures/`.
pub fn fixture_assets() -> MemoryAssets {
    MemoryAssets::new()
        .with("shaders/flat.vert.wgsl", FLAT_VS)
        .with("shaders/flat.frag.wgsl", COLOUR_FS)
        .with("shaders/textured.vert.wgsl", TEXTURED_VS)
        .with("shaders/textured.frag.wgsl", TEXTURED_FS)
        .with("shaders/lit.vert.wgsl", LIT_VS)
        .with("shaders/lit.frag.wgsl", LIT_FS)
        .with("shaders/unlinkable.frag.wgsl", UNLINKABLE_FS)
        .with("shaders/broken.wgsl", BROKEN_WGSL)
        .with("textures/red_over_blue.png", png_bytes(&red_over_blue()))
        .with("textures/red.png", png_bytes(&solid(4, 4, RED)))
        .with("textures/blue.png", png_bytes(&solid(2, 2, BLUE)))
        .with("textures/not_an_image.png", b"definitely not a png".to_vec())
}

pub fn shader(name: &str) -> ShaderDescriptor {
    ShaderDescriptor::new(
        name,
        &format!("shaders/{name}.vert.wgsl"),
        &format!("shaders/{name}.frag.wgsl"),
    )
}

/// Holds back every locator in `held` until [`GatedAssets::release`] is called.
#[derive(Clone)]
pub struct GatedAssets {
    inner: MemoryAssets,
    held: Arc<HashSet<String>>,
    open: Arc<watch::Sender<bool>>,
}

impl GatedAssets {
    pub fn new(inner: MemoryAssets, held: &[&str]) -> Self {
        let (open, _) = watch::channel(false);
        Self {
            inner,
            held: Arc::new(held.iter().map(|s| s.to_string()).collect()),
            open: Arc::new(open),
        }
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }
}

impl AssetSource for GatedAssets {
    fn load_binary(&self, locator: &str) -> LoadFuture<Vec<u8>> {
        let load = self.inner.load_binary(locator);
        if !self.held.contains(locator) {
            return load;
        }
        let mut open = self.open.subscribe();
        async move {
            let _ = open.wait_for(|open| *open).await;
            load.await
        }
        .boxed()
    }
}

/// Remote control for one [`ScriptedVideo`].
#[derive(Clone, Default)]
pub struct VideoScript {
    signals: Arc<Mutex<Option<mpsc::UnboundedSender<PlaybackSignal>>>>,
    paused: Arc<AtomicBool>,
    released: Arc<AtomicBool>,
}

impl VideoScript {
    pub fn emit(&self, signal: PlaybackSignal) {
        if let Some(tx) = self.signals.lock().unwrap().as_ref() {
            let _ = tx.unbounded_send(signal);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// A video that shows one still frame and only signals when told to.
pub struct ScriptedVideo {
    frame: RgbaImage,
    script: VideoScript,
}

impl VideoElement for ScriptedVideo {
    fn play(&mut self) -> mpsc::UnboundedReceiver<PlaybackSignal> {
        let (tx, rx) = mpsc::unbounded();
        *self.script.signals.lock().unwrap() = Some(tx);
        self.script.paused.store(false, Ordering::SeqCst);
        rx
    }

    fn current_frame(&self) -> Option<&RgbaImage> {
        (!self.script.is_released()).then_some(&self.frame)
    }

    fn pause(&mut self) {
        self.script.paused.store(true, Ordering::SeqCst);
    }

    fn release(&mut self) {
        self.script.released.store(true, Ordering::SeqCst);
        self.script.signals.lock().unwrap().take();
    }

    fn dimensions(&self) -> (u32, u32) {
        self.frame.dimensions()
    }
}

/// Decodes stills with `image`; "videos" are stills driven by a [`VideoScript`].
#[derive(Clone, Default)]
pub struct ScriptedMedia {
    videos: Arc<Mutex<Vec<VideoScript>>>,
}

impl ScriptedMedia {
    /// Scripts of every video opened so far, in open order.
    pub fn videos(&self) -> Vec<VideoScript> {
        self.videos.lock().unwrap().clone()
    }
}

impl MediaHost for ScriptedMedia {
    fn decode_image(&self, bytes: &[u8]) -> Result<RgbaImage, MediaError> {
        Ok(image::load_from_memory(bytes)?.to_rgba8())
    }

    fn open_video(&self, bytes: Vec<u8>) -> Result<Box<dyn VideoElement>, MediaError> {
        let frame = self.decode_image(&bytes)?;
        let script = VideoScript::default();
        self.videos.lock().unwrap().push(script.clone());
        Ok(Box::new(ScriptedVideo { frame, script }))
    }
}

pub type FrameLog = Arc<Mutex<Vec<Duration>>>;

/// A scene assembled from plain lists. Draws every instruction each frame,
/// lit when its shader is `lit`.
pub struct TestScene {
    pub shaders: Vec<ShaderDescriptor>,
    pub meshes: Vec<MeshDescriptor>,
    pub textures: Vec<TextureDescriptor>,
    pub plan: Vec<DrawInstruction>,
    pub frames: FrameLog,
}

impl TestScene {
    pub fn empty() -> Self {
        Self {
            shaders: Vec::new(),
            meshes: Vec::new(),
            textures: Vec::new(),
            plan: Vec::new(),
            frames: FrameLog::default(),
        }
    }

    /// One flat-shaded plane.
    pub fn plane() -> Self {
        Self {
            shaders: vec![shader("flat")],
            meshes: vec![MeshDescriptor::new("plane", Plane, 1.0)],
            plan: vec![DrawInstruction::new("plane", "plane", "flat", "")],
            ..Self::empty()
        }
    }

    /// A textured cube, a lit cube and a plane.
    pub fn mixed() -> Self {
        Self {
            shaders: vec![shader("textured"), shader("lit"), shader("flat")],
            meshes: vec![
                MeshDescriptor::new("cube", Cube, 2.0),
                MeshDescriptor::new("plane", Plane, 1.0),
            ],
            textures: vec![
                TextureDescriptor::image("red", "textures/red.png"),
                TextureDescriptor::image("blue", "textures/blue.png"),
            ],
            plan: vec![
                DrawInstruction::new("textured-cube", "cube", "textured", "red"),
                DrawInstruction::new("lit-cube", "cube", "lit", "blue"),
                DrawInstruction::new("backdrop", "plane", "flat", ""),
            ],
            ..Self::empty()
        }
    }
}

impl Scene for TestScene {
    fn title(&self) -> &str {
        "test scene"
    }

    fn declare_shaders(&self) -> Vec<ShaderDescriptor> {
        self.shaders.clone()
    }

    fn declare_meshes(&self) -> Vec<MeshDescriptor> {
        self.meshes.clone()
    }

    fn declare_textures(&self) -> Vec<TextureDescriptor> {
        self.textures.clone()
    }

    fn declare_draw_plan(&self) -> Vec<DrawInstruction> {
        self.plan.clone()
    }

    fn draw_frame(&mut self, frame: &mut Frame<'_>, dt: Duration) -> Result<(), FrameError> {
        self.frames.lock().unwrap().push(dt);
        frame.draw_all(|instruction| {
            let transform = Transform::at([0.0, 0.0, -5.0]);
            if instruction.shader == "lit" {
                transform.lit()
            } else {
                transform
            }
        })
    }
}

pub fn controller(
    scene: TestScene,
    assets: impl AssetSource + 'static,
    media: impl MediaHost + 'static,
) -> SceneController<HeadlessApi> {
    controller_with_config(scene, assets, media, EngineConfig::default())
}

pub fn controller_with_config(
    scene: TestScene,
    assets: impl AssetSource + 'static,
    media: impl MediaHost + 'static,
    config: EngineConfig,
) -> SceneController<HeadlessApi> {
    SceneController::new(
        Box::new(scene),
        config,
        Arc::new(assets),
        Arc::new(media),
        Handle::current(),
    )
}

/// Lets spawned loads run, ticking the controller in between.
pub async fn settle(controller: &mut SceneController<HeadlessApi>) -> Result<(), SceneError> {
    for _ in 0..32 {
        tokio::task::yield_now().await;
        controller.tick()?;
    }
    Ok(())
}

/// Lets spawned tasks run without touching the controller.
pub async fn yield_many() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}
