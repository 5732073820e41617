//! Scene lifecycle.
//!
//! A [`Scene`] declares which shaders, meshes, textures and draws it needs and
//! how to draw a frame. A [`SceneController`] owns everything needed to get
//! there and walks the scene through its lifecycle:
//!
//! 1. `Uninitialized` → `ContextCreated`: [`SceneController::activate`] acquires
//!    the GPU context. Failing to do so is fatal.
//! 2. `ContextCreated` → `ShadersLoading`: depth test on, shader fetches issued.
//! 3. `ShadersLoading` → `Ready`: once every declared program linked, observed
//!    either by [`SceneController::tick`] (cooperative hosts) or
//!    [`SceneController::wait_until_ready`] (async hosts).
//! 4. `Ready` → `Rendering`: meshes are materialized, attribute layouts bound
//!    and texture loads issued. Textures show a placeholder until they arrive.
//! 5. `Rendering`: every [`SceneController::tick`] renders one frame.
//! 6. Any state → `TornDown`: [`SceneController::teardown`] releases every GPU
//!    object and disposes of the context. Terminal and idempotent.
//!
//! Fatal errors (context acquisition, shader fetch/compile/link, unresolved
//! draw names, contract violations) tear the controller down before they are
//! returned.

use std::{collections::HashSet, fmt, sync::Arc};

use instant::{Duration, Instant};
use tokio::runtime::Handle;

use crate::{
    camera::{Projection, SurfaceSize},
    config::EngineConfig,
    context::GraphicsContext,
    data_structures::draw_plan::{DrawInstruction, DrawPlan},
    error::{ContextError, FrameError, SceneError, ShaderError},
    gpu::GraphicsApi,
    render::Frame,
    resources::{
        AssetSource, LoadGate,
        media::MediaHost,
        mesh::{MeshDescriptor, MeshRegistry},
        shader::{ShaderDescriptor, ShaderRegistry},
        texture::{TextureDescriptor, TextureRegistry},
    },
};

/// What a scene supplies to the engine.
pub trait Scene {
    fn title(&self) -> &str;

    fn declare_shaders(&self) -> Vec<ShaderDescriptor>;

    fn declare_meshes(&self) -> Vec<MeshDescriptor>;

    fn declare_textures(&self) -> Vec<TextureDescriptor> {
        Vec::new()
    }

    /// Draws in the order they are issued each frame. Ids must be unique.
    fn declare_draw_plan(&self) -> Vec<DrawInstruction>;

    fn clear_colour(&self) -> wgpu::Color {
        wgpu::Color::BLACK
    }

    /// Draws one frame. `dt` is the time since the previous frame, zero on
    /// the first one.
    fn draw_frame(&mut self, frame: &mut Frame<'_>, dt: Duration) -> Result<(), FrameError>;
}

impl fmt::Debug for dyn Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scene({})", self.title())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifecycleState {
    Uninitialized,
    ContextCreated,
    ShadersLoading,
    Ready,
    Rendering,
    TornDown,
}

/// What the host should do after a [`SceneController::tick`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Next {
    /// Schedule the next frame.
    Continue,
    /// Still loading; tick again after the given delay.
    Recheck(Duration),
    /// Nothing left to do.
    Stop,
}

pub struct SceneController<A: GraphicsApi> {
    scene: Box<dyn Scene>,
    config: EngineConfig,
    projection: Projection,
    assets: Arc<dyn AssetSource>,
    media: Arc<dyn MediaHost>,
    runtime: Handle,
    gate: LoadGate,
    state: LifecycleState,
    context: Option<GraphicsContext<A>>,
    released: Option<A>,
    shaders: ShaderRegistry,
    meshes: MeshRegistry,
    textures: TextureRegistry,
    plan: DrawPlan,
    expected_shaders: usize,
    loading_since: Option<Instant>,
    last_frame: Option<Instant>,
    pending_surface: Option<SurfaceSize>,
    subscribed: bool,
    frames: u64,
}

impl<A: GraphicsApi> SceneController<A> {
    pub fn new(
        scene: Box<dyn Scene>,
        config: EngineConfig,
        assets: Arc<dyn AssetSource>,
        media: Arc<dyn MediaHost>,
        runtime: Handle,
    ) -> Self {
        let projection = config.projection();
        Self {
            scene,
            config,
            projection,
            assets,
            media,
            runtime,
            gate: LoadGate::new(),
            state: LifecycleState::Uninitialized,
            context: None,
            released: None,
            shaders: ShaderRegistry::new(),
            meshes: MeshRegistry::new(),
            textures: TextureRegistry::new(),
            plan: DrawPlan::default(),
            expected_shaders: 0,
            loading_since: None,
            last_frame: None,
            pending_surface: None,
            subscribed: false,
            frames: 0,
        }
    }

    /// Acquires the context through `acquire` and issues the shader loads.
    ///
    /// Only the first call does anything.
    pub fn activate<F>(&mut self, acquire: F) -> Result<(), SceneError>
    where
        F: FnOnce() -> Result<A, ContextError>,
    {
        if self.state != LifecycleState::Uninitialized {
            log::warn!("Scene '{}' is already active ({:?})", self.scene.title(), self.state);
            return Ok(());
        }
        let api = match acquire() {
            Ok(api) => api,
            Err(e) => return Err(self.fail(e)),
        };
        let mut context = GraphicsContext::new(api);
        let (width, height) = context.api().surface_size();
        context.resize_surface(SurfaceSize::fit(width, height, self.config.canvas_scale));
        self.context = Some(context);
        self.subscribed = true;
        self.enter(LifecycleState::ContextCreated);

        let declared = self.scene.declare_shaders();
        self.expected_shaders = declared
            .iter()
            .map(|d| d.name.as_str())
            .collect::<HashSet<_>>()
            .len();
        self.shaders
            .request_load(declared, self.assets.clone(), &self.runtime, &self.gate);
        self.loading_since = Some(Instant::now());
        self.enter(LifecycleState::ShadersLoading);
        Ok(())
    }

    /// [`activate`](Self::activate) with an already acquired backend.
    pub fn activate_with(&mut self, api: A) -> Result<(), SceneError> {
        self.activate(|| Ok(api))
    }

    /// Advances the lifecycle without blocking.
    ///
    /// While loading this checks shader readiness once and asks for a recheck
    /// after the configured poll interval. While rendering it renders a frame.
    pub fn tick(&mut self) -> Result<Next, SceneError> {
        match self.state {
            LifecycleState::Uninitialized | LifecycleState::TornDown => Ok(Next::Stop),
            LifecycleState::ContextCreated | LifecycleState::Ready => Ok(Next::Continue),
            LifecycleState::ShadersLoading => {
                let Some(context) = self.context.as_mut() else {
                    return Ok(Next::Stop);
                };
                if let Err(e) = self.shaders.poll_completions(context.api_mut()) {
                    return Err(self.fail(e));
                }
                if self.shaders.is_all_ready(self.expected_shaders) {
                    self.become_ready()?;
                    return Ok(Next::Continue);
                }
                self.check_timeout()?;
                Ok(Next::Recheck(self.config.poll_interval()))
            }
            LifecycleState::Rendering => {
                self.render_frame()?;
                Ok(Next::Continue)
            }
        }
    }

    /// Waits until every declared shader linked, then enters `Rendering`.
    ///
    /// Each completion is awaited on its channel, so there is no polling delay.
    pub async fn wait_until_ready(&mut self) -> Result<(), SceneError> {
        while self.state == LifecycleState::ShadersLoading {
            if self.shaders.is_all_ready(self.expected_shaders) {
                return self.become_ready();
            }
            let deadline = match (self.config.shader_load_timeout(), self.loading_since) {
                (Some(limit), Some(since)) => Some(limit.saturating_sub(since.elapsed())),
                _ => None,
            };
            let Some(context) = self.context.as_mut() else {
                break;
            };
            let next = self.shaders.next_completion(context.api_mut());
            let outcome = match deadline {
                Some(remaining) => tokio::time::timeout(remaining, next).await.ok(),
                None => Some(next.await),
            };
            let outcome = outcome.unwrap_or_else(|| {
                Err(ShaderError::Timeout {
                    pending: self.shaders.pending(),
                })
            });
            match outcome {
                Ok(true) => {}
                Ok(false) => {
                    if self.shaders.is_all_ready(self.expected_shaders) {
                        return self.become_ready();
                    }
                    let pending = self.shaders.pending();
                    return Err(self.fail(ShaderError::Timeout { pending }));
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
        Ok(())
    }

    fn check_timeout(&mut self) -> Result<(), SceneError> {
        let (Some(limit), Some(since)) = (self.config.shader_load_timeout(), self.loading_since) else {
            return Ok(());
        };
        if since.elapsed() < limit {
            return Ok(());
        }
        let pending = self.shaders.pending();
        Err(self.fail(ShaderError::Timeout { pending }))
    }

    fn become_ready(&mut self) -> Result<(), SceneError> {
        self.enter(LifecycleState::Ready);
        if let Err(e) = self.prepare_resources() {
            return Err(self.fail(e));
        }
        self.last_frame = None;
        self.enter(LifecycleState::Rendering);
        Ok(())
    }

    fn prepare_resources(&mut self) -> Result<(), SceneError> {
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        self.meshes.declare(self.scene.declare_meshes());
        self.textures.request_load(
            context.api_mut(),
            self.scene.declare_textures(),
            self.assets.clone(),
            self.media.clone(),
            &self.runtime,
            &self.gate,
        );
        self.plan = DrawPlan::new(self.scene.declare_draw_plan())?;
        self.plan.validate(
            |name| self.shaders.contains(name),
            |name| self.meshes.contains(name),
            |name| self.textures.contains(name),
        )?;

        self.meshes.materialize_buffers(context.api_mut());
        for (shader, mesh) in self.plan.shader_mesh_pairs() {
            let program = self.shaders.get(shader).and_then(|entry| entry.program());
            let bound = self.meshes.bind_layout(context.api_mut(), mesh, program)?;
            log::debug!("Bound {bound} attributes of mesh '{mesh}' for shader '{shader}'");
        }
        Ok(())
    }

    /// Renders one frame. Does nothing unless the controller is `Rendering`.
    pub fn render_frame(&mut self) -> Result<(), SceneError> {
        if self.state != LifecycleState::Rendering {
            return Ok(());
        }
        let Some(context) = self.context.as_mut() else {
            return Ok(());
        };
        if let Some(size) = self.pending_surface.take() {
            context.resize_surface(size);
        }
        self.textures.poll_completions();

        let now = Instant::now();
        let dt = self.last_frame.map_or(Duration::ZERO, |last| now - last);
        self.last_frame = Some(now);

        context.begin_frame(self.scene.clear_colour());
        let projection = self.projection.calc_matrix(context.surface());
        let mut frame = Frame::new(
            context.api_mut(),
            &self.shaders,
            &self.meshes,
            &self.textures,
            &self.plan,
            projection,
        );
        let drawn = self.scene.draw_frame(&mut frame, dt);
        if let Err(e) = drawn {
            return Err(self.fail(e));
        }
        if let Err(e) = context.present() {
            log::error!("Unable to present frame of '{}': {e}", self.scene.title());
        }
        self.frames += 1;
        Ok(())
    }

    /// Refits the drawable to a new host viewport. Applied before the next frame.
    pub fn resize(&mut self, viewport_width: u32, viewport_height: u32) {
        if !self.subscribed {
            log::debug!("Ignoring resize of inactive scene '{}'", self.scene.title());
            return;
        }
        self.pending_surface = Some(SurfaceSize::fit(
            viewport_width,
            viewport_height,
            self.config.canvas_scale,
        ));
    }

    /// Stops loading and rendering and releases every GPU object.
    ///
    /// Safe to call in any state, any number of times, including while loads
    /// are still in flight.
    pub fn teardown(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        self.gate.close();
        self.textures.stop_all_media();
        self.state = LifecycleState::TornDown;
        self.last_frame = None;
        self.pending_surface = None;
        self.subscribed = false;

        if let Some(mut context) = self.context.take() {
            context.unbind_all();
            self.textures.release_all(context.api_mut());
            self.meshes.release(context.api_mut());
            self.shaders.release_all(context.api_mut());
            context.invalidate();
            context.shrink_surface();
            self.released = Some(context.into_api());
        }
        log::info!("Scene '{}' torn down", self.scene.title());
    }

    fn fail(&mut self, error: impl Into<SceneError>) -> SceneError {
        let error = error.into();
        log::error!("Scene '{}' failed: {error}", self.scene.title());
        self.teardown();
        error
    }

    fn enter(&mut self, state: LifecycleState) {
        log::info!("Scene '{}': {:?} -> {:?}", self.scene.title(), self.state, state);
        self.state = state;
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn title(&self) -> &str {
        self.scene.title()
    }

    pub fn shaders(&self) -> &ShaderRegistry {
        &self.shaders
    }

    pub fn meshes(&self) -> &MeshRegistry {
        &self.meshes
    }

    pub fn textures(&self) -> &TextureRegistry {
        &self.textures
    }

    pub fn plan(&self) -> &DrawPlan {
        &self.plan
    }

    /// Number of distinct shader names the scene declared.
    pub fn expected_shaders(&self) -> usize {
        self.expected_shaders
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames
    }

    /// Whether host resize events still reach this controller.
    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn surface(&self) -> Option<SurfaceSize> {
        self.context.as_ref().map(GraphicsContext::surface)
    }

    /// The backend, live or already disposed of.
    pub fn api(&self) -> Option<&A> {
        self.context
            .as_ref()
            .map(GraphicsContext::api)
            .or(self.released.as_ref())
    }

    /// Hands the disposed backend back after teardown.
    pub fn take_api(&mut self) -> Option<A> {
        self.released.take()
    }
}

impl<A: GraphicsApi> Drop for SceneController<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}
