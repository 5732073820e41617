//! Native host: a winit window driving one [`SceneController`].
//!
//! The event loop owns a tokio runtime. Shader and texture loads run on it
//! while the loop keeps ticking the controller: on a short timer while loading,
//! and from `RedrawRequested` once rendering.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::{
    config::EngineConfig,
    flow::{LifecycleState, Next, Scene, SceneController},
    gpu::WgpuApi,
    resources::{FileAssets, media::ImageMediaHost},
};

pub struct App {
    async_runtime: tokio::runtime::Runtime,
    config: EngineConfig,
    scene: Option<Box<dyn Scene>>,
    controller: Option<SceneController<WgpuApi>>,
    window: Option<Arc<Window>>,
}

impl App {
    pub fn new(scene: Box<dyn Scene>, config: EngineConfig) -> anyhow::Result<Self> {
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            async_runtime,
            config,
            scene: Some(scene),
            controller: None,
            window: None,
        })
    }

    fn tick(&mut self, event_loop: &ActiveEventLoop) {
        let Some(controller) = self.controller.as_mut() else {
            return;
        };
        match controller.tick() {
            Ok(Next::Continue) => {
                event_loop.set_control_flow(ControlFlow::Wait);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            Ok(Next::Recheck(delay)) => {
                event_loop.set_control_flow(ControlFlow::WaitUntil(std::time::Instant::now() + delay));
            }
            Ok(Next::Stop) => event_loop.exit(),
            Err(e) => {
                log::error!("{e}");
                event_loop.exit();
            }
        }
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(controller) = self.controller.as_mut() {
            controller.teardown();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(scene) = self.scene.take() else {
            return;
        };
        let window_attributes = Window::default_attributes()
            .with_title(scene.title())
            .with_inner_size(LogicalSize::new(self.config.window_width, self.config.window_height));
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let assets = Arc::new(FileAssets::new(self.config.resolved_asset_root()));
        let media = Arc::new(ImageMediaHost::new(self.async_runtime.handle().clone()));
        let mut controller = SceneController::new(
            scene,
            self.config.clone(),
            assets,
            media,
            self.async_runtime.handle().clone(),
        );
        let runtime = &self.async_runtime;
        let acquired = controller.activate(|| runtime.block_on(WgpuApi::new(window.clone())));
        if let Err(e) = acquired {
            log::error!("App initialization failed: {e}");
            event_loop.exit();
            return;
        }
        let size = window.inner_size();
        controller.resize(size.width, size.height);

        self.controller = Some(controller);
        self.window = Some(window);
        self.tick(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.shutdown(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(controller) = self.controller.as_mut() {
                    controller.resize(size.width, size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                let rendering = self
                    .controller
                    .as_ref()
                    .is_some_and(|c| c.state() == LifecycleState::Rendering);
                if rendering {
                    self.tick(event_loop);
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let loading = self
            .controller
            .as_ref()
            .is_some_and(|c| c.state() == LifecycleState::ShadersLoading);
        if loading {
            self.tick(event_loop);
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(controller) = self.controller.as_mut() {
            controller.teardown();
        }
    }
}

/// Opens a window and renders `scene` until it is closed.
pub fn run(scene: Box<dyn Scene>, config: EngineConfig) -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(scene, config)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}
