//! Application shell: window, event loop and the per-frame sequence.
//!
//! [`CorralApp`] owns the winit event loop and creates the window and
//! [`WgpuDevice`] on `resumed`. Everything a frame needs lives in an
//! [`AppContext`], which is generic over the device so the frame sequence
//! runs unchanged against [`HeadlessDevice`](crate::gfx::rendering::HeadlessDevice).

use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{CursorGrabMode, Window, WindowAttributes, WindowId},
};

use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::gfx::{
    camera::{Camera, CameraController},
    rendering::{RenderDevice, WgpuDevice},
    resources::ShaderProgram,
    scene::Scene,
};
use crate::logging::init_logging;

/// Scene, camera, shader programs and device for one window.
pub struct AppContext<D: RenderDevice> {
    pub device: D,
    pub scene: Scene,
    pub camera: Camera,
    pub controller: CameraController,
    pub object_shader: ShaderProgram,
    pub light_shader: ShaderProgram,
    pub config: ViewerConfig,
    shut_down: bool,
}

impl<D: RenderDevice> AppContext<D> {
    /// Compiles the built-in programs and sets up an empty scene
    pub fn new(mut device: D, config: ViewerConfig) -> Result<Self> {
        let object_shader = ShaderProgram::object_shader(&mut device)?;
        let light_shader = ShaderProgram::light_shader(&mut device)?;

        let mut scene = Scene::new(object_shader.handle());
        scene.set_clear_color(config.clear_color);

        Ok(Self {
            device,
            scene,
            camera: Camera::from_config(&config.camera, config.aspect_ratio()),
            controller: CameraController::new(config.camera.move_speed),
            object_shader,
            light_shader,
            config,
            shut_down: false,
        })
    }

    /// Runs one frame of `dt` seconds into a `width` x `height` viewport
    pub fn render_frame(&mut self, width: u32, height: u32, dt: f32) -> Result<()> {
        if self.shut_down {
            return Ok(());
        }

        self.controller.update_camera(&mut self.camera, dt);
        self.scene.update_all(&mut self.device);
        self.scene.prepare_draw(&mut self.device, width, height);

        let view = self.camera.view_matrix();
        let projection = self.camera.projection_matrix();

        if let Some(light) = self.scene.first_light() {
            self.object_shader.set_vec3("u_lightPos", light.position());
            self.object_shader.set_vec3("u_lightColor", light.color());
        }
        self.object_shader.set_vec3("u_viewPos", self.camera.eye());

        self.scene
            .draw_objects(&mut self.device, view, projection, &mut self.object_shader);
        self.scene
            .draw_light_sources(&mut self.device, view, projection, &mut self.light_shader);

        self.device.end_frame()
    }

    /// Keeps the camera's aspect ratio in step with the window
    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.update_aspect_ratio(width, height);
    }

    /// Releases scene resources and both programs. Only the first call
    /// does anything.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        self.scene.clean_up_all(&mut self.device);
        self.device.delete_program(self.object_shader.handle());
        self.device.delete_program(self.light_shader.handle());
        log::info!("Scene resources released");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

/// Builds the initial scene once the window and device exist
pub type SetupFn = Box<dyn FnOnce(&mut AppContext<WgpuDevice>) -> Result<()>>;

/// Windowed viewer application
pub struct CorralApp {
    config: ViewerConfig,
    setup: Option<SetupFn>,
}

impl CorralApp {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            setup: None,
        }
    }

    /// Registers the closure that populates the scene
    pub fn with_setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut AppContext<WgpuDevice>) -> Result<()> + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// Runs the event loop until the window closes.
    ///
    /// Errors from device creation, scene setup or presentation end the
    /// loop and are returned here.
    pub fn run(self) -> Result<()> {
        init_logging(self.config.logging.clone());

        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let mut state = AppState {
            config: self.config,
            setup: self.setup,
            window: None,
            context: None,
            last_frame: Instant::now(),
            cursor: (0.0, 0.0),
            error: None,
        };
        event_loop.run_app(&mut state)?;

        match state.error.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

struct AppState {
    config: ViewerConfig,
    setup: Option<SetupFn>,
    window: Option<Arc<Window>>,
    context: Option<AppContext<WgpuDevice>>,
    last_frame: Instant,
    /// Unbounded cursor position accumulated from raw mouse motion
    cursor: (f64, f64),
    error: Option<ViewerError>,
}

impl AppState {
    fn create_context(&mut self, window: Arc<Window>) -> Result<AppContext<WgpuDevice>> {
        let PhysicalSize { width, height } = window.inner_size();
        let device = pollster::block_on(WgpuDevice::new(window, width, height))?;

        let mut context = AppContext::new(device, self.config.clone())?;
        context.resize(width, height);

        if let Some(setup) = self.setup.take() {
            if let Err(error) = setup(&mut context) {
                context.shutdown();
                return Err(error);
            }
        }

        let stats = context.scene.statistics();
        log::info!(
            "Scene ready: {} objects, {} lights, {} triangles",
            stats.object_count,
            stats.light_count,
            stats.total_triangles
        );
        Ok(context)
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: ViewerError) {
        log::error!("{}", error);
        self.error = Some(error);
        self.exit(event_loop);
    }

    fn exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(context) = self.context.as_mut() {
            context.shutdown();
        }
        event_loop.exit();
    }

    fn grab_cursor(window: &Window, grab: bool) {
        if grab {
            let grabbed = window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
            if let Err(e) = grabbed {
                log::warn!("Cursor grab unavailable: {}", e);
            }
        } else if let Err(e) = window.set_cursor_grab(CursorGrabMode::None) {
            log::warn!("Cursor release failed: {}", e);
        }
        window.set_cursor_visible(!grab);
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.title.clone())
            .with_inner_size(PhysicalSize::new(self.config.width, self.config.height));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        match self.create_context(window.clone()) {
            Ok(context) => {
                self.context = Some(context);
                Self::grab_cursor(&window, true);
                self.last_frame = Instant::now();
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(context) = self.context.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => self.exit(event_loop),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.exit(event_loop),
            WindowEvent::KeyboardInput { event, .. } => {
                context.controller.process_keyboard(&event);
            }
            WindowEvent::Focused(focused) => {
                if !focused {
                    context.controller.reset();
                    context.camera.reset_mouse();
                }
                if let Some(window) = self.window.as_ref() {
                    Self::grab_cursor(window, focused);
                }
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                context.resize(width, height);
                context.device.resize(width, height);
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                let dt = now.duration_since(self.last_frame).as_secs_f32();
                self.last_frame = now;

                let (width, height) = context.device.surface_size();
                if let Err(error) = context.render_frame(width, height, dt) {
                    self.fail(event_loop, error);
                }
            }
            _ => (),
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        let Some(context) = self.context.as_mut() else {
            return;
        };

        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.cursor.0 += dx;
            self.cursor.1 += dy;
            let (x, y) = self.cursor;
            context.controller.process_cursor(x, y, &mut context.camera);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(context) = self.context.as_mut() {
            context.shutdown();
        }
    }
}
