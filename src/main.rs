//! Sonogram - live spectrogram of the microphone or a soundfile
//!
//! Space toggles between microphone and soundfile, S saves the canvas,
//! Escape quits.

use clap::Parser;
use log::{error, info, warn};
use std::process::ExitCode;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use sonogram::audio::{AudioContext, AudioDevices, CpalDevices};
use sonogram::cli::Args;
use sonogram::error::{Result, SonogramError};
use sonogram::model::SpectrogramModel;
use sonogram::params::{RenderConfig, SpectrogramConfig};
use sonogram::rendering::RenderSystem;
use sonogram::view::{PixelCanvas, SpectrogramView};

/// Main application state
struct App {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,

    // Audio model and its view
    model: Option<SpectrogramModel<CpalDevices>>,
    view: SpectrogramView,
    canvas: PixelCanvas,

    // Configuration
    spectrogram_config: SpectrogramConfig,
    render_config: RenderConfig,
    screenshot: Option<std::path::PathBuf>,

    /// Startup failure reported on exit
    failure: Option<SonogramError>,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let spectrogram_config = args.spectrogram_config();
        let render_config = args.render_config();
        spectrogram_config.validate()?;
        render_config.validate()?;

        let view = SpectrogramView::new(&render_config, spectrogram_config.frequency_bin_count());
        let canvas = PixelCanvas::new(render_config.canvas_width, render_config.canvas_height);

        Ok(Self {
            window: None,
            render_system: None,
            model: None,
            view,
            canvas,
            spectrogram_config,
            render_config,
            screenshot: args.screenshot.clone(),
            failure: None,
        })
    }

    /// Create window, GPU presenter and audio model, then run startup
    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Sonogram")
            .with_inner_size(winit::dpi::LogicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .map_err(|e| SonogramError::Render(format!("Failed to create window: {}", e)))?,
        );

        let canvas_size = (
            self.render_config.canvas_width,
            self.render_config.canvas_height,
        );
        let render_system = pollster::block_on(RenderSystem::new(Arc::clone(&window), canvas_size))?;
        self.window = Some(window);
        self.render_system = Some(render_system);

        let devices = CpalDevices::new()?;
        let context = AudioContext::new(devices.sample_rate() as f32);
        let mut model = SpectrogramModel::new(self.spectrogram_config.clone(), context, devices)?;
        model.initialize()?;
        self.model = Some(model);

        info!("Sonogram is running (Space: toggle input, S: screenshot, Esc: quit)");
        Ok(())
    }

    /// Advance the model one animation frame and present the canvas
    fn render_frame(&mut self) {
        let (Some(model), Some(render_system)) = (&mut self.model, &mut self.render_system) else {
            return;
        };

        if let Err(e) = model.poll_devices() {
            error!("Soundfile reload failed: {}", e);
        }
        model.animation_frame();

        let playing = model.is_playing();
        for event in model.take_events() {
            if let Err(e) = self.view.handle_event(&event, playing, &mut self.canvas) {
                warn!("Dropped frame: {}", e);
            }
        }

        render_system.upload_canvas(&self.canvas);
        match render_system.render() {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                if let Some(window) = &self.window {
                    let size = window.inner_size();
                    render_system.resize(size.width, size.height);
                }
            }
            Err(e) => error!("Render error: {:?}", e),
        }
    }

    fn toggle_input(&mut self) {
        if let Some(model) = &mut self.model {
            if let Err(e) = model.input_toggle() {
                error!("Input toggle failed: {}", e);
            }
        }
    }

    fn save_screenshot(&self) {
        let path = self
            .screenshot
            .clone()
            .unwrap_or_else(|| std::path::PathBuf::from("sonogram.png"));
        match self.canvas.save_png(&path) {
            Ok(()) => info!("Saved screenshot to {}", path.display()),
            Err(e) => error!("{}", e),
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if self.screenshot.is_some() && self.model.is_some() {
            self.save_screenshot();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() || self.failure.is_some() {
            return; // Already initialized
        }

        if let Err(e) = self.start(event_loop) {
            error!("Startup failed: {}", e);
            self.failure = Some(e);
            event_loop.exit();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::Resized(size) => {
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(size.width, size.height);
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => match code {
                KeyCode::Escape => self.quit(event_loop),
                KeyCode::Space => self.toggle_input(),
                KeyCode::KeyS => self.save_screenshot(),
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                self.render_frame();
            }
            _ => {}
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut app = match App::new(&args) {
        Ok(app) => app,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            error!("Failed to create event loop: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = event_loop.run_app(&mut app) {
        error!("Event loop error: {}", e);
        return ExitCode::FAILURE;
    }

    match app.failure {
        Some(_) => ExitCode::FAILURE,
        None => ExitCode::SUCCESS,
    }
}
