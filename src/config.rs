//! Viewer configuration
//!
//! Plain structs with sensible defaults and builder-style setters. There is no
//! configuration file; demos construct a [`ViewerConfig`] in code.

use cgmath::{Deg, Vector3};

use crate::logging::LoggingConfig;

/// Camera projection and movement parameters
#[derive(Debug, Clone, Copy)]
pub struct CameraConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// World units per second
    pub move_speed: f32,
    /// Degrees of rotation per pixel of mouse travel
    pub mouse_sensitivity: f32,
    pub eye: Vector3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            move_speed: 2.5,
            mouse_sensitivity: 0.1,
            eye: Vector3::new(0.0, 0.0, 0.0),
        }
    }
}

/// Top-level settings for a [`CorralApp`](crate::app::CorralApp)
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub clear_color: [f32; 4],
    pub camera: CameraConfig,
    pub logging: LoggingConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "corral".to_string(),
            width: 640,
            height: 480,
            clear_color: [0.1, 0.2, 0.3, 1.0],
            camera: CameraConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_owned();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width.max(1);
        self.height = height.max(1);
        self
    }

    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_camera(mut self, camera: CameraConfig) -> Self {
        self.camera = camera;
        self
    }

    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Width over height of the initial window
    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}
