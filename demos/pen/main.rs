//! # Pen Demo
//!
//! A small walled pen with a few cubes, a diamond and a light, viewed through
//! the fly camera.
//!
//! ## Usage:
//! ```bash
//! cargo run --example pen
//! cargo run --example pen -- path/to/model.obj path/to/texture.png
//! ```
//!
//! ## Controls:
//! - WASD / arrows: move, Space / Shift: up and down
//! - Mouse: look around
//! - Escape: quit

use std::path::PathBuf;

use corral::gfx::geometry::{DEFAULT_WALL_HEIGHT, DEFAULT_WALL_LENGTH, DEFAULT_WALL_WIDTH};
use corral::prelude::*;

const PEN_HALF_SIZE: f32 = 4.0;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1).map(PathBuf::from);
    let model_path = args.next();
    let texture_path = args.next();

    let config = ViewerConfig::default()
        .with_title("corral - pen")
        .with_size(1280, 720)
        .with_camera(CameraConfig {
            eye: Vector3::new(0.0, 1.5, 6.0),
            ..CameraConfig::default()
        })
        .with_logging(LoggingConfig::default().with_filter("info,wgpu_core=warn,naga=warn"));

    CorralApp::new(config)
        .with_setup(move |ctx| build_pen(ctx, model_path, texture_path))
        .run()?;
    Ok(())
}

fn build_pen(
    ctx: &mut AppContext<WgpuDevice>,
    model_path: Option<PathBuf>,
    texture_path: Option<PathBuf>,
) -> corral::Result<()> {
    let texture = match texture_path {
        Some(path) => {
            let id = ctx.scene.load_texture(&mut ctx.device, &path)?;
            ctx.scene.texture(id).and_then(Texture::handle)
        }
        None => None,
    };

    for (i, x) in [-1.5f32, 0.0, 1.5].into_iter().enumerate() {
        let cube = ctx
            .scene
            .create_object(&mut ctx.device, "cube", create_cube(0.8))?;
        if let Some(mesh) = ctx.scene.object_mut(cube) {
            mesh.set_position(Vector3::new(x, 0.4, 0.0));
            mesh.set_rotation(Deg(20.0 * i as f32), Vector3::unit_y());
            mesh.set_texture(texture);
        }
    }

    let diamond = ctx
        .scene
        .create_object(&mut ctx.device, "diamond", create_diamond(0.5))?;
    if let Some(mesh) = ctx.scene.object_mut(diamond) {
        mesh.set_position(Vector3::new(0.0, 2.0, -1.5));
        mesh.set_color(Vector3::new(0.3, 0.7, 0.9));
    }

    // four walls, each rotated about Y to close the pen
    let scale = Vector3::new(
        2.0 * PEN_HALF_SIZE / DEFAULT_WALL_LENGTH,
        0.5,
        1.0,
    );
    let sides = [
        (Vector3::new(0.0, 0.0, -PEN_HALF_SIZE), 0.0),
        (Vector3::new(0.0, 0.0, PEN_HALF_SIZE), 180.0),
        (Vector3::new(-PEN_HALF_SIZE, 0.0, 0.0), 90.0),
        (Vector3::new(PEN_HALF_SIZE, 0.0, 0.0), -90.0),
    ];
    for (position, angle) in sides {
        let wall = ctx.scene.create_object(
            &mut ctx.device,
            "wall",
            create_wall(DEFAULT_WALL_LENGTH, DEFAULT_WALL_WIDTH, DEFAULT_WALL_HEIGHT),
        )?;
        if let Some(mesh) = ctx.scene.object_mut(wall) {
            mesh.set_position(position);
            mesh.set_rotation(Deg(angle), Vector3::unit_y());
            mesh.set_scale(scale);
        }
    }

    let light = ctx
        .scene
        .create_object(&mut ctx.device, "light", create_pyramid(0.2))?;
    if let Some(mesh) = ctx.scene.object_mut(light) {
        mesh.set_position(Vector3::new(1.0, 3.0, 2.0));
        mesh.set_color(Vector3::new(1.0, 0.95, 0.8));
        mesh.set_light_emitter(true);
    }

    if let Some(path) = model_path {
        let model = ctx.scene.create_model(&mut ctx.device, "model", &path)?;
        if let Some(mesh) = ctx.scene.object_mut(model) {
            mesh.set_position(Vector3::new(0.0, 0.0, 2.0));
        }
        log::info!("Loaded model {}", path.display());
    }

    Ok(())
}
