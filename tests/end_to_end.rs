//! Full frames driven through the public API against the headless device.

use cgmath::{Matrix4, SquareMatrix};
use corral::gfx::rendering::DeviceCommand;
use corral::prelude::*;

fn context() -> AppContext<HeadlessDevice> {
    AppContext::new(HeadlessDevice::new(), ViewerConfig::default()).unwrap()
}

#[test]
fn cube_at_origin_draws_36_indices_with_identity_model() {
    let mut ctx = context();
    let id = ctx
        .scene
        .create_object(&mut ctx.device, "c1", create_cube(1.0))
        .unwrap();
    assert_eq!(ctx.scene.get_object("c1"), Some(id));

    ctx.render_frame(640, 480, 0.0).unwrap();

    let draws = ctx.device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].index_count, 36);
    let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
    assert_eq!(draws[0].uniforms.model, identity);
    assert_eq!(draws[0].uniforms.use_texture, 0);
}

#[test]
fn frame_begins_with_scene_clear_color_and_depth_test() {
    let mut config = ViewerConfig::default().with_clear_color([0.2, 0.3, 0.4, 1.0]);
    config.width = 320;
    config.height = 200;
    let mut ctx = AppContext::new(HeadlessDevice::new(), config).unwrap();

    ctx.render_frame(320, 200, 0.0).unwrap();

    let settings = ctx.device.commands().iter().find_map(|command| match command {
        DeviceCommand::BeginFrame(settings) => Some(*settings),
        _ => None,
    });
    let settings = settings.expect("frame was not begun");
    assert_eq!(settings.clear_color, [0.2, 0.3, 0.4, 1.0]);
    assert_eq!(settings.viewport.width, 320);
    assert_eq!(settings.viewport.height, 200);
    assert!(settings.depth_test);
}

#[test]
fn moved_and_recolored_mesh_is_reuploaded_before_drawing() {
    let mut ctx = context();
    let id = ctx
        .scene
        .create_object(&mut ctx.device, "wall", create_wall(2.0, 0.1, 6.0))
        .unwrap();
    ctx.render_frame(640, 480, 0.0).unwrap();

    let mesh = ctx.scene.object_mut(id).unwrap();
    mesh.set_position(Vector3::new(1.0, 0.0, -2.0));
    mesh.set_color(Vector3::new(1.0, 0.0, 0.0));
    let buffers = mesh.buffers().unwrap();

    ctx.device.clear_log();
    ctx.render_frame(640, 480, 0.0).unwrap();

    let floats = ctx.device.vertex_floats(buffers.vertex_buffer).unwrap();
    // extended layout: position then color
    assert_eq!(&floats[3..6], &[1.0, 0.0, 0.0]);
    assert_eq!(ctx.device.write_count(buffers.vertex_buffer), 1);

    let model = ctx.device.draws()[0].uniforms.model;
    assert_eq!(model[3], [1.0, 0.0, -2.0, 1.0]);
}

#[test]
fn duplicate_names_get_suffixes_and_cleanup_invalidates_ids() {
    let mut ctx = context();
    let first = ctx
        .scene
        .create_object(&mut ctx.device, "box", create_cube(1.0))
        .unwrap();
    ctx.scene
        .create_object(&mut ctx.device, "box", create_cube(1.0))
        .unwrap();

    let names: Vec<&str> = ctx.scene.object_names().collect();
    assert_eq!(names, ["box", "box (1)"]);

    ctx.shutdown();
    assert!(ctx.scene.object(first).is_none());
    assert!(ctx.scene.get_object("box").is_none());
    assert_eq!(ctx.device.live_buffer_count(), 0);
}
