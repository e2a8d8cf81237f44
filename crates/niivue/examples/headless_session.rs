//! Headless session: drives a viewer over stdout and replays a few frontend
//! frames to show event dispatch.
//!
//! Run with `RUST_LOG=debug cargo run --example headless_session`.

use std::rc::Rc;

use niivue::*;
use serde_json::json;

fn main() -> Result<()> {
    init_logging();

    let transport = Rc::new(JsonLinesTransport::new(std::io::stdout()));
    let options = Options::from_pairs([
        ("back_color", json!([0.1, 0.1, 0.1, 1.0])),
        ("slice_type", json!("multiplanar")),
        ("show_3d_crosshair", json!(true)),
    ])?;
    let nv = NiiVue::with_options(400, options, transport);

    nv.load_volumes([
        VolumeFields::from_path("https://niivue.github.io/niivue/images/mni152.nii.gz")
            .with_id("mni")
            .with_colormap("gray"),
        VolumeFields::from_path("https://niivue.github.io/niivue/images/hippo.nii.gz")
            .with_id("hippo")
            .with_colormap("red")
            .with_opacity(0.6),
    ])?;
    nv.load_meshes([MeshFields::from_path("https://niivue.github.io/niivue/images/BrainMesh_ICBM152.lh.mz3")
        .with_id("lh")
        .with_rgba255([200, 162, 255, 255])
        .with_layer(MeshLayer::new(
            "https://niivue.github.io/niivue/images/BrainMesh_ICBM152.lh.motor.mz3",
        ))])?;

    nv.on_image_loaded(|resolved| match resolved {
        Resolved::Entity(volume) => eprintln!("loaded volume '{}'", volume.id()),
        Resolved::Raw(payload) => eprintln!("loaded unknown image {payload}"),
    });
    let viewer = nv.clone();
    nv.on_intensity_change(move |volume| {
        eprintln!("intensity changed on '{}', saving scene", volume.id());
        viewer.save_screenshot();
    });
    nv.on_location_change(|location| eprintln!("crosshair at {location}"));

    for frame in [
        json!({"method": "custom", "content": {"event": "image_loaded", "data": {"id": "mni"}}}),
        json!({"method": "custom", "content": {"event": "image_loaded", "data": {"id": "other"}}}),
        json!({"method": "custom", "content": {"event": "intensity_change", "data": {"id": "hippo"}}}),
        json!({"method": "custom", "content": {"event": "location_change", "data": {"mm": [0, -18, 12]}}}),
        json!({"method": "custom", "content": {"event": "add_volume", "data": {"path": "chris_t1.nii.gz", "id": "t1", "index": 0}}}),
    ] {
        nv.handle_frame(&frame.to_string())?;
    }

    nv.set_gamma(1.2)?;
    nv.set_crosshair_color(&[1.0, 0.0, 0.0, 1.0])?;
    nv.set_colormap("hippo", "warm")?;

    let ids: Vec<String> = nv.volumes().iter().map(Volume::id).collect();
    eprintln!("volumes: {ids:?}");
    Ok(())
}
