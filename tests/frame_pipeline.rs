//! End-to-end frame pipeline tests: publish constants, encode materials,
//! assemble draw bindings, and hand slots back through fences the way a
//! submission layer would.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use glam::{Mat4, Vec3, Vec4};

use graphics_bindings::{
    bind_for_draw, BindingError, Fence, FramePublisher, MaterialEncoder, MaterialFactors,
    MaterialTextures, RingConfig, TextureTable, VertexBufferId,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Drives frames through the publisher with a GPU stand-in thread that
/// signals each submission's fence after a short delay.
#[test]
fn full_frame_loop_with_deferred_completion() {
    init_logging();

    let table = Arc::new(TextureTable::new());
    let encoder = MaterialEncoder::new(table.clone());
    let albedo = table.register("crate_albedo");

    let material = encoder
        .encode(
            MaterialFactors::with_base_color(Vec4::new(0.8, 0.6, 0.4, 1.0)),
            MaterialTextures::none().with_base_color(albedo),
        )
        .unwrap();

    let mut publisher = FramePublisher::new(RingConfig {
        begin_frame_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap();

    let (tx, rx) = mpsc::channel::<Fence>();
    let gpu = std::thread::spawn(move || {
        while let Ok(fence) = rx.recv() {
            std::thread::sleep(Duration::from_millis(1));
            fence.signal();
        }
    });

    // More frames than ring slots, so slot reuse must wait on the fences.
    for frame_index in 0..10u64 {
        let mut frame = publisher.begin_frame().unwrap();
        assert_eq!(frame.frame(), frame_index);

        let view = Mat4::look_at_rh(Vec3::new(0.0, 2.0, 5.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(1.2, 16.0 / 9.0, 0.1, 100.0);
        let frame_handle = frame.publish_frame(view, projection).unwrap();

        for i in 0..8 {
            let model = Mat4::from_translation(Vec3::new(i as f32, 0.0, 0.0));
            let instance_handle = frame.publish_instance(model).unwrap();

            let bindings = bind_for_draw(
                VertexBufferId(1),
                frame_handle,
                instance_handle,
                material.id(),
            )
            .unwrap();
            assert_eq!(bindings.frame(), frame_index);
        }

        tx.send(frame.finish()).unwrap();
    }

    drop(tx);
    gpu.join().unwrap();
}

#[test]
fn begin_frame_times_out_when_gpu_stalls() {
    init_logging();

    let mut publisher = FramePublisher::new(RingConfig {
        slot_count: 2,
        begin_frame_timeout: Duration::from_millis(20),
        ..Default::default()
    })
    .unwrap();

    // Fill both slots without ever signaling completion.
    let _f0 = publisher.begin_frame().unwrap().finish();
    let _f1 = publisher.begin_frame().unwrap().finish();

    let err = publisher.begin_frame().unwrap_err();
    assert!(matches!(err, BindingError::ResourceBusy { .. }));
}

#[test]
fn constants_survive_until_submission() {
    init_logging();

    let mut publisher = FramePublisher::new(RingConfig::default()).unwrap();
    let mut frame = publisher.begin_frame().unwrap();

    let view = Mat4::from_rotation_y(0.5);
    let projection = Mat4::orthographic_rh(-1.0, 1.0, -1.0, 1.0, 0.0, 1.0);
    let frame_handle = frame.publish_frame(view, projection).unwrap();

    let model = Mat4::from_translation(Vec3::new(3.0, 0.0, -1.0));
    let instance_handle = frame.publish_instance(model).unwrap();

    let frame_constants = frame.read_back_frame(frame_handle).unwrap();
    assert_eq!(frame_constants.view, view);
    assert_eq!(frame_constants.projection, projection);

    let instance_constants = frame.read_back_instance(instance_handle).unwrap();
    assert_eq!(instance_constants.model, model);

    frame.finish().signal();
}

#[test]
fn material_dedup_across_frames() {
    init_logging();

    let table = Arc::new(TextureTable::new());
    let encoder = MaterialEncoder::new(table.clone());
    let albedo = table.register("shared_albedo");
    let textures = MaterialTextures::none().with_base_color(albedo);

    let first = encoder.encode(MaterialFactors::default(), textures).unwrap();
    let second = encoder.encode(MaterialFactors::default(), textures).unwrap();
    assert_eq!(first.id(), second.id());
    assert_eq!(encoder.cached_count(), 1);

    // A different factor set is a different argument buffer.
    let tinted = encoder
        .encode(
            MaterialFactors::with_base_color(Vec4::new(1.0, 0.0, 0.0, 1.0)),
            textures,
        )
        .unwrap();
    assert_ne!(tinted.id(), first.id());
}

#[test]
fn eviction_invalidates_referencing_materials_only() {
    init_logging();

    let table = Arc::new(TextureTable::new());
    let encoder = MaterialEncoder::new(table.clone());
    let shared = table.register("shared");
    let solo = table.register("solo");

    for metallic in [0.0f32, 0.5, 1.0] {
        encoder
            .encode(
                MaterialFactors {
                    metallic_factor: metallic,
                    ..Default::default()
                },
                MaterialTextures::none().with_base_color(shared),
            )
            .unwrap();
    }
    let untouched = encoder
        .encode(
            MaterialFactors::default(),
            MaterialTextures::none().with_base_color(solo),
        )
        .unwrap();

    table.evict(shared);
    assert_eq!(encoder.flush_evicted(), 3);
    assert_eq!(encoder.cached_count(), 1);

    // The survivor still resolves identically.
    let again = encoder
        .encode(
            MaterialFactors::default(),
            MaterialTextures::none().with_base_color(solo),
        )
        .unwrap();
    assert_eq!(again.id(), untouched.id());
}

#[test]
fn publish_ordering_is_enforced() {
    init_logging();

    let mut publisher = FramePublisher::new(RingConfig::default()).unwrap();
    let mut frame = publisher.begin_frame().unwrap();

    assert!(matches!(
        frame.publish_instance(Mat4::IDENTITY),
        Err(BindingError::PublishOrdering(_))
    ));

    frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY).unwrap();
    frame.publish_instance(Mat4::IDENTITY).unwrap();

    assert!(matches!(
        frame.publish_frame(Mat4::IDENTITY, Mat4::IDENTITY),
        Err(BindingError::PublishOrdering(_))
    ));
}
