use std::path::PathBuf;

use image::Rgba;
use uuid::Uuid;

use texturer::base::util::fs;
use texturer::export::{
    encode_png, export_session, ExportInfo, FragmentTexture, Material,
    MaterialCollector, EXPORT_INFO_FILE, FRAGMENT_TEXTURES_FILE,
};
use texturer::replay::{replay_scan, Replay};
use texturer::session::{
    ReconstructionSession, SessionState, TextureIssue, TexturingParams,
};
use texturer::texture::{
    camera_pose_looking_at, pose_to_column_major, Image, Point3, Strategy,
};

fn temp_dir() -> PathBuf {
    let dir = std::env::temp_dir()
        .join(format!("texturer-test-{}", Uuid::new_v4()));
    fs::create_dir(&dir).unwrap();
    dir
}

fn new_session() -> ReconstructionSession<MaterialCollector> {
    ReconstructionSession::new(
        MaterialCollector::default(),
        TexturingParams::default(),
    )
}

#[test]
fn test_fragments_around_object_get_textures_from_facing_cameras() {
    let mut session = new_session();
    let front = Uuid::from_u128(1);
    let back = Uuid::from_u128(2);
    let front_pos = Point3::origin();
    let back_pos = Point3::new(0.0, 0.0, 1.5);
    session.register_or_update_fragment(front, front_pos);
    session.register_or_update_fragment(back, back_pos);

    let front_image = Image::from_pixel(4, 4, Rgba([255, 0, 0, 255]));
    let back_image = Image::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
    // Both cameras sit between the fragments, looking away from each other.
    let front_cam =
        camera_pose_looking_at(&Point3::new(0.0, 0.0, 0.5), &front_pos)
            .unwrap();
    let back_cam =
        camera_pose_looking_at(&Point3::new(0.0, 0.0, 1.0), &back_pos)
            .unwrap();
    assert!(session.capture_sample(front_image.clone(), front_cam, 0.0));
    assert!(session.capture_sample(back_image.clone(), back_cam, 1.0));

    let report = session.request_finalize(Strategy::TopKBlend).unwrap();
    assert_eq!(session.state(), SessionState::Done);
    assert_eq!(report.num_textured(), 2);
    assert!(report.outcomes.iter().all(|o| o.issue.is_none()));

    let materials = session.adapter();
    assert_eq!(
        materials.get(&front),
        Some(&Material::Texture(front_image))
    );
    assert_eq!(materials.get(&back), Some(&Material::Texture(back_image)));
}

#[test]
fn test_finalize_without_samples_uses_fallback_everywhere() {
    let mut session = new_session();
    let ids: Vec<Uuid> = (1..=3).map(Uuid::from_u128).collect();
    for (i, id) in ids.iter().enumerate() {
        let position = Point3::new(i as f64, 0.0, 0.0);
        session.register_or_update_fragment(*id, position);
    }

    let report = session.request_finalize(Strategy::SingleBest).unwrap();
    assert_eq!(report.num_fallbacks(), 3);
    for (outcome, id) in report.outcomes.iter().zip(&ids) {
        assert_eq!(outcome.id, *id);
        assert_eq!(outcome.issue, Some(TextureIssue::EmptyFrameStore));
        assert_eq!(session.adapter().get(id), Some(&Material::Fallback));
    }
}

#[test]
fn test_replay_and_export_to_directory() {
    let dir = temp_dir();
    let image = Image::from_pixel(3, 3, Rgba([40, 80, 120, 255]));
    fs::write_file(dir.join("frame.png"), &encode_png(&image).unwrap())
        .unwrap();

    let pose = camera_pose_looking_at(
        &Point3::new(0.3, 0.0, 0.4),
        &Point3::origin(),
    )
    .unwrap();
    let replay_json = serde_json::json!({
        "samples": [
            {
                "image": "frame.png",
                "pose": pose_to_column_major(&pose).to_vec(),
                "timestamp": 2.0
            }
        ],
        "fragments": [
            {"id": Uuid::from_u128(1), "position": [0.0, 0.0, 0.0]},
            {"id": Uuid::from_u128(2), "position": [1.0, 0.0, 0.0]}
        ]
    });
    let replay =
        Replay::from_json(&serde_json::to_vec(&replay_json).unwrap()).unwrap();

    let mut session = new_session();
    let report =
        replay_scan(&mut session, &replay, &dir, Strategy::FirstVisible)
            .unwrap();

    let out = dir.join("out");
    fs::create_dir(&out).unwrap();
    let info = export_session(
        &report,
        session.adapter(),
        |p, d| fs::write_file(p, d),
        &out,
        &Rgba([0, 0, 0, 255]),
        0.0,
    )
    .unwrap();
    assert_eq!(info.total_images, 1);
    assert_eq!(info.textured_fragments, 1);

    let stored: ExportInfo = serde_json::from_slice(
        &fs::read_file(out.join(EXPORT_INFO_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(stored, info);

    let textures: Vec<FragmentTexture> = serde_json::from_slice(
        &fs::read_file(out.join(FRAGMENT_TEXTURES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(textures.len(), 2);
    assert!(!textures[0].fallback);
    assert!(textures[1].fallback);

    let exported = image::open(out.join(&textures[0].image))
        .unwrap()
        .into_rgba8();
    assert_eq!(exported, image);
    assert!(out.join("image_0.png").exists());
    assert!(out.join("camera_transforms.json").exists());
}
