use structopt::StructOpt;

use crate::texture::{pose_translation, Point3, Pose, Vector3, Vector4};

const DEGENERATE_LENGTH: f64 = 1e-12;

#[derive(Clone, Copy, Debug, StructOpt)]
pub struct ScoringParams {
    #[structopt(
        help = "Camera-to-fragment distance scoring best",
        long,
        default_value = "0.5"
    )]
    pub ideal_distance: f64,

    #[structopt(
        help = "Vertical camera field of view, in degrees",
        long = "fov-y",
        default_value = "60"
    )]
    pub fov_y_degrees: f64,

    #[structopt(
        help = "Camera image width divided by height",
        long,
        default_value = "1.0"
    )]
    pub aspect_ratio: f64,

    #[structopt(
        help = "Part of the normalized image extent counted as visible",
        long,
        default_value = "0.9"
    )]
    pub visibility_margin: f64,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self {
            ideal_distance: 0.5,
            fov_y_degrees: 60.0,
            aspect_ratio: 1.0,
            visibility_margin: 0.9,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewScore {
    pub alignment: f64,
    pub distance: f64,
    pub distance_score: f64,
    pub combined: f64,
}

impl ViewScore {
    // Facing away or sideways views can never be selected.
    pub fn is_eligible(&self) -> bool {
        self.alignment > 0.0
    }
}

pub fn camera_forward(pose: &Pose) -> Option<Vector3> {
    let z = pose.column(2);
    Vector3::new(-z[0], -z[1], -z[2]).try_normalize(DEGENERATE_LENGTH)
}

pub fn distance_score(distance: f64, ideal_distance: f64) -> f64 {
    1.0 / (1.0 + (distance - ideal_distance).abs())
}

pub fn score(
    position: &Point3,
    pose: &Pose,
    params: &ScoringParams,
) -> ViewScore {
    let offset = *position - pose_translation(pose);
    let distance = offset.norm();

    let alignment = match (
        offset.try_normalize(DEGENERATE_LENGTH),
        camera_forward(pose),
    ) {
        (Some(direction), Some(forward)) => direction.dot(&forward),
        _ => 0.0,
    };

    let distance_score = distance_score(distance, params.ideal_distance);
    ViewScore {
        alignment,
        distance,
        distance_score,
        combined: alignment * distance_score,
    }
}

pub fn is_visible(
    position: &Point3,
    pose: &Pose,
    params: &ScoringParams,
) -> bool {
    let world_to_camera = match pose.try_inverse() {
        Some(m) => m,
        None => return false,
    };
    let p = world_to_camera
        * Vector4::new(position.x, position.y, position.z, 1.0);

    // The camera looks down its own -Z axis.
    let depth = -p.z;
    if depth <= 0.0 {
        return false;
    }

    let tan = (params.fov_y_degrees.to_radians() / 2.0).tan();
    let x = p.x / (depth * tan * params.aspect_ratio);
    let y = p.y / (depth * tan);

    x.abs() < params.visibility_margin && y.abs() < params.visibility_margin
}

// Camera-to-world pose of a camera at `eye` looking at `target`.
pub fn camera_pose_looking_at(eye: &Point3, target: &Point3) -> Option<Pose> {
    let dir = (*target - *eye).try_normalize(DEGENERATE_LENGTH)?;
    let up = if dir.cross(&Vector3::y()).norm() > 1e-6 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let view = nalgebra::Isometry3::look_at_rh(eye, target, &up);
    Some(view.inverse().to_homogeneous())
}

#[cfg(test)]
mod tests {
    use super::*;

    use base::assert_eq_f64;

    use crate::texture::Matrix4;

    fn translation(x: f64, y: f64, z: f64) -> Pose {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    #[test]
    fn test_score_fragment_straight_ahead() {
        // Identity orientation looks down -Z.
        let pose = translation(0.0, 0.0, 0.5);
        let s = score(&Point3::origin(), &pose, &ScoringParams::default());
        assert_eq_f64!(s.alignment, 1.0);
        assert_eq_f64!(s.distance, 0.5);
        assert_eq_f64!(s.distance_score, 1.0);
        assert_eq_f64!(s.combined, 1.0);
        assert!(s.is_eligible());
    }

    #[test]
    fn test_score_fragment_behind_camera() {
        let pose = translation(0.0, 0.0, -0.5);
        let s = score(&Point3::origin(), &pose, &ScoringParams::default());
        assert_eq_f64!(s.alignment, -1.0);
        assert!(!s.is_eligible());
    }

    #[test]
    fn test_score_fragment_at_camera_center_is_ineligible() {
        let pose = translation(1.0, 2.0, 3.0);
        let s = score(&Point3::new(1.0, 2.0, 3.0), &pose, &Default::default());
        assert_eq!(s.alignment, 0.0);
        assert!(!s.is_eligible());
        assert_eq_f64!(s.distance_score, 1.0 / 1.5);
    }

    #[test]
    fn test_score_with_oblique_view() {
        let pose = translation(0.0, 0.0, 0.0);
        let fragment = Point3::new(0.6, 0.0, -0.8);
        let s = score(&fragment, &pose, &ScoringParams::default());
        assert_eq_f64!(s.alignment, 0.8);
        assert_eq_f64!(s.distance, 1.0);
        assert_eq_f64!(s.combined, 0.8 / 1.5);
    }

    #[test]
    fn test_distance_score_peaks_at_ideal_distance() {
        let ideal = 0.5;
        assert_eq_f64!(distance_score(ideal, ideal), 1.0);

        let mut below = distance_score(ideal, ideal);
        let mut above = below;
        for k in 1..=20 {
            let d = k as f64 * 0.05;
            let closer = distance_score(ideal - d, ideal);
            let farther = distance_score(ideal + d, ideal);
            assert!(closer < below);
            assert!(farther < above);
            assert!(closer < 1.0 && farther < 1.0);
            below = closer;
            above = farther;
        }
    }

    #[test]
    fn test_distance_score_is_symmetric() {
        assert_eq_f64!(distance_score(0.2, 0.5), distance_score(0.8, 0.5));
    }

    #[test]
    fn test_is_visible_in_front_and_centered() {
        let pose = translation(0.0, 0.0, 1.0);
        let params = ScoringParams::default();
        assert!(is_visible(&Point3::origin(), &pose, &params));
    }

    #[test]
    fn test_is_visible_rejects_behind_camera() {
        let pose = translation(0.0, 0.0, -1.0);
        let params = ScoringParams::default();
        assert!(!is_visible(&Point3::origin(), &pose, &params));
    }

    #[test]
    fn test_is_visible_respects_field_of_view() {
        let pose = translation(0.0, 0.0, 1.0);
        let params = ScoringParams::default();
        let tan = (30.0f64).to_radians().tan();

        // Depth 1, so the image edge is at |x| == tan.
        let inside = Point3::new(0.85 * tan, 0.0, 0.0);
        let outside = Point3::new(0.95 * tan, 0.0, 0.0);
        assert!(is_visible(&inside, &pose, &params));
        assert!(!is_visible(&outside, &pose, &params));

        let above = Point3::new(0.0, 0.95 * tan, 0.0);
        assert!(!is_visible(&above, &pose, &params));
    }

    #[test]
    fn test_is_visible_uses_aspect_ratio() {
        let pose = translation(0.0, 0.0, 1.0);
        let tan = (30.0f64).to_radians().tan();
        let wide = ScoringParams {
            aspect_ratio: 2.0,
            ..Default::default()
        };
        let p = Point3::new(1.5 * tan, 0.0, 0.0);
        assert!(is_visible(&p, &pose, &wide));
        assert!(!is_visible(&p, &pose, &ScoringParams::default()));
    }

    #[test]
    fn test_is_visible_with_singular_pose() {
        let params = ScoringParams::default();
        assert!(!is_visible(&Point3::origin(), &Matrix4::zeros(), &params));
    }

    #[test]
    fn test_camera_pose_looking_at() {
        let eye = Point3::new(1.0, 2.0, 3.0);
        let target = Point3::new(-1.0, 0.5, 0.0);
        let pose = camera_pose_looking_at(&eye, &target).unwrap();
        let params = ScoringParams::default();

        assert_eq_f64!((pose_translation(&pose) - eye).norm(), 0.0);
        let s = score(&target, &pose, &params);
        assert_eq_f64!(s.alignment, 1.0);
        assert!(is_visible(&target, &pose, &params));

        let straight_down = camera_pose_looking_at(
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::origin(),
        )
        .unwrap();
        let s = score(&Point3::origin(), &straight_down, &params);
        assert_eq_f64!(s.alignment, 1.0);

        assert!(camera_pose_looking_at(&eye, &eye).is_none());
    }
}
