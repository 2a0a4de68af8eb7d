mod frame_store;
mod input_selection;
mod output_blending;
mod scoring;

use image::RgbaImage;

pub use crate::texture::{
    frame_store::*, input_selection::*, output_blending::*, scoring::*,
};
use base::defs::{Error, ErrorKind::*, Result};

pub type Vector3 = nalgebra::Vector3<f64>;
pub type Point3 = nalgebra::Point3<f64>;
pub type Matrix4 = nalgebra::Matrix4<f64>;
pub type Vector4 = nalgebra::Vector4<f64>;

// Pixel buffer of a captured camera image or a composed texture.
pub type Image = RgbaImage;

// Camera-to-world rigid transform.
pub type Pose = Matrix4;

pub fn pose_translation(pose: &Pose) -> Point3 {
    Point3::new(pose[(0, 3)], pose[(1, 3)], pose[(2, 3)])
}

pub fn pose_from_column_major(values: &[f64]) -> Result<Pose> {
    if values.len() != 16 {
        let desc = format!(
            "pose must have 16 elements, got {}",
            values.len()
        );
        return Err(Error::new(MalformedData, desc));
    }
    if values.iter().any(|v| !v.is_finite()) {
        let desc = "pose contains non-finite elements".to_string();
        return Err(Error::new(MalformedData, desc));
    }
    Ok(Pose::from_column_slice(values))
}

pub fn pose_to_column_major(pose: &Pose) -> [f64; 16] {
    let mut values = [0.0; 16];
    values.copy_from_slice(pose.as_slice());
    values
}
