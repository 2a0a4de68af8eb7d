use std::io::Cursor;
use std::path::Path;

use image::{ImageOutputFormat, Rgba};
use indexmap::IndexMap;
use log::info;
use serde::{Deserialize, Serialize};

use crate::session::{Adapter, FinalizeReport, FragmentId};
use crate::texture::{pose_to_column_major, Image, SelectionResult};
use base::defs::{IntoResult, Result};

pub const CAMERA_TRANSFORMS_FILE: &str = "camera_transforms.json";
pub const FRAGMENT_TEXTURES_FILE: &str = "fragment_textures.json";
pub const EXPORT_INFO_FILE: &str = "export_info.json";

#[derive(Clone, Debug, PartialEq)]
pub enum Material {
    Preview,
    Texture(Image),
    Fallback,
}

// Keeps the last material applied to every fragment.
#[derive(Default)]
pub struct MaterialCollector {
    materials: IndexMap<FragmentId, Material>,
}

impl MaterialCollector {
    pub fn get(&self, id: &FragmentId) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Adapter for MaterialCollector {
    fn apply_preview_material(&mut self, id: FragmentId) {
        self.materials.insert(id, Material::Preview);
    }

    fn apply_texture(&mut self, id: FragmentId, image: &Image) {
        self.materials.insert(id, Material::Texture(image.clone()));
    }

    fn apply_fallback_material(&mut self, id: FragmentId) {
        self.materials.insert(id, Material::Fallback);
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SampleWeight {
    pub index: usize,
    pub weight: f64,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FragmentTexture {
    pub id: FragmentId,
    pub image: String,
    pub samples: Vec<SampleWeight>,
    pub fallback: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportInfo {
    pub total_images: usize,
    pub total_fragments: usize,
    pub textured_fragments: usize,
    pub strategy: String,
    pub export_timestamp: f64,
}

pub fn sample_image_name(index: usize) -> String {
    format!("image_{}.png", index)
}

pub fn fragment_image_name(id: &FragmentId) -> String {
    format!("fragment_{}.png", id)
}

fn sample_weights(selection: &SelectionResult) -> Vec<SampleWeight> {
    match selection {
        SelectionResult::None => Vec::new(),
        SelectionResult::Single(s) => vec![SampleWeight {
            index: s.index,
            weight: 1.0,
        }],
        SelectionResult::Blend(ws) => ws
            .iter()
            .map(|w| SampleWeight {
                index: w.scored.index,
                weight: w.weight,
            })
            .collect(),
    }
}

pub fn encode_png(image: &Image) -> Result<Vec<u8>> {
    let mut data = Cursor::new(Vec::new());
    image
        .write_to(&mut data, ImageOutputFormat::Png)
        .into_result(|| "failed to encode PNG image".to_string())?;
    Ok(data.into_inner())
}

fn encode_json<T: Serialize>(value: &T, name: &str) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(value)
        .into_result(|| format!("failed to serialize {}", name))
}

pub fn export_session<F: Fn(&Path, &[u8]) -> Result<()>>(
    report: &FinalizeReport,
    materials: &MaterialCollector,
    write_file: F,
    output_dir: &Path,
    fallback_color: &Rgba<u8>,
    export_timestamp: f64,
) -> Result<ExportInfo> {
    let mut transforms = Vec::with_capacity(report.snapshot.len());
    for (i, sample) in report.snapshot.iter().enumerate() {
        let path = output_dir.join(sample_image_name(i));
        write_file(&path, &encode_png(&sample.image)?)?;
        transforms.push(pose_to_column_major(&sample.pose));
    }
    write_file(
        &output_dir.join(CAMERA_TRANSFORMS_FILE),
        &encode_json(&transforms, CAMERA_TRANSFORMS_FILE)?,
    )?;

    let fallback_image = Image::from_pixel(1, 1, *fallback_color);
    let mut textures = Vec::with_capacity(report.outcomes.len());
    for outcome in &report.outcomes {
        let (image, fallback) = match materials.get(&outcome.id) {
            Some(Material::Texture(image)) => (image, false),
            _ => (&fallback_image, true),
        };

        let name = fragment_image_name(&outcome.id);
        write_file(&output_dir.join(&name), &encode_png(image)?)?;
        textures.push(FragmentTexture {
            id: outcome.id,
            image: name,
            samples: sample_weights(&outcome.selection),
            fallback,
        });
    }
    write_file(
        &output_dir.join(FRAGMENT_TEXTURES_FILE),
        &encode_json(&textures, FRAGMENT_TEXTURES_FILE)?,
    )?;

    let info = ExportInfo {
        total_images: report.snapshot.len(),
        total_fragments: textures.len(),
        textured_fragments: textures.iter().filter(|t| !t.fallback).count(),
        strategy: report.strategy.name().to_string(),
        export_timestamp,
    };
    write_file(
        &output_dir.join(EXPORT_INFO_FILE),
        &encode_json(&info, EXPORT_INFO_FILE)?,
    )?;

    info!(
        "exported {} images and {} fragment textures into {}",
        info.total_images,
        info.total_fragments,
        output_dir.display()
    );
    Ok(info)
}
