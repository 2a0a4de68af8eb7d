use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use image::Rgba;
use log::{debug, info};
use serde::Deserialize;
use structopt::StructOpt;

use crate::export::{export_session, MaterialCollector};
use crate::session::{
    Adapter, FinalizeReport, FragmentId, MeshFragment, ReconstructionSession,
    Sensor, TexturingParams,
};
use crate::texture::{
    pose_from_column_major, Image, Point3, Pose, Strategy, Time,
};
use base::defs::{Error, IntoResult, Result};
use base::util::{cli, fs};

#[derive(Clone, Debug, Deserialize)]
pub struct ReplaySample {
    pub image: PathBuf, // Relative to the replay file.
    pub pose: Vec<f64>, // Column-major camera-to-world.
    pub timestamp: Time,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum FragmentPlacement {
    Transform { transform: Vec<f64> },
    Position { position: [f64; 3] },
}

#[derive(Clone, Debug, Deserialize)]
pub struct ReplayFragment {
    pub id: FragmentId,
    #[serde(flatten)]
    pub placement: FragmentPlacement,
}

impl ReplayFragment {
    pub fn to_fragment(&self) -> Result<MeshFragment> {
        Ok(match &self.placement {
            FragmentPlacement::Transform { transform } => {
                let transform = pose_from_column_major(transform)?;
                MeshFragment::from_transform(self.id, &transform)
            }
            FragmentPlacement::Position { position: [x, y, z] } => {
                MeshFragment::new(self.id, Point3::new(*x, *y, *z))
            }
        })
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Replay {
    #[serde(default)]
    pub samples: Vec<ReplaySample>,
    #[serde(default)]
    pub fragments: Vec<ReplayFragment>,
}

impl Replay {
    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .into_result(|| "failed to parse replay".to_string())
    }
}

pub fn load_frame(
    sample: &ReplaySample,
    base_dir: &Path,
) -> Result<(Image, Pose)> {
    let pose = pose_from_column_major(&sample.pose)?;
    let path = base_dir.join(&sample.image);
    let image = image::open(&path)
        .into_result(|| format!("failed to load image '{}'", path.display()))?
        .into_rgba8();
    Ok((image, pose))
}

// Loads a frame only when the session asks for it.
struct ReplaySensor<'a> {
    sample: &'a ReplaySample,
    base_dir: &'a Path,
    error: Option<Error>,
}

impl<'a> Sensor for ReplaySensor<'a> {
    fn current_frame(&mut self) -> Option<(Image, Pose)> {
        match load_frame(self.sample, self.base_dir) {
            Ok(frame) => Some(frame),
            Err(err) => {
                self.error = Some(err);
                None
            }
        }
    }
}

pub fn replay_scan<A: Adapter>(
    session: &mut ReconstructionSession<A>,
    replay: &Replay,
    base_dir: &Path,
    strategy: Strategy,
) -> Result<FinalizeReport> {
    for fragment in &replay.fragments {
        let fragment = fragment.to_fragment()?;
        session
            .register_or_update_fragment(fragment.id, fragment.world_position);
    }

    for sample in &replay.samples {
        let mut sensor = ReplaySensor {
            sample,
            base_dir,
            error: None,
        };
        if !session.on_tick(sample.timestamp, &mut sensor) {
            debug!("skipped sample at {:.3}s", sample.timestamp);
        }
        if let Some(err) = sensor.error {
            return Err(err);
        }
    }

    info!(
        "replayed {} of {} samples",
        session.frame_store().len(),
        replay.samples.len()
    );
    session.request_finalize(strategy)
}

#[derive(StructOpt)]
#[structopt(about = "Replay a recorded scan and export fragment textures")]
pub struct ReplayCommand {
    #[structopt(flatten)]
    input: cli::JsonInput,

    #[structopt(help = "Output directory", long, short = "o")]
    output_dir: Option<PathBuf>,

    #[structopt(
        help = concat!(
            "Texture source selection strategy (single-best, ",
            "first-visible or top-k-blend)"
        ),
        long,
        default_value = "top-k-blend"
    )]
    strategy: Strategy,

    #[structopt(flatten)]
    params: TexturingParams,

    #[structopt(
        help = "Color of untextured fragments, as r,g,b,a",
        long,
        default_value = "128,128,128,255"
    )]
    fallback_color: cli::Array<u8, 4>,
}

impl ReplayCommand {
    pub fn run(&self) -> Result<()> {
        let replay: Replay = serde_json::from_reader(self.input.get()?)
            .into_result(|| "failed to parse replay".to_string())?;

        let output_dir =
            self.output_dir.as_deref().unwrap_or_else(|| ".".as_ref());
        fs::create_dir(output_dir)?;

        let mut session = ReconstructionSession::new(
            MaterialCollector::default(),
            self.params,
        );
        let report = replay_scan(
            &mut session,
            &replay,
            &self.input.base_dir(),
            self.strategy,
        )?;

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        export_session(
            &report,
            session.adapter(),
            |p, d| fs::write_file(p, d),
            output_dir,
            &Rgba(self.fallback_color.0),
            timestamp,
        )?;
        Ok(())
    }
}
