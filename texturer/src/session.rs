use indexmap::IndexMap;
use log::{debug, info, warn};
use rayon::prelude::*;
use structopt::StructOpt;
use uuid::Uuid;

use crate::texture::*;
use base::defs::{Error, ErrorKind::*, Result};

pub type FragmentId = Uuid;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshFragment {
    pub id: FragmentId,
    pub world_position: Point3,
}

impl MeshFragment {
    pub fn new(id: FragmentId, world_position: Point3) -> Self {
        Self { id, world_position }
    }

    pub fn from_transform(id: FragmentId, world_transform: &Matrix4) -> Self {
        Self::new(id, pose_translation(world_transform))
    }
}

// Receives materials for the fragments a session knows about.
pub trait Adapter {
    fn apply_preview_material(&mut self, id: FragmentId);
    fn apply_texture(&mut self, id: FragmentId, image: &Image);
    fn apply_fallback_material(&mut self, id: FragmentId);
}

// Source of the current camera image and pose, polled on ticks.
pub trait Sensor {
    fn current_frame(&mut self) -> Option<(Image, Pose)>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Live,
    Finalizing,
    Done,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureIssue {
    NoEligibleSample,
    EmptyFrameStore,
    DimensionMismatch,
}

#[derive(Clone, Debug)]
pub struct FragmentOutcome {
    pub id: FragmentId,
    pub selection: SelectionResult,
    pub issue: Option<TextureIssue>,
}

impl FragmentOutcome {
    pub fn is_textured(&self) -> bool {
        !self.selection.is_none()
    }
}

pub struct FinalizeReport {
    pub strategy: Strategy,
    pub snapshot: Snapshot,
    pub outcomes: Vec<FragmentOutcome>, // In registration order.
}

impl FinalizeReport {
    pub fn num_textured(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_textured()).count()
    }

    pub fn num_fallbacks(&self) -> usize {
        self.outcomes.len() - self.num_textured()
    }
}

#[derive(Clone, Copy, Debug, Default, StructOpt)]
pub struct TexturingParams {
    #[structopt(flatten)]
    pub capture: CaptureParams,

    #[structopt(flatten)]
    pub scoring: ScoringParams,

    #[structopt(flatten)]
    pub selection: SelectionParams,
}

pub struct ReconstructionSession<A: Adapter> {
    adapter: A,
    params: TexturingParams,
    frame_store: FrameStore,
    fragments: IndexMap<FragmentId, MeshFragment>,
    state: SessionState,
}

impl<A: Adapter> ReconstructionSession<A> {
    pub fn new(adapter: A, params: TexturingParams) -> Self {
        Self {
            adapter,
            frame_store: FrameStore::new(&params.capture),
            params,
            fragments: IndexMap::new(),
            state: SessionState::Live,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn params(&self) -> &TexturingParams {
        &self.params
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn into_adapter(self) -> A {
        self.adapter
    }

    pub fn frame_store(&self) -> &FrameStore {
        &self.frame_store
    }

    pub fn fragments(&self) -> impl Iterator<Item = &MeshFragment> {
        self.fragments.values()
    }

    // Pulls a frame from the sensor only when a capture is due.
    pub fn on_tick(
        &mut self,
        timestamp: Time,
        sensor: &mut dyn Sensor,
    ) -> bool {
        if self.state != SessionState::Live
            || !self.frame_store.is_capture_due(timestamp)
        {
            return false;
        }

        match sensor.current_frame() {
            Some((image, pose)) => self.capture_sample(image, pose, timestamp),
            None => false,
        }
    }

    pub fn capture_sample(
        &mut self,
        image: Image,
        pose: Pose,
        timestamp: Time,
    ) -> bool {
        if self.state != SessionState::Live {
            return false;
        }
        self.frame_store.capture(image, pose, timestamp)
    }

    pub fn register_or_update_fragment(
        &mut self,
        id: FragmentId,
        world_position: Point3,
    ) -> bool {
        if self.state != SessionState::Live {
            debug!("ignoring update of fragment {} after scanning", id);
            return false;
        }

        self.fragments
            .insert(id, MeshFragment::new(id, world_position));
        self.adapter.apply_preview_material(id);
        true
    }

    pub fn request_finalize(
        &mut self,
        strategy: Strategy,
    ) -> Result<FinalizeReport> {
        if self.state != SessionState::Live {
            let desc = format!(
                "finalize requested while session is {:?}",
                self.state
            );
            return Err(Error::new(BadOperation, desc));
        }
        self.state = SessionState::Finalizing;

        let snapshot = self.frame_store.snapshot();
        info!(
            "choosing texture sources for {} fragments from {} samples ({})",
            self.fragments.len(),
            snapshot.len(),
            strategy
        );

        let fragments: Vec<MeshFragment> =
            self.fragments.values().copied().collect();
        let params = self.params;
        let selections: Vec<SelectionResult> = fragments
            .par_iter()
            .map(|f| {
                strategy.select(
                    &f.world_position,
                    &snapshot,
                    &params.scoring,
                    &params.selection,
                )
            })
            .collect();

        let mut outcomes = Vec::with_capacity(fragments.len());
        for (fragment, selection) in fragments.iter().zip(selections) {
            let issue =
                self.apply_selection(fragment.id, &selection, &snapshot);
            outcomes.push(FragmentOutcome {
                id: fragment.id,
                selection,
                issue,
            });
        }

        let report = FinalizeReport {
            strategy,
            snapshot,
            outcomes,
        };
        info!(
            "textured {} of {} fragments, {} fell back to flat material",
            report.num_textured(),
            report.outcomes.len(),
            report.num_fallbacks()
        );

        self.state = SessionState::Done;
        Ok(report)
    }

    fn apply_selection(
        &mut self,
        id: FragmentId,
        selection: &SelectionResult,
        snapshot: &Snapshot,
    ) -> Option<TextureIssue> {
        match composite(selection) {
            Some(c) => {
                self.adapter.apply_texture(id, &c.image);
                if c.dimension_mismatch {
                    Some(TextureIssue::DimensionMismatch)
                } else {
                    None
                }
            }
            None => {
                self.adapter.apply_fallback_material(id);
                if snapshot.is_empty() {
                    Some(TextureIssue::EmptyFrameStore)
                } else {
                    warn!("no sample depicts fragment {}", id);
                    Some(TextureIssue::NoEligibleSample)
                }
            }
        }
    }

    // Starts over with an empty frame store and no fragments.
    pub fn restart(&mut self) {
        self.frame_store.clear();
        self.fragments.clear();
        self.state = SessionState::Live;
    }
}
