/// Outfit history and the per-layer pose cache
///
/// The dressing room is a stack of garment layers over a base model shot.
/// Each layer remembers every pose variant already generated for it, so a
/// pose is never paid for twice. The history keeps removed layers around
/// past the current index; re-selecting the same garment walks back into
/// them instead of calling the provider again.

use crate::images::ImageHandle;
use crate::state::pose;
use crate::state::wardrobe::Garment;

/// Pose variants generated for one layer, keyed by pose index.
///
/// Kept as an insertion-ordered list rather than a map: when a new pose has
/// to be synthesized, the source image is always the *first* entry ever
/// cached for the layer, and that choice must be reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoseShots {
    shots: Vec<(usize, ImageHandle)>,
}

impl PoseShots {
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache holding exactly the shot produced when the layer was created.
    pub fn single(pose_index: usize, image: ImageHandle) -> Self {
        Self {
            shots: vec![(pose_index, image)],
        }
    }

    pub fn get(&self, pose_index: usize) -> Option<&ImageHandle> {
        self.shots
            .iter()
            .find(|(pose, _)| *pose == pose_index)
            .map(|(_, image)| image)
    }

    /// Add a pose variant, or replace the one already cached for that pose.
    /// Entries are never removed.
    pub fn put(&mut self, pose_index: usize, image: ImageHandle) {
        match self.shots.iter_mut().find(|(pose, _)| *pose == pose_index) {
            Some(entry) => entry.1 = image,
            None => self.shots.push((pose_index, image)),
        }
    }

    /// The first-inserted shot: the deterministic source for regeneration.
    pub fn first(&self) -> Option<&ImageHandle> {
        self.shots.first().map(|(_, image)| image)
    }

    /// Pose indexes cached so far, in insertion order.
    pub fn pose_indexes(&self) -> impl Iterator<Item = usize> + '_ {
        self.shots.iter().map(|(pose, _)| *pose)
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }
}

/// One step of the outfit: a garment (or the bare model for layer 0) plus
/// its pose cache. Owned exclusively by the history that holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct OutfitLayer {
    /// `None` only for the base/root layer.
    pub garment: Option<Garment>,
    pub shots: PoseShots,
}

impl OutfitLayer {
    /// The root layer: the freshly generated model, cached at the first pose.
    pub fn base(image: ImageHandle) -> Self {
        Self {
            garment: None,
            shots: PoseShots::single(pose::FIRST, image),
        }
    }

    /// A garment layer with whatever shots it starts with.
    pub fn worn(garment: Garment, shots: PoseShots) -> Self {
        Self {
            garment: Some(garment),
            shots,
        }
    }

    pub fn garment_id(&self) -> Option<&str> {
        self.garment.as_ref().map(|garment| garment.id.as_str())
    }
}

/// The ordered layer sequence with a cursor.
///
/// Layers up to and including `current` are the visible outfit; anything
/// beyond is a retained forward branch that a matching re-selection can
/// walk back into. Appending a *different* garment discards that branch
/// first — linear undo with overwrite-redo, not a tree.
#[derive(Debug, Default)]
pub struct OutfitHistory {
    layers: Vec<OutfitLayer>,
    current: usize,
}

impl OutfitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the base layer. No-op (returns false) if a model already
    /// exists; callers must `reset()` first to start a new session.
    pub fn initialize(&mut self, base_image: ImageHandle) -> bool {
        if !self.layers.is_empty() {
            return false;
        }
        self.layers.push(OutfitLayer::base(base_image));
        self.current = 0;
        true
    }

    pub fn is_initialized(&self) -> bool {
        !self.layers.is_empty()
    }

    /// Garment id of the retained layer just past the cursor, if any.
    /// This is the redo candidate a new selection is compared against.
    pub fn next_garment_id(&self) -> Option<&str> {
        self.layers
            .get(self.current + 1)
            .and_then(OutfitLayer::garment_id)
    }

    /// Commit a new garment layer.
    ///
    /// If the retained layer just past the cursor wears the same garment,
    /// the cursor simply advances into it — `new_layer` is dropped and the
    /// old pose cache survives. Otherwise the forward branch is truncated
    /// and `new_layer` becomes the top of the stack.
    ///
    /// Without a base layer there is nothing to dress; no-op.
    pub fn append_layer(&mut self, new_layer: OutfitLayer) {
        if self.layers.is_empty() {
            return;
        }
        let reuse = match (self.next_garment_id(), new_layer.garment_id()) {
            (Some(retained), Some(selected)) => retained == selected,
            _ => false,
        };
        if !reuse {
            self.layers.truncate(self.current + 1);
            self.layers.push(new_layer);
        }
        self.current += 1;
    }

    /// Step the cursor back one layer. The layer stays in memory as the
    /// redo candidate. No-op (returns false) at the base layer.
    pub fn remove_last_active_layer(&mut self) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current -= 1;
        true
    }

    /// Cache a newly generated pose variant on the current layer.
    pub fn update_current_layer_pose(&mut self, pose_index: usize, image: ImageHandle) {
        if let Some(layer) = self.layers.get_mut(self.current) {
            layer.shots.put(pose_index, image);
        }
    }

    /// The visible outfit: base layer through the cursor, inclusive.
    pub fn active_layers(&self) -> &[OutfitLayer] {
        if self.layers.is_empty() {
            &[]
        } else {
            &self.layers[..=self.current]
        }
    }

    /// The layer the canvas renders from.
    pub fn current_layer(&self) -> Option<&OutfitLayer> {
        self.layers.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// Back to the uninitialized state.
    pub fn reset(&mut self) {
        self.layers.clear();
        self.current = 0;
    }
}
