/// The try-on orchestrator
///
/// One state machine owns the dressing room: the outfit history, the pose
/// selection, the wardrobe, and the single-request guard. The UI shell only
/// dispatches into it and renders derived values back out.
///
/// Every asynchronous transition is split in two:
/// - a `plan_*`/`begin_*` method runs on the update loop, applies any
///   speculative state, and either resolves from cache or hands back the
///   inputs for exactly one provider call, tagged with the session
///   generation;
/// - the matching `finish_*` method consumes the tagged result and either
///   commits it or rolls the speculative state back.
///
/// A result whose tag no longer matches the session generation (the user
/// hit Start Over while it was in flight) is discarded untouched.

use crate::images::ImageHandle;
use crate::provider::ProviderError;
use crate::state::history::{OutfitHistory, OutfitLayer, PoseShots};
use crate::state::pose;
use crate::state::wardrobe::{Garment, Wardrobe};

/// Which provider call, if any, is currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    GeneratingBase,
    GeneratingTryOn,
    GeneratingPose,
}

/// Ties an in-flight request to the session state it was issued against.
pub type RequestTag = u64;

/// Outcome of planning a garment selection.
#[derive(Debug)]
pub enum GarmentPlan {
    /// The retained redo layer matched; history advanced, nothing to call.
    Reused,
    /// Call the provider with these inputs, then `finish_garment_selection`.
    Generate {
        tag: RequestTag,
        source: ImageHandle,
        garment_image: ImageHandle,
    },
    /// Guard or precondition rejected the action.
    Rejected,
}

/// Outcome of planning a pose change.
#[derive(Debug)]
pub enum PosePlan {
    /// The pose was already cached; the selection pointer moved, done.
    Applied,
    /// Call the provider with these inputs, then `finish_pose_change`.
    /// The selection pointer has already moved optimistically.
    Generate {
        tag: RequestTag,
        source: ImageHandle,
        pose_index: usize,
    },
    Rejected,
}

/// The dressing-room state container.
#[derive(Debug)]
pub struct Studio {
    history: OutfitHistory,
    wardrobe: Wardrobe,
    pose_index: usize,
    phase: Phase,
    /// Bumped on every Start Over; results tagged with an older value are
    /// stale and must not touch state.
    generation: u64,
    /// Where the pose pointer came from, while an optimistic move awaits
    /// confirmation.
    pose_rollback: Option<usize>,
    error: Option<String>,
    loading_message: Option<String>,
}

impl Studio {
    pub fn new(wardrobe: Wardrobe) -> Self {
        Self {
            history: OutfitHistory::new(),
            wardrobe,
            pose_index: pose::FIRST,
            phase: Phase::Idle,
            generation: 0,
            pose_rollback: None,
            error: None,
            loading_message: None,
        }
    }

    // ---------- derived values the UI renders ----------

    pub fn history(&self) -> &OutfitHistory {
        &self.history
    }

    pub fn wardrobe(&self) -> &Wardrobe {
        &self.wardrobe
    }

    pub fn pose_index(&self) -> usize {
        self.pose_index
    }

    pub fn is_loading(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn loading_message(&self) -> Option<&str> {
        self.loading_message.as_deref()
    }

    /// Ids of garments in the visible outfit stack (for disabling their
    /// wardrobe tiles).
    pub fn active_garment_ids(&self) -> Vec<&str> {
        self.history
            .active_layers()
            .iter()
            .filter_map(OutfitLayer::garment_id)
            .collect()
    }

    /// What the canvas shows, recomputed on every read: the current layer's
    /// shot for the selected pose, falling back to the layer's first cached
    /// shot when that exact pose has no image yet (a fresh garment layer is
    /// keyed under the pose it was generated at, while the selection resets
    /// to the first pose).
    pub fn displayed_image(&self) -> Option<&ImageHandle> {
        let layer = self.history.current_layer()?;
        layer.shots.get(self.pose_index).or_else(|| layer.shots.first())
    }

    /// Surface a failure from outside the provider path (file dialogs etc.).
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    // ---------- transition 1: finalize base model ----------

    /// Start turning a portrait into the base model. Rejected (None) while
    /// another request is in flight or once a model already exists.
    pub fn begin_base_generation(&mut self) -> Option<RequestTag> {
        if self.is_loading() || self.history.is_initialized() {
            return None;
        }
        self.error = None;
        self.phase = Phase::GeneratingBase;
        self.loading_message = Some("Simulating studio lights...".to_string());
        Some(self.generation)
    }

    pub fn finish_base_generation(
        &mut self,
        tag: RequestTag,
        result: Result<ImageHandle, ProviderError>,
    ) {
        if !self.accept(tag, Phase::GeneratingBase) {
            return;
        }
        match result {
            Ok(image) => {
                self.history.initialize(image);
                self.pose_index = pose::FIRST;
            }
            Err(err) => self.error = Some(err.guidance("Persona generation failed")),
        }
    }

    // ---------- transition 2: select garment ----------

    pub fn plan_garment_selection(&mut self, garment: &Garment) -> GarmentPlan {
        if self.is_loading() {
            return GarmentPlan::Rejected;
        }
        let Some(source) = self.displayed_image().cloned() else {
            return GarmentPlan::Rejected;
        };
        // Pure reuse: the truncated-but-retained next layer already wears
        // this garment. Advance into it, no provider call, no loading state.
        if self.history.next_garment_id() == Some(garment.id.as_str()) {
            self.history
                .append_layer(OutfitLayer::worn(garment.clone(), PoseShots::new()));
            self.pose_index = pose::FIRST;
            self.error = None;
            return GarmentPlan::Reused;
        }
        self.error = None;
        self.phase = Phase::GeneratingTryOn;
        self.loading_message = Some(format!("Fitting {}...", garment.name));
        GarmentPlan::Generate {
            tag: self.generation,
            source,
            garment_image: garment.image.clone(),
        }
    }

    pub fn finish_garment_selection(
        &mut self,
        tag: RequestTag,
        garment: Garment,
        result: Result<ImageHandle, ProviderError>,
    ) {
        if !self.accept(tag, Phase::GeneratingTryOn) {
            return;
        }
        match result {
            Ok(image) => {
                // The composite was rendered at the pose that was selected
                // when the request went out; key the new layer there.
                let worn_at = self.pose_index;
                self.history.append_layer(OutfitLayer::worn(
                    garment.clone(),
                    PoseShots::single(worn_at, image),
                ));
                self.pose_index = pose::FIRST;
                self.wardrobe.add(garment);
            }
            Err(err) => self.error = Some(err.guidance("Style generation failed")),
        }
    }

    // ---------- transition 3: remove last garment ----------

    /// Step back to the previous layer. Synchronous; the removed layer is
    /// retained as the redo candidate.
    pub fn remove_last_garment(&mut self) {
        if self.is_loading() {
            return;
        }
        if self.history.remove_last_active_layer() {
            self.pose_index = pose::FIRST;
            self.error = None;
        }
    }

    // ---------- transition 4: select pose ----------

    pub fn plan_pose_change(&mut self, pose_index: usize) -> PosePlan {
        if self.is_loading() || pose_index >= pose::COUNT || pose_index == self.pose_index {
            return PosePlan::Rejected;
        }
        let Some(layer) = self.history.current_layer() else {
            return PosePlan::Rejected;
        };
        if layer.shots.get(pose_index).is_some() {
            self.pose_index = pose_index;
            self.error = None;
            return PosePlan::Applied;
        }
        // Committed layers always hold at least one shot; it is the
        // deterministic source for the new pose.
        let Some(source) = layer.shots.first().cloned() else {
            return PosePlan::Rejected;
        };
        self.error = None;
        self.pose_rollback = Some(self.pose_index);
        self.pose_index = pose_index; // optimistic, rolled back on failure
        self.phase = Phase::GeneratingPose;
        self.loading_message = Some("Re-posing model...".to_string());
        PosePlan::Generate {
            tag: self.generation,
            source,
            pose_index,
        }
    }

    pub fn finish_pose_change(
        &mut self,
        tag: RequestTag,
        pose_index: usize,
        result: Result<ImageHandle, ProviderError>,
    ) {
        if !self.accept(tag, Phase::GeneratingPose) {
            return;
        }
        let rollback = self.pose_rollback.take();
        match result {
            Ok(image) => self.history.update_current_layer_pose(pose_index, image),
            Err(err) => {
                // No image exists for the failed pose; the optimistic move
                // must be undone exactly.
                if let Some(previous) = rollback {
                    self.pose_index = previous;
                }
                self.error = Some(err.guidance("Pose variation failed"));
            }
        }
    }

    // ---------- transition 5: start over ----------

    /// Hard reset from any state. An in-flight request keeps running, but
    /// its result will carry a stale tag and be dropped.
    pub fn start_over(&mut self) {
        self.generation += 1;
        self.history.reset();
        self.pose_index = pose::FIRST;
        self.phase = Phase::Idle;
        self.pose_rollback = None;
        self.error = None;
        self.loading_message = None;
    }

    // ---------- request guard ----------

    /// Accept a completion only if it belongs to this session generation
    /// and to the phase that is actually in flight. Accepting clears the
    /// loading state; rejecting leaves everything untouched.
    fn accept(&mut self, tag: RequestTag, expected: Phase) -> bool {
        if tag != self.generation || self.phase != expected {
            println!("⏭️  Discarding stale generation result");
            return false;
        }
        self.phase = Phase::Idle;
        self.loading_message = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::test_handle;
    use crate::provider::TryOnProvider;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted provider: hands out queued results, counts calls, and
    /// panics on any call it was not scripted for.
    struct MockProvider {
        responses: Mutex<VecDeque<Result<ImageHandle, ProviderError>>>,
        calls: AtomicUsize,
    }

    impl MockProvider {
        fn scripted(
            responses: impl IntoIterator<Item = Result<ImageHandle, ProviderError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        /// A provider that fails the test if anything reaches it.
        fn forbidden() -> Self {
            Self::scripted([])
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self, op: &str) -> Result<ImageHandle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected provider call: {op}"))
        }
    }

    #[async_trait::async_trait]
    impl TryOnProvider for MockProvider {
        async fn synthesize_base_model(
            &self,
            _portrait: ImageHandle,
        ) -> Result<ImageHandle, ProviderError> {
            self.next("synthesize_base_model")
        }

        async fn synthesize_try_on(
            &self,
            _model_image: ImageHandle,
            _garment_image: ImageHandle,
        ) -> Result<ImageHandle, ProviderError> {
            self.next("synthesize_try_on")
        }

        async fn synthesize_pose_variant(
            &self,
            _source_image: ImageHandle,
            _pose_instruction: String,
        ) -> Result<ImageHandle, ProviderError> {
            self.next("synthesize_pose_variant")
        }
    }

    // Drivers mirroring exactly how the shell wires plans to the provider.

    async fn drive_base(studio: &mut Studio, provider: &MockProvider, portrait: ImageHandle) {
        if let Some(tag) = studio.begin_base_generation() {
            let result = provider.synthesize_base_model(portrait).await;
            studio.finish_base_generation(tag, result);
        }
    }

    async fn drive_garment(studio: &mut Studio, provider: &MockProvider, garment: &Garment) {
        if let GarmentPlan::Generate {
            tag,
            source,
            garment_image,
        } = studio.plan_garment_selection(garment)
        {
            let result = provider.synthesize_try_on(source, garment_image).await;
            studio.finish_garment_selection(tag, garment.clone(), result);
        }
    }

    async fn drive_pose(studio: &mut Studio, provider: &MockProvider, pose_index: usize) {
        if let PosePlan::Generate {
            tag,
            source,
            pose_index,
        } = studio.plan_pose_change(pose_index)
        {
            let result = provider
                .synthesize_pose_variant(source, pose::instruction(pose_index).to_string())
                .await;
            studio.finish_pose_change(tag, pose_index, result);
        }
    }

    fn garment(id: &str) -> Garment {
        Garment {
            id: id.to_string(),
            name: id.to_uppercase(),
            image: test_handle(100),
        }
    }

    fn studio() -> Studio {
        Studio::new(Wardrobe::default())
    }

    #[tokio::test]
    async fn try_on_commits_a_layer_keyed_at_the_worn_pose() {
        let img0 = test_handle(0);
        let img1 = test_handle(1);
        let provider = MockProvider::scripted([Ok(img0.clone()), Ok(img1.clone())]);
        let mut studio = studio();

        drive_base(&mut studio, &provider, test_handle(50)).await;
        assert!(studio.history().is_initialized());
        assert_eq!(studio.displayed_image(), Some(&img0));

        drive_garment(&mut studio, &provider, &garment("g1")).await;

        assert_eq!(studio.history().current_index(), 1);
        let layers = studio.history().active_layers();
        assert!(layers[0].garment.is_none());
        assert_eq!(layers[0].shots.get(pose::FIRST), Some(&img0));
        assert_eq!(layers[1].garment_id(), Some("g1"));
        assert_eq!(layers[1].shots.get(pose::FIRST), Some(&img1));
        assert_eq!(studio.displayed_image(), Some(&img1));
        assert!(!studio.is_loading());
        // A successfully worn garment joins the wardrobe exactly once.
        assert!(studio.wardrobe().get("g1").is_some());
    }

    #[tokio::test]
    async fn uncached_pose_is_generated_and_cached() {
        let img1 = test_handle(1);
        let img2 = test_handle(2);
        let provider =
            MockProvider::scripted([Ok(test_handle(0)), Ok(img1.clone()), Ok(img2.clone())]);
        let mut studio = studio();

        drive_base(&mut studio, &provider, test_handle(50)).await;
        drive_garment(&mut studio, &provider, &garment("g1")).await;
        drive_pose(&mut studio, &provider, 2).await;

        assert_eq!(studio.pose_index(), 2);
        let layer = studio.history().current_layer().unwrap();
        assert_eq!(layer.shots.get(pose::FIRST), Some(&img1));
        assert_eq!(layer.shots.get(2), Some(&img2));
        assert_eq!(studio.displayed_image(), Some(&img2));
    }

    #[tokio::test]
    async fn undo_then_reselect_reuses_the_cached_layer_without_a_call() {
        let img0 = test_handle(0);
        let img1 = test_handle(1);
        let provider = MockProvider::scripted([
            Ok(img0.clone()),
            Ok(img1.clone()),
            Ok(test_handle(2)),
        ]);
        let mut studio = studio();

        drive_base(&mut studio, &provider, test_handle(50)).await;
        drive_garment(&mut studio, &provider, &garment("g1")).await;
        drive_pose(&mut studio, &provider, 2).await;

        studio.remove_last_garment();
        assert_eq!(studio.history().current_index(), 0);
        assert_eq!(studio.pose_index(), pose::FIRST);
        assert_eq!(studio.displayed_image(), Some(&img0));

        // Re-selecting the same garment must never reach the provider.
        let forbidden = MockProvider::forbidden();
        drive_garment(&mut studio, &forbidden, &garment("g1")).await;

        assert_eq!(forbidden.calls(), 0);
        assert_eq!(studio.history().current_index(), 1);
        assert_eq!(studio.pose_index(), pose::FIRST);
        assert_eq!(studio.displayed_image(), Some(&img1));
        assert!(!studio.is_loading());
    }

    #[tokio::test]
    async fn cached_pose_selection_never_calls_the_provider() {
        let provider = MockProvider::scripted([Ok(test_handle(0)), Ok(test_handle(1))]);
        let mut studio = studio();
        drive_base(&mut studio, &provider, test_handle(50)).await;
        drive_garment(&mut studio, &provider, &garment("g1")).await;

        // pose::FIRST is cached on the fresh layer; flip away and back.
        let scripted = MockProvider::scripted([Ok(test_handle(2))]);
        drive_pose(&mut studio, &scripted, 2).await;

        let forbidden = MockProvider::forbidden();
        drive_pose(&mut studio, &forbidden, pose::FIRST).await;
        drive_pose(&mut studio, &forbidden, 2).await;

        assert_eq!(forbidden.calls(), 0);
        assert_eq!(studio.pose_index(), 2);
    }

    #[tokio::test]
    async fn failed_pose_change_rolls_the_pointer_back_exactly() {
        let provider = MockProvider::scripted([
            Ok(test_handle(0)),
            Ok(test_handle(1)),
            Ok(test_handle(2)),
        ]);
        let mut studio = studio();
        drive_base(&mut studio, &provider, test_handle(50)).await;
        drive_garment(&mut studio, &provider, &garment("g1")).await;
        drive_pose(&mut studio, &provider, 2).await;
        assert_eq!(studio.pose_index(), 2);

        let failing = MockProvider::scripted([Err(ProviderError::NoOutputProduced)]);
        drive_pose(&mut studio, &failing, 4).await;

        assert_eq!(studio.pose_index(), 2);
        assert!(studio.error().is_some());
        assert!(!studio.is_loading());
        // The failed pose gained no cache entry.
        let layer = studio.history().current_layer().unwrap();
        assert!(layer.shots.get(4).is_none());
    }

    #[tokio::test]
    async fn provider_failure_during_try_on_leaves_history_unchanged() {
        let provider = MockProvider::scripted([Ok(test_handle(0))]);
        let mut studio = studio();
        drive_base(&mut studio, &provider, test_handle(50)).await;

        let failing = MockProvider::scripted([Err(ProviderError::RateLimited)]);
        drive_garment(&mut studio, &failing, &garment("g1")).await;

        assert_eq!(studio.history().active_layers().len(), 1);
        assert_eq!(studio.history().current_index(), 0);
        assert!(!studio.is_loading());
        assert_eq!(
            studio.error(),
            Some(ProviderError::RateLimited.guidance("").as_str())
        );
        // No partial commit: the wardrobe did not grow either.
        assert!(studio.wardrobe().get("g1").is_none());
    }

    #[test]
    fn guard_rejects_every_entry_point_while_a_request_is_in_flight() {
        let mut studio = studio();
        let tag = studio.begin_base_generation().unwrap();
        studio.finish_base_generation(tag, Ok(test_handle(0)));

        // Park a try-on in flight.
        let plan = studio.plan_garment_selection(&garment("g1"));
        assert!(matches!(plan, GarmentPlan::Generate { .. }));
        assert!(studio.is_loading());

        assert!(studio.begin_base_generation().is_none());
        assert!(matches!(
            studio.plan_garment_selection(&garment("g2")),
            GarmentPlan::Rejected
        ));
        assert!(matches!(studio.plan_pose_change(2), PosePlan::Rejected));
        studio.remove_last_garment();
        assert_eq!(studio.history().current_index(), 0);
    }

    #[test]
    fn result_arriving_after_start_over_is_discarded_as_stale() {
        let mut studio = studio();
        let tag = studio.begin_base_generation().unwrap();
        studio.finish_base_generation(tag, Ok(test_handle(0)));

        let GarmentPlan::Generate { tag, .. } = studio.plan_garment_selection(&garment("g1"))
        else {
            panic!("expected a generate plan");
        };

        studio.start_over();
        assert!(!studio.is_loading());
        assert!(!studio.history().is_initialized());

        // The old request resolves late; nothing may resurrect.
        studio.finish_garment_selection(tag, garment("g1"), Ok(test_handle(1)));
        assert!(!studio.history().is_initialized());
        assert!(studio.error().is_none());
        assert!(!studio.is_loading());
    }

    #[test]
    fn selecting_the_current_pose_again_is_rejected() {
        let mut studio = studio();
        let tag = studio.begin_base_generation().unwrap();
        studio.finish_base_generation(tag, Ok(test_handle(0)));

        assert!(matches!(
            studio.plan_pose_change(pose::FIRST),
            PosePlan::Rejected
        ));
        assert!(!studio.is_loading());
    }
}
