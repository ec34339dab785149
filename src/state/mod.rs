/// State management module
///
/// This module holds all domain state, independent of the UI toolkit:
/// - The fixed pose catalog (pose.rs)
/// - The outfit history and per-layer pose cache (history.rs)
/// - The wardrobe catalog (wardrobe.rs)
/// - The try-on orchestrator and request guard (studio.rs)

pub mod history;
pub mod pose;
pub mod studio;
pub mod wardrobe;
