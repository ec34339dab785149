use iced::{Element, Task, Theme};
use rfd::FileDialog;
use std::sync::Arc;

use chrono::Utc;

// Application modules
mod config;
mod images;
mod provider;
mod session;
mod state;
mod ui;

use crate::images::ImageHandle;
use crate::provider::gemini::GeminiProvider;
use crate::provider::{ProviderError, TryOnProvider};
use crate::state::pose;
use crate::state::studio::{GarmentPlan, PosePlan, Studio};
use crate::state::wardrobe::{Garment, Wardrobe};

/// Main application state
struct FitStudio {
    /// The dressing-room state machine
    studio: Studio,
    /// The generation backend (swappable behind the trait)
    provider: Arc<dyn TryOnProvider>,
    /// Session gate; the studio never renders without a user
    session: session::Session,
    /// The portrait most recently uploaded, shown while the base model
    /// is being generated
    portrait: Option<ImageHandle>,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// User opened the studio from the locked screen
    SignInGuest,
    /// User left the session; drops all studio state
    SignOut,
    /// User clicked "Upload Portrait"
    UploadPortrait,
    /// Base model generation finished
    BaseModelReady(u64, Result<ImageHandle, ProviderError>),
    /// User picked a garment tile from the wardrobe
    GarmentPicked(String),
    /// User clicked the wardrobe upload tile
    UploadGarment,
    /// Try-on generation finished
    TryOnReady(u64, Garment, Result<ImageHandle, ProviderError>),
    /// User picked a pose by catalog index
    PoseSelected(usize),
    NextPose,
    PreviousPose,
    /// Pose generation finished
    PoseReady(u64, usize, Result<ImageHandle, ProviderError>),
    /// User removed the top garment layer
    RemoveLastGarment,
    /// Hard reset back to the start screen
    StartOver,
    /// Save the displayed image to disk
    Download,
}

impl FitStudio {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let settings = config::Settings::load();
        let wardrobe = Wardrobe::new(settings.load_wardrobe_seed());

        println!(
            "🎨 Fit Studio initialized with {} wardrobe garments",
            wardrobe.len()
        );
        if settings.resolved_api_key().is_none() {
            eprintln!("⚠️  No API key configured; generation will fail with setup guidance");
        }

        let provider: Arc<dyn TryOnProvider> =
            Arc::new(GeminiProvider::new(settings.resolved_api_key()));

        (
            FitStudio {
                studio: Studio::new(wardrobe),
                provider,
                session: session::Session::local(),
                portrait: None,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::SignInGuest => {
                self.session.sign_in_as_guest();
                Task::none()
            }
            Message::SignOut => {
                if let Some(user) = self.session.current_user() {
                    println!("👋 {} signed out", user.display_name);
                }
                // Studio state is session-lived; leaving drops it all.
                self.studio.start_over();
                self.portrait = None;
                self.session.sign_out();
                Task::none()
            }
            Message::UploadPortrait => {
                let picked = FileDialog::new()
                    .set_title("Choose a portrait")
                    .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
                    .pick_file();

                let Some(path) = picked else {
                    return Task::none();
                };

                match ImageHandle::load_from_path(&path) {
                    Ok(portrait) => {
                        let Some(tag) = self.studio.begin_base_generation() else {
                            return Task::none();
                        };
                        self.portrait = Some(portrait.clone());
                        let provider = self.provider.clone();
                        Task::perform(
                            async move { provider.synthesize_base_model(portrait).await },
                            move |result| Message::BaseModelReady(tag, result),
                        )
                    }
                    Err(err) => {
                        self.studio.show_error(err.to_string());
                        Task::none()
                    }
                }
            }
            Message::BaseModelReady(tag, result) => {
                self.studio.finish_base_generation(tag, result);
                Task::none()
            }
            Message::GarmentPicked(id) => {
                let Some(garment) = self.studio.wardrobe().get(&id).cloned() else {
                    return Task::none();
                };
                self.start_try_on(garment)
            }
            Message::UploadGarment => {
                let picked = FileDialog::new()
                    .set_title("Choose a garment photo")
                    .add_filter("Images", &["png", "jpg", "jpeg", "webp"])
                    .pick_file();

                let Some(path) = picked else {
                    return Task::none();
                };

                match ImageHandle::load_from_path(&path) {
                    Ok(image) => {
                        let name = path
                            .file_stem()
                            .map(|stem| stem.to_string_lossy().to_string())
                            .unwrap_or_else(|| "Custom garment".to_string());
                        let garment = Garment {
                            id: format!("custom-{}", Utc::now().timestamp_millis()),
                            name,
                            image,
                        };
                        self.start_try_on(garment)
                    }
                    Err(err) => {
                        self.studio.show_error(err.to_string());
                        Task::none()
                    }
                }
            }
            Message::TryOnReady(tag, garment, result) => {
                self.studio.finish_garment_selection(tag, garment, result);
                Task::none()
            }
            Message::PoseSelected(index) => self.start_pose_change(index),
            Message::NextPose => self.start_pose_change(pose::next(self.studio.pose_index())),
            Message::PreviousPose => {
                self.start_pose_change(pose::previous(self.studio.pose_index()))
            }
            Message::PoseReady(tag, pose_index, result) => {
                self.studio.finish_pose_change(tag, pose_index, result);
                Task::none()
            }
            Message::RemoveLastGarment => {
                self.studio.remove_last_garment();
                Task::none()
            }
            Message::StartOver => {
                self.studio.start_over();
                self.portrait = None;
                Task::none()
            }
            Message::Download => {
                let Some(image) = self.studio.displayed_image().cloned() else {
                    return Task::none();
                };

                let picked = FileDialog::new()
                    .set_title("Save the current look")
                    .set_file_name(images::suggested_download_name())
                    .save_file();

                if let Some(path) = picked {
                    match image.save_to_path(&path) {
                        Ok(()) => println!("✅ Saved look to {}", path.display()),
                        Err(err) => self.studio.show_error(err.to_string()),
                    }
                }
                Task::none()
            }
        }
    }

    /// Kick off a try-on for a garment, unless the cache or guard says no.
    fn start_try_on(&mut self, garment: Garment) -> Task<Message> {
        match self.studio.plan_garment_selection(&garment) {
            GarmentPlan::Generate {
                tag,
                source,
                garment_image,
            } => {
                let provider = self.provider.clone();
                Task::perform(
                    async move { provider.synthesize_try_on(source, garment_image).await },
                    move |result| Message::TryOnReady(tag, garment.clone(), result),
                )
            }
            // Reuse hit or guard rejection: state is already settled.
            GarmentPlan::Reused | GarmentPlan::Rejected => Task::none(),
        }
    }

    /// Kick off a pose change, unless the cache or guard says no.
    fn start_pose_change(&mut self, pose_index: usize) -> Task<Message> {
        match self.studio.plan_pose_change(pose_index) {
            PosePlan::Generate {
                tag,
                source,
                pose_index,
            } => {
                let provider = self.provider.clone();
                let instruction = pose::instruction(pose_index).to_string();
                Task::perform(
                    async move { provider.synthesize_pose_variant(source, instruction).await },
                    move |result| Message::PoseReady(tag, pose_index, result),
                )
            }
            PosePlan::Applied | PosePlan::Rejected => Task::none(),
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        if self.session.current_user().is_none() {
            return ui::locked_screen();
        }

        if self.studio.history().is_initialized() {
            ui::studio_screen(&self.studio)
        } else {
            ui::start_screen(&self.studio, self.portrait.as_ref())
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Light
    }
}

fn main() -> iced::Result {
    iced::application("Fit Studio", FitStudio::update, FitStudio::view)
        .theme(FitStudio::theme)
        .centered()
        .run_with(FitStudio::new)
}
