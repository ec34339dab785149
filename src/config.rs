/// Studio settings
///
/// A small JSON file in the user's config directory holds the API key and
/// the default wardrobe seed. Environment variables win over the file so a
/// key never has to be written to disk.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::images::ImageHandle;
use crate::state::wardrobe::Garment;

/// One seeded wardrobe entry: the image is loaded from disk at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardrobeSeed {
    pub id: String,
    pub name: String,
    pub image_path: PathBuf,
}

/// Contents of `settings.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Gemini API key. `GEMINI_API_KEY` / `API_KEY` env vars override this.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Garments the wardrobe starts with.
    #[serde(default)]
    pub wardrobe: Vec<WardrobeSeed>,
}

impl Settings {
    /// Load the settings file, writing a default one on first run.
    /// A corrupt file is reported and treated as defaults rather than
    /// preventing startup.
    pub fn load() -> Self {
        let path = Self::settings_path();

        if !path.exists() {
            let defaults = Self::default();
            defaults.write_to(&path);
            return defaults;
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    eprintln!("⚠️  Ignoring malformed settings at {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!("⚠️  Could not read settings at {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Where the settings live:
    /// - Linux: ~/.config/fit-studio/settings.json
    /// - macOS: ~/Library/Application Support/fit-studio/settings.json
    /// - Windows: %APPDATA%\fit-studio\settings.json
    fn settings_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .expect("Could not determine user config directory");

        path.push("fit-studio");
        path.push("settings.json");
        path
    }

    fn write_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                eprintln!("⚠️  Could not create config directory: {err}");
                return;
            }
        }
        let contents =
            serde_json::to_string_pretty(self).expect("Settings always serialize");
        match std::fs::write(path, contents) {
            Ok(()) => println!("📁 Wrote default settings to {}", path.display()),
            Err(err) => eprintln!("⚠️  Could not write settings: {err}"),
        }
    }

    /// The API key to use, environment first, settings file second.
    pub fn resolved_api_key(&self) -> Option<String> {
        for var in ["GEMINI_API_KEY", "API_KEY"] {
            if let Ok(value) = std::env::var(var) {
                if !value.trim().is_empty() {
                    return Some(value);
                }
            }
        }
        self.api_key.clone()
    }

    /// Load the seeded garments, skipping entries whose image is missing
    /// or unreadable. A thin seed just means an upload-only wardrobe.
    pub fn load_wardrobe_seed(&self) -> Vec<Garment> {
        let mut garments = Vec::new();
        for seed in &self.wardrobe {
            match ImageHandle::load_from_path(&seed.image_path) {
                Ok(image) => garments.push(Garment {
                    id: seed.id.clone(),
                    name: seed.name.clone(),
                    image,
                }),
                Err(err) => {
                    eprintln!("⚠️  Skipping wardrobe seed '{}': {err}", seed.name);
                }
            }
        }
        garments
    }
}
