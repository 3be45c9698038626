use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fmt::Display,
    path::{Component, Path, PathBuf},
};
use strum::{Display as StrumDisplay, EnumIter};
use validator::{Validate, ValidationError};

/// Name of the optional configuration file in a project root.
pub const CONFIG_FILE: &str = "appicon.toml";

/// Fraction of an adaptive icon that survives every launcher mask.
pub const ADAPTIVE_SAFE_ZONE: f32 = 0.66;

/// Location of an icon configuration file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigPath(PathBuf);

impl ConfigPath {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Check for a configuration file in the given directory.
    pub fn from_dir(path: impl AsRef<Path>) -> Option<ConfigPath> {
        let path = path.as_ref().join(CONFIG_FILE);
        if path.exists() {
            return Some(ConfigPath(path));
        }

        None
    }

    /// Read and parse the configuration.
    pub fn load(&self) -> Result<IconConfig> {
        let content = std::fs::read_to_string(&self.0)
            .with_context(|| format!("Failed to read {}", self))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", self))
    }
}

impl Display for ConfigPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.to_string_lossy().fmt(f)
    }
}

/// What an output is used for.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputRole {
    /// The full launcher icon
    #[default]
    Icon,

    /// Foreground layer of an adaptive icon
    Foreground,
}

/// A single PNG to produce from the source SVG.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct OutputSpec {
    /// File name, relative to the output directory
    #[validate(length(min = 1))]
    pub name: String,

    #[validate(range(min = 1, max = 16384))]
    pub width: u32,

    #[validate(range(min = 1, max = 16384))]
    pub height: u32,

    #[serde(default)]
    pub role: OutputRole,

    #[serde(default = "default_content_scale")]
    #[validate(range(min = 0.01, max = 1.0))]
    pub content_scale: f32,
}

fn default_content_scale() -> f32 {
    1.0
}

impl OutputSpec {
    pub fn new(name: &str, width: u32, height: u32, role: OutputRole) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            role,
            content_scale: default_content_scale(),
        }
    }
}

/// Everything the generator needs to know.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_outputs"))]
pub struct IconConfig {
    /// The SVG template
    pub source: PathBuf,

    /// Where outputs go (defaults to the directory containing the source)
    pub output_dir: Option<PathBuf>,

    #[validate(length(min = 1), nested)]
    pub outputs: Vec<OutputSpec>,

    /// Printed after a successful run
    pub next_steps: Vec<String>,
}

fn validate_outputs(config: &IconConfig) -> Result<(), ValidationError> {
    let mut names = HashSet::new();
    for output in &config.outputs {
        if !names.insert(output.name.as_str()) {
            return Err(ValidationError::new("duplicate_output_name"));
        }

        // Names must stay inside the output directory
        let mut components = Path::new(&output.name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return Err(ValidationError::new("output_name_not_a_file_name")),
        }

        if config.output_path(output) == config.source {
            return Err(ValidationError::new("output_overwrites_source"));
        }

        // The range check lets NaN through
        if !output.content_scale.is_finite() {
            return Err(ValidationError::new("content_scale_not_finite"));
        }
    }
    Ok(())
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("assets/icons/app_icon.svg"),
            output_dir: None,
            outputs: vec![
                OutputSpec::new("app_icon.png", 1024, 1024, OutputRole::Icon),
                OutputSpec::new(
                    "app_icon_foreground.png",
                    1024,
                    1024,
                    OutputRole::Foreground,
                ),
            ],
            next_steps: vec![
                String::from("Run: flutter pub get"),
                String::from("Run: dart run flutter_launcher_icons"),
                String::from("Build your app: flutter build apk --release"),
            ],
        }
    }
}

impl IconConfig {
    /// Make relative paths relative to the given project root.
    pub fn resolve(mut self, root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        self.source = root.join(&self.source);
        self.output_dir = self.output_dir.map(|dir| root.join(dir));
        self
    }

    /// The directory outputs are written to.
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => self
                .source
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
        }
    }

    /// Full path of the given output.
    pub fn output_path(&self, output: &OutputSpec) -> PathBuf {
        self.output_dir().join(&output.name)
    }

    /// Shrink foreground outputs into the adaptive icon safe zone.
    pub fn pad_foreground(mut self) -> Self {
        for output in self
            .outputs
            .iter_mut()
            .filter(|output| output.role == OutputRole::Foreground)
        {
            output.content_scale = ADAPTIVE_SAFE_ZONE;
        }
        self
    }
}
