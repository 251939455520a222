use serde::{Deserialize, Serialize};

use crate::error::InvalidParameters;

pub const OCTREE_RESOLUTIONS: [u32; 4] = [128, 256, 384, 512];
pub const MAX_SEED: u64 = 2_147_483_647;
pub const PROMPT_MIN_CHARS: usize = 3;
pub const PROMPT_MAX_CHARS: usize = 500;

/// Quality presets understood by the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    Fast,
    #[default]
    Standard,
    Quality,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Standard => "standard",
            Self::Quality => "quality",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Glb,
    Obj,
    Ply,
    Stl,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Glb => "glb",
            Self::Obj => "obj",
            Self::Ply => "ply",
            Self::Stl => "stl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    Low,
    #[default]
    Normal,
    High,
}

impl JobPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
        }
    }
}

/// Tunables sent with every generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub inference_steps: u32,
    pub guidance_scale: f32,
    pub octree_resolution: u32,
    pub seed: Option<u64>,
    pub generate_texture: bool,
    pub face_count: Option<u32>,
    pub output_format: OutputFormat,
    pub mode: GenerationMode,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            inference_steps: 30,
            guidance_scale: 5.5,
            octree_resolution: 256,
            seed: None,
            generate_texture: true,
            face_count: None,
            output_format: OutputFormat::default(),
            mode: GenerationMode::default(),
        }
    }
}

impl GenerationParameters {
    /// Check every field against the backend's accepted ranges.
    pub fn validate(&self) -> Result<(), InvalidParameters> {
        let mut errors = Vec::new();

        if !(5..=100).contains(&self.inference_steps) {
            errors.push(format!(
                "inference_steps must be between 5 and 100, got {}",
                self.inference_steps
            ));
        }
        if !(1.0..=15.0).contains(&self.guidance_scale) {
            errors.push(format!(
                "guidance_scale must be between 1.0 and 15.0, got {}",
                self.guidance_scale
            ));
        }
        if !OCTREE_RESOLUTIONS.contains(&self.octree_resolution) {
            errors.push(format!(
                "octree_resolution must be one of 128, 256, 384, 512, got {}",
                self.octree_resolution
            ));
        }
        if let Some(seed) = self.seed {
            if seed > MAX_SEED {
                errors.push(format!("seed must be at most {MAX_SEED}, got {seed}"));
            }
        }
        if let Some(faces) = self.face_count {
            if !(100..=1_000_000).contains(&faces) {
                errors.push(format!(
                    "face_count must be between 100 and 1000000, got {faces}"
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(InvalidParameters(errors))
        }
    }
}

/// Check a text-to-3D prompt length.
pub fn validate_prompt(prompt: &str) -> Result<(), InvalidParameters> {
    let chars = prompt.trim().chars().count();
    if (PROMPT_MIN_CHARS..=PROMPT_MAX_CHARS).contains(&chars) {
        Ok(())
    } else {
        Err(InvalidParameters(vec![format!(
            "prompt must be between {PROMPT_MIN_CHARS} and {PROMPT_MAX_CHARS} characters, got {chars}"
        )]))
    }
}
