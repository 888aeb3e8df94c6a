use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::picking::PlacementRule;
use crate::scene::Preset;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value `{value}` for {key}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub window_size: (u32, u32),
    // 창 크기 대비 실제로 추적하는 해상도 비율
    pub render_scale: f32,
    pub preset: Preset,
    pub skybox: Option<String>,
    pub placement: PlacementRule,
    pub stall_threshold: Duration,
    pub stall_limit: u32,
    // CPU 렌더러가 한 프레임의 누적 패스에 쓸 수 있는 시간. 넘으면 다음 프레임에 이어 그림
    pub frame_budget: Duration,
    pub render_output_dir: PathBuf,
    pub preview_dir: PathBuf,
    pub skybox_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: (1280, 720),
            render_scale: 0.5,
            preset: Preset::default(),
            skybox: None,
            placement: PlacementRule::default(),
            stall_threshold: Duration::from_secs(1),
            stall_limit: 2,
            frame_budget: Duration::from_millis(250),
            render_output_dir: PathBuf::from("render_output"),
            preview_dir: PathBuf::from("anim"),
            skybox_dir: PathBuf::from("skyboxes"),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("LUMEN_SCENE") {
            config.preset = parse("LUMEN_SCENE", &value)?;
        }

        if let Some(value) = lookup("LUMEN_RENDER_SCALE") {
            let scale: f32 = parse("LUMEN_RENDER_SCALE", &value)?;
            if !(scale > 0.0 && scale <= 1.0) {
                return Err(ConfigError {
                    key: "LUMEN_RENDER_SCALE",
                    value,
                    reason: String::from("must be in (0, 1]"),
                });
            }
            config.render_scale = scale;
        }

        if let Some(value) = lookup("LUMEN_SKYBOX") {
            if !value.trim().is_empty() {
                config.skybox = Some(value.trim().to_owned());
            }
        }

        if let Some(value) = lookup("LUMEN_PLACEMENT") {
            config.placement = parse("LUMEN_PLACEMENT", &value)?;
        }

        if let Some(value) = lookup("LUMEN_FRAME_BUDGET_MS") {
            let millis: u64 = parse("LUMEN_FRAME_BUDGET_MS", &value)?;
            let budget = Duration::from_millis(millis);
            if budget.is_zero() || budget >= config.stall_threshold {
                return Err(ConfigError {
                    key: "LUMEN_FRAME_BUDGET_MS",
                    value,
                    reason: format!("must be between 1 and {} ms", config.stall_threshold.as_millis() - 1),
                });
            }
            config.frame_budget = budget;
        }

        Ok(config)
    }

    pub fn render_size(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |length: u32| ((length as f32 * self.render_scale) as u32).max(1);
        (scale(width), scale(height))
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: ToString,
{
    value.trim().parse().map_err(|error: T::Err| ConfigError {
        key,
        value: value.to_owned(),
        reason: error.to_string(),
    })
}
