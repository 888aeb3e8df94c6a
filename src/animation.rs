use std::fmt;

use log::{info, warn};
use thiserror::Error;

use crate::camera::CameraPose;
use crate::lumen::CaptureError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyframe {
    Start,
    End,
}

impl fmt::Display for Keyframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Keyframe::Start => write!(f, "start"),
            Keyframe::End => write!(f, "end"),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AnimationError {
    #[error("The {0} keyframe has not been set")]
    MissingKeyframe(Keyframe),
    #[error("Camera speed must be a positive number, got {0}")]
    InvalidSpeed(f32),
    #[error("Frame rate must be at least 1")]
    InvalidFrameRate,
    #[error("Frame passes must be at least 1")]
    InvalidFramePasses,
    #[error("Start and end keyframes are too close to produce a single frame")]
    EmptyAnimation,
    #[error("An animation is already being rendered")]
    AlreadyPlaying,
    #[error("No animation is armed")]
    NotArmed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationSettings {
    // 프레임 하나를 저장하기 전에 누적할 패스 수
    pub frame_passes: u32,
    pub frame_rate: u32,
    // 초당 이동 거리
    pub camera_speed: f32,
}

impl Default for AnimationSettings {
    fn default() -> Self {
        Self {
            frame_passes: 16,
            frame_rate: 24,
            camera_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationPlan {
    pub start: CameraPose,
    pub end: CameraPose,
    pub frame_passes: u32,
    pub total_frames: u32,
}

impl AnimationPlan {
    // 프레임 수는 floor(거리 / 속도 * 프레임 레이트). 거리는 위치만 봄
    pub fn new(start: CameraPose, end: CameraPose, settings: &AnimationSettings) -> Result<Self, AnimationError> {
        if !(settings.camera_speed.is_finite() && settings.camera_speed > 0.0) {
            return Err(AnimationError::InvalidSpeed(settings.camera_speed));
        }
        if settings.frame_rate == 0 {
            return Err(AnimationError::InvalidFrameRate);
        }
        if settings.frame_passes == 0 {
            return Err(AnimationError::InvalidFramePasses);
        }

        let distance = (end.position - start.position).magnitude();
        let total_frames = (distance / settings.camera_speed * settings.frame_rate as f32).floor();
        if total_frames < 1.0 {
            return Err(AnimationError::EmptyAnimation);
        }

        Ok(Self {
            start,
            end,
            frame_passes: settings.frame_passes,
            total_frames: total_frames as u32,
        })
    }

    pub fn pose_at(&self, frame: u32) -> CameraPose {
        self.start.interpolate(&self.end, frame as f32 / self.total_frames as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Playback {
    pub plan: AnimationPlan,
    pub current_frame: u32,
    pub current_pass: u32,
    // 이 프레임에서 아직 누적 버퍼를 비우지 않음
    pub needs_refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AnimationState {
    #[default]
    Idle,
    Armed(AnimationPlan),
    // 시작 요청을 받은 프레임. 다음 프레임 시작부터 재생
    Priming(AnimationPlan),
    Playing(Playback),
}

// 애니메이션이 이번 프레임에 카메라를 어떻게 둘지
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationFrame {
    pub pose: CameraPose,
    // 새 프레임의 첫 패스라 누적 버퍼를 비워야 함
    pub fresh: bool,
}

#[derive(Debug, Default)]
pub struct AnimationController {
    pub settings: AnimationSettings,
    start: Option<CameraPose>,
    end: Option<CameraPose>,
    state: AnimationState,
}

impl AnimationController {
    pub fn new(settings: AnimationSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn start_keyframe(&self) -> Option<&CameraPose> {
        self.start.as_ref()
    }

    pub fn end_keyframe(&self) -> Option<&CameraPose> {
        self.end.as_ref()
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, AnimationState::Priming(_) | AnimationState::Playing(_))
    }

    pub fn set_keyframe(&mut self, keyframe: Keyframe, pose: CameraPose) -> Result<(), AnimationError> {
        if self.is_active() {
            return Err(AnimationError::AlreadyPlaying);
        }

        match keyframe {
            Keyframe::Start => self.start = Some(pose),
            Keyframe::End => self.end = Some(pose),
        }
        // 키프레임이 바뀌면 이전에 계산한 계획은 못 씀
        self.state = AnimationState::Idle;
        Ok(())
    }

    pub fn plan(&self) -> Result<AnimationPlan, AnimationError> {
        let start = self.start.ok_or(AnimationError::MissingKeyframe(Keyframe::Start))?;
        let end = self.end.ok_or(AnimationError::MissingKeyframe(Keyframe::End))?;
        AnimationPlan::new(start, end, &self.settings)
    }

    pub fn arm(&mut self) -> Result<AnimationPlan, AnimationError> {
        if self.is_active() {
            return Err(AnimationError::AlreadyPlaying);
        }

        let plan = self.plan()?;
        info!("Animation armed: {} frames x {} passes", plan.total_frames, plan.frame_passes);
        self.state = AnimationState::Armed(plan);
        Ok(plan)
    }

    pub fn start(&mut self) -> Result<(), AnimationError> {
        match self.state {
            AnimationState::Armed(plan) => {
                self.state = AnimationState::Priming(plan);
                Ok(())
            }
            AnimationState::Priming(_) | AnimationState::Playing(_) => Err(AnimationError::AlreadyPlaying),
            AnimationState::Idle => Err(AnimationError::NotArmed),
        }
    }

    // 계획을 세우고 바로 시작
    pub fn render(&mut self) -> Result<u32, AnimationError> {
        let total_frames = self.arm()?.total_frames;
        self.start()?;
        Ok(total_frames)
    }

    pub fn cancel(&mut self) {
        match self.state {
            AnimationState::Playing(playback) => info!(
                "Animation cancelled at frame {}/{}",
                playback.current_frame, playback.plan.total_frames
            ),
            AnimationState::Priming(_) => info!("Animation cancelled before the first frame"),
            _ => {}
        }
        self.state = AnimationState::Idle;
    }

    // 애니메이션 중 이번 프레임의 카메라. Priming이면 여기서 Playing이 되므로
    // 첫 저장은 요청한 다음 프레임부터 일어남
    pub fn begin_frame(&mut self) -> Option<AnimationFrame> {
        if let AnimationState::Priming(plan) = self.state {
            info!("Animation started");
            self.state = AnimationState::Playing(Playback {
                plan,
                current_frame: 0,
                current_pass: 0,
                needs_refresh: true,
            });
        }

        match &mut self.state {
            AnimationState::Playing(playback) => Some(AnimationFrame {
                pose: playback.plan.pose_at(playback.current_frame),
                fresh: std::mem::take(&mut playback.needs_refresh),
            }),
            _ => None,
        }
    }

    // 누적 패스 하나가 끝났을 때만 부름. 애니메이션 프레임의 마지막 패스면
    // capture에 프레임 번호를 넘기고, 저장에 실패하면 애니메이션을 멈춤
    pub fn end_frame<F>(&mut self, capture: F) -> Result<Option<u32>, CaptureError>
    where
        F: FnOnce(u32) -> Result<(), CaptureError>,
    {
        let AnimationState::Playing(playback) = &mut self.state else {
            return Ok(None);
        };

        if playback.current_pass + 1 < playback.plan.frame_passes {
            playback.current_pass += 1;
            return Ok(None);
        }

        let frame = playback.current_frame;
        if let Err(error) = capture(frame) {
            warn!("Animation stopped, frame {} could not be saved: {}", frame, error);
            self.state = AnimationState::Idle;
            return Err(error);
        }

        playback.current_frame += 1;
        playback.current_pass = 0;
        playback.needs_refresh = true;
        if playback.current_frame >= playback.plan.total_frames {
            info!("Animation finished: {} frames", playback.plan.total_frames);
            self.state = AnimationState::Idle;
        }

        Ok(Some(frame))
    }

    pub fn progress(&self) -> Option<(u32, u32)> {
        match &self.state {
            AnimationState::Priming(plan) => Some((0, plan.total_frames)),
            AnimationState::Playing(playback) => Some((playback.current_frame, playback.plan.total_frames)),
            _ => None,
        }
    }
}
