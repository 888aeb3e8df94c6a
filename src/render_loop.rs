use std::path::Path;
use std::time::Duration;

use log::{debug, error};
use thiserror::Error;

use crate::camera::{CameraPose, CameraUniform};
use crate::lumen::{CaptureError, ResourceError};
use crate::scene::{Scene, SceneSnapshot};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Freeze detected: {frames} consecutive frames took longer than {threshold:?}")]
pub struct StallError {
    pub frames: u32,
    pub threshold: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    // 오프스크린 버퍼에 누적
    Accumulate,
    // 누적된 결과를 화면에 합성
    DirectOutput,
}

// 누적 패스를 한 번에 다 못 그렸으면 Partial. 다음 제출에서 이어서 그림
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassProgress {
    Complete,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePass {
    pub mode: PassMode,
    // 끝까지 그린 누적 패스 수
    pub accumulated_passes: u32,
    // 이전 누적 버퍼를 버리고 새로 시작
    pub discard: bool,
    pub samples: u32,
    pub camera: CameraUniform,
    pub time: f32,
}

// 실제로 그림을 그리는 쪽. 씬은 매 패스마다 스냅샷으로 받음
pub trait RenderBackend {
    fn resize(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    fn submit(&mut self, scene: &SceneSnapshot<'_>, pass: &FramePass) -> PassProgress;

    fn capture(&self, accumulated_passes: u32, path: &Path) -> Result<(), CaptureError>;

    fn load_skybox(&mut self, path: &Path) -> Result<(), ResourceError>;

    fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.size();
        width.max(1) as f32 / height.max(1) as f32
    }
}

#[derive(Debug)]
pub struct RenderLoop {
    accumulated_passes: u32,
    discard_pending: bool,
    pass_completed: bool,
    freeze_counter: u32,
    stall_threshold: Duration,
    stall_limit: u32,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), 2)
    }
}

impl RenderLoop {
    pub fn new(stall_threshold: Duration, stall_limit: u32) -> Self {
        Self {
            accumulated_passes: 0,
            discard_pending: true,
            pass_completed: false,
            freeze_counter: 0,
            stall_threshold,
            stall_limit,
        }
    }

    pub fn accumulated_passes(&self) -> u32 {
        self.accumulated_passes
    }

    // 이번 프레임의 누적 패스가 화면 전체를 다 그렸는지
    pub fn pass_completed(&self) -> bool {
        self.pass_completed
    }

    // 한 프레임에 정확히 두 번 그림: 오프스크린 누적 -> 화면 합성
    pub fn render<B: RenderBackend>(&mut self, scene: &mut Scene, backend: &mut B, time: f32) -> u32 {
        if scene.take_refresh() {
            debug!("Refresh: discarding {} accumulated passes", self.accumulated_passes);
            self.accumulated_passes = 0;
            self.discard_pending = true;
        }

        let snapshot = scene.snapshot();
        let camera = snapshot.camera.uniform(backend.aspect_ratio());
        let samples = snapshot.quality.frame_passes;

        // 1단계: 오프스크린 버퍼에 누적. discard면 셰이더는 이전 버퍼를 버림
        let progress = backend.submit(
            &snapshot,
            &FramePass {
                mode: PassMode::Accumulate,
                accumulated_passes: self.accumulated_passes,
                discard: self.discard_pending,
                samples,
                camera,
                time,
            },
        );
        self.discard_pending = false;
        self.pass_completed = progress == PassProgress::Complete;
        if self.pass_completed {
            self.accumulated_passes += 1;
        }

        // 2단계: 화면에 합성
        backend.submit(
            &snapshot,
            &FramePass {
                mode: PassMode::DirectOutput,
                accumulated_passes: self.accumulated_passes,
                discard: false,
                samples,
                camera,
                time,
            },
        );

        self.accumulated_passes
    }

    // 인터랙티브 카메라를 거치지 않고 pose에서 본 한 장을 끝까지 그림.
    // 다음 인터랙티브 프레임은 처음부터 다시 누적
    pub fn render_still<B: RenderBackend>(
        &mut self,
        scene: &mut Scene,
        backend: &mut B,
        pose: &CameraPose,
        samples: u32,
        time: f32,
    ) {
        let snapshot = scene.snapshot();
        let mut pass = FramePass {
            mode: PassMode::Accumulate,
            accumulated_passes: 0,
            discard: true,
            samples,
            camera: pose.uniform(backend.aspect_ratio()),
            time,
        };
        while backend.submit(&snapshot, &pass) == PassProgress::Partial {
            pass.discard = false;
        }

        // 저장할 장면을 화면에도 보여줌
        backend.submit(
            &snapshot,
            &FramePass {
                mode: PassMode::DirectOutput,
                accumulated_passes: 1,
                discard: false,
                ..pass
            },
        );

        self.accumulated_passes = 0;
        self.pass_completed = false;
        scene.request_refresh();
    }

    pub fn check_liveness(&mut self, frame_time: Duration) -> Result<(), StallError> {
        if frame_time <= self.stall_threshold {
            self.freeze_counter = 0;
            return Ok(());
        }

        self.freeze_counter += 1;
        if self.freeze_counter >= self.stall_limit {
            error!("Freeze detected. Shutting down...");
            return Err(StallError {
                frames: self.freeze_counter,
                threshold: self.stall_threshold,
            });
        }

        Ok(())
    }
}
