use std::path::PathBuf;
use std::time::Duration;

use log::{error, info, warn};
use winit::event::VirtualKeyCode;

use crate::animation::{AnimationController, AnimationError, AnimationPlan};
use crate::camera::CameraController;
use crate::config::Config;
use crate::lumen::{frame_path, ResourceError};
use crate::picking::{place_at_cursor, select_hovered, PlacementRule};
use crate::render_loop::{RenderBackend, RenderLoop, StallError};
use crate::scene::Scene;

// 애니메이션 경로를 프레임마다 한 장씩 바로 저장하는 미리보기
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preview {
    pub plan: AnimationPlan,
    pub next_frame: u32,
}

// 창 하나가 가지는 모든 것: 씬, 렌더 루프, 카메라와 애니메이션 컨트롤러, 렌더러
pub struct Session<B: RenderBackend> {
    pub scene: Scene,
    pub render_loop: RenderLoop,
    pub animation: AnimationController,
    pub controller: CameraController,
    pub backend: B,
    pub animation_panel_visible: bool,
    pub last_error: Option<String>,
    preview: Option<Preview>,
    // 이번 프레임이 미리보기 프레임이었는지. 멈춤 감지에서 뺌
    previewed_this_frame: bool,
    viewport: (u32, u32),
    render_scale: f32,
    placement: PlacementRule,
    placing: bool,
    quit_requested: bool,
    render_output_dir: PathBuf,
    preview_dir: PathBuf,
    skybox_dir: PathBuf,
}

impl<B: RenderBackend> Session<B> {
    pub fn new(scene: Scene, mut backend: B, config: &Config) -> Self {
        let (width, height) = config.window_size;
        let (render_width, render_height) = config.render_size(width, height);
        backend.resize(render_width, render_height);

        Self {
            scene,
            render_loop: RenderLoop::new(config.stall_threshold, config.stall_limit),
            animation: AnimationController::default(),
            controller: CameraController::new(),
            backend,
            animation_panel_visible: false,
            last_error: None,
            preview: None,
            previewed_this_frame: false,
            viewport: (width, height),
            render_scale: config.render_scale,
            placement: config.placement,
            placing: false,
            quit_requested: false,
            render_output_dir: config.render_output_dir.clone(),
            preview_dir: config.preview_dir.clone(),
            skybox_dir: config.skybox_dir.clone(),
        }
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn mouse_absorbed(&self) -> bool {
        self.controller.grab_mouse
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);
        let scale = |length: u32| ((length as f32 * self.render_scale) as u32).max(1);
        self.backend.resize(scale(width), scale(height));
        self.scene.request_refresh();
    }

    // 입력을 처리했으면 true
    pub fn key(&mut self, key: VirtualKeyCode, pressed: bool) -> bool {
        match key {
            VirtualKeyCode::Escape if pressed => {
                if self.animation.is_active() {
                    self.animation.cancel();
                } else if self.preview.is_some() {
                    self.cancel_preview();
                } else if self.controller.is_held(VirtualKeyCode::LShift) {
                    self.quit_requested = true;
                } else {
                    self.toggle_mouse();
                }
                true
            }
            VirtualKeyCode::R if pressed => {
                self.animation_panel_visible = !self.animation_panel_visible;
                true
            }
            VirtualKeyCode::E => {
                self.placing = pressed;
                true
            }
            _ => self.controller.key(key, pressed),
        }
    }

    // 마우스를 잡으면 선택은 풀림
    pub fn toggle_mouse(&mut self) {
        self.controller.grab_mouse = !self.controller.grab_mouse;
        if self.controller.grab_mouse {
            let _ = self.scene.select(None);
        } else {
            self.controller.release_all();
        }
        info!("Mouse absorbed: {}", self.controller.grab_mouse);
    }

    // 카메라를 애니메이션이나 미리보기가 쥐고 있는 동안
    pub fn camera_locked(&self) -> bool {
        self.animation.is_active() || self.preview.is_some()
    }

    // 잠긴 동안 들어온 마우스 이동은 쌓지 않고 버림
    pub fn mouse_motion(&mut self, delta: (f64, f64)) {
        if !self.camera_locked() {
            self.controller.mouse_motion(delta);
        }
    }

    // 창 좌표 기준 왼쪽 클릭. E를 누르고 있으면 바닥에 배치, 아니면 가리킨 오브젝트를 선택
    pub fn click(&mut self, x: f32, y: f32) -> Option<usize> {
        if self.controller.grab_mouse || self.camera_locked() {
            return None;
        }

        let (width, height) = self.viewport;
        if self.placing {
            place_at_cursor(&mut self.scene, x, y, width, height, self.placement)
        } else {
            select_hovered(&mut self.scene, x, y, width, height)
        }
    }

    // 애니메이션 중에는 카메라를 애니메이션이 쥐고, 아니면 사용자 입력으로 움직임
    pub fn begin_frame(&mut self, time_step: f32) {
        if self.preview.is_some() {
            return;
        }
        if let Some(frame) = self.animation.begin_frame() {
            self.scene.set_camera(frame.pose);
            if frame.fresh {
                self.scene.request_refresh();
            }
            return;
        }

        if let Some(pose) = self.controller.update(self.scene.camera(), time_step) {
            self.scene.set_camera(pose);
        }
    }

    pub fn render(&mut self, time: f32) -> u32 {
        self.previewed_this_frame = self.preview.is_some();
        if self.previewed_this_frame {
            self.render_preview_frame();
            return self.render_loop.accumulated_passes();
        }
        self.render_loop.render(&mut self.scene, &mut self.backend, time)
    }

    // 프레임을 보여준 뒤 정리. 저장 실패는 UI에 보여주려고 last_error에 두고,
    // 멈춤만 돌려줌
    pub fn end_frame(&mut self, frame_time: Duration) -> Result<(), StallError> {
        if std::mem::take(&mut self.previewed_this_frame) {
            return Ok(());
        }

        // 애니메이션은 화면 전체를 다 그린 패스만 셈
        if self.render_loop.pass_completed() {
            let directory = &self.render_output_dir;
            let backend = &self.backend;
            let accumulated = self.render_loop.accumulated_passes();

            match self
                .animation
                .end_frame(|frame| backend.capture(accumulated, &frame_path(directory, frame)))
            {
                Ok(Some(frame)) => info!("Rendered animation frame {}", frame),
                Ok(None) => {}
                Err(capture_error) => {
                    error!("{}", capture_error);
                    self.last_error = Some(capture_error.to_string());
                }
            }
        }

        self.render_loop.check_liveness(frame_time)
    }

    pub fn start_animation(&mut self) {
        let started = if self.preview.is_some() {
            Err(AnimationError::AlreadyPlaying)
        } else {
            self.animation.render()
        };

        match started {
            Ok(frames) => {
                info!("Rendering {} frames into {}", frames, self.render_output_dir.display());
                self.last_error = None;
            }
            Err(animation_error) => {
                warn!("{}", animation_error);
                self.last_error = Some(animation_error.to_string());
            }
        }
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    // 애니메이션 경로를 anim/에 한 패스짜리 프레임으로 저장하기 시작함.
    // 한 루프에 한 프레임씩 render에서 진행됨
    pub fn start_preview(&mut self) -> Result<u32, AnimationError> {
        if self.camera_locked() {
            return Err(AnimationError::AlreadyPlaying);
        }

        let plan = self.animation.plan()?;
        info!("Previewing {} frames into {}", plan.total_frames, self.preview_dir.display());
        self.preview = Some(Preview { plan, next_frame: 0 });
        self.last_error = None;
        Ok(plan.total_frames)
    }

    pub fn cancel_preview(&mut self) {
        if let Some(preview) = self.preview.take() {
            info!("Preview cancelled after {} frames", preview.next_frame);
            self.scene.request_refresh();
        }
    }

    fn render_preview_frame(&mut self) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        let plan = preview.plan;
        let frame = preview.next_frame;

        let pose = plan.pose_at(frame);
        self.render_loop
            .render_still(&mut self.scene, &mut self.backend, &pose, plan.frame_passes, frame as f32);
        if let Err(capture_error) = self.backend.capture(1, &frame_path(&self.preview_dir, frame)) {
            error!("Preview stopped at frame {}: {}", frame, capture_error);
            self.last_error = Some(capture_error.to_string());
            self.preview = None;
            return;
        }

        info!("Rendered preview frame {}/{}", frame + 1, plan.total_frames);
        preview.next_frame += 1;
        if preview.next_frame >= plan.total_frames {
            info!("Preview finished: {} frames", plan.total_frames);
            self.preview = None;
        }
    }

    pub fn load_skybox(&mut self, name: &str) -> Result<(), ResourceError> {
        let path = self.skybox_dir.join(name);
        match self.backend.load_skybox(&path) {
            Ok(()) => {
                self.scene.request_refresh();
                Ok(())
            }
            Err(resource_error) => {
                warn!("{}", resource_error);
                Err(resource_error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Keyframe;
    use crate::camera::CameraPose;
    use crate::render_loop::mock::RecordingBackend;
    use crate::render_loop::PassMode;
    use crate::scene::{Material, Object, Preset};
    use nalgebra::Point3;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FAST: Duration = Duration::from_millis(16);

    fn session() -> Session<RecordingBackend> {
        let scene = Scene::from_preset(Preset::Basic, &mut StdRng::seed_from_u64(1));
        Session::new(scene, RecordingBackend::new(1, 1), &Config::default())
    }

    fn tick(session: &mut Session<RecordingBackend>) {
        session.begin_frame(0.016);
        session.render(0.0);
        session.end_frame(FAST).unwrap();
    }

    fn arm_short_animation(session: &mut Session<RecordingBackend>, frame_passes: u32) {
        session.animation.settings.frame_passes = frame_passes;
        session.animation.settings.frame_rate = 1;
        session
            .animation
            .set_keyframe(Keyframe::Start, CameraPose::new(Point3::new(0.0, 1.0, 2.0), 0.0, 0.0))
            .unwrap();
        session
            .animation
            .set_keyframe(Keyframe::End, CameraPose::new(Point3::new(3.0, 1.0, 2.0), 0.0, 0.0))
            .unwrap();
    }

    #[test]
    fn backend_renders_at_scaled_resolution() {
        let session = session();
        assert_eq!(session.backend.size, (640, 360));
        assert_eq!(session.viewport(), (1280, 720));
    }

    #[test]
    fn escape_toggles_mouse_and_clears_selection() {
        let mut session = session();
        session.scene.select(Some(0)).unwrap();

        assert!(session.key(VirtualKeyCode::Escape, true));
        assert!(session.mouse_absorbed());
        assert_eq!(session.scene.selected(), None);

        session.key(VirtualKeyCode::Escape, true);
        assert!(!session.mouse_absorbed());
    }

    #[test]
    fn shift_escape_requests_quit() {
        let mut session = session();
        session.key(VirtualKeyCode::LShift, true);
        session.key(VirtualKeyCode::Escape, true);
        assert!(session.quit_requested());
        assert!(!session.mouse_absorbed());
    }

    #[test]
    fn click_selects_or_places_depending_on_e() {
        let mut session = session();
        let (width, height) = session.viewport();
        // 기본 카메라 정면 조금 아래에 구가 있음
        let (x, y) = (width as f32 / 2.0, height as f32 * 0.75);

        assert_eq!(session.click(x, y), Some(0));
        assert_eq!(session.scene.selected(), Some(0));

        session.key(VirtualKeyCode::E, true);
        let placed = session.click(width as f32 / 2.0, height as f32 * 0.95);
        assert_eq!(placed, Some(1));
        assert_eq!(session.scene.objects().len(), 2);
    }

    #[test]
    fn clicks_are_ignored_while_mouse_is_absorbed() {
        let mut session = session();
        session.toggle_mouse();
        assert_eq!(session.click(640.0, 540.0), None);
    }

    #[test]
    fn movement_refreshes_and_keeps_one_pass() {
        let mut session = session();
        tick(&mut session);
        tick(&mut session);
        assert_eq!(session.render_loop.accumulated_passes(), 2);

        session.toggle_mouse();
        session.key(VirtualKeyCode::W, true);
        tick(&mut session);
        assert_eq!(session.render_loop.accumulated_passes(), 1);
        assert!(session.scene.camera().position.z < 2.0);
    }

    #[test]
    fn edit_then_one_tick_leaves_one_pass() {
        let mut session = session();
        for _ in 0..4 {
            tick(&mut session);
        }
        session.scene.edit_object(0, |object| object.material = Material::default()).unwrap();
        tick(&mut session);
        assert_eq!(session.render_loop.accumulated_passes(), 1);
    }

    #[test]
    fn animation_captures_one_file_per_frame() {
        let mut session = session();
        arm_short_animation(&mut session, 2);
        session.start_animation();
        assert!(session.last_error.is_none());

        // 시작 요청은 프레임 밖에서 들어오니 첫 tick부터 재생. 3프레임 x 2패스
        for _ in 0..6 {
            tick(&mut session);
        }

        let captures = session.backend.captures.borrow().clone();
        let frames: Vec<_> = captures.iter().map(|(_, path)| path.clone()).collect();
        assert_eq!(
            frames,
            vec![
                PathBuf::from("render_output/0.png"),
                PathBuf::from("render_output/1.png"),
                PathBuf::from("render_output/2.png"),
            ]
        );
        assert!(captures.iter().all(|(passes, _)| *passes == 2));
        assert!(!session.animation.is_active());
        assert_eq!(session.scene.camera().position, Point3::new(2.0, 1.0, 2.0));
    }

    #[test]
    fn animation_waits_for_split_passes_to_finish() {
        let mut session = session();
        session.backend.submits_per_pass = 2;
        arm_short_animation(&mut session, 1);
        session.start_animation();

        tick(&mut session);
        assert!(session.backend.captured_paths().is_empty());

        for _ in 0..5 {
            tick(&mut session);
        }
        let captures = session.backend.captures.borrow().clone();
        assert_eq!(
            captures,
            vec![
                (1, PathBuf::from("render_output/0.png")),
                (1, PathBuf::from("render_output/1.png")),
                (1, PathBuf::from("render_output/2.png")),
            ]
        );
        assert!(!session.animation.is_active());
    }

    #[test]
    fn playback_owns_the_camera() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        let plan = session.animation.plan().unwrap();

        session.toggle_mouse();
        session.key(VirtualKeyCode::W, true);
        session.start_animation();

        for frame in 0..plan.total_frames {
            session.mouse_motion((500.0, 0.0));
            tick(&mut session);
            assert_eq!(session.scene.camera(), &plan.pose_at(frame));
        }
        assert!(!session.animation.is_active());

        // 재생 중에 움직인 마우스는 끝난 뒤에도 반영되지 않음
        tick(&mut session);
        assert_eq!(session.scene.camera().yaw, 0.0);
        assert!(session.scene.camera().position.z < 2.0);
    }

    #[test]
    fn escape_cancels_a_running_animation() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        session.start_animation();
        tick(&mut session);
        tick(&mut session);

        session.key(VirtualKeyCode::Escape, true);
        assert!(!session.animation.is_active());
        assert!(!session.mouse_absorbed());

        tick(&mut session);
        assert_eq!(
            session.backend.captured_paths(),
            vec![PathBuf::from("render_output/0.png"), PathBuf::from("render_output/1.png")]
        );
    }

    #[test]
    fn failed_capture_is_reported_and_stops_animation() {
        let mut session = session();
        session.backend.fail_captures = true;
        arm_short_animation(&mut session, 1);
        session.start_animation();
        tick(&mut session);
        tick(&mut session);

        assert!(!session.animation.is_active());
        assert!(session.last_error.as_deref().unwrap().contains("read-only"));
    }

    #[test]
    fn invalid_animation_settings_are_reported() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        session.animation.settings.camera_speed = 0.0;
        session.start_animation();
        assert!(!session.animation.is_active());
        assert!(session.last_error.is_some());
    }

    #[test]
    fn preview_writes_one_frame_per_tick() {
        let mut session = session();
        arm_short_animation(&mut session, 4);
        assert_eq!(session.start_preview(), Ok(3));

        tick(&mut session);
        assert_eq!(session.backend.captured_paths(), vec![PathBuf::from("anim/0.png")]);
        assert_eq!(session.preview().map(|preview| preview.next_frame), Some(1));

        tick(&mut session);
        tick(&mut session);
        let captures = session.backend.captures.borrow().clone();
        assert_eq!(captures.len(), 3);
        assert_eq!(captures[2], (1, PathBuf::from("anim/2.png")));
        assert!(session.preview().is_none());

        let stills: Vec<_> = session
            .backend
            .passes
            .iter()
            .map(|pass| pass.pass)
            .filter(|pass| pass.mode == PassMode::Accumulate)
            .collect();
        assert_eq!(stills.len(), 3);
        assert!(stills.iter().all(|pass| pass.discard && pass.samples == 4));
        assert!(session.scene.is_refresh_required());
    }

    #[test]
    fn preview_frames_are_not_stalls() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        session.start_preview().unwrap();

        let slow = Duration::from_secs(5);
        for _ in 0..3 {
            session.begin_frame(0.016);
            session.render(0.0);
            assert!(session.end_frame(slow).is_ok());
        }
        assert!(session.preview().is_none());

        session.render(0.0);
        assert!(session.end_frame(slow).is_ok());
        session.render(0.0);
        assert!(session.end_frame(slow).is_err());
    }

    #[test]
    fn escape_cancels_a_running_preview() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        session.start_preview().unwrap();
        tick(&mut session);

        assert!(session.key(VirtualKeyCode::Escape, true));
        assert!(session.preview().is_none());
        assert!(!session.mouse_absorbed());

        tick(&mut session);
        assert_eq!(session.backend.captured_paths(), vec![PathBuf::from("anim/0.png")]);
    }

    #[test]
    fn preview_and_playback_exclude_each_other() {
        let mut session = session();
        arm_short_animation(&mut session, 1);
        session.start_preview().unwrap();

        session.start_animation();
        assert!(!session.animation.is_active());
        assert!(session.last_error.is_some());

        session.cancel_preview();
        session.start_animation();
        assert_eq!(session.start_preview(), Err(AnimationError::AlreadyPlaying));
    }

    #[test]
    fn preview_without_keyframes_fails() {
        let mut session = session();
        assert_eq!(
            session.start_preview(),
            Err(AnimationError::MissingKeyframe(Keyframe::Start))
        );
        assert!(session.preview().is_none());
    }

    #[test]
    fn skybox_loading_refreshes_only_on_success() {
        let mut session = session();
        tick(&mut session);

        assert!(session.load_skybox("clouds.png").is_err());
        assert!(!session.scene.is_refresh_required());

        session.load_skybox("clouds.hdr").unwrap();
        assert_eq!(session.backend.skyboxes, vec![PathBuf::from("skyboxes/clouds.hdr")]);
        assert!(session.scene.is_refresh_required());
    }

    #[test]
    fn selection_reaches_the_backend() {
        let mut session = session();
        session.scene.add_object(Object::sphere(Point3::new(5.0, 0.5, 0.0), 0.5, Material::default()));
        session.scene.select(Some(1)).unwrap();
        tick(&mut session);
        let composite = session.backend.passes.last().unwrap();
        assert_eq!(composite.selected, 1);
        assert_eq!(composite.object_count, 2);
    }

    #[test]
    fn repeated_stalls_end_the_session() {
        let mut session = session();
        session.render(0.0);
        assert!(session.end_frame(Duration::from_secs(2)).is_ok());
        assert!(session.end_frame(Duration::from_secs(2)).is_err());
    }
}
