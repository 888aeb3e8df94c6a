use std::iter;

use cfg_if::cfg_if;
use eframe::egui::{ClippedPrimitive, TextureId};
use log::warn;
use thiserror::Error;
use wgpu::{
    Backends, Color, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode, Device, DeviceDescriptor,
    Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor, Limits, LoadOp, Operations, PowerPreference,
    PresentMode, Queue, RenderPassColorAttachment, RenderPassDescriptor, RequestAdapterOptions, Surface,
    SurfaceConfiguration, SurfaceError, TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyboardInput, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{CursorGrabMode, Window};

use crate::lumen::Lumen;
use crate::render_loop::{RenderBackend, StallError};
use crate::session::Session;
use crate::texture::Image;
use crate::ui::{self, UiState};

cfg_if! {
    if #[cfg(target_arch = "wasm32")] {
        use web_time::Instant;
    } else {
        use std::time::Instant;
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error(transparent)]
    Stall(#[from] StallError),
    #[error("GPU ran out of memory")]
    OutOfMemory,
}

pub struct Application {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: eframe::egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,
    pub session: Session<Lumen>,
    ui_state: UiState,
    // 레이 트레이싱 결과를 egui에 넘기는 텍스쳐
    viewport_image: Image,
    viewport_texture: TextureId,
    started: Instant,
    last_frame: Instant,
}

impl Application {
    pub async fn new(window: Window, event_loop: &EventLoop<()>, mut session: Session<Lumen>, ui_state: UiState) -> Self {
        let size = window.inner_size();
        // HiDPI에선 설정한 창 크기와 실제 픽셀 크기가 다름
        session.resize(size.width, size.height);

        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // 전달하는 &window가 생성하는 surface보다 오래 유지되어야 함.
        let surface = unsafe { instance.create_surface(&window) }.expect("surface를 만들 수 없음");

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .expect("사용 가능한 GPU 어뎁터가 없음");

        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: if cfg!(target_arch = "wasm32") {
                        // 브라우저가 아직 webgpu를 제대로 지원 안하니 webgl2 기준 채택
                        Limits::downlevel_webgl2_defaults()
                    } else {
                        Limits::default()
                    },
                    label: Some("Lumen GPU"),
                },
                None,
            )
            .await
            .expect("GPU 장치를 가져올 수 없음");

        let capabilities = surface.get_capabilities(&adapter);

        // sRGB 말고 다른거 쓰면 의도한 것보다 밝기나 명도에서 차이가 날 수 있음.
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let egui_state = egui_winit::State::new(event_loop);
        let egui_context = eframe::egui::Context::default();

        let mut egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            None, // 깊이 안씀
            1,    // 멀티 샘플링 1번만 할꺼임
        );
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: egui_context.pixels_per_point(),
        };

        let (render_width, render_height) = session.backend.size();
        let viewport_image = Image::new(&device, render_width, render_height, "Lumen Output");
        let viewport_texture = egui_renderer.register_native_texture(&device, &viewport_image.view, FilterMode::Linear);

        let now = Instant::now();
        Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            session,
            ui_state,
            viewport_image,
            viewport_texture,
            started: now,
            last_frame: now,
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.egui_context.pixels_per_point();
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];

        self.session.resize(new_size.width, new_size.height);
    }

    // true: 앱에서 입력 처리를 했으니 따로 관리할 필요 없음
    // false: 아래 event loop에서 처리 해야 함.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        let egui_response = self.egui_state.on_event(&self.egui_context, event);
        if egui_response.consumed && !self.session.mouse_absorbed() {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                let was_absorbed = self.session.mouse_absorbed();
                let handled = self.session.key(*key, *state == ElementState::Pressed);
                if was_absorbed != self.session.mouse_absorbed() {
                    self.sync_cursor();
                }
                handled
            }
            WindowEvent::Focused(false) => {
                self.session.controller.release_all();
                false
            }
            _ => false,
        }
    }

    pub fn mouse_motion(&mut self, delta: (f64, f64)) {
        self.session.mouse_motion(delta);
    }

    pub fn quit_requested(&self) -> bool {
        self.session.quit_requested()
    }

    fn sync_cursor(&self) {
        if self.session.mouse_absorbed() {
            // 플랫폼마다 지원하는 모드가 달라서 둘 다 시도
            let grabbed = self
                .window
                .set_cursor_grab(CursorGrabMode::Confined)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Locked));
            if let Err(grab_error) = grabbed {
                warn!("Cursor grab failed: {}", grab_error);
            }
            self.window.set_cursor_visible(false);
        } else {
            let _ = self.window.set_cursor_grab(CursorGrabMode::None);
            self.window.set_cursor_visible(true);
        }
    }

    // 한 프레임: 카메라 결정 -> 두 번의 패스(미리보기 중이면 한 장 저장) -> 화면 출력 -> 애니메이션 정리
    pub fn frame(&mut self) -> Result<(), FrameError> {
        let frame_start = Instant::now();
        let time_step = (frame_start - self.last_frame).as_secs_f32();
        self.last_frame = frame_start;

        self.session.begin_frame(time_step);
        self.session.render(self.started.elapsed().as_secs_f32());
        self.upload_viewport();

        match self.present() {
            Ok(()) => {}
            // surface를 다시 설정하면 다음 프레임부터 괜찮아짐
            Err(SurfaceError::Lost | SurfaceError::Outdated) => self.resize(self.size),
            Err(SurfaceError::OutOfMemory) => return Err(FrameError::OutOfMemory),
            Err(SurfaceError::Timeout) => warn!("Surface timeout"),
        }

        let frame_time = frame_start.elapsed();
        self.session.end_frame(frame_time)?;
        Ok(())
    }

    fn upload_viewport(&mut self) {
        let (width, height) = self.session.backend.size();
        if self.viewport_image.resize(&self.device, width, height) {
            self.egui_renderer.update_egui_texture_from_wgpu_texture(
                &self.device,
                &self.viewport_image.view,
                FilterMode::Linear,
                self.viewport_texture,
            );
        }
        self.viewport_image.load_image(&self.queue, self.session.backend.rgba());
    }

    fn present(&mut self) -> Result<(), SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output.texture.create_view(&TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Encoder"),
        });

        // render_pass가 encoder를 빌려오기 때문에 아래처럼 따로 빼지 않으면 앞으로 계속 쓸 수 없음
        {
            let primitives = self.update_egui(&mut encoder);
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer.render(&mut render_pass, &primitives, &self.egui_screen)
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn update_egui(&mut self, encoder: &mut CommandEncoder) -> Vec<ClippedPrimitive> {
        let egui_input = self.egui_state.take_egui_input(&self.window);
        let session = &mut self.session;
        let ui_state = &mut self.ui_state;
        let viewport_texture = self.viewport_texture;
        let egui_output = self.egui_context.run(egui_input, |ctx| {
            ui::draw(ctx, session, ui_state, viewport_texture);
        });

        self.egui_state
            .handle_platform_output(&self.window, &self.egui_context, egui_output.platform_output);
        let primitives = self.egui_context.tessellate(egui_output.shapes);
        egui_output.textures_delta.set.iter().for_each(|(id, delta)| {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, delta);
        });
        egui_output
            .textures_delta
            .free
            .iter()
            .for_each(|id| self.egui_renderer.free_texture(id));

        self.egui_renderer
            .update_buffers(&self.device, &self.queue, encoder, &primitives, &self.egui_screen);

        primitives
    }
}
