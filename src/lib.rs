use cfg_if::cfg_if;
use log::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::event::{DeviceEvent, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

// wasm32 환경에서만 wasm_bindgen 활용
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

use crate::app::Application;
use crate::config::Config;
use crate::lumen::Lumen;
use crate::scene::Scene;
use crate::session::Session;
use crate::ui::UiState;

pub mod animation;
mod app;
pub mod camera;
pub mod config;
pub mod geometry;
pub mod lumen;
pub mod picking;
pub mod render_loop;
pub mod scene;
pub mod session;
mod texture;
mod ui;
pub mod util;

// wasm 연결시 아래 함수를 시작점으로 삼도록 함.
#[cfg_attr(target_arch = "wasm32", wasm_bindgen(start))]
pub fn run() {
    // 로거 초기화
    cfg_if! {
        // 만약 현재 환경이 wasm32라면
        if #[cfg(target_arch = "wasm32")] {
            // panic 발생시 웹 브라우저의 console.err에 로그 띄우기
            std::panic::set_hook(Box::new(console_error_panic_hook::hook));
            console_log::init_with_level(log::Level::Debug).expect("로거 초기화 실패");
        } else {
            // RUST_LOG가 없으면 info까지 보여줌
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        }
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(config_error) => {
            error!("{}", config_error);
            return;
        }
    };

    let scene = Scene::from_preset(config.preset, &mut rand::thread_rng());
    let backend = Lumen::new(1, 1).with_frame_budget(Some(config.frame_budget));
    let mut session = Session::new(scene, backend, &config);
    if let Some(name) = &config.skybox {
        if session.load_skybox(name).is_err() {
            warn!("Starting with the default sky");
        }
    }
    let ui_state = UiState::new(config.skybox.as_deref());

    let event_loop = EventLoop::new();
    let (width, height) = config.window_size;
    let window = WindowBuilder::new()
        .with_title("Lumen: Ray Tracer")
        .with_inner_size(LogicalSize::new(width, height))
        .build(&event_loop)
        .expect("창을 만들 수 없음");

    cfg_if! {
        if #[cfg(target_arch = "wasm32")] {
            attach_canvas(&window);
            wasm_bindgen_futures::spawn_local(start(event_loop, window, session, ui_state));
        } else {
            pollster::block_on(start(event_loop, window, session, ui_state));
        }
    }
}

// 웹에서는 winit이 만든 canvas를 id가 lumen인 요소 밑에 붙여야 보임
#[cfg(target_arch = "wasm32")]
fn attach_canvas(window: &Window) {
    use winit::platform::web::WindowExtWebSys;

    let attached = web_sys::window()
        .and_then(|browser| browser.document())
        .and_then(|document| {
            let parent = document.get_element_by_id("lumen")?;
            let canvas = web_sys::Element::from(window.canvas());
            parent.append_child(&canvas).ok()
        });
    if attached.is_none() {
        warn!("No #lumen element to attach the canvas to");
    }
}

async fn start(event_loop: EventLoop<()>, window: Window, session: Session<Lumen>, ui_state: UiState) {
    let mut app = Application::new(window, &event_loop, session, ui_state).await;
    info!("Ready. ESC: look around, LShift + ESC: quit");

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent { ref event, window_id } if window_id == app.window.id() => {
            let handled = app.input(event);
            // LShift + ESC
            if app.quit_requested() {
                *control_flow = ControlFlow::ExitWithCode(0);
                return;
            }
            if handled {
                return;
            }

            match event {
                // 만약 앱을 운영체제에서 닫으려고 하면 나가기
                WindowEvent::CloseRequested => *control_flow = ControlFlow::ExitWithCode(0),
                WindowEvent::Resized(new_size) => app.resize(*new_size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),
                _ => {}
            }
        }
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => app.mouse_motion(delta),
        Event::RedrawRequested(window_id) if window_id == app.window.id() => {
            if let Err(frame_error) = app.frame() {
                error!("{}", frame_error);
                *control_flow = ControlFlow::ExitWithCode(1);
            }
        }
        Event::MainEventsCleared => app.window.request_redraw(),
        _ => {}
    });
}
