use eframe::egui::{self, CollapsingHeader, Context, DragValue, Sense, Slider, TextEdit, TextureId, Ui};
use log::{info, warn};
use nalgebra::{Point3, Vector3};

use crate::animation::Keyframe;
use crate::render_loop::RenderBackend;
use crate::scene::{Material, PointLight, Shape};
use crate::session::Session;

#[derive(Debug, Default)]
pub struct UiState {
    pub skybox_name: String,
    skybox_status: Option<Result<String, String>>,
}

impl UiState {
    pub fn new(skybox_name: Option<&str>) -> Self {
        Self {
            skybox_name: skybox_name.unwrap_or_default().to_owned(),
            ..Default::default()
        }
    }
}

// 렌더 결과를 화면에 깔고, 그 위에 설정 창을 띄움
pub fn draw<B: RenderBackend>(ctx: &Context, session: &mut Session<B>, state: &mut UiState, viewport_texture: TextureId) {
    viewport(ctx, session, viewport_texture);

    if session.camera_locked() {
        progress_window(ctx, session);
        return;
    }
    // 마우스를 잡고 있을 땐 창을 다 숨김
    if session.mouse_absorbed() {
        return;
    }

    selected_object_window(ctx, session);
    lights_window(ctx, session);
    render_settings_window(ctx, session);
    skybox_window(ctx, session, state);
    camera_window(ctx, session);
    if session.animation_panel_visible {
        animation_window(ctx, session);
    }
}

fn viewport<B: RenderBackend>(ctx: &Context, session: &mut Session<B>, texture: TextureId) {
    egui::CentralPanel::default().frame(egui::Frame::none()).show(ctx, |ui| {
        let size = ui.available_size();
        let response = ui.add(egui::Image::new(texture, size).sense(Sense::click()));

        if !response.clicked() {
            return;
        }
        let Some(pointer) = response.interact_pointer_pos() else {
            return;
        };

        // egui 좌표 -> 창 픽셀 좌표
        let local = pointer - response.rect.min;
        let (width, height) = session.viewport();
        let x = local.x / response.rect.width() * width as f32;
        let y = local.y / response.rect.height() * height as f32;
        session.click(x, y);
    });
}

fn edit_vector(ui: &mut Ui, label: &str, value: &mut Vector3<f32>, speed: f64) -> bool {
    ui.horizontal(|ui| {
        ui.label(label);
        let mut changed = false;
        for component in value.iter_mut() {
            changed |= ui.add(DragValue::new(component).speed(speed)).changed();
        }
        changed
    })
    .inner
}

fn edit_color(ui: &mut Ui, label: &str, value: &mut Vector3<f32>) -> bool {
    let mut rgb = [value.x, value.y, value.z];
    let changed = ui
        .horizontal(|ui| {
            ui.label(label);
            ui.color_edit_button_rgb(&mut rgb).changed()
        })
        .inner;

    if changed {
        *value = Vector3::from(rgb);
    }
    changed
}

fn edit_material(ui: &mut Ui, material: &mut Material) -> bool {
    let mut changed = false;
    changed |= edit_color(ui, "Albedo", &mut material.albedo);
    changed |= edit_color(ui, "Specular", &mut material.specular);
    changed |= edit_color(ui, "Emission", &mut material.emission);
    changed |= ui
        .add(Slider::new(&mut material.emission_strength, 0.0..=20.0).text("Emission strength"))
        .changed();
    changed |= ui.add(Slider::new(&mut material.roughness, 0.0..=1.0).text("Roughness")).changed();
    changed |= ui
        .add(Slider::new(&mut material.specular_highlight, 0.0..=1.0).text("Highlight"))
        .changed();
    changed |= ui
        .add(Slider::new(&mut material.specular_exponent, 0.0..=256.0).text("Exponent"))
        .changed();
    changed
}

fn selected_object_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    let Some(index) = session.scene.selected() else {
        return;
    };
    let Some(mut object) = session.scene.selected_object().copied() else {
        return;
    };

    let mut changed = false;
    let mut toggle = false;
    egui::Window::new("Selected object").show(ctx, |ui| {
        ui.label(format!("#{} {:?}", index, object.kind()));
        changed |= edit_vector(ui, "Position", &mut object.position.coords, 0.01);

        match &mut object.shape {
            Shape::Sphere { radius } => {
                changed |= ui
                    .horizontal(|ui| {
                        ui.label("Radius");
                        ui.add(DragValue::new(radius).speed(0.01).clamp_range(0.01..=100.0)).changed()
                    })
                    .inner;
            }
            Shape::Box { half_extents } => {
                changed |= edit_vector(ui, "Half size", half_extents, 0.01);
            }
        }
        toggle = ui.button("Sphere <-> Box").clicked();

        ui.separator();
        changed |= edit_material(ui, &mut object.material);
    });

    if changed {
        let _ = session.scene.edit_object(index, |target| *target = object);
    }
    if toggle {
        if let Ok(kind) = session.scene.toggle_shape(index) {
            info!("Object #{} is now a {:?}", index, kind);
        }
    }
}

fn lights_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    egui::Window::new("Lights").default_open(false).show(ctx, |ui| {
        for index in 0..session.scene.lights().len() {
            let mut light = session.scene.lights()[index];
            let mut changed = false;

            CollapsingHeader::new(format!("Light #{index}")).show(ui, |ui| {
                changed |= edit_vector(ui, "Position", &mut light.position.coords, 0.05);
                changed |= edit_color(ui, "Color", &mut light.color);
                changed |= ui.add(Slider::new(&mut light.radius, 0.0..=5.0).text("Radius")).changed();
                changed |= ui.add(Slider::new(&mut light.power, 0.0..=10.0).text("Power")).changed();
                changed |= ui.add(Slider::new(&mut light.reach, 0.0..=500.0).text("Reach")).changed();
            });

            if changed {
                let _ = session.scene.edit_light(index, |target| *target = light);
            }
        }

        if ui.button("Add light").clicked() {
            let position = session.scene.camera().position;
            let index = session.scene.add_light(PointLight::new(
                position,
                0.5,
                Vector3::new(1.0, 1.0, 1.0),
                1.0,
                100.0,
            ));
            info!("Added light #{} at the camera", index);
        }
    });
}

fn render_settings_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    egui::Window::new("Render settings").default_open(false).show(ctx, |ui| {
        let mut quality = *session.scene.quality();
        let mut changed = false;

        changed |= ui
            .add(Slider::new(&mut quality.light_bounces, 1..=16).text("Light bounces"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut quality.frame_passes, 1..=64).text("Samples per pass"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut quality.shadow_resolution, 1..=128).text("Shadow resolution"))
            .changed();
        changed |= ui.add(Slider::new(&mut quality.blur, 0.0..=0.05).text("Blur")).changed();
        changed |= ui
            .add(Slider::new(&mut quality.bloom_radius, 0.0..=0.2).text("Bloom radius"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut quality.bloom_intensity, 0.0..=2.0).text("Bloom intensity"))
            .changed();

        if changed {
            session.scene.edit_quality(|target| *target = quality);
        }

        ui.separator();
        let mut plane = *session.scene.plane();
        let mut plane_changed = ui.checkbox(&mut plane.visible, "Ground plane").changed();
        if plane.visible {
            plane_changed |= edit_material(ui, &mut plane.material);
        }
        if plane_changed {
            session.scene.edit_plane(|target| *target = plane);
        }

        ui.separator();
        ui.label(format!("Accumulated passes: {}", session.render_loop.accumulated_passes()));
    });
}

fn skybox_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>, state: &mut UiState) {
    egui::Window::new("Skybox").default_open(false).show(ctx, |ui| {
        ui.horizontal(|ui| {
            ui.add(TextEdit::singleline(&mut state.skybox_name).hint_text("sky.hdr"));
            if ui.button("Load").clicked() {
                let name = state.skybox_name.trim().to_owned();
                state.skybox_status = Some(match session.load_skybox(&name) {
                    Ok(()) => Ok(format!("Loaded {name}")),
                    Err(resource_error) => Err(resource_error.to_string()),
                });
            }
        });

        match &state.skybox_status {
            Some(Ok(message)) => {
                ui.label(message.as_str());
            }
            Some(Err(message)) => {
                ui.colored_label(egui::Color32::LIGHT_RED, message.as_str());
            }
            None => {}
        }

        let mut quality = *session.scene.quality();
        let mut changed = false;
        changed |= ui
            .add(Slider::new(&mut quality.skybox_strength, 0.0..=10.0).text("Strength"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut quality.skybox_gamma, 0.1..=4.0).text("Gamma"))
            .changed();
        changed |= ui
            .add(Slider::new(&mut quality.skybox_ceiling, 0.0..=100.0).text("Ceiling"))
            .changed();
        if changed {
            session.scene.edit_quality(|target| *target = quality);
        }
    });
}

fn camera_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    egui::Window::new("Camera").default_open(false).show(ctx, |ui| {
        let mut pose = *session.scene.camera();
        let mut changed = edit_vector(ui, "Position", &mut pose.position.coords, 0.05);
        changed |= ui.add(DragValue::new(&mut pose.yaw).speed(0.01).prefix("yaw ")).changed();
        changed |= ui
            .add(
                DragValue::new(&mut pose.pitch)
                    .speed(0.01)
                    .clamp_range(-1.5707..=1.5707)
                    .prefix("pitch "),
            )
            .changed();

        if changed {
            session.scene.set_camera(pose);
        }
        if ui.button("Reset").clicked() {
            session.scene.set_camera(Default::default());
        }
        ui.label("ESC: look around, E + click: place, R: animation");
    });
}

fn animation_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    egui::Window::new("Animation").show(ctx, |ui| {
        let settings = &mut session.animation.settings;
        ui.add(Slider::new(&mut settings.frame_passes, 1..=256).text("Passes per frame"));
        ui.add(Slider::new(&mut settings.frame_rate, 1..=120).text("Frame rate"));
        ui.add(
            DragValue::new(&mut settings.camera_speed)
                .speed(0.05)
                .prefix("speed "),
        );

        ui.separator();
        let pose = *session.scene.camera();
        for (keyframe, button) in [(Keyframe::Start, "Set start"), (Keyframe::End, "Set end")] {
            ui.horizontal(|ui| {
                if ui.button(button).clicked() {
                    if let Err(animation_error) = session.animation.set_keyframe(keyframe, pose) {
                        warn!("{}", animation_error);
                    }
                }

                let captured = match keyframe {
                    Keyframe::Start => session.animation.start_keyframe(),
                    Keyframe::End => session.animation.end_keyframe(),
                };
                match captured {
                    Some(pose) => ui.label(describe(&pose.position)),
                    None => ui.label("not set"),
                };
            });
        }

        match session.animation.plan() {
            Ok(plan) => {
                ui.label(format!("{} frames", plan.total_frames));
            }
            Err(animation_error) => {
                ui.label(animation_error.to_string());
            }
        }

        ui.horizontal(|ui| {
            if ui.button("Render").clicked() {
                session.start_animation();
            }
            if ui.button("Preview").clicked() {
                if let Err(animation_error) = session.start_preview() {
                    warn!("{}", animation_error);
                    session.last_error = Some(animation_error.to_string());
                }
            }
        });

        if let Some(message) = &session.last_error {
            ui.colored_label(egui::Color32::LIGHT_RED, message.as_str());
        }
    });
}

fn progress_window<B: RenderBackend>(ctx: &Context, session: &mut Session<B>) {
    let preview = session.preview().map(|preview| (preview.next_frame, preview.plan.total_frames));
    let title = if preview.is_some() { "Preview" } else { "Rendering" };

    egui::Window::new(title).show(ctx, |ui| {
        if let Some((frame, total)) = preview.or_else(|| session.animation.progress()) {
            ui.add(egui::ProgressBar::new(frame as f32 / total.max(1) as f32).text(format!("{frame} / {total}")));
        }
        if ui.button("Cancel (ESC)").clicked() {
            session.animation.cancel();
            session.cancel_preview();
        }
    });
}

fn describe(position: &Point3<f32>) -> String {
    format!("({:.2}, {:.2}, {:.2})", position.x, position.y, position.z)
}
