//! 菜单栏以及 "Time"、"Scene" 两个窗口
//!
//! UI 只修改 [`MenuState`] 中的副本，帧末再写回场景，修改在下一帧生效。

use glam::Vec3;
use umbra_render_graph::render_settings::{AoSettings, RenderSettings, ShaderMode};
use umbra_render_interface::gpu_data::BLUR_MAX_WIDTH;
use umbra_scene::{components::material::Material, lights::ShadowLight};

/// 菜单可以修改的所有状态
#[derive(Debug, Clone, PartialEq)]
pub struct MenuState {
    pub spheres_visible: bool,
    pub podium_visible: bool,

    pub shader_mode: ShaderMode,
    /// Settings -> Reset，下一次 `DrawScene` 之前重新编译 shader
    pub reload_shaders: bool,

    pub frame_time_ms: f32,
    pub fps: f32,

    pub light: ShadowLight,
    pub moment_bias: f32,
    pub depth_bias: f32,
    pub blur_width: i32,

    pub teapot: Material,
    pub podium_position: Vec3,

    pub ao: AoSettings,
}
impl MenuState {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            spheres_visible: false,
            podium_visible: true,
            shader_mode: settings.shader_mode,
            reload_shaders: false,
            frame_time_ms: 0.0,
            fps: 0.0,
            light: ShadowLight::default(),
            moment_bias: settings.moment_bias,
            depth_bias: settings.depth_bias,
            blur_width: settings.shadow_blur_width as i32,
            teapot: Material::default(),
            podium_position: Vec3::ZERO,
            ao: settings.ao,
        }
    }

    /// 写回渲染参数，越界的值被截断
    pub fn apply_to_settings(&self, settings: &mut RenderSettings) {
        settings.shader_mode = self.shader_mode;
        settings.moment_bias = self.moment_bias.max(0.0);
        settings.depth_bias = self.depth_bias.max(0.0);
        settings.shadow_blur_width = self.blur_width.clamp(0, BLUR_MAX_WIDTH as i32) as usize;
        settings.ao = self.ao;
        settings.clamp();
    }
}

pub fn build(ui: &imgui::Ui, state: &mut MenuState) {
    main_menu_bar(ui, state);

    ui.window("Time")
        .position([10.0, 30.0], imgui::Condition::FirstUseEver)
        .always_auto_resize(true)
        .build(|| {
            ui.text(format!("Frame Time {:.3} ms", state.frame_time_ms));
            ui.text(format!("fps {:.1}", state.fps));
        });

    ui.window("Scene")
        .position([10.0, 100.0], imgui::Condition::FirstUseEver)
        .size([360.0, 420.0], imgui::Condition::FirstUseEver)
        .build(|| {
            light_node(ui, state);
            object_node(ui, state);
            podium_node(ui, state);
            ao_node(ui, state);
        });
}

fn main_menu_bar(ui: &imgui::Ui, state: &mut MenuState) {
    let Some(_bar) = ui.begin_main_menu_bar() else {
        return;
    };

    if let Some(_menu) = ui.begin_menu("Objects") {
        if ui.menu_item_config("Draw spheres").selected(state.spheres_visible).build() {
            state.spheres_visible = !state.spheres_visible;
        }
        if ui.menu_item_config("Draw podium").selected(state.podium_visible).build() {
            state.podium_visible = !state.podium_visible;
        }
    }

    if let Some(_menu) = ui.begin_menu("Framebuffers") {
        for mode in ShaderMode::ALL {
            if ui.menu_item_config(mode.name()).selected(state.shader_mode == mode).build() {
                state.shader_mode = mode;
            }
        }
    }

    if let Some(_menu) = ui.begin_menu("Settings") {
        if ui.menu_item("Reset") {
            state.reload_shaders = true;
        }
    }
}

fn light_node(ui: &imgui::Ui, state: &mut MenuState) {
    let Some(_node) = ui.tree_node("Light") else {
        return;
    };

    let mut position = state.light.position.to_array();
    if imgui::Drag::new("Light Position").range(-25.0, 25.0).speed(1.0).build_array(ui, &mut position) {
        state.light.position = Vec3::from(position);
    }
    imgui::Drag::new("Moment Bias")
        .range(0.0, 0.05)
        .speed(0.000001)
        .display_format("%.7f")
        .build(ui, &mut state.moment_bias);
    imgui::Drag::new("Depth Bias")
        .range(0.0, 0.05)
        .speed(0.000001)
        .display_format("%.7f")
        .build(ui, &mut state.depth_bias);
    imgui::Drag::new("Light Far")
        .range(0.0, 10000.0)
        .speed(1.0)
        .display_format("%.3f")
        .build(ui, &mut state.light.far);
    imgui::Drag::new("Light Near")
        .range(0.0, 10000.0)
        .speed(0.1)
        .display_format("%.3f")
        .build(ui, &mut state.light.near);
    imgui::Drag::new("ShadowMin").range(-100.0, 100.0).speed(0.5).build(ui, &mut state.light.shadow_min);
    imgui::Drag::new("ShadowMax").range(-100.0, 100.0).speed(0.5).build(ui, &mut state.light.shadow_max);
    ui.slider("Blur Width", 0, BLUR_MAX_WIDTH as i32, &mut state.blur_width);
}

fn object_node(ui: &imgui::Ui, state: &mut MenuState) {
    let Some(_node) = ui.tree_node("Object") else {
        return;
    };

    ui.slider_config("Roughness", 0.001, 1.0)
        .display_format("%.5f")
        .build(&mut state.teapot.roughness);

    let mut diffuse = state.teapot.diffuse.to_array();
    if ui.color_edit3("Diffuse", &mut diffuse) {
        state.teapot.diffuse = Vec3::from(diffuse);
    }
    let mut specular = state.teapot.specular.to_array();
    if ui.color_edit3("Specular", &mut specular) {
        state.teapot.specular = Vec3::from(specular);
    }
}

fn podium_node(ui: &imgui::Ui, state: &mut MenuState) {
    let Some(_node) = ui.tree_node("Podium") else {
        return;
    };

    let mut position = state.podium_position.to_array();
    if imgui::Drag::new("Position").build_array(ui, &mut position) {
        state.podium_position = Vec3::from(position);
    }
}

fn ao_node(ui: &imgui::Ui, state: &mut MenuState) {
    let Some(_node) = ui.tree_node("Ambient Occlusion") else {
        return;
    };

    ui.checkbox("Enabled", &mut state.ao.enabled);
    ui.slider("R", *AoSettings::RADIUS_RANGE.start(), *AoSettings::RADIUS_RANGE.end(), &mut state.ao.radius);
    ui.slider("n", *AoSettings::SAMPLES_RANGE.start(), *AoSettings::SAMPLES_RANGE.end(), &mut state.ao.samples);
    ui.slider("s", *AoSettings::SCALE_RANGE.start(), *AoSettings::SCALE_RANGE.end(), &mut state.ao.scale);
    ui.slider("k", *AoSettings::CONTRAST_RANGE.start(), *AoSettings::CONTRAST_RANGE.end(), &mut state.ao.contrast);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_mirrors_render_settings() {
        let settings = RenderSettings::default();
        let state = MenuState::from_settings(&settings);
        assert_eq!(state.blur_width, 4);
        assert_eq!(state.shader_mode, ShaderMode::Default);
        assert!(!state.reload_shaders);

        // 不经过 UI 修改时写回不改变任何参数
        let mut copy = settings;
        state.apply_to_settings(&mut copy);
        assert_eq!(copy, settings);
    }

    #[test]
    fn blur_width_change_is_clamped() {
        let mut settings = RenderSettings::default();
        let mut state = MenuState::from_settings(&settings);

        state.blur_width = 8;
        state.apply_to_settings(&mut settings);
        assert_eq!(settings.shadow_blur_width, 8);

        state.blur_width = 80;
        state.apply_to_settings(&mut settings);
        assert_eq!(settings.shadow_blur_width, BLUR_MAX_WIDTH);

        state.blur_width = -3;
        state.apply_to_settings(&mut settings);
        assert_eq!(settings.shadow_blur_width, 0);
    }

    #[test]
    fn framebuffer_mode_and_ao_are_written_back() {
        let mut settings = RenderSettings::default();
        let mut state = MenuState::from_settings(&settings);
        state.shader_mode = ShaderMode::AoMap;
        state.ao.enabled = true;
        state.ao.samples = 40;
        state.moment_bias = -1.0;

        state.apply_to_settings(&mut settings);
        assert_eq!(settings.shader_mode, ShaderMode::AoMap);
        assert!(settings.ao.enabled);
        assert_eq!(settings.ao.samples, 20);
        assert_eq!(settings.moment_bias, 0.0);
    }
}
