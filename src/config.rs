use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub node_width: f32,
    pub node_height: f32,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    pub sibling_spacing: f32,
    pub spouse_spacing: f32,
    /// Distance from y = 0 to the top edge of generation 0.
    pub top_margin: f32,
    /// Probe step of the safe-offset search used while centering.
    pub safe_offset_step: f32,
    /// Resolution rounds per generation before leftover overlap is accepted.
    pub max_collision_passes: usize,
    /// Cap on generation raises; `None` derives it from the person count.
    pub max_relaxation_steps: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 50.0,
            node_height: 50.0,
            horizontal_spacing: 30.0,
            vertical_spacing: 100.0,
            sibling_spacing: 40.0,
            spouse_spacing: 60.0,
            top_margin: 20.0,
            safe_offset_step: 1.0,
            max_collision_passes: 8,
            max_relaxation_steps: None,
        }
    }
}

impl LayoutConfig {
    pub fn row_height(&self) -> f32 {
        self.node_height + self.vertical_spacing
    }

    /// Merges a partial update. Non-finite or non-positive numbers are
    /// ignored; `top_margin` also accepts zero.
    pub fn apply(&mut self, options: &LayoutOptions) {
        set_positive(&mut self.node_width, options.node_width, "nodeWidth");
        set_positive(&mut self.node_height, options.node_height, "nodeHeight");
        set_positive(
            &mut self.horizontal_spacing,
            options.horizontal_spacing,
            "horizontalSpacing",
        );
        set_positive(
            &mut self.vertical_spacing,
            options.vertical_spacing,
            "verticalSpacing",
        );
        set_positive(&mut self.sibling_spacing, options.sibling_spacing, "siblingSpacing");
        set_positive(&mut self.spouse_spacing, options.spouse_spacing, "spouseSpacing");
        set_positive(&mut self.safe_offset_step, options.safe_offset_step, "safeOffsetStep");
        if let Some(v) = options.top_margin {
            if v.is_finite() && v >= 0.0 {
                self.top_margin = v;
            } else {
                tracing::warn!(option = "topMargin", value = v, "ignoring invalid layout option");
            }
        }
        if let Some(v) = options.max_collision_passes {
            if v > 0 {
                self.max_collision_passes = v;
            } else {
                tracing::warn!(option = "maxCollisionPasses", "ignoring zero iteration cap");
            }
        }
        if let Some(v) = options.max_relaxation_steps {
            if v > 0 {
                self.max_relaxation_steps = Some(v);
            } else {
                tracing::warn!(option = "maxRelaxationSteps", "ignoring zero iteration cap");
            }
        }
    }
}

fn set_positive(target: &mut f32, value: Option<f32>, name: &str) {
    let Some(value) = value else {
        return;
    };
    if value.is_finite() && value > 0.0 {
        *target = value;
    } else {
        tracing::warn!(option = name, value, "ignoring invalid layout option");
    }
}

/// Partial layout options, as accepted by `PedigreeLayouter::set_options`
/// and the `layout` section of a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutOptions {
    pub node_width: Option<f32>,
    pub node_height: Option<f32>,
    pub horizontal_spacing: Option<f32>,
    pub vertical_spacing: Option<f32>,
    pub sibling_spacing: Option<f32>,
    pub spouse_spacing: Option<f32>,
    pub top_margin: Option<f32>,
    pub safe_offset_step: Option<f32>,
    pub max_collision_passes: Option<usize>,
    pub max_relaxation_steps: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::classic();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThemeVariables {
    font_family: Option<String>,
    font_size: Option<f32>,
    symbol_fill: Option<String>,
    symbol_stroke: Option<String>,
    line_color: Option<String>,
    text_color: Option<String>,
    background: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderConfigFile {
    width: Option<f32>,
    height: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    theme_variables: Option<ThemeVariables>,
    layout: Option<LayoutOptions>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parses a JSON5 config document on top of the defaults.
pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = json5::from_str(contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        match theme_name {
            "mono" | "monochrome" => config.theme = Theme::mono(),
            "classic" | "default" => config.theme = Theme::classic(),
            other => tracing::warn!(theme = other, "unknown theme, keeping default"),
        }
    }

    if let Some(vars) = parsed.theme_variables {
        if let Some(v) = vars.font_family {
            config.theme.font_family = v;
        }
        if let Some(v) = vars.font_size {
            config.theme.font_size = v;
        }
        if let Some(v) = vars.symbol_fill {
            config.theme.symbol_fill = v;
        }
        if let Some(v) = vars.symbol_stroke {
            config.theme.symbol_stroke = v;
        }
        if let Some(v) = vars.line_color {
            config.theme.line_color = v;
        }
        if let Some(v) = vars.text_color {
            config.theme.text_color = v;
        }
        if let Some(v) = vars.background {
            config.theme.background = v;
        }
    }

    if let Some(options) = parsed.layout {
        config.layout.apply(&options);
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.width {
            config.render.width = v;
        }
        if let Some(v) = render.height {
            config.render.height = v;
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}
