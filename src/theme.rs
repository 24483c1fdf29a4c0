use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub symbol_fill: String,
    pub symbol_stroke: String,
    pub symbol_stroke_width: f32,
    pub line_color: String,
    pub line_width: f32,
    pub text_color: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 12.0,
            symbol_fill: "#FFFFFF".to_string(),
            symbol_stroke: "#333333".to_string(),
            symbol_stroke_width: 1.6,
            line_color: "#333333".to_string(),
            line_width: 1.4,
            text_color: "#1C2430".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn mono() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 11.0,
            symbol_fill: "#F4F4F4".to_string(),
            symbol_stroke: "#000000".to_string(),
            symbol_stroke_width: 1.2,
            line_color: "#000000".to_string(),
            line_width: 1.0,
            text_color: "#000000".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
