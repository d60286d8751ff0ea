use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::logger;
use crate::types::{ControlKind, PaletteIndex, Point, ScreenRect};

/// Calibration data and timings. Every section has a default, so a partial
/// `settings.json` only overrides what it names, down to single fields of a
/// tool section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub app: AppSettings,
    pub canvas: CanvasSettings,
    #[serde(deserialize_with = "rectangle_tool")]
    pub rectangle_tool: ToolSettings,
    #[serde(deserialize_with = "text_tool")]
    pub text_tool: ToolSettings,
    pub palette: PaletteSettings,
    pub text: TextSettings,
    pub timing: Timing,
    pub margins: Margins,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app: AppSettings::default(),
            canvas: CanvasSettings::default(),
            rectangle_tool: ToolSettings::rectangle(),
            text_tool: ToolSettings::text(),
            palette: PaletteSettings::default(),
            text: TextSettings::default(),
            timing: Timing::default(),
            margins: Margins::default(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub exe: String,
    pub title_pattern: String,
    pub title_substring: String,
    pub launch_settle_ms: u64,
    pub locate_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            exe: "mspaint.exe".into(),
            title_pattern: ".*Paint.*".into(),
            title_substring: "Paint".into(),
            launch_settle_ms: 3500,
            locate_timeout_ms: 12_000,
            poll_interval_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasSettings {
    pub name_pattern: String,
    pub kind: ControlKind,
    pub query_timeout_ms: u64,
    /// Calibrated absolute canvas for a known display configuration.
    pub fixed: Option<ScreenRect>,
    /// Insets from the window rectangle: left, top, right, bottom.
    pub window_inset: [i32; 4],
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            name_pattern: ".*Canvas.*".into(),
            kind: ControlKind::Pane,
            query_timeout_ms: 1000,
            fixed: Some(ScreenRect::new(355, 325, 1555, 880)),
            window_inset: [120, 160, 40, 80],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSettings {
    pub name_pattern: String,
    pub kind: ControlKind,
    pub query_timeout_ms: u64,
    pub fixed: Option<Point>,
    /// Fractions of the window size, tried in order.
    pub candidates: Vec<[f64; 2]>,
    /// Key chords sent when no position could be clicked.
    pub accelerator: Vec<String>,
}

impl ToolSettings {
    pub fn rectangle() -> Self {
        Self {
            name_pattern: ".*Rectangle.*".into(),
            kind: ControlKind::Button,
            query_timeout_ms: 1000,
            fixed: Some(Point::new(795, 125)),
            candidates: vec![[0.24, 0.10], [0.28, 0.12], [0.32, 0.14]],
            accelerator: Vec::new(),
        }
    }

    pub fn text() -> Self {
        Self {
            name_pattern: "^Text$|.*Text.*".into(),
            kind: ControlKind::Button,
            query_timeout_ms: 1000,
            fixed: Some(Point::new(515, 130)),
            candidates: Vec::new(),
            accelerator: vec!["alt+h".into(), "t".into()],
        }
    }
}

/// Fields named in a tool section; the rest come from that tool's defaults.
/// `"fixed": null` drops the calibrated point.
#[derive(Default, Deserialize)]
#[serde(default)]
struct ToolOverride {
    name_pattern: Option<String>,
    kind: Option<ControlKind>,
    query_timeout_ms: Option<u64>,
    #[serde(deserialize_with = "present")]
    fixed: Option<Option<Point>>,
    candidates: Option<Vec<[f64; 2]>>,
    accelerator: Option<Vec<String>>,
}

impl ToolOverride {
    fn apply(self, mut base: ToolSettings) -> ToolSettings {
        if let Some(v) = self.name_pattern { base.name_pattern = v; }
        if let Some(v) = self.kind { base.kind = v; }
        if let Some(v) = self.query_timeout_ms { base.query_timeout_ms = v; }
        if let Some(v) = self.fixed { base.fixed = v; }
        if let Some(v) = self.candidates { base.candidates = v; }
        if let Some(v) = self.accelerator { base.accelerator = v; }
        base
    }
}

fn present<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

fn rectangle_tool<'de, D: Deserializer<'de>>(d: D) -> Result<ToolSettings, D::Error> {
    ToolOverride::deserialize(d).map(|o| o.apply(ToolSettings::rectangle()))
}

fn text_tool<'de, D: Deserializer<'de>>(d: D) -> Result<ToolSettings, D::Error> {
    ToolOverride::deserialize(d).map(|o| o.apply(ToolSettings::text()))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaletteSettings {
    /// Offset of cell (0,0) from the window's top-left.
    pub base_offset: Point,
    pub cell_width: i32,
    pub cell_height: i32,
    pub fallback: Point,
    pub colors: BTreeMap<String, PaletteIndex>,
}

impl Default for PaletteSettings {
    fn default() -> Self {
        let colors = [
            ("black", 0, 0),
            ("gray", 1, 0),
            ("brown", 2, 0),
            ("red", 3, 0),
            ("orange", 4, 0),
            ("yellow", 5, 0),
            ("green", 8, 0),
            ("blue", 11, 0),
            ("purple", 12, 0),
            ("white", 0, 1),
            ("pink", 3, 1),
        ]
        .into_iter()
        .map(|(name, col, row)| (name.to_string(), PaletteIndex::new(col, row)))
        .collect();

        Self {
            base_offset: Point::new(1195, 125),
            cell_width: 28,
            cell_height: 28,
            fallback: Point::new(800, 520),
            colors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Where free text lands, relative to the canvas top-left.
    pub default_inset: Point,
    pub rect_margin: i32,
    pub min_box_width: i32,
    pub min_box_height: i32,
    /// Close button position measured from the window's top-right corner.
    pub close_inset: Point,
    pub restore_clipboard: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            default_inset: Point::new(150, 120),
            rect_margin: 10,
            min_box_width: 40,
            min_box_height: 20,
            close_inset: Point::new(20, 15),
            restore_clipboard: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    pub step_ms: u64,
    pub focus_settle_ms: u64,
    pub tool_settle_ms: u64,
    pub text_settle_ms: u64,
    pub paste_settle_ms: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            step_ms: 50,
            focus_settle_ms: 200,
            tool_settle_ms: 200,
            text_settle_ms: 500,
            paste_settle_ms: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Margins {
    pub drag: i32,
    pub text: i32,
    pub commit: i32,
    pub tool: i32,
}

impl Default for Margins {
    fn default() -> Self {
        Self { drag: 2, text: 4, commit: 8, tool: 2 }
    }
}

impl Settings {
    /// Read `path`, falling back to defaults when it is missing or invalid.
    pub fn load(path: &Path) -> Self {
        let Ok(json) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                logger::warn_p("settings", &format!("{} ignored, using defaults: {}", path.display(), e));
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_calibration() {
        let s = Settings::load(Path::new("/nonexistent/settings.json"));
        assert_eq!(s.app.exe, "mspaint.exe");
        assert_eq!(s.app.locate_timeout_ms, 12_000);
        assert_eq!(s.palette.colors.len(), 11);
        assert_eq!(s.palette.colors["blue"], PaletteIndex::new(11, 0));
        assert_eq!(s.text_tool.accelerator, vec!["alt+h".to_string(), "t".to_string()]);
        assert_eq!(s.rectangle_tool.candidates.len(), 3);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let s: Settings = serde_json::from_str(
            r#"{"app":{"locate_timeout_ms":500},"margins":{"drag":3},"verbose":true}"#,
        )
        .unwrap();
        assert_eq!(s.app.locate_timeout_ms, 500);
        assert_eq!(s.app.poll_interval_ms, 300);
        assert_eq!(s.margins.drag, 3);
        assert_eq!(s.margins.text, 4);
        assert!(s.verbose);
    }

    #[test]
    fn save_then_load_keeps_custom_canvas() {
        let dir = std::env::temp_dir().join(format!("paintbot-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");

        let mut s = Settings::default();
        s.canvas.fixed = Some(ScreenRect::new(10, 20, 300, 400));
        s.save(&path).unwrap();

        let loaded = Settings::load(&path);
        assert_eq!(loaded.canvas.fixed, Some(ScreenRect::new(10, 20, 300, 400)));
        assert_eq!(loaded.text_tool.fixed, Some(Point::new(515, 130)));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn partial_tool_section_keeps_that_tools_defaults() {
        let s: Settings = serde_json::from_str(
            r#"{"text_tool":{"query_timeout_ms":250},"rectangle_tool":{"fixed":null}}"#,
        )
        .unwrap();
        assert_eq!(s.text_tool.query_timeout_ms, 250);
        assert_eq!(s.text_tool.fixed, Some(Point::new(515, 130)));
        assert_eq!(s.text_tool.accelerator, vec!["alt+h".to_string(), "t".to_string()]);
        assert_eq!(s.rectangle_tool.fixed, None);
        assert_eq!(s.rectangle_tool.candidates.len(), 3);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = std::env::temp_dir().join(format!("paintbot-bad-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.json");
        std::fs::write(&path, r#"{"app":{"locate_timeout_ms":"soon"}}"#).unwrap();

        let s = Settings::load(&path);
        assert_eq!(s.app.locate_timeout_ms, 12_000);
        std::fs::remove_dir_all(&dir).ok();
    }
}
