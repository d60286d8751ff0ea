use std::collections::BTreeMap;

use crate::logger;
use crate::settings::PaletteSettings;
use crate::types::{PaletteIndex, Point, ScreenRect};

/// Maps color names onto cells of the toolbar color grid.
pub struct ColorPaletteMapper {
    base_offset: Point,
    cell_width: i32,
    cell_height: i32,
    fallback: Point,
    colors: BTreeMap<String, PaletteIndex>,
}

impl ColorPaletteMapper {
    pub fn new(settings: &PaletteSettings) -> Self {
        Self {
            base_offset: settings.base_offset,
            cell_width: settings.cell_width,
            cell_height: settings.cell_height,
            fallback: settings.fallback,
            colors: settings
                .colors
                .iter()
                .map(|(name, idx)| (name.to_lowercase(), *idx))
                .collect(),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<PaletteIndex> {
        self.colors.get(&name.trim().to_lowercase()).copied()
    }

    /// Screen position of `name` inside `window`. Unknown names map to the
    /// fixed fallback point; the flag tells which one the caller got.
    pub fn resolve(&self, window: &ScreenRect, name: &str) -> (Point, bool) {
        match self.index_of(name) {
            Some(idx) => (self.cell_position(window, idx), true),
            None => {
                logger::warn_p(
                    "palette",
                    &format!("unknown color '{}', using fallback {}", name, self.fallback),
                );
                (self.fallback, false)
            }
        }
    }

    fn cell_position(&self, window: &ScreenRect, idx: PaletteIndex) -> Point {
        window
            .top_left()
            .offset(self.base_offset.x, self.base_offset.y)
            .offset(
                (idx.column as i32).saturating_mul(self.cell_width),
                (idx.row as i32).saturating_mul(self.cell_height),
            )
    }

    pub fn fallback(&self) -> Point {
        self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColorName;

    fn mapper() -> ColorPaletteMapper {
        ColorPaletteMapper::new(&PaletteSettings::default())
    }

    #[test]
    fn blue_in_maximized_window() {
        let window = ScreenRect::new(0, 0, 1920, 1040);
        let (p, matched) = mapper().resolve(&window, "blue");
        assert!(matched);
        assert_eq!(p, Point::new(1195 + 11 * 28, 125));
    }

    #[test]
    fn lookup_ignores_case_and_follows_window_origin() {
        let window = ScreenRect::new(100, 50, 1500, 900);
        let m = mapper();
        assert_eq!(m.resolve(&window, "WHITE"), (Point::new(100 + 1195, 50 + 125 + 28), true));
        assert_eq!(m.resolve(&window, " Red "), m.resolve(&window, "red"));
    }

    #[test]
    fn unknown_color_uses_fallback() {
        let window = ScreenRect::new(0, 0, 1920, 1040);
        assert_eq!(mapper().resolve(&window, "teal"), (Point::new(800, 520), false));
    }

    #[test]
    fn every_pipeline_color_is_mapped() {
        let m = mapper();
        for color in ColorName::ALL {
            assert!(m.index_of(color.as_str()).is_some(), "{}", color);
        }
        assert_eq!(m.colors.len(), 11);
    }
}
