use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// CSS edge descriptors for the four cell borders.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub left: String,
    pub right: String,
    pub top: String,
    pub bottom: String,
}

impl Default for Border {
    fn default() -> Self {
        Border {
            left: "1px solid #aaa".to_string(),
            right: "1px solid #aaa".to_string(),
            top: "1px solid #aaa".to_string(),
            bottom: "1px solid #aaa".to_string(),
        }
    }
}

/// Font attributes rendered into the cell's CSS class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Font {
    /// Size in CSS pixels.
    pub size: f64,
    pub family: String,
    /// Extra style keywords, emitted as `font-style`.
    pub modifiers: String,
}

impl Default for Font {
    fn default() -> Self {
        Font {
            size: 14.0,
            family: "calibri".to_string(),
            modifiers: "monospace".to_string(),
        }
    }
}

/// Visual attributes of one cell. Immutable by convention: ranges replace
/// leaf fields through [`crate::range::FieldPath`] writes, and cloning
/// produces an independent copy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub border: Border,
    pub font: Font,
    pub background: String,
    pub color: String,
}

impl Default for Style {
    fn default() -> Self {
        BASELINE.clone()
    }
}

lazy_static! {
    /// The shared baseline every cell starts from.
    static ref BASELINE: Style = Style {
        border: Border::default(),
        font: Font::default(),
        background: "#ffffff".to_string(),
        color: "#000".to_string(),
    };
}

impl Style {
    pub fn baseline() -> &'static Style {
        &BASELINE
    }

    /// Structural identity used by the serializer to intern identical
    /// configurations into one CSS class.
    pub fn key(&self) -> StyleKey {
        StyleKey {
            border_left: self.border.left.clone(),
            border_right: self.border.right.clone(),
            border_top: self.border.top.clone(),
            border_bottom: self.border.bottom.clone(),
            background: self.background.clone(),
            color: self.color.clone(),
            font_size: format_px(self.font.size),
            font_family: self.font.family.clone(),
            font_modifiers: self.font.modifiers.clone(),
        }
    }
}

/// The tuple of all style fields, with the font size in its rendered form so
/// the key is hashable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StyleKey {
    pub border_left: String,
    pub border_right: String,
    pub border_top: String,
    pub border_bottom: String,
    pub background: String,
    pub color: String,
    pub font_size: String,
    pub font_family: String,
    pub font_modifiers: String,
}

/// Format a pixel size without a trailing `.0` for whole numbers.
pub(crate) fn format_px(size: f64) -> String {
    if size.fract() == 0.0 {
        format!("{}", size as i64)
    } else {
        format!("{}", size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_defaults() {
        let style = Style::default();
        assert_eq!(style.border.left, "1px solid #aaa");
        assert_eq!(style.font.size, 14.0);
        assert_eq!(style.font.family, "calibri");
        assert_eq!(style.background, "#ffffff");
        assert_eq!(style.color, "#000");
    }

    #[test]
    fn clone_is_independent() {
        let original = Style::default();
        let mut copy = original.clone();
        copy.background = "#ff0000".to_string();
        copy.border.top = "2px dashed #000".to_string();
        assert_eq!(original.background, "#ffffff");
        assert_eq!(original.border.top, "1px solid #aaa");
    }

    #[test]
    fn identical_styles_share_a_key() {
        let a = Style::default();
        let mut b = Style::default();
        assert_eq!(a.key(), b.key());
        b.color = "#333".to_string();
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn whole_sizes_drop_the_fraction() {
        assert_eq!(format_px(14.0), "14");
        assert_eq!(format_px(10.5), "10.5");
    }
}
