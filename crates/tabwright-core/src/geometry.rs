//! Positioned text fragments.
//!
//! A [`TextPiece`] is the atomic unit every stage works on: a word straight
//! from the text source, a line after assembly, or a cell after structuring.
//! Coordinates follow the source convention: x grows to the right and y grows
//! downward, so a smaller `y` is higher on the page.

/// One positioned run of text with its bounding box and font metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct TextPiece {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub end_x: f32,
    pub end_y: f32,
    /// Glyph width. For assembled lines this is the sum of the word widths,
    /// so it excludes the gaps between words.
    pub width: f32,
    pub height: f32,
    pub font_size: f32,
    pub x_scale: f32,
    pub y_scale: f32,
    pub width_of_space: f32,
    /// Lines start out sparse; dense paragraph lines clear the flag.
    pub sparse_line: bool,
    /// Set on a line whose first character is a raised footnote marker.
    pub superscript_start: bool,
}

impl TextPiece {
    /// Build a word-level fragment. Scales default to the font size and the
    /// space width to a quarter of it.
    pub fn new(text: impl Into<String>, x: f32, y: f32, width: f32, height: f32, font_size: f32) -> Self {
        TextPiece {
            text: text.into(),
            x,
            y,
            end_x: x + width,
            end_y: y + height,
            width,
            height,
            font_size,
            x_scale: font_size,
            y_scale: font_size,
            width_of_space: font_size * 0.25,
            sparse_line: true,
            superscript_start: false,
        }
    }

    pub fn with_scales(mut self, x_scale: f32, y_scale: f32) -> Self {
        self.x_scale = x_scale;
        self.y_scale = y_scale;
        self
    }

    pub fn with_space_width(mut self, width_of_space: f32) -> Self {
        self.width_of_space = width_of_space;
        self
    }

    /// Horizontal font scale used to group "same font" text.
    pub fn scale(&self) -> f32 {
        self.x_scale.max(self.font_size)
    }

    /// Vertical tolerance used when deciding whether two words share a line.
    pub fn line_height(&self) -> f32 {
        self.y_scale.max(self.font_size)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Text with every whitespace character removed, used for prefix matching.
    pub fn stripped_text(&self) -> String {
        self.text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Absorb `other`: texts are joined with a space, boxes are unioned.
    pub fn merge(&mut self, other: &TextPiece) {
        match (self.text.is_empty(), other.text.is_empty()) {
            (true, _) => self.text = other.text.clone(),
            (false, false) => {
                self.text.push(' ');
                self.text.push_str(&other.text);
            }
            (false, true) => {}
        }
        self.x = self.x.min(other.x);
        self.y = self.y.min(other.y);
        self.end_x = self.end_x.max(other.end_x);
        self.end_y = self.end_y.max(other.end_y);
        self.width = self.end_x - self.x;
        self.height = self.end_y - self.y;
        self.font_size = self.font_size.max(other.font_size);
        self.x_scale = self.x_scale.max(other.x_scale);
        self.y_scale = self.y_scale.max(other.y_scale);
    }

    pub fn merged(&self, other: &TextPiece) -> TextPiece {
        let mut out = self.clone();
        out.merge(other);
        out
    }

    /// Half-open overlap of the horizontal extents.
    pub fn overlaps_horizontally(&self, other: &TextPiece) -> bool {
        self.x < other.end_x && other.x < self.end_x
    }

    /// Half-open overlap of the vertical extents.
    pub fn overlaps_vertically(&self, other: &TextPiece) -> bool {
        self.y < other.end_y && other.y < self.end_y
    }

    /// Whether the fragment reaches into the column band `[left, right)`.
    pub fn overlaps_band(&self, left: f32, right: f32) -> bool {
        self.x < right && self.end_x > left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_derives_extents() {
        let p = TextPiece::new("Acc", 200.0, 720.0, 20.0, 10.0, 10.0);
        assert_eq!(p.end_x, 220.0);
        assert_eq!(p.end_y, 730.0);
        assert_eq!(p.scale(), 10.0);
        assert!(p.sparse_line);
    }

    #[test]
    fn test_merge_unions_boxes() {
        let mut upper = TextPiece::new("Accuracy", 200.0, 700.0, 40.0, 10.0, 10.0);
        let lower = TextPiece::new("(%)", 205.0, 712.0, 15.0, 10.0, 10.0);
        upper.merge(&lower);
        assert_eq!(upper.text, "Accuracy (%)");
        assert_eq!(upper.x, 200.0);
        assert_eq!(upper.end_x, 240.0);
        assert_eq!(upper.end_y, 722.0);
    }

    #[test]
    fn test_overlap_is_half_open() {
        let a = TextPiece::new("a", 0.0, 0.0, 10.0, 10.0, 10.0);
        let touching = TextPiece::new("b", 10.0, 10.0, 10.0, 10.0, 10.0);
        let inside = TextPiece::new("c", 5.0, 5.0, 10.0, 10.0, 10.0);
        assert!(!a.overlaps_horizontally(&touching));
        assert!(!a.overlaps_vertically(&touching));
        assert!(a.overlaps_horizontally(&inside));
        assert!(a.overlaps_vertically(&inside));
        assert!(a.overlaps_band(9.0, 30.0));
        assert!(!a.overlaps_band(10.0, 30.0));
    }

    #[test]
    fn test_stripped_text() {
        let p = TextPiece::new("Table 1. Accuracy", 0.0, 0.0, 1.0, 1.0, 1.0);
        assert_eq!(p.stripped_text(), "Table1.Accuracy");
    }
}
