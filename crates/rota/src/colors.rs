use palette::{FromColor, Hsv, Srgb};

const BASE_COLORS: [(u8, u8, u8); 16] = [
    (0xe5, 0x39, 0x35),
    (0x1e, 0x88, 0xe5),
    (0x43, 0xa0, 0x47),
    (0xfb, 0x8c, 0x00),
    (0x8e, 0x24, 0xaa),
    (0x00, 0xac, 0xc1),
    (0xfd, 0xd8, 0x35),
    (0x6d, 0x4c, 0x41),
    (0xd8, 0x1b, 0x60),
    (0x39, 0x49, 0xab),
    (0x7c, 0xb3, 0x42),
    (0xf4, 0x51, 0x1e),
    (0x5e, 0x35, 0xb1),
    (0x00, 0x89, 0x7b),
    (0xc0, 0xca, 0x33),
    (0x54, 0x6e, 0x7a),
];

/// Hands out pairwise distinct slice colors. Slice colors double as hit-test
/// keys, so two slices must never share one.
#[derive(Debug, Clone, Default)]
pub struct SlicePalette {
    issued: Vec<Srgb<u8>>,
}

impl SlicePalette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_color(&mut self) -> Srgb<u8> {
        let index = self.issued.len();
        let mut color = match BASE_COLORS.get(index) {
            Some(&(r, g, b)) => Srgb::new(r, g, b),
            None => Self::generated(index),
        };

        // nudge the blue channel until the color is unused
        while self.issued.contains(&color) {
            color.blue = color.blue.wrapping_add(1);
        }

        self.issued.push(color);
        color
    }

    pub fn take(&mut self, count: usize) -> Vec<Srgb<u8>> {
        (0..count).map(|_| self.next_color()).collect()
    }

    fn generated(index: usize) -> Srgb<u8> {
        // golden-angle hue steps keep neighbours far apart
        let hue = (index as f32 * 137.507_77) % 360.0;
        let value = 0.65 + 0.3 * ((index / 7) % 2) as f32;
        let hsv = Hsv::new(hue, 0.7, value);
        Srgb::from_color(hsv).into_format()
    }
}

/// First pair of indices whose colors collide, if any.
pub fn find_duplicate(colors: &[Srgb<u8>]) -> Option<(usize, usize)> {
    colors.iter().enumerate().find_map(|(i, color)| {
        colors[i + 1..]
            .iter()
            .position(|other| other == color)
            .map(|offset| (i, i + 1 + offset))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_colors_are_unique() {
        let mut palette = SlicePalette::new();
        let colors = palette.take(300);
        assert_eq!(find_duplicate(&colors), None);
    }

    #[test]
    fn test_find_duplicate_reports_first_pair() {
        let red = Srgb::new(255, 0, 0);
        let blue = Srgb::new(0, 0, 255);
        assert_eq!(find_duplicate(&[red, blue, red, blue]), Some((0, 2)));
        assert_eq!(find_duplicate(&[red, blue]), None);
    }
}
