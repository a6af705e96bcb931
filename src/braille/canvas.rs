use surface_tiles::Color;

/// Pixels at or above this alpha always light their dot; fainter ones are
/// dithered so translucent fills read lighter than outlines.
const SOLID_ALPHA: u8 = 128;

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots) and carries the
/// average color of the dots lit in it.
/// Unicode Braille patterns: U+2800 to U+28FF
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<Vec<u8>>, // Bit patterns per char
    /// Per-cell color sums: r, g, b, lit dot count.
    sums: Vec<Vec<[u32; 4]>>,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![vec![0u8; width]; height],
            sums: vec![vec![[0; 4]; width]; height],
        }
    }

    /// Sample every dot from a framebuffer lookup such as
    /// `DrawContext::read_pixel`. Transparent pixels stay dark.
    pub fn from_pixels(width: usize, height: usize, sample: impl Fn(i32, i32) -> Option<Color>) -> Self {
        let mut canvas = Self::new(width, height);
        for y in 0..height * 4 {
            for x in 0..width * 2 {
                let Some(color) = sample(x as i32, y as i32) else {
                    continue;
                };
                let lit = color.a >= SOLID_ALPHA || (color.a > 0 && (x + y) % 2 == 0);
                if lit {
                    canvas.set_pixel(x, y, color);
                }
            }
        }
        canvas
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        self.pixels[cy][cx] |= bit;
        let sum = &mut self.sums[cy][cx];
        sum[0] += color.r as u32;
        sum[1] += color.g as u32;
        sum[2] += color.b as u32;
        sum[3] += 1;
    }

    /// Average color of the lit dots in a cell.
    pub fn cell_color(&self, cx: usize, cy: usize) -> Option<Color> {
        let [r, g, b, n] = *self.sums.get(cy)?.get(cx)?;
        (n > 0).then(|| Color::rgb((r / n) as u8, (g / n) as u8, (b / n) as u8))
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        (0..self.height).map(|i| self.row_to_string(i)).collect::<Vec<_>>().join("\n")
    }

    /// Get a specific row as a string (for line-by-line rendering)
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        self.pixels[row]
            .iter()
            .map(|&b| char::from_u32(0x2800 + b as u32).unwrap_or(' '))
            .collect()
    }

    /// Glyph and color of every cell in a row.
    pub fn cells(&self, row: usize) -> Vec<(char, Option<Color>)> {
        self.row_to_string(row)
            .chars()
            .enumerate()
            .map(|(col, ch)| (ch, self.cell_color(col, row)))
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, Color::WHITE);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y, Color::WHITE);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_diagonal() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0, Color::WHITE);
        canvas.set_pixel(1, 1, Color::WHITE);
        canvas.set_pixel(2, 2, Color::WHITE);
        canvas.set_pixel(3, 3, Color::WHITE);
        // First char: (0,0) and (1,1) = 0x01 | 0x10 = 0x11
        // Second char: (0,2) and (1,3) = 0x04 | 0x80 = 0x84
        assert_eq!(canvas.to_string(), "⠑⢄");
    }

    #[test]
    fn test_cell_color_averages_lit_dots() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0, Color::RED);
        canvas.set_pixel(1, 0, Color::rgb(0, 0, 255));
        assert_eq!(canvas.cell_color(0, 0), Some(Color::rgb(127, 0, 127)));
        assert_eq!(canvas.cell_color(1, 0), None);
        assert_eq!(canvas.cell_color(5, 5), None);
    }

    #[test]
    fn test_from_pixels_skips_transparent_and_dithers_faint() {
        let solid = BrailleCanvas::from_pixels(1, 1, |_, _| Some(Color::GREEN));
        assert_eq!(solid.to_string(), "⣿");

        let empty = BrailleCanvas::from_pixels(1, 1, |_, _| Some(Color::TRANSPARENT));
        assert_eq!(empty.to_string(), "\u{2800}");

        let faint = BrailleCanvas::from_pixels(1, 1, |_, _| Some(Color::rgba(0, 255, 0, 40)));
        // Dots where (x + y) is even: (0,0) (1,1) (0,2) (1,3).
        assert_eq!(faint.to_string(), "⢕");
    }
}
