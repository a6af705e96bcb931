//! Scan conversion into [`Texture`]s: Bresenham lines, even-odd polygon fill,
//! discs and image blits.

use glam::DVec2;

use super::{Color, Texture};

/// Draw a one pixel line using Bresenham's algorithm
pub fn draw_line(target: &mut Texture, x0: i32, y0: i32, x1: i32, y1: i32, color: Color, blend: bool) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        target.put(x, y, color, blend);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a line `width` pixels wide by stacking parallel Bresenham lines
/// along the segment normal.
pub fn draw_wide_line(target: &mut Texture, a: DVec2, b: DVec2, width: f64, color: Color, blend: bool) {
    let (x0, y0) = (a.x.floor() as i32, a.y.floor() as i32);
    let (x1, y1) = (b.x.floor() as i32, b.y.floor() as i32);

    if width <= 1.5 {
        draw_line(target, x0, y0, x1, y1, color, blend);
        return;
    }

    let dir = b - a;
    let normal = if dir.length_squared() > 0.0 {
        DVec2::new(-dir.y, dir.x).normalize()
    } else {
        DVec2::X
    };
    // Blending would double-count the overlap between neighbouring passes,
    // so the wide stroke is accumulated opaque and only then blended.
    let offsets = width.round() as i32;
    let half = (offsets - 1) as f64 / 2.0;
    let mut covered = std::collections::HashSet::new();
    for i in 0..offsets {
        let shift = normal * (i as f64 - half);
        let p = a + shift;
        let q = b + shift;
        collect_line(
            p.x.floor() as i32,
            p.y.floor() as i32,
            q.x.floor() as i32,
            q.y.floor() as i32,
            &mut covered,
        );
    }
    for (x, y) in covered {
        target.put(x, y, color, blend);
    }
}

/// Pixels Bresenham would visit, gathered instead of drawn.
fn collect_line(x0: i32, y0: i32, x1: i32, y1: i32, out: &mut std::collections::HashSet<(i32, i32)>) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        out.insert((x, y));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Connect consecutive vertices, optionally closing back to the first.
pub fn draw_polyline(target: &mut Texture, vertices: &[DVec2], closed: bool, width: f64, color: Color, blend: bool) {
    for pair in vertices.windows(2) {
        draw_wide_line(target, pair[0], pair[1], width, color, blend);
    }
    if closed && vertices.len() > 2 {
        if let (Some(&last), Some(&first)) = (vertices.last(), vertices.first()) {
            draw_wide_line(target, last, first, width, color, blend);
        }
    }
}

/// Fill a polygon with the even-odd rule, sampling at pixel centers.
pub fn fill_polygon(target: &mut Texture, vertices: &[DVec2], color: Color, blend: bool) {
    if vertices.len() < 3 {
        return;
    }

    let (min_y, max_y) = vertices
        .iter()
        .fold((f64::MAX, f64::MIN), |(lo, hi), v| (lo.min(v.y), hi.max(v.y)));
    let row_start = ((min_y - 0.5).ceil() as i32).max(0);
    let row_end = ((max_y - 0.5).floor() as i32).min(target.height() as i32 - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for row in row_start..=row_end {
        let yc = row as f64 + 0.5;
        crossings.clear();

        let mut prev = vertices[vertices.len() - 1];
        for &cur in vertices {
            // Half-open edge rule so shared vertices count once.
            if (prev.y <= yc && yc < cur.y) || (cur.y <= yc && yc < prev.y) {
                let t = (yc - prev.y) / (cur.y - prev.y);
                crossings.push(prev.x + t * (cur.x - prev.x));
            }
            prev = cur;
        }

        crossings.sort_by(|a, b| a.total_cmp(b));
        for span in crossings.chunks_exact(2) {
            let x_start = ((span[0] - 0.5).ceil() as i32).max(0);
            let x_end = ((span[1] - 0.5).ceil() as i32).min(target.width() as i32);
            for x in x_start..x_end {
                target.put(x, row, color, blend);
            }
        }
    }
}

/// Draw a filled disc (icon markers)
pub fn fill_circle(target: &mut Texture, cx: i32, cy: i32, radius: i32, color: Color) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                target.set_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Stretch `image` over the pixel box `min..max`, nearest-neighbour.
pub fn blit_image(target: &mut Texture, image: &Texture, min: DVec2, max: DVec2, opacity: f64, blend: bool) {
    let w = max.x - min.x;
    let h = max.y - min.y;
    if w <= 0.0 || h <= 0.0 || image.width() == 0 || image.height() == 0 {
        return;
    }

    let x_start = ((min.x - 0.5).ceil() as i32).max(0);
    let x_end = ((max.x - 0.5).ceil() as i32).min(target.width() as i32);
    let y_start = ((min.y - 0.5).ceil() as i32).max(0);
    let y_end = ((max.y - 0.5).ceil() as i32).min(target.height() as i32);

    for y in y_start..y_end {
        let v = (y as f64 + 0.5 - min.y) / h;
        let iy = ((v * image.height() as f64) as i32).clamp(0, image.height() as i32 - 1);
        for x in x_start..x_end {
            let u = (x as f64 + 0.5 - min.x) / w;
            let ix = ((u * image.width() as f64) as i32).clamp(0, image.width() as i32 - 1);
            if let Some(texel) = image.pixel(ix, iy) {
                if texel.a > 0 {
                    target.put(x, y, texel.with_opacity(opacity), blend);
                }
            }
        }
    }
}

/// Signed area of a vertex ring (shoelace); zero means nothing to fill.
pub fn polygon_area(vertices: &[DVec2]) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut prev = vertices[vertices.len() - 1];
    for &cur in vertices {
        sum += prev.x * cur.y - cur.x * prev.y;
        prev = cur;
    }
    sum / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(t: &Texture) -> usize {
        t.pixels().iter().filter(|c| c.a > 0).count()
    }

    #[test]
    fn test_horizontal_line() {
        let mut t = Texture::new(10, 1);
        draw_line(&mut t, 0, 0, 9, 0, Color::WHITE, false);
        assert_eq!(count(&t), 10);
    }

    #[test]
    fn test_vertical_line() {
        let mut t = Texture::new(1, 8);
        draw_line(&mut t, 0, 0, 0, 7, Color::WHITE, false);
        assert_eq!(count(&t), 8);
    }

    #[test]
    fn test_wide_line_covers_more_rows() {
        let mut t = Texture::new(20, 20);
        draw_wide_line(&mut t, DVec2::new(2.0, 10.0), DVec2::new(17.0, 10.0), 3.0, Color::WHITE, true);
        assert!(t.pixel(10, 9).is_some_and(|c| c.a > 0));
        assert!(t.pixel(10, 10).is_some_and(|c| c.a > 0));
        assert!(t.pixel(10, 11).is_some_and(|c| c.a > 0));
        assert_eq!(t.pixel(10, 13), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_fill_square_exact_coverage() {
        let mut t = Texture::new(10, 10);
        let square = [
            DVec2::new(2.0, 2.0),
            DVec2::new(6.0, 2.0),
            DVec2::new(6.0, 6.0),
            DVec2::new(2.0, 6.0),
        ];
        fill_polygon(&mut t, &square, Color::RED, false);
        assert_eq!(count(&t), 16);
        assert_eq!(t.pixel(2, 2), Some(Color::RED));
        assert_eq!(t.pixel(5, 5), Some(Color::RED));
        assert_eq!(t.pixel(6, 6), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_fill_concave_polygon_leaves_notch() {
        let mut t = Texture::new(10, 10);
        // A "U": the notch between x 3..7 above y 5 stays empty.
        let u = [
            DVec2::new(0.0, 0.0),
            DVec2::new(3.0, 0.0),
            DVec2::new(3.0, 5.0),
            DVec2::new(7.0, 5.0),
            DVec2::new(7.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        fill_polygon(&mut t, &u, Color::WHITE, false);
        assert_eq!(t.pixel(5, 2), Some(Color::TRANSPARENT));
        assert_eq!(t.pixel(1, 2), Some(Color::WHITE));
        assert_eq!(t.pixel(5, 8), Some(Color::WHITE));
    }

    #[test]
    fn test_polygon_area() {
        let tri = [DVec2::new(0.0, 0.0), DVec2::new(4.0, 0.0), DVec2::new(0.0, 3.0)];
        assert_eq!(polygon_area(&tri).abs(), 6.0);
        let flat = [DVec2::new(0.0, 0.0), DVec2::new(1.0, 1.0), DVec2::new(2.0, 2.0)];
        assert_eq!(polygon_area(&flat), 0.0);
    }

    #[test]
    fn test_blit_stretches_image() {
        let image = Texture::filled(1, 1, Color::GREEN);
        let mut t = Texture::new(8, 8);
        blit_image(&mut t, &image, DVec2::new(2.0, 2.0), DVec2::new(4.0, 4.0), 1.0, true);
        assert_eq!(count(&t), 4);
        assert_eq!(t.pixel(3, 3), Some(Color::GREEN));
    }
}
