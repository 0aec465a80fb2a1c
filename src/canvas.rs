use crate::particles::Surface;
use crate::theme::Rgb;
use ratatui::{buffer::Buffer, layout::Rect, widgets::Widget};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Pixel {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
    pub(crate) a: u8,
}

impl Pixel {
    fn from_rgb(c: Rgb, alpha: f32) -> Self {
        Self {
            r: c.r,
            g: c.g,
            b: c.b,
            a: unit_to_byte(alpha),
        }
    }

    /// Porter-Duff "source over": `self` painted on top of `dst`.
    fn over(self, dst: Pixel) -> Pixel {
        let sa = self.a as f32 / 255.0;
        let da = dst.a as f32 / 255.0 * (1.0 - sa);
        let a = sa + da;
        if a <= 1e-6 {
            return Pixel::default();
        }
        let mix = |s: u8, d: u8| unit_to_byte((s as f32 * sa + d as f32 * da) / (255.0 * a));
        Pixel {
            r: mix(self.r, dst.r),
            g: mix(self.g, dst.g),
            b: mix(self.b, dst.b),
            a: unit_to_byte(a),
        }
    }
}

fn unit_to_byte(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Dot-addressed RGBA canvas. One terminal cell covers 2x4 dots.
pub(crate) struct PixelCanvas {
    pub(crate) w: u32,
    pub(crate) h: u32,
    pub(crate) px: Vec<Pixel>,
}

impl PixelCanvas {
    /// `w` x `h` transparent dots.
    pub(crate) fn new(w: u32, h: u32) -> Self {
        Self {
            px: vec![Pixel::default(); w as usize * h as usize],
            w,
            h,
        }
    }

    pub(crate) fn for_cells(cols: u16, rows: u16) -> Self {
        Self::new(cols as u32 * 2, rows as u32 * 4)
    }

    fn dot(&self, x: i64, y: i64) -> Option<usize> {
        let inside = (0..self.w as i64).contains(&x) && (0..self.h as i64).contains(&y);
        inside.then(|| y as usize * self.w as usize + x as usize)
    }

    pub(crate) fn get(&self, x: u32, y: u32) -> Pixel {
        self.dot(x as i64, y as i64)
            .map(|i| self.px[i])
            .unwrap_or_default()
    }

    fn paint(&mut self, x: i32, y: i32, src: Pixel) {
        if let Some(i) = self.dot(x as i64, y as i64) {
            self.px[i] = src.over(self.px[i]);
        }
    }
}

impl Surface for PixelCanvas {
    fn clear(&mut self) {
        self.px.fill(Pixel::default());
    }

    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb, alpha: f32) {
        let p = Pixel::from_rgb(color, alpha);
        // always ink at least the centre dot so tiny particles stay visible
        let r = r.max(0.5);
        let r2 = r * r;
        let x0 = (cx - r).floor() as i32;
        let x1 = (cx + r).ceil() as i32;
        let y0 = (cy - r).floor() as i32;
        let y1 = (cy + r).ceil() as i32;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy <= r2 {
                    self.paint(x, y, p);
                }
            }
        }
    }

    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgb, alpha: f32) {
        if points.len() < 3 {
            return;
        }
        let p = Pixel::from_rgb(color, alpha);
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for &(x, y) in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        for y in min_y.floor() as i32..=max_y.ceil() as i32 {
            for x in min_x.floor() as i32..=max_x.ceil() as i32 {
                if point_in_polygon(points, x as f32 + 0.5, y as f32 + 0.5) {
                    self.paint(x, y, p);
                }
            }
        }
    }

    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb, alpha: f32) {
        let p = Pixel::from_rgb(color, alpha);
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as i32;
        let mut last = None;
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            let x = (x0 + dx * t).floor() as i32;
            let y = (y0 + dy * t).floor() as i32;
            // each dot once per line, otherwise alpha would stack
            if last == Some((x, y)) {
                continue;
            }
            last = Some((x, y));
            self.paint(x, y, p);
        }
    }
}

// even-odd rule
fn point_in_polygon(points: &[(f32, f32)], x: f32, y: f32) -> bool {
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

// Unicode braille bit for each dot, indexed [column][row].
const DOT_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

/// What one terminal cell shows for the 2x4 dots it covers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BrailleCell {
    pub(crate) ch: char,
    pub(crate) fg: Rgb,
}

pub(crate) fn braille_cell(canvas: &PixelCanvas, cx: u32, cy: u32, bg: Rgb, ink_threshold: u8) -> BrailleCell {
    let px0 = cx * 2;
    let py0 = cy * 4;

    let mut mask: u8 = 0;
    let mut sum_r: u32 = 0;
    let mut sum_g: u32 = 0;
    let mut sum_b: u32 = 0;
    let mut sum_a: u32 = 0;
    let mut ink_count: u32 = 0;

    for dy in 0..4 {
        for dx in 0..2 {
            let p = canvas.get(px0 + dx, py0 + dy);
            if p.a >= ink_threshold {
                mask |= DOT_BITS[dx as usize][dy as usize];
                sum_r += p.r as u32;
                sum_g += p.g as u32;
                sum_b += p.b as u32;
                sum_a += p.a as u32;
                ink_count += 1;
            }
        }
    }

    if ink_count == 0 {
        return BrailleCell { ch: ' ', fg: bg };
    }

    let ch = char::from_u32(0x2800 + mask as u32).unwrap_or(' ');
    let avg = Rgb {
        r: (sum_r / ink_count) as u8,
        g: (sum_g / ink_count) as u8,
        b: (sum_b / ink_count) as u8,
    };
    // terminals have no per-dot alpha: fade the glyph towards the background
    let coverage = sum_a as f32 / (ink_count as f32 * 255.0);
    BrailleCell {
        ch,
        fg: bg.mix(avg, coverage),
    }
}

/// Paints a [`PixelCanvas`] into a ratatui buffer as braille glyphs.
pub(crate) struct BrailleLayer<'a> {
    pub(crate) canvas: &'a PixelCanvas,
    pub(crate) bg: Rgb,
    pub(crate) ink_threshold: u8,
}

impl Widget for BrailleLayer<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let bg = self.bg.color();
        for row in 0..area.height {
            for col in 0..area.width {
                let cell = braille_cell(self.canvas, col as u32, row as u32, self.bg, self.ink_threshold);
                buf.get_mut(area.x + col, area.y + row)
                    .set_char(cell.ch)
                    .set_fg(cell.fg.color())
                    .set_bg(bg);
            }
        }
    }
}
