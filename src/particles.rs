use crate::theme::{Density, Rgb, Theme};
use rand::{rngs::SmallRng, Rng, SeedableRng};
use std::f32::consts::TAU;
use std::time::Duration;
use tracing::debug;

/// Anything the field can be drawn onto.
pub(crate) trait Surface {
    fn clear(&mut self);
    fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb, alpha: f32);
    fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgb, alpha: f32);
    fn stroke_line(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgb, alpha: f32);
}

/// Drawable area in dots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Viewport {
    pub(crate) w: f32,
    pub(crate) h: f32,
}

impl Viewport {
    pub(crate) fn from_cells(cols: u16, rows: u16) -> Self {
        Self {
            w: cols as f32 * 2.0,
            h: rows as f32 * 4.0,
        }
    }

    fn is_drawable(self) -> bool {
        self.w >= 1.0 && self.h >= 1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pointer {
    pub(crate) x: f32,
    pub(crate) y: f32,
}

impl Pointer {
    /// Centre dot of a terminal cell.
    pub(crate) fn from_cell(col: u16, row: u16) -> Self {
        Self {
            x: col as f32 * 2.0 + 1.0,
            y: row as f32 * 4.0 + 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shape {
    Circle,
    Polygon(u8),
}

#[derive(Clone, Debug)]
pub(crate) struct Particle {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) size: f32,
    pub(crate) growth: f32,
    pub(crate) speed_x: f32,
    pub(crate) speed_y: f32,
    pub(crate) color: usize,
    pub(crate) alpha: f32,
    pub(crate) rotation: f32,
    pub(crate) spin: f32,
    pub(crate) shape: Shape,
}

/// Physics knobs shared by every theme. Distances are in dots, speeds in
/// dots per step.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FieldParams {
    pub(crate) size_min: f32,
    pub(crate) size_max: f32,
    pub(crate) growth_max: f32,
    pub(crate) start_speed: f32,
    pub(crate) max_speed: f32,
    pub(crate) bounce_jitter: f32,
    pub(crate) pointer_radius: f32,
    pub(crate) connection_radius: f32,
    pub(crate) spawn_chance: f64,
    pub(crate) spin_max: f32,
    pub(crate) polygon_chance: f64,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            size_min: 0.6,
            size_max: 2.6,
            growth_max: 0.03,
            start_speed: 0.6,
            max_speed: 1.6,
            bounce_jitter: 0.05,
            pointer_radius: 24.0,
            connection_radius: 18.0,
            spawn_chance: 0.02,
            spin_max: 1.2,
            polygon_chance: 0.35,
        }
    }
}

/// `min(floor(width / divisor), initial_cap)`.
pub(crate) fn seed_count(width: f32, density: Density) -> usize {
    if width <= 0.0 || density.divisor <= 0.0 {
        return 0;
    }
    ((width / density.divisor).floor() as usize).min(density.initial_cap)
}

/// Link opacity for two particles `distance` apart: 1 when touching, 0 at or
/// beyond `radius`.
pub(crate) fn connection_opacity(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    (1.0 - distance.max(0.0) / radius).clamp(0.0, 1.0)
}

pub(crate) fn polygon_vertices(cx: f32, cy: f32, radius: f32, sides: u8, rotation: f32) -> Vec<(f32, f32)> {
    let n = sides.max(3);
    (0..n)
        .map(|i| {
            let a = rotation + TAU * i as f32 / n as f32;
            (cx + radius * a.cos(), cy + radius * a.sin())
        })
        .collect()
}

pub(crate) struct ParticleField {
    params: FieldParams,
    theme: Theme,
    viewport: Option<Viewport>,
    particles: Vec<Particle>,
    rng: SmallRng,
}

impl ParticleField {
    pub(crate) fn new(theme: Theme, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        };
        Self {
            params: FieldParams::default(),
            theme,
            viewport: None,
            particles: Vec::new(),
            rng,
        }
    }

    #[cfg(test)]
    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }

    #[cfg(test)]
    pub(crate) fn theme(&self) -> Theme {
        self.theme
    }

    #[cfg(test)]
    pub(crate) fn is_active(&self) -> bool {
        self.viewport.is_some()
    }

    /// Seeds the set for `surface`. Without a drawable surface the field
    /// stays empty and inert.
    pub(crate) fn initialize(&mut self, surface: Option<Viewport>) {
        self.particles.clear();
        self.viewport = surface.filter(|v| v.is_drawable());
        let Some(vp) = self.viewport else {
            debug!("particle field has no drawable surface");
            return;
        };

        let n = seed_count(vp.w, self.theme.style().density);
        self.particles.reserve(n);
        for _ in 0..n {
            let p = self.spawn(vp);
            self.particles.push(p);
        }
        debug!(count = n, w = vp.w, h = vp.h, theme = ?self.theme, "particle field seeded");
    }

    /// New dimensions only; live particles keep their positions and bounce
    /// back inside on their next step.
    pub(crate) fn resize(&mut self, viewport: Viewport) {
        if self.viewport.is_none() {
            self.initialize(Some(viewport));
            return;
        }
        if viewport.is_drawable() {
            self.viewport = Some(viewport);
        } else {
            self.viewport = None;
            self.particles.clear();
        }
    }

    /// Colours come from the palette, so a new theme means a new set.
    pub(crate) fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.initialize(self.viewport);
    }

    fn spawn(&mut self, vp: Viewport) -> Particle {
        let p = self.params;
        let rng = &mut self.rng;
        let palette_len = self.theme.style().palette.len().max(1);
        let growth = rng.gen_range(p.growth_max * 0.2..=p.growth_max);
        let shape = if rng.gen_bool(p.polygon_chance) {
            Shape::Polygon(rng.gen_range(3..=5))
        } else {
            Shape::Circle
        };
        Particle {
            x: rng.gen_range(0.0..=vp.w),
            y: rng.gen_range(0.0..=vp.h),
            size: rng.gen_range(p.size_min..=p.size_max),
            growth: if rng.gen_bool(0.5) { growth } else { -growth },
            speed_x: (rng.gen::<f32>() - 0.5) * p.start_speed,
            speed_y: (rng.gen::<f32>() - 0.5) * p.start_speed,
            color: rng.gen_range(0..palette_len),
            alpha: rng.gen_range(0.35..=1.0),
            rotation: rng.gen_range(0.0..TAU),
            spin: rng.gen_range(-p.spin_max..=p.spin_max),
            shape,
        }
    }

    pub(crate) fn step(&mut self, dt: Duration, pointer: Option<Pointer>) {
        let Some(vp) = self.viewport else {
            return;
        };
        let p = self.params;
        let pull = self.theme.style().pointer_pull;
        let secs = dt.as_secs_f32();

        for part in &mut self.particles {
            part.x += part.speed_x;
            part.y += part.speed_y;

            if part.x < 0.0 || part.x > vp.w {
                reflect(&mut part.x, &mut part.speed_x, vp.w, p.bounce_jitter, &mut self.rng);
                part.speed_y += self.rng.gen_range(-p.bounce_jitter..=p.bounce_jitter);
            }
            if part.y < 0.0 || part.y > vp.h {
                reflect(&mut part.y, &mut part.speed_y, vp.h, p.bounce_jitter, &mut self.rng);
                part.speed_x += self.rng.gen_range(-p.bounce_jitter..=p.bounce_jitter);
            }

            part.size += part.growth;
            if part.size >= p.size_max {
                part.size = p.size_max;
                part.growth = -part.growth.abs();
            } else if part.size <= p.size_min {
                part.size = p.size_min;
                part.growth = part.growth.abs();
            }

            if let Some(ptr) = pointer {
                let dx = ptr.x - part.x;
                let dy = ptr.y - part.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist < p.pointer_radius && dist > 1e-3 {
                    let impulse = pull / dist.max(1.0);
                    part.speed_x += dx / dist * impulse;
                    part.speed_y += dy / dist * impulse;
                }
            }

            let speed = (part.speed_x * part.speed_x + part.speed_y * part.speed_y).sqrt();
            if speed > p.max_speed {
                let k = p.max_speed / speed;
                part.speed_x *= k;
                part.speed_y *= k;
            }

            part.rotation = (part.rotation + part.spin * secs) % TAU;
        }

        if self.rng.gen_bool(p.spawn_chance) {
            let fresh = self.spawn(vp);
            self.particles.push(fresh);
        }
        let cap = self.theme.style().density.live_cap;
        if self.particles.len() > cap {
            let excess = self.particles.len() - cap;
            self.particles.drain(..excess);
        }
    }

    pub(crate) fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        if self.viewport.is_none() {
            return;
        }
        let style = self.theme.style();
        surface.clear();

        for part in &self.particles {
            let color = style.palette.get(part.color).copied().unwrap_or(style.link);
            match part.shape {
                Shape::Circle => surface.fill_circle(part.x, part.y, part.size, color, part.alpha),
                Shape::Polygon(sides) => {
                    let pts = polygon_vertices(part.x, part.y, part.size * 1.4, sides, part.rotation);
                    surface.fill_polygon(&pts, color, part.alpha);
                }
            }
        }

        let radius = self.params.connection_radius;
        for (i, a) in self.particles.iter().enumerate() {
            for b in &self.particles[i + 1..] {
                let dx = a.x - b.x;
                let dy = a.y - b.y;
                let opacity = connection_opacity((dx * dx + dy * dy).sqrt(), radius);
                if opacity > 0.0 {
                    surface.stroke_line(a.x, a.y, b.x, b.y, style.link, opacity * style.link_alpha);
                }
            }
        }
    }
}

// Mirror `pos` back into [0, max] and send `vel` inwards with a little noise
// so particles don't settle into a fixed bounce period.
fn reflect(pos: &mut f32, vel: &mut f32, max: f32, jitter: f32, rng: &mut SmallRng) {
    let speed = (vel.abs() + rng.gen_range(-jitter..=jitter)).max(jitter);
    if *pos < 0.0 {
        *pos = -*pos;
        *vel = speed;
    } else if *pos > max {
        *pos = 2.0 * max - *pos;
        *vel = -speed;
    }
    *pos = pos.clamp(0.0, max);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        clears: usize,
        circles: usize,
        polygons: Vec<usize>,
        lines: Vec<f32>,
    }

    impl Surface for Recorder {
        fn clear(&mut self) {
            self.clears += 1;
        }
        fn fill_circle(&mut self, _: f32, _: f32, _: f32, _: Rgb, _: f32) {
            self.circles += 1;
        }
        fn fill_polygon(&mut self, points: &[(f32, f32)], _: Rgb, _: f32) {
            self.polygons.push(points.len());
        }
        fn stroke_line(&mut self, _: f32, _: f32, _: f32, _: f32, _: Rgb, alpha: f32) {
            self.lines.push(alpha);
        }
    }

    fn vp(w: f32, h: f32) -> Viewport {
        Viewport { w, h }
    }

    fn field(theme: Theme, w: f32, h: f32) -> ParticleField {
        let mut f = ParticleField::new(theme, Some(7));
        f.initialize(Some(vp(w, h)));
        f
    }

    fn still(x: f32, y: f32) -> Particle {
        Particle {
            x,
            y,
            size: 1.0,
            growth: 0.01,
            speed_x: 0.0,
            speed_y: 0.0,
            color: 0,
            alpha: 1.0,
            rotation: 0.0,
            spin: 0.0,
            shape: Shape::Circle,
        }
    }

    #[test]
    fn width_1000_seeds_exact_count() {
        // aurora: divisor 8, cap 150
        let f = field(Theme::Aurora, 1000.0, 400.0);
        assert_eq!(f.particles().len(), 125);
    }

    #[test]
    fn seed_count_is_capped() {
        let f = field(Theme::Nebula, 100_000.0, 400.0);
        assert_eq!(f.particles().len(), Theme::Nebula.style().density.initial_cap);
        assert_eq!(seed_count(0.0, Theme::Nebula.style().density), 0);
    }

    #[test]
    fn no_surface_is_a_no_op() {
        let mut f = ParticleField::new(Theme::Nebula, Some(1));
        f.initialize(None);
        assert!(!f.is_active());
        assert!(f.particles().is_empty());

        f.step(Duration::from_millis(16), Some(Pointer { x: 1.0, y: 1.0 }));
        let mut rec = Recorder::default();
        f.render(&mut rec);
        assert_eq!(rec.clears, 0);
        assert!(f.particles().is_empty());

        f.initialize(Some(vp(0.0, 40.0)));
        assert!(!f.is_active());
    }

    #[test]
    fn seeded_particles_start_inside_the_viewport() {
        let f = field(Theme::Nebula, 300.0, 120.0);
        let band = FieldParams::default();
        let palette = Theme::Nebula.style().palette.len();
        for p in f.particles() {
            assert!((0.0..=300.0).contains(&p.x));
            assert!((0.0..=120.0).contains(&p.y));
            assert!(p.size >= band.size_min && p.size <= band.size_max);
            assert!(p.alpha > 0.0 && p.alpha <= 1.0);
            assert!(p.color < palette);
            if let Shape::Polygon(n) = p.shape {
                assert!((3..=5).contains(&n));
            }
        }
    }

    #[test]
    fn boundary_crossing_reflects_instead_of_clipping() {
        let mut f = field(Theme::Mono, 100.0, 50.0);
        f.params.spawn_chance = 0.0;
        f.particles = vec![
            Particle { speed_x: 1.5, ..still(99.5, 25.0) },
            Particle { speed_y: -1.5, ..still(50.0, 0.5) },
        ];
        f.step(Duration::from_millis(16), None);

        let right = &f.particles[0];
        assert!((right.x - 99.0).abs() < 1e-4, "x={}", right.x);
        assert!(right.speed_x < 0.0);

        let top = &f.particles[1];
        assert!((top.y - 1.0).abs() < 1e-4, "y={}", top.y);
        assert!(top.speed_y > 0.0);
    }

    #[test]
    fn positions_stay_in_bounds_over_many_steps() {
        let mut f = field(Theme::Aurora, 240.0, 96.0);
        for p in &mut f.particles {
            p.speed_x *= 5.0;
            p.speed_y *= 5.0;
        }
        let ptr = Some(Pointer { x: 120.0, y: 48.0 });
        for _ in 0..2000 {
            f.step(Duration::from_millis(33), ptr);
            for p in f.particles() {
                assert!(p.x >= 0.0 && p.x <= 240.0, "x={}", p.x);
                assert!(p.y >= 0.0 && p.y <= 96.0, "y={}", p.y);
            }
        }
    }

    #[test]
    fn size_never_leaves_its_band() {
        let mut f = field(Theme::Nebula, 200.0, 80.0);
        let band = f.params;
        for p in &mut f.particles {
            p.growth *= 10.0;
        }
        for _ in 0..5000 {
            f.step(Duration::from_millis(16), None);
            for p in f.particles() {
                assert!(p.size >= band.size_min && p.size <= band.size_max, "size={}", p.size);
            }
        }
    }

    #[test]
    fn pointer_attracts_nearby_particles() {
        let mut f = field(Theme::Aurora, 200.0, 200.0);
        f.params.spawn_chance = 0.0;
        f.particles = vec![still(100.0, 100.0), still(10.0, 10.0)];
        f.step(Duration::from_millis(16), Some(Pointer { x: 110.0, y: 100.0 }));
        assert!(f.particles[0].speed_x > 0.0);
        assert!(f.particles[0].speed_y.abs() < 1e-6);
        // outside the interaction radius
        assert_eq!(f.particles[1].speed_x, 0.0);
    }

    #[test]
    fn closer_pointer_pushes_harder() {
        let mut f = field(Theme::Ember, 200.0, 200.0);
        f.params.spawn_chance = 0.0;
        f.particles = vec![still(100.0, 100.0)];
        f.step(
            Duration::from_millis(16),
            Some(Pointer { x: 105.0, y: 100.0 }),
        );
        // ember repels
        let near = f.particles[0].speed_x;
        assert!(near < 0.0);

        let mut g = field(Theme::Ember, 200.0, 200.0);
        g.params.spawn_chance = 0.0;
        g.particles = vec![still(100.0, 100.0)];
        g.step(
            Duration::from_millis(16),
            Some(Pointer { x: 120.0, y: 100.0 }),
        );
        assert!(g.particles[0].speed_x.abs() < near.abs());
    }

    #[test]
    fn speed_is_limited() {
        let mut f = field(Theme::Nebula, 200.0, 200.0);
        f.params.spawn_chance = 0.0;
        f.particles = vec![Particle { speed_x: 40.0, speed_y: 30.0, ..still(100.0, 100.0) }];
        f.step(Duration::from_millis(16), None);
        let p = &f.particles[0];
        let speed = (p.speed_x * p.speed_x + p.speed_y * p.speed_y).sqrt();
        assert!(speed <= f.params.max_speed + 1e-4);
    }

    #[test]
    fn rotation_follows_wall_clock() {
        let mut f = field(Theme::Nebula, 200.0, 200.0);
        f.params.spawn_chance = 0.0;
        f.particles = vec![Particle { spin: 1.0, ..still(100.0, 100.0) }];
        f.step(Duration::from_millis(500), None);
        assert!((f.particles[0].rotation - 0.5).abs() < 1e-4);
    }

    #[test]
    fn oldest_particles_drop_past_the_live_cap() {
        let mut f = field(Theme::Mono, 200.0, 80.0);
        f.params.spawn_chance = 1.0;
        let cap = Theme::Mono.style().density.live_cap;
        f.particles = (0..cap).map(|i| still(i as f32 % 200.0, 40.0)).collect();
        f.particles[0].alpha = 0.5;
        f.particles[1].alpha = 0.25;
        f.step(Duration::from_millis(16), None);
        assert_eq!(f.particles.len(), cap);
        // the first one went, the second is now the oldest
        assert_eq!(f.particles[0].alpha, 0.25);
    }

    #[test]
    fn occasional_spawns_grow_the_set() {
        let mut f = field(Theme::Nebula, 150.0, 80.0);
        let start = f.particles().len();
        for _ in 0..400 {
            f.step(Duration::from_millis(16), None);
        }
        assert!(f.particles().len() > start);
        assert!(f.particles().len() <= Theme::Nebula.style().density.live_cap);
    }

    #[test]
    fn opacity_is_monotonic_in_distance() {
        let r = 18.0;
        assert_eq!(connection_opacity(r, r), 0.0);
        assert_eq!(connection_opacity(r * 3.0, r), 0.0);
        assert!(connection_opacity(0.001, r) > 0.99);
        let mut last = f32::INFINITY;
        for i in 0..=36 {
            let o = connection_opacity(i as f32 * 0.5, r);
            assert!(o <= last);
            assert!((0.0..=1.0).contains(&o));
            last = o;
        }
    }

    #[test]
    fn render_draws_every_particle_and_links_close_pairs() {
        let mut f = field(Theme::Nebula, 200.0, 200.0);
        f.particles = vec![
            still(10.0, 10.0),
            still(19.0, 10.0),
            Particle { shape: Shape::Polygon(4), ..still(150.0, 150.0) },
        ];
        let mut rec = Recorder::default();
        f.render(&mut rec);
        assert_eq!(rec.clears, 1);
        assert_eq!(rec.circles, 2);
        assert_eq!(rec.polygons, vec![4]);
        assert_eq!(rec.lines.len(), 1);
        let expected = connection_opacity(9.0, f.params.connection_radius) * Theme::Nebula.style().link_alpha;
        assert!((rec.lines[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn theme_change_reseeds_with_new_palette() {
        let mut f = field(Theme::Nebula, 400.0, 100.0);
        f.set_theme(Theme::Mono);
        assert_eq!(f.theme(), Theme::Mono);
        assert_eq!(f.particles().len(), seed_count(400.0, Theme::Mono.style().density));
        let palette = Theme::Mono.style().palette.len();
        assert!(f.particles().iter().all(|p| p.color < palette));
    }

    #[test]
    fn resize_keeps_positions() {
        let mut f = field(Theme::Nebula, 400.0, 100.0);
        let before: Vec<(f32, f32)> = f.particles().iter().map(|p| (p.x, p.y)).collect();
        f.resize(vp(200.0, 50.0));
        let after: Vec<(f32, f32)> = f.particles().iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(before, after);

        let mut g = ParticleField::new(Theme::Nebula, Some(3));
        g.initialize(None);
        g.resize(vp(300.0, 100.0));
        assert!(g.is_active());
        assert_eq!(g.particles().len(), 20);
    }

    #[test]
    fn polygon_vertices_sit_on_the_radius() {
        let pts = polygon_vertices(5.0, 5.0, 2.0, 5, 0.3);
        assert_eq!(pts.len(), 5);
        for (x, y) in pts {
            let d = ((x - 5.0).powi(2) + (y - 5.0).powi(2)).sqrt();
            assert!((d - 2.0).abs() < 1e-4);
        }
    }
}
