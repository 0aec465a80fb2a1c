use clap::ValueEnum;
use ratatui::style::Color;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Rgb {
    pub(crate) r: u8,
    pub(crate) g: u8,
    pub(crate) b: u8,
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb { r, g, b }
}

impl Rgb {
    pub(crate) fn color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }

    /// Linear mix towards `other`; `t = 0` keeps `self`.
    pub(crate) fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let ch = |a: u8, b: u8| -> u8 { (a as f32 + (b as f32 - a as f32) * t + 0.5) as u8 };
        Rgb {
            r: ch(self.r, other.r),
            g: ch(self.g, other.g),
            b: ch(self.b, other.b),
        }
    }
}

/// How many particles a theme seeds: `min(width / divisor, initial_cap)`,
/// and how many may live at once before the oldest are dropped.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Density {
    pub(crate) divisor: f32,
    pub(crate) initial_cap: usize,
    pub(crate) live_cap: usize,
}

#[derive(Debug)]
pub(crate) struct ThemeStyle {
    pub(crate) name: &'static str,
    pub(crate) background: Rgb,
    pub(crate) palette: &'static [Rgb],
    pub(crate) link: Rgb,
    pub(crate) link_alpha: f32,
    pub(crate) density: Density,
    // positive pulls particles towards the pointer, negative pushes them away
    pub(crate) pointer_pull: f32,
    pub(crate) card_bg: Rgb,
    pub(crate) card_border: Rgb,
    pub(crate) header: Rgb,
    pub(crate) user_bubble: Rgb,
    pub(crate) bot_text: Rgb,
    pub(crate) muted: Rgb,
    pub(crate) error: Rgb,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Theme {
    #[default]
    Nebula,
    Aurora,
    Ember,
    Mono,
}

impl Theme {
    pub(crate) const ALL: [Theme; 4] = [Theme::Nebula, Theme::Aurora, Theme::Ember, Theme::Mono];

    pub(crate) fn style(self) -> &'static ThemeStyle {
        &THEMES[self as usize]
    }

    pub(crate) fn next(self) -> Theme {
        let i = Theme::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Theme::ALL[(i + 1) % Theme::ALL.len()]
    }
}

// Indexed by `Theme as usize`.
static THEMES: [ThemeStyle; 4] = [
    ThemeStyle {
        name: "Nebula",
        background: rgb(14, 8, 30),
        palette: &[
            rgb(123, 97, 255),
            rgb(173, 216, 230),
            rgb(147, 112, 219),
            rgb(138, 43, 226),
            rgb(221, 160, 221),
        ],
        link: rgb(147, 112, 219),
        link_alpha: 0.45,
        density: Density {
            divisor: 15.0,
            initial_cap: 100,
            live_cap: 120,
        },
        pointer_pull: 0.6,
        card_bg: rgb(24, 18, 44),
        card_border: rgb(124, 58, 237),
        header: rgb(139, 92, 246),
        user_bubble: rgb(129, 140, 248),
        bot_text: rgb(226, 232, 240),
        muted: rgb(120, 113, 150),
        error: rgb(248, 113, 113),
    },
    ThemeStyle {
        name: "Aurora",
        background: rgb(2, 16, 20),
        palette: &[
            rgb(52, 211, 153),
            rgb(45, 212, 191),
            rgb(96, 165, 250),
            rgb(167, 243, 208),
        ],
        link: rgb(94, 234, 212),
        link_alpha: 0.4,
        density: Density {
            divisor: 8.0,
            initial_cap: 150,
            live_cap: 180,
        },
        pointer_pull: 0.8,
        card_bg: rgb(6, 28, 34),
        card_border: rgb(20, 184, 166),
        header: rgb(45, 212, 191),
        user_bubble: rgb(52, 211, 153),
        bot_text: rgb(220, 252, 231),
        muted: rgb(94, 140, 140),
        error: rgb(251, 146, 60),
    },
    ThemeStyle {
        name: "Ember",
        background: rgb(20, 8, 4),
        palette: &[
            rgb(251, 146, 60),
            rgb(248, 113, 113),
            rgb(253, 224, 71),
            rgb(234, 88, 12),
        ],
        link: rgb(251, 191, 36),
        link_alpha: 0.35,
        density: Density {
            divisor: 12.0,
            initial_cap: 90,
            live_cap: 110,
        },
        pointer_pull: -0.9,
        card_bg: rgb(36, 16, 8),
        card_border: rgb(234, 88, 12),
        header: rgb(251, 146, 60),
        user_bubble: rgb(253, 186, 116),
        bot_text: rgb(254, 243, 199),
        muted: rgb(150, 110, 90),
        error: rgb(239, 68, 68),
    },
    ThemeStyle {
        name: "Mono",
        background: rgb(0, 0, 0),
        palette: &[rgb(200, 200, 200), rgb(150, 150, 150), rgb(240, 240, 240)],
        link: rgb(180, 180, 180),
        link_alpha: 0.3,
        density: Density {
            divisor: 20.0,
            initial_cap: 60,
            live_cap: 75,
        },
        pointer_pull: 0.0,
        card_bg: rgb(12, 12, 12),
        card_border: rgb(160, 160, 160),
        header: rgb(255, 255, 255),
        user_bubble: rgb(230, 230, 230),
        bot_text: rgb(210, 210, 210),
        muted: rgb(110, 110, 110),
        error: rgb(255, 255, 255),
    },
];
