use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use tracing::debug;

use crate::task::Priority;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Theme preference as written in config: a fixed theme or `auto`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeSetting {
    Auto,
    Fixed(Theme),
}

impl FromStr for ThemeSetting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ThemeSetting::Auto),
            "light" => Ok(ThemeSetting::Fixed(Theme::Light)),
            "dark" => Ok(ThemeSetting::Fixed(Theme::Dark)),
            other => Err(anyhow!("invalid theme setting: {other} (expected light, dark or auto)")),
        }
    }
}

impl ThemeSetting {
    pub fn resolve(self) -> Theme {
        match self {
            ThemeSetting::Fixed(theme) => theme,
            ThemeSetting::Auto => {
                let hint = std::env::var("COLORFGBG").ok();
                let theme = Theme::from_colorfgbg(hint.as_deref());
                debug!(colorfgbg = ?hint, ?theme, "detected terminal theme");
                theme
            }
        }
    }
}

/// ANSI SGR parameter strings for each role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: &'static str,
    pub muted: &'static str,
    pub completed: &'static str,
    pub overdue: &'static str,
    pub high: &'static str,
    pub medium: &'static str,
    pub low: &'static str,
}

const LIGHT: Palette = Palette {
    accent: "1;34",
    muted: "90",
    completed: "9;90",
    overdue: "1;31",
    high: "31",
    medium: "33",
    low: "32",
};

const DARK: Palette = Palette {
    accent: "1;96",
    muted: "37",
    completed: "9;37",
    overdue: "1;91",
    high: "91",
    medium: "93",
    low: "92",
};

impl Theme {
    pub fn toggle(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Theme::Light => &LIGHT,
            Theme::Dark => &DARK,
        }
    }

    pub fn priority_code(self, priority: Priority) -> &'static str {
        let palette = self.palette();
        match priority {
            Priority::High => palette.high,
            Priority::Medium => palette.medium,
            Priority::Low => palette.low,
        }
    }

    /// Reads the `fg;bg` convention set by rxvt-style terminals. The last
    /// field is the background color index.
    pub fn from_colorfgbg(value: Option<&str>) -> Self {
        let Some(bg) = value
            .and_then(|raw| raw.rsplit(';').next())
            .and_then(|bg| bg.trim().parse::<u8>().ok())
        else {
            return Theme::Light;
        };
        if bg <= 6 || bg == 8 {
            Theme::Dark
        } else {
            Theme::Light
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_flips() {
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(Theme::Dark.toggle().toggle(), Theme::Dark);
    }

    #[test]
    fn colorfgbg_detection() {
        assert_eq!(Theme::from_colorfgbg(Some("15;0")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(Some("0;default;15")), Theme::Light);
        assert_eq!(Theme::from_colorfgbg(Some("7;8")), Theme::Dark);
        assert_eq!(Theme::from_colorfgbg(Some("garbage")), Theme::Light);
        assert_eq!(Theme::from_colorfgbg(None), Theme::Light);
    }

    #[test]
    fn setting_parses() {
        assert_eq!(
            "Dark".parse::<ThemeSetting>().expect("parse"),
            ThemeSetting::Fixed(Theme::Dark)
        );
        assert_eq!("auto".parse::<ThemeSetting>().expect("parse"), ThemeSetting::Auto);
        assert!("sepia".parse::<ThemeSetting>().is_err());
    }
}
