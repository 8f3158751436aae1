//! Color themes for the dashboard.
//!
//! Both palettes are colorblind-safe; "dark" is the default and "light" is
//! selected through `display.theme` or `QWATCH_THEME`.

use ratatui::style::Color;

use crate::models::JobState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Dark,
    Light,
}

impl ThemeName {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "light" => ThemeName::Light,
            _ => ThemeName::Dark,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: ThemeName,

    pub fg: Color,
    pub border: Color,
    pub border_focused: Color,

    // Job state colors
    pub running: Color,
    pub pending: Color,
    pub completing: Color,
    pub other: Color,

    pub header_bg: Color,
    pub header_fg: Color,
    pub highlight_user: Color,
    pub long_wait: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: ThemeName::Dark,

            fg: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,

            running: Color::Rgb(0, 200, 0),       // Bright green
            pending: Color::Rgb(255, 180, 0),     // Orange
            completing: Color::Rgb(80, 160, 255), // Light blue
            other: Color::DarkGray,

            header_bg: Color::Rgb(40, 80, 120),
            header_fg: Color::White,
            highlight_user: Color::Cyan,
            long_wait: Color::Rgb(255, 100, 100),
            error: Color::Rgb(255, 80, 80),
        }
    }

    /// Darker, more saturated colors for light backgrounds
    pub fn light() -> Self {
        Self {
            name: ThemeName::Light,

            fg: Color::Black,
            border: Color::Rgb(120, 120, 120),
            border_focused: Color::Rgb(0, 100, 180),

            running: Color::Rgb(0, 140, 0),
            pending: Color::Rgb(200, 120, 0),
            completing: Color::Rgb(0, 80, 180),
            other: Color::Rgb(100, 100, 100),

            header_bg: Color::Rgb(180, 200, 230),
            header_fg: Color::Black,
            highlight_user: Color::Rgb(0, 100, 180),
            long_wait: Color::Rgb(200, 0, 0),
            error: Color::Rgb(200, 0, 0),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match ThemeName::parse(name) {
            ThemeName::Dark => Self::dark(),
            ThemeName::Light => Self::light(),
        }
    }

    pub fn job_state_color(&self, state: JobState) -> Color {
        match state {
            JobState::Running => self.running,
            JobState::Pending => self.pending,
            JobState::Completing => self.completing,
            JobState::Other => self.other,
        }
    }
}

/// Emoji shown in front of a job state.
pub fn job_state_emoji(state: JobState) -> &'static str {
    match state {
        JobState::Running => "🏃",
        JobState::Pending => "⏳",
        JobState::Completing => "🏁",
        JobState::Other => "❔",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_from_name() {
        assert_eq!(Theme::from_name("dark").name, ThemeName::Dark);
        assert_eq!(Theme::from_name("Light").name, ThemeName::Light);
        assert_eq!(Theme::from_name("unknown").name, ThemeName::Dark);
    }

    #[test]
    fn test_every_state_has_a_distinct_color() {
        for theme in [Theme::dark(), Theme::light()] {
            let colors: Vec<Color> = JobState::ALL.iter().map(|s| theme.job_state_color(*s)).collect();
            for (i, a) in colors.iter().enumerate() {
                assert!(colors[i + 1..].iter().all(|b| b != a));
            }
        }
    }
}
