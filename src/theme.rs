use ratatui::style::Color;

/// Theme data structure containing all colors used in the application
#[derive(Debug, Clone)]
pub struct Theme {
    // Frame borders
    pub active_border: Color,
    pub inactive_border: Color,
    pub frame_title: Color,

    // Tab strip
    pub tab_active_fg: Color,
    pub tab_active_bg: Color,
    pub tab_inactive: Color,
    pub tab_close: Color,
    pub tab_separator: Color,
    pub overflow_marker: Color,

    // Page content
    pub heading: Color,
    pub link: Color,
    pub link_selected_fg: Color,
    pub link_selected_bg: Color,
    pub preformatted: Color,

    // Header and prompt
    pub header_fg: Color,
    pub header_bg: Color,
    pub prompt: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    pub status_help_text: Color,
    pub status_loading: Color,

    // General UI
    pub text_default: Color,
    pub placeholder: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            // Frame borders
            active_border: Color::Yellow,
            inactive_border: Color::DarkGray,
            frame_title: Color::Gray,

            // Tab strip
            tab_active_fg: Color::Black,
            tab_active_bg: Color::White,
            tab_inactive: Color::Gray,
            tab_close: Color::Red,
            tab_separator: Color::DarkGray,
            overflow_marker: Color::Yellow,

            // Page content
            heading: Color::Cyan,
            link: Color::Blue,
            link_selected_fg: Color::Black,
            link_selected_bg: Color::Yellow,
            preformatted: Color::Green,

            // Header and prompt
            header_fg: Color::White,
            header_bg: Color::Blue,
            prompt: Color::Yellow,

            // Status bar
            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_help_text: Color::Gray,
            status_loading: Color::Yellow,

            // General UI
            text_default: Color::Reset,
            placeholder: Color::Gray,
        }
    }
}

/// Get the current theme
pub fn get_theme() -> Theme {
    Theme::default()
}
