use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::frame::{truncate_label, TAB_SEPARATOR};
use crate::page::{BlockKind, Page, Segment};
use crate::theme::{get_theme, Theme};

pub const HEADER_TITLE: &str = "Infinite Wiki";

pub fn draw(frame: &mut Frame, app: &mut App) {
    let theme = get_theme();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(frame.area());

    draw_header(frame, app, chunks[0], &theme);
    draw_level_frames(frame, app, chunks[1], &theme);
    draw_status_bar(frame, app, chunks[2], &theme);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let header_style = Style::default().fg(theme.header_fg).bg(theme.header_bg);
    let mut spans = vec![Span::styled(
        format!(" {} ", HEADER_TITLE),
        header_style.add_modifier(Modifier::BOLD),
    )];

    match &app.ui.prompt {
        Some(input) => {
            spans.push(Span::styled(" Open: ", Style::default().fg(theme.prompt)));
            spans.push(Span::raw(input.clone()));
            spans.push(Span::styled("█", Style::default().fg(theme.prompt)));
        }
        None => {
            let breadcrumb: Vec<String> = app
                .tree
                .active_path()
                .into_iter()
                .filter_map(|id| app.tree.node(id))
                .map(|node| truncate_label(&node.title, app.config.layout.tab_label_max))
                .collect();
            if !breadcrumb.is_empty() {
                spans.push(Span::raw(" "));
                spans.push(Span::raw(breadcrumb.join(" › ")));
            }
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Depths drawn on screen: a window of at most `capacity` frames that keeps
/// the focused one in view.
pub fn visible_depths(frame_count: usize, focused: usize, capacity: usize) -> std::ops::Range<usize> {
    let count = frame_count.min(capacity.max(1));
    let start = if focused >= count { focused + 1 - count } else { 0 };
    let start = start.min(frame_count - count);
    start..start + count
}

fn draw_level_frames(frame: &mut Frame, app: &mut App, area: Rect, theme: &Theme) {
    if app.tree.frames().is_empty() {
        let paragraph = Paragraph::new(format!(
            "No page open. Press '{}' to open one.",
            app.config.keybindings.open_url
        ))
        .block(Block::default().borders(Borders::ALL))
        .style(Style::default().fg(theme.placeholder));
        frame.render_widget(paragraph, area);
        return;
    }

    let layout = &app.config.layout;
    let fits = usize::from((area.height / layout.min_frame_height.max(3)).max(1));
    let depths = visible_depths(
        app.tree.frames().len(),
        app.ui.focused_depth,
        layout.visible_frames.min(fits),
    );

    let constraints = vec![Constraint::Fill(1); depths.len()];
    let areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (depth, frame_area) in depths.zip(areas.iter()) {
        draw_level_frame(frame, app, depth, *frame_area, theme);
    }
}

fn draw_level_frame(frame: &mut Frame, app: &mut App, depth: usize, area: Rect, theme: &Theme) {
    let is_focused = depth == app.ui.focused_depth;
    let border_style = if is_focused {
        Style::default().fg(theme.active_border)
    } else {
        Style::default().fg(theme.inactive_border)
    };

    let block = Block::default()
        .title(Span::styled(
            format!(" Level {} ", depth),
            Style::default().fg(theme.frame_title),
        ))
        .borders(Borders::ALL)
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width < 3 {
        return;
    }

    let max_label = app.config.layout.tab_label_max;
    let strip_area = Rect::new(inner.x + 1, inner.y, inner.width - 2, 1);
    let overflow = match app.tree.frame_mut(depth) {
        Some(level) => level.layout_tabs(strip_area.width, max_label),
        None => return,
    };

    if inner.height >= 2 {
        reveal_selected_link(app, depth, inner.width, inner.height - 1, theme);
    }

    let Some(level) = app.tree.frames().get(depth) else {
        return;
    };

    // Tab strip with overflow markers on both edges
    let mut spans = Vec::new();
    for (index, tab) in level.tabs().iter().enumerate() {
        if index > 0 {
            spans.push(Span::styled(
                TAB_SEPARATOR,
                Style::default().fg(theme.tab_separator),
            ));
        }
        let style = if tab.active {
            Style::default()
                .fg(theme.tab_active_fg)
                .bg(theme.tab_active_bg)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.tab_inactive)
        };
        spans.push(Span::styled(format!(" {} ", truncate_label(&tab.label, max_label)), style));
        if tab.closable() {
            spans.push(Span::styled("× ", style.fg(theme.tab_close)));
        }
    }
    frame.render_widget(
        Paragraph::new(Line::from(spans)).scroll((0, level.tab_offset)),
        strip_area,
    );

    let marker_style = Style::default().fg(theme.overflow_marker);
    if overflow.left {
        frame.render_widget(
            Paragraph::new(Span::styled("‹", marker_style)),
            Rect::new(inner.x, inner.y, 1, 1),
        );
    }
    if overflow.right {
        frame.render_widget(
            Paragraph::new(Span::styled("›", marker_style)),
            Rect::new(inner.right() - 1, inner.y, 1, 1),
        );
    }

    if inner.height < 2 {
        return;
    }
    let content_area = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
    let Some(page) = level.content().and_then(|node| app.tree.page(node)) else {
        return;
    };

    let paragraph = Paragraph::new(page_lines(page, level.selected_link, theme))
        .wrap(Wrap { trim: false })
        .scroll((level.scroll, 0));
    frame.render_widget(paragraph, content_area);
}

/// Scroll frame `depth` so a freshly selected link is inside the content area.
fn reveal_selected_link(app: &mut App, depth: usize, width: u16, height: u16, theme: &Theme) {
    let Some(level) = app.tree.frames().get(depth) else {
        return;
    };
    if !level.reveal_link {
        return;
    }
    let offset = level
        .selected_link
        .zip(level.content())
        .and_then(|(link, node)| link_line_offset(app.tree.page(node)?, link, width, theme));

    let Some(level) = app.tree.frame_mut(depth) else {
        return;
    };
    level.reveal_link = false;
    if let Some(offset) = offset {
        if offset < level.scroll || offset >= level.scroll.saturating_add(height) {
            level.scroll = offset;
        }
    }
}

/// First wrapped line of the block holding `link`, for content `width` wide.
pub fn link_line_offset(page: &Page, link: usize, width: u16, theme: &Theme) -> Option<u16> {
    let block = page.block_of_link(link)?;
    let lines = page_lines(page, Some(link), theme);
    let start = block_line(page, block).min(lines.len());
    let before = Paragraph::new(lines[..start].to_vec())
        .wrap(Wrap { trim: false })
        .line_count(width);
    Some(u16::try_from(before).unwrap_or(u16::MAX))
}

/// Index of `block` in `page_lines`, counting the blank line before headings.
fn block_line(page: &Page, block: usize) -> usize {
    let spacers = page
        .blocks()
        .iter()
        .enumerate()
        .take(block + 1)
        .filter(|(index, b)| *index > 0 && matches!(b.kind, BlockKind::Heading(_)))
        .count();
    block + spacers
}

/// One line per text block, links styled, the selected link highlighted.
pub fn page_lines<'a>(page: &'a Page, selected_link: Option<usize>, theme: &Theme) -> Vec<Line<'a>> {
    let mut lines = Vec::new();
    for (index, block) in page.blocks().iter().enumerate() {
        let base = match block.kind {
            BlockKind::Heading(_) => Style::default().fg(theme.heading).add_modifier(Modifier::BOLD),
            BlockKind::Preformatted => Style::default().fg(theme.preformatted),
            BlockKind::Paragraph | BlockKind::ListItem => Style::default().fg(theme.text_default),
        };

        let mut spans = Vec::new();
        if matches!(block.kind, BlockKind::Heading(_)) && index > 0 {
            lines.push(Line::default());
        }
        if block.kind == BlockKind::ListItem {
            spans.push(Span::styled("• ", base));
        }
        for segment in &block.segments {
            match segment {
                Segment::Text(text) => spans.push(Span::styled(text.as_str(), base)),
                Segment::Link { text, link } => {
                    let style = if selected_link == Some(*link) {
                        Style::default()
                            .fg(theme.link_selected_fg)
                            .bg(theme.link_selected_bg)
                    } else {
                        base.fg(theme.link).add_modifier(Modifier::UNDERLINED)
                    };
                    spans.push(Span::styled(text.as_str(), style));
                }
            }
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn draw_status_bar(frame: &mut Frame, app: &App, area: Rect, theme: &Theme) {
    let mut spans = Vec::new();
    if app.is_loading() {
        spans.push(Span::styled(
            format!(" Loading ({})… ", app.pending_fetches()),
            Style::default().fg(theme.status_loading),
        ));
        spans.push(Span::raw("| "));
    }
    spans.push(Span::styled(
        app.ui.status_message.clone(),
        Style::default().fg(theme.status_bar_fg),
    ));

    let keys = &app.config.keybindings;
    let help_text = if app.ui.prompt.is_some() {
        "Enter: Open | Esc: Cancel".to_string()
    } else {
        format!(
            "↑↓: Level | ←→: Tab | Tab: Link | Enter: Follow | {}: Close | {}: Open | {}: Quit",
            keys.close_tab, keys.open_url, keys.quit
        )
    };
    spans.push(Span::raw(" | "));
    spans.push(Span::styled(help_text, Style::default().fg(theme.status_help_text)));

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.status_bar_bg));
    frame.render_widget(paragraph, area);
}
