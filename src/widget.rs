//! Panel presentation
//!
//! Ratatui shell around the viewer core. Draws phase-appropriate chrome
//! (empty hint, loading notice, error body, page frames, image frame)
//! plus a footer status line, and owns the scroll state: smooth scrolling
//! toward a target offset and the per-draw visibility sampling the
//! tracker feeds on. Page pixels are the engine's business, not ours;
//! frames mark where pages sit.

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, StatefulWidget, Widget};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::decode::ContentCategory;
use crate::pagination::PageVisibility;
use crate::resource::ResourceHost;
use crate::viewer::{DocViewer, DocumentState, ViewerEffect};

/// Fraction of the remaining distance covered per animation tick
const SCROLL_EASING: f32 = 0.3;

/// Terminal cell footprint in layout px, used to map page geometry to
/// rows and columns
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellMetrics {
    pub width_px: u16,
    pub height_px: u16,
}

impl Default for CellMetrics {
    fn default() -> Self {
        Self {
            width_px: 8,
            height_px: 16,
        }
    }
}

impl CellMetrics {
    /// Container width in layout px for a body that many cells wide
    pub fn container_width(&self, cells: u16) -> f32 {
        f32::from(cells) * f32::from(self.width_px)
    }
}

/// Row layout of the rendered content, refreshed on every draw
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct PageLayout {
    /// Rows one page occupies
    page_rows: u32,
    /// Columns one page occupies
    page_cols: u16,
    /// Blank rows between pages
    gap_rows: u32,
    /// Pages laid out; 0 for unpaginated content
    page_count: usize,
    /// Rows the body area offers
    viewport_rows: u32,
    /// Total content height in rows
    content_rows: u32,
}

impl PageLayout {
    /// Top row of a 1-based page
    fn page_top(&self, page: usize) -> u32 {
        (page.saturating_sub(1)) as u32 * (self.page_rows + self.gap_rows)
    }
}

/// Scroll and layout state owned by the shell
#[derive(Clone, Debug, Default)]
pub struct ShellState {
    pub metrics: CellMetrics,
    current_offset: f32,
    target_offset: f32,
    layout: PageLayout,
}

impl ShellState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scroll offset in whole rows
    pub fn scroll_row(&self) -> u32 {
        self.current_offset.round().max(0.0) as u32
    }

    /// Immediate scroll by a row delta, clamped to the content
    pub fn scroll_by(&mut self, delta: i32) {
        let next = self.current_offset + delta as f32;
        self.current_offset = next.clamp(0.0, self.max_scroll());
        self.target_offset = self.current_offset;
    }

    /// Smooth scroll so the page ends up centered in the viewport
    pub fn scroll_to_page(&mut self, page: usize) {
        let top = self.layout.page_top(page) as f32;
        let center = top + self.layout.page_rows as f32 / 2.0;
        let target = center - self.layout.viewport_rows as f32 / 2.0;
        self.target_offset = target.clamp(0.0, self.max_scroll());
    }

    /// Execute viewer effects
    pub fn handle_effects(&mut self, effects: &[ViewerEffect]) {
        for effect in effects {
            match effect {
                ViewerEffect::ScrollToPage(page) => self.scroll_to_page(*page),
            }
        }
    }

    pub fn is_animating(&self) -> bool {
        self.current_offset != self.target_offset
    }

    /// One animation tick toward the target. Returns whether the offset
    /// moved and a redraw is needed.
    pub fn advance_animation(&mut self) -> bool {
        let delta = self.target_offset - self.current_offset;
        if delta == 0.0 {
            return false;
        }
        if delta.abs() < 0.5 {
            self.current_offset = self.target_offset;
        } else {
            self.current_offset += delta * SCROLL_EASING;
        }
        true
    }

    /// Visibility ratio per page for the current scroll window, ordered
    /// by page number. Pages outside the window are omitted.
    pub fn visibility_samples(&self) -> Vec<PageVisibility> {
        if self.layout.page_count == 0 || self.layout.page_rows == 0 {
            return vec![];
        }
        let win_start = self.current_offset.max(0.0);
        let win_end = win_start + self.layout.viewport_rows as f32;
        let mut samples = Vec::new();
        for page in 1..=self.layout.page_count {
            let top = self.layout.page_top(page) as f32;
            let bottom = top + self.layout.page_rows as f32;
            let overlap = bottom.min(win_end) - top.max(win_start);
            if overlap > 0.0 {
                samples.push(PageVisibility {
                    page,
                    ratio: overlap / self.layout.page_rows as f32,
                });
            }
        }
        samples
    }

    fn max_scroll(&self) -> f32 {
        self.layout
            .content_rows
            .saturating_sub(self.layout.viewport_rows) as f32
    }

    fn clamp_offsets(&mut self) {
        let max = self.max_scroll();
        self.current_offset = self.current_offset.clamp(0.0, max);
        self.target_offset = self.target_offset.clamp(0.0, max);
    }
}

/// The viewer panel as a stateful widget
pub struct DocPanel<'a, H: ResourceHost> {
    viewer: &'a DocViewer<H>,
}

impl<'a, H: ResourceHost> DocPanel<'a, H> {
    #[must_use]
    pub fn new(viewer: &'a DocViewer<H>) -> Self {
        Self { viewer }
    }
}

impl<H: ResourceHost> StatefulWidget for DocPanel<'_, H> {
    type State = ShellState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut ShellState) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height < 2 || inner.width < 4 {
            return;
        }
        let [body, footer] =
            Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(inner);

        match self.viewer.state() {
            DocumentState::Empty => {
                state.layout = PageLayout::default();
                centered_line(body, buf, "No document", Style::default().fg(Color::DarkGray));
            }
            DocumentState::Loading { category, filename } => {
                state.layout = PageLayout::default();
                render_loading(body, buf, category, &filename);
            }
            DocumentState::Error { reason } => {
                state.layout = PageLayout::default();
                render_error(body, buf, &reason);
            }
            DocumentState::Loaded { category, .. } if category.is_paginated() => {
                render_pages(self.viewer, body, buf, state);
            }
            DocumentState::Loaded { .. } => {
                render_image(self.viewer, body, buf, state);
            }
        }

        render_footer(self.viewer, footer, buf);
    }
}

fn render_loading(body: Rect, buf: &mut Buffer, category: ContentCategory, filename: &str) {
    let name = truncate_to_width(filename, body.width.saturating_sub(12) as usize);
    let lines = vec![
        Line::from(format!("Opening {name}")),
        Line::from(Span::styled(
            category.label(),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let top = body.height / 2;
    let rect = Rect {
        x: body.x,
        y: body.y + top.saturating_sub(1),
        width: body.width,
        height: 2.min(body.height),
    };
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(rect, buf);
}

fn render_error(body: Rect, buf: &mut Buffer, reason: &str) {
    let width = body.width.saturating_sub(4).max(10) as usize;
    let mut lines = vec![
        Line::from(Span::styled(
            "Could not display document",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    for wrapped in textwrap::wrap(reason, width) {
        lines.push(Line::from(wrapped.into_owned()));
    }
    let rect = Rect {
        x: body.x + 2,
        y: body.y + 1.min(body.height.saturating_sub(1)),
        width: body.width.saturating_sub(4),
        height: body.height.saturating_sub(1),
    };
    Paragraph::new(lines).render(rect, buf);
}

fn render_pages<H: ResourceHost>(
    viewer: &DocViewer<H>,
    body: Rect,
    buf: &mut Buffer,
    state: &mut ShellState,
) {
    let layout = paginated_layout(viewer, body, state.metrics);
    state.layout = layout;
    state.clamp_offsets();

    let scroll = state.scroll_row();
    let current = viewer.pagination().current_page;
    for page in 1..=layout.page_count {
        let top = layout.page_top(page) as i64 - scroll as i64;
        let bottom = top + layout.page_rows as i64;
        if bottom <= 0 || top >= body.height as i64 {
            continue;
        }
        let y0 = top.max(0) as u16;
        let visible_rows = (bottom.min(body.height as i64) - y0 as i64).max(0) as u16;
        if visible_rows == 0 {
            continue;
        }
        let width = layout.page_cols.min(body.width);
        let x = body.x + (body.width - width) / 2;
        let rect = Rect {
            x,
            y: body.y + y0,
            width,
            height: visible_rows,
        };
        let style = if page == current {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(style)
            .title(format!(" Page {page} "))
            .render(rect, buf);
    }
}

fn render_image<H: ResourceHost>(
    viewer: &DocViewer<H>,
    body: Rect,
    buf: &mut Buffer,
    state: &mut ShellState,
) {
    let layout = image_layout(viewer, body, state.metrics);
    state.layout = layout;
    state.clamp_offsets();

    let scroll = state.scroll_row();
    let lead = layout.viewport_rows.saturating_sub(layout.content_rows) / 2;
    let top = lead as i64 - scroll as i64;
    let bottom = top + layout.page_rows as i64;
    if bottom <= 0 || top >= body.height as i64 {
        return;
    }
    let y0 = top.max(0) as u16;
    let visible_rows = (bottom.min(body.height as i64) - y0 as i64).max(0) as u16;
    let width = layout.page_cols.min(body.width);
    let x = body.x + (body.width - width) / 2;
    let rect = Rect {
        x,
        y: body.y + y0,
        width,
        height: visible_rows,
    };
    let title = viewer
        .filename()
        .map(|name| format!(" {} ", truncate_to_width(name, width.saturating_sub(4) as usize)))
        .unwrap_or_default();
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title)
        .render(rect, buf);

    let viewport = viewer.viewport();
    if viewport.has_page() && visible_rows >= 3 {
        let label = format!(
            "{} × {} px",
            viewport.page_width as u32, viewport.page_height as u32
        );
        let label_rect = Rect {
            x: rect.x + 1,
            y: rect.y + visible_rows / 2,
            width: rect.width.saturating_sub(2),
            height: 1,
        };
        Paragraph::new(Line::from(Span::styled(
            label,
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
        .render(label_rect, buf);
    }
}

fn paginated_layout<H: ResourceHost>(
    viewer: &DocViewer<H>,
    body: Rect,
    metrics: CellMetrics,
) -> PageLayout {
    let viewport = viewer.viewport();
    let scale = viewer.display_scale();
    let (page_rows, page_cols) = if viewport.has_page() {
        let rows = ((viewport.page_height * scale) / f32::from(metrics.height_px))
            .round()
            .max(3.0) as u32;
        let cols = ((viewport.page_width * scale) / f32::from(metrics.width_px))
            .round()
            .max(10.0) as u16;
        (rows, cols)
    } else {
        // No geometry yet; one page per screen keeps the panel usable.
        (u32::from(body.height.max(3)), body.width.saturating_sub(4).max(10))
    };
    let page_count = viewer.pagination().page_count;
    let gap_rows = 1;
    let content_rows = if page_count == 0 {
        0
    } else {
        page_count as u32 * page_rows + (page_count as u32 - 1) * gap_rows
    };
    PageLayout {
        page_rows,
        page_cols,
        gap_rows,
        page_count,
        viewport_rows: u32::from(body.height),
        content_rows,
    }
}

fn image_layout<H: ResourceHost>(
    viewer: &DocViewer<H>,
    body: Rect,
    metrics: CellMetrics,
) -> PageLayout {
    let viewport = viewer.viewport();
    let scale = viewer.display_scale();
    let (rows, cols) = if viewport.has_page() {
        let rows = ((viewport.page_height * scale) / f32::from(metrics.height_px))
            .round()
            .max(3.0) as u32;
        let cols = ((viewport.page_width * scale) / f32::from(metrics.width_px))
            .round()
            .max(10.0) as u16;
        (rows, cols)
    } else {
        (
            u32::from(body.height.saturating_sub(2).max(3)),
            body.width.saturating_sub(4).max(10),
        )
    };
    PageLayout {
        page_rows: rows,
        page_cols: cols,
        gap_rows: 0,
        page_count: 0,
        viewport_rows: u32::from(body.height),
        content_rows: rows,
    }
}

fn render_footer<H: ResourceHost>(viewer: &DocViewer<H>, area: Rect, buf: &mut Buffer) {
    let mut right_parts: Vec<String> = Vec::new();
    match viewer.state() {
        DocumentState::Loaded {
            category,
            page_count,
            current_page,
            ..
        } => {
            right_parts.push(category.label().to_string());
            if page_count > 0 {
                right_parts.push(format!("Page {current_page}/{page_count}"));
            }
            right_parts.push(format!("{}%", viewer.zoom().percent()));
            if viewer.horizontal_overflow() {
                right_parts.push("↔".to_string());
            }
        }
        DocumentState::Loading { .. } => right_parts.push("loading".to_string()),
        DocumentState::Error { .. } => {
            // The failure snapshot carries no category; ask the viewer.
            if let Some(category) = viewer.category() {
                right_parts.push(category.label().to_string());
            }
        }
        DocumentState::Empty => {}
    }
    let right = right_parts.join(" · ");
    let right_width = right.width();

    let left_budget = (area.width as usize).saturating_sub(right_width + 1);
    let left = viewer
        .filename()
        .map(|name| truncate_to_width(name, left_budget))
        .unwrap_or_default();

    let pad = (area.width as usize)
        .saturating_sub(left.width())
        .saturating_sub(right_width);
    let line = Line::from(vec![
        Span::raw(left),
        Span::raw(" ".repeat(pad)),
        Span::styled(right, Style::default().fg(Color::DarkGray)),
    ]);
    Paragraph::new(line).render(area, buf);
}

fn centered_line(body: Rect, buf: &mut Buffer, text: &str, style: Style) {
    let rect = Rect {
        x: body.x,
        y: body.y + body.height / 2,
        width: body.width,
        height: 1.min(body.height),
    };
    Paragraph::new(Line::from(Span::styled(text.to_string(), style)))
        .alignment(Alignment::Center)
        .render(rect, buf);
}

/// Truncate to a display width, appending an ellipsis when shortened
fn truncate_to_width(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ViewerConfig;
    use crate::engine::{EngineEvent, RenderLoadError};
    use crate::test_utils::{pdf_base64, png_base64_with_size, recording_viewer};
    use crate::viewer::DocumentSource;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn quiet_config() -> ViewerConfig {
        ViewerConfig {
            remember_zoom: false,
            ..ViewerConfig::default()
        }
    }

    fn buffer_text(buf: &Buffer) -> String {
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    fn draw<H: ResourceHost>(
        viewer: &DocViewer<H>,
        state: &mut ShellState,
        width: u16,
        height: u16,
    ) -> String {
        let backend = TestBackend::new(width, height);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| {
                f.render_stateful_widget(DocPanel::new(viewer), f.area(), state);
            })
            .unwrap();
        buffer_text(terminal.backend().buffer())
    }

    fn loaded_pdf_viewer(
        pages: usize,
    ) -> (
        crate::viewer::DocViewer<crate::test_utils::RecordingHost>,
        ShellState,
    ) {
        let (mut viewer, _journal, _engine, tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: pdf_base64(),
            filename: "report.pdf".to_string(),
        }));
        let generation = viewer.generation();
        tx.send(EngineEvent::Opened {
            generation,
            page_count: pages,
        })
        .unwrap();
        tx.send(EngineEvent::PageSized {
            generation,
            width: 612.0,
            height: 792.0,
        })
        .unwrap();
        viewer.poll_engine();
        let state = ShellState::new();
        viewer.set_container_width(state.metrics.container_width(78));
        (viewer, state)
    }

    #[test]
    fn empty_panel_shows_hint() {
        let (viewer, _journal, _engine, _tx) = recording_viewer(quiet_config());
        let mut state = ShellState::new();
        let text = draw(&viewer, &mut state, 40, 10);
        assert!(text.contains("No document"));
    }

    #[test]
    fn loading_panel_names_the_document() {
        let (mut viewer, _journal, _engine, _tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: pdf_base64(),
            filename: "report.pdf".to_string(),
        }));
        let mut state = ShellState::new();
        let text = draw(&viewer, &mut state, 60, 12);
        assert!(text.contains("Opening report.pdf"));
        assert!(text.contains("loading"));
    }

    #[test]
    fn error_panel_shows_the_reason() {
        let (mut viewer, _journal, _engine, _tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: "!!! garbage".to_string(),
            filename: "bad.pdf".to_string(),
        }));
        let mut state = ShellState::new();
        let text = draw(&viewer, &mut state, 60, 12);
        assert!(text.contains("Could not display document"));
        assert!(text.contains("decode"));
        // Classification never got anywhere, so no format label either.
        assert!(!text.contains("PDF"));
    }

    #[test]
    fn failed_render_footer_keeps_the_format_label() {
        let (mut viewer, _journal, _engine, tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: pdf_base64(),
            filename: "locked.pdf".to_string(),
        }));
        tx.send(EngineEvent::Failed {
            generation: viewer.generation(),
            error: RenderLoadError::Unsupported {
                detail: "encrypted".into(),
            },
        })
        .unwrap();
        viewer.poll_engine();

        let mut state = ShellState::new();
        let text = draw(&viewer, &mut state, 60, 12);
        assert!(text.contains("Could not display document"));
        assert!(text.contains("PDF"));
    }

    #[test]
    fn loaded_panel_draws_frames_and_footer() {
        let (viewer, mut state) = loaded_pdf_viewer(3);
        let text = draw(&viewer, &mut state, 80, 30);
        assert!(text.contains(" Page 1 "));
        assert!(text.contains("report.pdf"));
        assert!(text.contains("PDF · Page 1/3 · 100%"));
    }

    #[test]
    fn visibility_samples_follow_the_scroll_window() {
        let (mut viewer, mut state) = loaded_pdf_viewer(3);
        draw(&viewer, &mut state, 80, 30);

        let samples = state.visibility_samples();
        assert_eq!(samples.first().map(|s| s.page), Some(1));

        state.scroll_by(60);
        let samples = state.visibility_samples();
        let dominant = samples
            .iter()
            .cloned()
            .max_by(|a, b| a.ratio.total_cmp(&b.ratio))
            .unwrap();
        assert_eq!(dominant.page, 2);

        viewer.on_visibility_report(&samples);
        assert_eq!(viewer.pagination().current_page, 2);
        let text = draw(&viewer, &mut state, 80, 30);
        assert!(text.contains("Page 2/3"));
    }

    #[test]
    fn scroll_to_page_effect_animates_to_the_target() {
        let (mut viewer, mut state) = loaded_pdf_viewer(3);
        draw(&viewer, &mut state, 80, 30);

        let effects = viewer.apply(crate::viewer::ViewerCommand::GoToPage(3));
        state.handle_effects(&effects);
        assert!(state.is_animating());
        while state.advance_animation() {}
        assert!(!state.is_animating());

        let samples = state.visibility_samples();
        let dominant = samples
            .iter()
            .cloned()
            .max_by(|a, b| a.ratio.total_cmp(&b.ratio))
            .unwrap();
        assert_eq!(dominant.page, 3);
    }

    #[test]
    fn image_panel_draws_one_frame_with_dimensions() {
        let (mut viewer, _journal, _engine, _tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: png_base64_with_size(640, 480),
            filename: "chart.png".to_string(),
        }));
        let mut state = ShellState::new();
        viewer.set_container_width(state.metrics.container_width(78));
        let text = draw(&viewer, &mut state, 80, 36);
        assert!(text.contains("chart.png"));
        assert!(text.contains("640 × 480 px"));
        assert!(text.contains("PNG · 100%"));
        assert!(state.visibility_samples().is_empty());
    }

    #[test]
    fn footer_truncates_long_filenames() {
        let (mut viewer, _journal, _engine, _tx) = recording_viewer(quiet_config());
        viewer.set_source(Some(DocumentSource {
            base64: png_base64_with_size(64, 48),
            filename: "a-very-long-filename-that-cannot-possibly-fit-here.png".to_string(),
        }));
        let mut state = ShellState::new();
        let text = draw(&viewer, &mut state, 30, 10);
        assert!(text.contains('…'));
    }

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        let cut = truncate_to_width("a-long-filename.pdf", 8);
        assert!(cut.ends_with('…'));
        assert!(cut.width() <= 8);
    }
}
