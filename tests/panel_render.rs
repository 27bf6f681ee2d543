use docpane::config::ViewerConfig;
use docpane::engine::{EngineEvent, RenderLoadError};
use docpane::resource::ResourceHost;
use docpane::test_utils::{RecordingHost, pdf_base64, recording_viewer};
use docpane::viewer::{DocViewer, DocumentSource, ViewerCommand};
use docpane::widget::{DocPanel, ShellState};
use ratatui::Terminal;
use ratatui::backend::TestBackend;

fn quiet_config() -> ViewerConfig {
    ViewerConfig {
        remember_zoom: false,
        ..ViewerConfig::default()
    }
}

fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
    let buf = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buf.area.height {
        for x in 0..buf.area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

/// One iteration of the host loop: size, draw, sample, report.
fn draw_cycle<H: ResourceHost>(
    terminal: &mut Terminal<TestBackend>,
    viewer: &mut DocViewer<H>,
    state: &mut ShellState,
) -> String {
    viewer.poll_engine();
    let width = terminal.size().unwrap().width.saturating_sub(2);
    viewer.set_container_width(state.metrics.container_width(width));
    terminal
        .draw(|f| {
            f.render_stateful_widget(DocPanel::new(&*viewer), f.area(), state);
        })
        .unwrap();
    let samples = state.visibility_samples();
    viewer.on_visibility_report(&samples);
    buffer_text(terminal)
}

fn pdf_source(name: &str) -> DocumentSource {
    DocumentSource {
        base64: pdf_base64(),
        filename: name.to_string(),
    }
}

fn loaded_viewer(
    pages: usize,
) -> (
    DocViewer<RecordingHost>,
    flume::Sender<EngineEvent>,
    docpane::test_utils::HostJournal,
) {
    let (mut viewer, journal, _engine, tx) = recording_viewer(quiet_config());
    viewer.set_source(Some(pdf_source("report.pdf")));
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
    (viewer, tx, journal)
}

#[test]
fn jump_command_lands_on_the_requested_page() {
    let (mut viewer, _tx, _journal) = loaded_viewer(6);
    let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
    let mut state = ShellState::new();

    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("Page 1/6"));

    let effects = viewer.apply(ViewerCommand::GoToPage(5));
    state.handle_effects(&effects);
    while state.advance_animation() {}

    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("Page 5/6"));
    assert!(text.contains(" Page 5 "));
}

#[test]
fn manual_scroll_is_adopted_without_a_scroll_effect() {
    let (mut viewer, _tx, _journal) = loaded_viewer(3);
    let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
    let mut state = ShellState::new();
    draw_cycle(&mut terminal, &mut viewer, &mut state);

    // The user drags the content; no command is involved.
    state.scroll_by(60);
    assert!(!state.is_animating());
    // The draw that samples the new window adopts the page; the footer
    // catches up on the next one.
    draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert_eq!(viewer.pagination().current_page, 2);
    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("Page 2/3"));
    // Adoption must not have moved the scroll position back.
    assert_eq!(state.scroll_row(), 60);
}

#[test]
fn zoom_past_the_container_flags_overflow() {
    let (mut viewer, _tx, _journal) = loaded_viewer(3);
    let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
    let mut state = ShellState::new();

    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("100%"));
    assert!(!text.contains('↔'));

    viewer.apply(ViewerCommand::ZoomIn);
    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("125%"));
    assert!(text.contains('↔'));
}

#[test]
fn engine_failure_is_reported_with_download_intact() {
    let (mut viewer, journal, _engine, tx) = recording_viewer(quiet_config());
    viewer.set_source(Some(pdf_source("locked.pdf")));
    tx.send(EngineEvent::Failed {
        generation: viewer.generation(),
        error: RenderLoadError::Unsupported {
            detail: "password protected".to_string(),
        },
    })
    .unwrap();

    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ShellState::new();
    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);

    assert!(text.contains("Could not display document"));
    assert!(text.contains("password protected"));
    // The footer still names the format that failed to display.
    assert!(text.contains("PDF"));
    assert_eq!(journal.live_count(), 1);
    assert!(viewer.download().is_some());
}

#[test]
fn panel_lifecycle_empty_loaded_cleared() {
    let (mut viewer, journal, _engine, tx) = recording_viewer(quiet_config());
    let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
    let mut state = ShellState::new();

    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("No document"));

    viewer.set_source(Some(pdf_source("report.pdf")));
    let generation = viewer.generation();
    tx.send(EngineEvent::Opened {
        generation,
        page_count: 2,
    })
    .unwrap();
    tx.send(EngineEvent::PageSized {
        generation,
        width: 612.0,
        height: 792.0,
    })
    .unwrap();
    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains(" Page 1 "));
    assert_eq!(journal.live_count(), 1);

    viewer.set_source(None);
    let text = draw_cycle(&mut terminal, &mut viewer, &mut state);
    assert!(text.contains("No document"));
    assert_eq!(journal.live_count(), 0);
    assert!(state.visibility_samples().is_empty());
}
