//! Demo host for the viewer panel
//!
//! Plays the host side of the bridge: reads a document from disk, hands
//! it to the panel as base64, and drives the panel with the keyboard.

use std::fs::File;
use std::io::stdout;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use log::{LevelFilter, error, info};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use simplelog::{Config as LogConfig, WriteLogger};

use docpane::config::ViewerConfig;
use docpane::engine::{EngineEvent, RenderEngine, engine_channel};
use docpane::export;
use docpane::panic_handler;
use docpane::resource::{FileResourceHost, ResourceHost};
use docpane::viewer::{DocViewer, DocumentSource, ViewerCommand};
use docpane::widget::{DocPanel, ShellState};

#[derive(Parser)]
#[command(name = "docpane", about = "Terminal document viewer panel", version)]
struct Cli {
    /// Document to open (PDF or image)
    file: PathBuf,

    /// Directory downloads are saved to
    #[arg(long)]
    downloads: Option<PathBuf>,

    /// Write a debug log to this file
    #[arg(long)]
    log: Option<PathBuf>,
}

enum AppAction {
    Quit,
    Scroll(i32),
    Viewer(ViewerCommand),
    Download,
    Reload,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log {
        WriteLogger::init(LevelFilter::Debug, LogConfig::default(), File::create(path)?)?;
    }
    info!("starting docpane");
    panic_handler::initialize_panic_handler();

    let mut config = ViewerConfig::load();
    if cli.downloads.is_some() {
        config.download_dir = cli.downloads.clone();
    }

    let (events_tx, events_rx) = engine_channel();
    let engine = build_engine(events_tx);
    let host = FileResourceHost::new()?;
    let mut viewer = DocViewer::new(config.clone(), host, engine, events_rx);
    viewer.set_source(Some(load_source(&cli.file)?));

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut viewer, &config, &cli.file);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!("application error: {err:?}");
        println!("{err:?}");
    }
    info!("shutting down docpane");
    res
}

#[cfg(feature = "mupdf")]
fn build_engine(events: flume::Sender<EngineEvent>) -> Box<dyn RenderEngine> {
    Box::new(docpane::engine::MupdfEngine::new(events))
}

#[cfg(not(feature = "mupdf"))]
fn build_engine(events: flume::Sender<EngineEvent>) -> Box<dyn RenderEngine> {
    Box::new(docpane::engine::NoEngine::new(events))
}

fn load_source(path: &Path) -> Result<DocumentSource> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    info!("loaded {} ({} bytes)", filename, bytes.len());
    Ok(DocumentSource {
        base64: STANDARD.encode(&bytes),
        filename,
    })
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    viewer: &mut DocViewer<FileResourceHost>,
    config: &ViewerConfig,
    path: &Path,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    let mut shell = ShellState::new();
    let tick_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        draw_panel(terminal, viewer, &mut shell)?;

        let timeout = if shell.is_animating() {
            Duration::from_millis(16)
        } else {
            tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO)
        };
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match action_for_key(&key) {
                        Some(AppAction::Quit) => return Ok(()),
                        Some(AppAction::Scroll(delta)) => shell.scroll_by(delta),
                        Some(AppAction::Viewer(command)) => {
                            let effects = viewer.apply(command);
                            shell.handle_effects(&effects);
                        }
                        Some(AppAction::Download) => download_live(viewer, config),
                        Some(AppAction::Reload) => viewer.set_source(Some(load_source(path)?)),
                        None => {}
                    }
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            shell.advance_animation();
            last_tick = Instant::now();
        }
    }
}

fn draw_panel<B: ratatui::backend::Backend, H: ResourceHost>(
    terminal: &mut Terminal<B>,
    viewer: &mut DocViewer<H>,
    shell: &mut ShellState,
) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    viewer.poll_engine();

    let cols = terminal.size()?.width;
    viewer.set_container_width(shell.metrics.container_width(cols.saturating_sub(2)));

    terminal.draw(|f| {
        f.render_stateful_widget(DocPanel::new(&*viewer), f.area(), shell);
    })?;

    let samples = shell.visibility_samples();
    viewer.on_visibility_report(&samples);
    Ok(())
}

fn action_for_key(key: &KeyEvent) -> Option<AppAction> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(AppAction::Quit),
        KeyCode::Char('j') | KeyCode::Down => Some(AppAction::Scroll(2)),
        KeyCode::Char('k') | KeyCode::Up => Some(AppAction::Scroll(-2)),
        KeyCode::PageDown | KeyCode::Char(' ') => Some(AppAction::Scroll(20)),
        KeyCode::PageUp => Some(AppAction::Scroll(-20)),
        KeyCode::Char('h') | KeyCode::Left => Some(AppAction::Viewer(ViewerCommand::PrevPage)),
        KeyCode::Char('l') | KeyCode::Right => Some(AppAction::Viewer(ViewerCommand::NextPage)),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(AppAction::Viewer(ViewerCommand::ZoomIn)),
        KeyCode::Char('-') => Some(AppAction::Viewer(ViewerCommand::ZoomOut)),
        KeyCode::Char('0') => Some(AppAction::Viewer(ViewerCommand::ResetZoom)),
        KeyCode::Char(c @ '1'..='9') => {
            let page = c.to_digit(10).map(|d| d as usize)?;
            Some(AppAction::Viewer(ViewerCommand::GoToPage(page)))
        }
        KeyCode::Char('d') => Some(AppAction::Download),
        KeyCode::Char('r') => Some(AppAction::Reload),
        _ => None,
    }
}

fn download_live(viewer: &DocViewer<FileResourceHost>, config: &ViewerConfig) {
    let Some(request) = viewer.download() else {
        info!("nothing staged to download");
        return;
    };
    let dir = config
        .download_dir
        .clone()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    match export::save(&request, &dir) {
        Ok(path) => info!("saved download to {}", path.display()),
        Err(e) => error!("download failed: {e:#}"),
    }
}
