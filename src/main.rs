mod app;
mod config;
mod event;
mod flow;
mod focus;
mod ui;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};
use ratatui::Terminal;
use rust_embed::Embed;
use tracing::error;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Config;
use event::{AppEvent, EventHandler};
use flow::loader::{self, Issue};
use flow::step::FlowData;
use ui::components::dropdown::render_menu;
use ui::components::guide::render_guide;
use ui::components::popup::{render_confirm, render_notice, render_warning};
use ui::components::story::build_story;
use ui::hit::HitTarget;
use ui::layout::AppLayout;

#[derive(Embed)]
#[folder = "assets/flows/"]
struct FlowAssets;

#[derive(Parser)]
#[command(
    name = "stepflow",
    version,
    about = "Terminal decision-flow navigator with keypad-style controls"
)]
struct Cli {
    #[arg(short, long, help = "Flow CSV file (bundled demo when omitted)")]
    flow: Option<PathBuf>,

    #[arg(short, long, help = "Theme name")]
    theme: Option<String>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::load().unwrap_or_default();
    if let Some(theme) = cli.theme {
        config.theme = theme;
    }

    let (flow, issues, source) = load_flow(cli.flow.as_deref(), &config)?;
    let mut app = App::new(config, flow, issues, source);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = EventHandler::new(Duration::from_millis(50));

    let result = run_app(&mut terminal, &mut app, &events);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

/// Logging goes to a file under the data dir; writing to the terminal would
/// fight the UI for the screen. Enabled through RUST_LOG.
fn init_logging() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    let dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stepflow");
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    if let Ok(file) = fs::File::create(dir.join("stepflow.log")) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .try_init();
    }
}

fn load_flow(
    cli_flow: Option<&Path>,
    config: &Config,
) -> Result<(FlowData, Vec<Issue>, String)> {
    let path = cli_flow
        .map(Path::to_path_buf)
        .or_else(|| config.flow.clone().map(PathBuf::from));

    match path {
        Some(path) => {
            let (flow, issues) = loader::load_file(&path)
                .with_context(|| format!("loading flow from {}", path.display()))?;
            let source = path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            Ok((flow, issues, source))
        }
        None => {
            let text = FlowAssets::get("demo.csv")
                .and_then(|f| String::from_utf8(f.data.to_vec()).ok())
                .unwrap_or_default();
            let (flow, issues) = loader::load_str(&text);
            Ok((flow, issues, "demo".to_string()))
        }
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| render(frame, app))?;

        let now = Instant::now();
        match events.next()? {
            AppEvent::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let quit = (key.modifiers.contains(KeyModifiers::CONTROL)
                    && key.code == KeyCode::Char('c'))
                    || key.code == KeyCode::Char('q');
                if quit {
                    app.should_quit = true;
                } else if let Err(err) = app.handle_key(key, now) {
                    error!("key handling failed: {err:#}");
                    app.recover_from_fault(&format!("{err:#}"));
                }
            }
            AppEvent::Mouse(mouse) => {
                if let Err(err) = app.handle_mouse(mouse, now) {
                    error!("mouse handling failed: {err:#}");
                    app.recover_from_fault(&format!("{err:#}"));
                }
            }
            AppEvent::Tick => {
                if let Err(err) = app.tick(now) {
                    error!("timer handling failed: {err:#}");
                    app.recover_from_fault(&format!("{err:#}"));
                }
            }
            AppEvent::Resize(_, _) => {}
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn render(frame: &mut ratatui::Frame, app: &mut App) {
    let now = Instant::now();
    app.hit.clear();

    let area = frame.area();
    let colors = &app.theme.colors;

    let bg = Block::default().style(Style::default().bg(colors.bg()));
    frame.render_widget(bg, area);

    let layout = AppLayout::new(area);
    render_header(frame, app, layout.header);
    render_story(frame, app, layout.story, now);
    render_footer(frame, app, layout.footer);

    if app.focus.menu_open() {
        let rects = render_menu(
            &app.config.menu,
            &app.focus,
            app.theme,
            area,
            frame.buffer_mut(),
        );
        for (index, rect) in rects.items.into_iter().enumerate() {
            app.hit.target(rect, HitTarget::MenuItem { index }, None);
        }
        for (parent, index, rect) in rects.submenu {
            app.hit
                .target(rect, HitTarget::SubmenuItem { parent, index }, None);
        }
    }

    if app.guide_visible {
        let rects = render_guide(app.guide_pos, app.theme, area, frame.buffer_mut());
        app.hit.target(rects.handle, HitTarget::GuideHandle, None);
        app.hit.target(rects.close, HitTarget::GuideClose, None);
    }

    if app.popups.confirm_visible() {
        let rects = render_confirm(app.focus.popup_button, app.theme, area, frame.buffer_mut());
        app.hit.target(rects.yes, HitTarget::ConfirmYes, None);
        app.hit.target(rects.no, HitTarget::ConfirmNo, None);
    }

    if app.popups.warning_visible() {
        let ok = render_warning(app.theme, area, frame.buffer_mut());
        app.hit.target(ok, HitTarget::WarningOk, None);
    }

    if let Some(ref notice) = app.notice {
        let ok = render_notice(notice, app.theme, area, frame.buffer_mut());
        app.hit.target(ok, HitTarget::NoticeOk, None);
    }
}

fn render_header(frame: &mut ratatui::Frame, app: &mut App, area: Rect) {
    let colors = &app.theme.colors;

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            " stepflow ",
            Style::default()
                .fg(colors.header_fg())
                .bg(colors.header_bg())
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!(" {} ", app.flow_source),
            Style::default().fg(colors.dim()).bg(colors.header_bg()),
        ),
    ]))
    .style(Style::default().bg(colors.header_bg()));
    frame.render_widget(header, area);

    // Right-aligned controls, clickable like their page counterparts.
    let menu_label = " [7] menu ";
    let top_label = " [*] top ";
    let controls_width = (menu_label.len() + top_label.len()) as u16;
    if area.width > controls_width {
        let top_x = area.right() - controls_width;
        let menu_x = top_x + top_label.len() as u16;
        let buf = frame.buffer_mut();
        buf.set_string(
            top_x,
            area.y,
            top_label,
            Style::default().fg(colors.dim()).bg(colors.header_bg()),
        );
        buf.set_string(
            menu_x,
            area.y,
            menu_label,
            Style::default().fg(colors.accent()).bg(colors.header_bg()),
        );
        app.hit.target(
            Rect::new(top_x, area.y, top_label.len() as u16, 1),
            HitTarget::ScrollTop,
            None,
        );
        app.hit.target(
            Rect::new(menu_x, area.y, menu_label.len() as u16, 1),
            HitTarget::MenuToggle,
            None,
        );
    }
}

fn render_story(frame: &mut ratatui::Frame, app: &mut App, area: Rect, now: Instant) {
    let layout = build_story(
        &app.engine,
        &app.focus,
        app.theme,
        app.active_highlight(now),
        &app.config.highlight_terms,
        area.width,
    );
    app.resolve_scroll(&layout, area.height);

    // Story clicks are dropped while any overlay blocks the page.
    let blocked = app.popups.any_visible() || app.notice.is_some();
    let container = app.hit.container(area, None, blocked);
    for button in &layout.buttons {
        let line = button.line as u16;
        if line >= app.scroll && line < app.scroll + area.height {
            let rect = Rect::new(
                area.x + button.x,
                area.y + line - app.scroll,
                button.width.min(area.width.saturating_sub(button.x)),
                1,
            );
            app.hit.target(
                rect,
                HitTarget::StoryButton {
                    section: button.section,
                    button: button.button,
                },
                Some(container),
            );
        }
    }

    let paragraph = Paragraph::new(layout.lines).scroll((app.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut ratatui::Frame, app: &App, area: Rect) {
    let colors = &app.theme.colors;
    let steps = app.engine.history().len();
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(
            " [1-3] choose  [8/5] sections  [4/6] buttons  [7] menu  [q] quit ",
            Style::default().fg(colors.dim()),
        ),
        Span::styled(
            format!(" {steps} step{} ", if steps == 1 { "" } else { "s" }),
            Style::default().fg(colors.accent()),
        ),
    ]));
    frame.render_widget(footer, area);
}
