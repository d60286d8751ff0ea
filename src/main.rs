use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result, bail};
use crossterm::{
    execute,
    event::{EnableMouseCapture, DisableMouseCapture},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{Terminal, backend::CrosstermBackend};

use paintbot_core::dispatch::Request;
use paintbot_core::perception::{build_prompt, FactsSource, LocalFacts};
use paintbot_core::platform::create_platform;
use paintbot_core::settings::Settings;
use paintbot_core::sleep::SystemClock;
use paintbot_core::types::{ActionResult, ActionStep, ColorName, Command};
use paintbot_core::{logger, orchestrator, plan, ActionEngine, SessionContext};

enum Mode {
    Tui,
    Headless { text: String, color: Option<String> },
    PlanFile(PathBuf),
    Stdio,
}

struct Args {
    force_stub: bool,
    settings_path: Option<PathBuf>,
    write_settings: bool,
    close_after: bool,
    mode: Mode,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        force_stub: false,
        settings_path: None,
        write_settings: false,
        close_after: false,
        mode: Mode::Tui,
    };
    let mut text = None;
    let mut color = None;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--stub" => args.force_stub = true,
            "--close" => args.close_after = true,
            "--write-settings" => args.write_settings = true,
            "--stdio" => args.mode = Mode::Stdio,
            "--settings" => args.settings_path = Some(it.next().context("--settings needs a path")?.into()),
            "--plan" => args.mode = Mode::PlanFile(it.next().context("--plan needs a file")?.into()),
            "--text" => text = Some(it.next().context("--text needs a value")?),
            "--color" => color = Some(it.next().context("--color needs a value")?),
            other => bail!("unknown argument: {}", other),
        }
    }
    if let Some(text) = text {
        if matches!(args.mode, Mode::Tui) {
            args.mode = Mode::Headless { text, color };
        }
    }
    Ok(args)
}

fn report(result: &ActionResult) {
    println!("Done: {} - {}", result.success, result.message);
}

fn run_plan_file(engine: &mut ActionEngine, path: &Path) -> Result<()> {
    let json = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let steps: Vec<ActionStep> = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    let mut session = SessionContext::new();
    report(&engine.execute(&mut session, &steps));
    Ok(())
}

fn run_headless(engine: &mut ActionEngine, text: &str, color: Option<&str>, close_after: bool) -> Result<()> {
    let color = match color {
        Some(c) => c.parse::<ColorName>().map_err(anyhow::Error::msg)?,
        None => ColorName::Red,
    };
    let facts = LocalFacts.extract(&build_prompt(text, color))?;
    let steps = plan::build_plan(&facts, close_after);
    let mut session = SessionContext::new();
    report(&engine.execute(&mut session, &steps));
    Ok(())
}

/// One JSON request per stdin line, one status line per request on stdout.
fn run_stdio(engine: &mut ActionEngine) -> Result<()> {
    let mut session = SessionContext::new();
    let stdout = io::stdout();
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let status = match Request::parse(&line) {
            Ok(request) => engine.dispatch(&mut session, &request),
            Err(e) => e,
        };
        let mut out = stdout.lock();
        writeln!(out, "{}", status)?;
        out.flush()?;
    }
    Ok(())
}

fn run_tui(engine: ActionEngine) -> Result<()> {
    let worker = orchestrator::spawn(engine);

    // Wire logger to TUI
    let (log_tx, log_rx) = mpsc::channel::<String>();
    logger::set_tui_sender(log_tx);
    logger::info("paintbot started");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = paintbot_tui::App::new(Arc::clone(&worker.status), log_rx, worker.commands.clone());
    let result = paintbot_tui::event::run(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    // Stop the worker even when the event loop bailed out
    worker.commands.send(Command::Quit).ok();
    worker.handle.join().ok();
    result
}

fn main() -> Result<()> {
    let args = parse_args()?;

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings_path = args.settings_path.clone().unwrap_or_else(|| cwd.join("settings.json"));

    logger::init(&cwd.join("logs"), false).context("cannot open log file")?;
    if !matches!(args.mode, Mode::Tui) || args.write_settings {
        logger::set_echo(true);
    }
    let settings = Settings::load(&settings_path);
    logger::set_verbose(settings.verbose);
    logger::info(&format!("settings from {}", settings_path.display()));

    // Dump the effective calibration so it can be edited by hand
    if args.write_settings {
        settings
            .save(&settings_path)
            .with_context(|| format!("writing {}", settings_path.display()))?;
        logger::info(&format!("wrote {}", settings_path.display()));
        return Ok(());
    }

    let platform = create_platform(args.force_stub);
    let mut engine = ActionEngine::new(platform, settings, Arc::new(SystemClock))?;

    match args.mode {
        Mode::Tui => run_tui(engine),
        Mode::Headless { text, color } => run_headless(&mut engine, &text, color.as_deref(), args.close_after),
        Mode::PlanFile(path) => run_plan_file(&mut engine, &path),
        Mode::Stdio => run_stdio(&mut engine),
    }
}
