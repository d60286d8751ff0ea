use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{mpsc, Mutex, OnceLock};
use chrono::Local;

static LOGGER: OnceLock<Mutex<Logger>> = OnceLock::new();

struct Logger {
    file: File,
    tui_tx: Option<mpsc::Sender<String>>,
    echo: bool,
    verbose: bool,
    prefixes: HashMap<String, u8>, // prefix -> color index
}

// Color indices for TUI rendering (mapped in ui.rs)
pub const COLOR_GRAY: u8 = 1;
pub const COLOR_BLUE: u8 = 2;
pub const COLOR_GREEN: u8 = 3;
pub const COLOR_MAGENTA: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// Initialize the global logger. Truncates `paintbot.log` in `log_dir`.
pub fn init(log_dir: &Path, verbose: bool) -> io::Result<()> {
    fs::create_dir_all(log_dir)?;
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(log_dir.join("paintbot.log"))?;

    LOGGER
        .set(Mutex::new(Logger {
            file,
            tui_tx: None,
            echo: false,
            verbose,
            prefixes: HashMap::new(),
        }))
        .ok();
    Ok(())
}

/// Wire the TUI log channel.
pub fn set_tui_sender(tx: mpsc::Sender<String>) {
    with_logger(|l| l.tui_tx = Some(tx));
}

/// Mirror plain lines to stderr (headless and stdio modes).
pub fn set_echo(echo: bool) {
    with_logger(|l| l.echo = echo);
}

pub fn set_verbose(verbose: bool) {
    with_logger(|l| l.verbose = verbose);
}

/// Register a prefix with a color. Later `*_p` calls with this prefix
/// render in that color.
pub fn register_prefix(prefix: &str, color: u8) {
    with_logger(|l| {
        l.prefixes.insert(prefix.to_string(), color);
    });
}

fn with_logger(f: impl FnOnce(&mut Logger)) {
    if let Some(logger) = LOGGER.get() {
        if let Ok(mut l) = logger.lock() {
            f(&mut l);
        }
    }
}

/// TUI lines use \x1f as field separator:
/// level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage
fn write_log(level: Level, prefix: &str, msg: &str) {
    with_logger(|l| {
        if level == Level::Debug && !l.verbose {
            return;
        }
        let ts = Local::now().format("%H:%M:%S").to_string();
        let color = l.prefixes.get(prefix).copied().unwrap_or(0);

        let file_line = if prefix.is_empty() {
            format!("[{}] [{}] {}", ts, level.as_str(), msg)
        } else {
            format!("[{}] [{}] [{}] {}", ts, level.as_str(), prefix, msg)
        };
        writeln!(l.file, "{}", file_line).ok();
        if l.echo {
            eprintln!("{}", file_line);
        }
        if let Some(tx) = &l.tui_tx {
            let tui_line = format!("{}\x1f{}\x1f{}\x1f{}\x1f{}", level.as_str(), prefix, color, ts, msg);
            tx.send(tui_line).ok();
        }
    });
}

pub fn info(msg: &str) {
    write_log(Level::Info, "", msg);
}

pub fn warn(msg: &str) {
    write_log(Level::Warn, "", msg);
}

pub fn error(msg: &str) {
    write_log(Level::Error, "", msg);
}

pub fn debug_p(prefix: &str, msg: &str) {
    write_log(Level::Debug, prefix, msg);
}

pub fn info_p(prefix: &str, msg: &str) {
    write_log(Level::Info, prefix, msg);
}

pub fn warn_p(prefix: &str, msg: &str) {
    write_log(Level::Warn, prefix, msg);
}

pub fn error_p(prefix: &str, msg: &str) {
    write_log(Level::Error, prefix, msg);
}
