//! Small helpers shared by the logger and the subscriber layers.
use std::path::PathBuf;

/// Remove ANSI CSI sequences (`ESC [ ... final`) and lone escapes.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next_if_eq(&'[').is_some() {
            // Parameters and intermediates, then one final byte in `@`..=`~`.
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        } else {
            chars.next();
        }
    }
    out
}

/// Width available for summary lines: the terminal, then `$COLUMNS`, then 80.
pub(super) fn console_width() -> usize {
    terminal_size::terminal_size()
        .map(|(terminal_size::Width(w), _)| usize::from(w))
        .filter(|&w| w > 0)
        .or_else(|| {
            std::env::var("COLUMNS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&w| w > 0)
        })
        .unwrap_or(80)
}

/// Shorten `s` to `max` characters, ending with `…` when cut.
pub(super) fn fit(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut kept: String = s.chars().take(max.saturating_sub(1)).collect();
    kept.push('…');
    kept
}

/// Path of the log file for `command`: `$XDG_CACHE_HOME/workstation/<command>.log`,
/// falling back to `~/.cache`.
///
/// Creates the directory; returns `None` when that fails.
pub(super) fn log_file_path(command: &str) -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map(|home| PathBuf::from(home).join(".cache"))
        })?;
    let dir = base.join("workstation");
    std::fs::create_dir_all(&dir).ok()?;
    Some(dir.join(format!("{command}.log")))
}

/// Local wall-clock time as `HH:MM:SS`, prefixed to every file log line.
pub(super) fn clock() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

/// Header written at the top of a fresh log file.
pub(super) fn run_header(command: &str) -> String {
    let version = option_env!("WORKSTATION_VERSION")
        .unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
    let rule = "-".repeat(48);
    format!(
        "{rule}\nworkstation {version} {command} started {}\n{rule}\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S %z"),
    )
}
