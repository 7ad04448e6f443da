//! Tracing subscriber setup driven by the `logging` config section.
//!
//! Each key of the section names a target prefix (`user_management`,
//! `api_ingress`, ...) with its own console level and optional rotating
//! JSON file. The `default` key catches every target not claimed elsewhere.

use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use file_rotate::{
    compression::Compression,
    suffix::{AppendTimestamp, FileLimit},
    ContentLimit, FileRotate,
};
use parking_lot::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::{
    filter::{FilterFn, Targets},
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    Layer, Registry,
};

const DEFAULT_SECTION: &str = "default";
const DEFAULT_MAX_SIZE_MB: u64 = 100;
const DEFAULT_MAX_BACKUPS: usize = 3;

/// `None` means the sink is switched off. Unknown names fall back to `info`.
fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        "off" | "none" => None,
        _ => Some(Level::INFO),
    }
}

/// `target == prefix` or `target` starts with `prefix::`.
fn target_matches(target: &str, prefix: &str) -> bool {
    target
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

// -------- rotating file sinks --------

type Rotating = Arc<Mutex<FileRotate<AppendTimestamp>>>;

/// Writer handed to the fmt layer; `None` swallows the record.
struct SinkWriter(Option<Rotating>);

impl Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match &self.0 {
            Some(file) => file.lock().write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &self.0 {
            Some(file) => file.lock().flush(),
            None => Ok(()),
        }
    }
}

/// Picks the file of the longest matching section prefix, else the default file.
#[derive(Clone, Default)]
struct FileRouter {
    default: Option<Rotating>,
    by_prefix: Vec<(String, Rotating)>,
}

impl FileRouter {
    fn resolve(&self, target: &str) -> Option<Rotating> {
        self.by_prefix
            .iter()
            .filter(|(prefix, _)| target_matches(target, prefix))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, file)| file.clone())
            .or_else(|| self.default.clone())
    }

    fn is_empty(&self) -> bool {
        self.default.is_none() && self.by_prefix.is_empty()
    }
}

impl<'a> fmt::MakeWriter<'a> for FileRouter {
    type Writer = SinkWriter;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(self.default.clone())
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        SinkWriter(self.resolve(meta.target()))
    }
}

/// Relative log paths live under `base_dir` (normally `server.home_dir`).
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn open_rotating(path: &Path, max_bytes: usize, max_backups: usize) -> std::io::Result<Rotating> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let rot = FileRotate::new(
        path,
        AppendTimestamp::default(FileLimit::MaxFiles(max_backups)),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );
    Ok(Arc::new(Mutex::new(rot)))
}

fn open_section_file(name: &str, section: &Section, base_dir: &Path) -> Option<Rotating> {
    if section.file.trim().is_empty() {
        return None;
    }
    let max_bytes = section.max_size_mb.unwrap_or(DEFAULT_MAX_SIZE_MB) * 1024 * 1024;
    let max_backups = section.max_backups.unwrap_or(DEFAULT_MAX_BACKUPS);
    let path = resolve_log_path(&section.file, base_dir);

    match open_rotating(&path, max_bytes as usize, max_backups) {
        Ok(file) => Some(file),
        Err(e) => {
            // no subscriber yet
            eprintln!(
                "Failed to open log file for '{name}' at {}: {e}",
                path.display()
            );
            None
        }
    }
}

// -------- plan --------

/// Levels per sink, computed from the config before any subscriber exists.
struct LoggingPlan<'a> {
    default: Option<&'a Section>,
    sections: Vec<(&'a str, &'a Section)>,
}

impl<'a> LoggingPlan<'a> {
    fn from_config(cfg: &'a LoggingConfig) -> Self {
        let mut sections: Vec<_> = cfg
            .iter()
            .filter(|(name, _)| name.as_str() != DEFAULT_SECTION)
            .map(|(name, section)| (name.as_str(), section))
            .collect();
        sections.sort_by_key(|(name, _)| *name);

        Self {
            default: cfg.get(DEFAULT_SECTION),
            sections,
        }
    }

    fn prefixes(&self) -> Vec<String> {
        self.sections.iter().map(|(n, _)| n.to_string()).collect()
    }

    /// Per-prefix filter for one sink; `level_of` selects the console or file level.
    fn targets(&self, level_of: impl Fn(&Section) -> Option<Level>) -> Targets {
        self.sections.iter().fold(
            Targets::new().with_default(LevelFilter::OFF),
            |t, (name, s)| match level_of(s) {
                Some(level) => t.with_target(*name, LevelFilter::from_level(level)),
                None => t,
            },
        )
    }

    fn file_router(&self, base_dir: &Path) -> FileRouter {
        FileRouter {
            default: self
                .default
                .and_then(|s| open_section_file(DEFAULT_SECTION, s, base_dir)),
            by_prefix: self
                .sections
                .iter()
                .filter_map(|(name, s)| {
                    open_section_file(name, s, base_dir).map(|f| (name.to_string(), f))
                })
                .collect(),
        }
    }
}

type BoxedFilter = FilterFn<Box<dyn Fn(&tracing::Metadata<'_>) -> bool + Send + Sync>>;

/// Targets outside every explicit section, up to `max_level`.
fn unclaimed_filter(prefixes: Vec<String>, max_level: Level) -> BoxedFilter {
    FilterFn::new(Box::new(move |meta: &tracing::Metadata<'_>| {
        !prefixes.iter().any(|p| target_matches(meta.target(), p)) && *meta.level() <= max_level
    }))
}

fn file_level(section: &Section) -> Option<Level> {
    if section.file.trim().is_empty() {
        None
    } else {
        parse_level(&section.file_level)
    }
}

/// Initialize the global subscriber from the `logging` section.
///
/// `base_dir` anchors relative file paths. An empty config installs a plain
/// console subscriber. Calling this twice is a no-op.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // route `log` records through tracing
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        let _ = tracing_subscriber::fmt()
            .with_target(true)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .try_init();
        return;
    }

    let plan = LoggingPlan::from_config(cfg);
    let router = plan.file_router(base_dir);
    let ansi = std::io::stdout().is_terminal();

    let console = fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(plan.targets(|s| parse_level(&s.console_level)));

    let console_default = plan
        .default
        .and_then(|s| parse_level(&s.console_level))
        .map(|level| {
            fmt::layer()
                .with_ansi(ansi)
                .with_target(true)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_filter(unclaimed_filter(plan.prefixes(), level))
        });

    let file = (!router.is_empty()).then(|| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(router.clone())
            .with_filter(plan.targets(file_level))
    });

    let file_default = match (&router.default, plan.default) {
        (Some(_), Some(section)) => file_level(section).map(|level| {
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_timer(fmt::time::UtcTime::rfc_3339())
                .with_writer(router.clone())
                .with_filter(unclaimed_filter(plan.prefixes(), level))
        }),
        _ => None,
    };

    let _ = Registry::default()
        .with(console)
        .with(console_default)
        .with(file)
        .with(file_default)
        .try_init();
}
