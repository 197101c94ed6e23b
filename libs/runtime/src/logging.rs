use crate::config::{LoggingConfig, Section};
use std::{
    io::{IsTerminal, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    filter::Targets,
    fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
    Registry,
};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};

const DEFAULT_SECTION: &str = "default";

// -------- level helpers --------

/// `None` means the sink is disabled.
fn parse_level(s: &str) -> Option<LevelFilter> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LevelFilter::TRACE),
        "debug" => Some(LevelFilter::DEBUG),
        "info" => Some(LevelFilter::INFO),
        "warn" => Some(LevelFilter::WARN),
        "error" => Some(LevelFilter::ERROR),
        "off" | "none" => None,
        _ => Some(LevelFilter::INFO),
    }
}

// -------- rotating writer for files --------

#[derive(Clone)]
struct RotWriter(Arc<Mutex<FileRotate<AppendCount>>>);

impl<'a> fmt::MakeWriter<'a> for RotWriter {
    type Writer = RotWriterHandle;
    fn make_writer(&'a self) -> Self::Writer {
        RotWriterHandle(self.0.clone())
    }
}

struct RotWriterHandle(Arc<Mutex<FileRotate<AppendCount>>>);

impl Write for RotWriterHandle {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0
            .lock()
            .map_err(|_| std::io::Error::other("log file writer poisoned"))?
            .flush()
    }
}

// -------- path resolution helpers --------

/// Resolve a log file path against `base_dir` (home_dir).
/// Absolute paths are kept as-is; relative paths are joined with `base_dir`.
fn resolve_log_path(file: &str, base_dir: &Path) -> PathBuf {
    let p = Path::new(file);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

/// Create a size-rotating writer, ensuring the parent directory exists.
fn create_rotating_writer_at_path(
    log_path: &Path,
    max_bytes: usize,
    max_backups: usize,
) -> std::io::Result<RotWriter> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let rot = FileRotate::new(
        log_path,
        AppendCount::new(max_backups),
        ContentLimit::BytesSurpassed(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    );

    Ok(RotWriter(Arc::new(Mutex::new(rot))))
}

fn file_writer_for(name: &str, section: &Section, base_dir: &Path) -> Option<RotWriter> {
    if section.file.trim().is_empty() {
        return None;
    }

    let max_bytes = section
        .max_size_mb
        .unwrap_or(10)
        .saturating_mul(1024 * 1024);
    let max_bytes = usize::try_from(max_bytes).unwrap_or(usize::MAX);
    let max_backups = section.max_backups.unwrap_or(3);
    let log_path = resolve_log_path(&section.file, base_dir);

    match create_rotating_writer_at_path(&log_path, max_bytes, max_backups) {
        Ok(writer) => Some(writer),
        Err(e) => {
            eprintln!(
                "Failed to init log file for '{}': {} ({})",
                name,
                log_path.to_string_lossy(),
                e
            );
            None
        }
    }
}

// -------- filters --------

/// Explicit subsystem sections, i.e. everything except "default".
fn subsystems(cfg: &LoggingConfig) -> impl Iterator<Item = (&String, &Section)> {
    cfg.iter().filter(|(k, _)| k.as_str() != DEFAULT_SECTION)
}

/// Console filter: each subsystem at its own level, everything else at the default level.
fn console_targets(cfg: &LoggingConfig) -> Targets {
    let default_level = cfg
        .get(DEFAULT_SECTION)
        .and_then(|s| parse_level(&s.console_level))
        .unwrap_or(LevelFilter::OFF);

    subsystems(cfg).fold(Targets::new().with_default(default_level), |t, (name, s)| {
        t.with_target(name.clone(), parse_level(&s.console_level).unwrap_or(LevelFilter::OFF))
    })
}

/// File filter for the default section: subsystems listed explicitly are excluded.
fn default_file_targets(cfg: &LoggingConfig, level: LevelFilter) -> Targets {
    subsystems(cfg).fold(Targets::new().with_default(level), |t, (name, _)| {
        t.with_target(name.clone(), LevelFilter::OFF)
    })
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn json_file_layer(writer: RotWriter, filter: Targets) -> BoxedLayer {
    fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(writer)
        .with_filter(filter)
        .boxed()
}

fn file_layers(cfg: &LoggingConfig, base_dir: &Path) -> Vec<BoxedLayer> {
    let mut layers = Vec::new();

    if let Some(section) = cfg.get(DEFAULT_SECTION) {
        if let Some(level) = parse_level(&section.file_level) {
            if let Some(writer) = file_writer_for(DEFAULT_SECTION, section, base_dir) {
                layers.push(json_file_layer(writer, default_file_targets(cfg, level)));
            }
        }
    }

    for (name, section) in subsystems(cfg) {
        let Some(level) = parse_level(&section.file_level) else {
            continue;
        };
        if let Some(writer) = file_writer_for(name, section, base_dir) {
            let filter = Targets::new().with_target(name.clone(), level);
            layers.push(json_file_layer(writer, filter));
        }
    }

    layers
}

// -------- public init --------

/// Initialize logging from a configuration.
/// - `cfg`: LoggingConfig containing the logging sections
/// - `base_dir`: base directory used to resolve relative log file paths (usually client.home_dir)
///
/// Console output goes to stderr; stdout belongs to command output.
/// Calling this more than once keeps the first subscriber.
pub fn init_logging_from_config(cfg: &LoggingConfig, base_dir: &Path) {
    // Bridge `log` → `tracing` *before* installing the subscriber
    let _ = tracing_log::LogTracer::init();

    if cfg.is_empty() {
        init_default_logging();
        return;
    }

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_filter(console_targets(cfg))
        .boxed();

    let mut layers = vec![console_layer];
    layers.extend(file_layers(cfg, base_dir));

    let _ = Registry::default().with(layers).try_init();
}

fn init_default_logging() {
    let _ = fmt()
        .with_writer(std::io::stderr)
        .with_max_level(LevelFilter::WARN)
        .with_target(true)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .try_init();
}

// =================== tests ===================
