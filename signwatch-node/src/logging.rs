use anyhow::Result;
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::constants::LOG_FILE_NAME;

pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "error" => LevelFilter::Error,
        "warn" | "warning" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Info,
    }
}

/// Initialize env_logger, optionally mirroring output into `<logs_path>/signwatch.log`.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_logging(
    logs_path: Option<PathBuf>,
    logs_enabled: Option<bool>,
    log_level: Option<String>,
) -> Result<()> {
    let level_str = log_level.unwrap_or_else(|| "info".to_string());

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&level_str));
    if std::env::var_os("RUST_LOG").is_none() {
        builder.filter_level(parse_level(&level_str));
    }

    match (logs_enabled.unwrap_or(false), logs_path) {
        (true, Some(logs_dir)) => {
            std::fs::create_dir_all(&logs_dir)?;
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(logs_dir.join(LOG_FILE_NAME))?;
            builder.target(env_logger::Target::Pipe(Box::new(DualWriter::new(log_file))));
            builder.try_init()?;
            log::info!(
                "Logging to terminal and {} (level: {})",
                logs_dir.display(),
                level_str
            );
        }
        _ => {
            builder.try_init()?;
            log::debug!("Logging to terminal only (level: {})", level_str);
        }
    }

    Ok(())
}

/// Writes every line to both a file and stdout
struct DualWriter {
    file: std::fs::File,
}

impl DualWriter {
    fn new(file: std::fs::File) -> Self {
        Self { file }
    }
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        io::stdout().write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        io::stdout().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(parse_level("WARNING"), LevelFilter::Warn);
        assert_eq!(parse_level("verbose"), LevelFilter::Info);
    }
}
