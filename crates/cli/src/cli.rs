use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// Cachewarm: the adaptive resource-aware prefetch engine
///
/// Cachewarm replays a trace of content accesses against a content root,
/// predicting follow-up reads per content type and prefetching them into a
/// cache while staying inside the machine's resource envelope.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub(crate) struct Cli {
    /// Path to configuration file.
    ///
    /// Missing means built-in defaults.
    #[arg(short, long, value_parser = validate_file)]
    pub(crate) conffile: Option<PathBuf>,

    /// Directory content ids are resolved against.
    #[arg(short, long, default_value = ".")]
    pub(crate) root: PathBuf,

    /// Access trace to replay: one `<id> [position]` per line, `#` comments.
    pub(crate) trace: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit.
    #[arg(long)]
    pub(crate) print_config: bool,

    #[command(flatten)]
    pub(crate) verbosity: Verbosity<WarnLevel>,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}
