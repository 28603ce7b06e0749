use anyhow::Context;
use engine::PrefetchManager;
use engine::domain::AccessMetadata;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ReplayStats {
    pub accesses: u64,
    pub scheduled: u64,
    pub skipped: u64,
}

/// Feed every access in the trace file through the manager.
///
/// Format: one access per line as `<id> [position]`; blank lines and `#`
/// comments are ignored.
pub(crate) async fn replay(
    manager: &PrefetchManager,
    root: &Path,
    trace: &Path,
) -> anyhow::Result<ReplayStats> {
    let text = tokio::fs::read_to_string(trace)
        .await
        .with_context(|| format!("reading trace {}", trace.display()))?;

    let mut stats = ReplayStats::default();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(id) = parts.next() else {
            continue;
        };
        let position = parts
            .next()
            .map(str::parse::<u64>)
            .transpose()
            .with_context(|| format!("bad position on trace line {}", lineno + 1))?;

        let size = tokio::fs::metadata(root.join(id))
            .await
            .map(|m| m.len())
            .unwrap_or(0);
        let metadata = AccessMetadata {
            name_hint: Some(id.to_string()),
            size_bytes: size,
            observed_position: position,
            total_size: (size > 0).then_some(size),
            ..Default::default()
        };

        let result = manager.record_access(id, metadata, None).await;
        debug!(
            id,
            scheduled = result.scheduled,
            skipped = result.skipped(),
            "replayed access"
        );
        stats.accesses += 1;
        stats.scheduled += result.scheduled as u64;
        stats.skipped += result.skipped() as u64;
    }
    Ok(stats)
}
