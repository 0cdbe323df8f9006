use std::error::Error;
use std::io::{self, Read, Write};
use thumbkit_core::GenerationResult;
use tracing::level_filters::LevelFilter;

pub(crate) fn read_stdin() -> Result<String, io::Error> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

pub(crate) fn read_stdin_with(stdin_override: Option<&str>) -> Result<String, io::Error> {
    if let Some(value) = stdin_override {
        return Ok(value.to_string());
    }
    read_stdin()
}

/// Logs go to stderr so stdout only carries `WROTE` lines.
pub(crate) fn init_logging(level: LevelFilter) {
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Prints every written file and every failure; errors when any item failed.
pub(crate) fn report_results<W: Write, E: Write>(
    results: Vec<thumbkit_core::Result<GenerationResult>>,
    out: &mut W,
    err: &mut E,
) -> Result<usize, Box<dyn Error>> {
    let total = results.len();
    let mut failed = 0usize;
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(done) => {
                if done.was_optimized {
                    writeln!(out, "WROTE {} ({})", done.path.display(), done.title)?;
                } else {
                    writeln!(out, "WROTE {}", done.path.display())?;
                }
            }
            Err(error) => {
                failed += 1;
                writeln!(err, "ERROR: item {}: {error}", index + 1)?;
            }
        }
    }
    if failed > 0 {
        return Err(format!("{failed} of {total} thumbnails failed").into());
    }
    Ok(total)
}
