// Run transcript export
// Writes the output of a run to a text file

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::services::runner::Run;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Save a run's log with a header naming the command and a closing status line.
/// Returns the number of output lines written.
pub fn write_transcript(path: &Path, run: &Run, timestamps: bool) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create transcript {}", path.display()))?;
    let mut out = BufWriter::new(file);

    render(&mut out, run, timestamps)
        .with_context(|| format!("Failed to write transcript {}", path.display()))?;
    out.flush().context("Failed to flush transcript")?;

    log::info!("Saved transcript of run {} to {}", run.id(), path.display());
    Ok(run.log().len())
}

fn render<W: Write>(out: &mut W, run: &Run, timestamps: bool) -> std::io::Result<()> {
    writeln!(out, "# Script: {}", run.script_name())?;
    writeln!(out, "# Command: {}", run.command().preview())?;
    if let Some(started) = run.started_at() {
        writeln!(out, "# Started: {}", started.format(TIME_FORMAT))?;
    }
    if run.log().dropped_lines() > 0 {
        writeln!(
            out,
            "# {} earlier lines were dropped",
            run.log().dropped_lines()
        )?;
    }
    writeln!(out)?;

    out.write_all(run.log().text(timestamps).as_bytes())?;

    writeln!(out)?;
    match run.finished_at() {
        Some(finished) => writeln!(
            out,
            "# {} at {}",
            run.status().label(),
            finished.format(TIME_FORMAT)
        )?,
        None => writeln!(out, "# {}", run.status_text())?,
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::services::command::CommandLine;
    use crate::services::runner::RunManager;
    use std::thread;
    use std::time::{Duration, Instant};
    use tempfile::TempDir;

    #[test]
    fn test_write_transcript() {
        let mut manager = RunManager::new(1);
        let mut command = CommandLine::new("sh");
        command.args = vec!["-c".into(), "echo one; echo two; exit 2".into()];
        let id = manager.submit("Echo", command, None);

        let deadline = Instant::now() + Duration::from_secs(10);
        while manager.active_count() > 0 && Instant::now() < deadline {
            manager.poll();
            thread::sleep(Duration::from_millis(20));
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.txt");
        let written = write_transcript(&path, manager.get(id).unwrap(), false).unwrap();
        assert_eq!(written, 2);

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("# Script: Echo\n# Command: sh -c \"echo one; echo two; exit 2\"\n"));
        assert!(text.contains("\none\ntwo\n"));
        assert!(text.contains("# Finished (code 2) at "));
    }

    #[test]
    fn test_write_transcript_bad_path() {
        let manager_run = {
            let mut manager = RunManager::new(1);
            let id = manager.submit("x", CommandLine::new("no-such-binary-4711"), None);
            let dir = TempDir::new().unwrap();
            let path = dir.path().join("missing").join("run.txt");
            write_transcript(&path, manager.get(id).unwrap(), false)
        };
        assert!(manager_run.is_err());
    }
}
