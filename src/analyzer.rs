//! # Audio Analyzer Module
//!
//! Tempo and key detection is delegated to an external program. Segue only
//! defines the seam ([`Analyzer`]) and a subprocess-backed implementation
//! ([`CommandAnalyzer`]) that runs a detector, enforces a timeout and parses
//! its JSON output.
//!
//! ## Output Protocol
//!
//! The analyzer program is invoked as `<program> <args...> <audio file>` and
//! must print a single JSON object to stdout:
//!
//! ```text
//! {"tempo": 127.8, "key": "Bb", "scale": "minor"}
//! ```
//!
//! A non-zero exit status, unparsable output, a non-positive tempo or a
//! timeout are all reported as errors for that one file.

use crate::key::Scale;
use crate::song::TrackFeatures;
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, trace};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

/// Detection script used when no analyzer arguments are configured.
/// Needs `essentia` and `librosa` in the target Python environment.
pub const DEFAULT_ANALYZER_SCRIPT: &str = r#"
import json
import sys

import essentia.standard as es
import librosa
import numpy as np

path = sys.argv[1]
audio = es.MonoLoader(filename=path)()
key, scale, _strength = es.KeyExtractor()(audio)

y, sr = librosa.load(path, duration=60)
tempo, _ = librosa.beat.beat_track(y=y, sr=sr)
tempo = float(np.mean(tempo)) if isinstance(tempo, np.ndarray) else float(tempo)

json.dump({"tempo": tempo, "key": key, "scale": scale}, sys.stdout)
"#;

/// Something that can extract tempo and key from an audio file.
///
/// Implementations may fail for corrupt or unsupported files. Callers treat
/// a failure as "skip this file", never as fatal for a batch.
pub trait Analyzer {
    /// Analyze the audio file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be decoded or analyzed.
    fn analyze(&self, path: &Path) -> Result<TrackFeatures>;
}

/// Raw analyzer output.
#[derive(Debug, Deserialize)]
struct AnalyzerOutput {
    tempo: f64,
    key: String,
    scale: String,
}

/// Runs an external detector as a child process.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandAnalyzer {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// `program -c <DEFAULT_ANALYZER_SCRIPT>`, for a Python interpreter.
    pub fn python(program: impl Into<String>, timeout: Duration) -> Self {
        Self::new(
            program,
            vec!["-c".to_string(), DEFAULT_ANALYZER_SCRIPT.to_string()],
            timeout,
        )
    }

    /// Spawn the child and wait for it, killing its whole process group
    /// once `self.timeout` elapses. Returns captured stdout.
    fn run(&self, path: &Path) -> Result<Vec<u8>> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Wrapper scripts fork; the group lets a timeout reach them all.
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to start analyzer `{}'", self.program))?;

        let stdout_pipe = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Analyzer stdout was not captured"))?;
        let stderr_pipe = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Analyzer stderr was not captured"))?;

        // Drain both pipes on helper threads so a chatty child can't block
        // on a full pipe while we poll for exit.
        let stdout_rx = drain(stdout_pipe);
        let stderr_rx = drain(stderr_pipe);

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if start.elapsed() > self.timeout => {
                    kill_process_group(&mut child);
                    bail!(
                        "Analyzer timed out after {}s for {}",
                        self.timeout.as_secs_f64(),
                        path.display()
                    );
                }
                Ok(None) => thread::sleep(POLL_INTERVAL),
                Err(err) => {
                    kill_process_group(&mut child);
                    return Err(err).context("Failed to wait for analyzer process");
                }
            }
        };

        // Anything the analyzer left running in the background would keep
        // the pipes open. Reads stay bounded in case one escaped the group.
        signal_process_group(child.id());
        let grace = self.timeout.saturating_sub(start.elapsed()).max(PIPE_GRACE);
        let stdout = stdout_rx.recv_timeout(grace).unwrap_or_default();
        let stderr = stderr_rx.recv_timeout(PIPE_GRACE).unwrap_or_default();

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).trim().to_string();
            bail!(
                "Analyzer exited with {status} for {}: {}",
                path.display(),
                if stderr.is_empty() { "(no stderr output)" } else { stderr.as_str() }
            );
        }

        trace!("Analyzer finished in {:?} for {}", start.elapsed(), path.display());
        Ok(stdout)
    }
}

const POLL_INTERVAL: Duration = Duration::from_millis(25);
/// How long to wait for pipe EOF after the analyzer itself has exited.
const PIPE_GRACE: Duration = Duration::from_millis(500);

/// Read `pipe` to EOF on a helper thread.
fn drain<R: Read + Send + 'static>(mut pipe: R) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(buf);
    });
    rx
}

/// SIGKILL every process in the group led by `pid`.
#[cfg(unix)]
fn signal_process_group(pid: u32) {
    if let Ok(pgid) = libc::pid_t::try_from(pid) {
        // The analyzer leads its own group, see `process_group(0)`.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn signal_process_group(_pid: u32) {}

/// Kill the analyzer and everything it spawned, then reap it.
fn kill_process_group(child: &mut Child) {
    signal_process_group(child.id());
    let _ = child.kill();
    let _ = child.wait();
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, path: &Path) -> Result<TrackFeatures> {
        debug!("Analyzing {}", path.display());
        let stdout = self.run(path)?;
        parse_analyzer_output(&stdout)
            .with_context(|| format!("Invalid analyzer output for {}", path.display()))
    }
}

/// Parse the analyzer's JSON stdout into features.
fn parse_analyzer_output(stdout: &[u8]) -> Result<TrackFeatures> {
    let text = std::str::from_utf8(stdout).context("Analyzer stdout was not valid UTF-8")?;
    let text = text.trim();
    if text.is_empty() {
        bail!("Analyzer stdout was empty");
    }

    let output: AnalyzerOutput =
        serde_json::from_str(text).context("Failed to parse analyzer JSON output")?;

    if !output.tempo.is_finite() || output.tempo <= 0.0 {
        bail!("Analyzer reported invalid tempo {}", output.tempo);
    }
    let scale: Scale = output.scale.parse()?;

    Ok(TrackFeatures::new(output.tempo, &output.key, scale))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_output() {
        let features =
            parse_analyzer_output(br#"  {"tempo": 127.5, "key": "Eb", "scale": "minor"} "#).unwrap();
        assert_eq!(features.tempo(), 127.5);
        assert_eq!(features.key(), "D#");
        assert_eq!(features.harmonic_code().to_string(), "2A");
    }

    #[test]
    fn test_parse_rejects_bad_output() {
        assert!(parse_analyzer_output(b"").is_err());
        assert!(parse_analyzer_output(b"not json").is_err());
        assert!(parse_analyzer_output(br#"{"tempo": 0, "key": "C", "scale": "major"}"#).is_err());
        assert!(parse_analyzer_output(br#"{"tempo": -3.0, "key": "C", "scale": "major"}"#).is_err());
        assert!(parse_analyzer_output(br#"{"tempo": 120, "key": "C", "scale": "lydian"}"#).is_err());
        assert!(parse_analyzer_output(br#"{"tempo": 120, "key": "C"}"#).is_err());
    }

    #[cfg(unix)]
    fn sh(script: &str, timeout: Duration) -> CommandAnalyzer {
        // `sh -c <script> sh <file>` exposes the audio path as $1.
        CommandAnalyzer::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "sh".to_string()],
            timeout,
        )
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_reads_stdout() {
        let analyzer = sh(
            r#"printf '{"tempo": 98.0, "key": "Ab", "scale": "major"}'"#,
            Duration::from_secs(10),
        );
        let features = analyzer.analyze(Path::new("/tmp/whatever.mp3")).unwrap();
        assert_eq!(features.key(), "G#");
        assert_eq!(features.harmonic_code().to_string(), "4B");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_passes_file_path() {
        let analyzer = sh(
            r#"case "$1" in *song.wav) printf '{"tempo": 120, "key": "C", "scale": "major"}';; *) exit 3;; esac"#,
            Duration::from_secs(10),
        );
        assert!(analyzer.analyze(Path::new("/music/song.wav")).is_ok());
        assert!(analyzer.analyze(Path::new("/music/other.mp3")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_failure_status() {
        let analyzer = sh("echo broken >&2; exit 1", Duration::from_secs(10));
        let err = analyzer.analyze(Path::new("x.mp3")).unwrap_err();
        assert!(format!("{err:#}").contains("broken"));
    }

    #[cfg(unix)]
    #[test]
    fn test_command_analyzer_timeout() {
        let analyzer = sh("exec sleep 5", Duration::from_millis(100));
        let start = Instant::now();
        let err = analyzer.analyze(Path::new("x.mp3")).unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_forked_children() {
        // No `exec`: the shell forks `sleep`, which inherits the pipes.
        let analyzer = sh("sleep 6; echo done", Duration::from_millis(200));
        let start = Instant::now();
        let err = analyzer.analyze(Path::new("x.mp3")).unwrap_err();
        assert!(format!("{err:#}").contains("timed out"));
        assert!(
            start.elapsed() < Duration::from_secs(3),
            "took {:?} with a 200ms timeout",
            start.elapsed()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_background_process_does_not_block_output() {
        let analyzer = sh(
            r#"sleep 6 & printf '{"tempo": 120, "key": "C", "scale": "major"}'"#,
            Duration::from_secs(1),
        );
        let start = Instant::now();
        let features = analyzer.analyze(Path::new("x.mp3")).unwrap();
        assert_eq!(features.harmonic_code().to_string(), "8B");
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_missing_program_is_error() {
        let analyzer = CommandAnalyzer::new(
            "segue-definitely-not-a-real-program",
            Vec::new(),
            Duration::from_secs(1),
        );
        assert!(analyzer.analyze(Path::new("x.mp3")).is_err());
    }
}
