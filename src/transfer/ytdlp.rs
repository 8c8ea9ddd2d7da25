//! Fetching videos with the `yt-dlp` command-line tool.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{ItemFetcher, ProgressFn, ProgressUpdate};
use crate::catalog::Item;
use crate::config::FetchConfig;
use crate::error::{Error, Result};

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").expect("valid regex"));
static RATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bat\s+(\S+/s)").expect("valid regex"));
static ETA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bETA\s+(\S+)").expect("valid regex"));

/// Number of trailing stderr lines kept for error messages.
const STDERR_TAIL: usize = 5;

/// Parses a `[download]` progress line.
///
/// Returns `None` for any other output. Unknown rate or ETA fields are
/// reported as `None`.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressUpdate> {
    let line = line.trim();
    let percent: f32 = PERCENT_RE.captures(line)?.get(1)?.as_str().parse().ok()?;
    let field = |re: &Regex| {
        re.captures(line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.starts_with("Unknown"))
            .map(str::to_string)
    };
    Some(ProgressUpdate {
        percent,
        rate: field(&RATE_RE),
        eta: field(&ETA_RE),
    })
}

/// Downloads one video per call into a work directory.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: PathBuf,
    ffmpeg: Option<PathBuf>,
    format: String,
    work_dir: PathBuf,
}

impl YtDlp {
    /// Creates a fetcher running `program` with the default format.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg: None,
            format: FetchConfig::default().format,
            work_dir: work_dir.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(&config.ytdlp_path, &config.work_dir)
            .with_format(&config.format)
            .with_ffmpeg(config.ffmpeg_path.clone())
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Sets the ffmpeg location passed to yt-dlp for merging streams.
    #[must_use]
    pub fn with_ffmpeg(mut self, ffmpeg: Option<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg;
        self
    }

    fn args(&self, item: &Item) -> Vec<OsString> {
        let mut template = self.work_dir.clone().into_os_string();
        template.push(std::path::MAIN_SEPARATOR_STR);
        template.push("%(id)s.%(ext)s");

        let mut args: Vec<OsString> = [
            "-f",
            self.format.as_str(),
            "--no-continue",
            "--no-playlist",
            "--restrict-filenames",
            "--newline",
            "--progress",
            "--print",
            "after_move:filepath",
            "-o",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(template);
        if let Some(ffmpeg) = &self.ffmpeg {
            args.push("--ffmpeg-location".into());
            args.push(ffmpeg.into());
        }
        args.push(format!("https://www.youtube.com/watch?v={}", item.id).into());
        args
    }
}

#[async_trait]
impl ItemFetcher for YtDlp {
    fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    async fn fetch(&self, item: &Item, on_progress: ProgressFn<'_>) -> Result<PathBuf> {
        let mut child = Command::new(&self.program)
            .args(self.args(item))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::Fetch(format!("could not start {}: {e}", self.program.display()))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Fetch("yt-dlp stdout unavailable".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| Error::Fetch("yt-dlp stderr unavailable".to_string()))?;
        // Split on raw bytes: one badly encoded line must not end the download
        let mut stdout = BufReader::new(stdout).split(b'\n');
        let mut stderr = BufReader::new(stderr).split(b'\n');

        // Progress may land on either stream depending on quiet mode
        let mut output: Option<PathBuf> = None;
        let mut tail: Vec<String> = Vec::new();
        let (mut out_open, mut err_open) = (true, true);
        while out_open || err_open {
            tokio::select! {
                line = stdout.next_segment(), if out_open => match line.map_err(read_failed)? {
                    Some(bytes) => {
                        let line = lossy_line(&bytes);
                        if let Some(update) = parse_progress_line(&line) {
                            on_progress(update);
                        } else if is_output_path(&line) {
                            output = Some(PathBuf::from(line.trim()));
                        }
                    }
                    None => out_open = false,
                },
                line = stderr.next_segment(), if err_open => match line.map_err(read_failed)? {
                    Some(bytes) => {
                        let line = lossy_line(&bytes);
                        if let Some(update) = parse_progress_line(&line) {
                            on_progress(update);
                        } else if !line.trim().is_empty() {
                            log::debug!("yt-dlp: {line}");
                            if tail.len() == STDERR_TAIL {
                                tail.remove(0);
                            }
                            tail.push(line);
                        }
                    }
                    None => err_open = false,
                },
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::Fetch(format!("waiting for yt-dlp: {e}")))?;
        if !status.success() {
            return Err(Error::Fetch(format!(
                "yt-dlp exited with {status}: {}",
                tail.join(" | ")
            )));
        }
        output.ok_or_else(|| Error::Fetch(format!("yt-dlp reported no file for {}", item.id)))
    }
}

fn read_failed(e: std::io::Error) -> Error {
    Error::Fetch(format!("reading yt-dlp output: {e}"))
}

/// Decodes one output line, replacing invalid UTF-8.
fn lossy_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches('\r').to_string()
}

/// True for the line printed by `--print after_move:filepath`.
fn is_output_path(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && !line.starts_with('[')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_percent(update: &ProgressUpdate, expected: f32) {
        assert!((update.percent - expected).abs() < 1e-4, "{update:?}");
    }

    #[test]
    fn parses_full_progress_line() {
        let update =
            parse_progress_line("[download]  42.3% of ~  10.00MiB at    1.23MiB/s ETA 00:05 (frag 3/10)")
                .unwrap();
        assert_percent(&update, 42.3);
        assert_eq!(update.rate.as_deref(), Some("1.23MiB/s"));
        assert_eq!(update.eta.as_deref(), Some("00:05"));
    }

    #[test]
    fn unknown_fields_are_none() {
        let update =
            parse_progress_line("[download]   0.0% of   10.00MiB at  Unknown B/s ETA Unknown").unwrap();
        assert_percent(&update, 0.0);
        assert!(update.rate.is_none());
        assert!(update.eta.is_none());
    }

    #[test]
    fn parses_completion_line() {
        let update = parse_progress_line("[download] 100% of   10.00MiB in 00:00:03 at 3.10MiB/s").unwrap();
        assert_percent(&update, 100.0);
        assert_eq!(update.rate.as_deref(), Some("3.10MiB/s"));
        assert!(update.eta.is_none());
    }

    #[test]
    fn other_lines_are_not_progress() {
        assert!(parse_progress_line("[youtube] abc: Downloading webpage").is_none());
        assert!(parse_progress_line("[download] Destination: downloads/abc.mp4").is_none());
        assert!(parse_progress_line("downloads/abc.mp4").is_none());
    }

    #[test]
    fn output_path_detection() {
        assert!(is_output_path("downloads/abc.mp4\n"));
        assert!(!is_output_path("[Merger] Merging formats"));
        assert!(!is_output_path("   "));
    }

    #[test]
    fn lines_decode_lossily() {
        assert_eq!(lossy_line(b"caf\xc3\xa9\r"), "café");
        assert_eq!(lossy_line(b"bad \xff byte"), "bad \u{fffd} byte");
    }

    #[test]
    fn args_carry_tool_options() {
        let fetcher = YtDlp::new("yt-dlp", "work")
            .with_format("best")
            .with_ffmpeg(Some(PathBuf::from("/opt/ffmpeg")));
        let args: Vec<String> = fetcher
            .args(&Item::new("abc", "t"))
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();

        let pos = args.iter().position(|a| a == "-f").unwrap();
        assert_eq!(args[pos + 1], "best");
        for flag in ["--no-continue", "--no-playlist", "--restrict-filenames", "--newline"] {
            assert!(args.iter().any(|a| a == flag), "missing {flag}");
        }
        let pos = args.iter().position(|a| a == "-o").unwrap();
        assert!(args[pos + 1].starts_with("work"));
        assert!(args[pos + 1].ends_with("%(id)s.%(ext)s"));
        let pos = args.iter().position(|a| a == "--ffmpeg-location").unwrap();
        assert_eq!(args[pos + 1], "/opt/ffmpeg");
        assert_eq!(args.last().unwrap(), "https://www.youtube.com/watch?v=abc");
    }

    #[test]
    fn from_config_uses_configured_paths() {
        let config = FetchConfig::default();
        let fetcher = YtDlp::from_config(&config);
        assert_eq!(fetcher.work_dir(), config.work_dir.as_path());
        assert!(!fetcher.args(&Item::new("x", "t")).iter().any(|a| a == "--ffmpeg-location"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fetch_survives_badly_encoded_output() {
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("yt-dlp");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             printf 'WARNING: \\377\\376 not utf-8\\n' >&2\n\
             printf '[download]  50.0%% of 1.00MiB at 1.00MiB/s ETA 00:01\\n'\n\
             printf 'work/abc.mp4\\n'\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fetcher = YtDlp::new(&script, "work");
        let percents = Mutex::new(Vec::new());
        let on_progress = |u: ProgressUpdate| percents.lock().unwrap().push(u.percent);
        let path = fetcher.fetch(&Item::new("abc", "t"), &on_progress).await.unwrap();

        assert_eq!(path, PathBuf::from("work/abc.mp4"));
        assert_eq!(*percents.lock().unwrap(), [50.0]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_tool_reports_stderr_tail() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("yt-dlp");
        std::fs::write(&script, "#!/bin/sh\necho 'ERROR: Private video' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let fetcher = YtDlp::new(&script, "work");
        let err = fetcher
            .fetch(&Item::new("abc", "t"), &|_: ProgressUpdate| {})
            .await
            .unwrap_err();
        assert!(matches!(&err, Error::Fetch(msg) if msg.contains("Private video")), "{err}");
    }

    #[tokio::test]
    async fn missing_program_is_fetch_error() {
        let fetcher = YtDlp::new("/nonexistent/yt-dlp-binary", "work");
        let result = fetcher.fetch(&Item::new("abc", "t"), &|_: ProgressUpdate| {}).await;
        assert!(matches!(result, Err(Error::Fetch(_))));
    }
}
