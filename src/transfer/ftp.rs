//! Minimal passive-mode FTP client for uploads.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use super::{Destination, ProgressFn, ProgressUpdate, PushSession};
use crate::config::DestinationConfig;
use crate::error::{Error, Result};
use crate::format::{format_bytes, format_duration, format_rate};

/// Upload chunk size; progress is reported once per chunk.
const CHUNK_SIZE: usize = 1024 * 1024;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// How long to wait for the final STOR reply after an upload was cut short.
const ABORT_REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// A server reply: three-digit code plus the (possibly multi-line) text.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Reply {
    code: u16,
    text: String,
}

impl Reply {
    const fn is_preliminary(&self) -> bool {
        self.code >= 100 && self.code < 200
    }

    const fn is_positive(&self) -> bool {
        self.code >= 200 && self.code < 400
    }

    /// 421 means the server is closing the control connection.
    const fn is_service_closing(&self) -> bool {
        self.code == 421
    }
}

impl std::fmt::Display for Reply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Splits a reply line into code, continuation flag and text.
fn parse_reply_line(line: &str) -> Option<(u16, bool, &str)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let code = line.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code = code.parse().ok()?;
    match line.as_bytes().get(3) {
        None => Some((code, false, "")),
        Some(b' ') => Some((code, false, &line[4..])),
        Some(b'-') => Some((code, true, &line[4..])),
        Some(_) => None,
    }
}

/// Reads one reply, following `123-` continuation lines to the closing
/// `123 ` line.
async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<Reply> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(Error::Connection("server closed the connection".to_string()));
    }
    let (code, mut more, text) = parse_reply_line(&line)
        .ok_or_else(|| Error::Connection(format!("malformed reply: {}", line.trim_end())))?;
    let mut text = text.to_string();

    while more {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(Error::Connection("server closed the connection".to_string()));
        }
        let body = match parse_reply_line(&line) {
            Some((c, false, rest)) if c == code => {
                more = false;
                rest
            }
            _ => line.trim_end_matches(['\r', '\n']),
        };
        text.push('\n');
        text.push_str(body);
    }
    Ok(Reply { code, text })
}

/// Extracts the data address from a `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)` reply.
fn parse_pasv(text: &str) -> Option<SocketAddrV4> {
    let start = text.find('(')?;
    let end = start + text[start..].find(')')?;
    let numbers: Vec<u8> = text[start + 1..end]
        .split(',')
        .map(|n| n.trim().parse().ok())
        .collect::<Option<_>>()?;
    let [a, b, c, d, p1, p2] = numbers[..] else {
        return None;
    };
    let port = (u16::from(p1) << 8) | u16::from(p2);
    Some(SocketAddrV4::new(Ipv4Addr::new(a, b, c, d), port))
}

/// Extracts the port from a `229 Entering Extended Passive Mode (|||port|)` reply.
fn parse_epsv(text: &str) -> Option<u16> {
    let start = text.find('(')?;
    let end = start + text[start..].find(')')?;
    let inner = &text[start + 1..end];
    let delimiter = inner.chars().next()?;
    let fields: Vec<&str> = inner.split(delimiter).collect();
    match fields[..] {
        ["", "", "", port, ""] => port.parse().ok().filter(|&p| p != 0),
        _ => None,
    }
}

/// Servers behind NAT often announce their private address in PASV replies.
/// Such an address is replaced by the control connection's peer unless the
/// peer is itself on a private network.
fn pasv_target(announced: SocketAddrV4, peer: SocketAddr) -> SocketAddr {
    let ip = announced.ip();
    let peer_is_local = match peer.ip() {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback(),
        IpAddr::V6(v6) => v6.is_loopback(),
    };
    if ip.is_unspecified() || (ip.is_private() && !peer_is_local) {
        SocketAddr::new(peer.ip(), announced.port())
    } else {
        SocketAddr::V4(announced)
    }
}

/// Cumulative parent directories of an absolute remote file path.
fn parent_dirs(remote: &str) -> Vec<String> {
    let segments: Vec<&str> = remote.split('/').filter(|s| !s.is_empty()).collect();
    let Some((_, dirs)) = segments.split_last() else {
        return Vec::new();
    };
    dirs.iter()
        .scan(String::new(), |path, segment| {
            path.push('/');
            path.push_str(segment);
            Some(path.clone())
        })
        .collect()
}

/// FTP server credentials and address.
#[derive(Debug, Clone)]
pub struct FtpDestination {
    host: String,
    port: u16,
    username: String,
    password: String,
}

impl FtpDestination {
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DestinationConfig) -> Self {
        Self::new(
            &config.host,
            config.port,
            &config.username,
            &config.password,
        )
    }
}

#[async_trait]
impl Destination for FtpDestination {
    async fn connect(&self) -> Result<Box<dyn PushSession>> {
        log::info!("Connecting to ftp://{}:{}", self.host, self.port);
        let stream = tokio::time::timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        .map_err(|_| Error::Connection(format!("timed out connecting to {}", self.host)))?
        .map_err(|e| Error::Connection(format!("{}:{}: {e}", self.host, self.port)))?;

        let mut session = FtpSession {
            control: BufReader::new(stream),
            epsv: true,
        };
        let greeting = session.reply().await?;
        if !greeting.is_positive() {
            return Err(Error::Connection(format!("server refused: {greeting}")));
        }

        let reply = session.command(&format!("USER {}", self.username)).await?;
        if reply.code == 331 {
            let reply = session.command(&format!("PASS {}", self.password)).await?;
            if !reply.is_positive() {
                return Err(Error::Connection(format!("login rejected: {reply}")));
            }
        } else if !reply.is_positive() {
            return Err(Error::Connection(format!("login rejected: {reply}")));
        }

        // Titles are sent as UTF-8 whether or not the server acknowledges this
        let reply = session.command("OPTS UTF8 ON").await?;
        if !reply.is_positive() {
            log::debug!("OPTS UTF8 ON answered with {reply}");
        }

        let reply = session.command("TYPE I").await?;
        if !reply.is_positive() {
            return Err(Error::Connection(format!("binary mode refused: {reply}")));
        }
        log::info!("Logged in to {} as {}", self.host, self.username);
        Ok(Box::new(session))
    }
}

/// An authenticated control connection.
pub struct FtpSession {
    control: BufReader<TcpStream>,
    /// Cleared once the server refuses EPSV; PASV is used from then on.
    epsv: bool,
}

impl FtpSession {
    async fn reply(&mut self) -> Result<Reply> {
        let reply = read_reply(&mut self.control).await.map_err(lost)?;
        log::debug!("<- {reply}");
        if reply.is_service_closing() {
            return Err(Error::Connection(reply.to_string()));
        }
        Ok(reply)
    }

    async fn command(&mut self, command: &str) -> Result<Reply> {
        if command.starts_with("PASS ") {
            log::debug!("-> PASS ****");
        } else {
            log::debug!("-> {command}");
        }
        let stream = self.control.get_mut();
        stream
            .write_all(format!("{command}\r\n").as_bytes())
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        self.reply().await
    }

    /// Creates each parent directory; 550 (already exists) is not an error.
    async fn make_parents(&mut self, remote: &str) -> Result<()> {
        for dir in parent_dirs(remote) {
            let reply = self.command(&format!("MKD {dir}")).await?;
            if !reply.is_positive() && reply.code != 550 {
                return Err(Error::Push(format!("MKD {dir}: {reply}")));
            }
        }
        Ok(())
    }

    /// Asks for a passive data address, trying EPSV before PASV.
    async fn data_address(&mut self) -> Result<SocketAddr> {
        let peer = self
            .control
            .get_ref()
            .peer_addr()
            .map_err(|e| Error::Connection(e.to_string()))?;

        if self.epsv {
            let reply = self.command("EPSV").await?;
            if reply.code == 229 {
                let port = parse_epsv(&reply.text)
                    .ok_or_else(|| Error::Push(format!("unparsable EPSV reply: {reply}")))?;
                return Ok(SocketAddr::new(peer.ip(), port));
            }
            log::debug!("EPSV refused ({reply}), falling back to PASV");
            self.epsv = false;
        }

        let reply = self.command("PASV").await?;
        if reply.code != 227 {
            return Err(Error::Push(format!("passive mode refused: {reply}")));
        }
        let announced = parse_pasv(&reply.text)
            .ok_or_else(|| Error::Push(format!("unparsable PASV reply: {reply}")))?;
        Ok(pasv_target(announced, peer))
    }

    async fn open_data(&mut self) -> Result<TcpStream> {
        let addr = self.data_address().await?;
        tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::Push(format!("timed out opening data connection to {addr}")))?
            .map_err(|e| Error::Push(format!("data connection to {addr}: {e}")))
    }

    /// Consumes the final reply of a transfer that failed on our side so the
    /// next command does not read it. A session that cannot produce that
    /// reply is out of step and reported as lost.
    async fn finish_aborted_transfer(&mut self, cause: Error) -> Error {
        match tokio::time::timeout(ABORT_REPLY_TIMEOUT, self.reply()).await {
            Ok(Ok(reply)) => match cause {
                Error::Push(msg) => Error::Push(format!("{msg} (server: {reply})")),
                other => other,
            },
            Ok(Err(e)) => e,
            Err(_) => Error::Connection("no reply after interrupted upload".to_string()),
        }
    }
}

/// Copies `file` to the data connection and closes it. Returns bytes sent.
async fn send_file(
    file: &mut tokio::fs::File,
    data: &mut TcpStream,
    local: &Path,
    remote: &str,
    size: u64,
    on_progress: ProgressFn<'_>,
) -> Result<u64> {
    let started = Instant::now();
    let mut sent: u64 = 0;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::Push(format!("{}: {e}", local.display())))?;
        if n == 0 {
            break;
        }
        data.write_all(&buf[..n])
            .await
            .map_err(|e| Error::Push(format!("upload of {remote} interrupted: {e}")))?;
        sent += n as u64;
        on_progress(upload_progress(sent, size, started.elapsed()));
    }
    data.shutdown()
        .await
        .map_err(|e| Error::Push(format!("upload of {remote} interrupted: {e}")))?;
    Ok(sent)
}

/// Control-channel I/O failures mean the session is gone.
fn lost(e: Error) -> Error {
    match e {
        Error::Io(io) => Error::Connection(io.to_string()),
        other => other,
    }
}

#[async_trait]
impl PushSession for FtpSession {
    async fn push(
        &mut self,
        local: &Path,
        remote: &str,
        on_progress: ProgressFn<'_>,
    ) -> Result<String> {
        let mut file = tokio::fs::File::open(local)
            .await
            .map_err(|e| Error::Push(format!("{}: {e}", local.display())))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| Error::Push(format!("{}: {e}", local.display())))?
            .len();

        self.make_parents(remote).await?;
        let mut data = self.open_data().await?;

        let reply = self.command(&format!("STOR {remote}")).await?;
        if !reply.is_preliminary() {
            return Err(Error::Push(format!("STOR {remote}: {reply}")));
        }

        let sent = send_file(&mut file, &mut data, local, remote, size, on_progress).await;
        drop(data);
        let sent = match sent {
            Ok(sent) => sent,
            Err(e) => return Err(self.finish_aborted_transfer(e).await),
        };

        let reply = self.reply().await?;
        if !reply.is_positive() {
            return Err(Error::Push(format!("STOR {remote}: {reply}")));
        }
        if size == 0 {
            on_progress(ProgressUpdate::percent(100.0));
        }
        log::info!("Uploaded {remote} ({})", format_bytes(sent));
        Ok(remote.to_string())
    }

    async fn close(&mut self) -> Result<()> {
        let reply = self.command("QUIT").await?;
        if !reply.is_positive() {
            log::warn!("QUIT answered with {reply}");
        }
        Ok(())
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn upload_progress(sent: u64, size: u64, elapsed: Duration) -> ProgressUpdate {
    let percent = if size == 0 {
        100.0
    } else {
        (sent as f64 / size as f64 * 100.0) as f32
    };
    let secs = elapsed.as_secs_f64();
    let rate = (secs > 0.0).then(|| sent as f64 / secs);
    ProgressUpdate {
        percent,
        rate: rate.map(format_rate),
        eta: rate.filter(|r| *r > 0.0).map(|r| {
            format_duration(Duration::from_secs_f64(size.saturating_sub(sent) as f64 / r))
        }),
    }
}
