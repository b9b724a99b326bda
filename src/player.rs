use anyhow::{Context, Result, anyhow};
use std::process::Stdio;
use tokio::{
  io::{AsyncBufReadExt, BufReader},
  process::{Child, Command},
  sync::mpsc,
  task::JoinHandle,
};
use tracing::{info, warn};

use crate::constants::constants;

/// Playback URL for the embeddable player.
pub fn embed_url(video_id: &str) -> String {
  format!("{}/{}?autoplay=1&rel=0", constants().embed_url_base, video_id)
}

/// Canonical watch page, which is what mpv (through yt-dlp) resolves.
pub fn watch_url(video_id: &str) -> String {
  format!("{}?v={}", constants().watch_url_base, video_id)
}

/// What is currently playing.
#[derive(Debug, Clone)]
pub struct NowPlaying {
  pub video_id: String,
  pub title: String,
  pub channel: String,
}

/// Plays a selected video in an external `mpv` window.
pub struct Player {
  process: Option<Child>,
  monitor: Option<JoinHandle<()>>,
  status_rx: Option<mpsc::Receiver<String>>,
  last_status: Option<String>,
  ipc_socket_path: Option<String>,
  pub now_playing: Option<NowPlaying>,
  pub paused: bool,
}

impl Player {
  pub fn new() -> Self {
    Self {
      process: None,
      monitor: None,
      status_rx: None,
      last_status: None,
      ipc_socket_path: None,
      now_playing: None,
      paused: false,
    }
  }

  pub fn is_playing(&self) -> bool {
    self.process.is_some()
  }

  pub fn last_status(&self) -> Option<&str> {
    self.last_status.as_deref()
  }

  /// Drain mpv's status lines and notice when the window was closed.
  pub fn poll(&mut self) {
    if let Some(rx) = &mut self.status_rx {
      while let Ok(status) = rx.try_recv() {
        self.last_status = Some(status);
      }
    }
    if let Some(child) = &mut self.process
      && let Ok(Some(exit)) = child.try_wait()
    {
      info!(status = %exit, "mpv exited");
      self.process = None;
      self.reset();
    }
  }

  pub async fn play(&mut self, now_playing: NowPlaying) -> Result<()> {
    self.stop().await.context("Failed to stop previous playback")?;

    let url = watch_url(&now_playing.video_id);
    let socket_path = std::env::temp_dir().join(format!("vidstream-mpv-{}.sock", std::process::id()));
    let socket_path = socket_path.to_str().context("Temp dir path is not valid UTF-8")?.to_string();
    let _ = std::fs::remove_file(&socket_path);

    let mut cmd = Command::new("mpv");
    cmd.args([
      "--force-window=immediate",
      "--term-status-msg=${time-pos/full} / ${duration/full} ${pause}",
      &format!("--title={}", now_playing.title),
      &format!("--input-ipc-server={}", socket_path),
      &url,
    ]);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    // An undrained stderr pipe would eventually block mpv.
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn().map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        anyhow!("mpv not found. Install it with: brew install mpv (macOS) or apt install mpv (Linux)")
      } else {
        anyhow!(e).context("Failed to spawn mpv process")
      }
    })?;

    let stdout = child.stdout.take().context("Failed to get mpv stdout")?;
    let (tx, rx) = mpsc::channel::<String>(10);
    let monitor = tokio::spawn(async move {
      let mut lines = BufReader::new(stdout).lines();
      while let Ok(Some(line)) = lines.next_line().await {
        if tx.send(line).await.is_err() {
          break;
        }
      }
    });

    info!(video_id = %now_playing.video_id, "playback started");
    self.process = Some(child);
    self.monitor = Some(monitor);
    self.status_rx = Some(rx);
    self.ipc_socket_path = Some(socket_path);
    self.now_playing = Some(now_playing);
    self.paused = false;
    Ok(())
  }

  pub async fn toggle_pause(&mut self) -> Result<()> {
    let Some(ref socket_path) = self.ipc_socket_path else {
      return Ok(());
    };
    let stream = tokio::net::UnixStream::connect(socket_path).await.context("Failed to connect to mpv IPC socket")?;
    stream.writable().await.context("mpv IPC socket not writable")?;
    let cmd = b"{\"command\":[\"cycle\",\"pause\"]}\n";
    let written = stream.try_write(cmd).context("Failed to send pause command to mpv")?;
    if written < cmd.len() {
      return Err(anyhow!("Partial write to mpv IPC socket: wrote {} of {} bytes", written, cmd.len()));
    }
    self.paused = !self.paused;
    Ok(())
  }

  pub async fn stop(&mut self) -> Result<()> {
    if let Some(handle) = self.monitor.take() {
      handle.abort();
      let _ = handle.await;
    }
    if let Some(mut child) = self.process.take() {
      child.kill().await.context("Failed to kill mpv process")?;
      let _ = child.wait().await;
    }
    self.reset();
    Ok(())
  }

  fn reset(&mut self) {
    if let Some(handle) = self.monitor.take() {
      handle.abort();
    }
    self.status_rx = None;
    self.last_status = None;
    self.now_playing = None;
    self.paused = false;
    if let Some(path) = self.ipc_socket_path.take() {
      let _ = std::fs::remove_file(&path);
    }
  }
}

/// Hand the embeddable player URL to the system browser.
pub fn open_in_browser(video_id: &str) -> Result<()> {
  let url = embed_url(video_id);
  #[cfg(target_os = "macos")]
  let cmd = "open";
  #[cfg(not(target_os = "macos"))]
  let cmd = "xdg-open";
  let mut child = std::process::Command::new(cmd)
    .arg(&url)
    .stdin(Stdio::null())
    .stdout(Stdio::null())
    .stderr(Stdio::null())
    .spawn()
    .with_context(|| format!("Failed to run {}", cmd))?;
  // Reap in the background so no zombie is left behind.
  std::thread::spawn(move || {
    if let Err(e) = child.wait() {
      warn!(err = %e, "browser launcher did not exit cleanly");
    }
  });
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embed_url_autoplays_without_related() {
    assert_eq!(embed_url("dQw4w9WgXcQ"), "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0");
  }

  #[test]
  fn watch_url_format() {
    assert_eq!(watch_url("abc123"), "https://www.youtube.com/watch?v=abc123");
  }

  #[test]
  fn new_player_is_idle() {
    let player = Player::new();
    assert!(!player.is_playing());
    assert!(player.now_playing.is_none());
    assert!(player.last_status().is_none());
  }
}
