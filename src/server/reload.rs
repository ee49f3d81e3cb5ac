// src/server/reload.rs

//! Reload hub: turns task completions into browser reload messages.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::task::{CompletionSink, TaskReport};
use crate::types::TaskName;

/// Script tag injected into served HTML pages.
pub const RELOAD_SCRIPT_TAG: &str = r#"<script src="/__livereload.js"></script>"#;

/// Client snippet served at `/__livereload.js`.
///
/// Stylesheet-only changes swap `<link>` hrefs in place; anything else
/// reloads the page.
pub const RELOAD_CLIENT_JS: &str = r#"(function () {
  var proto = location.protocol === "https:" ? "wss://" : "ws://";
  var socket = new WebSocket(proto + location.host + "/__livereload");
  socket.onmessage = function (event) {
    var msg = JSON.parse(event.data);
    if (msg.type !== "reload") return;
    var cssOnly = msg.paths.length > 0 && msg.paths.every(function (p) {
      return /\.css$/.test(p);
    });
    if (!cssOnly) {
      location.reload();
      return;
    }
    document.querySelectorAll('link[rel="stylesheet"]').forEach(function (link) {
      var href = link.href.replace(/[?&]livereload=\d+/, "");
      link.href = href + (href.indexOf("?") < 0 ? "?" : "&") + "livereload=" + Date.now();
    });
  };
})();
"#;

/// Message pushed to every connected client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    Reload {
        task: TaskName,
        /// Changed files, relative to the build root, `/`-separated.
        paths: Vec<String>,
    },
}

/// Fan-out of reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
    build_root: PathBuf,
}

impl ReloadHub {
    pub fn new(build_root: impl Into<PathBuf>) -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self {
            tx,
            build_root: build_root.into(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Send a message to every subscriber. Returns how many received it.
    pub fn broadcast(&self, message: ReloadMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    fn url_path(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.build_root).unwrap_or(path);
        rel.to_string_lossy().replace('\\', "/")
    }
}

impl CompletionSink for ReloadHub {
    fn task_completed(&self, report: &TaskReport) {
        let paths: Vec<String> = report.written().into_iter().map(|p| self.url_path(p)).collect();
        if paths.is_empty() {
            debug!(task = %report.task, "nothing written; no reload");
            return;
        }
        let delivered = self.broadcast(ReloadMessage::Reload {
            task: report.task.clone(),
            paths,
        });
        debug!(task = %report.task, clients = delivered, "reload broadcast");
    }
}

/// Insert the reload script before the last `</body>`, or append it when the
/// page has no body end tag. Pages that already carry it are unchanged.
pub fn inject_reload_script(html: &str) -> String {
    if html.contains(RELOAD_SCRIPT_TAG) {
        return html.to_string();
    }
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => format!("{}{}{}", &html[..idx], RELOAD_SCRIPT_TAG, &html[idx..]),
        None => format!("{html}{RELOAD_SCRIPT_TAG}"),
    }
}
