//! Scripted frame sequences.
//!
//! A scenario is a TOML file listing frames and the operations recorded in
//! each. Webviews and reply tags are referred to by name; the replay
//! allocates identities on first use.
//!
//! ```toml
//! settle_ms = 100
//!
//! [[frame]]
//! ops = [
//!   { op = "push", webview = "main" },
//!   { op = "rect", width = 640, height = 480 },
//!   { op = "navigate", url = "https://example.com" },
//!   { op = "list_cookies", reply = "jar" },
//!   { op = "pop" },
//! ]
//!
//! [[frame]]
//! destroy = true
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::time::{Duration, Instant};

use inlay_common::{InlayError, Point, Tag};
use inlay_config::InlayConfig;
use inlay_webview::{
    CommandBuffer, CookieData, ExecuteJavascriptOp, InstallJavascriptOp, ListCookieOp,
    ListStorageOp, MessageReceiverOp, NavigateOp, OffsetOp, RectOp, RemoveCookieOp,
    RemoveStorageOp, SetCookieOp, SetStorageOp, StorageData, StorageKind, WebViewOp,
    WebViewStack,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::host::{webview_events, TestHost};
use crate::mock::MockCall;

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("scenario parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("frame {frame}: pop without a matching push")]
    UnbalancedPop { frame: usize },

    #[error("frame {frame}: {open} push(es) never popped")]
    UnclosedPush { frame: usize, open: usize },

    #[error(transparent)]
    Plugin(#[from] InlayError),
}

/// One recorded operation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioOp {
    Push { webview: String },
    Pop,
    Offset { x: f32, y: f32 },
    Rect { width: f32, height: f32 },
    Navigate { url: String },
    SetCookie { cookie: CookieData },
    RemoveCookie { cookie: CookieData },
    ListCookies { reply: String },
    SetStorage {
        #[serde(default)]
        kind: StorageKind,
        key: String,
        value: String,
    },
    RemoveStorage {
        #[serde(default)]
        kind: StorageKind,
        key: String,
    },
    ListStorage {
        #[serde(default)]
        kind: StorageKind,
        reply: String,
    },
    Execute { script: String },
    Install { script: String },
    Receiver { name: String, reply: String },
    /// Forget a webview's identity, releasing it on the next frame.
    Drop { webview: String },
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScenarioFrame {
    pub ops: Vec<ScenarioOp>,
    /// Destroy the window after this frame.
    pub destroy: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// How long to keep running empty frames after the last one, collecting
    /// late events.
    pub settle_ms: u64,
    #[serde(rename = "frame")]
    pub frames: Vec<ScenarioFrame>,
}

/// What a replay observed.
#[derive(Debug, Default, Serialize)]
pub struct Journal {
    pub frames: Vec<JournalFrame>,
    /// Calls on each webview, in creation order.
    pub webviews: Vec<Vec<MockCall>>,
}

#[derive(Debug, Default, Serialize)]
pub struct JournalFrame {
    pub index: usize,
    /// Events by webview or reply name.
    pub events: BTreeMap<String, Vec<String>>,
}

impl JournalFrame {
    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Default)]
struct Names {
    webviews: BTreeMap<String, WebViewOp>,
    replies: BTreeMap<String, Tag>,
}

impl Names {
    fn webview(&mut self, name: &str) -> WebViewOp {
        self.webviews.entry(name.to_string()).or_default().clone()
    }

    fn reply(&mut self, name: &str) -> Tag {
        *self
            .replies
            .entry(name.to_string())
            .or_insert_with(Tag::new)
    }

    fn targets(&self) -> Vec<(String, Tag)> {
        let webviews = self.webviews.iter().map(|(name, op)| (name.clone(), op.tag()));
        let replies = self.replies.iter().map(|(name, tag)| (name.clone(), *tag));
        webviews.chain(replies).collect()
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(text)?)
    }

    /// Replay every frame against a fresh [`TestHost`].
    pub fn replay(&self, config: &InlayConfig) -> Result<Journal, ScenarioError> {
        let mut host = TestHost::with_config(config)?;
        let mut names = Names::default();
        let mut journal = Journal::default();

        for (index, frame) in self.frames.iter().enumerate() {
            let mut outcome = Ok(());
            let mut queue = host.frame(|ops| outcome = record(index, &frame.ops, &mut names, ops));
            outcome?;

            let mut entry = JournalFrame {
                index,
                ..JournalFrame::default()
            };
            for (name, tag) in names.targets() {
                let events = webview_events(&mut queue, tag);
                if !events.is_empty() {
                    entry.events.insert(name, events.iter().map(|e| format!("{e:?}")).collect());
                }
            }
            debug!(frame = index, ops = frame.ops.len(), "replayed frame");
            journal.frames.push(entry);

            if frame.destroy {
                host.destroy();
            }
        }

        let deadline = Instant::now() + Duration::from_millis(self.settle_ms);
        let mut index = self.frames.len();
        while Instant::now() < deadline {
            let mut queue = host.frame(|_| {});
            let mut entry = JournalFrame {
                index,
                ..JournalFrame::default()
            };
            for (name, tag) in names.targets() {
                let events = webview_events(&mut queue, tag);
                if !events.is_empty() {
                    entry.events.insert(name, events.iter().map(|e| format!("{e:?}")).collect());
                }
            }
            if !entry.is_empty() {
                journal.frames.push(entry);
            }
            index += 1;
            std::thread::sleep(Duration::from_millis(5));
        }

        journal.webviews = host.backend.views().iter().map(|view| view.calls()).collect();
        info!(
            frames = self.frames.len(),
            webviews = journal.webviews.len(),
            "scenario replayed"
        );
        host.shutdown();
        Ok(journal)
    }
}

fn record(
    frame: usize,
    script: &[ScenarioOp],
    names: &mut Names,
    ops: &mut CommandBuffer,
) -> Result<(), ScenarioError> {
    let mut stacks: Vec<WebViewStack> = Vec::new();

    for op in script {
        match op {
            ScenarioOp::Push { webview } => stacks.push(names.webview(webview).push(ops)),
            ScenarioOp::Pop => match stacks.pop() {
                Some(stack) => stack.pop(ops),
                None => return Err(ScenarioError::UnbalancedPop { frame }),
            },
            ScenarioOp::Offset { x, y } => OffsetOp::new(Point::new(*x, *y)).add(ops),
            ScenarioOp::Rect { width, height } => RectOp::new(Point::new(*width, *height)).add(ops),
            ScenarioOp::Navigate { url } => NavigateOp::new(url.clone()).add(ops),
            ScenarioOp::SetCookie { cookie } => SetCookieOp {
                cookie: cookie.clone(),
            }
            .add(ops),
            ScenarioOp::RemoveCookie { cookie } => RemoveCookieOp {
                cookie: cookie.clone(),
            }
            .add(ops),
            ScenarioOp::ListCookies { reply } => ListCookieOp {
                tag: names.reply(reply),
            }
            .add(ops),
            ScenarioOp::SetStorage { kind, key, value } => SetStorageOp {
                kind: *kind,
                content: StorageData::new(key.clone(), value.clone()),
            }
            .add(ops),
            ScenarioOp::RemoveStorage { kind, key } => RemoveStorageOp {
                kind: *kind,
                content: StorageData::new(key.clone(), ""),
            }
            .add(ops),
            ScenarioOp::ListStorage { kind, reply } => ListStorageOp {
                kind: *kind,
                tag: names.reply(reply),
            }
            .add(ops),
            ScenarioOp::Execute { script } => ExecuteJavascriptOp {
                script: script.clone(),
            }
            .add(ops),
            ScenarioOp::Install { script } => InstallJavascriptOp {
                script: script.clone(),
            }
            .add(ops),
            ScenarioOp::Receiver { name, reply } => MessageReceiverOp {
                name: name.clone(),
                tag: names.reply(reply),
            }
            .add(ops),
            ScenarioOp::Drop { webview } => {
                names.webviews.remove(webview);
            }
        }
    }

    if !stacks.is_empty() {
        let open = stacks.len();
        for stack in stacks.into_iter().rev() {
            stack.pop(ops);
        }
        return Err(ScenarioError::UnclosedPush { frame, open });
    }
    Ok(())
}
