//! Cookie, storage and script operations run on the per-webview worker.

use std::time::Duration;

use inlay_common::{Tag, WebViewError};
use inlay_config::InlayConfig;
use inlay_harness::host::webview_events;
use inlay_harness::{MockCall, TestHost};
use inlay_webview::{
    CookieData, ExecuteJavascriptOp, InstallJavascriptOp, ListCookieOp, ListStorageOp,
    MessageReceiverOp, OperationKind, RemoveCookieOp, RemoveStorageOp, SetCookieOp, SetStorageOp,
    StorageData, StorageKind, WebViewEvent, WebViewOp,
};

const WAIT: Duration = Duration::from_secs(2);

fn cookie(name: &str, value: &str) -> CookieData {
    CookieData {
        name: name.into(),
        value: value.into(),
        domain: "example.com".into(),
        path: "/".into(),
        ..CookieData::default()
    }
}

/// A host with one webview already created.
fn host_with_webview(config: &InlayConfig) -> (TestHost, WebViewOp) {
    let mut host = TestHost::with_config(config).unwrap();
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        stack.pop(ops);
    });
    (host, webview)
}

#[test]
fn cookies_listed_after_set_include_it() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        SetCookieOp {
            cookie: cookie("sid", "abc"),
        }
        .add(ops);
        ListCookieOp { tag: reply }.add(ops);
        stack.pop(ops);
    });

    let events = host.wait_for(reply, WAIT);
    assert_eq!(events, vec![WebViewEvent::Cookies(vec![cookie("sid", "abc")])]);
}

#[test]
fn removed_cookie_is_not_listed() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        SetCookieOp {
            cookie: cookie("a", "1"),
        }
        .add(ops);
        SetCookieOp {
            cookie: cookie("b", "2"),
        }
        .add(ops);
        RemoveCookieOp {
            cookie: cookie("a", ""),
        }
        .add(ops);
        ListCookieOp { tag: reply }.add(ops);
        stack.pop(ops);
    });

    let events = host.wait_for(reply, WAIT);
    assert_eq!(events, vec![WebViewEvent::Cookies(vec![cookie("b", "2")])]);
}

#[test]
fn session_storage_set_list_remove() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        SetStorageOp {
            kind: StorageKind::Session,
            content: StorageData::new("theme", "dark"),
        }
        .add(ops);
        ListStorageOp {
            kind: StorageKind::Session,
            tag: reply,
        }
        .add(ops);
        stack.pop(ops);
    });
    assert_eq!(
        host.wait_for(reply, WAIT),
        vec![WebViewEvent::Storage {
            kind: StorageKind::Session,
            items: vec![StorageData::new("theme", "dark")],
        }]
    );

    host.frame(|ops| {
        let stack = webview.push(ops);
        RemoveStorageOp {
            kind: StorageKind::Session,
            content: StorageData::new("theme", ""),
        }
        .add(ops);
        ListStorageOp {
            kind: StorageKind::Session,
            tag: reply,
        }
        .add(ops);
        stack.pop(ops);
    });
    assert_eq!(
        host.wait_for(reply, WAIT),
        vec![WebViewEvent::Storage {
            kind: StorageKind::Session,
            items: Vec::new(),
        }]
    );

    let view = host.backend.view(0).unwrap();
    assert!(view.calls().contains(&MockCall::RemoveStorage {
        kind: StorageKind::Session,
        key: "theme".into(),
    }));
    assert!(view.storage_snapshot(StorageKind::Local).is_empty());
}

#[test]
fn jobs_run_in_recorded_order() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        ExecuteJavascriptOp {
            script: "first()".into(),
        }
        .add(ops);
        SetStorageOp {
            kind: StorageKind::Local,
            content: StorageData::new("k", "v"),
        }
        .add(ops);
        ExecuteJavascriptOp {
            script: "second()".into(),
        }
        .add(ops);
        ListStorageOp {
            kind: StorageKind::Local,
            tag: reply,
        }
        .add(ops);
        stack.pop(ops);
    });
    assert_eq!(host.wait_for(reply, WAIT).len(), 1);

    let view = host.backend.view(0).unwrap();
    let jobs: Vec<MockCall> = view
        .calls()
        .into_iter()
        .filter(|call| !matches!(call, MockCall::Resize { .. }))
        .collect();
    assert_eq!(
        jobs,
        vec![
            MockCall::RunJavascript {
                script: "first()".into()
            },
            MockCall::AddStorage {
                kind: StorageKind::Local,
                key: "k".into()
            },
            MockCall::RunJavascript {
                script: "second()".into()
            },
            MockCall::ListStorage {
                kind: StorageKind::Local
            },
        ]
    );
}

#[test]
fn failed_job_reports_on_webview_tag() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    host.backend
        .view(0)
        .unwrap()
        .fail_next(WebViewError::Script("ReferenceError: boom".into()));

    host.frame(|ops| {
        let stack = webview.push(ops);
        ExecuteJavascriptOp {
            script: "boom()".into(),
        }
        .add(ops);
        stack.pop(ops);
    });

    assert_eq!(
        host.wait_for(&webview, WAIT),
        vec![WebViewEvent::Error {
            operation: OperationKind::ExecuteJavascript,
            error: WebViewError::Script("ReferenceError: boom".into()),
        }]
    );
}

#[test]
fn failed_list_reports_on_reply_tag() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();
    host.backend
        .view(0)
        .unwrap()
        .fail_next(WebViewError::Cookie("store locked".into()));

    host.frame(|ops| {
        let stack = webview.push(ops);
        ListCookieOp { tag: reply }.add(ops);
        stack.pop(ops);
    });

    let events = host.wait_for(reply, WAIT);
    assert!(matches!(
        events.as_slice(),
        [WebViewEvent::Error {
            operation: OperationKind::ListCookies,
            error: WebViewError::Cookie(_),
        }]
    ));
}

#[test]
fn full_queue_rejects_jobs() {
    let mut config = InlayConfig::default();
    config.runtime.job_queue_capacity = 1;
    let (mut host, webview) = host_with_webview(&config);
    let view = host.backend.view(0).unwrap();
    view.pause();

    let mut queue = host.frame(|ops| {
        let stack = webview.push(ops);
        for i in 0..4 {
            SetCookieOp {
                cookie: cookie(&format!("c{i}"), "v"),
            }
            .add(ops);
        }
        stack.pop(ops);
    });

    let rejected = webview_events(&mut queue, &webview)
        .into_iter()
        .filter(|event| {
            matches!(
                event,
                WebViewEvent::Error {
                    operation: OperationKind::SetCookie,
                    error: WebViewError::QueueFull(_),
                }
            )
        })
        .count();
    assert!(rejected >= 2, "expected at least two rejections, got {rejected}");

    view.resume();
    assert!(host.wait_until(WAIT, || view.cookie_jar().len() == 4 - rejected));
}

#[test]
fn init_scripts_install_before_recorded_ones() {
    let mut config = InlayConfig::default();
    config.webview.initialization_scripts = vec!["window.a = 1".into(), "window.b = 2".into()];
    let (mut host, webview) = host_with_webview(&config);

    host.frame(|ops| {
        let stack = webview.push(ops);
        InstallJavascriptOp {
            script: "window.c = 3".into(),
        }
        .add(ops);
        stack.pop(ops);
    });

    let view = host.backend.view(0).unwrap();
    assert!(host.wait_until(WAIT, || view.installed_scripts().len() == 3));
    assert_eq!(
        view.installed_scripts(),
        vec!["window.a = 1", "window.b = 2", "window.c = 3"]
    );
}

#[test]
fn page_messages_arrive_on_receiver_tag() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let reply = Tag::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        MessageReceiverOp {
            name: "notify".into(),
            tag: reply,
        }
        .add(ops);
        stack.pop(ops);
    });

    let view = host.backend.view(0).unwrap();
    assert!(view.invoke_callback("notify", "{\"count\":1}"));
    assert!(!view.invoke_callback("other", "ignored"));
    assert_eq!(
        host.wait_for(reply, WAIT),
        vec![WebViewEvent::Message("{\"count\":1}".into())]
    );
}

#[test]
fn cookie_that_would_inject_attributes_is_rejected() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());

    host.frame(|ops| {
        let stack = webview.push(ops);
        SetCookieOp {
            cookie: cookie("sid", "a; domain=evil.example"),
        }
        .add(ops);
        stack.pop(ops);
    });

    let events = host.wait_for(&webview, WAIT);
    assert!(matches!(
        events.as_slice(),
        [WebViewEvent::Error {
            operation: OperationKind::SetCookie,
            error: WebViewError::Cookie(_),
        }]
    ));
    assert!(host.backend.view(0).unwrap().cookie_jar().is_empty());
}

#[test]
fn scripts_recorded_every_frame_install_once() {
    let (mut host, webview) = host_with_webview(&InlayConfig::default());
    let mut reply = Tag::new();

    for _ in 0..50 {
        reply = Tag::new();
        host.frame(|ops| {
            let stack = webview.push(ops);
            InstallJavascriptOp {
                script: "window.ready = true".into(),
            }
            .add(ops);
            MessageReceiverOp {
                name: "notify".into(),
                tag: reply,
            }
            .add(ops);
            stack.pop(ops);
        });
    }

    let view = host.backend.view(0).unwrap();
    assert!(host.wait_until(WAIT, || {
        view.calls()
            .iter()
            .filter(|call| matches!(call, MockCall::InstallJavascript { .. }))
            .count()
            == 50
    }));
    assert_eq!(view.installed_scripts(), vec!["window.ready = true"]);

    // Only the latest receiver gets the message.
    assert!(view.invoke_callback("notify", "once"));
    assert_eq!(
        host.wait_for(reply, WAIT),
        vec![WebViewEvent::Message("once".into())]
    );
}
