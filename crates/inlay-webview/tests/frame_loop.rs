//! Frame interception as a host sees it: creation, geometry, event merging.

use std::time::Duration;

use inlay_common::{Insets, Metric, Point, Tag, WebViewError};
use inlay_harness::host::webview_events;
use inlay_harness::{HostInput, MockCall, TestHost};
use inlay_webview::{
    NativeEvent, NavigateOp, NavigationEvent, OffsetOp, OperationKind, QueuedEvent, RectOp,
    TitleEvent, WebViewEvent, WebViewOp,
};

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn webview_follows_recorded_geometry() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        OffsetOp::new((20, 40)).add(ops);
        RectOp::new((640, 480)).add(ops);
        stack.pop(ops);
    });
    host.frame(|ops| {
        let stack = webview.push(ops);
        RectOp::new((300, 200)).add(ops);
        stack.pop(ops);
    });

    let view = host.backend.view(0).unwrap();
    assert_eq!(host.backend.created(), 1);
    assert_eq!(
        view.resizes(),
        vec![
            (Point::new(640.0, 480.0), Point::new(20.0, 40.0)),
            (Point::new(300.0, 200.0), Point::ZERO),
        ]
    );
}

#[test]
fn absent_webview_is_hidden_not_closed() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();
    let show = |ops: &mut inlay_webview::CommandBuffer| {
        let stack = webview.push(ops);
        RectOp::new((100, 100)).add(ops);
        stack.pop(ops);
    };

    host.frame(show);
    host.frame(|_| {});
    host.frame(|_| {});
    host.frame(show);

    let view = host.backend.view(0).unwrap();
    assert_eq!(
        view.resizes(),
        vec![
            (Point::new(100.0, 100.0), Point::ZERO),
            (Point::ZERO, Point::ZERO),
            (Point::new(100.0, 100.0), Point::ZERO),
        ]
    );
    assert_eq!(view.close_count(), 0);
    assert!(host.plugin.is_live(&webview));
}

#[test]
fn insets_shift_webviews_by_density() {
    let mut host = TestHost::new().unwrap();
    host.metric = Metric {
        px_per_dp: 2.0,
        px_per_sp: 2.0,
    };
    host.insets = Insets {
        top: 12.0,
        left: 4.0,
        ..Insets::default()
    };
    let webview = WebViewOp::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        RectOp::new((50, 50)).add(ops);
        stack.pop(ops);
    });

    let view = host.backend.view(0).unwrap();
    assert_eq!(
        view.last_resize(),
        Some((Point::new(50.0, 50.0), Point::new(8.0, 24.0)))
    );
    assert_eq!(host.backend.create_densities(), vec![1.0]);
}

#[test]
fn navigation_uses_frame_density() {
    let mut host = TestHost::new().unwrap();
    host.metric.px_per_dp = 3.0;
    let webview = WebViewOp::new();

    host.frame(|ops| {
        let stack = webview.push(ops);
        NavigateOp::new("https://example.com/docs").add(ops);
        stack.pop(ops);
    });

    let view = host.backend.view(0).unwrap();
    assert_eq!(
        view.calls(),
        vec![
            MockCall::Configure { px_per_dp: 3.0 },
            MockCall::Navigate {
                url: "https://example.com/docs".into()
            },
            MockCall::Resize {
                size: Point::ZERO,
                offset: Point::ZERO
            },
        ]
    );
}

#[test]
fn invalid_url_is_reported_on_webview_tag() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();

    let mut queue = host.frame(|ops| {
        let stack = webview.push(ops);
        NavigateOp::new("not a url").add(ops);
        stack.pop(ops);
    });

    let events = webview_events(&mut queue, &webview);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        WebViewEvent::Error {
            operation: OperationKind::Navigate,
            error: WebViewError::InvalidUrl { url, .. },
        } if url == "not a url"
    ));
    assert!(host.backend.view(0).unwrap().navigations().is_empty());
}

#[test]
fn creation_failure_is_reported_then_retried() {
    let mut host = TestHost::new().unwrap();
    host.backend.fail_next_create(1);
    let webview = WebViewOp::new();
    let show = |ops: &mut inlay_webview::CommandBuffer| {
        let stack = webview.push(ops);
        RectOp::new((10, 10)).add(ops);
        stack.pop(ops);
    };

    let mut queue = host.frame(show);
    let events = webview_events(&mut queue, &webview);
    assert!(matches!(
        events.as_slice(),
        [WebViewEvent::Error {
            operation: OperationKind::Create,
            error: WebViewError::Creation(_),
        }]
    ));
    assert_eq!(host.plugin.handle_count(), 0);

    host.frame(show);
    assert_eq!(host.backend.created(), 1);
    assert!(host.plugin.is_live(&webview));
}

#[test]
fn native_events_reach_the_webview_tag() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        stack.pop(ops);
    });
    let view = host.backend.view(0).unwrap();

    assert!(view.emit(NativeEvent::Navigation(NavigationEvent {
        url: "https://example.com/next".into(),
    })));
    let events = host.wait_for(&webview, WAIT);
    assert_eq!(
        events,
        vec![WebViewEvent::Navigation(NavigationEvent {
            url: "https://example.com/next".into()
        })]
    );

    assert!(view.emit(NativeEvent::Title(TitleEvent {
        title: "Next".into(),
    })));
    let events = host.wait_for(&webview, WAIT);
    assert_eq!(
        events,
        vec![WebViewEvent::Title(TitleEvent {
            title: "Next".into()
        })]
    );
}

#[test]
fn page_load_progress_only_wakes_the_window() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        stack.pop(ops);
    });
    let view = host.backend.view(0).unwrap();
    let before = host.window.invalidations();

    view.emit(NativeEvent::PageLoad {
        state: inlay_webview::PageLoadState::Finished,
        url: "https://example.com/".into(),
    });
    let window = host.window.clone();
    assert!(host.wait_until(WAIT, || window.invalidations() > before));

    let mut queue = host.frame(|_| {});
    assert!(webview_events(&mut queue, &webview).is_empty());
}

#[test]
fn synthetic_events_precede_host_input() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        stack.pop(ops);
    });
    let view = host.backend.view(0).unwrap();
    let before = host.window.invalidations();

    view.emit(NativeEvent::Title(TitleEvent {
        title: "Loaded".into(),
    }));
    let window = host.window.clone();
    assert!(host.wait_until(WAIT, || window.invalidations() > before));

    host.queue_input(webview.tag(), HostInput::Key("Enter".into()));
    let mut queue = host.frame(|_| {});
    assert_eq!(
        queue.events(&webview),
        vec![
            QueuedEvent::WebView(WebViewEvent::Title(TitleEvent {
                title: "Loaded".into()
            })),
            QueuedEvent::Native(HostInput::Key("Enter".into())),
        ]
    );
}

#[test]
fn ops_outside_a_push_do_nothing() {
    let mut host = TestHost::new().unwrap();
    let tag = Tag::new();
    let mut queue = host.frame(|ops| {
        RectOp::new((100, 100)).add(ops);
        NavigateOp::new("https://example.com").add(ops);
    });
    assert_eq!(host.backend.created(), 0);
    assert!(webview_events(&mut queue, tag).is_empty());
}

#[test]
fn attaching_a_view_reconfigures_known_webviews() {
    let mut host = TestHost::new().unwrap();
    host.metric.px_per_dp = 2.0;
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        NavigateOp::new("https://example.com/").add(ops);
        RectOp::new((10, 10)).add(ops);
        stack.pop(ops);
    });

    host.attach_view();

    let configures: Vec<MockCall> = host
        .backend
        .view(0)
        .unwrap()
        .calls()
        .into_iter()
        .filter(|call| matches!(call, MockCall::Configure { .. }))
        .collect();
    assert_eq!(
        configures,
        vec![
            MockCall::Configure { px_per_dp: 2.0 },
            MockCall::Configure { px_per_dp: 2.0 },
        ]
    );
}

#[test]
fn repeated_view_event_does_not_reconfigure() {
    let mut host = TestHost::new().unwrap();
    let webview = WebViewOp::new();
    host.frame(|ops| {
        let stack = webview.push(ops);
        RectOp::new((10, 10)).add(ops);
        stack.pop(ops);
    });

    host.attach_view();
    host.attach_view();

    let view = host.backend.view(0).unwrap();
    let configures = view
        .calls()
        .into_iter()
        .filter(|call| matches!(call, MockCall::Configure { .. }))
        .count();
    assert_eq!(configures, 1);
}
