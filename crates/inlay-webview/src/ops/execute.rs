//! Execution of dispatched operations during the scan pass.

use tracing::{debug, warn};
use url::Url;

use crate::events::{OperationKind, WebViewEvent};
use crate::host::OpRef;
use crate::manager::lifecycle;
use crate::native::{InstallTime, MessageCallback};
use crate::pool::Pool;
use crate::scanner::ScanContext;

use super::{
    ExecuteJavascriptOp, InstallJavascriptOp, ListCookieOp, ListStorageOp, MessageReceiverOp,
    NavigateOp, OffsetOp, RectOp, RemoveCookieOp, RemoveStorageOp, SetCookieOp, SetStorageOp,
    StackOp,
};

pub(crate) trait Pooled: Sized + 'static {
    fn pool() -> &'static Pool<Self>;
}

pub(crate) trait Operation: Pooled + Default + Send {
    fn execute(&mut self, ctx: &mut ScanContext<'_>);
}

/// Left in a reference slot once its payload has been dispatched.
#[derive(Debug)]
pub(crate) struct Consumed;

type Dispatch = fn(&mut OpRef, &mut ScanContext<'_>) -> bool;

const DISPATCHERS: &[Dispatch] = &[
    dispatch::<StackOp>,
    dispatch::<OffsetOp>,
    dispatch::<RectOp>,
    dispatch::<NavigateOp>,
    dispatch::<SetCookieOp>,
    dispatch::<RemoveCookieOp>,
    dispatch::<ListCookieOp>,
    dispatch::<SetStorageOp>,
    dispatch::<RemoveStorageOp>,
    dispatch::<ListStorageOp>,
    dispatch::<ExecuteJavascriptOp>,
    dispatch::<InstallJavascriptOp>,
    dispatch::<MessageReceiverOp>,
];

/// Execute `slot` if it holds a staged operation. Returns whether it did.
pub(crate) fn dispatch_any(slot: &mut OpRef, ctx: &mut ScanContext<'_>) -> bool {
    DISPATCHERS.iter().any(|dispatch| dispatch(slot, ctx))
}

fn dispatch<T: Operation>(slot: &mut OpRef, ctx: &mut ScanContext<'_>) -> bool {
    if !(**slot).is::<T>() {
        return false;
    }
    let payload = std::mem::replace(slot, Box::new(Consumed));
    match payload.downcast::<T>() {
        Ok(mut op) => {
            op.execute(ctx);
            T::pool().free(op);
            true
        }
        Err(payload) => {
            *slot = payload;
            false
        }
    }
}

impl Operation for StackOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        match self.target.take() {
            Some(target) => {
                let active = lifecycle::ensure_handle(ctx, &target);
                if let Some(handle) = &active {
                    lifecycle::adopt(ctx, handle);
                    ctx.state.seen.entry(handle.id).or_insert(false);
                }
                ctx.active = active;
            }
            None => ctx.active = None,
        }
    }
}

impl Operation for OffsetOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("offset") else {
            return;
        };
        ctx.state.bounds.entry(handle.id).or_default().offset += self.point;
    }
}

impl Operation for RectOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("rect") else {
            return;
        };
        let inset = ctx.frame.metric.inset_origin(&ctx.frame.insets);

        ctx.state.seen.insert(handle.id, true);
        ctx.state.hidden.remove(&handle.id);
        let bounds = ctx.state.bounds.entry(handle.id).or_default();
        bounds.size += self.size;
        bounds.offset += inset;
        let (size, offset) = (bounds.size, bounds.offset);

        debug!(handle = %handle.id, ?size, ?offset, "resize");
        if let Err(error) = handle.native.resize(size, offset) {
            warn!(handle = %handle.id, %error, "resize failed");
        }
    }
}

impl Operation for NavigateOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("navigate") else {
            return;
        };

        let px_per_dp = ctx.frame.metric.px_per_dp;
        if ctx.state.config.px_per_dp != px_per_dp {
            ctx.state.config.px_per_dp = px_per_dp;
            if let Err(error) = handle.native.configure(&ctx.state.config) {
                warn!(handle = %handle.id, %error, "reconfigure failed");
            }
        }

        let url = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(e) => {
                warn!(handle = %handle.id, url = %self.url, error = %e, "refusing to navigate to invalid url");
                ctx.reporter().deliver(
                    handle.tag,
                    WebViewEvent::Error {
                        operation: OperationKind::Navigate,
                        error: inlay_common::WebViewError::InvalidUrl {
                            url: std::mem::take(&mut self.url),
                            reason: e.to_string(),
                        },
                    },
                );
                return;
            }
        };

        debug!(handle = %handle.id, %url, "navigate");
        if let Err(error) = handle.native.navigate(&url) {
            warn!(handle = %handle.id, %url, %error, "navigation failed");
            ctx.reporter().deliver(
                handle.tag,
                WebViewEvent::Error {
                    operation: OperationKind::Navigate,
                    error,
                },
            );
        }
    }
}

impl Operation for SetCookieOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("set cookie") else {
            return;
        };
        let cookie = std::mem::take(&mut self.cookie);
        handle.submit(OperationKind::SetCookie, handle.tag, move |native| {
            native.data_manager().add_cookie(&cookie).map(|()| None)
        });
    }
}

impl Operation for RemoveCookieOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("remove cookie") else {
            return;
        };
        let cookie = std::mem::take(&mut self.cookie);
        handle.submit(OperationKind::RemoveCookie, handle.tag, move |native| {
            native.data_manager().remove_cookie(&cookie).map(|()| None)
        });
    }
}

impl Operation for ListCookieOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("list cookies") else {
            return;
        };
        handle.submit(OperationKind::ListCookies, self.tag, |native| {
            native
                .data_manager()
                .cookies()
                .map(|cookies| Some(WebViewEvent::Cookies(cookies)))
        });
    }
}

impl Operation for SetStorageOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("set storage") else {
            return;
        };
        let (kind, item) = (self.kind, std::mem::take(&mut self.content));
        handle.submit(OperationKind::SetStorage, handle.tag, move |native| {
            native.data_manager().add_storage(kind, &item).map(|()| None)
        });
    }
}

impl Operation for RemoveStorageOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("remove storage") else {
            return;
        };
        let (kind, item) = (self.kind, std::mem::take(&mut self.content));
        handle.submit(OperationKind::RemoveStorage, handle.tag, move |native| {
            native.data_manager().remove_storage(kind, &item).map(|()| None)
        });
    }
}

impl Operation for ListStorageOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("list storage") else {
            return;
        };
        let kind = self.kind;
        handle.submit(OperationKind::ListStorage, self.tag, move |native| {
            native
                .data_manager()
                .storage(kind)
                .map(|items| Some(WebViewEvent::Storage { kind, items }))
        });
    }
}

impl Operation for ExecuteJavascriptOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("execute javascript") else {
            return;
        };
        let script = std::mem::take(&mut self.script);
        handle.submit(OperationKind::ExecuteJavascript, handle.tag, move |native| {
            native.javascript_manager().run_javascript(&script).map(|()| None)
        });
    }
}

impl Operation for InstallJavascriptOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("install javascript") else {
            return;
        };
        let script = std::mem::take(&mut self.script);
        handle.submit(OperationKind::InstallJavascript, handle.tag, move |native| {
            native
                .javascript_manager()
                .install_javascript(&script, InstallTime::OnLoadStart)
                .map(|()| None)
        });
    }
}

impl Operation for MessageReceiverOp {
    fn execute(&mut self, ctx: &mut ScanContext<'_>) {
        let Some(handle) = ctx.active_handle("message receiver") else {
            return;
        };
        let tag = self.tag;
        let reporter = handle.reporter();
        let callback: MessageCallback =
            Box::new(move |message| reporter.deliver(tag, WebViewEvent::Message(message)));

        if let Err(error) = handle
            .native
            .javascript_manager()
            .add_callback(&self.name, callback)
        {
            warn!(handle = %handle.id, name = %self.name, %error, "failed to register callback");
            ctx.reporter().deliver(
                tag,
                WebViewEvent::Error {
                    operation: OperationKind::MessageReceiver,
                    error,
                },
            );
        }
    }
}
