//! Test utilities for reconciliation tests
//!
//! Provides route-tree fixtures, a ready-made reconciler, and small async
//! helpers shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use route_reconciler::*;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// Route the logging macros into the test harness output.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// The route tree most tests run against.
///
/// ```text
/// /                    IndexRoute
/// /home                HomeRoute
/// /settings            SettingsRoute
/// /users/:id           UserRoute
/// /users/:id/profile     ProfileRoute
/// /admin               AdminRoute
/// /login               LoginRoute
/// /old-home            → /home
/// ```
pub fn app_tree() -> RouteTree {
    RouteTree::new(vec![
        Route::new("").name("IndexRoute"),
        Route::new("home").name("HomeRoute"),
        Route::new("settings").name("SettingsRoute"),
        Route::new("users/:id")
            .name("UserRoute")
            .children(vec![Route::new("profile").name("ProfileRoute")]),
        Route::new("admin").name("AdminRoute"),
        Route::new("login").name("LoginRoute"),
        Route::redirect("old-home", "/home"),
    ])
}

/// Parse `location` the way a platform adapter would.
pub fn location(path: &str) -> UrlState {
    RouteInformationParser::new(app_tree()).parse(path)
}

pub fn page(name: &str, path: &str) -> PageRouteRequest {
    PageRouteRequest::new(name, path)
}

/// A reconciler over a fresh [`MemoryStack`] and history.
pub struct Fixture {
    pub stack: Rc<MemoryStack>,
    pub history: NavigationHistory,
    pub reconciler: RouteReconciler<RouteTree>,
}

impl Fixture {
    pub fn new() -> Self {
        init_logger();
        let stack = Rc::new(MemoryStack::new());
        Self {
            reconciler: RouteReconciler::new(stack.clone(), app_tree()),
            stack,
            history: NavigationHistory::new(),
        }
    }

    pub async fn go(&self, path: &str) -> Result<(), NavigationError> {
        self.reconciler.reconcile(&self.history, location(path)).await
    }
}

/// A fresh stack and a delegate over it.
pub fn delegate_with(options: DelegateOptions) -> (Rc<MemoryStack>, RouterDelegate<RouteTree>) {
    init_logger();
    let stack = Rc::new(MemoryStack::new());
    let delegate = RouterDelegate::new(stack.clone(), app_tree(), options)
        .expect("valid delegate options");
    (stack, delegate)
}

/// A shared counter and a listener that bumps it.
pub fn counter() -> (Rc<Cell<usize>>, impl Fn() + 'static) {
    let count = Rc::new(Cell::new(0));
    let c = Rc::clone(&count);
    (count, move || c.set(c.get() + 1))
}

/// Future that returns `Pending` once before completing.
pub struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}

pub fn yield_now() -> YieldNow {
    YieldNow { yielded: false }
}

/// Guard that suspends before allowing, recording when it starts and ends.
pub struct SuspendingGuard {
    pub log: Rc<RefCell<Vec<String>>>,
}

#[async_trait(?Send)]
impl PageGuard for SuspendingGuard {
    async fn check(&self, request: &NavigationRequest) -> NavigationAction {
        self.log.borrow_mut().push(format!("start {}", request.to));
        yield_now().await;
        yield_now().await;
        self.log.borrow_mut().push(format!("end {}", request.to));
        NavigationAction::Continue
    }

    fn name(&self) -> &'static str {
        "SuspendingGuard"
    }
}
