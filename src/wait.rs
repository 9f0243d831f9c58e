/// Bounded polling for DOM conditions
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch, js_name = sleep)]
    async fn js_sleep(ms: u32) -> Result<(), JsValue>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaitPolicy {
    pub timeout_ms: u32,
    pub interval_ms: u32,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        WaitPolicy {
            timeout_ms: 10_000,
            interval_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WaitError {
    Timeout,
    Cancelled,
}

impl fmt::Display for WaitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WaitError::Timeout => write!(f, "timed out"),
            WaitError::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Shared flag flipped when the page goes away. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, ms: u32);
}

/// setTimeout-backed sleep
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserSleeper;

impl Sleeper for BrowserSleeper {
    async fn sleep(&self, ms: u32) {
        if let Err(e) = js_sleep(ms).await {
            log::warn!("sleep({}) failed: {:?}", ms, e);
        }
    }
}

/// Re-run `check` every `interval_ms` until it yields a value, the time budget
/// runs out, or `cancel` fires. The check always runs at least once.
pub async fn wait_for<T, S, F>(
    sleeper: &S,
    policy: WaitPolicy,
    cancel: &CancelToken,
    mut check: F,
) -> Result<T, WaitError>
where
    S: Sleeper,
    F: FnMut() -> Option<T>,
{
    let interval = policy.interval_ms.max(1);
    let mut waited: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(WaitError::Cancelled);
        }
        if let Some(found) = check() {
            return Ok(found);
        }
        if waited >= policy.timeout_ms {
            return Err(WaitError::Timeout);
        }
        sleeper.sleep(interval).await;
        waited = waited.saturating_add(interval);
    }
}
