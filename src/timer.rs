//! Target-specific clock and sleep.
//!
//! Native targets use `tokio::time`, so tests running on a paused runtime
//! observe exact delays. WASM targets go through `setTimeout` and `Date.now()`.

#[cfg(not(target_arch = "wasm32"))]
pub(crate) use tokio::time::{sleep, sleep_until, Instant};

#[cfg(target_arch = "wasm32")]
pub(crate) use self::wasm::{sleep, sleep_until, Instant};

#[cfg(target_arch = "wasm32")]
mod wasm {
    use std::{ops::Add, time::Duration};

    use wasm_bindgen::{JsCast, JsValue};

    /// Milliseconds since the Unix epoch, as reported by the JS runtime.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
    pub(crate) struct Instant(Duration);

    impl Instant {
        pub(crate) fn now() -> Self {
            Self(Duration::from_millis(js_sys::Date::now().max(0.0) as u64))
        }

        pub(crate) fn saturating_duration_since(&self, earlier: Self) -> Duration {
            self.0.saturating_sub(earlier.0)
        }
    }

    impl Add<Duration> for Instant {
        type Output = Self;

        fn add(self, rhs: Duration) -> Self {
            Self(self.0.saturating_add(rhs))
        }
    }

    pub(crate) async fn sleep(duration: Duration) {
        let millis = duration.as_millis().min(i32::MAX as u128) as f64;
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            let global = js_sys::global();
            let set_timeout = js_sys::Reflect::get(&global, &JsValue::from_str("setTimeout"))
                .ok()
                .and_then(|value| value.dyn_into::<js_sys::Function>().ok());
            match set_timeout {
                Some(set_timeout) => {
                    let _ = set_timeout.call2(&global, &resolve, &JsValue::from_f64(millis));
                }
                // No timer API; resolve immediately rather than hang.
                None => {
                    let _ = resolve.call0(&JsValue::NULL);
                }
            }
        });
        let _ = wasm_bindgen_futures::JsFuture::from(promise).await;
    }

    pub(crate) async fn sleep_until(deadline: Instant) {
        sleep(deadline.saturating_duration_since(Instant::now())).await;
    }
}
