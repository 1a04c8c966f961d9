//! # CosmWasm Logging
//!
//! `log`-style macros for CosmWasm contracts.
//!
//! With the `logging` feature the standard `log` macros are re-exported and every
//! record is written through `Api::debug` as `target: [LEVEL] message`. Without
//! the feature the macros type-check their arguments and expand to nothing, so
//! production wasm carries no formatting code.
//!
//! Call [`init_cosmwasm_logger`] at the top of each entry point. The api handle
//! is refreshed on every call, the global logger is installed once.
//!
//! ```toml
//! [dependencies]
//! cosmwasm-logging = { path = "../../packages/cosmwasm-logging" }
//!
//! [features]
//! logging = ["cosmwasm-logging/logging"]
//! ```

#[cfg(feature = "logging")]
mod enabled {
    use cosmwasm_std::Api;
    use log::{LevelFilter, Log, Metadata, Record};
    use std::cell::Cell;
    use std::sync::Once;

    pub use log::{debug, error, info, log, trace, warn};

    static LOGGER: ApiLogger = ApiLogger;
    static INSTALL: Once = Once::new();

    thread_local! {
        static CURRENT_API: Cell<Option<*const dyn Api>> = const { Cell::new(None) };
    }

    struct ApiLogger;

    impl Log for ApiLogger {
        fn enabled(&self, _metadata: &Metadata) -> bool {
            CURRENT_API.with(|api| api.get().is_some())
        }

        fn log(&self, record: &Record) {
            CURRENT_API.with(|api| {
                if let Some(api) = api.get() {
                    let line = format!(
                        "{}: [{}] {}",
                        record.target(),
                        record.level().as_str(),
                        record.args()
                    );
                    // SAFETY: the pointer is replaced on every entry point call and the
                    // host keeps the api alive for the whole call.
                    unsafe { (*api).debug(&line) };
                }
            });
        }

        fn flush(&self) {}
    }

    /// Points the logger at `api` and installs it on first use.
    pub fn init_cosmwasm_logger(api: &dyn Api) {
        let ptr: *const (dyn Api + '_) = api;
        // SAFETY: lifetime erasure only, see `ApiLogger::log`.
        let ptr: *const dyn Api = unsafe { std::mem::transmute(ptr) };
        CURRENT_API.with(|current| current.set(Some(ptr)));
        INSTALL.call_once(|| {
            if log::set_logger(&LOGGER).is_ok() {
                log::set_max_level(LevelFilter::Trace);
            }
        });
    }
}

#[cfg(not(feature = "logging"))]
mod disabled {
    /// No-op when the `logging` feature is off.
    pub fn init_cosmwasm_logger(_api: &dyn cosmwasm_std::Api) {}

    #[doc(hidden)]
    #[macro_export]
    macro_rules! __discard_log {
        (target: $target:expr, $($arg:tt)+) => {
            if false {
                let _ = $target;
                let _ = format_args!($($arg)+);
            }
        };
        ($($arg:tt)+) => {
            if false {
                let _ = format_args!($($arg)+);
            }
        };
    }

    #[macro_export]
    macro_rules! error {
        ($($arg:tt)+) => { $crate::__discard_log!($($arg)+) };
    }

    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)+) => { $crate::__discard_log!($($arg)+) };
    }

    #[macro_export]
    macro_rules! info {
        ($($arg:tt)+) => { $crate::__discard_log!($($arg)+) };
    }

    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)+) => { $crate::__discard_log!($($arg)+) };
    }

    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)+) => { $crate::__discard_log!($($arg)+) };
    }
}

#[cfg(feature = "logging")]
pub use enabled::*;

#[cfg(not(feature = "logging"))]
pub use disabled::*;

#[cfg(test)]
mod tests {
    use super::*;
    use cosmwasm_std::testing::mock_dependencies;

    #[test]
    fn reinit_with_fresh_api() {
        for _ in 0..3 {
            let deps = mock_dependencies();
            init_cosmwasm_logger(&deps.api);
            debug!("fresh api {}", 1);
        }
    }

    #[test]
    fn macro_arguments_are_used() {
        let nonce = 7u64;
        let err = "boom";
        error!(target: "hyperion::attestation", "nonce {nonce}: {err}");
        warn!("refund failed: {}", err);
        info!("observed {nonce}");
        trace!("{:?}", (nonce, err));
    }
}
