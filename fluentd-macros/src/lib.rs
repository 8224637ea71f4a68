#[doc(hidden)]
pub use log as __log;

/// Expands `$body` as a `macro_rules!` definition invoked with a literal `$`.
/// Lets macros generated by other macros declare their own repetitions.
#[macro_export]
macro_rules! with_dollar_sign {
    ($($body:tt)*) => {
        macro_rules! __with_dollar_sign { $($body)* }
        __with_dollar_sign!($);
    };
}

#[macro_export]
macro_rules! fluentd_log {
    ($level:ident, $target:expr => ($($arg:tt)+)) => {
        $crate::__log::log!(
            target: $target,
            $crate::__log::Level::$level,
            "[{}] {}",
            $target,
            format_args!($($arg)+)
        )
    };
}

#[macro_export]
macro_rules! fluentd_trace {
    ($target:expr => $($arg:tt)+) => {
        fluentd_log!(Trace, $target => ($($arg)+))
    };
}

#[macro_export]
macro_rules! fluentd_debug {
    ($target:expr => $($arg:tt)+) => {
        fluentd_log!(Debug, $target => ($($arg)+))
    };
}

#[macro_export]
macro_rules! fluentd_info {
    ($target:expr => $($arg:tt)+) => {
        fluentd_log!(Info, $target => ($($arg)+))
    };
}

#[macro_export]
macro_rules! fluentd_warn {
    ($target:expr => $($arg:tt)+) => {
        fluentd_log!(Warn, $target => ($($arg)+))
    };
}

#[macro_export]
macro_rules! fluentd_error {
    ($target:expr => $($arg:tt)+) => {
        fluentd_log!(Error, $target => ($($arg)+))
    };
}

/// Declares module local `trace!`, `debug!`, `info!`, `warn!` and `error!`
/// macros logging under the component name `$target`.
///
/// The calling module needs `with_dollar_sign`, `fluentd_log` and the
/// `fluentd_*` macros it ends up using in scope.
#[macro_export]
macro_rules! logger {
    ($target:literal) => {
        with_dollar_sign! {
            ($d:tt) => {
                #[allow(unused_macros)]
                macro_rules! trace {
                    ($d($d arg:tt)+) => {
                        fluentd_trace!($target => $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! debug {
                    ($d($d arg:tt)+) => {
                        fluentd_debug!($target => $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! info {
                    ($d($d arg:tt)+) => {
                        fluentd_info!($target => $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! warn {
                    ($d($d arg:tt)+) => {
                        fluentd_warn!($target => $d($d arg)+)
                    };
                }

                #[allow(unused_macros)]
                macro_rules! error {
                    ($d($d arg:tt)+) => {
                        fluentd_error!($target => $d($d arg)+)
                    };
                }
            }
        }
    };
}
