#[cfg(feature = "tracing")]
macro_rules! lf_trace {
    ($($tt:tt)*) => {
        tracing::trace!(target: "livefeed", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! lf_trace {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! lf_debug {
    ($($tt:tt)*) => {
        tracing::debug!(target: "livefeed", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! lf_debug {
    ($($tt:tt)*) => {};
}

#[cfg(feature = "tracing")]
macro_rules! lf_warn {
    ($($tt:tt)*) => {
        tracing::warn!(target: "livefeed", $($tt)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! lf_warn {
    ($($tt:tt)*) => {};
}
