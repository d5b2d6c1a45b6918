#[doc(hidden)]
#[macro_export]
macro_rules! __exec_trace_internal {
    ($trace_type:ident; $($element:tt)*) => {{
        #[cfg(feature = "tracing")]
        tracing::$trace_type!($($element)*);
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __exec_trace {
    ($($element:tt)*) => {{
        $crate::__exec_trace_internal!(trace; $($element)*)
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __exec_trace_debug {
    ($($element:tt)*) => {{
        $crate::__exec_trace_internal!(debug; $($element)*)
    }};
}
