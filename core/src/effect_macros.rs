//! Shorthand for building effects inside reducers.
//!
//! Both macros expand to plain `Effect` values; the boxing and `Arc` cloning
//! they hide is the only thing they add.

/// Builds an [`Effect::Snapshot`](crate::effect::Effect::Snapshot) that saves
/// `snapshot` to `store` and then feeds back one of two actions.
///
/// `store` is any `Arc<dyn SnapshotStore>` place expression; it is cloned,
/// not moved. Both callbacks are `move` closures.
///
/// ```rust,ignore
/// save_snapshot! {
///     store: env.snapshots,
///     snapshot: state.snapshot()?,
///     on_success: |_saved| Some(TodoAction::TodoCreated { request_id, id, index }),
///     on_error: |_error| Some(TodoAction::TodoCreated { request_id, id, index })
/// }
/// ```
#[macro_export]
macro_rules! save_snapshot {
    (
        store: $store:expr,
        snapshot: $snapshot:expr,
        on_success: |$saved:ident| $on_success:expr,
        on_error: |$error:ident| $on_error:expr
    ) => {
        $crate::effect::Effect::Snapshot($crate::effect::SnapshotOperation::Save {
            snapshot_store: ::std::sync::Arc::clone(&$store),
            snapshot: $snapshot,
            on_success: ::std::boxed::Box::new(move |$saved| $on_success),
            on_error: ::std::boxed::Box::new(move |$error| $on_error),
        })
    };
}

/// Wraps an `async move` block yielding `Option<Action>` into an
/// [`Effect::Future`](crate::effect::Effect::Future).
///
/// ```rust,ignore
/// async_effect! { Some(TodoAction::TodoNotFound { request_id, index }) }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(::std::boxed::Box::pin(async move { $($body)* }))
    };
}
