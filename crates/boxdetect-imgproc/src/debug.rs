use boxdetect_image::Image;

/// Callback receiving a labelled intermediate image for visualization.
///
/// Hooks are invoked on the calling thread, once per operation, after its result has
/// been computed. They only see a shared reference, so they cannot alter the result.
pub type DebugHook<'a> = &'a dyn Fn(&str, &Image<u8, 1>);

pub(crate) fn emit(hook: Option<DebugHook<'_>>, label: &str, image: &Image<u8, 1>) {
    if let Some(hook) = hook {
        log::trace!("debug hook: {label} ({})", image.size());
        hook(label, image);
    }
}
