//! Open-time decoding options.

/// Flags controlling how eagerly an [`crate::NxFile`] materializes
/// lazy values. Fixed for the file's lifetime; passed to
/// [`crate::NxFile::open`].
///
/// The default is fully lazy: nothing beyond the 52-byte header is
/// decoded until something asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Options {
    /// Decode a string node's value when the node is first
    /// materialized instead of on first value access.
    pub eager_strings: bool,
    /// Copy an audio node's bytes when the node is first materialized.
    pub eager_audio: bool,
    /// Decompress a bitmap node's pixels when the node is first
    /// materialized. Overridden by `never_bitmap`.
    pub eager_bitmap: bool,
    /// Never decode bitmaps; bitmap accessors report the value as
    /// absent without touching the bitmap block. Takes precedence over
    /// `eager_bitmap`.
    pub never_bitmap: bool,
    /// Materialize every node and its child map on the first `root()`
    /// call, defeating laziness. Useful for preloading and profiling.
    pub eager_file: bool,
}

impl Options {
    /// Fully lazy decoding (the default).
    pub const fn new() -> Self {
        Self {
            eager_strings: false,
            eager_audio: false,
            eager_bitmap: false,
            never_bitmap: false,
            eager_file: false,
        }
    }

    /// Eagerly decode all property values (strings, audio, bitmaps)
    /// at node-materialization time.
    pub const fn eager_properties() -> Self {
        Self {
            eager_strings: true,
            eager_audio: true,
            eager_bitmap: true,
            never_bitmap: false,
            eager_file: false,
        }
    }

    /// Whether bitmap decoding is permitted at all.
    pub(crate) const fn bitmaps_enabled(&self) -> bool {
        !self.never_bitmap
    }
}
