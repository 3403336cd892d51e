//! The NX file runtime: open, caches, blob loaders, path resolution.
//!
//! An [`NxFile`] owns the byte buffer (through a boxed [`Buffer`]
//! provider) and four per-file cache arrays sized from the header
//! counts at open time: node records, strings, bitmap pixels, audio
//! bytes, plus one child-name map slot per node. Only the 52-byte
//! header is parsed at open; everything else is decoded on first use.
//!
//! ## Cache discipline
//! Every cache slot is a [`OnceLock`] filled by *idempotent publish*:
//! a thread computes the value with no lock held, then publishes it
//! into the slot; if another thread won the race, the redundant value
//! is dropped and the winner's is used. This is safe because each slot
//! is a deterministic pure function of immutable bytes - concurrent
//! first accesses can waste work but can never disagree. A failed
//! materialization (for example a corrupt LZ4 payload) leaves its slot
//! empty, so the access is retryable and never poisons the file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use tracing::debug;

use crate::buffer::Buffer;
use crate::header::Header;
use crate::node::{Bitmap, Node, NodeRecord, NODE_LEN};
use crate::options::Options;
use crate::utils::{le_i32, le_u16, le_u32, le_u64, prefixed_string, slice};
use crate::{Error, Result};

type ChildMap = HashMap<Box<str>, u32>;

/// An open, read-only NX file.
///
/// All nodes, strings, and blob values borrow from the `NxFile`, so
/// the borrow checker guarantees the buffer outlives every value
/// derived from it. `NxFile` is `Sync`; any number of threads may read
/// concurrently with no external locking.
pub struct NxFile {
    data: Box<dyn Buffer>,
    options: Options,
    header: Header,
    nodes: Box<[OnceLock<NodeRecord>]>,
    strings: Box<[OnceLock<Box<str>>]>,
    bitmaps: Box<[OnceLock<Box<[u8]>>]>,
    audio: Box<[OnceLock<Box<[u8]>>]>,
    // Boxed so an unbuilt slot costs one pointer, not a whole HashMap.
    children: Box<[OnceLock<Box<ChildMap>>]>,
    preloaded: OnceLock<()>,
}

fn slots<T>(n: u32) -> Box<[OnceLock<T>]> {
    (0..n).map(|_| OnceLock::new()).collect()
}

impl NxFile {
    /// Open an NX file from any [`Buffer`] provider.
    ///
    /// Validates length and magic, records the block metadata, and
    /// allocates the (empty) cache arrays. Nothing else is decoded.
    pub fn open<B: Buffer + 'static>(buffer: B, options: Options) -> Result<Self> {
        let data: Box<dyn Buffer> = Box::new(buffer);
        let header = Header::parse(data.bytes())?;
        debug!(
            nodes = header.node_count,
            strings = header.string_count,
            bitmaps = header.bitmap_count,
            audio = header.audio_count,
            "opened NX file"
        );
        Ok(Self {
            nodes: slots(header.node_count),
            strings: slots(header.string_count),
            bitmaps: slots(header.bitmap_count),
            audio: slots(header.audio_count),
            children: slots(header.node_count),
            preloaded: OnceLock::new(),
            data,
            options,
            header,
        })
    }

    /// Memory-map the file at `path` and open it.
    pub fn map(path: impl AsRef<Path>, options: Options) -> Result<Self> {
        let file = fs::File::open(path)?;
        // Safety: the mapping is read-only and the decoder treats every
        // byte as untrusted input with bounds-checked reads.
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        Self::open(mmap, options)
    }

    /// The options this file was opened with.
    pub fn options(&self) -> Options {
        self.options
    }

    /// Number of nodes in the descriptor table.
    pub fn node_count(&self) -> u32 {
        self.header.node_count
    }

    /// Number of entries in the string table.
    pub fn string_count(&self) -> u32 {
        self.header.string_count
    }

    /// Whether the file carries a bitmap block.
    pub fn has_bitmap(&self) -> bool {
        self.header.bitmap_count > 0
    }

    /// Whether the file carries an audio block.
    pub fn has_audio(&self) -> bool {
        self.header.audio_count > 0
    }

    /// The root node (id 0).
    ///
    /// Under `eager_file`, the first call materializes every node and
    /// its child map before returning.
    pub fn root(&self) -> Result<Node<'_>> {
        let root = self.get_node(0)?;
        if self.options.eager_file {
            self.preload()?;
        }
        Ok(root)
    }

    /// Materialize the node with the given id.
    ///
    /// The first call decodes the 20-byte descriptor and publishes it;
    /// later calls (from any thread) return the cached record. Under
    /// the `eager_*` options, first materialization also resolves the
    /// node's lazy value.
    pub fn get_node(&self, id: u32) -> Result<Node<'_>> {
        let slot = self
            .nodes
            .get(id as usize)
            .ok_or(Error::IndexOutOfRange("node", id))?;
        let record = match slot.get() {
            Some(r) => r,
            None => {
                let offset = self
                    .header
                    .node_block
                    .checked_add(u64::from(id) * NODE_LEN)
                    .ok_or(Error::InvalidRange)?;
                let r = NodeRecord::parse(self.bytes(), offset, id)?;
                let r = slot.get_or_init(|| r);
                self.resolve_eager(r)?;
                r
            }
        };
        Ok(Node::new(self, id, record))
    }

    /// Fetch string `id`, decoding and caching it on first access.
    pub fn get_string(&self, id: u32) -> Result<&str> {
        let slot = self
            .strings
            .get(id as usize)
            .ok_or(Error::IndexOutOfRange("string", id))?;
        if let Some(s) = slot.get() {
            return Ok(s);
        }
        let offset = self.table_entry(self.header.string_block, id)?;
        let s = prefixed_string(self.bytes(), offset)?;
        Ok(slot.get_or_init(|| s))
    }

    /// Resolve a path like `/Character/Hair/00002.img` from the root.
    ///
    /// A leading `/` is optional; empty and `.` segments are skipped.
    /// There is no `..` - the final NX layout has no parent references.
    /// A missing segment fails with [`Error::NotFound`] naming both the
    /// full path and the failing segment.
    pub fn resolve_path(&self, path: &str) -> Result<Node<'_>> {
        let mut node = self.root()?;
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        for segment in trimmed.split('/') {
            if segment.is_empty() || segment == "." {
                continue;
            }
            node = node.get(segment)?.ok_or_else(|| Error::NotFound {
                path: path.to_owned(),
                segment: segment.to_owned(),
            })?;
        }
        Ok(node)
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        self.data.bytes()
    }

    /// This node's name-to-child-id map, built on first use by walking
    /// the contiguous child id range and resolving each child's name.
    pub(crate) fn child_map(&self, id: u32, record: &NodeRecord) -> Result<&ChildMap> {
        let slot = self
            .children
            .get(id as usize)
            .ok_or(Error::IndexOutOfRange("node", id))?;
        if let Some(map) = slot.get() {
            return Ok(map);
        }
        let first = u64::from(record.first_child);
        let mut map = ChildMap::with_capacity(usize::from(record.child_count));
        for child_id in first..first + u64::from(record.child_count) {
            let child_id = u32::try_from(child_id).map_err(|_| Error::InvalidRange)?;
            let child = self.get_node(child_id)?;
            map.insert(child.name()?.into(), child_id);
        }
        Ok(slot.get_or_init(|| Box::new(map)))
    }

    /// Decompress bitmap `id` into its RGBA pixel buffer.
    ///
    /// `Ok(None)` when the file has no bitmap block or was opened with
    /// `never_bitmap`; neither case reads the bitmap block at all.
    pub(crate) fn load_bitmap(&self, id: u32) -> Result<Option<Bitmap<'_>>> {
        if self.header.bitmap_count == 0 || !self.options.bitmaps_enabled() {
            return Ok(None);
        }
        let slot = self
            .bitmaps
            .get(id as usize)
            .ok_or(Error::IndexOutOfRange("bitmap", id))?;
        let offset = self.table_entry(self.header.bitmap_block, id)?;
        // Table entries are untrusted; keep the record arithmetic checked.
        let end = offset.checked_add(8).ok_or(Error::InvalidRange)?;
        let buf = self.bytes();
        let width = le_u16(buf, offset)?;
        let height = le_u16(buf, offset + 2)?;
        if let Some(pixels) = slot.get() {
            return Ok(Some(Bitmap {
                width,
                height,
                data: pixels,
            }));
        }

        let compressed_len = le_u32(buf, offset + 4)? as usize;
        let src = slice(buf, end, compressed_len)?;
        let expected = usize::from(width) * usize::from(height) * 4;
        let pixels = lz4_flex::block::decompress(src, expected).map_err(|_| Error::Lz4)?;
        if pixels.len() != expected {
            return Err(Error::Lz4);
        }
        debug!(id, width, height, "decompressed bitmap");

        let pixels = slot.get_or_init(|| pixels.into_boxed_slice());
        Ok(Some(Bitmap {
            width,
            height,
            data: pixels,
        }))
    }

    /// Copy the raw bytes of audio entry `id`.
    ///
    /// `Ok(None)` when the file has no audio block.
    pub(crate) fn load_audio(&self, id: u32) -> Result<Option<&[u8]>> {
        if self.header.audio_count == 0 {
            return Ok(None);
        }
        let slot = self
            .audio
            .get(id as usize)
            .ok_or(Error::IndexOutOfRange("audio", id))?;
        if let Some(bytes) = slot.get() {
            return Ok(Some(bytes));
        }
        let offset = self.table_entry(self.header.audio_block, id)?;
        let body = offset.checked_add(4).ok_or(Error::InvalidRange)?;
        let len = le_i32(self.bytes(), offset)?;
        let len = usize::try_from(len).map_err(|_| Error::InvalidRange)?;
        let bytes: Box<[u8]> = slice(self.bytes(), body, len)?.into();
        Ok(Some(slot.get_or_init(|| bytes)))
    }

    /// Read entry `id` of the `u64` offset table at `block`. Offsets
    /// are absolute file positions.
    fn table_entry(&self, block: u64, id: u32) -> Result<u64> {
        let offset = block
            .checked_add(u64::from(id) * 8)
            .ok_or(Error::InvalidRange)?;
        le_u64(self.bytes(), offset)
    }

    /// Resolve a node's lazy value at materialization time when the
    /// matching `eager_*` option is set.
    fn resolve_eager(&self, record: &NodeRecord) -> Result<()> {
        use crate::node::Payload;
        match record.payload {
            Payload::String(id) if self.options.eager_strings => {
                self.get_string(id)?;
            }
            Payload::Audio { id, .. } if self.options.eager_audio => {
                self.load_audio(id)?;
            }
            Payload::Bitmap { id, .. }
                if self.options.eager_bitmap && self.options.bitmaps_enabled() =>
            {
                self.load_bitmap(id)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Materialize every node reachable from the root, plus its child
    /// map. Runs once per file; an explicit worklist keeps deep trees
    /// off the call stack.
    fn preload(&self) -> Result<()> {
        if self.preloaded.get().is_some() {
            return Ok(());
        }
        debug!(nodes = self.header.node_count, "preloading full node tree");
        // Visited guard: child ranges in a well-formed file never form a
        // cycle, but a corrupt one must not loop forever.
        let mut visited = vec![false; self.nodes.len()];
        let mut stack = vec![0u32];
        while let Some(id) = stack.pop() {
            // Bounds-check through get_node before touching `visited`.
            let node = self.get_node(id)?;
            if std::mem::replace(&mut visited[id as usize], true) {
                continue;
            }
            let record = node.record();
            self.child_map(id, record)?;
            let first = u64::from(record.first_child);
            for child_id in first..first + u64::from(record.child_count) {
                let child_id = u32::try_from(child_id).map_err(|_| Error::InvalidRange)?;
                stack.push(child_id);
            }
        }
        let _ = self.preloaded.set(());
        Ok(())
    }
}

impl std::fmt::Debug for NxFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NxFile")
            .field("nodes", &self.header.node_count)
            .field("strings", &self.header.string_count)
            .field("bitmaps", &self.header.bitmap_count)
            .field("audio", &self.header.audio_count)
            .finish()
    }
}
