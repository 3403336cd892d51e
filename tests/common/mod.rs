//! Synthetic NX file builder for tests.
//!
//! Emits a complete in-memory NX image: header, contiguous node
//! descriptor table, string/bitmap/audio offset tables and their data.
//! Offset-table entries are absolute file positions, as the decoder
//! expects.

use nxkit::MAGIC;

/// One 20-byte node descriptor, in raw on-disk form.
#[derive(Clone, Copy)]
pub struct RawNode {
    pub name_id: u32,
    pub first_child: u32,
    pub child_count: u16,
    pub node_type: u16,
    pub payload: [u8; 8],
}

impl RawNode {
    pub fn nothing(name_id: u32, first_child: u32, child_count: u16) -> Self {
        Self {
            name_id,
            first_child,
            child_count,
            node_type: 0,
            payload: [0; 8],
        }
    }

    pub fn int64(name_id: u32, value: i64) -> Self {
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 1,
            payload: value.to_le_bytes(),
        }
    }

    pub fn double(name_id: u32, value: f64) -> Self {
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 2,
            payload: value.to_le_bytes(),
        }
    }

    pub fn string(name_id: u32, string_id: u32) -> Self {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&string_id.to_le_bytes());
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 3,
            payload,
        }
    }

    pub fn point(name_id: u32, x: i32, y: i32) -> Self {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&x.to_le_bytes());
        payload[4..].copy_from_slice(&y.to_le_bytes());
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 4,
            payload,
        }
    }

    pub fn bitmap(name_id: u32, bitmap_id: u32, width: u16, height: u16) -> Self {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&bitmap_id.to_le_bytes());
        payload[4..6].copy_from_slice(&width.to_le_bytes());
        payload[6..].copy_from_slice(&height.to_le_bytes());
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 5,
            payload,
        }
    }

    pub fn audio(name_id: u32, audio_id: u32, length: i32) -> Self {
        let mut payload = [0u8; 8];
        payload[..4].copy_from_slice(&audio_id.to_le_bytes());
        payload[4..].copy_from_slice(&length.to_le_bytes());
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type: 6,
            payload,
        }
    }

    /// A descriptor with an arbitrary (possibly invalid) type value.
    pub fn typed(name_id: u32, node_type: u16) -> Self {
        Self {
            name_id,
            first_child: 0,
            child_count: 0,
            node_type,
            payload: [0; 8],
        }
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.name_id.to_le_bytes());
        out.extend_from_slice(&self.first_child.to_le_bytes());
        out.extend_from_slice(&self.child_count.to_le_bytes());
        out.extend_from_slice(&self.node_type.to_le_bytes());
        out.extend_from_slice(&self.payload);
    }
}

enum BitmapEntry {
    /// Raw RGBA pixels, compressed by the builder.
    Pixels { width: u16, height: u16, rgba: Vec<u8> },
    /// Pre-built compressed bytes, for corrupt-input tests.
    Compressed { width: u16, height: u16, data: Vec<u8> },
}

/// Builder for a complete synthetic NX byte image.
#[derive(Default)]
pub struct NxBuilder {
    nodes: Vec<RawNode>,
    strings: Vec<Vec<u8>>,
    bitmaps: Vec<BitmapEntry>,
    audio: Vec<Vec<u8>>,
}

impl NxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, node: RawNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        assert!(s.len() <= u16::MAX as usize);
        self.strings.push(s.as_bytes().to_vec());
        self
    }

    pub fn bitmap(mut self, width: u16, height: u16, rgba: &[u8]) -> Self {
        assert_eq!(rgba.len(), usize::from(width) * usize::from(height) * 4);
        self.bitmaps.push(BitmapEntry::Pixels {
            width,
            height,
            rgba: rgba.to_vec(),
        });
        self
    }

    pub fn corrupt_bitmap(mut self, width: u16, height: u16) -> Self {
        self.bitmaps.push(BitmapEntry::Compressed {
            width,
            height,
            data: vec![0xFF; 8],
        });
        self
    }

    pub fn audio(mut self, bytes: &[u8]) -> Self {
        self.audio.push(bytes.to_vec());
        self
    }

    pub fn build(self) -> Vec<u8> {
        let node_block = 52u64;
        let mut nodes = Vec::new();
        for n in &self.nodes {
            n.encode(&mut nodes);
        }

        // String offset table, then string entries.
        let string_block = node_block + nodes.len() as u64;
        let mut string_data = Vec::new();
        let mut string_offsets = Vec::new();
        let strings_start = string_block + self.strings.len() as u64 * 8;
        for s in &self.strings {
            string_offsets.push(strings_start + string_data.len() as u64);
            string_data.extend_from_slice(&(s.len() as u16).to_le_bytes());
            string_data.extend_from_slice(s);
        }

        // Bitmap offset table, then bitmap records.
        let bitmap_block = strings_start + string_data.len() as u64;
        let mut bitmap_data = Vec::new();
        let mut bitmap_offsets = Vec::new();
        let bitmaps_start = bitmap_block + self.bitmaps.len() as u64 * 8;
        for b in &self.bitmaps {
            bitmap_offsets.push(bitmaps_start + bitmap_data.len() as u64);
            let (width, height, compressed) = match b {
                BitmapEntry::Pixels { width, height, rgba } => {
                    (*width, *height, lz4_flex::block::compress(rgba))
                }
                BitmapEntry::Compressed { width, height, data } => {
                    (*width, *height, data.clone())
                }
            };
            bitmap_data.extend_from_slice(&width.to_le_bytes());
            bitmap_data.extend_from_slice(&height.to_le_bytes());
            bitmap_data.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            bitmap_data.extend_from_slice(&compressed);
        }

        // Audio offset table, then audio records.
        let audio_block = bitmaps_start + bitmap_data.len() as u64;
        let mut audio_data = Vec::new();
        let mut audio_offsets = Vec::new();
        let audio_start = audio_block + self.audio.len() as u64 * 8;
        for a in &self.audio {
            audio_offsets.push(audio_start + audio_data.len() as u64);
            audio_data.extend_from_slice(&(a.len() as i32).to_le_bytes());
            audio_data.extend_from_slice(a);
        }

        let mut out = Vec::new();
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());
        out.extend_from_slice(&(node_block as i64).to_le_bytes());
        out.extend_from_slice(&(self.strings.len() as u32).to_le_bytes());
        out.extend_from_slice(&(string_block as i64).to_le_bytes());
        out.extend_from_slice(&(self.bitmaps.len() as u32).to_le_bytes());
        out.extend_from_slice(&(bitmap_block as i64).to_le_bytes());
        out.extend_from_slice(&(self.audio.len() as u32).to_le_bytes());
        out.extend_from_slice(&(audio_block as i64).to_le_bytes());
        assert_eq!(out.len(), 52);

        out.extend_from_slice(&nodes);
        for off in string_offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        out.extend_from_slice(&string_data);
        for off in bitmap_offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        out.extend_from_slice(&bitmap_data);
        for off in audio_offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        out.extend_from_slice(&audio_data);
        out
    }
}

pub const SPRITE_RGBA: [u8; 16] = [
    0xFF, 0x00, 0x00, 0xFF, // red
    0x00, 0xFF, 0x00, 0xFF, // green
    0x00, 0x00, 0xFF, 0xFF, // blue
    0xFF, 0xFF, 0xFF, 0x00, // transparent white
];

pub const VOICE_BYTES: [u8; 6] = [0x4F, 0x67, 0x67, 0x53, 0x00, 0x02];

/// A file exercising every node type:
///
/// ```text
/// "" (root, Nothing)
/// ├── answer   Int64  42
/// ├── pi       Double 3.25
/// ├── greeting String "hello world"
/// ├── position Point  (-3, 17)
/// ├── sprite   Bitmap id 0, 2x2
/// ├── voice    Audio  id 0, 6 bytes
/// └── dir      Nothing
///     └── deep Int64  -7
/// ```
pub fn sample_file() -> Vec<u8> {
    NxBuilder::new()
        .node(RawNode::nothing(0, 1, 7))
        .node(RawNode::int64(1, 42))
        .node(RawNode::double(2, 3.25))
        .node(RawNode::string(3, 7))
        .node(RawNode::point(4, -3, 17))
        .node(RawNode::bitmap(5, 0, 2, 2))
        .node(RawNode::audio(6, 0, VOICE_BYTES.len() as i32))
        .node(RawNode::nothing(8, 8, 1))
        .node(RawNode::int64(9, -7))
        .string("")
        .string("answer")
        .string("pi")
        .string("greeting")
        .string("position")
        .string("sprite")
        .string("voice")
        .string("hello world")
        .string("dir")
        .string("deep")
        .bitmap(2, 2, &SPRITE_RGBA)
        .audio(&VOICE_BYTES)
        .build()
}
