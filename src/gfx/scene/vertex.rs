//! # Vertex Layout Descriptor
//!
//! Meshes store interleaved `f32` vertex data. Which per-vertex channels are
//! present is described by a [`VertexLayout`]; stride and attribute offsets are
//! derived from it rather than hand-coded.
//!
//! Channels always appear in the canonical order
//! `position[3], color[3], uv[2], normal[3]`, so the four layouts in use are:
//!
//! | Layout | Channels | Stride |
//! |---|---|---|
//! | [`VertexLayout::MINIMAL`] | position | 3 |
//! | [`VertexLayout::EXTENDED`] | position, color | 6 |
//! | [`VertexLayout::TEXTURED`] | position, color, uv | 8 |
//! | [`VertexLayout::FULL`] | position, color, uv, normal | 11 |

/// A single per-vertex attribute stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexChannel {
    Position,
    Color,
    TexCoord,
    Normal,
}

impl VertexChannel {
    /// All channels in canonical interleaving order
    pub const ALL: [VertexChannel; 4] = [
        VertexChannel::Position,
        VertexChannel::Color,
        VertexChannel::TexCoord,
        VertexChannel::Normal,
    ];

    /// Number of `f32` components in this channel
    pub const fn components(self) -> usize {
        match self {
            VertexChannel::Position | VertexChannel::Color | VertexChannel::Normal => 3,
            VertexChannel::TexCoord => 2,
        }
    }

    /// Shader input location the channel is bound to
    pub const fn shader_location(self) -> u32 {
        match self {
            VertexChannel::Position => 0,
            VertexChannel::Color => 1,
            VertexChannel::TexCoord => 2,
            VertexChannel::Normal => 3,
        }
    }

    /// Value written for this channel when a layout lacks it
    const fn fill_value(self) -> f32 {
        match self {
            VertexChannel::Color => 1.0,
            _ => 0.0,
        }
    }

    const fn bit(self) -> u8 {
        1 << self.shader_location()
    }
}

/// The set of channels enabled on a mesh
///
/// Position is always present. Construct with one of the constants or with
/// [`VertexLayout::from_channels`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    mask: u8,
}

impl VertexLayout {
    pub const MINIMAL: VertexLayout = VertexLayout {
        mask: VertexChannel::Position.bit(),
    };
    pub const EXTENDED: VertexLayout = VertexLayout {
        mask: VertexChannel::Position.bit() | VertexChannel::Color.bit(),
    };
    pub const TEXTURED: VertexLayout = VertexLayout {
        mask: VertexChannel::Position.bit()
            | VertexChannel::Color.bit()
            | VertexChannel::TexCoord.bit(),
    };
    pub const FULL: VertexLayout = VertexLayout {
        mask: VertexChannel::Position.bit()
            | VertexChannel::Color.bit()
            | VertexChannel::TexCoord.bit()
            | VertexChannel::Normal.bit(),
    };

    /// Builds a layout from any list of channels; order and duplicates are
    /// ignored and position is always added.
    pub fn from_channels(channels: &[VertexChannel]) -> Self {
        let mask = channels
            .iter()
            .fold(VertexChannel::Position.bit(), |mask, c| mask | c.bit());
        Self { mask }
    }

    pub fn contains(&self, channel: VertexChannel) -> bool {
        self.mask & channel.bit() != 0
    }

    /// Enabled channels in interleaving order
    pub fn channels(&self) -> impl Iterator<Item = VertexChannel> + '_ {
        VertexChannel::ALL
            .into_iter()
            .filter(move |c| self.contains(*c))
    }

    /// Floats per vertex
    pub fn stride(&self) -> usize {
        self.channels().map(VertexChannel::components).sum()
    }

    pub fn stride_bytes(&self) -> usize {
        self.stride() * std::mem::size_of::<f32>()
    }

    /// Float offset of `channel` within one vertex, `None` if disabled
    pub fn offset(&self, channel: VertexChannel) -> Option<usize> {
        if !self.contains(channel) {
            return None;
        }
        Some(
            self.channels()
                .take_while(|c| *c != channel)
                .map(VertexChannel::components)
                .sum(),
        )
    }

    /// Number of whole vertices in `float_count` floats
    pub fn vertex_count(&self, float_count: usize) -> usize {
        float_count / self.stride()
    }

    /// Rewrites interleaved `vertices` into the [`VertexLayout::FULL`] layout,
    /// filling absent channels with white color, zero UVs and zero normals.
    pub fn widen_to_full(&self, vertices: &[f32]) -> Vec<f32> {
        if *self == Self::FULL {
            return vertices.to_vec();
        }

        let stride = self.stride();
        let mut widened = Vec::with_capacity(vertices.len() / stride * Self::FULL.stride());
        for vertex in vertices.chunks_exact(stride) {
            for channel in VertexChannel::ALL {
                match self.offset(channel) {
                    Some(offset) => {
                        widened.extend_from_slice(&vertex[offset..offset + channel.components()])
                    }
                    None => widened
                        .extend(std::iter::repeat(channel.fill_value()).take(channel.components())),
                }
            }
        }
        widened
    }

    /// Vertex buffer layout of the [`VertexLayout::FULL`] format.
    ///
    /// The wgpu backend widens every layout on upload, so a single buffer
    /// layout describes all GPU-side vertex data:
    /// - location 0: position (Float32x3)
    /// - location 1: color (Float32x3)
    /// - location 2: uv (Float32x2)
    /// - location 3: normal (Float32x3)
    pub fn full_buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x3
        ];

        wgpu::VertexBufferLayout {
            array_stride: (Self::FULL.stride_bytes()) as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBUTES,
        }
    }
}

impl Default for VertexLayout {
    fn default() -> Self {
        Self::FULL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_follow_enabled_channels() {
        assert_eq!(VertexLayout::MINIMAL.stride(), 3);
        assert_eq!(VertexLayout::EXTENDED.stride(), 6);
        assert_eq!(VertexLayout::TEXTURED.stride(), 8);
        assert_eq!(VertexLayout::FULL.stride(), 11);
        assert_eq!(VertexLayout::FULL.stride_bytes(), 44);
    }

    #[test]
    fn offsets_are_derived_in_canonical_order() {
        let full = VertexLayout::FULL;
        assert_eq!(full.offset(VertexChannel::Position), Some(0));
        assert_eq!(full.offset(VertexChannel::Color), Some(3));
        assert_eq!(full.offset(VertexChannel::TexCoord), Some(6));
        assert_eq!(full.offset(VertexChannel::Normal), Some(8));

        let pos_normal =
            VertexLayout::from_channels(&[VertexChannel::Normal, VertexChannel::Position]);
        assert_eq!(pos_normal.stride(), 6);
        assert_eq!(pos_normal.offset(VertexChannel::Normal), Some(3));
        assert_eq!(pos_normal.offset(VertexChannel::Color), None);
    }

    #[test]
    fn from_channels_always_includes_position() {
        let layout = VertexLayout::from_channels(&[VertexChannel::Color, VertexChannel::Color]);
        assert_eq!(layout, VertexLayout::EXTENDED);
        assert_eq!(VertexLayout::from_channels(&[]), VertexLayout::MINIMAL);
    }

    #[test]
    fn widening_fills_missing_channels() {
        let extended = [1.0, 2.0, 3.0, 0.5, 0.25, 0.125];
        let full = VertexLayout::EXTENDED.widen_to_full(&extended);
        assert_eq!(
            full,
            vec![1.0, 2.0, 3.0, 0.5, 0.25, 0.125, 0.0, 0.0, 0.0, 0.0, 0.0]
        );

        let minimal = [4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let full = VertexLayout::MINIMAL.widen_to_full(&minimal);
        assert_eq!(full.len(), 22);
        assert_eq!(&full[3..6], &[1.0, 1.0, 1.0]);
        assert_eq!(&full[11..14], &[7.0, 8.0, 9.0]);
    }
}
