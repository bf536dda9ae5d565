//! Per-shader metadata consumed and annotated during translation

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Hardware stage a shader runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stage {
    #[default]
    Vertex,
    Fragment,
    Compute,
}

bitflags! {
    /// Side information discovered while translating
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ShaderUsage: u32 {
        const VERTEX_ID = 1 << 0;
        const INSTANCE_ID = 1 << 1;
        const PRIMITIVE_ID = 1 << 2;
        const FRAG_COORD = 1 << 3;
        const FRONT_FACING = 1 << 4;
        const LOCAL_INVOCATION_ID = 1 << 5;
        const WORKGROUP_ID = 1 << 6;
        const SHARED_MEMORY = 1 << 7;
        const DEPTH_EXPORT = 1 << 8;
        const FETCH_SHADER = 1 << 9;
        const BARRIER = 1 << 10;
    }
}

/// Buffer descriptor (V#) bound at `sgpr_base`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferResource {
    pub sgpr_base: u32,
    pub binding: u32,
    #[serde(default)]
    pub is_written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageKind {
    Image1D,
    #[default]
    Image2D,
    Image3D,
    Cube,
    Image1DArray,
    Image2DArray,
}

impl ImageKind {
    /// Number of address components used as sampling coordinates
    pub fn coord_components(self) -> u32 {
        match self {
            ImageKind::Image1D => 1,
            ImageKind::Image2D | ImageKind::Image1DArray => 2,
            ImageKind::Image3D | ImageKind::Cube | ImageKind::Image2DArray => 3,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, ImageKind::Image1DArray | ImageKind::Image2DArray)
    }
}

/// Image descriptor (T#) bound at `sgpr_base`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageResource {
    pub sgpr_base: u32,
    pub binding: u32,
    #[serde(default)]
    pub kind: ImageKind,
    /// Set when the image is sampled with a depth comparison
    #[serde(default)]
    pub is_depth: bool,
}

/// Sampler descriptor (S#) bound at `sgpr_base`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplerResource {
    pub sgpr_base: u32,
    pub binding: u32,
}

/// Vertex attribute loaded by the fetch shader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexInput {
    pub semantic: u32,
    pub dest_vgpr: u32,
    pub num_components: u32,
}

/// Mapping of an interpolated attribute slot to a parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PsInput {
    pub param_index: u32,
}

/// Shader-wide metadata shared by every block of one shader
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderInfo {
    pub stage: Stage,
    pub user_data: Vec<u32>,
    pub buffers: Vec<BufferResource>,
    pub images: Vec<ImageResource>,
    pub samplers: Vec<SamplerResource>,
    pub vs_inputs: Vec<VertexInput>,
    pub ps_inputs: Vec<PsInput>,
    pub usage: ShaderUsage,
    /// Bit per parameter read through interpolation
    pub loaded_params: u32,
    /// Bit per parameter exported
    pub exported_params: u32,
    pub prologue_emitted: bool,
}

impl ShaderInfo {
    pub fn new(stage: Stage) -> Self {
        Self {
            stage,
            ..Default::default()
        }
    }

    pub fn with_user_data(mut self, user_data: Vec<u32>) -> Self {
        self.user_data = user_data;
        self
    }

    pub fn with_buffer(mut self, sgpr_base: u32, binding: u32) -> Self {
        self.buffers.push(BufferResource {
            sgpr_base,
            binding,
            is_written: false,
        });
        self
    }

    pub fn with_image(mut self, sgpr_base: u32, binding: u32, kind: ImageKind) -> Self {
        self.images.push(ImageResource {
            sgpr_base,
            binding,
            kind,
            is_depth: false,
        });
        self
    }

    pub fn with_sampler(mut self, sgpr_base: u32, binding: u32) -> Self {
        self.samplers.push(SamplerResource { sgpr_base, binding });
        self
    }

    pub fn with_vs_input(mut self, semantic: u32, dest_vgpr: u32, num_components: u32) -> Self {
        self.vs_inputs.push(VertexInput {
            semantic,
            dest_vgpr,
            num_components,
        });
        self
    }

    pub fn with_ps_input(mut self, param_index: u32) -> Self {
        self.ps_inputs.push(PsInput { param_index });
        self
    }

    pub fn buffer_mut(&mut self, sgpr_base: u32) -> Option<&mut BufferResource> {
        self.buffers.iter_mut().find(|b| b.sgpr_base == sgpr_base)
    }

    pub fn image_mut(&mut self, sgpr_base: u32) -> Option<&mut ImageResource> {
        self.images.iter_mut().find(|i| i.sgpr_base == sgpr_base)
    }

    pub fn sampler(&self, sgpr_base: u32) -> Option<&SamplerResource> {
        self.samplers.iter().find(|s| s.sgpr_base == sgpr_base)
    }
}
