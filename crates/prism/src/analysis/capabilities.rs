//! Language versions and what each one provides.
//!
//! A [`Capability`] names one built-in function, built-in variable or
//! language construct together with the first desktop and ES versions that
//! have it, where core or ES profiles dropped it, and an extension that
//! makes it available early.

use std::{collections::HashMap, fmt, sync::LazyLock};

use prism_core::ast::{Profile, VersionDirective};

const DESKTOP_VERSIONS: [u32; 13] = [110, 120, 130, 140, 150, 330, 400, 410, 420, 430, 440, 450, 460];
const ES_VERSIONS: [u32; 4] = [100, 300, 310, 320];

/// A GLSL version together with its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlslVersion {
    pub number: u32,
    pub profile: Profile,
}

impl GlslVersion {
    /// Validate a version number and optional profile as written after `#version`.
    ///
    /// `100` is always ES. Desktop profiles exist from 150 on; earlier desktop
    /// versions behave like the compatibility profile, except 140, which
    /// already lacks the deprecated features.
    pub fn new(number: u32, profile: Option<Profile>) -> Option<Self> {
        if number == 100 || profile == Some(Profile::Es) {
            return ES_VERSIONS.contains(&number).then_some(Self::es(number));
        }
        if !DESKTOP_VERSIONS.contains(&number) {
            return None;
        }
        let profile = match (number, profile) {
            (150.., Some(profile)) => profile,
            (150.., None) | (140, None) => Profile::Core,
            (_, None) => Profile::Compatibility,
            (_, Some(_)) => return None,
        };
        Some(Self { number, profile })
    }

    pub const fn desktop(number: u32) -> Self {
        Self {
            number,
            profile: Profile::Compatibility,
        }
    }

    pub const fn es(number: u32) -> Self {
        Self {
            number,
            profile: Profile::Es,
        }
    }

    pub fn from_directive(directive: &VersionDirective) -> Option<Self> {
        Self::new(directive.number, directive.profile)
    }

    /// Parse a caller-supplied version such as `330`, `330 core` or `300 es`.
    pub fn parse(text: &str) -> Option<Self> {
        let mut words = text.split_whitespace();
        let number = words.next()?.parse().ok()?;
        let profile = match words.next() {
            None => None,
            Some("core") => Some(Profile::Core),
            Some("compatibility") => Some(Profile::Compatibility),
            Some("es") => Some(Profile::Es),
            Some(_) => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Self::new(number, profile)
    }

    pub fn is_es(&self) -> bool {
        self.profile == Profile::Es
    }

    /// Whether features deprecated in 130 are gone.
    pub fn removes_deprecated(&self) -> bool {
        self.profile == Profile::Core && self.number >= 140
    }

    pub fn with_profile(self, profile: Profile) -> Self {
        Self { profile, ..self }
    }
}

impl fmt::Display for GlslVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.profile {
            Profile::Es => write!(f, "{} es", self.number),
            profile if self.number >= 150 => write!(f, "{} {}", self.number, profile.as_str()),
            _ => write!(f, "{}", self.number),
        }
    }
}

/// Whether a capability can be used at some version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Available,
    /// Still usable, but on its way out since this desktop version.
    Deprecated { since: u32 },
    /// Needs at least this version.
    Requires(GlslVersion),
    /// Dropped from this profile at the given version.
    Removed { since: GlslVersion },
    /// Never part of this flavour of the language.
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub name: &'static str,
    pub desktop: Option<u32>,
    pub es: Option<u32>,
    pub removed_core: Option<u32>,
    pub removed_es: Option<u32>,
    pub deprecated: Option<u32>,
    /// An extension that provides the capability before its minimum version.
    pub extension: Option<&'static str>,
    /// What to write instead.
    pub replacement: Option<&'static str>,
}

impl Capability {
    const fn new(name: &'static str, desktop: u32, es: u32) -> Self {
        Self {
            name,
            desktop: Some(desktop),
            es: Some(es),
            removed_core: None,
            removed_es: None,
            deprecated: None,
            extension: None,
            replacement: None,
        }
    }

    const fn desktop_only(name: &'static str, desktop: u32) -> Self {
        let mut capability = Self::new(name, desktop, 0);
        capability.es = None;
        capability
    }

    /// Only exists when compiling for Vulkan.
    const fn vulkan_only(name: &'static str, replacement: &'static str) -> Self {
        let mut capability = Self::new(name, 0, 0);
        capability.desktop = None;
        capability.es = None;
        capability.replacement = Some(replacement);
        capability
    }

    /// Deprecated in 130, removed from core 140 and from ES 300.
    const fn legacy(mut self, replacement: &'static str) -> Self {
        self.deprecated = Some(130);
        self.removed_core = Some(140);
        self.removed_es = Some(300);
        self.replacement = Some(replacement);
        self
    }

    const fn extension(mut self, extension: &'static str) -> Self {
        self.extension = Some(extension);
        self
    }

    pub fn support(&self, version: GlslVersion) -> Support {
        if version.is_es() {
            return match self.es {
                None => Support::Missing,
                Some(minimum) if version.number < minimum => Support::Requires(GlslVersion::es(minimum)),
                Some(_) => match self.removed_es {
                    Some(since) if version.number >= since => Support::Removed {
                        since: GlslVersion::es(since),
                    },
                    _ => Support::Available,
                },
            };
        }

        match self.desktop {
            None => Support::Missing,
            Some(minimum) if version.number < minimum => Support::Requires(GlslVersion::desktop(minimum)),
            Some(_) => match (self.removed_core, self.deprecated) {
                (Some(since), _) if version.removes_deprecated() && version.number >= since => {
                    Support::Removed {
                        since: GlslVersion::desktop(since),
                    }
                }
                (_, Some(since)) if version.number >= since => Support::Deprecated { since },
                _ => Support::Available,
            },
        }
    }
}

const fn cap(name: &'static str, desktop: u32, es: u32) -> Capability {
    Capability::new(name, desktop, es)
}

static CAPABILITIES: &[Capability] = &[
    // Legacy texturing
    Capability::desktop_only("texture1D", 110).legacy("`texture`"),
    Capability::desktop_only("texture1DProj", 110).legacy("`textureProj`"),
    Capability::desktop_only("texture1DLod", 110).legacy("`textureLod`"),
    cap("texture2D", 110, 100).legacy("`texture`"),
    cap("texture2DProj", 110, 100).legacy("`textureProj`"),
    cap("texture2DLod", 110, 100).legacy("`textureLod`"),
    cap("texture2DProjLod", 110, 100).legacy("`textureProjLod`"),
    Capability::desktop_only("texture3D", 110).legacy("`texture`"),
    Capability::desktop_only("texture3DProj", 110).legacy("`textureProj`"),
    Capability::desktop_only("texture3DLod", 110).legacy("`textureLod`"),
    cap("textureCube", 110, 100).legacy("`texture`"),
    cap("textureCubeLod", 110, 100).legacy("`textureLod`"),
    Capability::desktop_only("shadow2D", 110).legacy("`texture`"),
    Capability::desktop_only("shadow2DProj", 110).legacy("`textureProj`"),
    Capability::desktop_only("texture2DRect", 110).legacy("`texture`"),
    Capability::desktop_only("ftransform", 110).legacy("`projection * modelView * position`"),
    // Unified texturing
    cap("texture", 130, 300),
    cap("textureProj", 130, 300),
    cap("textureLod", 130, 300),
    cap("textureOffset", 130, 300),
    cap("texelFetch", 130, 300),
    cap("texelFetchOffset", 130, 300),
    cap("textureProjOffset", 130, 300),
    cap("textureLodOffset", 130, 300),
    cap("textureProjLod", 130, 300),
    cap("textureProjLodOffset", 130, 300),
    cap("textureGrad", 130, 300),
    cap("textureGradOffset", 130, 300),
    cap("textureProjGrad", 130, 300),
    cap("textureProjGradOffset", 130, 300),
    cap("textureSize", 130, 300),
    cap("textureGather", 400, 310).extension("GL_ARB_texture_gather"),
    cap("textureGatherOffset", 400, 310).extension("GL_ARB_texture_gather"),
    cap("textureGatherOffsets", 400, 320).extension("GL_ARB_gpu_shader5"),
    Capability::desktop_only("textureQueryLod", 400).extension("GL_ARB_texture_query_lod"),
    Capability::desktop_only("textureQueryLevels", 430).extension("GL_ARB_texture_query_levels"),
    Capability::desktop_only("textureSamples", 450).extension("GL_ARB_shader_texture_image_samples"),
    // Derivatives
    cap("dFdx", 110, 300).extension("GL_OES_standard_derivatives"),
    cap("dFdy", 110, 300).extension("GL_OES_standard_derivatives"),
    cap("fwidth", 110, 300).extension("GL_OES_standard_derivatives"),
    Capability::desktop_only("dFdxFine", 450).extension("GL_ARB_derivative_control"),
    Capability::desktop_only("dFdyFine", 450).extension("GL_ARB_derivative_control"),
    Capability::desktop_only("dFdxCoarse", 450).extension("GL_ARB_derivative_control"),
    Capability::desktop_only("dFdyCoarse", 450).extension("GL_ARB_derivative_control"),
    Capability::desktop_only("fwidthFine", 450).extension("GL_ARB_derivative_control"),
    Capability::desktop_only("fwidthCoarse", 450).extension("GL_ARB_derivative_control"),
    // Common and trigonometric additions
    cap("sinh", 130, 300),
    cap("cosh", 130, 300),
    cap("tanh", 130, 300),
    cap("asinh", 130, 300),
    cap("acosh", 130, 300),
    cap("atanh", 130, 300),
    cap("round", 130, 300),
    cap("roundEven", 130, 300),
    cap("trunc", 130, 300),
    cap("modf", 130, 300),
    cap("isnan", 130, 300),
    cap("isinf", 130, 300),
    cap("floatBitsToInt", 330, 300).extension("GL_ARB_shader_bit_encoding"),
    cap("floatBitsToUint", 330, 300).extension("GL_ARB_shader_bit_encoding"),
    cap("intBitsToFloat", 330, 300).extension("GL_ARB_shader_bit_encoding"),
    cap("uintBitsToFloat", 330, 300).extension("GL_ARB_shader_bit_encoding"),
    cap("fma", 400, 320).extension("GL_ARB_gpu_shader5"),
    cap("frexp", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("ldexp", 400, 310).extension("GL_ARB_gpu_shader5"),
    // Packing
    cap("packUnorm2x16", 400, 300),
    cap("unpackUnorm2x16", 400, 300),
    cap("packUnorm4x8", 400, 310),
    cap("unpackUnorm4x8", 400, 310),
    cap("packSnorm4x8", 400, 310),
    cap("unpackSnorm4x8", 400, 310),
    cap("packSnorm2x16", 420, 300).extension("GL_ARB_shading_language_packing"),
    cap("unpackSnorm2x16", 420, 300).extension("GL_ARB_shading_language_packing"),
    cap("packHalf2x16", 420, 300).extension("GL_ARB_shading_language_packing"),
    cap("unpackHalf2x16", 420, 300).extension("GL_ARB_shading_language_packing"),
    // Matrices
    cap("transpose", 120, 300),
    cap("outerProduct", 120, 300),
    cap("inverse", 140, 300),
    cap("determinant", 150, 300),
    // Integer functions
    cap("bitfieldExtract", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("bitfieldInsert", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("bitfieldReverse", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("bitCount", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("findLSB", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("findMSB", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("uaddCarry", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("usubBorrow", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("umulExtended", 400, 310).extension("GL_ARB_gpu_shader5"),
    cap("imulExtended", 400, 310).extension("GL_ARB_gpu_shader5"),
    // Interpolation, images and atomics
    cap("interpolateAtCentroid", 400, 320).extension("GL_OES_shader_multisample_interpolation"),
    cap("interpolateAtSample", 400, 320).extension("GL_OES_shader_multisample_interpolation"),
    cap("interpolateAtOffset", 400, 320).extension("GL_OES_shader_multisample_interpolation"),
    cap("imageLoad", 420, 310).extension("GL_ARB_shader_image_load_store"),
    cap("imageStore", 420, 310).extension("GL_ARB_shader_image_load_store"),
    cap("imageSize", 430, 310).extension("GL_ARB_shader_image_size"),
    cap("imageAtomicAdd", 420, 320).extension("GL_ARB_shader_image_load_store"),
    cap("imageAtomicExchange", 420, 320).extension("GL_ARB_shader_image_load_store"),
    cap("atomicCounter", 420, 310).extension("GL_ARB_shader_atomic_counters"),
    cap("atomicCounterIncrement", 420, 310).extension("GL_ARB_shader_atomic_counters"),
    cap("atomicCounterDecrement", 420, 310).extension("GL_ARB_shader_atomic_counters"),
    cap("atomicAdd", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicMin", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicMax", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicAnd", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicOr", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicXor", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicExchange", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("atomicCompSwap", 430, 310).extension("GL_ARB_shader_storage_buffer_object"),
    cap("barrier", 430, 310).extension("GL_ARB_compute_shader"),
    cap("memoryBarrier", 420, 310).extension("GL_ARB_shader_image_load_store"),
    cap("memoryBarrierShared", 430, 310).extension("GL_ARB_compute_shader"),
    cap("memoryBarrierImage", 430, 310).extension("GL_ARB_compute_shader"),
    cap("memoryBarrierBuffer", 430, 310).extension("GL_ARB_compute_shader"),
    cap("groupMemoryBarrier", 430, 310).extension("GL_ARB_compute_shader"),
    cap("EmitVertex", 150, 320).extension("GL_EXT_geometry_shader"),
    cap("EndPrimitive", 150, 320).extension("GL_EXT_geometry_shader"),
    Capability::desktop_only("EmitStreamVertex", 400).extension("GL_ARB_gpu_shader5"),
    // Built-in variables
    cap("gl_FragColor", 110, 100).legacy("an `out vec4` variable"),
    cap("gl_FragData", 110, 100).legacy("`out vec4` variables with `layout(location = N)`"),
    cap("gl_FragDepth", 110, 300).extension("GL_EXT_frag_depth"),
    cap("gl_VertexID", 130, 300),
    cap("gl_InstanceID", 140, 300).extension("GL_ARB_draw_instanced"),
    cap("gl_PrimitiveID", 150, 320).extension("GL_EXT_geometry_shader"),
    cap("gl_PrimitiveIDIn", 150, 320).extension("GL_EXT_geometry_shader"),
    cap("gl_Layer", 150, 320).extension("GL_EXT_geometry_shader"),
    cap("gl_InvocationID", 400, 320).extension("GL_ARB_gpu_shader5"),
    cap("gl_SampleID", 400, 320).extension("GL_OES_sample_variables"),
    cap("gl_SamplePosition", 400, 320).extension("GL_OES_sample_variables"),
    cap("gl_HelperInvocation", 450, 310),
    Capability::desktop_only("gl_ClipDistance", 130),
    cap("gl_NumWorkGroups", 430, 310).extension("GL_ARB_compute_shader"),
    cap("gl_WorkGroupSize", 430, 310).extension("GL_ARB_compute_shader"),
    cap("gl_WorkGroupID", 430, 310).extension("GL_ARB_compute_shader"),
    cap("gl_LocalInvocationID", 430, 310).extension("GL_ARB_compute_shader"),
    cap("gl_GlobalInvocationID", 430, 310).extension("GL_ARB_compute_shader"),
    cap("gl_LocalInvocationIndex", 430, 310).extension("GL_ARB_compute_shader"),
    Capability::vulkan_only("gl_VertexIndex", "`gl_VertexID`"),
    Capability::vulkan_only("gl_InstanceIndex", "`gl_InstanceID`"),
    Capability::desktop_only("gl_ModelViewMatrix", 110).legacy("a `uniform mat4` you set yourself"),
    Capability::desktop_only("gl_ProjectionMatrix", 110).legacy("a `uniform mat4` you set yourself"),
    Capability::desktop_only("gl_ModelViewProjectionMatrix", 110).legacy("a `uniform mat4` you set yourself"),
    Capability::desktop_only("gl_TextureMatrix", 110).legacy("a `uniform mat4` you set yourself"),
    Capability::desktop_only("gl_NormalMatrix", 110).legacy("a `uniform mat3` you set yourself"),
    Capability::desktop_only("gl_Vertex", 110).legacy("an `in vec4` vertex attribute"),
    Capability::desktop_only("gl_Normal", 110).legacy("an `in vec3` vertex attribute"),
    Capability::desktop_only("gl_Color", 110).legacy("an `in vec4` vertex attribute"),
    Capability::desktop_only("gl_SecondaryColor", 110).legacy("an `in vec4` vertex attribute"),
    Capability::desktop_only("gl_MultiTexCoord0", 110).legacy("an `in vec2` vertex attribute"),
    Capability::desktop_only("gl_MultiTexCoord1", 110).legacy("an `in vec2` vertex attribute"),
    Capability::desktop_only("gl_TexCoord", 110).legacy("an `out`/`in` pair of your own"),
    Capability::desktop_only("gl_FrontColor", 110).legacy("an `out vec4` of your own"),
    Capability::desktop_only("gl_BackColor", 110).legacy("an `out vec4` of your own"),
    // Language constructs
    cap("uint", 130, 300),
    cap("switch", 130, 300),
    cap("in", 130, 300),
    cap("out", 130, 300),
    cap("attribute", 110, 100).legacy("`in`"),
    cap("varying", 110, 100).legacy("`in` or `out`"),
    cap("layout", 140, 300).extension("GL_ARB_uniform_buffer_object"),
    cap("layout(location)", 330, 300).extension("GL_ARB_explicit_attrib_location"),
    cap("uniform block", 140, 300).extension("GL_ARB_uniform_buffer_object"),
    Capability::desktop_only("double", 400).extension("GL_ARB_gpu_shader_fp64"),
    cap("%", 130, 300),
    cap("<<", 130, 300),
    cap(">>", 130, 300),
    cap("&", 130, 300),
    cap("|", 130, 300),
    cap("^", 130, 300),
    cap("~", 130, 300),
];

static CAPABILITY_INDEX: LazyLock<HashMap<&'static str, &'static Capability>> =
    LazyLock::new(|| CAPABILITIES.iter().map(|capability| (capability.name, capability)).collect());

pub fn lookup(name: &str) -> Option<&'static Capability> {
    CAPABILITY_INDEX.get(name).copied()
}

const VENDOR_PREFIXES: [&str; 10] = [
    "GL_NV_", "GL_AMD_", "GL_ATI_", "GL_INTEL_", "GL_APPLE_", "GL_QCOM_", "GL_ARM_", "GL_IMG_",
    "GL_MESA_", "GL_SGIX_",
];

static PORTABLE_EQUIVALENTS: &[(&str, &str)] = &[
    ("GL_NV_gpu_shader5", "GL_ARB_gpu_shader5"),
    ("GL_NV_shader_framebuffer_fetch", "GL_EXT_shader_framebuffer_fetch"),
    ("GL_ARM_shader_framebuffer_fetch", "GL_EXT_shader_framebuffer_fetch"),
    ("GL_NV_draw_buffers", "GL_EXT_draw_buffers"),
    ("GL_NV_shadow_samplers_cube", "GL_EXT_shadow_samplers"),
    ("GL_APPLE_clip_distance", "GL_EXT_clip_cull_distance"),
    ("GL_AMD_vertex_shader_layer", "GL_ARB_shader_viewport_layer_array"),
    ("GL_NV_viewport_array2", "GL_ARB_shader_viewport_layer_array"),
    ("GL_NV_fragment_shader_interlock", "GL_ARB_fragment_shader_interlock"),
    ("GL_INTEL_fragment_shader_ordering", "GL_ARB_fragment_shader_interlock"),
    ("GL_NV_shader_thread_group", "GL_KHR_shader_subgroup_basic"),
    ("GL_AMD_shader_ballot", "GL_KHR_shader_subgroup_ballot"),
    ("GL_NV_shader_thread_shuffle", "GL_KHR_shader_subgroup_shuffle"),
    ("GL_MESA_shader_integer_functions", "GL_ARB_gpu_shader5"),
    ("GL_AMD_shader_trinary_minmax", "GL_ARB_gpu_shader5"),
];

/// Whether an extension belongs to a single GPU vendor.
pub fn is_vendor_extension(name: &str) -> bool {
    VENDOR_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
}

/// A multi-vendor extension covering the same ground, when one exists.
pub fn portable_equivalent(name: &str) -> Option<&'static str> {
    PORTABLE_EQUIVALENTS
        .iter()
        .find(|(vendor, _)| *vendor == name)
        .map(|(_, portable)| *portable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_validation() {
        assert_eq!(GlslVersion::new(330, None), Some(GlslVersion { number: 330, profile: Profile::Core }));
        assert_eq!(GlslVersion::new(100, None), Some(GlslVersion::es(100)));
        assert_eq!(GlslVersion::new(120, None), Some(GlslVersion::desktop(120)));
        assert_eq!(GlslVersion::new(300, None), None);
        assert_eq!(GlslVersion::new(330, Some(Profile::Es)), None);
        assert_eq!(GlslVersion::new(130, Some(Profile::Core)), None);
        assert_eq!(GlslVersion::new(999, None), None);
    }

    #[test]
    fn test_parse_and_display() {
        let version = GlslVersion::parse("300 es").unwrap();
        assert!(version.is_es());
        assert_eq!(version.to_string(), "300 es");
        assert_eq!(GlslVersion::parse("330").unwrap().to_string(), "330 core");
        assert_eq!(GlslVersion::parse("120").unwrap().to_string(), "120");
        assert_eq!(GlslVersion::parse("330 compatibility").unwrap().to_string(), "330 compatibility");
        assert_eq!(GlslVersion::parse("330 desktop"), None);
        assert_eq!(GlslVersion::parse("es"), None);
    }

    #[test]
    fn test_support_by_version() {
        let texture = lookup("texture").unwrap();
        assert_eq!(
            texture.support(GlslVersion::desktop(120)),
            Support::Requires(GlslVersion::desktop(130))
        );
        assert_eq!(texture.support(GlslVersion::es(300)), Support::Available);

        let legacy = lookup("texture2D").unwrap();
        assert_eq!(legacy.support(GlslVersion::desktop(120)), Support::Available);
        assert_eq!(legacy.support(GlslVersion::desktop(130)), Support::Deprecated { since: 130 });
        assert_eq!(
            legacy.support(GlslVersion::parse("330").unwrap()),
            Support::Removed {
                since: GlslVersion::desktop(140)
            }
        );
        assert_eq!(
            legacy.support(GlslVersion::parse("330 compatibility").unwrap()),
            Support::Deprecated { since: 130 }
        );
        assert!(matches!(legacy.support(GlslVersion::es(300)), Support::Removed { .. }));

        assert_eq!(lookup("double").unwrap().support(GlslVersion::es(320)), Support::Missing);
    }

    #[test]
    fn test_vendor_extensions() {
        assert!(is_vendor_extension("GL_NV_gpu_shader5"));
        assert!(!is_vendor_extension("GL_ARB_gpu_shader5"));
        assert!(!is_vendor_extension("GL_OES_standard_derivatives"));
        assert_eq!(portable_equivalent("GL_NV_gpu_shader5"), Some("GL_ARB_gpu_shader5"));
        assert_eq!(portable_equivalent("GL_QCOM_tiled_rendering"), None);
    }
}
