use bytemuck::{Pod, Zeroable};

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct ReduceSumPassParams {
    /// Number of items in the input buffer
    pub len: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct VarianceEstimationPassParams {
    pub radius: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct WaveletPassParams {
    /// Distance between the kernel's taps; doubles with each pass
    pub step: u32,
    pub sigma_color: f32,
    pub sigma_depth: f32,
    pub sigma_normal: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct GaussianPassParams {
    /// 0 for the horizontal pass, 1 for the vertical one
    pub direction: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct DownsamplingPassParams {
    /// Either 9 or 25
    pub taps: u32,
}

#[repr(C)]
#[derive(Copy, Clone, Default, Pod, Zeroable)]
#[cfg_attr(not(target_arch = "spirv"), derive(Debug))]
pub struct UpsamplingPassParams {
    pub scale: u32,
    pub sigma_depth: f32,
    pub sigma_normal: f32,
}
