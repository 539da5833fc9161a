pub mod composer;

pub use composer::{QUERY_KERNEL, ShaderComposer, WAVEFRONT_KERNELS};
