//! Host/build architecture detection (spec §4.3). Ported from the
//! original's `vectoria::capabilities::get_system_capabilities`, with the
//! `#ifdef`-gated SIMD compile flag replaced by the `vector-kernels` Cargo
//! feature.

use serde::Serialize;

/// Architecture the crate was compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    Unknown,
    X86_64,
    ARM64,
}

impl Architecture {
    pub fn name(self) -> &'static str {
        match self {
            Architecture::Unknown => "Unknown",
            Architecture::X86_64 => "x86_64",
            Architecture::ARM64 => "ARM64",
        }
    }
}

/// Capability snapshot for the current build/host, surfaced so callers and
/// the engine's dispatch logic can decide whether `KernelPolicy::Vector` has
/// anywhere to go before committing to it.
#[derive(Debug, Clone, Serialize)]
pub struct SystemCapabilities {
    pub arch: Architecture,
    pub arch_name: &'static str,
    pub simd_compiled: bool,
    pub simd_supported_on_host: bool,
    pub available_kernels: Vec<&'static str>,
}

/// Reads compile-time target configuration; there is no runtime CPUID probe
/// in this version, matching the original (`simd_supported_on_host` mirrors
/// `simd_compiled` there too).
pub fn get_system_capabilities() -> SystemCapabilities {
    let arch = if cfg!(target_arch = "x86_64") {
        Architecture::X86_64
    } else if cfg!(target_arch = "aarch64") {
        Architecture::ARM64
    } else {
        Architecture::Unknown
    };

    let simd_compiled = cfg!(feature = "vector-kernels");

    let mut available_kernels = vec!["Reference"];
    if simd_compiled {
        match arch {
            Architecture::ARM64 => available_kernels.push("NEON"),
            Architecture::X86_64 => available_kernels.push("AVX2"),
            Architecture::Unknown => {}
        }
    }

    SystemCapabilities {
        arch,
        arch_name: arch.name(),
        simd_compiled,
        simd_supported_on_host: simd_compiled,
        available_kernels,
    }
}
