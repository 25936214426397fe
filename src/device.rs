//! Compute device selection.

use std::fmt;

/// Device the evaluation runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Pick the requested accelerator when one is available, otherwise the host.
    ///
    /// `gpu` accepts `cpu`, `cuda` and `cuda:N`. Unparseable ordinals fall
    /// back to device 0.
    pub fn select(gpu: &str, accelerator_available: bool) -> Self {
        let gpu = gpu.trim();
        if !accelerator_available || gpu.eq_ignore_ascii_case("cpu") {
            return Device::Cpu;
        }

        let ordinal = gpu
            .strip_prefix("cuda")
            .and_then(|rest| rest.strip_prefix(':'))
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        Device::Cuda(ordinal)
    }

    pub fn is_cpu(self) -> bool {
        matches!(self, Device::Cpu)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(n) => write!(f, "cuda:{}", n),
        }
    }
}

/// Whether an accelerator backend is compiled in.
///
/// Models execute through ndarray on the host, so this is always false.
pub fn accelerator_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_requested() {
        assert_eq!(Device::select("cpu", true), Device::Cpu);
    }

    #[test]
    fn test_no_accelerator_falls_back() {
        assert_eq!(Device::select("cuda:1", false), Device::Cpu);
    }

    #[test]
    fn test_cuda_ordinal_parsed() {
        assert_eq!(Device::select("cuda:2", true), Device::Cuda(2));
        assert_eq!(Device::select("cuda", true), Device::Cuda(0));
    }

    #[test]
    fn test_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda(3).to_string(), "cuda:3");
    }

    #[test]
    fn test_host_build_selects_cpu() {
        assert!(Device::select("cuda:0", accelerator_available()).is_cpu());
    }
}
