//! Compute device selection: CUDA when compiled in and present, else CPU.
//! Decided once when the registry loads and never revisited.

use diagnost_core::{DeviceKind, InferenceError};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeDevice {
    Cpu,
    Cuda,
}

impl ComputeDevice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
        }
    }
}

/// Resolve a configured preference to a concrete device.
pub fn select_device(kind: DeviceKind) -> Result<ComputeDevice, InferenceError> {
    let device = match kind {
        DeviceKind::Cpu => ComputeDevice::Cpu,
        DeviceKind::Cuda if cuda_available() => ComputeDevice::Cuda,
        DeviceKind::Cuda => {
            return Err(InferenceError::config(
                "device 'cuda' requested but no CUDA execution provider is available",
            ));
        }
        DeviceKind::Auto if cuda_available() => ComputeDevice::Cuda,
        DeviceKind::Auto => {
            if cfg!(feature = "cuda") {
                warn!("CUDA feature enabled but no GPU available, falling back to CPU");
            }
            ComputeDevice::Cpu
        }
    };
    info!(device = device.as_str(), "selected compute device");
    Ok(device)
}

#[cfg(feature = "cuda")]
fn cuda_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
    CUDAExecutionProvider::default()
        .is_available()
        .unwrap_or(false)
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> bool {
    false
}

/// Execution providers for `device`, most preferred first. CPU is always last.
#[cfg(feature = "onnx")]
pub(crate) fn execution_providers(
    device: ComputeDevice,
) -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    use ort::execution_providers::CPUExecutionProvider;

    let mut providers = Vec::with_capacity(2);
    #[cfg(feature = "cuda")]
    {
        if device == ComputeDevice::Cuda {
            providers.push(ort::execution_providers::CUDAExecutionProvider::default().build());
        }
    }
    #[cfg(not(feature = "cuda"))]
    let _ = device;
    providers.push(CPUExecutionProvider::default().build());
    providers
}
