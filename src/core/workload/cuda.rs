use super::ComputeBackend;
use anyhow::{Context, Result, bail};
use cudarc::cublas::sys::cublasOperation_t;
use cudarc::cublas::{CudaBlas, Gemm, GemmConfig};
use cudarc::driver::{CudaDevice, CudaSlice};
use rand::Rng;
use std::sync::Arc;

pub fn probe() -> Result<()> {
    let count = CudaDevice::count().context("CUDA driver not usable")?;
    if count == 0 {
        bail!("no CUDA devices visible");
    }
    Ok(())
}

/// SGEMM loop on one device. The three operand buffers stay resident until the backend drops.
///
/// The device index is taken as a CUDA ordinal; set `CUDA_DEVICE_ORDER=PCI_BUS_ID` so it
/// matches the NVML index used for sampling.
pub struct CudaBackend {
    device: Arc<CudaDevice>,
    blas: CudaBlas,
    matrix_size: usize,
    a: CudaSlice<f32>,
    b: CudaSlice<f32>,
    c: CudaSlice<f32>,
}

impl CudaBackend {
    pub fn new(device_id: u32, matrix_size: usize) -> Result<Self> {
        let device = CudaDevice::new(device_id as usize)
            .with_context(|| format!("Failed to open CUDA device {device_id}"))?;
        let blas = CudaBlas::new(device.clone()).context("Failed to create cuBLAS handle")?;
        let (a, b, c) = allocate(&device, matrix_size)?;

        Ok(Self {
            device,
            blas,
            matrix_size,
            a,
            b,
            c,
        })
    }
}

impl ComputeBackend for CudaBackend {
    fn name(&self) -> &'static str {
        "cuda"
    }

    fn issue_batch(&mut self, matrix_size: usize, batch_size: usize) -> Result<()> {
        if matrix_size != self.matrix_size {
            let (a, b, c) = allocate(&self.device, matrix_size)?;
            self.a = a;
            self.b = b;
            self.c = c;
            self.matrix_size = matrix_size;
        }

        let n = self.matrix_size as i32;
        let cfg = GemmConfig {
            transa: cublasOperation_t::CUBLAS_OP_N,
            transb: cublasOperation_t::CUBLAS_OP_N,
            m: n,
            n,
            k: n,
            alpha: 1.0f32,
            lda: n,
            ldb: n,
            beta: 0.0f32,
            ldc: n,
        };

        for _ in 0..batch_size {
            // SAFETY: all three buffers are n*n and owned by self.
            unsafe { self.blas.gemm(cfg, &self.a, &self.b, &mut self.c) }
                .context("cuBLAS sgemm failed")?;
        }
        self.device.synchronize().context("CUDA synchronize failed")?;
        Ok(())
    }
}

type Operands = (CudaSlice<f32>, CudaSlice<f32>, CudaSlice<f32>);

fn allocate(device: &Arc<CudaDevice>, matrix_size: usize) -> Result<Operands> {
    let len = matrix_size * matrix_size;
    let mut rng = rand::thread_rng();
    let host: Vec<f32> = (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect();

    let a = device.htod_copy(host.clone()).context("Failed to upload matrix A")?;
    let b = device.htod_copy(host).context("Failed to upload matrix B")?;
    let c = device
        .alloc_zeros::<f32>(len)
        .context("Failed to allocate result matrix")?;
    Ok((a, b, c))
}
