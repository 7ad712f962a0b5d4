//! Session processing context
//!
//! One context is acquired when an editor session starts and released
//! when it ends. It owns the FFT planner shared by every render in the
//! session, so plans computed for one render are reused by the next.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};
use rustfft::{Fft, FftPlanner};
use uuid::Uuid;

use crate::error::{Result, StudioError};

/// Forward/inverse FFT pair of one size
#[derive(Clone)]
pub struct FftPair {
    pub forward: Arc<dyn Fft<f32>>,
    pub inverse: Arc<dyn Fft<f32>>,
}

impl FftPair {
    /// Transform length
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Processing context scoped to one editor session
pub struct RenderContext {
    id: Uuid,
    open: AtomicBool,
    planner: Mutex<FftPlanner<f32>>,
}

impl RenderContext {
    /// Acquire a fresh context
    pub fn acquire() -> Self {
        let id = Uuid::new_v4();
        debug!("[CONTEXT] Acquired {}", id);
        Self {
            id,
            open: AtomicBool::new(true),
            planner: Mutex::new(FftPlanner::new()),
        }
    }

    /// Context identifier, for diagnostics
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// True until `close` is called
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Fail with `ContextClosed` once the context has been released
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StudioError::ContextClosed)
        }
    }

    /// Plan (or fetch cached) forward and inverse FFTs of `len` points
    pub fn plan_fft(&self, len: usize) -> Result<FftPair> {
        self.ensure_open()?;

        let mut planner = self.planner.lock().map_err(|_| StudioError::RenderFailure {
            reason: "FFT planner lock poisoned".to_string(),
        })?;

        Ok(FftPair {
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        })
    }

    /// Release the context; later renders fail with `ContextClosed`
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            info!("[CONTEXT] Released {}", self.id);
        }
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("id", &self.id)
            .field("open", &self.is_open())
            .finish()
    }
}
