//! Switch configuration.
//!
//! [`kernel`] holds the values fixed when the kernel is built.
//! [`SwitchConfig`] carries them at run time so the interrupt-suppression
//! policy is a plain value handed to the flush path, and both policies can
//! be exercised by one build.

pub mod kernel;

use anyhow::ensure;
use lazyinit::LazyInit;

use crate::error::{CtxError, CtxResult};

/// Startup configuration, read once.
static GLOBAL: LazyInit<SwitchConfig> = LazyInit::new();

/// Run-time switch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchConfig {
    /// Resume tasks with traps disabled instead of enabled.
    pub suppress_interrupts: bool,
    /// Number of cores, one trap frame each.
    pub num_cpus: usize,
    /// Task context slots.
    pub max_tasks: usize,
}

impl SwitchConfig {
    /// The configuration the kernel was built with.
    pub const fn from_build() -> Self {
        Self {
            suppress_interrupts: kernel::SUPPRESS_INTERRUPTS,
            num_cpus: kernel::MAX_CPUS,
            max_tasks: kernel::MAX_TASKS,
        }
    }

    pub fn with_suppress_interrupts(self, suppress_interrupts: bool) -> Self {
        Self {
            suppress_interrupts,
            ..self
        }
    }

    pub fn with_num_cpus(self, num_cpus: usize) -> Self {
        Self { num_cpus, ..self }
    }

    pub fn with_max_tasks(self, max_tasks: usize) -> Self {
        Self { max_tasks, ..self }
    }

    /// Checks the configuration against the build-time limits.
    pub fn validate(&self) -> CtxResult<()> {
        ensure!(self.num_cpus > 0, CtxError::InvalidConfig("no cpus"));
        ensure!(
            self.num_cpus <= kernel::MAX_CPUS,
            CtxError::InvalidConfig("more cpus than MAX_CPUS")
        );
        ensure!(self.max_tasks > 0, CtxError::InvalidConfig("no task slots"));
        ensure!(
            self.max_tasks <= u32::MAX as usize,
            CtxError::InvalidConfig("task slots exceed handle range")
        );
        Ok(())
    }
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self::from_build()
    }
}

/// Installs the startup configuration.
///
/// Fails if the configuration is invalid or one is already installed.
pub fn init_global(config: SwitchConfig) -> CtxResult<&'static SwitchConfig> {
    config.validate()?;
    match GLOBAL.call_once(|| config) {
        Some(installed) => {
            info!("switch config: {:?}", installed);
            Ok(installed)
        }
        None => Err(CtxError::InvalidConfig("switch config already installed").into()),
    }
}

/// Returns the startup configuration, falling back to the build-time one.
pub fn global() -> &'static SwitchConfig {
    let _ = GLOBAL.call_once(SwitchConfig::from_build);
    &GLOBAL
}
