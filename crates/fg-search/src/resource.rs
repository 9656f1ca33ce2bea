//! Scoped acquisition of an exclusive accelerator context.

use std::sync::atomic::{AtomicBool, Ordering};

use fg_types::{FgResult, SearchError};

static DEVICE_IN_USE: AtomicBool = AtomicBool::new(false);

/// Exclusive lease on the accelerator device an evaluator may own.
///
/// At most one lease is live at a time, process-wide: acquiring while a
/// previous lease is still held is a usage error, not a supported pattern.
/// Release happens in `Drop` and is therefore guaranteed on every exit
/// path, including error paths.
#[derive(Debug)]
pub struct DeviceLease {
    name: String,
}

impl DeviceLease {
    pub fn acquire(name: impl Into<String>) -> FgResult<Self> {
        let name = name.into();
        if DEVICE_IN_USE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SearchError::DeviceBusy { name }.into());
        }
        tracing::debug!("Acquired exclusive device context '{name}'.");
        Ok(Self { name })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for DeviceLease {
    fn drop(&mut self) {
        tracing::debug!("Releasing exclusive device context '{}'.", self.name);
        DEVICE_IN_USE.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Leases share one process-wide flag, so all scenarios run in a single
    // test to avoid cross-test interference under the parallel harness.
    #[test]
    fn lease_lifecycle() {
        let lease = DeviceLease::acquire("cuda0").unwrap();
        assert_eq!(lease.name(), "cuda0");

        // Nested acquisition without release fails.
        assert!(DeviceLease::acquire("cuda0").is_err());

        // Release on drop allows re-acquisition.
        drop(lease);
        let again = DeviceLease::acquire("cuda0").unwrap();
        drop(again);

        // Release also happens when the holding scope errors out.
        fn failing_user() -> FgResult<()> {
            let _lease = DeviceLease::acquire("cuda0")?;
            Err(fg_types::FgError::Internal("boom".to_string()))
        }
        assert!(failing_user().is_err());
        assert!(DeviceLease::acquire("cuda0").is_ok());
    }
}
