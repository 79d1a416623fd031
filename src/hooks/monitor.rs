//! Module-load entry point

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

#[cfg(feature = "std")]
use std::vec::Vec;

use crate::image::{ImageView, ImportScanner};

#[cfg(windows)]
use super::patcher::ProtectedPatcher;
use super::patcher::{apply_hooks_to_thunk, ThunkPatcher};
use super::registry::{HookTable, TargetImage};

/// drives the scan-and-patch pipeline off the host's load notifications
///
/// owns the whole engine state: the hook table, the target list, and the
/// patch backend. Keeping the state here instead of in process-wide statics
/// makes the write discipline auditable, the only mutations are the
/// per-target base address and the write-once original capture, both from
/// [`on_module_loaded`](Self::on_module_loaded).
///
/// The engine takes no locks. It relies on the host serializing module-load
/// notifications (the loader holds its own lock across mapping), which the
/// `&mut self` receiver makes explicit, concurrent callers need exterior
/// synchronization.
pub struct LoadMonitor<P> {
    table: HookTable,
    targets: Vec<TargetImage>,
    patcher: P,
}

#[cfg(windows)]
impl LoadMonitor<ProtectedPatcher> {
    /// monitor patching through scoped page-protection changes
    pub fn new(table: HookTable, targets: Vec<TargetImage>) -> Self {
        Self::with_patcher(table, targets, ProtectedPatcher::new())
    }
}

impl<P: ThunkPatcher> LoadMonitor<P> {
    /// monitor with a caller-supplied patch backend
    pub fn with_patcher(table: HookTable, targets: Vec<TargetImage>, patcher: P) -> Self {
        Self {
            table,
            targets,
            patcher,
        }
    }

    /// handle one module-load notification
    ///
    /// for every target whose pattern occurs in `name`, records the base
    /// address and scans the image, feeding each import thunk through the
    /// matcher under that target's bitmap. Nothing propagates out: parse
    /// and patch failures are logged and the notification returns normally,
    /// a partially hooked module is an accepted terminal state.
    ///
    /// # Safety
    /// `base` and `size` must describe a readable mapped image for the
    /// duration of the call, which holds for the arguments of a loader
    /// notification delivered while the module is being mapped.
    pub unsafe fn on_module_loaded(&mut self, name: &str, base: usize, size: usize) {
        for index in 0..self.targets.len() {
            if !self.targets[index].matches_name(name) {
                continue;
            }

            self.targets[index].record_base(base);
            let bitmap = self.targets[index].hook_bitmap();
            log::debug!(
                "module {name} at {base:#x} matches target {:?}, scanning imports",
                self.targets[index].pattern(),
            );

            // SAFETY: forwarded from the caller's contract
            let view = unsafe { ImageView::new(base, size) };
            let thunks = ImportScanner::new(view).scan();

            let mut patched = 0usize;
            for thunk in &thunks {
                match apply_hooks_to_thunk(&mut self.table, bitmap, thunk, &mut self.patcher) {
                    Ok(Some(_)) => patched += 1,
                    Ok(None) => {}
                    Err(err) => {
                        // leave this slot as it is, keep scanning the rest
                        log::debug!(
                            "patch failed for slot {:#x} in {name}: {err}",
                            thunk.slot_address,
                        );
                    }
                }
            }

            log::debug!(
                "{name}: {patched} of {} import thunks redirected",
                thunks.len(),
            );
        }
    }

    /// original address for the hook installed at `hook_address`
    ///
    /// interceptor bodies call this to reach the real function. None means
    /// the hook never took effect and there is nothing to pass through to.
    pub fn resolve_original(&self, hook_address: usize) -> Option<usize> {
        self.table.resolve_original(hook_address)
    }

    /// the hook table
    pub fn table(&self) -> &HookTable {
        &self.table
    }

    /// the patch backend
    pub fn patcher(&self) -> &P {
        &self.patcher
    }

    /// the configured targets
    pub fn targets(&self) -> &[TargetImage] {
        &self.targets
    }
}
