//! Thunk matching and the protected pointer write

#[cfg(windows)]
use core::mem;

use crate::error::Result;
use crate::image::ImportThunk;
use crate::util::memory::read_memory;
#[cfg(windows)]
use crate::util::memory::{write_memory, ProtectionGuard};

use super::registry::HookTable;

#[cfg(windows)]
const PAGE_READWRITE: u32 = 0x04;

/// backend for the pointer-sized thunk slot write
///
/// the engine funnels every patch through this seam so the protection
/// handling stays in one place and alternate backends can stand in where
/// page protection does not apply.
pub trait ThunkPatcher {
    /// write `value` into the pointer-sized slot at `slot`
    fn patch_slot(&mut self, slot: usize, value: usize) -> Result<()>;
}

/// default patcher, wraps the write in a scoped protection change
///
/// the slot's page is made writable for exactly the pointer-sized region,
/// written, and restored. The guard restores on every exit path, so the
/// relaxed protection is never observable outside the write.
#[cfg(windows)]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtectedPatcher;

#[cfg(windows)]
impl ProtectedPatcher {
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(windows)]
impl ThunkPatcher for ProtectedPatcher {
    fn patch_slot(&mut self, slot: usize, value: usize) -> Result<()> {
        let _guard = ProtectionGuard::new(slot, mem::size_of::<usize>(), PAGE_READWRITE)?;

        // SAFETY: slot was bounds-checked against the mapped image by the
        // scanner and the guard holds the region writable
        unsafe { write_memory(slot, value) }
    }
}

/// try every bitmap-enabled hook against one thunk slot, patching on match
///
/// returns the matched hook's table index. Matching recognizes a hook by
/// the imported name from the original-thunk array, or by the slot holding
/// a previously captured original address. A slot that already holds the
/// hook address is left alone entirely, repeated scans of an image must not
/// touch page protection again.
pub(crate) fn apply_hooks_to_thunk<P: ThunkPatcher>(
    table: &mut HookTable,
    bitmap: u32,
    thunk: &ImportThunk,
    patcher: &mut P,
) -> Result<Option<usize>> {
    // name-based hooking only
    let Some(symbol_name) = thunk.symbol.name() else {
        return Ok(None);
    };

    // SAFETY: the scanner only emits slot addresses inside the mapped image
    let current: usize = unsafe { read_memory(thunk.slot_address) }?;

    for index in 0..table.len() {
        if bitmap & (1u32 << index) == 0 {
            continue;
        }

        // table.len() <= MAX_HOOKS, the index is always present
        let Some(hook) = table.get(index) else {
            break;
        };

        if current == hook.hook_address() {
            // already installed
            return Ok(None);
        }

        let recaptured = hook.original_address() == Some(current);
        if !recaptured && hook.name() != symbol_name {
            continue;
        }

        let Some(hook) = table.get_mut(index) else {
            break;
        };
        hook.capture_original(current);
        let hook_address = hook.hook_address();

        patcher.patch_slot(thunk.slot_address, hook_address)?;
        log::trace!(
            "redirected {}!{} at {:#x} from {:#x} to {:#x}",
            thunk.source_module,
            symbol_name,
            thunk.slot_address,
            current,
            hook_address,
        );
        return Ok(Some(index));
    }

    Ok(None)
}
