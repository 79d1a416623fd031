//! Hook and target-image tables

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

#[cfg(feature = "std")]
use std::vec::Vec;

use crate::error::{Result, RethunkError};

/// widest hook table a target bitmap can address
pub const MAX_HOOKS: usize = u32::BITS as usize;

/// one interceptable imported function
///
/// `original_address` starts out unset and is captured from the first thunk
/// slot patched for this hook. Once captured it never changes, even when the
/// same function is encountered again in a later image, so it stays the
/// single source of truth for pass-through calls.
#[derive(Debug, Clone)]
pub struct Hook {
    name: &'static str,
    hook_address: usize,
    original_address: Option<usize>,
}

impl Hook {
    /// declare a hook for the named import, redirecting it to
    /// `hook_address`
    pub const fn new(name: &'static str, hook_address: usize) -> Self {
        Self {
            name,
            hook_address,
            original_address: None,
        }
    }

    /// imported symbol name this hook applies to, compared byte-exact
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// address of the interceptor routine
    pub fn hook_address(&self) -> usize {
        self.hook_address
    }

    /// address the import resolved to before it was patched, None until the
    /// first successful patch
    pub fn original_address(&self) -> Option<usize> {
        self.original_address
    }

    /// record the pre-patch value, first writer wins
    pub(crate) fn capture_original(&mut self, address: usize) {
        if self.original_address.is_none() {
            self.original_address = Some(address);
        }
    }
}

/// one module worth scanning when it loads
#[derive(Debug, Clone)]
pub struct TargetImage {
    pattern: &'static str,
    hook_bitmap: u32,
    base: Option<usize>,
}

impl TargetImage {
    /// target any module whose load-time name contains `pattern`, applying
    /// the hooks whose bits are set in `hook_bitmap`
    pub const fn new(pattern: &'static str, hook_bitmap: u32) -> Self {
        Self {
            pattern,
            hook_bitmap,
            base: None,
        }
    }

    /// substring matched against the load-time module name
    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    /// bitmap over the hook table, bit i enables hook i
    pub fn hook_bitmap(&self) -> u32 {
        self.hook_bitmap
    }

    /// base address recorded when the module was observed loading
    pub fn base(&self) -> Option<usize> {
        self.base
    }

    /// check whether a load-time module name belongs to this target
    pub fn matches_name(&self, module_name: &str) -> bool {
        module_name.contains(self.pattern)
    }

    pub(crate) fn record_base(&mut self, base: usize) {
        self.base = Some(base);
    }
}

/// the process-wide hook table
///
/// pure data plus two lookups, by imported name for matching and by
/// interceptor address for pass-through resolution. The only mutation after
/// construction is the write-once original-address capture.
#[derive(Debug)]
pub struct HookTable {
    hooks: Vec<Hook>,
}

impl HookTable {
    /// build the table, rejecting more hooks than a target bitmap can
    /// address
    pub fn new(hooks: Vec<Hook>) -> Result<Self> {
        if hooks.len() > MAX_HOOKS {
            return Err(RethunkError::TooManyHooks {
                count: hooks.len(),
                max: MAX_HOOKS,
            });
        }
        Ok(Self { hooks })
    }

    /// number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// hook at table index
    pub fn get(&self, index: usize) -> Option<&Hook> {
        self.hooks.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Hook> {
        self.hooks.get_mut(index)
    }

    /// iterate all registered hooks
    pub fn iter(&self) -> impl Iterator<Item = &Hook> {
        self.hooks.iter()
    }

    /// find a hook by imported symbol name, byte-exact
    pub fn find_by_name(&self, name: &str) -> Option<&Hook> {
        self.hooks.iter().find(|hook| hook.name == name)
    }

    /// original address for the hook installed at `hook_address`
    ///
    /// None when no hook carries that interceptor address or the hook never
    /// captured an original. Read-only, safe from re-entrant interceptor
    /// bodies.
    pub fn resolve_original(&self, hook_address: usize) -> Option<usize> {
        self.hooks
            .iter()
            .find(|hook| hook.hook_address == hook_address)
            .and_then(|hook| hook.original_address)
    }
}
