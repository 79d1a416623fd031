//! Raw memory access and scoped protection changes

use crate::error::{Result, RethunkError};

/// read a value from memory at address
///
/// uses an unaligned read, mapped images give no alignment promises for
/// interior offsets.
///
/// # Safety
/// address must be valid and readable for `size_of::<T>()` bytes
pub unsafe fn read_memory<T: Copy>(address: usize) -> Result<T> {
    if address == 0 {
        return Err(RethunkError::NullPointer {
            context: "read_memory",
        });
    }

    // SAFETY: caller ensures address validity
    Ok(unsafe { (address as *const T).read_unaligned() })
}

/// write a value to memory at address
///
/// # Safety
/// address must be valid and writable for `size_of::<T>()` bytes
pub unsafe fn write_memory<T: Copy>(address: usize, value: T) -> Result<()> {
    if address == 0 {
        return Err(RethunkError::NullPointer {
            context: "write_memory",
        });
    }

    // SAFETY: caller ensures address validity
    unsafe {
        (address as *mut T).write_unaligned(value);
    }
    Ok(())
}

/// change memory protection, returning the previous protection
#[cfg(windows)]
pub fn protect_memory(address: usize, size: usize, protection: u32) -> Result<u32> {
    let mut old_protect: u32 = 0;

    // SAFETY: VirtualProtect validates the range itself and fails cleanly
    let result = unsafe { VirtualProtect(address as *mut _, size, protection, &mut old_protect) };

    if result == 0 {
        Err(RethunkError::ProtectionChangeFailed { address, size })
    } else {
        Ok(old_protect)
    }
}

/// RAII guard for memory protection changes
///
/// the previous protection is reinstated when the guard drops, on every
/// exit path of the enclosing scope.
#[cfg(windows)]
pub struct ProtectionGuard {
    address: usize,
    size: usize,
    old_protection: u32,
}

#[cfg(windows)]
impl ProtectionGuard {
    /// change protection, returning guard that restores on drop
    pub fn new(address: usize, size: usize, new_protection: u32) -> Result<Self> {
        let old_protection = protect_memory(address, size, new_protection)?;
        Ok(Self {
            address,
            size,
            old_protection,
        })
    }

    /// the protection in force before the guard was taken
    pub fn old_protection(&self) -> u32 {
        self.old_protection
    }
}

#[cfg(windows)]
impl Drop for ProtectionGuard {
    fn drop(&mut self) {
        let _ = protect_memory(self.address, self.size, self.old_protection);
    }
}

#[cfg(windows)]
#[link(name = "kernel32")]
extern "system" {
    fn VirtualProtect(
        lpAddress: *mut core::ffi::c_void,
        dwSize: usize,
        flNewProtect: u32,
        lpflOldProtect: *mut u32,
    ) -> i32;
}
