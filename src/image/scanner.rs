//! Import directory walker
//!
//! Produces the ordered list of import thunk slots for one mapped module.
//! An image that fails signature validation, or has no import directory, is
//! simply reported as having no thunks. Malformed records shorten the output
//! instead of aborting it, one corrupt descriptor must not hide the intact
//! descriptors around it.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec::Vec};

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

use core::mem;

use super::view::ImageView;
use crate::structures::pe::{
    DataDirectory, DataDirectoryType, DosHeader, ImportByName, ImportDescriptor, NtHeaders,
    IMAGE_ORDINAL_FLAG,
};

// cap on symbol and module name records
const MAX_NAME_LEN: usize = 256;

/// how one import entry is bound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSymbol {
    /// imported by symbol name
    Name(String),
    /// imported by numeric ordinal
    Ordinal(u16),
}

impl ImportSymbol {
    /// symbol name, None for ordinal-bound imports
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(name),
            Self::Ordinal(_) => None,
        }
    }

    /// check if ordinal-bound
    pub fn is_ordinal(&self) -> bool {
        matches!(self, Self::Ordinal(_))
    }
}

/// one live import address table slot
#[derive(Debug, Clone)]
pub struct ImportThunk {
    /// absolute address of the pointer-sized slot the loader calls through
    pub slot_address: usize,
    /// name or ordinal from the unmodified original-thunk array
    pub symbol: ImportSymbol,
    /// name of the module this import is resolved from
    pub source_module: String,
}

/// walks a mapped module's import directory
pub struct ImportScanner {
    view: ImageView,
}

impl ImportScanner {
    pub fn new(view: ImageView) -> Self {
        Self { view }
    }

    /// collect every import thunk slot in the image
    ///
    /// empty when the image is not a recognizable PE or imports nothing.
    pub fn scan(&self) -> Vec<ImportThunk> {
        let mut thunks = Vec::new();

        let Some(import_dir) = self.import_directory() else {
            return thunks;
        };

        let desc_size = mem::size_of::<ImportDescriptor>();
        let dir_end = (import_dir.virtual_address as usize)
            .saturating_add(import_dir.size as usize);

        let mut offset = import_dir.virtual_address as usize;
        while offset + desc_size <= dir_end {
            let Some(descriptor) = self.view.read::<ImportDescriptor>(offset) else {
                break; // descriptor array runs off the image
            };
            if descriptor.is_null() {
                break;
            }

            // a descriptor that does not resolve contributes nothing, the
            // walk moves on to the next one
            self.scan_descriptor(&descriptor, &mut thunks);

            offset += desc_size;
        }

        thunks
    }

    /// locate the import data directory, None when the image is not a PE or
    /// carries no imports
    fn import_directory(&self) -> Option<DataDirectory> {
        let dos: DosHeader = self.view.read(0)?;
        if !dos.is_valid() {
            return None;
        }

        let nt_offset = dos.nt_headers_offset()?;
        let nt: NtHeaders = self.view.read(nt_offset)?;
        if !nt.is_valid() {
            return None;
        }

        let directory = nt.data_directory(DataDirectoryType::Import.index())?;
        directory.is_present().then_some(directory)
    }

    /// walk one descriptor's parallel thunk arrays in lock-step
    fn scan_descriptor(&self, descriptor: &ImportDescriptor, thunks: &mut Vec<ImportThunk>) {
        let Some(source_module) = self
            .view
            .read_cstr(descriptor.name as usize, MAX_NAME_LEN)
        else {
            return;
        };

        let iat_base = descriptor.first_thunk as usize;
        // some linkers leave the original-thunk array out, the live array
        // then doubles as the name table
        let int_base = if descriptor.original_first_thunk != 0 {
            descriptor.original_first_thunk as usize
        } else {
            iat_base
        };

        let stride = mem::size_of::<usize>();
        for index in 0usize.. {
            let Some(entry_offset) = index
                .checked_mul(stride)
                .and_then(|delta| int_base.checked_add(delta))
            else {
                break;
            };
            let Some(entry) = self.view.read::<usize>(entry_offset) else {
                break; // truncated name table
            };
            if entry == 0 {
                break; // sentinel
            }

            let Some(slot_address) = index
                .checked_mul(stride)
                .and_then(|delta| iat_base.checked_add(delta))
                .and_then(|offset| self.view.address_of(offset, stride))
            else {
                break; // truncated address table
            };

            let symbol = if entry & IMAGE_ORDINAL_FLAG != 0 {
                ImportSymbol::Ordinal((entry & 0xFFFF) as u16)
            } else {
                let name_offset =
                    (entry & !IMAGE_ORDINAL_FLAG) + mem::offset_of!(ImportByName, name);
                match self.view.read_cstr(name_offset, MAX_NAME_LEN) {
                    Some(name) => ImportSymbol::Name(name),
                    // unreadable name record, drop this entry only
                    None => continue,
                }
            };

            thunks.push(ImportThunk {
                slot_address,
                symbol,
                source_module: source_module.clone(),
            });
        }
    }
}
