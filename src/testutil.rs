//! Test fixtures: synthetic mapped images and instrumented patch backends

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{boxed::Box, vec, vec::Vec};

#[cfg(feature = "std")]
use std::{boxed::Box, vec, vec::Vec};

use core::mem;

use crate::error::{Result, RethunkError};
use crate::hooks::ThunkPatcher;
use crate::image::ImageView;
#[cfg(target_pointer_width = "32")]
use crate::structures::pe::PE32_MAGIC as OPTIONAL_MAGIC;
#[cfg(target_pointer_width = "64")]
use crate::structures::pe::PE32PLUS_MAGIC as OPTIONAL_MAGIC;
use crate::structures::pe::{
    DataDirectory, DataDirectoryType, DosHeader, ImportByName, ImportDescriptor, NtHeaders,
    OptionalHeader, DOS_SIGNATURE, IMAGE_ORDINAL_FLAG, NT_SIGNATURE,
};
use crate::util::memory::{read_memory, write_memory};

const IMAGE_LEN: usize = 0x1000;
const NT_OFFSET: usize = 0x40;
const DESC_OFFSET: usize = 0x180;

/// one import entry in a fixture descriptor
pub(crate) enum ImportSpec {
    Name {
        name: &'static str,
        resolved: usize,
    },
    Ordinal {
        ordinal: u16,
        resolved: usize,
    },
}

impl ImportSpec {
    pub fn name(name: &'static str, resolved: usize) -> Self {
        Self::Name { name, resolved }
    }

    pub fn ordinal(ordinal: u16, resolved: usize) -> Self {
        Self::Ordinal { ordinal, resolved }
    }
}

/// one import descriptor in a fixture image
pub(crate) enum DescriptorSpec {
    Module {
        name: &'static str,
        imports: Vec<ImportSpec>,
    },
    /// descriptor whose fields point far outside the image
    Corrupt,
}

impl DescriptorSpec {
    pub fn module(name: &'static str, imports: Vec<ImportSpec>) -> Self {
        Self::Module { name, imports }
    }

    pub fn corrupt() -> Self {
        Self::Corrupt
    }
}

/// a minimal but structurally real image in an owned buffer
///
/// DOS and NT headers, an import data directory, a null-terminated
/// descriptor array, and per descriptor the parallel name/address thunk
/// arrays with their hint/name records. Offsets of the thunk entries are
/// kept so tests can inspect and corrupt them.
pub(crate) struct SyntheticImage {
    buf: Box<[u8]>,
    // per descriptor, per import: (name-table entry, address-table entry)
    entries: Vec<Vec<(usize, usize)>>,
}

impl SyntheticImage {
    pub fn new(descriptors: &[DescriptorSpec]) -> Self {
        let mut buf = vec![0u8; IMAGE_LEN];
        let desc_size = mem::size_of::<ImportDescriptor>();

        write_headers(
            &mut buf,
            DataDirectory {
                virtual_address: DESC_OFFSET as u32,
                size: ((descriptors.len() + 1) * desc_size) as u32,
            },
        );

        let mut entries = Vec::new();
        let mut cursor = DESC_OFFSET + (descriptors.len() + 1) * desc_size;

        for (index, spec) in descriptors.iter().enumerate() {
            let desc_offset = DESC_OFFSET + index * desc_size;

            let DescriptorSpec::Module { name, imports } = spec else {
                put(
                    &mut buf,
                    desc_offset,
                    ImportDescriptor {
                        original_first_thunk: 0x00F0_0000,
                        name: 0x00F0_0100,
                        first_thunk: 0x00F0_0200,
                        ..Default::default()
                    },
                );
                entries.push(Vec::new());
                continue;
            };

            let stride = mem::size_of::<usize>();
            let int_offset = align_up(cursor, stride);
            cursor = int_offset + (imports.len() + 1) * stride;
            let iat_offset = align_up(cursor, stride);
            cursor = iat_offset + (imports.len() + 1) * stride;

            let name_offset = cursor;
            cursor = put_cstr(&mut buf, cursor, name);

            let mut slots = Vec::new();
            for (position, import) in imports.iter().enumerate() {
                let int_entry = int_offset + position * stride;
                let iat_entry = iat_offset + position * stride;

                match *import {
                    ImportSpec::Name { name, resolved } => {
                        cursor = align_up(cursor, 2);
                        let record = cursor;
                        put(&mut buf, record, 0u16); // hint
                        cursor = put_cstr(
                            &mut buf,
                            record + mem::offset_of!(ImportByName, name),
                            name,
                        );
                        put(&mut buf, int_entry, record);
                        put(&mut buf, iat_entry, resolved);
                    }
                    ImportSpec::Ordinal { ordinal, resolved } => {
                        put(&mut buf, int_entry, IMAGE_ORDINAL_FLAG | ordinal as usize);
                        put(&mut buf, iat_entry, resolved);
                    }
                }

                slots.push((int_entry, iat_entry));
            }

            put(
                &mut buf,
                desc_offset,
                ImportDescriptor {
                    original_first_thunk: int_offset as u32,
                    name: name_offset as u32,
                    first_thunk: iat_offset as u32,
                    ..Default::default()
                },
            );
            entries.push(slots);
        }

        assert!(cursor <= IMAGE_LEN, "fixture outgrew its buffer");

        Self {
            buf: buf.into_boxed_slice(),
            entries,
        }
    }

    /// valid headers, no import directory at all
    pub fn without_imports() -> Self {
        let mut buf = vec![0u8; IMAGE_LEN];
        write_headers(&mut buf, DataDirectory::default());

        Self {
            buf: buf.into_boxed_slice(),
            entries: Vec::new(),
        }
    }

    pub fn base(&self) -> usize {
        self.buf.as_ptr() as usize
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn view(&self) -> ImageView {
        // SAFETY: the buffer lives as long as the fixture
        unsafe { ImageView::new(self.base(), self.size()) }
    }

    /// absolute address of an import's live thunk slot
    pub fn slot_address(&self, descriptor: usize, import: usize) -> usize {
        self.base() + self.entries[descriptor][import].1
    }

    /// current value of an import's live thunk slot
    pub fn slot_value(&self, descriptor: usize, import: usize) -> usize {
        // SAFETY: the slot offset was produced by the builder
        unsafe { read_memory(self.slot_address(descriptor, import)) }.expect("fixture slot")
    }

    /// break the NT signature, the image stops being recognizable
    pub fn corrupt_nt_signature(&mut self) {
        put(&mut self.buf, NT_OFFSET, !NT_SIGNATURE);
    }

    /// point one import's name record outside the image
    pub fn corrupt_import_name(&mut self, descriptor: usize, import: usize) {
        let (int_entry, _) = self.entries[descriptor][import];
        put(&mut self.buf, int_entry, 0x00F0_0300usize);
    }
}

fn write_headers(buf: &mut [u8], import_dir: DataDirectory) {
    put(&mut buf[..], mem::offset_of!(DosHeader, e_magic), DOS_SIGNATURE);
    put(
        &mut buf[..],
        mem::offset_of!(DosHeader, e_lfanew),
        NT_OFFSET as i32,
    );

    put(
        &mut buf[..],
        NT_OFFSET + mem::offset_of!(NtHeaders, signature),
        NT_SIGNATURE,
    );

    let optional = NT_OFFSET + mem::offset_of!(NtHeaders, optional_header);
    put(
        &mut buf[..],
        optional + mem::offset_of!(OptionalHeader, magic),
        OPTIONAL_MAGIC,
    );

    if import_dir.is_present() {
        let directory = optional
            + mem::offset_of!(OptionalHeader, data_directory)
            + DataDirectoryType::Import.index() * mem::size_of::<DataDirectory>();
        put(&mut buf[..], directory, import_dir);
    }
}

fn put<T: Copy>(buf: &mut [u8], offset: usize, value: T) {
    let end = offset + mem::size_of::<T>();
    assert!(end <= buf.len(), "fixture write out of bounds");
    // SAFETY: range checked above, the write stays inside the buffer
    unsafe { buf.as_mut_ptr().add(offset).cast::<T>().write_unaligned(value) };
}

/// write a NUL-terminated string, returning the offset past it
fn put_cstr(buf: &mut [u8], offset: usize, text: &str) -> usize {
    let bytes = text.as_bytes();
    let end = offset + bytes.len() + 1;
    assert!(end <= buf.len(), "fixture write out of bounds");
    buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    buf[end - 1] = 0;
    end
}

fn align_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// patch backend that writes directly and counts its invocations
///
/// stands in for the page-protection round-trip, the count observes how
/// often the protected path would have run.
#[derive(Debug, Default)]
pub(crate) struct CountingPatcher {
    pub patches: usize,
}

impl ThunkPatcher for CountingPatcher {
    fn patch_slot(&mut self, slot: usize, value: usize) -> Result<()> {
        self.patches += 1;
        // SAFETY: tests only hand out slots inside live fixture buffers
        unsafe { write_memory(slot, value) }
    }
}

/// patch backend that refuses every write, as a failed protection change
/// would
pub(crate) struct RefusingPatcher;

impl ThunkPatcher for RefusingPatcher {
    fn patch_slot(&mut self, slot: usize, _value: usize) -> Result<()> {
        Err(RethunkError::ProtectionChangeFailed {
            address: slot,
            size: mem::size_of::<usize>(),
        })
    }
}
