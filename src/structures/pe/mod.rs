//! PE (Portable Executable) format structures

pub mod data_directory;
pub mod dos_header;
pub mod imports;
pub mod nt_headers;

pub use data_directory::{DataDirectory, DataDirectoryType};
pub use dos_header::{DosHeader, DOS_SIGNATURE};
pub use imports::{
    ImportByName, ImportDescriptor, IMAGE_ORDINAL_FLAG, IMAGE_ORDINAL_FLAG32, IMAGE_ORDINAL_FLAG64,
};
pub use nt_headers::{
    FileHeader, NtHeaders, NtHeaders32, NtHeaders64, OptionalHeader, NT_SIGNATURE, PE32PLUS_MAGIC,
    PE32_MAGIC,
};
