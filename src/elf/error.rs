//! Errors raised by the ELF access layer.

#[derive(thiserror::Error, Debug)]
/// Failures accessing or mutating an ELF64 object file.
///
/// Every variant here is the Rust counterpart of a libelf/gelf call in
/// `sdtconvert.c` that the original aborts the process on
/// (`errx(1, "...: %s", elf_errmsg(elf_errno()))`); this crate instead
/// propagates them so the driver is the only place that terminates.
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not an ELF file: bad magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unsupported ELF class {0} (only ELFCLASS64 is supported)")]
    UnsupportedClass(u8),

    #[error("unsupported data encoding {0} (only ELFDATA2LSB is supported)")]
    UnsupportedEncoding(u8),

    #[error("object is not relocatable (ET_REL required)")]
    NotRelocatable,

    #[error("section header string table index {0} out of range")]
    NoSuchStringTable(u32),

    #[error("no section at index {0}")]
    NoSuchSection(u32),

    #[error("no section named {0:?}")]
    NoSuchSectionName(String),

    #[error("string table offset {offset} out of range for section {section}")]
    StringOffsetOutOfRange { section: u32, offset: u32 },

    #[error("symbol index {index} out of range (symbol table has {count} entries)")]
    SymbolOutOfBounds { index: u32, count: usize },

    #[error("section data size {size} is not a multiple of entry size {entsize}")]
    MisalignedSectionData { size: u64, entsize: u64 },
}

pub type Result<T> = std::result::Result<T, Error>;
