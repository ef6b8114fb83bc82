//! Architectural exceptions and the result type executor handlers return.

use thiserror::Error;

/// The outcome of executing a single instruction: either the address of the next instruction,
/// or an architectural exception that must be delivered by the trap engine.
pub type ExecutionResult<T = ()> = Result<T, Exception>;

/// A synchronous RISC-V exception, carrying the trap value (`xtval`) that accompanies it.
///
/// Variant order matches the numeric exception codes in the privileged spec; [`Exception::code`]
/// returns that code.
#[derive(Error, Debug, Copy, Clone, Eq, PartialEq)]
pub enum Exception {
    #[error("instruction address misaligned: {0:#010x}")]
    InstructionAddressMisaligned(u32),
    #[error("instruction access fault: {0:#010x}")]
    InstructionAccessFault(u32),
    #[error("illegal instruction: {0:#010x}")]
    IllegalInstruction(u32),
    #[error("breakpoint")]
    Breakpoint,
    #[error("load address misaligned: {0:#010x}")]
    LoadAddressMisaligned(u32),
    #[error("load access fault: {0:#010x}")]
    LoadAccessFault(u32),
    #[error("store/amo address misaligned: {0:#010x}")]
    StoreOrAmoAddressMisaligned(u32),
    #[error("store/amo access fault: {0:#010x}")]
    StoreOrAmoAccessFault(u32),
    #[error("environment call from U-mode")]
    EcallFromUMode,
    #[error("environment call from S-mode")]
    EcallFromSMode,
    #[error("environment call from M-mode")]
    EcallFromMMode,
    #[error("instruction page fault: {0:#010x}")]
    InstructionPageFault(u32),
    #[error("load page fault: {0:#010x}")]
    LoadPageFault(u32),
    #[error("store/amo page fault: {0:#010x}")]
    StoreOrAmoPageFault(u32),
}

impl Exception {
    /// The numeric exception code used in `xcause` (and for `MEDELEG`/`MIDELEG` bit indexing).
    pub const INSTRUCTION_ADDRESS_MISALIGNED: u32 = 0;
    pub const INSTRUCTION_ACCESS_FAULT: u32 = 1;
    pub const ILLEGAL_INSTRUCTION: u32 = 2;
    pub const BREAKPOINT: u32 = 3;
    pub const LOAD_ADDRESS_MISALIGNED: u32 = 4;
    pub const LOAD_ACCESS_FAULT: u32 = 5;
    pub const STORE_OR_AMO_ADDRESS_MISALIGNED: u32 = 6;
    pub const STORE_OR_AMO_ACCESS_FAULT: u32 = 7;
    pub const ECALL_FROM_U_MODE: u32 = 8;
    pub const ECALL_FROM_S_MODE: u32 = 9;
    pub const ECALL_FROM_M_MODE: u32 = 11;
    pub const INSTRUCTION_PAGE_FAULT: u32 = 12;
    pub const LOAD_PAGE_FAULT: u32 = 13;
    pub const STORE_OR_AMO_PAGE_FAULT: u32 = 15;

    /// The numeric code to write into `xcause` and to index `MEDELEG`/`MIDELEG` with.
    pub fn code(&self) -> u32 {
        match self {
            Self::InstructionAddressMisaligned(_) => Self::INSTRUCTION_ADDRESS_MISALIGNED,
            Self::InstructionAccessFault(_) => Self::INSTRUCTION_ACCESS_FAULT,
            Self::IllegalInstruction(_) => Self::ILLEGAL_INSTRUCTION,
            Self::Breakpoint => Self::BREAKPOINT,
            Self::LoadAddressMisaligned(_) => Self::LOAD_ADDRESS_MISALIGNED,
            Self::LoadAccessFault(_) => Self::LOAD_ACCESS_FAULT,
            Self::StoreOrAmoAddressMisaligned(_) => Self::STORE_OR_AMO_ADDRESS_MISALIGNED,
            Self::StoreOrAmoAccessFault(_) => Self::STORE_OR_AMO_ACCESS_FAULT,
            Self::EcallFromUMode => Self::ECALL_FROM_U_MODE,
            Self::EcallFromSMode => Self::ECALL_FROM_S_MODE,
            Self::EcallFromMMode => Self::ECALL_FROM_M_MODE,
            Self::InstructionPageFault(_) => Self::INSTRUCTION_PAGE_FAULT,
            Self::LoadPageFault(_) => Self::LOAD_PAGE_FAULT,
            Self::StoreOrAmoPageFault(_) => Self::STORE_OR_AMO_PAGE_FAULT,
        }
    }

    /// The value to write into `xtval` when this exception is delivered.
    pub fn tval(&self) -> u32 {
        match *self {
            Self::InstructionAddressMisaligned(v)
            | Self::InstructionAccessFault(v)
            | Self::IllegalInstruction(v)
            | Self::LoadAddressMisaligned(v)
            | Self::LoadAccessFault(v)
            | Self::StoreOrAmoAddressMisaligned(v)
            | Self::StoreOrAmoAccessFault(v)
            | Self::InstructionPageFault(v)
            | Self::LoadPageFault(v)
            | Self::StoreOrAmoPageFault(v) => v,
            Self::Breakpoint | Self::EcallFromUMode | Self::EcallFromSMode | Self::EcallFromMMode => 0,
        }
    }

    /// Whether this exception, when no handler is willing to take it (`xtvec == 0`), should be
    /// treated as a fatal error that halts the driver loop rather than delivered through the
    /// trap engine.
    pub fn is_fatal_without_handler(&self) -> bool {
        matches!(
            self,
            Self::IllegalInstruction(_)
                | Self::InstructionAccessFault(_)
                | Self::LoadAddressMisaligned(_)
                | Self::LoadAccessFault(_)
                | Self::StoreOrAmoAddressMisaligned(_)
                | Self::StoreOrAmoAccessFault(_)
        )
    }
}
