//! Why a path forked, and why it ended.
//!
//! Both enums are `repr(u8)` so the log can store them compactly; the
//! discriminants are part of the log format and must not be reordered.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum BranchType {
    #[default]
    None = 0,
    Conditional = 1,
    Indirect = 2,
    Switch = 3,
    Call = 4,
    MemOp = 5,
    ResolvePointer = 6,
    Alloc = 7,
    Realloc = 8,
    Free = 9,
    GetVal = 10,
}

impl BranchType {
    pub fn from_u8(v: u8) -> Option<Self> {
        use BranchType::*;
        Some(match v {
            0 => None,
            1 => Conditional,
            2 => Indirect,
            3 => Switch,
            4 => Call,
            5 => MemOp,
            6 => ResolvePointer,
            7 => Alloc,
            8 => Realloc,
            9 => Free,
            10 => GetVal,
            _ => return Option::None,
        })
    }
}

impl fmt::Display for BranchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TerminationKind {
    /// Not terminated (yet).
    #[default]
    Running = 0,
    Exit = 1,
    MaxDepth = 2,
    OutOfMemory = 3,
    OutOfStackMemory = 4,
    Solver = 5,
    Abort = 6,
    Assert = 7,
    BadVectorAccess = 8,
    Free = 9,
    Model = 10,
    Overflow = 11,
    Ptr = 12,
    ReadOnly = 13,
    ReportError = 14,
    InvalidBuiltin = 15,
    ImplicitBuiltinReturn = 16,
    UnhandledInstruction = 17,
    Unsupported = 18,
    User = 19,
    Interrupted = 20,
    Replay = 21,
    Silent = 22,
}

impl TerminationKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        use TerminationKind::*;
        Some(match v {
            0 => Running,
            1 => Exit,
            2 => MaxDepth,
            3 => OutOfMemory,
            4 => OutOfStackMemory,
            5 => Solver,
            6 => Abort,
            7 => Assert,
            8 => BadVectorAccess,
            9 => Free,
            10 => Model,
            11 => Overflow,
            12 => Ptr,
            13 => ReadOnly,
            14 => ReportError,
            15 => InvalidBuiltin,
            16 => ImplicitBuiltinReturn,
            17 => UnhandledInstruction,
            18 => Unsupported,
            19 => User,
            20 => Interrupted,
            21 => Replay,
            22 => Silent,
            _ => return None,
        })
    }

    /// Terminations that indicate a bug in the program under test.
    pub fn is_error(self) -> bool {
        use TerminationKind::*;
        matches!(
            self,
            Abort
                | Assert
                | BadVectorAccess
                | Free
                | Model
                | Overflow
                | Ptr
                | ReadOnly
                | ReportError
                | InvalidBuiltin
                | ImplicitBuiltinReturn
                | UnhandledInstruction
                | Unsupported
                | User
        )
    }
}

impl fmt::Display for TerminationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
