//! Simulator fault taxonomy.
//!
//! This module defines the typed error hierarchy used by every component of the
//! simulated machine. It provides:
//! 1. **Fault Kinds:** A closed, two-level taxonomy (Input / Runtime and its
//!    leaves / Sanity) covering guest-program faults and internal errors.
//! 2. **Fault Values:** An immutable payload carrying a short reason, optional
//!    extended detail, and the origin file and line of the raise site.
//! 3. **Raising Macros:** [`fault!`], [`sanity_fault!`], and [`sanity_check!`]
//!    capture the raise location automatically.
//!
//! Faults are detected immediately, never deferred or batched, and must always
//! reach a reporting boundary (CLI, GUI, or test harness); no fault is ever
//! caught and silently discarded.

use std::error::Error;
use std::fmt;

/// Category tag for a [`Fault`].
///
/// The taxonomy has two levels. `Input` covers malformed guest programs, data,
/// or configuration. `Runtime` and its leaves cover faults arising from the
/// guest program's behavior or from invalid-but-reachable machine state.
/// `Sanity` marks an internal invariant violation: never expected under
/// correct operation and always fatal to the current run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultKind {
    /// Malformed guest program, data, or configuration.
    Input,
    /// Generic guest-visible runtime fault (base of the Runtime branch).
    Runtime,
    /// Decoded instruction is not supported by the simulated machine.
    UnsupportedInstruction,
    /// Decoded ALU operation is not supported; raised at execute time rather
    /// than at decode time.
    UnsupportedAluOperation,
    /// Integer operation overflowed (or underflowed).
    Overflow,
    /// Jump to an address that is not aligned to the instruction size.
    UnalignedJump,
    /// Unknown memory-access control value; usually indicates a decoder bug
    /// rather than a guest mistake.
    UnknownMemoryControl,
    /// Access to an address outside the simulated memory.
    OutOfMemoryAccess,
    /// Guest invoked a system call the simulator does not implement.
    SyscallUnknown,
    /// Internal consistency violation. Always fatal; always rendered with the
    /// stock bug-report template.
    Sanity,
}

impl FaultKind {
    /// Returns `true` for `Runtime` and every leaf of the Runtime branch.
    pub fn is_runtime(self) -> bool {
        matches!(
            self,
            Self::Runtime
                | Self::UnsupportedInstruction
                | Self::UnsupportedAluOperation
                | Self::Overflow
                | Self::UnalignedJump
                | Self::UnknownMemoryControl
                | Self::OutOfMemoryAccess
                | Self::SyscallUnknown
        )
    }

    /// Returns the kind's display name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Runtime => "Runtime",
            Self::UnsupportedInstruction => "UnsupportedInstruction",
            Self::UnsupportedAluOperation => "UnsupportedAluOperation",
            Self::Overflow => "Overflow",
            Self::UnalignedJump => "UnalignedJump",
            Self::UnknownMemoryControl => "UnknownMemoryControl",
            Self::OutOfMemoryAccess => "OutOfMemoryAccess",
            Self::SyscallUnknown => "SyscallUnknown",
            Self::Sanity => "Sanity",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stock preamble rendered into every Sanity fault's extended detail.
pub const SANITY_REPORT_TEMPLATE: &str = "An internal error occurred in the simulator. \
We are sorry for the inconvenience. To help get it fixed quickly, please report this \
incident to your teacher and/or file an issue in the project bug tracker, attaching \
the program you were executing, the simulator configuration, the steps you have taken, \
and a copy of the following message:";

/// A typed simulator fault.
///
/// Immutable once constructed; a fault is owned by whichever stack frame is
/// propagating it until a catching frame consumes or re-reports it.
///
/// # Examples
///
/// ```
/// use edusim_machine::fault::{Fault, FaultKind};
///
/// let fault = Fault::new(FaultKind::Overflow, "addition overflowed", "", "alu.rs", 42);
/// assert_eq!(fault.message(false), "Overflow: addition overflowed");
/// assert_eq!(fault.message(true), "Overflow: addition overflowed (alu.rs:42)");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    reason: String,
    extended: String,
    file: &'static str,
    line: u32,
}

impl Fault {
    /// Creates a new fault.
    ///
    /// Prefer the [`fault!`] and [`sanity_fault!`] macros, which capture the
    /// raise site automatically. An empty `extended` string means "no extended
    /// detail".
    ///
    /// # Arguments
    ///
    /// * `kind` - Category tag in the closed taxonomy.
    /// * `reason` - Short, one-line description.
    /// * `extended` - Optional longer explanation (empty for none).
    /// * `file` - Origin file of the raise site.
    /// * `line` - Origin line of the raise site.
    pub fn new(
        kind: FaultKind,
        reason: impl Into<String>,
        extended: impl Into<String>,
        file: &'static str,
        line: u32,
    ) -> Self {
        let fault = Self {
            kind,
            reason: reason.into(),
            extended: extended.into(),
            file,
            line,
        };
        if fault.kind == FaultKind::Sanity {
            tracing::error!(file = fault.file, line = fault.line, reason = %fault.reason,
                "sanity fault raised");
        }
        fault
    }

    /// Returns the fault's category tag.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Returns the short reason text.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the extended detail, or an empty string when there is none.
    pub fn extended(&self) -> &str {
        &self.extended
    }

    /// Returns the origin file of the raise site.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// Returns the origin line of the raise site.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Renders the fault as `"<kind>: <reason> [<extended>]"`.
    ///
    /// The bracketed extended detail is omitted when empty. When
    /// `include_location` is set, ` (<file>:<line>)` is appended.
    pub fn message(&self, include_location: bool) -> String {
        let mut msg = format!("{}: {}", self.kind, self.reason);
        if !self.extended.is_empty() {
            msg.push_str(&format!(" [{}]", self.extended));
        }
        if include_location {
            msg.push_str(&format!(" ({}:{})", self.file, self.line));
        }
        msg
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message(true))
    }
}

impl Error for Fault {}

/// Constructs a [`Fault`] of the given kind, capturing the raise site.
///
/// Accepts a kind identifier, a reason, and optionally an extended detail:
/// `fault!(Input, "bad geometry")` or
/// `fault!(OutOfMemoryAccess, "read past end", detail)`.
#[macro_export]
macro_rules! fault {
    ($kind:ident, $reason:expr $(,)?) => {
        $crate::fault::Fault::new(
            $crate::fault::FaultKind::$kind,
            $reason,
            "",
            file!(),
            line!(),
        )
    };
    ($kind:ident, $reason:expr, $ext:expr $(,)?) => {
        $crate::fault::Fault::new(
            $crate::fault::FaultKind::$kind,
            $reason,
            $ext,
            file!(),
            line!(),
        )
    };
}

/// Constructs a Sanity [`Fault`] whose extended detail carries the stock
/// bug-report template followed by `$msg`.
#[macro_export]
macro_rules! sanity_fault {
    ($msg:expr) => {
        $crate::fault::Fault::new(
            $crate::fault::FaultKind::Sanity,
            "Internal error",
            format!("{}\n\n{}", $crate::fault::SANITY_REPORT_TEMPLATE, $msg),
            file!(),
            line!(),
        )
    };
}

/// Early-returns `Err(sanity_fault!(..))` from the enclosing function when
/// `$cond` is false. The enclosing function must return `Result<_, Fault>`.
#[macro_export]
macro_rules! sanity_check {
    ($cond:expr, $msg:expr) => {
        if !($cond) {
            return Err($crate::sanity_fault!(format!(
                "Sanity check failed ({}): {}",
                stringify!($cond),
                $msg
            )));
        }
    };
}
