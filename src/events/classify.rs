/*!
 * Operation Classification
 * Maps raw notify event kinds onto the fixed operation vocabulary
 */

use super::types::FsOp;
use notify::event::{AccessKind, AccessMode, ModifyKind};
use notify::EventKind;

/// Classify a raw notification kind
///
/// `None` means the kind has no counterpart in [`FsOp`]; callers report it
/// instead of dropping it. Both a data change and the close of a descriptor
/// opened for writing count as Write.
pub fn classify(kind: EventKind) -> Option<FsOp> {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => Some(FsOp::Write),
        EventKind::Create(_) => Some(FsOp::Create),
        EventKind::Remove(_) => Some(FsOp::Remove),
        EventKind::Modify(modify) => Some(match modify {
            ModifyKind::Name(_) => FsOp::Rename,
            ModifyKind::Metadata(_) => FsOp::Chmod,
            _ => FsOp::Write,
        }),
        // Other Access kinds, Any, Other
        _ => None,
    }
}

/// Whether `kind` is the close of a descriptor opened for writing
pub fn is_write_close(kind: EventKind) -> bool {
    matches!(kind, EventKind::Access(AccessKind::Close(AccessMode::Write)))
}
