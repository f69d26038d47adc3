//! Marker stamped on synthetic input so capture can recognise it.
//!
//! Windows carries a pointer-sized `dwExtraInfo` value on every injected input
//! record and hands it back unchanged in the low-level hook structures
//! (`KBDLLHOOKSTRUCT` / `MSLLHOOKSTRUCT`).  The player writes
//! [`INJECTION_SIGNATURE`] there; the recorder and the hotkey dispatcher drop
//! anything carrying it.  Without this, replaying a macro while recording
//! would feed the replay back into the new recording.

/// A process-wide constant identifying input synthesized by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InjectionSignature(usize);

impl InjectionSignature {
    /// Returns the raw `dwExtraInfo` value.
    pub const fn value(self) -> usize {
        self.0
    }

    /// Returns `true` when `extra_info` was produced by this process.
    pub const fn matches(self, extra_info: usize) -> bool {
        self.0 == extra_info
    }
}

/// The signature used by every component of the process.
///
/// ASCII "MACR"; any value works as long as it is non-zero and stable.
pub const INJECTION_SIGNATURE: InjectionSignature = InjectionSignature(0x4D41_4352);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_its_own_value() {
        assert!(INJECTION_SIGNATURE.matches(INJECTION_SIGNATURE.value()));
    }

    #[test]
    fn test_signature_does_not_match_zero() {
        // Hardware input arrives with dwExtraInfo == 0.
        assert!(!INJECTION_SIGNATURE.matches(0));
    }
}
