//! Derived per-statement flags, packed into a small bitset.

use std::fmt;

use yantra_core::Status;

const STATUS_MASK: u16 = 0b0000_0011;
const STATUS_CURRENT: u16 = 0b0000_0000;
const STATUS_DEPRECATED: u16 = 0b0000_0001;
const STATUS_OBSOLETE: u16 = 0b0000_0010;

const CONFIG: u16 = 0b0000_0100;
/// Set when `config` was declared on the statement itself rather than
/// inherited from the parent.
const CONFIG_EXPLICIT: u16 = 0b0000_1000;
const PRESENCE: u16 = 0b0001_0000;
const MANDATORY: u16 = 0b0010_0000;

/// Flag bitset computed when a statement is frozen into its effective form.
///
/// Defaults: status `current`, config `true` (inherited), no presence,
/// not mandatory.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StmtFlags(u16);

impl StmtFlags {
    pub fn new() -> Self {
        Self(CONFIG)
    }

    pub fn status(self) -> Status {
        match self.0 & STATUS_MASK {
            STATUS_DEPRECATED => Status::Deprecated,
            STATUS_OBSOLETE => Status::Obsolete,
            _ => Status::Current,
        }
    }

    pub fn with_status(self, status: Status) -> Self {
        let bits = match status {
            Status::Current => STATUS_CURRENT,
            Status::Deprecated => STATUS_DEPRECATED,
            Status::Obsolete => STATUS_OBSOLETE,
        };
        Self((self.0 & !STATUS_MASK) | bits)
    }

    pub fn is_config(self) -> bool {
        self.0 & CONFIG != 0
    }

    pub fn is_config_explicit(self) -> bool {
        self.0 & CONFIG_EXPLICIT != 0
    }

    /// Set config as declared on the statement itself.
    pub fn with_explicit_config(self, config: bool) -> Self {
        self.with_config_bit(config, true)
    }

    /// Set config as inherited from the parent statement.
    pub fn with_inherited_config(self, config: bool) -> Self {
        self.with_config_bit(config, false)
    }

    fn with_config_bit(self, config: bool, explicit: bool) -> Self {
        let mut bits = self.0 & !(CONFIG | CONFIG_EXPLICIT);
        if config {
            bits |= CONFIG;
        }
        if explicit {
            bits |= CONFIG_EXPLICIT;
        }
        Self(bits)
    }

    pub fn is_presence(self) -> bool {
        self.0 & PRESENCE != 0
    }

    pub fn with_presence(self, presence: bool) -> Self {
        if presence {
            Self(self.0 | PRESENCE)
        } else {
            Self(self.0 & !PRESENCE)
        }
    }

    pub fn is_mandatory(self) -> bool {
        self.0 & MANDATORY != 0
    }

    pub fn with_mandatory(self, mandatory: bool) -> Self {
        if mandatory {
            Self(self.0 | MANDATORY)
        } else {
            Self(self.0 & !MANDATORY)
        }
    }

    pub fn bits(self) -> u16 {
        self.0
    }
}

impl Default for StmtFlags {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StmtFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StmtFlags")
            .field("status", &self.status())
            .field("config", &self.is_config())
            .field("config_explicit", &self.is_config_explicit())
            .field("presence", &self.is_presence())
            .field("mandatory", &self.is_mandatory())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let flags = StmtFlags::new();
        assert_eq!(flags.status(), Status::Current);
        assert!(flags.is_config());
        assert!(!flags.is_config_explicit());
        assert!(!flags.is_presence());
        assert!(!flags.is_mandatory());
    }

    #[test]
    fn status_round_trip() {
        for status in [Status::Current, Status::Deprecated, Status::Obsolete] {
            assert_eq!(StmtFlags::new().with_status(status).status(), status);
        }
    }

    #[test]
    fn config_explicitness_tracked() {
        let inherited = StmtFlags::new().with_inherited_config(false);
        assert!(!inherited.is_config());
        assert!(!inherited.is_config_explicit());

        let declared = StmtFlags::new().with_explicit_config(false);
        assert!(!declared.is_config());
        assert!(declared.is_config_explicit());

        // Re-inheriting clears explicitness.
        assert!(!declared.with_inherited_config(true).is_config_explicit());
    }

    #[test]
    fn independent_bits() {
        let flags = StmtFlags::new()
            .with_presence(true)
            .with_mandatory(true)
            .with_status(Status::Obsolete);
        assert!(flags.is_presence());
        assert!(flags.is_mandatory());
        assert_eq!(flags.status(), Status::Obsolete);
        assert!(flags.is_config());
    }
}
