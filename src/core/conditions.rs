//! Stimulus conditions of the one-back task and the code tables that name them.
//!
//! Two mappings from stimulus type code to condition coexist:
//!
//! - [`Lookup::Legacy`] is the mapping the published events tables were
//!   generated with. It is wrong for codes 2..=4, but tables must keep being
//!   written with it so regenerated files stay byte-identical to the released
//!   ones.
//! - [`Lookup::Corrected`] is the authoritative mapping and is what every
//!   analysis of the tables (three-column extraction) must use.
//!
//! Callers always name the mapping they want; there is no default.

use std::fmt;

/// Stimulus class shown in the one-back experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Words,
    Objects,
    ScrambledObjects,
    ConsonantStrings,
}

impl Condition {
    /// All conditions, in modelling order.
    pub const ALL: [Condition; 4] = [
        Condition::Words,
        Condition::Objects,
        Condition::ScrambledObjects,
        Condition::ConsonantStrings,
    ];

    /// Human-readable name written to the `trial_type` column.
    pub const fn name(self) -> &'static str {
        match self {
            Condition::Words => "Words",
            Condition::Objects => "Objects",
            Condition::ScrambledObjects => "Scrambled objects",
            Condition::ConsonantStrings => "Consonant strings",
        }
    }

    /// Short label used in three-column file names (`label-<label>.txt`).
    pub const fn label(self) -> &'static str {
        match self {
            Condition::Words => "words",
            Condition::Objects => "objects",
            Condition::ScrambledObjects => "scrambled",
            Condition::ConsonantStrings => "consonant",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Code table used when the events tables were first released.
/// Required for byte-compatible regeneration of those tables.
pub const LEGACY_LOOKUP: [(u32, Condition); 4] = [
    (1, Condition::Words),
    (2, Condition::Objects),
    (3, Condition::ScrambledObjects),
    (4, Condition::ConsonantStrings),
];

/// Authoritative code table.
pub const CORRECTED_LOOKUP: [(u32, Condition); 4] = [
    (1, Condition::Words),
    (3, Condition::Objects),
    (4, Condition::ScrambledObjects),
    (2, Condition::ConsonantStrings),
];

/// Selects one of the two code tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Legacy,
    Corrected,
}

impl Lookup {
    fn table(self) -> &'static [(u32, Condition); 4] {
        match self {
            Lookup::Legacy => &LEGACY_LOOKUP,
            Lookup::Corrected => &CORRECTED_LOOKUP,
        }
    }

    /// Condition for a stimulus type code, or `None` for an unknown code.
    pub fn condition(self, code: u32) -> Option<Condition> {
        self.table()
            .iter()
            .find(|(c, _)| *c == code)
            .map(|&(_, condition)| condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookups_are_bijective() {
        for lookup in [Lookup::Legacy, Lookup::Corrected] {
            let codes: HashSet<u32> = lookup.table().iter().map(|(c, _)| *c).collect();
            let conditions: HashSet<Condition> =
                lookup.table().iter().map(|(_, c)| *c).collect();
            assert_eq!(codes.len(), 4);
            assert_eq!(conditions.len(), 4);

            assert_eq!(conditions, HashSet::from(Condition::ALL));

            for &(code, condition) in lookup.table() {
                assert_eq!(lookup.condition(code), Some(condition));
            }
        }
    }

    #[test]
    fn test_legacy_and_corrected_differ() {
        assert_eq!(Lookup::Legacy.condition(1), Some(Condition::Words));
        assert_eq!(Lookup::Corrected.condition(1), Some(Condition::Words));

        assert_eq!(Lookup::Legacy.condition(2), Some(Condition::Objects));
        assert_eq!(Lookup::Corrected.condition(2), Some(Condition::ConsonantStrings));

        assert_eq!(Lookup::Legacy.condition(3), Some(Condition::ScrambledObjects));
        assert_eq!(Lookup::Corrected.condition(3), Some(Condition::Objects));

        assert_eq!(Lookup::Legacy.condition(4), Some(Condition::ConsonantStrings));
        assert_eq!(Lookup::Corrected.condition(4), Some(Condition::ScrambledObjects));
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(Lookup::Legacy.condition(0), None);
        assert_eq!(Lookup::Corrected.condition(5), None);
    }

    #[test]
    fn test_names_and_labels() {
        assert_eq!(Condition::ScrambledObjects.name(), "Scrambled objects");
        assert_eq!(Condition::ScrambledObjects.label(), "scrambled");
        assert_eq!(Condition::ConsonantStrings.to_string(), "Consonant strings");
    }
}
