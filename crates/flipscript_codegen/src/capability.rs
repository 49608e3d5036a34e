// SPDX-License-Identifier: MIT OR Apache-2.0
//! Platform capabilities and the boilerplate each one contributes.

use std::collections::BTreeSet;

/// Includes every generated app starts from
pub const BASE_INCLUDES: &[&str] = &[
    "#include <furi.h>",
    "#include <gui/gui.h>",
    "#include <input/input.h>",
    "#include <stdlib.h>",
];

/// State fields every generated app carries
pub const BASE_STATE_FIELDS: &[&str] = &["ViewPort* view_port;", "Gui* gui;"];

/// A named platform requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    /// Name as written in `requires`
    pub name: &'static str,
    /// Include directives
    pub includes: &'static [&'static str],
    /// App state struct fields
    pub state_fields: &'static [&'static str],
    /// Statements run in the entry point after the GUI is set up
    pub init: &'static [&'static str],
    /// Statements run by the cleanup function
    pub cleanup: &'static [&'static str],
}

/// Every known capability, in table order
pub const CAPABILITIES: &[Capability] = &[
    Capability {
        name: "gui",
        includes: &[],
        state_fields: &[],
        init: &[],
        cleanup: &[],
    },
    Capability {
        name: "storage",
        includes: &["#include <storage/storage.h>"],
        state_fields: &["Storage* storage;"],
        init: &["app->storage = furi_record_open(RECORD_STORAGE);"],
        cleanup: &["furi_record_close(RECORD_STORAGE);"],
    },
    Capability {
        name: "subghz",
        includes: &["#include <lib/subghz/subghz.h>"],
        state_fields: &["SubGhz* subghz;"],
        init: &["app->subghz = furi_record_open(RECORD_SUBGHZ);"],
        cleanup: &["furi_record_close(RECORD_SUBGHZ);"],
    },
    Capability {
        name: "nfc",
        includes: &["#include <lib/nfc/nfc.h>"],
        state_fields: &["Nfc* nfc;"],
        init: &["app->nfc = furi_record_open(RECORD_NFC);"],
        cleanup: &["furi_record_close(RECORD_NFC);"],
    },
    Capability {
        name: "infrared",
        includes: &["#include <lib/infrared/infrared.h>"],
        state_fields: &["Infrared* infrared;"],
        init: &["app->infrared = furi_record_open(RECORD_INFRARED);"],
        cleanup: &["furi_record_close(RECORD_INFRARED);"],
    },
    Capability {
        name: "bt",
        includes: &["#include <bt/bt_service.h>"],
        state_fields: &["BtService* bt;"],
        init: &["app->bt = furi_record_open(RECORD_BT);"],
        cleanup: &["furi_record_close(RECORD_BT);"],
    },
];

/// Look up a capability by name
pub fn lookup(name: &str) -> Option<&'static Capability> {
    CAPABILITIES.iter().find(|c| c.name == name)
}

/// Deduplicated set of required capabilities, kept in table order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    entries: Vec<&'static Capability>,
}

impl CapabilitySet {
    /// Build the set from a manifest `requires` list.
    ///
    /// Unknown names are logged and ignored.
    pub fn from_requires<S: AsRef<str>>(requires: &[S]) -> Self {
        let mut wanted = vec![false; CAPABILITIES.len()];
        for name in requires {
            let name = name.as_ref();
            match CAPABILITIES.iter().position(|c| c.name == name) {
                Some(index) => wanted[index] = true,
                None => tracing::warn!(capability = name, "Ignoring unknown capability"),
            }
        }

        let entries = CAPABILITIES
            .iter()
            .zip(wanted)
            .filter_map(|(capability, wanted)| wanted.then_some(capability))
            .collect();
        Self { entries }
    }

    /// Capabilities in table order
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &'static Capability> + '_ {
        self.entries.iter().copied()
    }

    /// Whether a capability is in the set
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|c| c.name == name)
    }

    /// Number of capabilities
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted, deduplicated include directives, base set included
    pub fn includes(&self) -> Vec<&'static str> {
        let set: BTreeSet<&'static str> = BASE_INCLUDES
            .iter()
            .copied()
            .chain(self.iter().flat_map(|c| c.includes.iter().copied()))
            .collect();
        set.into_iter().collect()
    }

    /// State fields, base fields first then capabilities in table order
    pub fn state_fields(&self) -> Vec<&'static str> {
        BASE_STATE_FIELDS
            .iter()
            .copied()
            .chain(self.iter().flat_map(|c| c.state_fields.iter().copied()))
            .collect()
    }

    /// Init statements in table order
    pub fn init(&self) -> Vec<&'static str> {
        self.iter().flat_map(|c| c.init.iter().copied()).collect()
    }

    /// Cleanup statements in reverse table order
    pub fn cleanup(&self) -> Vec<&'static str> {
        self.iter().rev().flat_map(|c| c.cleanup.iter().copied()).collect()
    }
}
