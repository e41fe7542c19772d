//! Action catalog: the validated registry of action definitions.
//!
//! The catalog is built once at environment setup and never mutated. Every
//! definition is checked at construction so that a phase breakdown that does
//! not add up to its duration fails fast here instead of surfacing later as
//! a silent timing bug.
//!
//! Ids are dense indices: definition `n` must carry `ActionId(n)`, and
//! [`ActionCatalog::lookup`] is a slice access.

use std::collections::BTreeSet;

use ranni_types::{ActionCategory, ActionDefinition, ActionId, InputBinding, PhaseBreakdown};

/// Absolute tolerance, in seconds, when checking that phases sum to the
/// declared duration.
pub const PHASE_TOLERANCE_SECS: f64 = 1e-6;

/// Errors that can occur when building or querying the catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// The requested action id is not registered.
    #[error("unknown action {id}")]
    UnknownAction {
        /// The id that was requested.
        id: ActionId,
    },

    /// A definition violates a catalog invariant.
    #[error("invalid action configuration: {reason}")]
    InvalidConfiguration {
        /// Explanation of what is wrong with the definition.
        reason: String,
    },
}

/// Validated, immutable registry of action definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCatalog {
    definitions: Vec<ActionDefinition>,
}

impl ActionCatalog {
    /// Build a catalog from definitions whose ids already match their
    /// positions.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidConfiguration`] if the list is empty or
    /// too long for the id space, if an id does not match its position, if a
    /// name is empty or duplicated, if a duration is negative or not finite,
    /// if a phase breakdown does not sum to the duration, or if an action
    /// without an input binding is not a zero-length no-op.
    pub fn new(definitions: Vec<ActionDefinition>) -> Result<Self, CatalogError> {
        if definitions.is_empty() {
            return Err(invalid("catalog must contain at least one action".to_owned()));
        }
        if definitions.len() > usize::from(u16::MAX) {
            return Err(invalid(format!(
                "catalog holds {} actions, more than the id space allows",
                definitions.len()
            )));
        }

        let mut names = BTreeSet::new();
        for (index, definition) in definitions.iter().enumerate() {
            if definition.id.index() != index {
                return Err(invalid(format!(
                    "action '{}' has id {} but sits at position {index}",
                    definition.name, definition.id
                )));
            }
            if definition.name.trim().is_empty() {
                return Err(invalid(format!("action {} has an empty name", definition.id)));
            }
            if !names.insert(definition.name.as_str()) {
                return Err(invalid(format!("duplicate action name '{}'", definition.name)));
            }
            validate_timing(definition)?;
        }

        Ok(Self { definitions })
    }

    /// Build a catalog from definitions in order, assigning each one the id
    /// of its position before validating.
    ///
    /// # Errors
    ///
    /// Same as [`ActionCatalog::new`].
    pub fn from_ordered(mut definitions: Vec<ActionDefinition>) -> Result<Self, CatalogError> {
        for (index, definition) in definitions.iter_mut().enumerate() {
            let raw = u16::try_from(index).map_err(|_err| {
                invalid(format!("action position {index} exceeds the id space"))
            })?;
            definition.id = ActionId(raw);
        }
        Self::new(definitions)
    }

    /// The built-in catalog: the default keyboard and mouse map.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] only if the built-in table is inconsistent,
    /// which the unit tests rule out.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_ordered(builtin_definitions())
    }

    /// Look up a definition by id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::UnknownAction`] if `id` is not registered.
    pub fn lookup(&self, id: ActionId) -> Result<&ActionDefinition, CatalogError> {
        self.definitions
            .get(id.index())
            .ok_or(CatalogError::UnknownAction { id })
    }

    /// Look up a definition by its unique name.
    pub fn find_by_name(&self, name: &str) -> Option<&ActionDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// The first no-op action in the catalog, if any.
    pub fn noop(&self) -> Option<ActionId> {
        self.definitions.iter().find(|d| d.is_noop()).map(|d| d.id)
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty (never true for a constructed catalog).
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Iterate over all definitions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ActionDefinition> {
        self.definitions.iter()
    }
}

fn invalid(reason: String) -> CatalogError {
    CatalogError::InvalidConfiguration { reason }
}

fn validate_timing(definition: &ActionDefinition) -> Result<(), CatalogError> {
    let name = &definition.name;
    if !definition.duration.is_finite() || definition.duration < 0.0 {
        return Err(invalid(format!(
            "action '{name}' has invalid duration {}",
            definition.duration
        )));
    }

    if definition.is_noop() && (definition.duration > 0.0 || definition.phases.is_some()) {
        return Err(invalid(format!(
            "action '{name}' has no input binding but lasts {}s; only a zero-length \
             no-op may omit its input",
            definition.duration
        )));
    }

    let Some(phases) = definition.phases else {
        return Ok(());
    };

    for (label, value) in [
        ("startup", phases.startup),
        ("active", phases.active),
        ("recovery", phases.recovery),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(format!(
                "action '{name}' has invalid {label} duration {value}"
            )));
        }
    }

    let total = phases.total();
    if (total - definition.duration).abs() > PHASE_TOLERANCE_SECS {
        return Err(invalid(format!(
            "action '{name}' phases sum to {total}s but duration is {}s",
            definition.duration
        )));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

fn tap(keys: &[&str]) -> InputBinding {
    InputBinding::Tap {
        keys: keys.iter().map(|&k| k.to_owned()).collect(),
        hold_ms: 100,
        delay_ms: 0,
    }
}

fn hold(keys: &[&str]) -> InputBinding {
    InputBinding::Hold {
        keys: keys.iter().map(|&k| k.to_owned()).collect(),
    }
}

fn entry(
    name: &str,
    category: ActionCategory,
    duration: f64,
    phases: Option<PhaseBreakdown>,
    input: InputBinding,
) -> ActionDefinition {
    ActionDefinition {
        id: ActionId(0),
        name: name.to_owned(),
        category,
        duration,
        interruptible: category == ActionCategory::Movement,
        phases,
        input,
    }
}

/// The default action table. Positions are the action ids.
fn builtin_definitions() -> Vec<ActionDefinition> {
    use ActionCategory::{Combat, Dodge, Instant, Movement};

    let step = Some(PhaseBreakdown::new(0.05, 0.3, 0.15));
    let roll = Some(PhaseBreakdown::new(0.1, 0.4, 0.3));

    vec![
        entry("no_op", Instant, 0.0, None, InputBinding::None),
        entry("move_forward", Movement, 0.5, step, hold(&["w"])),
        entry("move_backward", Movement, 0.5, step, hold(&["s"])),
        entry("move_left", Movement, 0.5, step, hold(&["a"])),
        entry("move_right", Movement, 0.5, step, hold(&["d"])),
        entry("jump", Movement, 0.8, roll, tap(&["space"])),
        entry("dodge", Dodge, 0.8, roll, tap(&["shift"])),
        entry("dodge_forward", Dodge, 0.8, roll, tap(&["shift", "w"])),
        entry("dodge_backward", Dodge, 0.8, roll, tap(&["shift", "s"])),
        entry("dodge_left", Dodge, 0.8, roll, tap(&["shift", "a"])),
        entry("dodge_right", Dodge, 0.8, roll, tap(&["shift", "d"])),
        entry("interact", Instant, 0.2, None, tap(&["e"])),
        entry(
            "attack",
            Combat,
            1.5,
            Some(PhaseBreakdown::new(0.4, 0.3, 0.8)),
            tap(&["lmb"]),
        ),
        entry(
            "heavy_attack",
            Combat,
            2.0,
            Some(PhaseBreakdown::new(0.7, 0.4, 0.9)),
            tap(&["rmb"]),
        ),
        entry(
            "weapon_art",
            Combat,
            2.5,
            Some(PhaseBreakdown::new(0.8, 0.7, 1.0)),
            tap(&["mmb"]),
        ),
        entry(
            "use_item",
            Instant,
            1.0,
            Some(PhaseBreakdown::new(0.3, 0.2, 0.5)),
            tap(&["r"]),
        ),
    ]
}
