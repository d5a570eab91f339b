//! The closed operator catalog
//!
//! Each operator carries classification metadata: class, declared produced
//! type, monotonicity, reversibility and a danger flag. The table is static;
//! nothing registers operators at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::epistemic::EpistemicType;

/// The ten operator kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorKind {
    /// Assert a named source into the chain
    Entry,
    /// Filter rows or select columns
    Restrict,
    /// Join two sources under a conflict policy
    Connect,
    /// Fix the temporal context
    Project,
    /// Name the chain's output
    Designate,
    /// Assert two references denote one entity
    Synthesize,
    /// Keep disagreeing interpretations side by side
    Superpose,
    /// Declare and evaluate an expectation of existence
    AssertAbsence,
    /// Group and compute
    Aggregate,
    /// Replace an earlier definition
    Supersede,
}

/// Operator classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorClass {
    Entry,
    Restrictive,
    Shape,
    Compute,
    Relational,
    Temporal,
    Provenance,
    Epistemic,
}

impl OperatorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorClass::Entry => "entry",
            OperatorClass::Restrictive => "restrictive",
            OperatorClass::Shape => "shape",
            OperatorClass::Compute => "compute",
            OperatorClass::Relational => "relational",
            OperatorClass::Temporal => "temporal",
            OperatorClass::Provenance => "provenance",
            OperatorClass::Epistemic => "epistemic",
        }
    }
}

/// Declared produced type of an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProducedType {
    Given,
    Meant,
    DerivedValue,
    /// Passes through the incoming type
    Same,
    /// Determined by context, passes through
    Any,
}

impl ProducedType {
    /// Resolve against the type flowing into the step
    pub fn resolve(&self, incoming: EpistemicType) -> EpistemicType {
        match self {
            ProducedType::Given => EpistemicType::Given,
            ProducedType::Meant => EpistemicType::Meant,
            ProducedType::DerivedValue => EpistemicType::DerivedValue,
            ProducedType::Same | ProducedType::Any => incoming,
        }
    }
}

/// Static classification of one operator kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorSpec {
    pub kind: OperatorKind,
    pub class: OperatorClass,
    pub produces: ProducedType,
    pub monotonic: bool,
    pub reversible: bool,
    pub dangerous: bool,
    pub description: &'static str,
}

const CATALOG: [OperatorSpec; 10] = [
    OperatorSpec {
        kind: OperatorKind::Entry,
        class: OperatorClass::Entry,
        produces: ProducedType::Given,
        monotonic: true,
        reversible: true,
        dangerous: false,
        description: "assert a named source",
    },
    OperatorSpec {
        kind: OperatorKind::Restrict,
        class: OperatorClass::Restrictive,
        produces: ProducedType::Same,
        monotonic: false,
        reversible: true,
        dangerous: false,
        description: "filter rows or select columns",
    },
    OperatorSpec {
        kind: OperatorKind::Connect,
        class: OperatorClass::Relational,
        produces: ProducedType::Same,
        monotonic: true,
        reversible: false,
        dangerous: false,
        description: "join two sources under a conflict policy",
    },
    OperatorSpec {
        kind: OperatorKind::Project,
        class: OperatorClass::Temporal,
        produces: ProducedType::Same,
        monotonic: true,
        reversible: true,
        dangerous: false,
        description: "fix the temporal context",
    },
    OperatorSpec {
        kind: OperatorKind::Designate,
        class: OperatorClass::Shape,
        produces: ProducedType::Same,
        monotonic: true,
        reversible: true,
        dangerous: false,
        description: "name the output",
    },
    OperatorSpec {
        kind: OperatorKind::Synthesize,
        class: OperatorClass::Epistemic,
        produces: ProducedType::Meant,
        monotonic: true,
        reversible: true,
        dangerous: false,
        description: "assert two references denote the same entity",
    },
    OperatorSpec {
        kind: OperatorKind::Superpose,
        class: OperatorClass::Epistemic,
        produces: ProducedType::Meant,
        monotonic: true,
        reversible: true,
        dangerous: false,
        description: "preserve disagreeing interpretations",
    },
    OperatorSpec {
        kind: OperatorKind::AssertAbsence,
        class: OperatorClass::Epistemic,
        produces: ProducedType::Meant,
        monotonic: false,
        reversible: true,
        dangerous: false,
        description: "declare an expectation of existence and evaluate it",
    },
    OperatorSpec {
        kind: OperatorKind::Aggregate,
        class: OperatorClass::Compute,
        produces: ProducedType::DerivedValue,
        monotonic: false,
        reversible: false,
        dangerous: false,
        description: "group and compute",
    },
    OperatorSpec {
        kind: OperatorKind::Supersede,
        class: OperatorClass::Provenance,
        produces: ProducedType::Any,
        monotonic: false,
        reversible: false,
        dangerous: true,
        description: "replace an earlier definition",
    },
];

impl OperatorKind {
    pub const ALL: [OperatorKind; 10] = [
        OperatorKind::Entry,
        OperatorKind::Restrict,
        OperatorKind::Connect,
        OperatorKind::Project,
        OperatorKind::Designate,
        OperatorKind::Synthesize,
        OperatorKind::Superpose,
        OperatorKind::AssertAbsence,
        OperatorKind::Aggregate,
        OperatorKind::Supersede,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::Entry => "entry",
            OperatorKind::Restrict => "restrict",
            OperatorKind::Connect => "connect",
            OperatorKind::Project => "project",
            OperatorKind::Designate => "designate",
            OperatorKind::Synthesize => "synthesize",
            OperatorKind::Superpose => "superpose",
            OperatorKind::AssertAbsence => "assert_absence",
            OperatorKind::Aggregate => "aggregate",
            OperatorKind::Supersede => "supersede",
        }
    }

    /// Catalog entry for this kind
    pub fn spec(&self) -> &'static OperatorSpec {
        let spec = &CATALOG[*self as usize];
        debug_assert_eq!(spec.kind, *self);
        spec
    }

    pub fn class(&self) -> OperatorClass {
        self.spec().class
    }

    pub fn is_dangerous(&self) -> bool {
        self.spec().dangerous
    }

    /// Overall produced type of a sequence of operators.
    ///
    /// The running type only ever rises (given < meant < derived_value), and
    /// any compute-class operator anywhere forces derived_value regardless of
    /// what precedes or follows it.
    pub fn chain_produced_type(kinds: &[OperatorKind]) -> EpistemicType {
        if kinds.iter().any(|k| k.class() == OperatorClass::Compute) {
            return EpistemicType::DerivedValue;
        }
        kinds.iter().fold(EpistemicType::Given, |running, k| {
            running.max(k.spec().produces.resolve(running))
        })
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
