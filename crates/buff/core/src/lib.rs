//! Deterministic buff/modifier aggregation.
//!
//! `buff-core` manages numeric modifiers applied to entities and computes the
//! effective value of an entity property by composing every active modifier
//! through an ordered pipeline. It has no I/O; content loading lives in
//! `buff-content`.
//!
//! All instance mutation flows through [`BuffEngine`]. Effective values come
//! from the pure [`calculator`], which only reads instances. Entities take
//! part through the [`BuffTarget`] trait.
pub mod calculator;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod formula;
pub mod instance;
pub mod target;
pub mod trigger;

pub use calculator::{PropertyBreakdown, calculate, calculate_breakdown};
pub use config::EngineConfig;
pub use definition::{
    BuffDefinition, BuffKind, CalculationType, DefinitionError, DefinitionRegistry,
    EffectDefinition, EffectType, LoadReport, StackRule, TriggerTiming, ValueType,
};
pub use engine::{
    ApplyOptions, ApplyOutcome, BuffCommand, BuffEngine, BuffEvent, BuffListener, CommandQueue,
    EventRecorder, RemoveOutcome, UnchangedReason,
};
pub use error::{BuffEngineError, BuffError, ErrorSeverity};
pub use formula::{Formula, FormulaContext, FormulaError};
pub use instance::{
    BuffInstance, EffectInstance, EntityId, InstanceId, InstanceStore, StateBag, StateValue,
};
pub use target::{BuffTarget, TargetLookup};
pub use trigger::{CustomEffectContext, CustomEffectHandler, TriggerRunner};
