//! Per-invocation import state.
//!
//! Duplicate sets, the entity-resolution cache and the report all depend on
//! what earlier rows of the same file did, so rows must go through one
//! session strictly in order. Every row step takes `&mut ImportSession`,
//! which rules out processing rows of one file in parallel.

use super::duplicates::{PhoneKeySet, RowFingerprints};
use super::report::ReportBuilder;
use super::resolver::EntityResolver;
use super::schema::EntityKind;
use super::store::DocumentStore;

pub struct ImportSession<'a> {
    pub(crate) store: &'a dyn DocumentStore,
    pub(crate) kind: EntityKind,
    pub(crate) fingerprints: RowFingerprints,
    pub(crate) phones: PhoneKeySet,
    pub(crate) resolver: EntityResolver,
    pub(crate) report: ReportBuilder,
}

impl<'a> ImportSession<'a> {
    pub fn new(store: &'a dyn DocumentStore, kind: EntityKind) -> Self {
        Self {
            store,
            kind,
            fingerprints: RowFingerprints::new(),
            phones: PhoneKeySet::new(),
            resolver: EntityResolver::new(),
            report: ReportBuilder::new(),
        }
    }

    pub fn report(&self) -> &ReportBuilder {
        &self.report
    }
}
