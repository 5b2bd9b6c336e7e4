use std::{collections::HashMap, sync::Arc};

use once_cell::sync::Lazy;

use crate::{
    aggregate::{AggregateDescriptor, AggregateImpl, AvgImpl, CountImpl, MaxImpl, MinImpl, Sum0Impl, SumImpl, VarianceImpl},
    error::RegistryError,
    types::DataType,
};

static BUILTINS: Lazy<AggregateRegistry> = Lazy::new(AggregateRegistry::default_aggregate_registry);

/// Case-insensitive registry of aggregate descriptors, keyed by name and
/// argument types.
///
/// Populate it during setup (`&mut self`), then share it read-only: lookups
/// take `&self` and hand out `Arc`s, so any number of workers can resolve
/// concurrently.
#[derive(Debug, Default)]
pub struct AggregateRegistry {
    by_name: HashMap<String, Vec<Arc<AggregateDescriptor>>>,
}

impl AggregateRegistry {
    pub fn new() -> Self { Self { by_name: HashMap::new() } }

    /// Process-wide registry of the built-ins, built on first use.
    pub fn builtins() -> &'static AggregateRegistry {
        &BUILTINS
    }

    /// Fresh registry holding every built-in, for callers that add their own
    /// aggregates during setup.
    pub fn with_builtins() -> Self {
        Self::default_aggregate_registry()
    }

    pub fn register(&mut self, descriptor: AggregateDescriptor) -> Result<(), RegistryError> {
        let candidates = self.by_name.entry(descriptor.name().to_string()).or_default();
        if candidates.iter().any(|d| d.operand_types() == descriptor.operand_types()) {
            return Err(RegistryError::DuplicateSignature {
                name: descriptor.name().to_string(),
                operand_types: descriptor.operand_types().to_vec(),
            });
        }
        tracing::debug!(aggregate = %descriptor.signature(), "registered aggregate");
        candidates.push(Arc::new(descriptor));
        Ok(())
    }

    /// Register every signature of `impl_`. A signature whose descriptor does
    /// not build is logged and skipped, so it can never reach evaluation.
    /// Returns how many descriptors were registered.
    pub fn register_impl<I: AggregateImpl>(&mut self, impl_: I) -> usize {
        let mut registered = 0;
        for types in impl_.signatures() {
            match impl_.descriptor(&types) {
                Ok(descriptor) => match self.register(descriptor) {
                    Ok(()) => registered += 1,
                    Err(e) => tracing::error!(aggregate = impl_.name(), error = %e, "aggregate not registered"),
                },
                Err(e) => {
                    tracing::error!(aggregate = impl_.name(), operands = ?types, error = %e, "invalid aggregate descriptor");
                }
            }
        }
        registered
    }

    /// Every descriptor registered under `name`.
    pub fn get(&self, name: &str) -> Option<&[Arc<AggregateDescriptor>]> {
        self.by_name.get(&name.to_ascii_lowercase()).map(Vec::as_slice)
    }

    /// Descriptor of `name` whose operand types are exactly `argument_types`.
    pub fn resolve(&self, name: &str, argument_types: &[DataType]) -> Result<Arc<AggregateDescriptor>, RegistryError> {
        let candidates = self.get(name).ok_or_else(|| RegistryError::UnknownFunction(name.to_string()))?;
        candidates.iter()
            .find(|d| d.operand_types() == argument_types)
            .cloned()
            .ok_or_else(|| RegistryError::TypeMismatch {
                name: name.to_ascii_lowercase(),
                got: argument_types.to_vec(),
                candidates: candidates.iter().map(|d| d.operand_types().to_vec()).collect(),
            })
    }

    /// Operand type lists registered under `name`; empty for unknown names.
    pub fn candidates(&self, name: &str) -> Vec<Vec<DataType>> {
        self.get(name)
            .map(|ds| ds.iter().map(|d| d.operand_types().to_vec()).collect())
            .unwrap_or_default()
    }

    pub fn list(&self) -> Vec<String> {
        let mut v: Vec<_> = self.by_name.keys().cloned().collect();
        v.sort();
        v
    }

    pub fn default_aggregate_registry() -> Self {
        let mut registry = Self::new();
        registry.register_impl(CountImpl);
        registry.register_impl(SumImpl);
        registry.register_impl(Sum0Impl);
        registry.register_impl(AvgImpl);
        registry.register_impl(MinImpl);
        registry.register_impl(MaxImpl);
        registry.register_impl(VarianceImpl::VAR_POP);
        registry.register_impl(VarianceImpl::VAR_SAMP);
        registry.register_impl(VarianceImpl::STDDEV_POP);
        registry.register_impl(VarianceImpl::STDDEV_SAMP);
        registry
    }
}
