//! Shared encoding/decoding configuration.
//!
//! A [`Context`] holds the introspector, the alias strategy and the ordered
//! coder and converter provider chains. Provider answers are cached per class
//! name. A context is `Send + Sync` and meant to be shared (typically behind
//! an `Arc`) by any number of concurrent encoding and decoding sessions.

mod alias;
mod coder;
mod converter;
mod filter;
mod introspector;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use parking_lot::RwLock;

use crate::codec::{Decoder, Encoder};
use crate::error::SpearalError;
use crate::types::Value;

pub use alias::{
    AliasStrategy, BasicAliasStrategy, ClassNameAliaser, PropertyAliases, WILDCARD_CLASS,
};
pub use coder::{ClassCoderProvider, Coder, CoderProvider, StandardCoderProvider};
pub use converter::{ClassConverterProvider, Converter, ConverterProvider, Position};
pub use filter::PropertyFilter;
pub use introspector::{BeanFactory, ClassDescriptor, Introspector, RegistryIntrospector};

/// Default limit on nested values accepted by a decoder.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Encoding/decoding configuration shared by sessions.
pub struct Context {
    introspector: Arc<dyn Introspector>,
    alias_strategy: Arc<dyn AliasStrategy>,
    coder_providers: Vec<Arc<dyn CoderProvider>>,
    converter_providers: Vec<Arc<dyn ConverterProvider>>,
    coders: RwLock<HashMap<String, Arc<dyn Coder>>>,
    converters: RwLock<HashMap<String, Arc<dyn Converter>>>,
    max_depth: usize,
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn introspector(&self) -> &dyn Introspector {
        &*self.introspector
    }

    pub fn alias_strategy(&self) -> &dyn AliasStrategy {
        &*self.alias_strategy
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Finds the coder of a value's class, `None` when no provider offers one.
    pub fn coder_for(&self, value: &Value) -> Option<Arc<dyn Coder>> {
        if self.coder_providers.is_empty() {
            return None;
        }
        let class_name = self.introspector.class_name_of(value);
        if let Some(coder) = self.coders.read().get(class_name.as_ref()) {
            return Some(coder.clone());
        }
        let coder = self
            .coder_providers
            .iter()
            .find_map(|provider| provider.coder(value))?;
        tracing::trace!(class = %class_name, "caching coder");
        self.coders
            .write()
            .insert(class_name.into_owned(), coder.clone());
        Some(coder)
    }

    /// Finds the converter of a decoded value's class.
    pub fn converter_for(&self, value: &Value) -> Option<Arc<dyn Converter>> {
        if self.converter_providers.is_empty() {
            return None;
        }
        let class_name = self.introspector.class_name_of(value);
        if let Some(converter) = self.converters.read().get(class_name.as_ref()) {
            return Some(converter.clone());
        }
        let converter = self
            .converter_providers
            .iter()
            .find_map(|provider| provider.converter(value))?;
        tracing::trace!(class = %class_name, "caching converter");
        self.converters
            .write()
            .insert(class_name.into_owned(), converter.clone());
        Some(converter)
    }

    /// Runs the converter of `value`'s class, or returns `value` unchanged.
    pub fn convert(&self, value: Value, position: &Position<'_>) -> Result<Value, SpearalError> {
        match self.converter_for(&value) {
            Some(converter) => converter.convert(value, position),
            None => Ok(value),
        }
    }

    /// Encodes one value in a fresh session.
    pub fn encode(&self, value: &Value) -> Result<Bytes, SpearalError> {
        let mut out = BytesMut::new();
        Encoder::new(self, &mut out).write_any(value)?;
        Ok(out.freeze())
    }

    /// Encodes one value in a fresh session, restricted by `filter`.
    pub fn encode_filtered(
        &self,
        value: &Value,
        filter: &PropertyFilter,
    ) -> Result<Bytes, SpearalError> {
        let mut out = BytesMut::new();
        Encoder::new(self, &mut out)
            .with_filter(filter)
            .write_any(value)?;
        Ok(out.freeze())
    }

    /// Decodes one value in a fresh session. Bytes after the value are
    /// ignored.
    pub fn decode(&self, data: &[u8]) -> Result<Value, SpearalError> {
        let mut input = data;
        Decoder::new(self, &mut input).read_any()
    }
}

impl Default for Context {
    fn default() -> Self {
        ContextBuilder::new().build()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("coder_providers", &self.coder_providers.len())
            .field("converter_providers", &self.converter_providers.len())
            .field("cached_coders", &self.coders.read().len())
            .field("cached_converters", &self.converters.read().len())
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`Context`].
pub struct ContextBuilder {
    introspector: Option<Arc<dyn Introspector>>,
    alias_strategy: Option<Arc<dyn AliasStrategy>>,
    coder_providers: Vec<Arc<dyn CoderProvider>>,
    converter_providers: Vec<Arc<dyn ConverterProvider>>,
    standard_coders: bool,
    max_depth: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self {
            introspector: None,
            alias_strategy: None,
            coder_providers: Vec::new(),
            converter_providers: Vec::new(),
            standard_coders: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets the introspector. Defaults to an empty [`RegistryIntrospector`].
    pub fn introspector(mut self, introspector: impl Introspector + 'static) -> Self {
        self.introspector = Some(Arc::new(introspector));
        self
    }

    /// Shares an introspector that is still registered into after the build.
    pub fn shared_introspector(mut self, introspector: Arc<dyn Introspector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    /// Sets the alias strategy. Defaults to an identity
    /// [`BasicAliasStrategy`].
    pub fn alias_strategy(mut self, strategy: impl AliasStrategy + 'static) -> Self {
        self.alias_strategy = Some(Arc::new(strategy));
        self
    }

    /// Adds a coder provider ahead of all previously added ones.
    pub fn coder_provider(mut self, provider: impl CoderProvider + 'static) -> Self {
        self.coder_providers.insert(0, Arc::new(provider));
        self
    }

    /// Adds a coder provider behind all previously added ones (but still
    /// ahead of the standard provider).
    pub fn append_coder_provider(mut self, provider: impl CoderProvider + 'static) -> Self {
        self.coder_providers.push(Arc::new(provider));
        self
    }

    /// Adds a converter provider ahead of all previously added ones.
    pub fn converter_provider(mut self, provider: impl ConverterProvider + 'static) -> Self {
        self.converter_providers.insert(0, Arc::new(provider));
        self
    }

    pub fn append_converter_provider(
        mut self,
        provider: impl ConverterProvider + 'static,
    ) -> Self {
        self.converter_providers.push(Arc::new(provider));
        self
    }

    /// Whether the [`StandardCoderProvider`] closes the coder chain.
    /// Enabled by default.
    pub fn standard_coders(mut self, enabled: bool) -> Self {
        self.standard_coders = enabled;
        self
    }

    /// Sets the nesting limit of decoders.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn build(self) -> Context {
        let mut coder_providers = self.coder_providers;
        if self.standard_coders {
            coder_providers.push(Arc::new(StandardCoderProvider::new()));
        }
        tracing::debug!(
            coder_providers = coder_providers.len(),
            converter_providers = self.converter_providers.len(),
            max_depth = self.max_depth,
            "Spearal context built"
        );
        Context {
            introspector: self
                .introspector
                .unwrap_or_else(|| Arc::new(RegistryIntrospector::new())),
            alias_strategy: self
                .alias_strategy
                .unwrap_or_else(|| Arc::new(BasicAliasStrategy::new())),
            coder_providers,
            converter_providers: self.converter_providers,
            coders: RwLock::new(HashMap::new()),
            converters: RwLock::new(HashMap::new()),
            max_depth: self.max_depth,
        }
    }
}
