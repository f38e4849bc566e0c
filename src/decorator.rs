//! # Decorator Chains
//!
//! Generic builder wrapping a base object (exception interceptor or finalizer)
//! with optional decorators. Each decorator is applied only when its
//! collaborator is present; the decision is made once, while assembling.
//!
//! ```rust
//! use std::sync::Arc;
//! use temporal_assembly::decorator::DecoratorChain;
//! use temporal_assembly::interceptor::{
//!     DefaultExceptionInterceptor, ExceptionInterceptor, ReportingExceptionInterceptor,
//! };
//! use temporal_assembly::sdk::ErrorReportingHub;
//!
//! let hub: Option<Arc<dyn ErrorReportingHub>> = None;
//! let base: Arc<dyn ExceptionInterceptor> = Arc::new(DefaultExceptionInterceptor::new());
//!
//! let chain = DecoratorChain::new(base, "base").decorate_if_available(
//!     hub,
//!     "reporting",
//!     |inner, hub| Arc::new(ReportingExceptionInterceptor::new(inner, hub)),
//! );
//!
//! assert_eq!(chain.depth(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

/// A base object plus the decorators applied to it, innermost first
pub struct DecoratorChain<T: ?Sized> {
    current: Arc<T>,
    layers: Vec<String>,
}

impl<T: ?Sized> DecoratorChain<T> {
    pub fn new(base: Arc<T>, label: impl Into<String>) -> Self {
        Self {
            current: base,
            layers: vec![label.into()],
        }
    }

    /// Wrap the current outermost layer
    pub fn decorate<F>(mut self, label: impl Into<String>, wrap: F) -> Self
    where
        F: FnOnce(Arc<T>) -> Arc<T>,
    {
        self.current = wrap(self.current);
        self.layers.push(label.into());
        self
    }

    /// Wrap only when the collaborator is present; otherwise the chain is unchanged
    pub fn decorate_if_available<C, F>(self, collaborator: Option<C>, label: impl Into<String>, wrap: F) -> Self
    where
        F: FnOnce(Arc<T>, C) -> Arc<T>,
    {
        match collaborator {
            Some(collaborator) => self.decorate(label, |inner| wrap(inner, collaborator)),
            None => self,
        }
    }

    /// Number of layers including the base
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    /// Layer labels from outermost to base
    pub fn layers(&self) -> Vec<String> {
        self.layers.iter().rev().cloned().collect()
    }

    /// The outermost layer, which callers invoke
    pub fn outermost(&self) -> Arc<T> {
        self.current.clone()
    }

    pub fn build(self) -> Arc<T> {
        self.current
    }
}

impl<T: ?Sized> fmt::Debug for DecoratorChain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorChain")
            .field("layers", &self.layers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct Base;

    impl Greeter for Base {
        fn greet(&self) -> String {
            "base".to_string()
        }
    }

    struct Wrap(&'static str, Arc<dyn Greeter>);

    impl Greeter for Wrap {
        fn greet(&self) -> String {
            format!("{}({})", self.0, self.1.greet())
        }
    }

    #[test]
    fn test_order_is_innermost_first() {
        let chain = DecoratorChain::<dyn Greeter>::new(Arc::new(Base), "base")
            .decorate("health", |inner| Arc::new(Wrap("health", inner)))
            .decorate_if_available(Some(()), "reporting", |inner, ()| {
                Arc::new(Wrap("reporting", inner))
            });

        assert_eq!(chain.depth(), 3);
        assert_eq!(chain.layers(), vec!["reporting", "health", "base"]);
        assert_eq!(chain.build().greet(), "reporting(health(base))");
    }

    #[test]
    fn test_missing_collaborator_skips_layer() {
        let chain = DecoratorChain::<dyn Greeter>::new(Arc::new(Base), "base")
            .decorate_if_available(None::<()>, "reporting", |inner, ()| {
                Arc::new(Wrap("reporting", inner))
            });

        assert_eq!(chain.depth(), 1);
        assert_eq!(chain.outermost().greet(), "base");
    }
}
