//! Per-request context with a shared property template.
//!
//! A [`ContextFactory`] holds the template: properties registered up
//! front that every request should see. [`ContextFactory::set`] stores a
//! value shared by all contexts; [`ContextFactory::bind`] stores a
//! computation that runs lazily, at most once per context, with the
//! result memoized on that context alone.
//!
//! A [`Context`] is created per request and layers a private property
//! map over the template. Reads check the private map first and fall
//! back to the template, so template changes are visible to live
//! contexts until a context shadows or memoizes a property of the same
//! name. Writes always land in the private map; one request can never
//! see another's data.
//!
//! ```ignore
//! use stoa::ContextFactory;
//!
//! let factory = ContextFactory::new();
//! factory.set("greeting", "hello".to_string());
//! factory.bind("request-id", |_cx| next_request_id());
//!
//! let mut cx = factory.create(request);
//! let greeting = cx.get::<String>("greeting");   // shared value
//! let id = cx.get::<u64>("request-id");          // computed here, once
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use stoa_http::Request;

/// A type-erased property value.
type Value = Arc<dyn Any + Send + Sync>;

/// A registered lazy computation, run against the reading context.
type ComputeFn = Arc<dyn Fn(&mut Context) -> Value + Send + Sync>;

/// One template entry.
#[derive(Clone)]
enum Slot {
    /// Same value for every context.
    Shared(Value),

    /// Computed on first read, memoized per context.
    Bound(ComputeFn),
}

/// The shared template store.
type Template = Arc<RwLock<HashMap<String, Slot>>>;

/// Registry of shared and lazily computed context properties.
///
/// Cloning the factory is cheap and both clones feed the same template.
///
/// ```
/// use stoa::ContextFactory;
///
/// let factory = ContextFactory::new();
/// factory.set("app-name", "stoa".to_string());
///
/// assert!(factory.has("app-name"));
/// assert_eq!(*factory.get::<String>("app-name").unwrap(), "stoa");
/// ```
#[derive(Clone, Default)]
pub struct ContextFactory {
    store: Template,
}

impl ContextFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property shared by every context.
    ///
    /// Replaces any earlier shared or bound registration under the same
    /// name. Contexts that have not shadowed the name see the new value
    /// immediately, including contexts created before this call.
    pub fn set<V>(&self, name: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        let value: Value = Arc::new(value);
        self.store.write().insert(name.into(), Slot::Shared(value));
    }

    /// Registers a lazily computed property.
    ///
    /// The computation runs on the first read of `name` through a given
    /// context and its result is memoized on that context. Every context
    /// evaluates independently; replacing the registration later leaves
    /// already-memoized values untouched.
    pub fn bind<F, V>(&self, name: impl Into<String>, compute: F)
    where
        F: Fn(&mut Context) -> V + Send + Sync + 'static,
        V: Any + Send + Sync,
    {
        let compute: ComputeFn =
            Arc::new(move |cx: &mut Context| -> Value { Arc::new(compute(cx)) });
        self.store.write().insert(name.into(), Slot::Bound(compute));
    }

    /// Reads a shared property from the template.
    ///
    /// Bound registrations have no template-level value and read as
    /// `None`; so do missing names and type mismatches.
    #[must_use]
    pub fn get<V>(&self, name: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let store = self.store.read();
        match store.get(name)? {
            Slot::Shared(value) => Arc::clone(value).downcast::<V>().ok(),
            Slot::Bound(_) => None,
        }
    }

    /// Returns `true` if the template has a registration under `name`,
    /// shared or bound.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.store.read().contains_key(name)
    }

    /// Creates a context for one request, backed by this template.
    #[must_use]
    pub fn create(&self, request: Request) -> Context {
        Context {
            request,
            local: HashMap::new(),
            shared: Arc::clone(&self.store),
        }
    }
}

impl fmt::Debug for ContextFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.store.read();
        let mut names: Vec<&str> = store.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ContextFactory").field("names", &names).finish()
    }
}

/// Per-request property carrier.
///
/// Holds the request plus a private property map layered over the
/// factory's template. Each context belongs to exactly one request and
/// is dropped when its dispatch settles.
pub struct Context {
    /// The request this context was created for.
    request: Request,

    /// Properties written or memoized on this context alone.
    local: HashMap<String, Value>,

    /// The factory template reads fall back to.
    shared: Template,
}

impl Context {
    /// Returns the request.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the request mutably.
    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    /// Sets a property on this context only.
    ///
    /// Shadows any template property of the same name for this context;
    /// other contexts are unaffected.
    pub fn set<V>(&mut self, name: impl Into<String>, value: V)
    where
        V: Any + Send + Sync,
    {
        let value: Value = Arc::new(value);
        self.local.insert(name.into(), value);
    }

    /// Reads a property, checking this context first and the template
    /// second.
    ///
    /// A bound registration is evaluated here on first read and the
    /// result memoized, so later reads return the same value without
    /// recomputation. Missing names and type mismatches read as `None`.
    #[must_use]
    pub fn get<V>(&mut self, name: &str) -> Option<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        if let Some(value) = self.local.get(name) {
            return Arc::clone(value).downcast::<V>().ok();
        }

        // Clone the slot out so no template lock is held while a bound
        // computation runs; the computation may read this context again.
        let slot = {
            let store = self.shared.read();
            store.get(name).cloned()
        }?;

        match slot {
            Slot::Shared(value) => value.downcast::<V>().ok(),
            Slot::Bound(compute) => {
                let value = compute(self);
                self.local.insert(name.to_string(), Arc::clone(&value));
                value.downcast::<V>().ok()
            }
        }
    }

    /// Returns `true` if the property exists on this context or in the
    /// template.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.local.contains_key(name) || self.shared.read().contains_key(name)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.local.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Context")
            .field("request", &self.request)
            .field("local", &names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn request() -> Request {
        Request::new(Method::GET, "/")
    }

    #[test]
    fn shared_properties_reach_every_context() {
        let factory = ContextFactory::new();
        factory.set("flavor", "stoic".to_string());

        let mut first = factory.create(request());
        let mut second = factory.create(request());

        assert_eq!(*first.get::<String>("flavor").unwrap(), "stoic");
        assert_eq!(*second.get::<String>("flavor").unwrap(), "stoic");
    }

    #[test]
    fn set_overwrites_any_previous_registration() {
        let factory = ContextFactory::new();
        factory.set("k", 1u32);
        factory.set("k", 2u32);
        assert_eq!(*factory.get::<u32>("k").unwrap(), 2);

        // A shared value also replaces a bound registration.
        factory.bind("lazy", |_cx| 10u32);
        factory.set("lazy", 99u32);
        let mut cx = factory.create(request());
        assert_eq!(*cx.get::<u32>("lazy").unwrap(), 99);
    }

    #[test]
    fn bound_property_computes_once_per_context() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = ContextFactory::new();
        let counter = Arc::clone(&calls);
        factory.bind("serial", move |_cx| counter.fetch_add(1, Ordering::SeqCst));

        let mut cx = factory.create(request());
        let first = cx.get::<usize>("serial").unwrap();
        let second = cx.get::<usize>("serial").unwrap();

        assert_eq!(*first, 0);
        assert_eq!(*second, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn contexts_memoize_independently() {
        let calls = Arc::new(AtomicUsize::new(0));
        let factory = ContextFactory::new();
        let counter = Arc::clone(&calls);
        factory.bind("serial", move |_cx| counter.fetch_add(1, Ordering::SeqCst));

        let mut first = factory.create(request());
        let mut second = factory.create(request());

        assert_eq!(*first.get::<usize>("serial").unwrap(), 0);
        assert_eq!(*second.get::<usize>("serial").unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn template_changes_reach_live_contexts() {
        let factory = ContextFactory::new();
        let mut cx = factory.create(request());
        assert!(cx.get::<String>("late").is_none());

        factory.set("late", "arrived".to_string());
        assert_eq!(*cx.get::<String>("late").unwrap(), "arrived");
    }

    #[test]
    fn local_writes_shadow_the_template() {
        let factory = ContextFactory::new();
        factory.set("k", "template".to_string());

        let mut shadowed = factory.create(request());
        shadowed.set("k", "mine".to_string());
        let mut plain = factory.create(request());

        assert_eq!(*shadowed.get::<String>("k").unwrap(), "mine");
        assert_eq!(*plain.get::<String>("k").unwrap(), "template");
    }

    #[test]
    fn memoized_value_outlives_rebinding() {
        let factory = ContextFactory::new();
        factory.bind("version", |_cx| 1u32);

        let mut early = factory.create(request());
        assert_eq!(*early.get::<u32>("version").unwrap(), 1);

        factory.bind("version", |_cx| 2u32);
        assert_eq!(*early.get::<u32>("version").unwrap(), 1);

        let mut late = factory.create(request());
        assert_eq!(*late.get::<u32>("version").unwrap(), 2);
    }

    #[test]
    fn bound_computation_can_read_other_properties() {
        let factory = ContextFactory::new();
        factory.set("name", "Zeno".to_string());
        factory.bind("greeting", |cx| {
            let name = cx.get::<String>("name").unwrap();
            format!("hello, {name}")
        });

        let mut cx = factory.create(request());
        assert_eq!(*cx.get::<String>("greeting").unwrap(), "hello, Zeno");
    }

    #[test]
    fn type_mismatch_reads_as_none() {
        let factory = ContextFactory::new();
        factory.set("n", 7u32);

        let mut cx = factory.create(request());
        assert!(cx.get::<String>("n").is_none());
        assert_eq!(*cx.get::<u32>("n").unwrap(), 7);
    }

    #[test]
    fn factory_get_skips_bound_registrations() {
        let factory = ContextFactory::new();
        factory.bind("lazy", |_cx| 5u32);

        assert!(factory.get::<u32>("lazy").is_none());
        assert!(factory.has("lazy"));
    }

    #[test]
    fn has_checks_local_then_template() {
        let factory = ContextFactory::new();
        factory.set("shared", 1u32);

        let mut cx = factory.create(request());
        cx.set("mine", 2u32);

        assert!(cx.has("shared"));
        assert!(cx.has("mine"));
        assert!(!cx.has("absent"));
        assert!(!factory.has("mine"));
    }

    #[test]
    fn request_rides_along() {
        let factory = ContextFactory::new();
        let cx = factory.create(Request::new(Method::POST, "/submit"));

        assert_eq!(cx.request().method(), &Method::POST);
        assert_eq!(cx.request().path(), "/submit");
    }
}
