use di::ServiceCollection;

/// a module used for di configuration.
///
/// # Example
/// ```
/// use di::{Ref, ServiceCollection, singleton_as_self};
/// use hole_bootstrap::module::Module;
///
/// pub struct Counter;
/// pub struct CounterModule;
///
/// impl Module for CounterModule {
///     fn configure(&self, binder: &mut ServiceCollection) {
///         binder.add(singleton_as_self::<Counter>().from(|_| Ref::new(Counter)));
///     }
/// }
/// ```
pub trait Module {
    fn configure(&self, binder: &mut ServiceCollection);
}
