mod application_event_bus;
mod event_dispatcher;
mod feature_service_impl;
mod product_service_impl;
mod release_service_impl;

pub use application_event_bus::ApplicationEventBus;
pub use event_dispatcher::EventDispatcher;
pub use feature_service_impl::FeatureServiceImpl;
pub use product_service_impl::ProductServiceImpl;
pub use release_service_impl::ReleaseServiceImpl;
