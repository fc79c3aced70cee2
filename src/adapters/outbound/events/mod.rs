mod broker_publisher;
mod configured_publisher;
mod in_memory_transport;
mod logging_publisher;
mod rest_proxy_transport;

pub use broker_publisher::{BrokerEventPublisher, EventChannels};
pub use configured_publisher::ConfiguredPublisher;
pub use in_memory_transport::{BrokerMessage, InMemoryTransport};
pub use logging_publisher::LoggingEventPublisher;
pub use rest_proxy_transport::RestProxyTransport;
