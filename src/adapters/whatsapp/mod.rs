//! WhatsApp Business adapter. Request construction, HTTP delivery, mock provider.

pub mod executor;
pub mod mock_provider;
pub mod request;

pub use executor::{HttpDeliveryExecutor, ProviderCredentials, ProviderEndpoint};
pub use mock_provider::{MockAction, MockDeliveryAdapter};
pub use request::ProviderRequestBuilder;
