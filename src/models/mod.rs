mod record;
mod response;
mod state;

pub use record::PriceRecord;
pub use response::{ProviderResponse, ResponseMetadata};
pub use state::ProviderState;
