pub mod common;
pub mod spending_key;
pub mod transparent_key;

pub use spending_key::PaymentAddress;
pub use spending_key::SpendingKey;
pub use spending_key::ViewingKey;
pub use transparent_key::KeyId;
pub use transparent_key::TransparentPublicKey;
pub use transparent_key::TransparentSecretKey;
