pub mod crypto;
pub mod extract;
pub mod request;
pub mod signature;
pub mod token;
pub mod validation;
