pub mod consultation;
pub mod job;
pub mod merchant;
pub mod notification;
pub mod payment;
pub mod profile;
pub mod user;
pub mod verification;
