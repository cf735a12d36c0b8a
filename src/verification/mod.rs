pub mod gateway;
pub mod types;

pub use gateway::{MemberGateway, SerenityGateway};
pub use types::{GrantReport, VerificationOutcome};
