pub mod permission_checker;
pub mod verification_manager;

pub use permission_checker::run_startup_access_check;
pub use verification_manager::{
    create_shared_verification_manager, SharedVerificationManager, VerificationManager,
};
