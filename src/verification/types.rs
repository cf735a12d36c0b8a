// src/verification/types.rs
use crate::messages;

pub const SUCCESS_COLOUR: u32 = 0x2ecc71;
pub const FAILURE_COLOUR: u32 = 0xe74c3c;

/// Result of one press of the access button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// Member already holds the verification role
    AlreadyVerified,
    /// Configured role id does not exist in the guild
    RoleMisconfigured,
    /// No registrant gave this username
    NoMatchingTicket,
    /// Role granted and nickname set
    Success {
        first_name: String,
        ticket_reference: String,
    },
    /// Anything else; details are in the logs only
    UnexpectedError,
}

impl VerificationOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, VerificationOutcome::Success { .. })
    }

    /// Text shown to the member who pressed the button
    pub fn user_message(&self) -> String {
        match self {
            VerificationOutcome::AlreadyVerified => messages::already_verified_message(),
            VerificationOutcome::RoleMisconfigured => messages::role_misconfigured_message(),
            VerificationOutcome::NoMatchingTicket => messages::not_registered_message(),
            VerificationOutcome::Success { first_name, .. } => {
                messages::success_message(first_name)
            }
            VerificationOutcome::UnexpectedError => messages::unexpected_error_message(),
        }
    }

    pub fn colour(&self) -> u32 {
        if self.is_success() {
            SUCCESS_COLOUR
        } else {
            FAILURE_COLOUR
        }
    }
}

/// Which of the two access mutations went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrantReport {
    pub role_granted: bool,
    pub nickname_set: bool,
}

impl GrantReport {
    pub fn is_complete(&self) -> bool {
        self.role_granted && self.nickname_set
    }

    /// Short description of the state the member was left in
    pub fn describe(&self) -> &'static str {
        match (self.role_granted, self.nickname_set) {
            (true, true) => "role granted, nickname set",
            (true, false) => "role granted but nickname change failed",
            (false, true) => "nickname set but role grant failed",
            (false, false) => "role grant and nickname change both failed",
        }
    }
}
