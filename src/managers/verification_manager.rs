use dashmap::DashMap;
use poise::serenity_prelude::{RoleId, UserId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::tito::TicketLookup;
use crate::verification::{GrantReport, MemberGateway, VerificationOutcome};

/// Decides and applies the outcome of an access button press
pub struct VerificationManager {
    /// Role granted on success
    role_id: RoleId,

    /// Ticket lookup for the configured event
    lookup: Arc<dyn TicketLookup>,

    /// One lock per user with an attempt in progress (user_id -> lock)
    in_flight: DashMap<UserId, Arc<Mutex<()>>>,
}

impl VerificationManager {
    pub fn new(role_id: RoleId, lookup: Arc<dyn TicketLookup>) -> Self {
        Self {
            role_id,
            lookup,
            in_flight: DashMap::new(),
        }
    }

    pub fn role_id(&self) -> RoleId {
        self.role_id
    }

    /// Run one verification attempt for `user_id`
    ///
    /// Attempts by the same user run one after the other, so a double click
    /// sees `AlreadyVerified` the second time instead of granting twice.
    pub async fn verify(
        &self,
        gateway: &dyn MemberGateway,
        user_id: UserId,
        username: &str,
    ) -> VerificationOutcome {
        let lock = self.in_flight.entry(user_id).or_default().clone();

        let outcome = {
            let _guard = lock.lock().await;
            self.run_attempt(gateway, user_id, username).await
        };

        drop(lock);
        self.in_flight
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);

        outcome
    }

    async fn run_attempt(
        &self,
        gateway: &dyn MemberGateway,
        user_id: UserId,
        username: &str,
    ) -> VerificationOutcome {
        debug!("Verification attempt by {} ({})", username, user_id);

        let roles = match gateway.member_roles(user_id).await {
            Ok(roles) => roles,
            Err(e) => {
                error!(
                    "Could not fetch guild membership for {} ({}): {}",
                    username, user_id, e
                );
                return VerificationOutcome::UnexpectedError;
            }
        };

        if roles.contains(&self.role_id) {
            debug!("{} ({}) is already verified", username, user_id);
            return VerificationOutcome::AlreadyVerified;
        }

        match gateway.guild_has_role(self.role_id).await {
            Ok(true) => {}
            Ok(false) => {
                error!(
                    "Verification role {} does not exist in the guild; {} ({}) could not be verified. Check 'role_id' in the config.",
                    self.role_id, username, user_id
                );
                return VerificationOutcome::RoleMisconfigured;
            }
            Err(e) => {
                error!(
                    "Could not fetch guild roles while verifying {} ({}): {}",
                    username, user_id, e
                );
                return VerificationOutcome::UnexpectedError;
            }
        }

        let ticket = match self.lookup.find_ticket_for_username(username).await {
            Ok(Some(ticket)) => ticket,
            Ok(None) => {
                warn!(
                    "No ticket answer matches {} ({}); verification refused",
                    username, user_id
                );
                return VerificationOutcome::NoMatchingTicket;
            }
            Err(e) => {
                error!(
                    "Ticket lookup failed while verifying {} ({}): {}",
                    username, user_id, e
                );
                return VerificationOutcome::UnexpectedError;
            }
        };

        let first_name = ticket.first_name().unwrap_or(username).to_string();

        let report = self.grant_access(gateway, user_id, &first_name).await;
        if !report.is_complete() {
            error!(
                "Partial verification for {} ({}) with ticket {}: {}",
                username,
                user_id,
                ticket.ticket_reference,
                report.describe()
            );
            return VerificationOutcome::UnexpectedError;
        }

        info!(
            "Discord account {} ({}) linked to ticket {}",
            username, user_id, ticket.ticket_reference
        );

        VerificationOutcome::Success {
            first_name,
            ticket_reference: ticket.ticket_reference,
        }
    }

    /// Grant the role, then set the nickname; both are always attempted
    async fn grant_access(
        &self,
        gateway: &dyn MemberGateway,
        user_id: UserId,
        nickname: &str,
    ) -> GrantReport {
        let role_granted = match gateway.add_role(user_id, self.role_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to add role {} to {}: {}. Bot requires 'Manage Roles' and a role above the verification role.",
                    self.role_id, user_id, e
                );
                false
            }
        };

        let nickname_set = match gateway.set_nickname(user_id, nickname).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Failed to set nickname '{}' for {}: {}. Bot requires 'Manage Nicknames' and must rank above the member.",
                    nickname, user_id, e
                );
                false
            }
        };

        GrantReport {
            role_granted,
            nickname_set,
        }
    }

    /// Number of users with an attempt in progress
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Shared verification manager type
pub type SharedVerificationManager = Arc<VerificationManager>;

pub fn create_shared_verification_manager(
    role_id: RoleId,
    lookup: Arc<dyn TicketLookup>,
) -> SharedVerificationManager {
    Arc::new(VerificationManager::new(role_id, lookup))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BotError, LookupError, Result};
    use crate::tito::{find_matching_answer, MatchPolicy, TicketAnswer};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    const VERIFIED_ROLE: u64 = 500;
    const USER: u64 = 42;

    enum LookupBehaviour {
        Answers(Vec<TicketAnswer>),
        Fail,
    }

    struct FakeLookup {
        behaviour: LookupBehaviour,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeLookup {
        fn with_answers(answers: Vec<TicketAnswer>) -> Arc<Self> {
            Arc::new(Self {
                behaviour: LookupBehaviour::Answers(answers),
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                behaviour: LookupBehaviour::Fail,
                calls: AtomicUsize::new(0),
                delay: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TicketLookup for FakeLookup {
        async fn find_ticket_for_username(
            &self,
            username: &str,
        ) -> std::result::Result<Option<TicketAnswer>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.behaviour {
                LookupBehaviour::Answers(answers) => {
                    Ok(find_matching_answer(answers, username, MatchPolicy::CaseSensitive).cloned())
                }
                LookupBehaviour::Fail => Err(LookupError::Status {
                    status: 503,
                    body: "maintenance".to_string(),
                }),
            }
        }
    }

    /// In-memory guild with one member
    struct FakeGateway {
        member_roles: StdMutex<Vec<RoleId>>,
        guild_roles: Vec<RoleId>,
        nickname: StdMutex<Option<String>>,
        member_missing: bool,
        fail_add_role: bool,
        fail_nickname: bool,
        add_role_calls: AtomicUsize,
        nickname_calls: AtomicUsize,
    }

    impl FakeGateway {
        fn new() -> Self {
            Self {
                member_roles: StdMutex::new(vec![]),
                guild_roles: vec![RoleId::new(VERIFIED_ROLE), RoleId::new(1)],
                nickname: StdMutex::new(None),
                member_missing: false,
                fail_add_role: false,
                fail_nickname: false,
                add_role_calls: AtomicUsize::new(0),
                nickname_calls: AtomicUsize::new(0),
            }
        }

        fn mutations(&self) -> usize {
            self.add_role_calls.load(Ordering::SeqCst) + self.nickname_calls.load(Ordering::SeqCst)
        }

        fn nickname(&self) -> Option<String> {
            self.nickname.lock().unwrap().clone()
        }
    }

    fn discord_error(what: &str) -> BotError {
        BotError::Discord {
            message: what.to_string(),
        }
    }

    #[async_trait]
    impl MemberGateway for FakeGateway {
        async fn member_roles(&self, _user_id: UserId) -> Result<Vec<RoleId>> {
            if self.member_missing {
                return Err(discord_error("Unknown Member"));
            }
            Ok(self.member_roles.lock().unwrap().clone())
        }

        async fn guild_has_role(&self, role_id: RoleId) -> Result<bool> {
            Ok(self.guild_roles.contains(&role_id))
        }

        async fn add_role(&self, _user_id: UserId, role_id: RoleId) -> Result<()> {
            self.add_role_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_add_role {
                return Err(discord_error("Missing Permissions"));
            }
            self.member_roles.lock().unwrap().push(role_id);
            Ok(())
        }

        async fn set_nickname(&self, _user_id: UserId, nickname: &str) -> Result<()> {
            self.nickname_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_nickname {
                return Err(discord_error("Missing Permissions"));
            }
            *self.nickname.lock().unwrap() = Some(nickname.to_string());
            Ok(())
        }
    }

    fn ada() -> TicketAnswer {
        TicketAnswer {
            response: "ada_l".to_string(),
            ticket_name: "Ada Lovelace".to_string(),
            ticket_reference: "REF-ADA".to_string(),
        }
    }

    fn manager(lookup: Arc<dyn TicketLookup>) -> VerificationManager {
        VerificationManager::new(RoleId::new(VERIFIED_ROLE), lookup)
    }

    #[tokio::test]
    async fn test_success_grants_role_and_first_name() {
        let lookup = FakeLookup::with_answers(vec![ada()]);
        let manager = manager(lookup.clone());
        let gateway = FakeGateway::new();

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(
            outcome,
            VerificationOutcome::Success {
                first_name: "Ada".to_string(),
                ticket_reference: "REF-ADA".to_string(),
            }
        );
        assert_eq!(gateway.nickname().as_deref(), Some("Ada"));
        assert!(gateway
            .member_roles
            .lock()
            .unwrap()
            .contains(&RoleId::new(VERIFIED_ROLE)));
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_matching_ticket_mutates_nothing() {
        let manager = manager(FakeLookup::with_answers(vec![ada()]));
        let gateway = FakeGateway::new();

        for username in ["grace", "ADA_L", "", "   "] {
            let outcome = manager.verify(&gateway, UserId::new(USER), username).await;
            assert_eq!(outcome, VerificationOutcome::NoMatchingTicket);
        }
        assert_eq!(gateway.mutations(), 0);
    }

    #[tokio::test]
    async fn test_blank_answer_never_matches_blank_username() {
        let blank = TicketAnswer {
            response: String::new(),
            ticket_name: "Nobody Special".to_string(),
            ticket_reference: "REF-BLANK".to_string(),
        };
        let manager = manager(FakeLookup::with_answers(vec![blank]));
        let gateway = FakeGateway::new();

        let outcome = manager.verify(&gateway, UserId::new(USER), "").await;
        assert_eq!(outcome, VerificationOutcome::NoMatchingTicket);
        assert_eq!(gateway.mutations(), 0);
    }

    #[tokio::test]
    async fn test_already_verified_skips_lookup() {
        let lookup = FakeLookup::with_answers(vec![ada()]);
        let manager = manager(lookup.clone());
        let gateway = FakeGateway::new();
        gateway
            .member_roles
            .lock()
            .unwrap()
            .push(RoleId::new(VERIFIED_ROLE));

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
        assert_eq!(lookup.calls(), 0);
        assert_eq!(gateway.mutations(), 0);
    }

    #[tokio::test]
    async fn test_verify_twice_is_idempotent() {
        let lookup = FakeLookup::with_answers(vec![ada()]);
        let manager = manager(lookup.clone());
        let gateway = FakeGateway::new();

        let first = manager.verify(&gateway, UserId::new(USER), "ada_l").await;
        assert!(first.is_success());
        let mutations_after_first = gateway.mutations();

        for _ in 0..2 {
            let again = manager.verify(&gateway, UserId::new(USER), "ada_l").await;
            assert_eq!(again, VerificationOutcome::AlreadyVerified);
        }
        assert_eq!(gateway.mutations(), mutations_after_first);
        assert_eq!(lookup.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_role_is_misconfiguration_for_everyone() {
        let lookup = FakeLookup::with_answers(vec![ada()]);
        let manager = manager(lookup.clone());
        let mut gateway = FakeGateway::new();
        gateway.guild_roles = vec![RoleId::new(1)];

        for username in ["ada_l", "grace", ""] {
            let outcome = manager.verify(&gateway, UserId::new(USER), username).await;
            assert_eq!(outcome, VerificationOutcome::RoleMisconfigured);
        }
        assert_eq!(lookup.calls(), 0);
        assert_eq!(gateway.mutations(), 0);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_not_reported_as_unregistered() {
        let manager = manager(FakeLookup::failing());
        let gateway = FakeGateway::new();

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(outcome, VerificationOutcome::UnexpectedError);
        assert_eq!(gateway.mutations(), 0);
    }

    #[tokio::test]
    async fn test_member_fetch_failure() {
        let lookup = FakeLookup::with_answers(vec![ada()]);
        let manager = manager(lookup.clone());
        let mut gateway = FakeGateway::new();
        gateway.member_missing = true;

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(outcome, VerificationOutcome::UnexpectedError);
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_nickname_failure_still_grants_role() {
        let manager = manager(FakeLookup::with_answers(vec![ada()]));
        let mut gateway = FakeGateway::new();
        gateway.fail_nickname = true;

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(outcome, VerificationOutcome::UnexpectedError);
        assert_eq!(gateway.add_role_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.nickname_calls.load(Ordering::SeqCst), 1);
        assert!(gateway
            .member_roles
            .lock()
            .unwrap()
            .contains(&RoleId::new(VERIFIED_ROLE)));
    }

    #[tokio::test]
    async fn test_role_failure_still_attempts_nickname() {
        let manager = manager(FakeLookup::with_answers(vec![ada()]));
        let mut gateway = FakeGateway::new();
        gateway.fail_add_role = true;

        let outcome = manager.verify(&gateway, UserId::new(USER), "ada_l").await;

        assert_eq!(outcome, VerificationOutcome::UnexpectedError);
        assert_eq!(gateway.nickname_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.nickname().as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_blank_ticket_name_falls_back_to_username() {
        let ticket = TicketAnswer {
            response: "mononym".to_string(),
            ticket_name: "  ".to_string(),
            ticket_reference: "REF-M".to_string(),
        };
        let manager = manager(FakeLookup::with_answers(vec![ticket]));
        let gateway = FakeGateway::new();

        let outcome = manager.verify(&gateway, UserId::new(USER), "mononym").await;

        assert!(outcome.is_success());
        assert_eq!(gateway.nickname().as_deref(), Some("mononym"));
    }

    #[tokio::test]
    async fn test_concurrent_presses_by_same_user_are_serialized() {
        let lookup = Arc::new(FakeLookup {
            behaviour: LookupBehaviour::Answers(vec![ada()]),
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(50)),
        });
        let manager = manager(lookup.clone());
        let gateway = FakeGateway::new();

        let (first, second) = tokio::join!(
            manager.verify(&gateway, UserId::new(USER), "ada_l"),
            manager.verify(&gateway, UserId::new(USER), "ada_l"),
        );

        let successes = [&first, &second].iter().filter(|o| o.is_success()).count();
        assert_eq!(successes, 1);
        assert!(
            first == VerificationOutcome::AlreadyVerified
                || second == VerificationOutcome::AlreadyVerified
        );
        assert_eq!(gateway.add_role_calls.load(Ordering::SeqCst), 1);
        assert_eq!(gateway.nickname_calls.load(Ordering::SeqCst), 1);
        assert_eq!(lookup.calls(), 1);
        assert_eq!(manager.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_different_users_do_not_block_each_other() {
        let lookup = Arc::new(FakeLookup {
            behaviour: LookupBehaviour::Answers(vec![ada()]),
            calls: AtomicUsize::new(0),
            delay: Some(Duration::from_millis(200)),
        });
        let manager = manager(lookup.clone());
        let gateway_a = FakeGateway::new();
        let gateway_b = FakeGateway::new();

        let started = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            manager.verify(&gateway_a, UserId::new(1001), "ada_l"),
            manager.verify(&gateway_b, UserId::new(1002), "ada_l"),
        );

        assert!(a.is_success());
        assert!(b.is_success());
        assert!(started.elapsed() < Duration::from_millis(390));
        assert_eq!(lookup.calls(), 2);
    }
}
