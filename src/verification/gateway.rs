use async_trait::async_trait;
use poise::serenity_prelude::{self as serenity, GuildId, Http, RoleId, UserId};

use crate::error::Result;

/// Discord's longest allowed nickname, in characters
pub const MAX_NICKNAME_LEN: usize = 32;

/// The member operations verification needs from Discord
#[async_trait]
pub trait MemberGateway: Send + Sync {
    /// Roles the member currently holds in the configured guild
    async fn member_roles(&self, user_id: UserId) -> Result<Vec<RoleId>>;

    /// Whether the guild's role set contains `role_id`
    async fn guild_has_role(&self, role_id: RoleId) -> Result<bool>;

    async fn add_role(&self, user_id: UserId, role_id: RoleId) -> Result<()>;

    async fn set_nickname(&self, user_id: UserId, nickname: &str) -> Result<()>;
}

/// [`MemberGateway`] backed by Discord's HTTP API
pub struct SerenityGateway<'a> {
    http: &'a Http,
    guild_id: GuildId,
}

impl<'a> SerenityGateway<'a> {
    pub fn new(http: &'a Http, guild_id: GuildId) -> Self {
        Self { http, guild_id }
    }
}

#[async_trait]
impl MemberGateway for SerenityGateway<'_> {
    async fn member_roles(&self, user_id: UserId) -> Result<Vec<RoleId>> {
        let member = self.guild_id.member(self.http, user_id).await?;
        Ok(member.roles)
    }

    async fn guild_has_role(&self, role_id: RoleId) -> Result<bool> {
        let roles = self.guild_id.roles(self.http).await?;
        Ok(roles.contains_key(&role_id))
    }

    async fn add_role(&self, user_id: UserId, role_id: RoleId) -> Result<()> {
        self.http
            .add_member_role(
                self.guild_id,
                user_id,
                role_id,
                Some("Verified ticket registration"),
            )
            .await?;
        Ok(())
    }

    async fn set_nickname(&self, user_id: UserId, nickname: &str) -> Result<()> {
        self.guild_id
            .edit_member(
                self.http,
                user_id,
                serenity::EditMember::new().nickname(clamp_nickname(nickname)),
            )
            .await?;
        Ok(())
    }
}

/// Cut a nickname down to what Discord accepts
pub fn clamp_nickname(nickname: &str) -> String {
    nickname.chars().take(MAX_NICKNAME_LEN).collect()
}
