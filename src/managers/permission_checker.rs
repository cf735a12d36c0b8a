use poise::serenity_prelude::{GuildId, Http, Permissions, RoleId};
use tracing::{error, info, warn};

/// A single permission with its status
#[derive(Debug, Clone)]
pub struct PermissionStatus {
    pub name: &'static str,
    pub description: &'static str,
    pub has_permission: bool,
}

/// All permissions the access flow needs
pub fn get_required_permissions() -> Vec<(&'static str, &'static str, Permissions)> {
    vec![
        ("VIEW_CHANNEL", "See the verification channel", Permissions::VIEW_CHANNEL),
        ("SEND_MESSAGES", "Post the access panel", Permissions::SEND_MESSAGES),
        ("EMBED_LINKS", "Send rich embeds in messages", Permissions::EMBED_LINKS),
        ("MANAGE_ROLES", "Grant the verification role", Permissions::MANAGE_ROLES),
        ("MANAGE_NICKNAMES", "Set member nicknames after verification", Permissions::MANAGE_NICKNAMES),
    ]
}

/// The verification role as seen in the guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRoleInfo {
    pub name: String,
    pub position: u16,
}

/// Result of the startup check for the configured guild
#[derive(Debug)]
pub struct AccessSetupCheck {
    pub guild_id: GuildId,
    pub guild_name: String,
    pub permission_statuses: Vec<PermissionStatus>,
    pub has_all_permissions: bool,
    pub bot_role_position: Option<u16>,
    pub bot_role_name: Option<String>,
    /// None when the configured role id is not in the guild
    pub verification_role: Option<VerificationRoleInfo>,
    pub role_hierarchy_ok: bool,
}

impl AccessSetupCheck {
    pub fn all_ok(&self) -> bool {
        self.has_all_permissions && self.verification_role.is_some() && self.role_hierarchy_ok
    }
}

/// Compare what the bot has against what verification needs
pub fn evaluate_access_setup(
    guild_id: GuildId,
    guild_name: String,
    bot_permissions: Permissions,
    bot_top_role: Option<(String, u16)>,
    verification_role: Option<VerificationRoleInfo>,
) -> AccessSetupCheck {
    let administrator = bot_permissions.contains(Permissions::ADMINISTRATOR);

    let permission_statuses: Vec<PermissionStatus> = get_required_permissions()
        .into_iter()
        .map(|(name, description, permission)| PermissionStatus {
            name,
            description,
            has_permission: administrator || bot_permissions.contains(permission),
        })
        .collect();
    let has_all_permissions = permission_statuses.iter().all(|s| s.has_permission);

    let (bot_role_name, bot_role_position) = match bot_top_role {
        Some((name, position)) => (Some(name), Some(position)),
        None => (None, None),
    };

    // Discord only lets a bot assign roles strictly below its highest role
    let role_hierarchy_ok = match (bot_role_position, &verification_role) {
        (Some(bot_pos), Some(role)) => bot_pos > role.position,
        _ => false,
    };

    AccessSetupCheck {
        guild_id,
        guild_name,
        permission_statuses,
        has_all_permissions,
        bot_role_position,
        bot_role_name,
        verification_role,
        role_hierarchy_ok,
    }
}

/// Fetch the guild and check the bot can run verification in it
pub async fn check_access_setup(
    http: &Http,
    guild_id: GuildId,
    role_id: RoleId,
) -> Result<AccessSetupCheck, String> {
    let guild = guild_id
        .to_partial_guild(http)
        .await
        .map_err(|e| format!("Failed to fetch guild {}: {}", guild_id, e))?;

    let bot_user = http
        .get_current_user()
        .await
        .map_err(|e| format!("Failed to get bot user: {}", e))?;

    let bot_member = guild
        .member(http, bot_user.id)
        .await
        .map_err(|e| format!("Failed to get bot member in guild {}: {}", guild_id, e))?;

    // Base permissions are enough for a server-wide check
    #[allow(deprecated)]
    let bot_permissions = guild.member_permissions(&bot_member);

    let bot_top_role = bot_member
        .roles
        .iter()
        .filter_map(|id| guild.roles.get(id))
        .max_by_key(|role| role.position)
        .map(|role| (role.name.clone(), role.position));

    let verification_role = guild.roles.get(&role_id).map(|role| VerificationRoleInfo {
        name: role.name.clone(),
        position: role.position,
    });

    Ok(evaluate_access_setup(
        guild_id,
        guild.name.clone(),
        bot_permissions,
        bot_top_role,
        verification_role,
    ))
}

/// Log check results with appropriate log levels
pub fn log_access_setup_check(check: &AccessSetupCheck, role_id: RoleId) {
    info!("========================================");
    info!("       ACCESS SETUP CHECK");
    info!("========================================");
    info!("Guild: '{}' (ID: {})", check.guild_name, check.guild_id);

    if let Some(ref role_name) = check.bot_role_name {
        info!(
            "Bot's highest role: '{}' (position {})",
            role_name,
            check.bot_role_position.unwrap_or(0)
        );
    } else {
        warn!("Bot has no roles assigned!");
    }

    info!("Server Permissions:");
    for status in &check.permission_statuses {
        if status.has_permission {
            info!("  [YES] {:<18} - {}", status.name, status.description);
        } else {
            error!("  [NO]  {:<18} - {}", status.name, status.description);
        }
    }

    match &check.verification_role {
        Some(role) => {
            info!(
                "Verification role: '{}' (ID: {}, position {})",
                role.name, role_id, role.position
            );
            if check.role_hierarchy_ok {
                info!("  [OK] Bot role is above the verification role");
            } else {
                error!("  [FAIL] Bot role is NOT above the verification role!");
                error!("  Fix: Go to Discord Server Settings > Roles > drag bot's role higher");
            }
        }
        None => {
            error!(
                "Verification role {} does not exist in this guild! Every verification will fail until 'role_id' is fixed.",
                role_id
            );
        }
    }

    if check.all_ok() {
        info!("Status: ALL CHECKS PASSED");
    } else {
        error!("Status: ISSUES DETECTED - verification may fail!");
        if !check.has_all_permissions {
            let missing: Vec<_> = check
                .permission_statuses
                .iter()
                .filter(|s| !s.has_permission)
                .map(|s| s.name)
                .collect();
            error!("  Missing permissions: {}", missing.join(", "));
        }
    }
    info!("========================================");
}

/// Run the check for the configured guild and log results
/// Returns true if everything needed for verification is in place
pub async fn run_startup_access_check(http: &Http, guild_id: GuildId, role_id: RoleId) -> bool {
    match check_access_setup(http, guild_id, role_id).await {
        Ok(check) => {
            log_access_setup_check(&check, role_id);
            check.all_ok()
        }
        Err(e) => {
            error!("Failed to check access setup for guild {}: {}", guild_id, e);
            false
        }
    }
}
