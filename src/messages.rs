// src/messages.rs

pub const TITO_LOOKUP_URL: &str = "https://lookup.tito.io";

pub fn access_panel_message(event_name: &str, code_of_conduct_url: Option<&str>) -> String {
    let rules = match code_of_conduct_url {
        Some(url) => format!(
            "When you have finished reading the rules and the [{} Code of Conduct]({})",
            event_name, url
        ),
        None => "When you have finished reading the rules".to_string(),
    };

    format!(
        "{}, please use the button below to gain access to the rest of the server.\n\n\
        You will need to make sure you have answered the Discord username question when registering for {} - \
        if you haven't, then you can update your responses by following the link that was sent to your email after registering a ticket.\n\n\
        Your Discord nickname will also be automatically updated to your first name after using the button. \
        If you do not wish to use your real name as your nickname, feel free to update this afterwards.",
        rules, event_name
    )
}

pub fn success_message(first_name: &str) -> String {
    format!(
        "**Welcome {}, you have been successfully verified!** \
        You can now view the other channels in the server - we recommend introducing yourself to everybody else in the introductions channel.\n\n\
        We encourage everybody to use their real name as their nickname, so your nickname has been automatically updated to your first name. \
        However, if you are not comfortable with this, or simply want to use a different name, then feel free to update it to something else.",
        first_name
    )
}

pub fn already_verified_message() -> String {
    "You have already been verified!".to_string()
}

pub fn not_registered_message() -> String {
    format!(
        "Sorry, we were unable to verify your registration. \
        Please make sure you have answered the Discord username question in your ticket. \
        You can update your responses by following the link that was sent to your email after registering, \
        or by retrieving it on [lookup.tito.io]({}).\n\n\
        If you believe this is an error, please let an organiser know.",
        TITO_LOOKUP_URL
    )
}

pub fn role_misconfigured_message() -> String {
    "Sorry, verification is not set up correctly on this server right now, so we could not give you access. \
    This is not a problem with your registration. Please let an organiser know."
        .to_string()
}

pub fn unexpected_error_message() -> String {
    "Sorry, something went wrong while checking your registration. \
    Please try the button again in a few minutes, and if it keeps failing, let an organiser know."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_panel_with_code_of_conduct() {
        let text = access_panel_message("AcmeHack", Some("https://acme.test/conduct"));
        assert!(text.contains("[AcmeHack Code of Conduct](https://acme.test/conduct)"));
        assert!(text.contains("registering for AcmeHack"));
    }

    #[test]
    fn test_access_panel_without_code_of_conduct() {
        let text = access_panel_message("AcmeHack", None);
        assert!(!text.contains("Code of Conduct"));
        assert!(text.starts_with("When you have finished reading the rules, please"));
    }

    #[test]
    fn test_not_registered_points_to_lookup() {
        assert!(not_registered_message().contains(TITO_LOOKUP_URL));
    }
}
