use serde::{Deserialize, Deserializer, Serialize};

/// Shortest answer accepted as a username
/// Blank and placeholder answers ("-", "no") fall below it
pub const MIN_ANSWER_LEN: usize = 3;

/// One registrant's answer to the username question
/// The API sends more fields than these; the rest are ignored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketAnswer {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub response: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ticket_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ticket_reference: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of `GET /v3/{account}/{event}/questions/{question}/answers`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswersResponse {
    pub answers: Vec<TicketAnswer>,
}

/// How an answer is compared with a Discord username
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Registrants often capitalise their username, Discord stores it lowercase
    #[default]
    CaseInsensitive,
    CaseSensitive,
}

impl MatchPolicy {
    fn matches(self, answer: &str, username: &str) -> bool {
        match self {
            MatchPolicy::CaseInsensitive => answer.to_lowercase() == username.to_lowercase(),
            MatchPolicy::CaseSensitive => answer == username,
        }
    }
}

/// Return the first answer, in list order, that names `username`
///
/// Answers are trimmed before comparison and must be at least
/// [`MIN_ANSWER_LEN`] characters; a blank username matches nothing.
pub fn find_matching_answer<'a>(
    answers: &'a [TicketAnswer],
    username: &str,
    policy: MatchPolicy,
) -> Option<&'a TicketAnswer> {
    let username = username.trim();
    if username.is_empty() {
        return None;
    }

    answers.iter().find(|answer| {
        let response = answer.response.trim();
        response.chars().count() >= MIN_ANSWER_LEN && policy.matches(response, username)
    })
}

impl TicketAnswer {
    /// First whitespace-delimited token of the ticket holder's name
    pub fn first_name(&self) -> Option<&str> {
        self.ticket_name.split_whitespace().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answer(response: &str, name: &str, reference: &str) -> TicketAnswer {
        TicketAnswer {
            response: response.to_string(),
            ticket_name: name.to_string(),
            ticket_reference: reference.to_string(),
        }
    }

    #[test]
    fn test_parse_answers_response() {
        let json = r##"{
            "answers": [
                {
                    "id": 1,
                    "response": "ada_l",
                    "ticket_name": "Ada Lovelace",
                    "ticket_reference": "ABCD-1",
                    "question_id": 42
                }
            ],
            "meta": { "current_page": 1 }
        }"##;

        let parsed: AnswersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.answers.len(), 1);
        assert_eq!(parsed.answers[0], answer("ada_l", "Ada Lovelace", "ABCD-1"));
    }

    #[test]
    fn test_missing_and_null_fields() {
        let json = r##"{ "answers": [ { "response": "ada_l" }, { "response": null, "ticket_name": null } ] }"##;
        let parsed: AnswersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.answers[0].ticket_name, "");
        assert_eq!(parsed.answers[1].response, "");
    }

    #[test]
    fn test_case_sensitive_matches_exact_only() {
        let answers = vec![
            answer("alice", "Alice One", "R-1"),
            answer("Alice", "Alice Two", "R-2"),
        ];

        let found = find_matching_answer(&answers, "alice", MatchPolicy::CaseSensitive).unwrap();
        assert_eq!(found.ticket_reference, "R-1");

        let found = find_matching_answer(&answers, "Alice", MatchPolicy::CaseSensitive).unwrap();
        assert_eq!(found.ticket_reference, "R-2");

        assert!(find_matching_answer(&answers, "ALICE", MatchPolicy::CaseSensitive).is_none());
    }

    #[test]
    fn test_case_insensitive_takes_first_in_list_order() {
        let answers = vec![
            answer("Alice", "Alice Two", "R-2"),
            answer("alice", "Alice One", "R-1"),
        ];

        let found =
            find_matching_answer(&answers, "alice", MatchPolicy::CaseInsensitive).unwrap();
        assert_eq!(found.ticket_reference, "R-2");
    }

    #[test]
    fn test_empty_answers_never_match() {
        let answers = vec![answer("", "Blank Answer", "R-0"), answer("   ", "Spaces", "R-1")];

        for policy in [MatchPolicy::CaseSensitive, MatchPolicy::CaseInsensitive] {
            assert!(find_matching_answer(&answers, "", policy).is_none());
            assert!(find_matching_answer(&answers, "   ", policy).is_none());
        }
    }

    #[test]
    fn test_short_answers_never_match() {
        let answers = vec![answer("ab", "Short Name", "R-1")];
        assert!(find_matching_answer(&answers, "ab", MatchPolicy::CaseInsensitive).is_none());
        assert!(find_matching_answer(&answers, "ab", MatchPolicy::CaseSensitive).is_none());
    }

    #[test]
    fn test_answer_whitespace_is_trimmed() {
        let answers = vec![answer("  grace.h \n", "Grace Hopper", "R-9")];
        let found =
            find_matching_answer(&answers, "grace.h", MatchPolicy::CaseSensitive).unwrap();
        assert_eq!(found.ticket_reference, "R-9");
    }

    #[test]
    fn test_no_match() {
        let answers = vec![answer("someone", "Some One", "R-1")];
        assert!(find_matching_answer(&answers, "nobody", MatchPolicy::CaseInsensitive).is_none());
        assert!(find_matching_answer(&[], "nobody", MatchPolicy::CaseInsensitive).is_none());
    }

    #[test]
    fn test_first_name() {
        assert_eq!(answer("x", "Ada Lovelace", "r").first_name(), Some("Ada"));
        assert_eq!(answer("x", "  Ada  Lovelace", "r").first_name(), Some("Ada"));
        assert_eq!(answer("x", "Cher", "r").first_name(), Some("Cher"));
        assert_eq!(answer("x", "   ", "r").first_name(), None);
    }
}
