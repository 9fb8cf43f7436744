//! Vote tallying.

use std::collections::{HashMap, HashSet};

use pollnow_db::entities::{poll_option, vote};
use serde::Serialize;

/// Count and share for one option.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option_id: String,
    pub participant_id: String,
    pub votes: u64,
    /// Share of all selections, 0..=100.
    pub percentage: f64,
}

/// Aggregated result of one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollTally {
    pub options: Vec<OptionTally>,
    /// Selections across all ballots.
    pub total_votes: u64,
    /// Ballots cast.
    pub total_voters: u64,
    /// Option IDs sharing the highest count. Empty when nobody voted.
    pub winners: Vec<String>,
}

/// Tally ballots against a poll's options, in option order.
///
/// Selections of unknown options are ignored, as are repeated selections
/// of the same option within one ballot.
#[must_use]
pub fn tally(options: &[poll_option::Model], votes: &[vote::Model]) -> PollTally {
    let mut counts: HashMap<&str, u64> = options.iter().map(|o| (o.id.as_str(), 0)).collect();

    for ballot in votes {
        let mut seen = HashSet::new();
        for option_id in ballot.selected_options() {
            if !seen.insert(option_id.clone()) {
                continue;
            }
            if let Some(count) = counts.get_mut(option_id.as_str()) {
                *count += 1;
            }
        }
    }

    let total_votes: u64 = counts.values().sum();
    let max = counts.values().copied().max().unwrap_or(0);

    let options: Vec<OptionTally> = options
        .iter()
        .map(|o| {
            let votes = counts.get(o.id.as_str()).copied().unwrap_or(0);
            OptionTally {
                option_id: o.id.clone(),
                participant_id: o.participant_id.clone(),
                votes,
                percentage: percentage(votes, total_votes),
            }
        })
        .collect();

    let winners = if max == 0 {
        vec![]
    } else {
        options
            .iter()
            .filter(|o| o.votes == max)
            .map(|o| o.option_id.clone())
            .collect()
    };

    PollTally {
        options,
        total_votes,
        total_voters: votes.len() as u64,
        winners,
    }
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    pub(crate) fn option(id: &str, poll_id: &str, position: i32) -> poll_option::Model {
        poll_option::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            participant_id: format!("participant-{id}"),
            position,
        }
    }

    pub(crate) fn ballot(id: &str, poll_id: &str, choices: &[&str]) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            voter_fingerprint: format!("fp-{id}"),
            user_id: None,
            option_ids: json!(choices),
            created_at: Utc::now().into(),
        }
    }

    fn three_options() -> Vec<poll_option::Model> {
        vec![
            option("a", "p", 0),
            option("b", "p", 1),
            option("c", "p", 2),
        ]
    }

    #[test]
    fn test_percentages_sum_to_100() {
        let votes = vec![
            ballot("1", "p", &["a"]),
            ballot("2", "p", &["a"]),
            ballot("3", "p", &["b"]),
            ballot("4", "p", &["c"]),
            ballot("5", "p", &["c"]),
            ballot("6", "p", &["c"]),
            ballot("7", "p", &["b"]),
        ];

        let result = tally(&three_options(), &votes);
        let sum: f64 = result.options.iter().map(|o| o.percentage).sum();

        assert!((sum - 100.0).abs() < 1e-9);
        assert_eq!(result.total_votes, 7);
        assert_eq!(result.total_voters, 7);
        assert_eq!(result.winners, vec!["c".to_string()]);
    }

    #[test]
    fn test_zero_votes_has_no_winner() {
        let result = tally(&three_options(), &[]);
        assert!(result.winners.is_empty());
        assert!(result.options.iter().all(|o| o.percentage == 0.0));
        assert_eq!(result.total_votes, 0);
    }

    #[test]
    fn test_ties_produce_multiple_winners() {
        let votes = vec![ballot("1", "p", &["a"]), ballot("2", "p", &["b"])];
        let result = tally(&three_options(), &votes);

        assert_eq!(result.winners, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(result.options[0].percentage, 50.0);
        assert_eq!(result.options[2].votes, 0);
    }

    #[test]
    fn test_multi_choice_ballots() {
        let votes = vec![
            ballot("1", "p", &["a", "b"]),
            ballot("2", "p", &["a", "c"]),
        ];
        let result = tally(&three_options(), &votes);

        assert_eq!(result.total_voters, 2);
        assert_eq!(result.total_votes, 4);
        assert_eq!(result.options[0].votes, 2);
        assert_eq!(result.options[0].percentage, 50.0);
        assert_eq!(result.winners, vec!["a".to_string()]);
    }

    #[test]
    fn test_unknown_and_repeated_options_ignored() {
        let votes = vec![
            ballot("1", "p", &["zzz"]),
            ballot("2", "p", &["a", "a"]),
        ];
        let result = tally(&three_options(), &votes);

        assert_eq!(result.total_votes, 1);
        assert_eq!(result.options[0].votes, 1);
        assert_eq!(result.options[0].percentage, 100.0);
    }
}
