use serde::{
    Deserialize,
    Serialize,
};
use strum::{
    AsRefStr,
    Display,
    EnumIter,
    EnumString,
};

#[derive(
    Debug, Clone, Copy, Display, AsRefStr, EnumIter, EnumString, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Command {
    /// Save the btree stats of every view to JSON files.
    BtreeStats,
    /// Save the utilization stats of every view to JSON files.
    UtilStats,
    /// Reset the utilization stats of every view.
    Reset,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn names_match_the_command_line() {
        let names: Vec<String> = Command::iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["btree_stats", "util_stats", "reset"]);
    }

    #[test]
    fn parses_from_names() {
        assert_eq!(Command::from_str("btree_stats").unwrap(), Command::BtreeStats);
        assert_eq!(Command::from_str("util_stats").unwrap(), Command::UtilStats);
        assert_eq!(Command::from_str("reset").unwrap(), Command::Reset);
        assert!(Command::from_str("utilization_stats").is_err());
    }
}
