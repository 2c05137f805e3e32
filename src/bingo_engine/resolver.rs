use std::collections::BTreeSet;

use log::debug;

use crate::bingo_engine::{
    error::{BingoError, Result},
    ledger::GuessLedger,
    models::{GuessCategory, GuessValue},
};

/// Participants whose guess is at or below `outcome` and nearest to it.
///
/// Guesses above the outcome are disqualified outright; if every guess is
/// over, nobody wins. Equal distances share the win.
pub fn closest_not_over<'a, I>(guesses: I, outcome: u32) -> BTreeSet<String>
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    let eligible: Vec<(&str, u32)> = guesses
        .into_iter()
        .filter(|&(_, guess)| guess <= outcome)
        .map(|(name, guess)| (name, outcome - guess))
        .collect();

    let Some(closest) = eligible.iter().map(|&(_, distance)| distance).min() else {
        return BTreeSet::new();
    };
    eligible
        .into_iter()
        .filter(|&(_, distance)| distance == closest)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Winners for `category` given the observed `outcome`. Pure query.
///
/// Bingo lines win on exact match; counts use [`closest_not_over`].
pub fn resolve(ledger: &GuessLedger, category: GuessCategory, outcome: &GuessValue) -> Result<BTreeSet<String>> {
    let outcome = outcome.clone().validated(category)?;
    let guesses = ledger.guesses_in(category);

    let winners: BTreeSet<String> = match outcome {
        GuessValue::Line(line) => guesses
            .into_iter()
            .filter(|(_, v)| matches!(v, GuessValue::Line(l) if *l == line))
            .map(|(name, _)| name)
            .collect(),
        GuessValue::Count(count) => closest_not_over(
            guesses
                .iter()
                .filter_map(|(name, v)| v.as_count().map(|n| (name.as_str(), n))),
            count,
        ),
    };
    debug!("{category} winners: {winners:?}");
    Ok(winners)
}

/// String form used by chat adapters.
pub fn resolve_named(ledger: &GuessLedger, category: &str, outcome: &str) -> Result<BTreeSet<String>> {
    let category: GuessCategory = category
        .parse()
        .map_err(|_| BingoError::UnknownCategory(category.trim().to_string()))?;
    resolve(ledger, category, &GuessValue::parse(category, outcome)?)
}
