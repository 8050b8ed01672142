//! Recommended-play search: the cheapest play that beats the table, or the
//! card to lead with.

use super::{
    constants::OPENING_CARD,
    entities::{Card, LastPlay},
    functional::{PlayStrength, can_beat, classify_and_sort_cards, play_strength},
};

/// Call `f` with every `k`-card combination of `cards`.
pub(crate) fn for_each_combination<F>(cards: &[Card], k: usize, mut f: F)
where
    F: FnMut(&[Card]),
{
    fn recurse<F: FnMut(&[Card])>(
        cards: &[Card],
        k: usize,
        start: usize,
        current: &mut Vec<Card>,
        f: &mut F,
    ) {
        if current.len() == k {
            f(current);
            return;
        }
        let needed = k - current.len();
        for i in start..=cards.len().saturating_sub(needed) {
            if i >= cards.len() {
                break;
            }
            current.push(cards[i]);
            recurse(cards, k, i + 1, current, f);
            current.pop();
        }
    }

    if k == 0 || k > cards.len() {
        return;
    }
    let mut current = Vec::with_capacity(k);
    recurse(cards, k, 0, &mut current, &mut f);
}

/// Every valid combo of `size` cards in `hand`, weakest first.
#[must_use]
pub fn enumerate_plays(hand: &[Card], size: usize) -> Vec<(PlayStrength, Vec<Card>)> {
    let mut plays = Vec::new();
    for_each_combination(hand, size, |combo| {
        if let Some(strength) = play_strength(combo) {
            plays.push((strength, classify_and_sort_cards(combo).sorted_cards));
        }
    });
    plays.sort_by(|a, b| a.0.cmp(&b.0));
    plays
}

fn cheapest_beating<P>(hand: &[Card], last_play: &LastPlay, accept: P) -> Option<Vec<Card>>
where
    P: Fn(&[Card]) -> bool,
{
    let size = last_play.cards.len();
    if !matches!(size, 1 | 2 | 3 | 5) {
        return None;
    }
    let mut best: Option<(PlayStrength, Vec<Card>)> = None;
    for_each_combination(hand, size, |combo| {
        if !accept(combo) || !can_beat(combo, &last_play.cards) {
            return;
        }
        let Some(strength) = play_strength(combo) else {
            return;
        };
        if best.as_ref().is_none_or(|(current, _)| strength < *current) {
            best = Some((strength, combo.to_vec()));
        }
    });
    best.map(|(_, cards)| classify_and_sort_cards(&cards).sorted_cards)
}

/// Minimal legal play for the current situation.
///
/// With an opening card the result always contains it, or is `None` when
/// the hand does not hold it. Leading without an opening card plays the
/// single lowest card. Following plays the weakest combo of the same size
/// that beats `last_play`; five-card follows consider every five-card type.
#[must_use]
pub fn find_recommended_play_with_opening(
    hand: &[Card],
    last_play: Option<&LastPlay>,
    opening: Option<Card>,
) -> Option<Vec<Card>> {
    if let Some(required) = opening {
        if !hand.contains(&required) {
            return None;
        }
        return match last_play {
            None => Some(vec![required]),
            Some(last) => cheapest_beating(hand, last, |combo| combo.contains(&required)),
        };
    }
    match last_play {
        None => hand.iter().min().map(|card| vec![*card]),
        Some(last) => cheapest_beating(hand, last, |_| true),
    }
}

/// [`find_recommended_play_with_opening`] with the 3♦ required on the first
/// play of the game.
#[must_use]
pub fn find_recommended_play(
    hand: &[Card],
    last_play: Option<&LastPlay>,
    is_first_play_of_game: bool,
) -> Option<Vec<Card>> {
    let opening = is_first_play_of_game.then_some(OPENING_CARD);
    find_recommended_play_with_opening(hand, last_play, opening)
}
