//! Combination classification and beat comparison.
//!
//! Everything here is pure: functions take card slices and never touch game
//! state. The solver, the highest-play detector and the bot are all built on
//! [`classify_cards`] and [`play_strength`].

use serde::{Deserialize, Serialize};

use super::entities::{Card, ComboType, LastPlay, Rank, sort_cards};

use super::entities::Rank::{
    Ace, Eight, Five, Four, Jack, King, Nine, Queen, Seven, Six, Ten, Three, Two,
};

/// Every legal straight, lowest first, each listed in sequence order.
///
/// `A-2-3-4-5` is the lowest straight and `10-J-Q-K-A` the highest. Runs
/// through the 2 at the top end (`J-Q-K-A-2`, `Q-K-A-2-3`, `K-A-2-3-4`) are
/// not straights.
pub const STRAIGHT_WINDOWS: [[Rank; 5]; 10] = [
    [Ace, Two, Three, Four, Five],
    [Two, Three, Four, Five, Six],
    [Three, Four, Five, Six, Seven],
    [Four, Five, Six, Seven, Eight],
    [Five, Six, Seven, Eight, Nine],
    [Six, Seven, Eight, Nine, Ten],
    [Seven, Eight, Nine, Ten, Jack],
    [Eight, Nine, Ten, Jack, Queen],
    [Nine, Ten, Jack, Queen, King],
    [Ten, Jack, Queen, King, Ace],
];

/// Ordering key of a valid play. Two plays of the same size compare by
/// combo type first (only meaningful on the five-card ladder) and then by
/// the deciding card.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PlayStrength {
    pub combo_type: ComboType,
    pub key: Card,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ClassifiedCards {
    pub combo_type: ComboType,
    pub sorted_cards: Vec<Card>,
}

/// Ranks grouped by multiplicity, largest group first and higher ranks
/// first within equal group sizes.
fn rank_groups(cards: &[Card]) -> Vec<(Rank, usize)> {
    let mut counts = [0usize; 13];
    for card in cards {
        counts[card.rank.index()] += 1;
    }
    let mut groups: Vec<(Rank, usize)> = Rank::ALL
        .into_iter()
        .filter(|rank| counts[rank.index()] > 0)
        .map(|rank| (rank, counts[rank.index()]))
        .collect();
    groups.sort_by(|a, b| b.1.cmp(&a.1).then(b.0.cmp(&a.0)));
    groups
}

fn has_duplicates(cards: &[Card]) -> bool {
    let mut seen = [false; 52];
    cards.iter().any(|card| {
        let idx = card.index();
        std::mem::replace(&mut seen[idx], true)
    })
}

/// Index into [`STRAIGHT_WINDOWS`] of the run these five cards form.
#[must_use]
pub fn straight_window(cards: &[Card]) -> Option<usize> {
    if cards.len() != 5 {
        return None;
    }
    let mut ranks: Vec<Rank> = cards.iter().map(|card| card.rank).collect();
    ranks.sort_unstable();
    ranks.dedup();
    if ranks.len() != 5 {
        return None;
    }
    STRAIGHT_WINDOWS.iter().position(|window| {
        let mut sorted = *window;
        sorted.sort_unstable();
        sorted[..] == ranks[..]
    })
}

#[must_use]
pub fn is_straight(cards: &[Card]) -> bool {
    straight_window(cards).is_some()
}

#[must_use]
pub fn is_flush(cards: &[Card]) -> bool {
    cards.len() == 5 && cards.iter().all(|card| card.suit == cards[0].suit)
}

/// Classify a set of cards into its combination type.
///
/// Duplicate cards and unsupported sizes (0, 4, 6+) are [`ComboType::Unknown`].
#[must_use]
pub fn classify_cards(cards: &[Card]) -> ComboType {
    if has_duplicates(cards) {
        return ComboType::Unknown;
    }
    let groups = rank_groups(cards);
    match cards.len() {
        1 => ComboType::Single,
        2 if groups.len() == 1 => ComboType::Pair,
        3 if groups.len() == 1 => ComboType::Triple,
        5 => {
            let flush = is_flush(cards);
            let straight = is_straight(cards);
            let shape: Vec<usize> = groups.iter().map(|(_, count)| *count).collect();
            match (flush, straight, shape.as_slice()) {
                (true, true, _) => ComboType::StraightFlush,
                (_, _, [4, 1]) => ComboType::FourOfAKind,
                (_, _, [3, 2]) => ComboType::FullHouse,
                (true, false, _) => ComboType::Flush,
                (false, true, _) => ComboType::Straight,
                _ => ComboType::Unknown,
            }
        }
        _ => ComboType::Unknown,
    }
}

/// The card that decides comparisons between two plays of this type.
fn deciding_card(cards: &[Card], combo_type: ComboType) -> Option<Card> {
    match combo_type {
        ComboType::Single | ComboType::Pair | ComboType::Triple | ComboType::Flush => {
            cards.iter().max().copied()
        }
        ComboType::Straight | ComboType::StraightFlush => {
            let top = STRAIGHT_WINDOWS[straight_window(cards)?][4];
            cards.iter().find(|card| card.rank == top).copied()
        }
        ComboType::FullHouse | ComboType::FourOfAKind => {
            let (rank, _) = *rank_groups(cards).first()?;
            cards.iter().filter(|card| card.rank == rank).max().copied()
        }
        ComboType::Unknown => None,
    }
}

/// Ordering key of a play, or `None` when the cards do not form a combo.
#[must_use]
pub fn play_strength(cards: &[Card]) -> Option<PlayStrength> {
    let combo_type = classify_cards(cards);
    let key = deciding_card(cards, combo_type)?;
    Some(PlayStrength { combo_type, key })
}

/// Whether `new_cards` beats `last_cards`.
///
/// Both sides must be valid combos of the same size. Four of a kind is
/// rank-sensitive: only a strictly higher quad beats a quad.
#[must_use]
pub fn can_beat(new_cards: &[Card], last_cards: &[Card]) -> bool {
    if new_cards.len() != last_cards.len() {
        return false;
    }
    let (Some(new), Some(last)) = (play_strength(new_cards), play_strength(last_cards)) else {
        return false;
    };
    match (new.combo_type.five_card_ladder(), last.combo_type.five_card_ladder()) {
        (Some(_), Some(_)) => new > last,
        (None, None) => new.combo_type == last.combo_type && new.key > last.key,
        _ => false,
    }
}

#[must_use]
pub fn can_beat_play(new_cards: &[Card], last_play: &LastPlay) -> bool {
    can_beat(new_cards, &last_play.cards)
}

/// Classify and order cards for display. Straights come back in sequence
/// order (`A-2-3-4-5` keeps the ace first); everything else in
/// `(rank, suit)` order.
#[must_use]
pub fn classify_and_sort_cards(cards: &[Card]) -> ClassifiedCards {
    let combo_type = classify_cards(cards);
    let mut sorted_cards = cards.to_vec();
    sort_cards(&mut sorted_cards);
    if matches!(combo_type, ComboType::Straight | ComboType::StraightFlush)
        && let Some(window) = straight_window(cards)
    {
        let order = STRAIGHT_WINDOWS[window];
        sorted_cards.sort_by_key(|card| order.iter().position(|rank| *rank == card.rank));
    }
    ClassifiedCards {
        combo_type,
        sorted_cards,
    }
}

/// Display label of a straight, e.g. `5-high` for `A-2-3-4-5`.
#[must_use]
pub fn straight_label(cards: &[Card]) -> Option<String> {
    let window = straight_window(cards)?;
    Some(format!("{}-high", STRAIGHT_WINDOWS[window][4]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit;

    fn cards(ids: &[&str]) -> Vec<Card> {
        ids.iter().map(|id| id.parse().unwrap()).collect()
    }

    // === Classification ===

    #[test]
    fn test_classify_small_combos() {
        assert_eq!(classify_cards(&cards(&["3D"])), ComboType::Single);
        assert_eq!(classify_cards(&cards(&["5D", "5S"])), ComboType::Pair);
        assert_eq!(classify_cards(&cards(&["5D", "6S"])), ComboType::Unknown);
        assert_eq!(classify_cards(&cards(&["9D", "9C", "9S"])), ComboType::Triple);
        assert_eq!(classify_cards(&cards(&["9D", "9C", "8S"])), ComboType::Unknown);
    }

    #[test]
    fn test_classify_unsupported_sizes() {
        assert_eq!(classify_cards(&[]), ComboType::Unknown);
        assert_eq!(
            classify_cards(&cards(&["7D", "7C", "7H", "7S"])),
            ComboType::Unknown
        );
        assert_eq!(
            classify_cards(&cards(&["3D", "4D", "5D", "6D", "7D", "8D"])),
            ComboType::Unknown
        );
    }

    #[test]
    fn test_classify_rejects_duplicates() {
        assert_eq!(classify_cards(&cards(&["5D", "5D"])), ComboType::Unknown);
    }

    #[test]
    fn test_classify_five_card_types() {
        assert_eq!(
            classify_cards(&cards(&["3D", "4C", "5H", "6S", "7D"])),
            ComboType::Straight
        );
        assert_eq!(
            classify_cards(&cards(&["3H", "8H", "JH", "KH", "2H"])),
            ComboType::Flush
        );
        assert_eq!(
            classify_cards(&cards(&["KD", "KC", "KS", "4H", "4S"])),
            ComboType::FullHouse
        );
        assert_eq!(
            classify_cards(&cards(&["9D", "9C", "9H", "9S", "3D"])),
            ComboType::FourOfAKind
        );
        assert_eq!(
            classify_cards(&cards(&["9S", "10S", "JS", "QS", "KS"])),
            ComboType::StraightFlush
        );
        assert_eq!(
            classify_cards(&cards(&["3D", "3C", "5H", "6S", "7D"])),
            ComboType::Unknown
        );
    }

    // === Straight windows ===

    #[test]
    fn test_ace_low_straight_is_lowest() {
        let wheel = cards(&["AD", "2C", "3H", "4S", "5D"]);
        let six_high = cards(&["2D", "3C", "4H", "5S", "6D"]);
        assert_eq!(classify_cards(&wheel), ComboType::Straight);
        assert_eq!(straight_label(&wheel).as_deref(), Some("5-high"));
        assert_eq!(straight_label(&six_high).as_deref(), Some("6-high"));
        assert!(can_beat(&six_high, &wheel));
        assert!(!can_beat(&wheel, &six_high));
    }

    #[test]
    fn test_runs_through_two_are_not_straights() {
        for run in [
            ["JD", "QC", "KH", "AS", "2D"],
            ["QD", "KC", "AH", "2S", "3D"],
            ["KD", "AC", "2H", "3S", "4D"],
        ] {
            assert_eq!(classify_cards(&cards(&run)), ComboType::Unknown, "{run:?}");
        }
    }

    #[test]
    fn test_ace_high_straight_is_highest() {
        let broadway = cards(&["10D", "JC", "QH", "KS", "AD"]);
        let king_high = cards(&["9S", "10S", "JD", "QS", "KS"]);
        assert_eq!(straight_label(&broadway).as_deref(), Some("A-high"));
        assert!(can_beat(&broadway, &king_high));
    }

    #[test]
    fn test_straight_tie_broken_by_top_card_suit() {
        let low = cards(&["3S", "4S", "5S", "6S", "7D"]);
        let high = cards(&["3D", "4D", "5D", "6D", "7H"]);
        assert!(can_beat(&high, &low));
        assert!(!can_beat(&low, &high));
    }

    // === Small combo comparison ===

    #[test]
    fn test_singles_compare_by_rank_then_suit() {
        assert!(can_beat(&cards(&["2D"]), &cards(&["AS"])));
        assert!(can_beat(&cards(&["7S"]), &cards(&["7H"])));
        assert!(!can_beat(&cards(&["7H"]), &cards(&["7S"])));
        assert!(!can_beat(&cards(&["7H"]), &cards(&["7H"])));
    }

    #[test]
    fn test_pairs_tie_broken_by_highest_suit() {
        let spade_pair = cards(&["5D", "5S"]);
        let heart_pair = cards(&["5C", "5H"]);
        assert!(can_beat(&spade_pair, &heart_pair));
        assert!(!can_beat(&heart_pair, &spade_pair));
        assert!(can_beat(&cards(&["6D", "6C"]), &spade_pair));
    }

    #[test]
    fn test_cardinality_must_match() {
        assert!(!can_beat(&cards(&["2S", "2H"]), &cards(&["3D"])));
        assert!(!can_beat(&cards(&["2S"]), &cards(&["3D", "3C"])));
    }

    #[test]
    fn test_invalid_combo_never_beats() {
        assert!(!can_beat(&cards(&["2S", "AH"]), &cards(&["3D", "3C"])));
        assert!(!can_beat(&cards(&["3D", "3C"]), &cards(&["2S", "AH"])));
    }

    // === Five-card ladder ===

    #[test]
    fn test_ladder_ignores_rank() {
        let ladder = [
            cards(&["10D", "JC", "QH", "KS", "AD"]),
            cards(&["3H", "5H", "7H", "9H", "JH"]),
            cards(&["3D", "3C", "3H", "4D", "4C"]),
            cards(&["4D", "4C", "4H", "4S", "3D"]),
            cards(&["AD", "2D", "3D", "4D", "5D"]),
        ];
        for (i, lower) in ladder.iter().enumerate() {
            for higher in &ladder[i + 1..] {
                assert!(can_beat(higher, lower), "{higher:?} should beat {lower:?}");
                assert!(!can_beat(lower, higher), "{lower:?} should not beat {higher:?}");
            }
            assert!(!can_beat(lower, lower));
        }
    }

    #[test]
    fn test_flush_compares_by_top_card() {
        let spade_flush = cards(&["3S", "5S", "7S", "9S", "KS"]);
        let heart_flush = cards(&["4H", "6H", "8H", "10H", "KH"]);
        let ace_flush = cards(&["3D", "5D", "7D", "9D", "AD"]);
        assert!(can_beat(&spade_flush, &heart_flush));
        assert!(can_beat(&ace_flush, &spade_flush));
    }

    #[test]
    fn test_full_house_compares_by_triple() {
        let tens_full = cards(&["10D", "10C", "10H", "3D", "3C"]);
        let nines_full = cards(&["9D", "9C", "9H", "2D", "2C"]);
        assert!(can_beat(&tens_full, &nines_full));
        assert!(!can_beat(&nines_full, &tens_full));
    }

    #[test]
    fn test_higher_four_of_a_kind_beats_lower() {
        let jacks = cards(&["JD", "JC", "JH", "JS", "3D"]);
        let fives = cards(&["5D", "5C", "5H", "5S", "2S"]);
        assert!(can_beat(&jacks, &fives));
    }

    #[test]
    fn test_lower_four_of_a_kind_does_not_beat_higher() {
        let jacks = cards(&["JD", "JC", "JH", "JS", "3D"]);
        let fives = cards(&["5D", "5C", "5H", "5S", "2S"]);
        assert!(!can_beat(&fives, &jacks));
    }

    #[test]
    fn test_straight_flush_compares_by_top_card() {
        let six_high = cards(&["2H", "3H", "4H", "5H", "6H"]);
        let wheel = cards(&["AS", "2S", "3S", "4S", "5S"]);
        assert!(can_beat(&six_high, &wheel));
    }

    // === Display ordering ===

    #[test]
    fn test_classify_and_sort_wheel_in_sequence_order() {
        let classified = classify_and_sort_cards(&cards(&["4S", "2C", "5D", "AD", "3H"]));
        assert_eq!(classified.combo_type, ComboType::Straight);
        assert_eq!(
            classified.sorted_cards,
            cards(&["AD", "2C", "3H", "4S", "5D"])
        );
    }

    #[test]
    fn test_classify_and_sort_other_types_by_rank() {
        let classified = classify_and_sort_cards(&cards(&["4S", "4D", "KD", "KS", "KC"]));
        assert_eq!(classified.combo_type, ComboType::FullHouse);
        assert_eq!(
            classified.sorted_cards,
            cards(&["4D", "4S", "KD", "KC", "KS"])
        );
    }

    #[test]
    fn test_play_strength_keys() {
        let quads = cards(&["3D", "9D", "9C", "9H", "9S"]);
        let strength = play_strength(&quads).unwrap();
        assert_eq!(strength.combo_type, ComboType::FourOfAKind);
        assert_eq!(strength.key, Card::new(Rank::Nine, Suit::Spade));
        assert_eq!(play_strength(&cards(&["3D", "4D"])), None);
    }
}
