//! Detects plays that can never be beaten given what has been shown.
//!
//! Only public information is used: the cards already played face-up and the
//! play itself. Every other card is "unseen" and assumed to be in some
//! opponent's hand. The question is whether any combination that beats the
//! play could still be assembled from unseen cards.

use super::{
    entities::{Card, ComboType, Rank, Suit},
    functional::{PlayStrength, STRAIGHT_WINDOWS, play_strength},
};

/// Availability table of the cards nobody has seen yet, with per-rank and
/// per-suit counts computed once.
struct UnseenPool {
    available: [[bool; 4]; 13],
    rank_counts: [usize; 13],
    suit_counts: [usize; 4],
    total: usize,
}

impl UnseenPool {
    fn new(play: &[Card], played_cards: &[Card]) -> Self {
        let mut available = [[true; 4]; 13];
        for card in play.iter().chain(played_cards) {
            available[card.rank.index()][card.suit.index()] = false;
        }
        let mut rank_counts = [0; 13];
        let mut suit_counts = [0; 4];
        for rank in Rank::ALL {
            for suit in Suit::ALL {
                if available[rank.index()][suit.index()] {
                    rank_counts[rank.index()] += 1;
                    suit_counts[suit.index()] += 1;
                }
            }
        }
        Self {
            available,
            rank_counts,
            suit_counts,
            total: rank_counts.iter().sum(),
        }
    }

    fn has(&self, rank: Rank, suit: Suit) -> bool {
        self.available[rank.index()][suit.index()]
    }

    fn count(&self, rank: Rank) -> usize {
        self.rank_counts[rank.index()]
    }

    /// Highest unseen card of this rank.
    fn best_of_rank(&self, rank: Rank) -> Option<Card> {
        Suit::ALL
            .into_iter()
            .rev()
            .find(|suit| self.has(rank, *suit))
            .map(|suit| Card::new(rank, suit))
    }

    fn highest_card(&self) -> Option<Card> {
        Rank::ALL
            .into_iter()
            .rev()
            .find_map(|rank| self.best_of_rank(rank))
    }

    /// Strongest `size`-card set (pair or triple) still assemblable.
    fn best_set(&self, size: usize) -> Option<Card> {
        Rank::ALL.into_iter().rev().find_map(|rank| {
            (self.count(rank) >= size)
                .then(|| self.best_of_rank(rank))
                .flatten()
        })
    }

    fn best_straight_flush(&self) -> Option<Card> {
        STRAIGHT_WINDOWS.iter().rev().find_map(|window| {
            Suit::ALL
                .into_iter()
                .rev()
                .find(|suit| window.iter().all(|rank| self.has(*rank, *suit)))
                .map(|suit| Card::new(window[4], suit))
        })
    }

    fn best_four_of_a_kind(&self) -> Option<Card> {
        // Four of a kind needs a fifth card as a kicker.
        if self.total < 5 {
            return None;
        }
        Rank::ALL
            .into_iter()
            .rev()
            .find(|rank| self.count(*rank) == 4)
            .map(|rank| Card::new(rank, Suit::Spade))
    }

    fn best_full_house(&self) -> Option<Card> {
        Rank::ALL.into_iter().rev().find_map(|triple| {
            if self.count(triple) < 3 {
                return None;
            }
            let has_pair = Rank::ALL
                .into_iter()
                .any(|pair| pair != triple && self.count(pair) >= 2);
            has_pair.then(|| self.best_of_rank(triple)).flatten()
        })
    }

    fn best_flush(&self) -> Option<Card> {
        Suit::ALL
            .into_iter()
            .filter(|suit| self.suit_counts[suit.index()] >= 5)
            .filter_map(|suit| {
                Rank::ALL
                    .into_iter()
                    .rev()
                    .find(|rank| self.has(*rank, suit))
                    .map(|rank| Card::new(rank, suit))
            })
            .max()
    }

    fn best_straight(&self) -> Option<Card> {
        STRAIGHT_WINDOWS.iter().rev().find_map(|window| {
            window
                .iter()
                .all(|rank| self.count(*rank) > 0)
                .then(|| self.best_of_rank(window[4]))
                .flatten()
        })
    }

    /// Strongest constructible play of every five-card type.
    fn five_card_candidates(&self) -> [Option<PlayStrength>; 5] {
        let with = |combo_type: ComboType, key: Option<Card>| {
            key.map(|key| PlayStrength { combo_type, key })
        };
        [
            with(ComboType::Straight, self.best_straight()),
            with(ComboType::Flush, self.best_flush()),
            with(ComboType::FullHouse, self.best_full_house()),
            with(ComboType::FourOfAKind, self.best_four_of_a_kind()),
            with(ComboType::StraightFlush, self.best_straight_flush()),
        ]
    }
}

/// Whether no combination assemblable from unseen cards could beat `play`.
///
/// Invalid plays are never the highest.
#[must_use]
pub fn is_highest_possible_play(play: &[Card], played_cards: &[Card]) -> bool {
    let Some(strength) = play_strength(play) else {
        return false;
    };
    let pool = UnseenPool::new(play, played_cards);
    let better = |key: Option<Card>| key.is_some_and(|key| key > strength.key);
    match strength.combo_type {
        ComboType::Single => !better(pool.highest_card()),
        ComboType::Pair => !better(pool.best_set(2)),
        ComboType::Triple => !better(pool.best_set(3)),
        ComboType::Straight
        | ComboType::Flush
        | ComboType::FullHouse
        | ComboType::FourOfAKind
        | ComboType::StraightFlush => !pool
            .five_card_candidates()
            .into_iter()
            .flatten()
            .any(|candidate| candidate > strength),
        ComboType::Unknown => false,
    }
}

/// A provably unbeatable play starts the auto-pass countdown.
#[must_use]
pub fn should_trigger_auto_pass_timer(play: &[Card], played_cards: &[Card]) -> bool {
    is_highest_possible_play(play, played_cards)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(ids: &[&str]) -> Vec<Card> {
        ids.iter().map(|id| id.parse().unwrap()).collect()
    }

    fn all_of(ranks: &[Rank]) -> Vec<Card> {
        ranks
            .iter()
            .flat_map(|rank| Suit::ALL.into_iter().map(|suit| Card::new(*rank, suit)))
            .collect()
    }

    #[test]
    fn test_two_of_spades_is_highest_single() {
        assert!(is_highest_possible_play(&cards(&["2S"]), &[]));
    }

    #[test]
    fn test_ace_of_spades_needs_all_twos_gone() {
        let ace = cards(&["AS"]);
        assert!(!is_highest_possible_play(&ace, &[]));
        assert!(!is_highest_possible_play(&ace, &cards(&["2S", "2H", "2C"])));
        assert!(is_highest_possible_play(&ace, &cards(&["2S", "2H", "2C", "2D"])));
    }

    #[test]
    fn test_lonely_card_cannot_form_a_pair() {
        assert!(is_highest_possible_play(&cards(&["2C", "2D"]), &cards(&["2S"])));
        assert!(!is_highest_possible_play(&cards(&["2C", "2D"]), &[]));
    }

    #[test]
    fn test_pair_of_aces_blocked_by_unseen_twos() {
        let aces = cards(&["AH", "AS"]);
        assert!(!is_highest_possible_play(&aces, &cards(&["2S", "2H"])));
        assert!(is_highest_possible_play(&aces, &cards(&["2S", "2H", "2C"])));
    }

    #[test]
    fn test_triples() {
        assert!(is_highest_possible_play(&cards(&["2D", "2C", "2H"]), &[]));
        assert!(!is_highest_possible_play(&cards(&["KD", "KC", "KH"]), &[]));
        // Only two aces and two 2s left unseen.
        let played = cards(&["AD", "AC", "2D", "2C"]);
        assert!(is_highest_possible_play(&cards(&["KD", "KC", "KH"]), &played));
    }

    #[test]
    fn test_royal_spade_straight_flush_is_highest() {
        let royal = cards(&["10S", "JS", "QS", "KS", "AS"]);
        assert!(is_highest_possible_play(&royal, &[]));
        let hearts = cards(&["10H", "JH", "QH", "KH", "AH"]);
        assert!(!is_highest_possible_play(&hearts, &[]));
        assert!(is_highest_possible_play(&hearts, &cards(&["AS"])));
    }

    #[test]
    fn test_four_of_a_kind_blocked_by_possible_straight_flush() {
        let quads = cards(&["2D", "2C", "2H", "2S", "3D"]);
        assert!(!is_highest_possible_play(&quads, &[]));
        // Every straight window contains a 5 or a 10.
        let played = all_of(&[Rank::Five, Rank::Ten]);
        assert!(is_highest_possible_play(&quads, &played));
    }

    #[test]
    fn test_flush_blocked_by_full_house() {
        let flush = cards(&["3S", "5S", "7S", "9S", "2S"]);
        assert!(!is_highest_possible_play(&flush, &[]));
    }

    #[test]
    fn test_straight_needs_every_rank_unseen() {
        let straight = cards(&["10D", "JD", "QC", "KH", "AS"]);
        let mut played = all_of(&[Rank::Five, Rank::Ten]);
        played.retain(|card| card.id() != "10D");
        // Only JC, QS, KS and AH stay unseen.
        played.extend(all_of(&[Rank::Three, Rank::Four, Rank::Six, Rank::Seven]));
        played.extend(all_of(&[Rank::Eight, Rank::Nine, Rank::Two]));
        played.extend(cards(&["AD", "AC", "KD", "KC", "QD", "QH", "JH", "JS"]));
        assert!(is_highest_possible_play(&straight, &played));
    }

    #[test]
    fn test_invalid_play_is_never_highest() {
        assert!(!is_highest_possible_play(&cards(&["2S", "AS"]), &[]));
        assert!(!should_trigger_auto_pass_timer(&[], &[]));
    }

    #[test]
    fn test_auto_pass_trigger_delegates() {
        assert!(should_trigger_auto_pass_timer(&cards(&["2S"]), &[]));
        assert!(!should_trigger_auto_pass_timer(&cards(&["2H"]), &[]));
    }
}
