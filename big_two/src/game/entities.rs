use chrono::{DateTime, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::constants::{CARDS_PER_HAND, DECK_SIZE};
use crate::table::config::BotDifficulty;

/// Suits in tie-break order: diamonds are the lowest, spades the highest.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    #[serde(rename = "D")]
    Diamond,
    #[serde(rename = "C")]
    Club,
    #[serde(rename = "H")]
    Heart,
    #[serde(rename = "S")]
    Spade,
}

impl Suit {
    pub const ALL: [Self; 4] = [Self::Diamond, Self::Club, Self::Heart, Self::Spade];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub const fn letter(self) -> char {
        match self {
            Self::Diamond => 'D',
            Self::Club => 'C',
            Self::Heart => 'H',
            Self::Spade => 'S',
        }
    }

    fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'D' => Some(Self::Diamond),
            'C' => Some(Self::Club),
            'H' => Some(Self::Heart),
            'S' => Some(Self::Spade),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Diamond => "♦",
            Self::Club => "♣",
            Self::Heart => "♥",
            Self::Spade => "♠",
        };
        write!(f, "{repr}")
    }
}

/// Card ranks in game order. The 2 is the highest rank, not a low card.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Rank {
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
}

impl Rank {
    pub const ALL: [Self; 13] = [
        Self::Three,
        Self::Four,
        Self::Five,
        Self::Six,
        Self::Seven,
        Self::Eight,
        Self::Nine,
        Self::Ten,
        Self::Jack,
        Self::Queen,
        Self::King,
        Self::Ace,
        Self::Two,
    ];

    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    #[must_use]
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Three => "3",
            Self::Four => "4",
            Self::Five => "5",
            Self::Six => "6",
            Self::Seven => "7",
            Self::Eight => "8",
            Self::Nine => "9",
            Self::Ten => "10",
            Self::Jack => "J",
            Self::Queen => "Q",
            Self::King => "K",
            Self::Ace => "A",
            Self::Two => "2",
        }
    }

    fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|rank| rank.label().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A playing card. Cards order by rank first and suit second, which is
/// exactly the single-card beat order of the game.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(into = "CardRepr", try_from = "CardRepr")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit }
    }

    /// Stable identifier, e.g. `3D`, `10S`, `QH`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}{}", self.rank.label(), self.suit.letter())
    }

    /// Position of the card in the ordered 52-card universe.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.rank.index() * 4 + self.suit.index()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.rank, self.suit)
    }
}

#[derive(Debug, Clone, Eq, Error, PartialEq)]
pub enum CardParseError {
    #[error("card id is empty")]
    Empty,
    #[error("unknown suit in card id {0:?}")]
    UnknownSuit(String),
    #[error("unknown rank in card id {0:?}")]
    UnknownRank(String),
    #[error("card id {id:?} does not match rank {rank} and suit {suit}")]
    Mismatch { id: String, rank: Rank, suit: Suit },
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s.chars().last().ok_or(CardParseError::Empty)?;
        let suit =
            Suit::from_letter(suit_char).ok_or_else(|| CardParseError::UnknownSuit(s.into()))?;
        let rank_part = &s[..s.len() - suit_char.len_utf8()];
        let rank =
            Rank::from_label(rank_part).ok_or_else(|| CardParseError::UnknownRank(s.into()))?;
        Ok(Self { rank, suit })
    }
}

// Wire form of a card: the id travels with the rank and suit so a stored
// snapshot is readable on its own.
#[derive(Deserialize, Serialize)]
struct CardRepr {
    id: String,
    rank: Rank,
    suit: Suit,
}

impl From<Card> for CardRepr {
    fn from(card: Card) -> Self {
        Self {
            id: card.id(),
            rank: card.rank,
            suit: card.suit,
        }
    }
}

impl TryFrom<CardRepr> for Card {
    type Error = CardParseError;

    fn try_from(repr: CardRepr) -> Result<Self, Self::Error> {
        let card = Self::new(repr.rank, repr.suit);
        if card.id() != repr.id {
            return Err(CardParseError::Mismatch {
                id: repr.id,
                rank: repr.rank,
                suit: repr.suit,
            });
        }
        Ok(card)
    }
}

/// Sort cards into the game's standard `(rank, suit)` order.
pub fn sort_cards(cards: &mut [Card]) {
    cards.sort_unstable();
}

#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    pub deck_idx: usize,
}

impl Deck {
    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied();
        if card.is_some() {
            self.deck_idx += 1;
        }
        card
    }

    /// Deal a sorted hand of [`CARDS_PER_HAND`] cards.
    pub fn deal_hand(&mut self) -> Vec<Card> {
        let mut hand: Vec<Card> = (0..CARDS_PER_HAND)
            .filter_map(|_| self.deal_card())
            .collect();
        sort_cards(&mut hand);
        hand
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.deck_idx = 0;
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards = [Card::new(Rank::Three, Suit::Diamond); DECK_SIZE];
        for rank in Rank::ALL {
            for suit in Suit::ALL {
                let card = Card::new(rank, suit);
                cards[card.index()] = card;
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Type alias for seat positions around the table.
pub type SeatIndex = usize;

/// Every named grouping a set of played cards can form.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboType {
    Single,
    Pair,
    Triple,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    Unknown,
}

impl ComboType {
    #[must_use]
    pub const fn is_valid(self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// Position on the five-card ladder; `None` for everything else.
    #[must_use]
    pub const fn five_card_ladder(self) -> Option<u8> {
        match self {
            Self::Straight => Some(0),
            Self::Flush => Some(1),
            Self::FullHouse => Some(2),
            Self::FourOfAKind => Some(3),
            Self::StraightFlush => Some(4),
            Self::Single | Self::Pair | Self::Triple | Self::Unknown => None,
        }
    }
}

impl fmt::Display for ComboType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Single => "single",
            Self::Pair => "pair",
            Self::Triple => "triple",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full house",
            Self::FourOfAKind => "four of a kind",
            Self::StraightFlush => "straight flush",
            Self::Unknown => "invalid combination",
        };
        write!(f, "{repr}")
    }
}

/// The most recent non-pass play on the table.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct LastPlay {
    pub position: SeatIndex,
    pub cards: Vec<Card>,
    pub combo_type: ComboType,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub hand: Vec<Card>,
    pub is_bot: bool,
    pub bot_difficulty: Option<BotDifficulty>,
}

impl Player {
    #[must_use]
    pub fn human(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            hand: Vec::with_capacity(CARDS_PER_HAND),
            is_bot: false,
            bot_difficulty: None,
        }
    }

    #[must_use]
    pub fn bot(id: &str, name: &str, difficulty: BotDifficulty) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            hand: Vec::with_capacity(CARDS_PER_HAND),
            is_bot: true,
            bot_difficulty: Some(difficulty),
        }
    }

    #[must_use]
    pub fn holds(&self, card: &Card) -> bool {
        self.hand.contains(card)
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.hand.len()
    }
}

/// What a seat did on its turn.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TurnAction {
    Play {
        cards: Vec<Card>,
        combo_type: ComboType,
    },
    Pass,
    // Recorded for every seat skipped when an auto-pass countdown expires.
    AutoPass,
}

impl fmt::Display for TurnAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Play { cards, combo_type } => {
                let cards = cards
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                write!(f, "plays {combo_type} [{cards}]")
            }
            Self::Pass => write!(f, "passes"),
            Self::AutoPass => write!(f, "auto-passes"),
        }
    }
}

/// One entry of the per-turn log.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RoundEntry {
    pub match_number: u32,
    pub player_index: SeatIndex,
    pub player_id: String,
    pub action: TurnAction,
    pub at: DateTime<Utc>,
}

/// Outcome of one finished match.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct MatchResult {
    pub match_number: u32,
    pub winner_id: String,
    /// Points charged to each seat this match, in seat order.
    pub points: Vec<u32>,
    /// Cards each seat still held when the match ended, in seat order.
    pub cards_left: Vec<usize>,
}

/// Running score of one seat across matches.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerScore {
    pub player_id: String,
    pub player_name: String,
    pub score: u32,
    pub match_points: Vec<u32>,
}

impl PlayerScore {
    #[must_use]
    pub fn new(player: &Player) -> Self {
        Self {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            score: 0,
            match_points: Vec::new(),
        }
    }
}
