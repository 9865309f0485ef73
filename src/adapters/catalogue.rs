use crate::domain::model::{Card, CardId, Suit};
use crate::utils::error::{EngineError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

pub const CATALOGUE_SIZE: usize = 78;

const MAJOR_ARCANA: [(&str, &str); 22] = [
    ("The Fool", "0-Fool"),
    ("The Magician", "I-Magician"),
    ("The High Priestess", "II-HighPriestess"),
    ("The Empress", "III-Empress"),
    ("The Emperor", "IV-Emperor"),
    ("The Hierophant", "V-Hierophant"),
    ("The Lovers", "VI-Lovers"),
    ("The Chariot", "VII-Chariot"),
    ("Strength", "VIII-Strength"),
    ("The Hermit", "IX-Hermit"),
    ("Wheel of Fortune", "X-WheelOfFortune"),
    ("Justice", "XI-Justice"),
    ("The Hanged Man", "XII-HangedMan"),
    ("Death", "XIII-Death"),
    ("Temperance", "XIV-Temperance"),
    ("The Devil", "XV-Devil"),
    ("The Tower", "XVI-Tower"),
    ("The Star", "XVII-Star"),
    ("The Moon", "XVIII-Moon"),
    ("The Sun", "XIX-Sun"),
    ("Judgement", "XX-Judgement"),
    ("The World", "XXI-World"),
];

// 小阿爾克那：依 id 區段排列 (22 杯, 36 權杖, 50 寶劍, 64 錢幣)
const MINOR_SUITS: [(Suit, &str, CardId); 4] = [
    (Suit::Cups, "Cups", 22),
    (Suit::Wands, "Wands", 36),
    (Suit::Swords, "Swords", 50),
    (Suit::Pentacles, "Pentacles", 64),
];

const MINOR_RANKS: [(&str, &str); 14] = [
    ("Ace", "Ace"),
    ("Two", "II"),
    ("Three", "III"),
    ("Four", "IV"),
    ("Five", "V"),
    ("Six", "VI"),
    ("Seven", "VII"),
    ("Eight", "VIII"),
    ("Nine", "IX"),
    ("Ten", "X"),
    ("Page", "Page"),
    ("Knight", "Knight"),
    ("Queen", "Queen"),
    ("King", "King"),
];

/// Reference deck source. Immutable once built: exactly 78 cards, unique ids.
#[derive(Debug, Clone)]
pub struct Catalogue {
    cards: Vec<Card>,
    index: HashMap<CardId, usize>,
}

impl Catalogue {
    pub fn new(cards: Vec<Card>) -> Result<Self> {
        if cards.len() != CATALOGUE_SIZE {
            return Err(EngineError::InvalidConfigValueError {
                field: "catalogue".to_string(),
                value: cards.len().to_string(),
                reason: format!("catalogue must contain exactly {} cards", CATALOGUE_SIZE),
            });
        }

        let mut index = HashMap::with_capacity(cards.len());
        for (pos, card) in cards.iter().enumerate() {
            if index.insert(card.id, pos).is_some() {
                return Err(EngineError::InvalidConfigValueError {
                    field: "catalogue".to_string(),
                    value: card.id.to_string(),
                    reason: "duplicate card id".to_string(),
                });
            }
        }

        Ok(Self { cards, index })
    }

    /// 內建 Rider–Waite 78 張牌
    pub fn standard() -> Self {
        let mut cards = Vec::with_capacity(CATALOGUE_SIZE);

        for (number, (name, image)) in MAJOR_ARCANA.iter().enumerate() {
            cards.push(build_card(number as CardId, name, Suit::Major, number as u8, image));
        }

        for (suit, suit_name, first_id) in MINOR_SUITS {
            for (offset, (rank, image_rank)) in MINOR_RANKS.iter().enumerate() {
                let name = format!("{} of {}", rank, suit_name);
                let image = format!("{}-{}", image_rank, suit_name);
                cards.push(build_card(
                    first_id + offset as CardId,
                    &name,
                    suit,
                    offset as u8 + 1,
                    &image,
                ));
            }
        }

        let index = cards
            .iter()
            .enumerate()
            .map(|(pos, card)| (card.id, pos))
            .collect();
        Self { cards, index }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let cards: Vec<Card> = serde_json::from_str(content)?;
        Self::new(cards)
    }

    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.index.get(&id).map(|&pos| &self.cards[pos])
    }

    pub fn contains(&self, id: CardId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = CardId> + '_ {
        self.cards.iter().map(|c| c.id)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

fn build_card(id: CardId, name: &str, suit: Suit, number: u8, image: &str) -> Card {
    let slug = name.to_ascii_lowercase().replace(' ', "-");
    let mut localized_names = BTreeMap::new();
    localized_names.insert("en".to_string(), name.to_string());

    Card {
        id,
        canonical_name: name.to_string(),
        localized_names,
        suit,
        number,
        image_ref: format!("/cards/rws/{}.jpg", image),
        upright_meaning_ref: format!("cards.{}.upright", slug),
        reversed_meaning_ref: format!("cards.{}.reversed", slug),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_standard_catalogue_has_78_unique_cards() {
        let catalogue = Catalogue::standard();
        assert_eq!(catalogue.len(), CATALOGUE_SIZE);

        let ids: HashSet<CardId> = catalogue.ids().collect();
        assert_eq!(ids.len(), CATALOGUE_SIZE);
        assert_eq!(ids.iter().min(), Some(&0));
        assert_eq!(ids.iter().max(), Some(&77));
    }

    #[test]
    fn test_standard_catalogue_id_ranges() {
        let catalogue = Catalogue::standard();
        assert_eq!(catalogue.get(0).unwrap().canonical_name, "The Fool");
        assert_eq!(catalogue.get(21).unwrap().canonical_name, "The World");
        assert_eq!(catalogue.get(22).unwrap().canonical_name, "Ace of Cups");
        assert_eq!(catalogue.get(49).unwrap().canonical_name, "King of Wands");
        assert_eq!(catalogue.get(50).unwrap().suit, Suit::Swords);
        assert_eq!(catalogue.get(77).unwrap().canonical_name, "King of Pentacles");
        assert_eq!(catalogue.get(77).unwrap().image_ref, "/cards/rws/King-Pentacles.jpg");
        assert!(catalogue.get(78).is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_wrong_size() {
        let mut cards = Catalogue::standard().cards().to_vec();
        cards[1].id = 0;
        assert!(Catalogue::new(cards).is_err());

        let short: Vec<Card> = Catalogue::standard().cards()[..10].to_vec();
        assert!(Catalogue::new(short).is_err());
    }

    #[test]
    fn test_json_round_trip_through_loader() {
        let json = serde_json::to_string(Catalogue::standard().cards()).unwrap();
        let loaded = Catalogue::from_json_str(&json).unwrap();
        assert_eq!(loaded.get(13).unwrap().canonical_name, "Death");
    }
}
