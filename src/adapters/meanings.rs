use crate::domain::model::{Card, CardId, CardMeaning, PositionId, Suit};
use crate::domain::ports::CardMeaningLookup;
use crate::utils::error::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// 通用牌義：回傳牌卡本身的 meaning key，由外部翻譯成文字
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogueMeaningLookup;

impl CardMeaningLookup for CatalogueMeaningLookup {
    fn lookup(
        &self,
        _layout_id: &str,
        card: &Card,
        _position_id: PositionId,
        is_reversed: bool,
    ) -> CardMeaning {
        let orientation = if is_reversed { "reversed" } else { "upright" };
        CardMeaning {
            interpretation: card.meaning_ref(is_reversed).to_string(),
            keywords: vec![suit_keyword(card.suit).to_string(), orientation.to_string()],
            context: None,
        }
    }
}

fn suit_keyword(suit: Suit) -> &'static str {
    match suit {
        Suit::Major => "archetype",
        Suit::Cups => "emotion",
        Suit::Wands => "action",
        Suit::Swords => "thought",
        Suit::Pentacles => "material",
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeaningEntry {
    layout_id: String,
    position_id: PositionId,
    card_id: CardId,
    #[serde(default)]
    is_reversed: bool,
    #[serde(flatten)]
    meaning: CardMeaning,
}

type MeaningKey = (String, PositionId, CardId, bool);

/// 依牌陣、牌位、牌卡、正逆位覆寫的牌義表，查不到時退回通用牌義
#[derive(Debug, Clone, Default)]
pub struct PositionMeaningTable {
    entries: HashMap<MeaningKey, CardMeaning>,
    fallback: CatalogueMeaningLookup,
}

impl PositionMeaningTable {
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: Vec<MeaningEntry> = serde_json::from_str(content)?;
        let entries = raw
            .into_iter()
            .map(|e| ((e.layout_id, e.position_id, e.card_id, e.is_reversed), e.meaning))
            .collect();
        Ok(Self {
            entries,
            fallback: CatalogueMeaningLookup,
        })
    }

    pub async fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CardMeaningLookup for PositionMeaningTable {
    fn lookup(
        &self,
        layout_id: &str,
        card: &Card,
        position_id: PositionId,
        is_reversed: bool,
    ) -> CardMeaning {
        let key = (layout_id.to_string(), position_id, card.id, is_reversed);
        match self.entries.get(&key) {
            Some(meaning) => meaning.clone(),
            None => self.fallback.lookup(layout_id, card, position_id, is_reversed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalogue::Catalogue;

    const TABLE: &str = r#"[
        {
            "layoutId": "love",
            "positionId": 1,
            "cardId": 6,
            "interpretation": "A choice made with the whole heart.",
            "keywords": ["union", "choice"],
            "context": "You"
        },
        {
            "layoutId": "love",
            "positionId": 1,
            "cardId": 6,
            "isReversed": true,
            "interpretation": "Values pulling in different directions."
        }
    ]"#;

    #[test]
    fn test_catalogue_lookup_returns_meaning_key() {
        let catalogue = Catalogue::standard();
        let death = catalogue.get(13).unwrap();

        let meaning = CatalogueMeaningLookup.lookup("love", death, 2, true);
        assert_eq!(meaning.interpretation, "cards.death.reversed");
        assert_eq!(meaning.keywords, vec!["archetype", "reversed"]);
    }

    #[test]
    fn test_table_overrides_then_falls_back() {
        let catalogue = Catalogue::standard();
        let lovers = catalogue.get(6).unwrap();
        let table = PositionMeaningTable::from_json_str(TABLE).unwrap();
        assert_eq!(table.len(), 2);

        let upright = table.lookup("love", lovers, 1, false);
        assert_eq!(upright.interpretation, "A choice made with the whole heart.");
        assert_eq!(upright.context.as_deref(), Some("You"));

        let reversed = table.lookup("love", lovers, 1, true);
        assert_eq!(reversed.interpretation, "Values pulling in different directions.");
        assert!(reversed.keywords.is_empty());

        let elsewhere = table.lookup("career", lovers, 1, false);
        assert_eq!(elsewhere.interpretation, "cards.the-lovers.upright");
    }
}
