use crate::config::layout::{LayoutConfig, Theme};
use crate::domain::model::{CardId, CardMeaning, PositionId, SlotAssignment};
use crate::domain::ports::CardMeaningLookup;
use crate::utils::error::{EngineError, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionReading {
    pub position_id: PositionId,
    pub position_title: String,
    pub position_description: String,
    pub card_id: CardId,
    pub card_name: String,
    pub image_ref: String,
    pub is_reversed: bool,
    pub meaning: CardMeaning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub layout_id: String,
    pub spread_name_key: String,
    pub icon: String,
    pub theme: Theme,
    pub readings: Vec<PositionReading>,
}

/// 純函式：只看已填滿的牌位、牌陣的牌位資訊與 lookup 的結果
pub fn interpret(
    layout: &LayoutConfig,
    slots: &[SlotAssignment],
    lookup: &dyn CardMeaningLookup,
) -> Result<Interpretation> {
    let filled = slots.iter().filter(|s| s.is_filled()).count();
    if filled != layout.position_count || slots.len() != layout.position_count {
        return Err(EngineError::InvalidTransitionError {
            action: "interpret".to_string(),
            phase: format!("{} of {} cards drawn", filled, layout.position_count),
        });
    }

    let mut readings = Vec::with_capacity(slots.len());
    for slot in slots {
        let Some(card) = slot.card.as_ref() else {
            continue;
        };
        let position = layout.position(slot.position_id).ok_or_else(|| {
            EngineError::config(format!(
                "layout {} has no position {}",
                layout.layout_id, slot.position_id
            ))
        })?;

        readings.push(PositionReading {
            position_id: slot.position_id,
            position_title: position.title.clone(),
            position_description: position.description.clone(),
            card_id: card.id,
            card_name: card.canonical_name.clone(),
            image_ref: card.image_ref.clone(),
            is_reversed: slot.is_reversed,
            meaning: lookup.lookup(&layout.layout_id, card, slot.position_id, slot.is_reversed),
        });
    }

    Ok(Interpretation {
        layout_id: layout.layout_id.clone(),
        spread_name_key: layout.spread_name_key(),
        icon: layout.icon.clone(),
        theme: layout.theme,
        readings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::catalogue::Catalogue;
    use crate::adapters::meanings::CatalogueMeaningLookup;
    use crate::config::builtin_layouts;

    fn filled_slots(
        layout: &LayoutConfig,
        catalogue: &Catalogue,
        ids: &[CardId],
    ) -> Vec<SlotAssignment> {
        layout
            .positions
            .iter()
            .zip(ids)
            .map(|(position, id)| SlotAssignment {
                position_id: position.id,
                card: catalogue.get(*id).cloned(),
                is_reversed: id % 2 == 1,
            })
            .collect()
    }

    #[test]
    fn test_interprets_every_position_in_order() {
        let layout = builtin_layouts::love();
        let catalogue = Catalogue::standard();
        let slots = filled_slots(&layout, &catalogue, &[6, 13, 22, 77]);

        let result = interpret(&layout, &slots, &CatalogueMeaningLookup).unwrap();

        assert_eq!(result.readings.len(), 4);
        assert_eq!(result.readings[0].position_title, "The Person You Are Drawn To");
        assert_eq!(result.readings[0].card_name, "The Lovers");
        assert_eq!(result.readings[1].meaning.interpretation, "cards.death.reversed");
        assert_eq!(result.readings[3].card_name, "King of Pentacles");
        assert_eq!(result.spread_name_key, "love.data.spreadName");
    }

    #[test]
    fn test_rejects_partial_board() {
        let layout = builtin_layouts::love();
        let catalogue = Catalogue::standard();
        let mut slots = filled_slots(&layout, &catalogue, &[6, 13, 22, 77]);
        slots[2] = SlotAssignment::empty(3);

        assert!(matches!(
            interpret(&layout, &slots, &CatalogueMeaningLookup),
            Err(EngineError::InvalidTransitionError { .. })
        ));
    }
}
