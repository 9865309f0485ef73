use crate::adapters::catalogue::Catalogue;
use crate::domain::model::CardId;
use crate::utils::error::{EngineError, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::BTreeSet;

/// 洗好的牌序與已抽出的牌。`used_ids` 一定是 `order` 的子集。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeckState {
    order: Vec<CardId>,
    used_ids: BTreeSet<CardId>,
}

impl DeckState {
    pub fn new<R: Rng + ?Sized>(catalogue: &Catalogue, rng: &mut R) -> Self {
        let mut order: Vec<CardId> = catalogue.ids().collect();
        order.shuffle(rng);
        Self {
            order,
            used_ids: BTreeSet::new(),
        }
    }

    pub fn reset<R: Rng + ?Sized>(catalogue: &Catalogue, rng: &mut R) -> Self {
        Self::new(catalogue, rng)
    }

    /// 回傳新的狀態，原狀態不變
    pub fn draw(&self, catalogue: &Catalogue, card_id: CardId) -> Result<DeckState> {
        if !catalogue.contains(card_id) {
            return Err(EngineError::UnknownCardError { card_id });
        }
        if self.used_ids.contains(&card_id) {
            return Err(EngineError::DuplicateDrawError { card_id });
        }

        let mut next = self.clone();
        next.used_ids.insert(card_id);
        Ok(next)
    }

    /// 重排牌序，已抽出的牌維持已使用
    pub fn reshuffle<R: Rng + ?Sized>(&self, rng: &mut R) -> DeckState {
        let mut next = self.clone();
        next.order.shuffle(rng);
        next
    }

    pub fn next_available(&self) -> Option<CardId> {
        self.order
            .iter()
            .copied()
            .find(|id| !self.used_ids.contains(id))
    }

    pub fn is_used(&self, card_id: CardId) -> bool {
        self.used_ids.contains(&card_id)
    }

    pub fn used_ids(&self) -> &BTreeSet<CardId> {
        &self.used_ids
    }

    pub fn order(&self) -> &[CardId] {
        &self.order
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.used_ids.len()
    }
}
