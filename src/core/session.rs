use crate::adapters::catalogue::Catalogue;
use crate::config::layout::{LayoutConfig, ValidationKeys};
use crate::config::toml_config::DEFAULT_REVERSAL_PROBABILITY;
use crate::core::deck::DeckState;
use crate::core::interpretation::{interpret, Interpretation};
use crate::domain::model::{
    CardId, CommunicationMethod, CreateReadingRequest, CreditStatus, Credits, FormErrors,
    FormField, IdempotencyKey, MaterializedSlot, PersonalInfo, Phase, PositionId, Questions,
    ReadingMetadata, ReadingType, SlotAssignment, UserId,
};
use crate::domain::ports::CardMeaningLookup;
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{
    has_min_chars, is_valid_birth_date, is_valid_email, MIN_ANSWER_CHARS, MIN_NAME_CHARS,
};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, warn};

const GUEST_KEY_OWNER: &str = "guest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Guest,
    User(UserId),
}

impl Identity {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Guest => None,
            Self::User(id) => Some(id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub reversal_probability: f64,
    pub seed: Option<u64>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            reversal_probability: DEFAULT_REVERSAL_PROBABILITY,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredDraw {
    NotAcceptingDraws(Phase),
    BoardFull,
    AlreadyDrawn(CardId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    Placed {
        position_id: PositionId,
        card_id: CardId,
        is_reversed: bool,
    },
    Ignored(IgnoredDraw),
}

impl DrawOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmissionState {
    Idle,
    InFlight,
    Done,
}

/// 送出當下凍結的 session 內容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user_id: Option<UserId>,
    pub layout_id: String,
    pub title: String,
    pub reading_type: ReadingType,
    pub slots: Vec<MaterializedSlot>,
    pub interpretation_text: String,
    pub personal_info: PersonalInfo,
    pub questions: Questions,
    pub communication_method: CommunicationMethod,
    pub cost_credits: Credits,
    pub idempotency_key: IdempotencyKey,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl SessionSnapshot {
    pub fn to_request(&self, user_id: &UserId, platform: &str) -> CreateReadingRequest {
        CreateReadingRequest {
            user_id: user_id.clone(),
            layout_id: self.layout_id.clone(),
            title: self.title.clone(),
            interpretation_text: self.interpretation_text.clone(),
            slots: self.slots.clone(),
            personal_info: self.personal_info.clone(),
            questions: self.questions.clone(),
            communication_method: self.communication_method,
            cost_credits: self.cost_credits,
            metadata: ReadingMetadata {
                duration_ms: self.duration_ms,
                reading_format: self.reading_type,
                platform: platform.to_string(),
            },
            idempotency_key: self.idempotency_key.clone(),
        }
    }
}

/// Single-user reading session. Phase is derived from the fields on every call.
#[derive(Debug, Clone)]
pub struct ReadingSession {
    layout: Arc<LayoutConfig>,
    catalogue: Arc<Catalogue>,
    deck: DeckState,
    rng: StdRng,
    reversal_probability: f64,
    identity: Identity,
    reading_type: ReadingType,
    declared_cost: Credits,
    slots: Vec<SlotAssignment>,
    personal_info: PersonalInfo,
    questions: Questions,
    communication_method: CommunicationMethod,
    form_errors: FormErrors,
    form_saved: bool,
    submission: SubmissionState,
    started_at: DateTime<Utc>,
    idempotency_key: IdempotencyKey,
}

impl ReadingSession {
    pub fn start(
        layout: Arc<LayoutConfig>,
        catalogue: Arc<Catalogue>,
        identity: Identity,
        options: SessionOptions,
    ) -> Self {
        Self::start_at(layout, catalogue, identity, options, Utc::now())
    }

    pub fn start_at(
        layout: Arc<LayoutConfig>,
        catalogue: Arc<Catalogue>,
        identity: Identity,
        options: SessionOptions,
        started_at: DateTime<Utc>,
    ) -> Self {
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let deck = DeckState::new(&catalogue, &mut rng);
        let slots = empty_slots(&layout);
        let key_owner = identity
            .user_id()
            .cloned()
            .unwrap_or_else(|| UserId::new(GUEST_KEY_OWNER));
        let idempotency_key = IdempotencyKey::derive(&key_owner, started_at);

        debug!(
            "Started {} session with {} positions",
            layout.layout_id, layout.position_count
        );

        Self {
            layout,
            catalogue,
            deck,
            rng,
            reversal_probability: options.reversal_probability.clamp(0.0, 1.0),
            identity,
            reading_type: ReadingType::None,
            declared_cost: 0,
            slots,
            personal_info: PersonalInfo::default(),
            questions: Questions::default(),
            communication_method: CommunicationMethod::default(),
            form_errors: FormErrors::default(),
            form_saved: false,
            submission: SubmissionState::Idle,
            started_at,
            idempotency_key,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.submission {
            SubmissionState::Done => Phase::Submitted,
            SubmissionState::InFlight => Phase::Submitting,
            SubmissionState::Idle => {
                if self.reading_type == ReadingType::None {
                    Phase::SelectingType
                } else if self.reading_type.is_paid() && !self.form_saved {
                    Phase::AwaitingForm
                } else if self.slots.iter().all(SlotAssignment::is_filled) {
                    Phase::ReadyToInterpret
                } else {
                    Phase::DrawingCards
                }
            }
        }
    }

    fn require_phase(&self, action: &str, allowed: &[Phase]) -> Result<Phase> {
        let phase = self.phase();
        if allowed.contains(&phase) {
            Ok(phase)
        } else {
            Err(EngineError::InvalidTransitionError {
                action: action.to_string(),
                phase: phase.to_string(),
            })
        }
    }

    /// Simple 直接進入抽牌；付費類型需要登入且餘額足夠，否則狀態不變
    pub fn select_reading_type(
        &mut self,
        reading_type: ReadingType,
        credit_status: Option<CreditStatus>,
    ) -> Result<Phase> {
        self.require_phase("select a reading type", &[Phase::SelectingType])?;

        match reading_type {
            ReadingType::None => {
                return Err(EngineError::InvalidTransitionError {
                    action: "select no reading type".to_string(),
                    phase: Phase::SelectingType.to_string(),
                });
            }
            ReadingType::Simple => {
                self.declared_cost = 0;
            }
            ReadingType::Detailed | ReadingType::Written => {
                if self.identity == Identity::Guest {
                    return Err(EngineError::AuthenticationRequiredError {
                        reading_type: reading_type.to_string(),
                    });
                }
                match credit_status {
                    Some(status) if status.has_enough_credits => {
                        self.declared_cost = status.required_credits;
                    }
                    Some(status) => {
                        return Err(EngineError::InsufficientCreditsError {
                            required: status.required_credits,
                            available: status.current_credits,
                        });
                    }
                    None => {
                        return Err(EngineError::InsufficientCreditsError {
                            required: 0,
                            available: 0,
                        });
                    }
                }
            }
        }

        self.reading_type = reading_type;
        let phase = self.phase();
        debug!("Reading type {} selected, now {}", reading_type, phase);
        Ok(phase)
    }

    pub fn update_personal_info(
        &mut self,
        field: FormField,
        value: impl Into<String>,
    ) -> Result<()> {
        if field.is_question() {
            return Err(EngineError::InvalidConfigValueError {
                field: field.to_string(),
                value: String::new(),
                reason: "not a personal info field".to_string(),
            });
        }
        self.edit_form(field, value.into())
    }

    pub fn update_question(&mut self, field: FormField, value: impl Into<String>) -> Result<()> {
        if !field.is_question() {
            return Err(EngineError::InvalidConfigValueError {
                field: field.to_string(),
                value: String::new(),
                reason: "not a question field".to_string(),
            });
        }
        self.edit_form(field, value.into())
    }

    pub fn set_communication_method(&mut self, method: CommunicationMethod) -> Result<()> {
        self.require_form_editable("change communication method")?;
        self.communication_method = method;
        self.form_errors.clear_field(FormField::Phone);
        Ok(())
    }

    fn require_form_editable(&self, action: &str) -> Result<()> {
        if self.form_saved {
            return Err(EngineError::InvalidTransitionError {
                action: action.to_string(),
                phase: self.phase().to_string(),
            });
        }
        self.require_phase(action, &[Phase::SelectingType, Phase::AwaitingForm])?;
        Ok(())
    }

    fn edit_form(&mut self, field: FormField, value: String) -> Result<()> {
        self.require_form_editable("edit the form")?;

        let target = match field {
            FormField::Name => &mut self.personal_info.name,
            FormField::Surname => &mut self.personal_info.surname,
            FormField::BirthDate => &mut self.personal_info.birth_date,
            FormField::Email => &mut self.personal_info.email,
            FormField::Phone => &mut self.personal_info.phone,
            FormField::Concern => &mut self.questions.concern,
            FormField::Understanding => &mut self.questions.understanding,
            FormField::Emotional => &mut self.questions.emotional,
        };
        *target = value;
        self.form_errors.clear_field(field);
        Ok(())
    }

    /// 逐欄檢查，全部通過才進入抽牌
    pub fn save_form(&mut self) -> Result<Phase> {
        self.require_phase("save the form", &[Phase::AwaitingForm])?;

        let errors = validate_form(
            &self.personal_info,
            &self.questions,
            self.communication_method,
            &self.layout.validation_keys,
        );
        if !errors.is_empty() {
            debug!("Form rejected: {}", errors);
            self.form_errors = errors.clone();
            return Err(EngineError::ValidationError(errors));
        }

        self.form_errors = FormErrors::default();
        self.form_saved = true;
        Ok(self.phase())
    }

    pub fn cancel_form(&mut self) -> Result<Phase> {
        self.require_phase("cancel the form", &[Phase::AwaitingForm])?;

        self.reading_type = ReadingType::None;
        self.declared_cost = 0;
        self.form_errors = FormErrors::default();
        self.slots = empty_slots(&self.layout);
        self.deck = DeckState::reset(&self.catalogue, &mut self.rng);
        Ok(self.phase())
    }

    /// 放到編號最小的空牌位。重複、滿盤或不在抽牌階段都只是忽略。
    pub fn draw(&mut self, card_id: CardId) -> Result<DrawOutcome> {
        if !self.catalogue.contains(card_id) {
            return Err(EngineError::UnknownCardError { card_id });
        }

        let phase = self.phase();
        if phase == Phase::ReadyToInterpret {
            return Ok(self.ignore(IgnoredDraw::BoardFull));
        }
        if phase != Phase::DrawingCards {
            return Ok(self.ignore(IgnoredDraw::NotAcceptingDraws(phase)));
        }

        let Some(index) = self.slots.iter().position(|s| !s.is_filled()) else {
            return Ok(self.ignore(IgnoredDraw::BoardFull));
        };

        let deck = match self.deck.draw(&self.catalogue, card_id) {
            Ok(deck) => deck,
            Err(EngineError::DuplicateDrawError { card_id }) => {
                return Ok(self.ignore(IgnoredDraw::AlreadyDrawn(card_id)));
            }
            Err(e) => return Err(e),
        };

        let card = self
            .catalogue
            .get(card_id)
            .cloned()
            .ok_or(EngineError::UnknownCardError { card_id })?;
        let is_reversed = self.rng.gen_bool(self.reversal_probability);

        self.deck = deck;
        let slot = &mut self.slots[index];
        slot.card = Some(card);
        slot.is_reversed = is_reversed;
        let position_id = slot.position_id;

        debug!(
            "Card {} placed at position {} ({})",
            card_id,
            position_id,
            if is_reversed { "reversed" } else { "upright" }
        );
        if self.phase() == Phase::ReadyToInterpret {
            debug!("All {} positions filled", self.layout.position_count);
        }

        Ok(DrawOutcome::Placed {
            position_id,
            card_id,
            is_reversed,
        })
    }

    fn ignore(&self, reason: IgnoredDraw) -> DrawOutcome {
        warn!("Draw ignored: {:?}", reason);
        DrawOutcome::Ignored(reason)
    }

    /// 從洗好的牌序取下一張未使用的牌
    pub fn draw_next(&mut self) -> Result<DrawOutcome> {
        match self.deck.next_available() {
            Some(card_id) => self.draw(card_id),
            None => Ok(self.ignore(IgnoredDraw::BoardFull)),
        }
    }

    pub fn toggle_orientation(&mut self, position_id: PositionId) -> Result<bool> {
        self.require_phase(
            "flip a card",
            &[Phase::DrawingCards, Phase::ReadyToInterpret],
        )?;

        let slot = self
            .slots
            .iter_mut()
            .find(|s| s.position_id == position_id && s.is_filled())
            .ok_or_else(|| EngineError::InvalidTransitionError {
                action: format!("flip position {}", position_id),
                phase: "empty position".to_string(),
            })?;
        slot.is_reversed = !slot.is_reversed;
        Ok(slot.is_reversed)
    }

    pub fn shuffle(&mut self) -> Result<()> {
        self.require_phase("shuffle", &[Phase::DrawingCards])?;
        self.deck = self.deck.reshuffle(&mut self.rng);
        Ok(())
    }

    pub fn clear_all(&mut self) -> Result<Phase> {
        self.require_phase(
            "clear the board",
            &[Phase::DrawingCards, Phase::ReadyToInterpret],
        )?;

        self.slots = empty_slots(&self.layout);
        self.deck = DeckState::reset(&self.catalogue, &mut self.rng);
        debug!("Board cleared");
        Ok(self.phase())
    }

    pub fn next_position(&self) -> Option<PositionId> {
        self.slots
            .iter()
            .find(|s| !s.is_filled())
            .map(|s| s.position_id)
    }

    pub fn interpretation(&self, lookup: &dyn CardMeaningLookup) -> Result<Interpretation> {
        self.require_phase(
            "interpret",
            &[Phase::ReadyToInterpret, Phase::Submitting, Phase::Submitted],
        )?;
        interpret(&self.layout, &self.slots, lookup)
    }

    pub fn begin_submission(
        &mut self,
        interpretation_text: impl Into<String>,
    ) -> Result<SessionSnapshot> {
        self.require_phase("submit", &[Phase::ReadyToInterpret])?;

        let slots = self
            .slots
            .iter()
            .filter_map(|slot| {
                let card = slot.card.as_ref()?;
                let title = self
                    .layout
                    .position(slot.position_id)
                    .map(|p| p.title.clone())
                    .unwrap_or_default();
                Some(MaterializedSlot {
                    position_id: slot.position_id,
                    position_title: title,
                    card_id: card.id,
                    card_name: card.canonical_name.clone(),
                    is_reversed: slot.is_reversed,
                })
            })
            .collect();

        let duration_ms = (Utc::now() - self.started_at).num_milliseconds().max(0) as u64;
        let snapshot = SessionSnapshot {
            user_id: self.identity.user_id().cloned(),
            layout_id: self.layout.layout_id.clone(),
            title: self.layout.title_key(self.reading_type),
            reading_type: self.reading_type,
            slots,
            interpretation_text: interpretation_text.into(),
            personal_info: self.personal_info.clone(),
            questions: self.questions.clone(),
            communication_method: self.communication_method,
            cost_credits: self.declared_cost,
            idempotency_key: self.idempotency_key.clone(),
            started_at: self.started_at,
            duration_ms,
        };

        self.submission = SubmissionState::InFlight;
        Ok(snapshot)
    }

    /// 成功 → Submitted；失敗回到 ReadyToInterpret，重試沿用同一個 key
    pub fn complete_submission<T>(&mut self, result: &Result<T>) -> Result<Phase> {
        self.require_phase("complete submission", &[Phase::Submitting])?;

        self.submission = match result {
            Ok(_) => SubmissionState::Done,
            Err(e) => {
                warn!("Submission failed, ready to retry: {}", e);
                SubmissionState::Idle
            }
        };
        Ok(self.phase())
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn deck(&self) -> &DeckState {
        &self.deck
    }

    pub fn slots(&self) -> &[SlotAssignment] {
        &self.slots
    }

    pub fn filled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_filled()).count()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn reading_type(&self) -> ReadingType {
        self.reading_type
    }

    pub fn declared_cost(&self) -> Credits {
        self.declared_cost
    }

    pub fn personal_info(&self) -> &PersonalInfo {
        &self.personal_info
    }

    pub fn questions(&self) -> &Questions {
        &self.questions
    }

    pub fn communication_method(&self) -> CommunicationMethod {
        self.communication_method
    }

    pub fn form_errors(&self) -> &FormErrors {
        &self.form_errors
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn idempotency_key(&self) -> &IdempotencyKey {
        &self.idempotency_key
    }
}

fn empty_slots(layout: &LayoutConfig) -> Vec<SlotAssignment> {
    layout
        .positions
        .iter()
        .map(|p| SlotAssignment::empty(p.id))
        .collect()
}

pub fn validate_form(
    info: &PersonalInfo,
    questions: &Questions,
    method: CommunicationMethod,
    keys: &ValidationKeys,
) -> FormErrors {
    let mut errors = FormErrors::default();
    let mut check = |field: FormField, ok: bool| {
        if !ok {
            errors.push(field, keys.key_for(field));
        }
    };

    check(FormField::Name, has_min_chars(&info.name, MIN_NAME_CHARS));
    check(FormField::Surname, has_min_chars(&info.surname, MIN_NAME_CHARS));
    check(FormField::BirthDate, is_valid_birth_date(&info.birth_date));
    check(FormField::Email, is_valid_email(&info.email));
    if method == CommunicationMethod::WhatsApp {
        check(FormField::Phone, !info.phone.trim().is_empty());
    }
    check(FormField::Concern, has_min_chars(&questions.concern, MIN_ANSWER_CHARS));
    check(
        FormField::Understanding,
        has_min_chars(&questions.understanding, MIN_ANSWER_CHARS),
    );
    check(
        FormField::Emotional,
        has_min_chars(&questions.emotional, MIN_ANSWER_CHARS),
    );

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::meanings::CatalogueMeaningLookup;
    use crate::config::builtin_layouts;
    use chrono::TimeZone;

    fn session(identity: Identity) -> ReadingSession {
        ReadingSession::start_at(
            Arc::new(builtin_layouts::love()),
            Arc::new(Catalogue::standard()),
            identity,
            SessionOptions {
                reversal_probability: 0.3,
                seed: Some(11),
            },
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
        )
    }

    fn user() -> Identity {
        Identity::User(UserId::new("user-1"))
    }

    fn enough(required: Credits) -> Option<CreditStatus> {
        Some(CreditStatus {
            has_enough_credits: true,
            required_credits: required,
            current_credits: 100,
        })
    }

    fn fill_form(s: &mut ReadingSession) {
        s.update_personal_info(FormField::Name, "Ayla").unwrap();
        s.update_personal_info(FormField::Surname, "Demir").unwrap();
        s.update_personal_info(FormField::BirthDate, "1992-07-14").unwrap();
        s.update_personal_info(FormField::Email, "ayla@example.com").unwrap();
        s.update_question(FormField::Concern, "Where is this relationship going?").unwrap();
        s.update_question(FormField::Understanding, "I want to understand his distance.").unwrap();
        s.update_question(FormField::Emotional, "Anxious but hopeful right now.").unwrap();
    }

    #[test]
    fn test_initial_state() {
        let s = session(user());
        assert_eq!(s.phase(), Phase::SelectingType);
        assert_eq!(s.slots().len(), 4);
        assert_eq!(s.next_position(), Some(1));
        assert_eq!(
            s.idempotency_key().as_str(),
            "reading_user-1_2024-05-01T10:00:00.000Z"
        );
    }

    #[test]
    fn test_draw_before_type_is_ignored() {
        let mut s = session(user());
        let outcome = s.draw(3).unwrap();
        assert_eq!(
            outcome,
            DrawOutcome::Ignored(IgnoredDraw::NotAcceptingDraws(Phase::SelectingType))
        );
        assert_eq!(s.filled_count(), 0);
    }

    #[test]
    fn test_guest_cannot_pick_paid_type() {
        let mut s = session(Identity::Guest);
        let err = s.select_reading_type(ReadingType::Written, enough(50)).unwrap_err();
        assert!(matches!(err, EngineError::AuthenticationRequiredError { .. }));
        assert_eq!(s.phase(), Phase::SelectingType);

        assert_eq!(
            s.select_reading_type(ReadingType::Simple, None).unwrap(),
            Phase::DrawingCards
        );
    }

    #[test]
    fn test_missing_credit_status_blocks_paid_type() {
        let mut s = session(user());
        assert!(matches!(
            s.select_reading_type(ReadingType::Detailed, None),
            Err(EngineError::InsufficientCreditsError { .. })
        ));
        assert_eq!(s.reading_type(), ReadingType::None);
    }

    #[test]
    fn test_form_errors_are_per_field_with_layout_keys() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Detailed, enough(60)).unwrap();
        s.update_personal_info(FormField::Name, "Al").unwrap();
        s.update_personal_info(FormField::Email, "not-an-email").unwrap();
        s.set_communication_method(CommunicationMethod::WhatsApp).unwrap();

        let err = s.save_form().unwrap_err();
        let EngineError::ValidationError(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get(FormField::Name), Some("love.validation.nameMinLength"));
        assert_eq!(errors.get(FormField::Email), Some("love.validation.emailInvalid"));
        assert_eq!(errors.get(FormField::Phone), Some("love.validation.phoneRequired"));
        assert_eq!(
            errors.get(FormField::Concern),
            Some("love.validation.questionMinLength")
        );
        assert_eq!(s.phase(), Phase::AwaitingForm);

        // 修改欄位會清掉該欄位的錯誤
        s.update_personal_info(FormField::Name, "Alara").unwrap();
        assert!(s.form_errors().get(FormField::Name).is_none());
        assert!(s.form_errors().get(FormField::Email).is_some());
    }

    #[test]
    fn test_saved_form_unlocks_drawing() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Detailed, enough(60)).unwrap();
        assert_eq!(
            s.draw(1).unwrap(),
            DrawOutcome::Ignored(IgnoredDraw::NotAcceptingDraws(Phase::AwaitingForm))
        );

        fill_form(&mut s);
        assert_eq!(s.save_form().unwrap(), Phase::DrawingCards);
        assert_eq!(s.declared_cost(), 60);
        assert!(s.draw(1).unwrap().is_placed());

        // 存檔後表單鎖定
        assert!(s.update_personal_info(FormField::Name, "Other").is_err());
    }

    #[test]
    fn test_cancel_form_returns_to_selection() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Written, enough(50)).unwrap();
        assert_eq!(s.cancel_form().unwrap(), Phase::SelectingType);
        assert_eq!(s.reading_type(), ReadingType::None);
        assert_eq!(s.declared_cost(), 0);
    }

    #[test]
    fn test_duplicate_and_unknown_cards() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Simple, None).unwrap();

        assert!(s.draw(10).unwrap().is_placed());
        assert_eq!(
            s.draw(10).unwrap(),
            DrawOutcome::Ignored(IgnoredDraw::AlreadyDrawn(10))
        );
        assert!(matches!(s.draw(99), Err(EngineError::UnknownCardError { card_id: 99 })));
        assert_eq!(s.filled_count(), 1);
        assert_eq!(s.next_position(), Some(2));
    }

    #[test]
    fn test_toggle_and_shuffle() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Simple, None).unwrap();
        assert!(s.toggle_orientation(1).is_err());

        s.draw(0).unwrap();
        let before = s.slots()[0].is_reversed;
        assert_eq!(s.toggle_orientation(1).unwrap(), !before);

        let used = s.deck().used_ids().clone();
        s.shuffle().unwrap();
        assert_eq!(s.deck().used_ids(), &used);
    }

    #[test]
    fn test_orientation_probability_extremes() {
        let mut s = ReadingSession::start(
            Arc::new(builtin_layouts::love()),
            Arc::new(Catalogue::standard()),
            user(),
            SessionOptions {
                reversal_probability: 1.0,
                seed: Some(3),
            },
        );
        s.select_reading_type(ReadingType::Simple, None).unwrap();
        for _ in 0..4 {
            s.draw_next().unwrap();
        }
        assert!(s.slots().iter().all(|slot| slot.is_reversed));
    }

    #[test]
    fn test_submission_round_trip_and_retry() {
        let mut s = session(user());
        s.select_reading_type(ReadingType::Simple, None).unwrap();
        for _ in 0..4 {
            s.draw_next().unwrap();
        }
        assert_eq!(s.phase(), Phase::ReadyToInterpret);
        assert!(s.interpretation(&CatalogueMeaningLookup).is_ok());

        let snapshot = s.begin_submission("text").unwrap();
        assert_eq!(s.phase(), Phase::Submitting);
        assert_eq!(snapshot.slots.len(), 4);
        assert_eq!(snapshot.title, "love.data.simpleTitle");
        assert_eq!(snapshot.cost_credits, 0);
        assert!(s.clear_all().is_err());

        let failed: Result<()> = Err(EngineError::persistence("timeout"));
        assert_eq!(s.complete_submission(&failed).unwrap(), Phase::ReadyToInterpret);

        let retry = s.begin_submission("text").unwrap();
        assert_eq!(retry.idempotency_key, snapshot.idempotency_key);
        assert_eq!(s.complete_submission(&Ok(())).unwrap(), Phase::Submitted);
        assert!(s.begin_submission("again").is_err());
    }
}
