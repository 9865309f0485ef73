use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub type CardId = u8;
pub type PositionId = u8;
pub type Credits = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Major,
    Cups,
    Wands,
    Swords,
    Pentacles,
}

/// 參考牌卡（唯讀），meaning 欄位只存放查詢用的 key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub canonical_name: String,
    #[serde(default)]
    pub localized_names: BTreeMap<String, String>,
    pub suit: Suit,
    pub number: u8,
    pub image_ref: String,
    pub upright_meaning_ref: String,
    pub reversed_meaning_ref: String,
}

impl Card {
    pub fn meaning_ref(&self, is_reversed: bool) -> &str {
        if is_reversed {
            &self.reversed_meaning_ref
        } else {
            &self.upright_meaning_ref
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingType {
    #[default]
    None,
    Simple,
    Detailed,
    Written,
}

impl ReadingType {
    pub fn is_paid(&self) -> bool {
        matches!(self, Self::Detailed | Self::Written)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Simple => "simple",
            Self::Detailed => "detailed",
            Self::Written => "written",
        }
    }
}

impl fmt::Display for ReadingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "detailed" => Ok(Self::Detailed),
            "written" => Ok(Self::Written),
            other => Err(format!(
                "unknown reading type '{}', expected simple, detailed or written",
                other
            )),
        }
    }
}

/// Session phase. Always derived from session fields, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    SelectingType,
    AwaitingForm,
    DrawingCards,
    ReadyToInterpret,
    Submitting,
    Submitted,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SelectingType => "selecting-type",
            Self::AwaitingForm => "awaiting-form",
            Self::DrawingCards => "drawing-cards",
            Self::ReadyToInterpret => "ready-to-interpret",
            Self::Submitting => "submitting",
            Self::Submitted => "submitted",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommunicationMethod {
    #[default]
    Email,
    WhatsApp,
}

impl FromStr for CommunicationMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(Self::Email),
            "whatsapp" => Ok(Self::WhatsApp),
            other => Err(format!("unknown communication method '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub name: String,
    pub surname: String,
    pub birth_date: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Questions {
    pub concern: String,
    pub understanding: String,
    pub emotional: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FormField {
    Name,
    Surname,
    BirthDate,
    Email,
    Phone,
    Concern,
    Understanding,
    Emotional,
}

impl FormField {
    pub fn is_question(&self) -> bool {
        matches!(self, Self::Concern | Self::Understanding | Self::Emotional)
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Name => "name",
            Self::Surname => "surname",
            Self::BirthDate => "birthDate",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Concern => "concern",
            Self::Understanding => "understanding",
            Self::Emotional => "emotional",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldError {
    pub field: FormField,
    pub message_key: String,
}

/// 表單逐欄位錯誤，message_key 交給外部翻譯
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormErrors {
    errors: BTreeMap<FormField, String>,
}

impl FormErrors {
    pub fn push(&mut self, field: FormField, message_key: impl Into<String>) {
        self.errors.entry(field).or_insert_with(|| message_key.into());
    }

    pub fn clear_field(&mut self, field: FormField) {
        self.errors.remove(&field);
    }

    pub fn get(&self, field: FormField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldError> + '_ {
        self.errors.iter().map(|(field, key)| FieldError {
            field: *field,
            message_key: key.clone(),
        })
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self.errors.keys().map(|k| k.to_string()).collect();
        write!(f, "invalid fields [{}]", fields.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub position_id: PositionId,
    pub card: Option<Card>,
    pub is_reversed: bool,
}

impl SlotAssignment {
    pub fn empty(position_id: PositionId) -> Self {
        Self {
            position_id,
            card: None,
            is_reversed: false,
        }
    }

    pub fn is_filled(&self) -> bool {
        self.card.is_some()
    }
}

/// 寫入紀錄時使用的攤平牌位
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedSlot {
    pub position_id: PositionId,
    pub position_title: String,
    pub card_id: CardId,
    pub card_name: String,
    pub is_reversed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingMetadata {
    pub duration_ms: u64,
    pub reading_format: ReadingType,
    pub platform: String,
}

/// `reading_{userId}_{startedAt}`，同一個 session 的所有重試都共用
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    pub fn derive(user_id: &UserId, started_at: DateTime<Utc>) -> Self {
        Self(format!(
            "reading_{}_{}",
            user_id,
            started_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReadingRequest {
    pub user_id: UserId,
    pub layout_id: String,
    pub title: String,
    pub interpretation_text: String,
    pub slots: Vec<MaterializedSlot>,
    pub personal_info: PersonalInfo,
    pub questions: Questions,
    pub communication_method: CommunicationMethod,
    pub cost_credits: Credits,
    pub metadata: ReadingMetadata,
    pub idempotency_key: IdempotencyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingRecord {
    pub id: String,
    pub user_id: UserId,
    pub layout_id: String,
    pub title: String,
    pub slots: Vec<MaterializedSlot>,
    pub interpretation_text: String,
    pub personal_info: PersonalInfo,
    pub questions: Questions,
    pub communication_method: CommunicationMethod,
    pub cost_credits: Credits,
    pub metadata: ReadingMetadata,
    pub idempotency_key: IdempotencyKey,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerRefType {
    ReadingUsage,
    Grant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: UserId,
    pub delta_credits: i64,
    pub reason: String,
    pub ref_type: LedgerRefType,
    pub ref_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Advisory balance check result. Never treated as a debit guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditStatus {
    pub has_enough_credits: bool,
    pub required_credits: Credits,
    #[serde(default)]
    pub current_credits: Credits,
}

/// Card-meaning lookup 的回傳值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardMeaning {
    pub interpretation: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Persisted {
        record: ReadingRecord,
        replayed: bool,
    },
    /// 訪客 session 不寫入也不扣點
    GuestNotPersisted,
}

impl SubmitOutcome {
    pub fn record(&self) -> Option<&ReadingRecord> {
        match self {
            Self::Persisted { record, .. } => Some(record),
            Self::GuestNotPersisted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_idempotency_key_is_deterministic() {
        let user = UserId::new("user-42");
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();

        let a = IdempotencyKey::derive(&user, started);
        let b = IdempotencyKey::derive(&user, started);
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "reading_user-42_2024-05-01T10:30:00.000Z");

        let other = IdempotencyKey::derive(&UserId::new("user-43"), started);
        assert_ne!(a, other);
    }

    #[test]
    fn test_reading_type_parsing() {
        assert_eq!("Detailed".parse::<ReadingType>(), Ok(ReadingType::Detailed));
        assert!("none".parse::<ReadingType>().is_err());
        assert!(ReadingType::Written.is_paid());
        assert!(!ReadingType::Simple.is_paid());
    }

    #[test]
    fn test_form_errors_keep_first_key_per_field() {
        let mut errors = FormErrors::default();
        errors.push(FormField::Email, "love.validation.emailInvalid");
        errors.push(FormField::Email, "other.key");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(FormField::Email), Some("love.validation.emailInvalid"));

        errors.clear_field(FormField::Email);
        assert!(errors.is_empty());
    }
}
