use crate::adapters::catalogue::CATALOGUE_SIZE;
use crate::domain::model::{FormField, PositionId, ReadingType};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MODAL_KEYS: [&str; 27] = [
    "infoTitle",
    "aboutSpread",
    "aboutSpreadText",
    "cardCount",
    "cardCountText",
    "loveAttentionInfo",
    "loveAttention",
    "detailedReading",
    "detailedReadingText",
    "writtenReading",
    "writtenReadingText",
    "process",
    "step1",
    "step2",
    "step3",
    "step4",
    "cancel",
    "continue",
    "creditConfirm",
    "creditConfirmMessage",
    "processing",
    "confirm",
    "savingReading",
    "saveReading",
    "successTitle",
    "successMessage",
    "redirecting",
];

const FORM_KEYS: [&str; 16] = [
    "personalInfo",
    "firstName",
    "lastName",
    "birthDate",
    "email",
    "phone",
    "communicationMethod",
    "emailCommunication",
    "whatsappCommunication",
    "questions",
    "concernQuestion",
    "understandingQuestion",
    "emotionalQuestion",
    "saving",
    "saveAndOpen",
    "clearAll",
];

const PLACEHOLDER_KEYS: [&str; 7] = [
    "firstName",
    "lastName",
    "email",
    "phone",
    "concernQuestion",
    "understandingQuestion",
    "emotionalQuestion",
];

// canvas 文案為所有牌陣共用
const CANVAS_KEYS: [(&str, &str); 4] = [
    ("selectReadingTitle", "reading.prompts.selectReadingTitle"),
    ("selectReadingDescription", "reading.prompts.selectReadingDescription"),
    ("lockedTitle", "reading.prompts.lockedStateTitle"),
    ("lockedDescription", "reading.prompts.lockedStateDescription"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Purple,
    Pink,
    Blue,
    Green,
    Orange,
    Red,
}

/// 牌位在畫布上的相對位置（百分比）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub top_pct: f32,
    pub left_pct: f32,
    #[serde(default)]
    pub rotation_deg: i16,
    #[serde(default)]
    pub layer: u8,
}

impl Placement {
    pub fn at(top_pct: f32, left_pct: f32) -> Self {
        Self {
            top_pct,
            left_pct,
            rotation_deg: 0,
            layer: 20,
        }
    }

    pub fn rotated(mut self, rotation_deg: i16) -> Self {
        self.rotation_deg = rotation_deg;
        self
    }

    pub fn on_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionDescriptor {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub placement: Placement,
}

impl PositionDescriptor {
    pub fn new(title: &str, description: &str, placement: Placement) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            placement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub title: String,
    pub description: String,
    pub placement: Placement,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditTierKeys {
    pub detailed: String,
    pub written: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditKeyOverrides {
    pub detailed: Option<String>,
    pub written: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationKeys {
    pub name_min_length: String,
    pub surname_min_length: String,
    pub birth_date_required: String,
    pub email_invalid: String,
    pub question_min_length: String,
    pub phone_required: String,
}

impl ValidationKeys {
    pub fn key_for(&self, field: FormField) -> &str {
        match field {
            FormField::Name => &self.name_min_length,
            FormField::Surname => &self.surname_min_length,
            FormField::BirthDate => &self.birth_date_required,
            FormField::Email => &self.email_invalid,
            FormField::Phone => &self.phone_required,
            FormField::Concern | FormField::Understanding | FormField::Emotional => {
                &self.question_min_length
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationKeyOverrides {
    pub name_min_length: Option<String>,
    pub surname_min_length: Option<String>,
    pub birth_date_required: Option<String>,
    pub email_invalid: Option<String>,
    pub question_min_length: Option<String>,
    pub phone_required: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct I18nKeys {
    pub modals: BTreeMap<String, String>,
    pub form: BTreeMap<String, String>,
    pub placeholders: BTreeMap<String, String>,
    pub canvas: BTreeMap<String, String>,
}

impl I18nKeys {
    /// 深度合併：overrides 的每個 key 覆蓋預設值，其餘保留
    fn merged_with(mut self, overrides: I18nKeys) -> Self {
        self.modals.extend(overrides.modals);
        self.form.extend(overrides.form);
        self.placeholders.extend(overrides.placeholders);
        self.canvas.extend(overrides.canvas);
        self
    }
}

/// Factory input. Deserializable so extra layouts can be declared in the TOML config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutParams {
    pub layout_id: String,
    #[serde(default)]
    pub translation_namespace: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub reading_type_key: Option<String>,
    #[serde(default)]
    pub credit_key_prefix: Option<String>,
    pub positions: Vec<PositionDescriptor>,
    #[serde(default)]
    pub validation_overrides: ValidationKeyOverrides,
    #[serde(default)]
    pub credit_key_overrides: CreditKeyOverrides,
    #[serde(default)]
    pub i18n_overrides: I18nKeys,
}

impl LayoutParams {
    pub fn new(layout_id: &str, theme: Theme, positions: Vec<PositionDescriptor>) -> Self {
        Self {
            layout_id: layout_id.to_string(),
            translation_namespace: None,
            icon: None,
            theme,
            reading_type_key: None,
            credit_key_prefix: None,
            positions,
            validation_overrides: ValidationKeyOverrides::default(),
            credit_key_overrides: CreditKeyOverrides::default(),
            i18n_overrides: I18nKeys::default(),
        }
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.translation_namespace = Some(namespace.to_string());
        self
    }

    pub fn with_icon(mut self, icon: &str) -> Self {
        self.icon = Some(icon.to_string());
        self
    }

    pub fn with_reading_type_key(mut self, key: &str) -> Self {
        self.reading_type_key = Some(key.to_string());
        self
    }

    pub fn with_credit_prefix(mut self, prefix: &str) -> Self {
        self.credit_key_prefix = Some(prefix.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub layout_id: String,
    pub namespace: String,
    pub icon: String,
    pub reading_type_key: String,
    pub position_count: usize,
    pub positions: Vec<Position>,
    pub theme: Theme,
    pub credit_tier_keys: CreditTierKeys,
    pub validation_keys: ValidationKeys,
    pub i18n_keys: I18nKeys,
}

impl LayoutConfig {
    pub fn position(&self, id: PositionId) -> Option<&Position> {
        self.positions.iter().find(|p| p.id == id)
    }

    /// Simple 不需要扣點，沒有對應的 tier key
    pub fn credit_key_for(&self, reading_type: ReadingType) -> Option<&str> {
        match reading_type {
            ReadingType::Detailed => Some(&self.credit_tier_keys.detailed),
            ReadingType::Written => Some(&self.credit_tier_keys.written),
            ReadingType::Simple | ReadingType::None => None,
        }
    }

    pub fn title_key(&self, reading_type: ReadingType) -> String {
        let suffix = match reading_type {
            ReadingType::Detailed | ReadingType::Written => "detailedTitle",
            ReadingType::Simple | ReadingType::None => "simpleTitle",
        };
        format!("{}.data.{}", self.namespace, suffix)
    }

    pub fn spread_name_key(&self) -> String {
        format!("{}.data.spreadName", self.namespace)
    }
}

impl Validate for LayoutConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("layout.layout_id", &self.layout_id)?;
        validate_range("layout.positions", self.position_count, 1, CATALOGUE_SIZE)?;

        if self.positions.len() != self.position_count {
            return Err(EngineError::ConfigValidationError {
                field: format!("layouts.{}.positions", self.layout_id),
                message: format!(
                    "expected {} positions, found {}",
                    self.position_count,
                    self.positions.len()
                ),
            });
        }

        for (idx, position) in self.positions.iter().enumerate() {
            if usize::from(position.id) != idx + 1 {
                return Err(EngineError::ConfigValidationError {
                    field: format!("layouts.{}.positions", self.layout_id),
                    message: format!(
                        "position ids must be contiguous, found {} at {}",
                        position.id,
                        idx + 1
                    ),
                });
            }
            validate_non_empty_string(
                &format!("layouts.{}.positions[{}].title", self.layout_id, idx),
                &position.title,
            )?;
        }

        Ok(())
    }
}

/// Pure, total: every derived key comes from the layout id unless overridden.
/// Position ids saturate at `PositionId::MAX`; `Validate` rejects layouts larger than the deck.
pub fn build_layout_config(params: LayoutParams) -> LayoutConfig {
    let LayoutParams {
        layout_id,
        translation_namespace,
        icon,
        theme,
        reading_type_key,
        credit_key_prefix,
        positions,
        validation_overrides,
        credit_key_overrides,
        i18n_overrides,
    } = params;

    let namespace = translation_namespace.unwrap_or_else(|| to_camel_case(&layout_id));
    let credit_prefix = credit_key_prefix.unwrap_or_else(|| to_upper_snake_case(&namespace));
    let reading_type_key =
        reading_type_key.unwrap_or_else(|| format!("{}_SPREAD", to_upper_snake_case(&namespace)));

    let credit_tier_keys = CreditTierKeys {
        detailed: credit_key_overrides
            .detailed
            .unwrap_or_else(|| format!("{}_DETAILED", credit_prefix)),
        written: credit_key_overrides
            .written
            .unwrap_or_else(|| format!("{}_WRITTEN", credit_prefix)),
    };

    let validation_key = |name: &str, custom: Option<String>| {
        custom.unwrap_or_else(|| format!("{}.validation.{}", namespace, name))
    };
    let validation_keys = ValidationKeys {
        name_min_length: validation_key("nameMinLength", validation_overrides.name_min_length),
        surname_min_length: validation_key(
            "surnameMinLength",
            validation_overrides.surname_min_length,
        ),
        birth_date_required: validation_key(
            "birthDateRequired",
            validation_overrides.birth_date_required,
        ),
        email_invalid: validation_key("emailInvalid", validation_overrides.email_invalid),
        question_min_length: validation_key(
            "questionMinLength",
            validation_overrides.question_min_length,
        ),
        phone_required: validation_key("phoneRequired", validation_overrides.phone_required),
    };

    let i18n_keys = default_i18n_keys(&namespace).merged_with(i18n_overrides);

    let positions: Vec<Position> = positions
        .into_iter()
        .enumerate()
        .map(|(idx, descriptor)| Position {
            id: PositionId::try_from(idx + 1).unwrap_or(PositionId::MAX),
            title: descriptor.title,
            description: descriptor.description,
            placement: descriptor.placement,
        })
        .collect();

    LayoutConfig {
        layout_id,
        namespace,
        icon: icon.unwrap_or_else(|| "🔮".to_string()),
        reading_type_key,
        position_count: positions.len(),
        positions,
        theme,
        credit_tier_keys,
        validation_keys,
        i18n_keys,
    }
}

fn default_i18n_keys(namespace: &str) -> I18nKeys {
    let scoped = |group: &str, keys: &[&str]| -> BTreeMap<String, String> {
        keys.iter()
            .map(|k| (k.to_string(), format!("{}.{}.{}", namespace, group, k)))
            .collect()
    };

    I18nKeys {
        modals: scoped("modals", &MODAL_KEYS),
        form: scoped("form", &FORM_KEYS),
        placeholders: scoped("form.placeholders", &PLACEHOLDER_KEYS),
        canvas: CANVAS_KEYS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

/// `"problem-solving"` → `"problemSolving"`
pub fn to_camel_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut upper_next = false;

    for ch in value.to_lowercase().chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            upper_next = !out.is_empty() || upper_next;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    out
}

/// `"problemSolving"` → `"PROBLEM_SOLVING"`
pub fn to_upper_snake_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 4);
    let mut prev: Option<char> = None;

    for ch in value.chars() {
        if ch.is_ascii_uppercase()
            && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
        {
            out.push('_');
        }
        if ch == '-' || ch.is_whitespace() {
            out.push('_');
        } else {
            out.extend(ch.to_uppercase());
        }
        prev = Some(ch);
    }

    out
}
