use crate::config::layout::{
    build_layout_config, LayoutConfig, LayoutParams, Placement, PositionDescriptor, Theme,
};
use crate::utils::error::{EngineError, Result};
use crate::utils::validation::Validate;
use std::collections::BTreeMap;
use tracing::debug;

type Row = (&'static str, &'static str, f32, f32);

fn descriptors(rows: &[Row]) -> Vec<PositionDescriptor> {
    rows.iter()
        .map(|(title, description, top, left)| {
            PositionDescriptor::new(title, description, Placement::at(*top, *left))
        })
        .collect()
}

pub fn love() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("The Person You Are Drawn To", "The person you are asking about", 50.0, 15.0),
        ("Physical Connection", "Your physical and sensual bond", 50.0, 38.0),
        ("Emotional Connection", "Your emotional and spiritual bond", 50.0, 62.0),
        ("Long-Term Outcome", "Where the relationship leads in the long run", 50.0, 85.0),
    ]);
    positions[3].placement = positions[3].placement.rotated(90);

    build_layout_config(
        LayoutParams::new("love", Theme::Pink, positions)
            .with_icon("💕")
            .with_reading_type_key("LOVE_SPREAD")
            .with_credit_prefix("LOVE_SPREAD"),
    )
}

pub fn career() -> LayoutConfig {
    let positions = descriptors(&[
        ("Is this really the career I want?", "Question your career choices", 15.0, 65.0),
        ("What steps can I take to grow?", "Concrete steps to move forward", 15.0, 35.0),
        ("What can I not change?", "Factors outside your control", 50.0, 50.0),
        ("Am I doing my best?", "Your current effort and performance", 85.0, 80.0),
        ("What changes would help me?", "Improvements that support your career", 85.0, 60.0),
        (
            "Which past obstacles still affect me?",
            "How earlier experience shapes today",
            85.0,
            40.0,
        ),
        ("What will the outcome be?", "The overall direction of your career", 85.0, 20.0),
    ]);

    build_layout_config(
        LayoutParams::new("career", Theme::Blue, positions)
            .with_icon("💼")
            .with_reading_type_key("CAREER_SPREAD")
            .with_credit_prefix("CAREER_SPREAD"),
    )
}

pub fn money() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("Money Worries", "Is there anxiety around money?", 85.0, 50.0),
        ("Desire for Security", "The wish for financial safety", 70.0, 75.0),
        ("Using Money", "How to spend in a way that makes me happy", 70.0, 50.0),
        ("Past Attitude", "How I treated money in the past", 70.0, 25.0),
        ("Financial Responsibilities", "What a sound financial life asks of me", 45.0, 75.0),
        ("New Plans", "New plans for savings or investments", 45.0, 50.0),
        ("Future Plans", "Where my money plans are heading", 45.0, 25.0),
        ("Earning Talents", "Abilities that help me earn", 20.0, 50.0),
    ]);
    positions[7].placement = positions[7].placement.on_layer(30);

    build_layout_config(
        LayoutParams::new("money", Theme::Green, positions)
            .with_icon("💰")
            .with_reading_type_key("MONEY_SPREAD")
            .with_credit_prefix("MONEY_SPREAD"),
    )
}

pub fn problem_solving() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("The Question", "The question being asked", 45.0, 45.0),
        ("The Obstacle", "What stands in the way", 45.0, 45.0),
        ("Subconscious Background", "The roots of the matter", 65.0, 45.0),
        ("Best Potential", "The best that can come of it", 25.0, 45.0),
        ("Recent Past", "What just happened", 45.0, 70.0),
        ("Near Future", "What is about to happen", 45.0, 20.0),
        ("Current Situation", "Where you stand now", 20.0, 95.0),
        ("External Influences", "People and events around you", 35.0, 95.0),
        ("Fears and Worries", "What you are afraid of", 50.0, 95.0),
        ("Outcome", "Where the matter ends up", 65.0, 95.0),
    ]);
    // 障礙牌橫放壓在問題牌上
    positions[1].placement = positions[1].placement.rotated(90).on_layer(30);

    build_layout_config(
        LayoutParams::new("problem-solving", Theme::Orange, positions)
            .with_icon("🧩")
            .with_reading_type_key("PROBLEM_SOLVING_SPREAD"),
    )
}

pub fn marriage() -> LayoutConfig {
    let positions = descriptors(&[
        ("What will the outcome be?", "The overall outcome", 85.0, 85.0),
        ("What should I do while waiting?", "What is asked of you meanwhile", 85.0, 50.0),
        ("Will we share our finances?", "Shared resources", 85.0, 15.0),
        ("Will we both want commitment?", "Mutual willingness to commit", 55.0, 75.0),
        ("Will we have things in common?", "Shared ground", 35.0, 75.0),
        ("Will their family accept me?", "Family acceptance", 55.0, 25.0),
        ("How will we find each other?", "How you meet", 35.0, 25.0),
        ("Will we get along?", "Harmony between you", 10.0, 85.0),
        ("What kind of partner suits me?", "The partner that fits you", 10.0, 50.0),
        ("Will I get married?", "The central question", 10.0, 15.0),
    ]);

    build_layout_config(
        LayoutParams::new("marriage", Theme::Pink, positions)
            .with_icon("💒")
            .with_reading_type_key("MARRIAGE_SPREAD"),
    )
}

pub fn relationship_analysis() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("Current Situation", "Where the relationship stands", 50.0, 50.0),
        ("Your Feelings", "What you feel", 20.0, 70.0),
        ("Your Expectations", "What you hope for", 50.0, 75.0),
        ("Advice", "What would help", 80.0, 70.0),
        ("Road Map", "The path ahead", 80.0, 30.0),
        ("Partner's Expectations", "What your partner hopes for", 50.0, 25.0),
        ("Partner's Feelings", "What your partner feels", 20.0, 30.0),
    ]);
    positions[0].placement = positions[0].placement.on_layer(30);

    build_layout_config(
        LayoutParams::new("relationship-analysis", Theme::Blue, positions)
            .with_icon("💙")
            .with_reading_type_key("RELATIONSHIP_ANALYSIS_SPREAD"),
    )
}

pub fn relationship_problems() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("What is the conflict?", "The tension at the core", 85.0, 85.0),
        ("What is the problem?", "The problem itself", 65.0, 85.0),
        ("Did I create the problem?", "Your own part in it", 85.0, 15.0),
        ("Am I ignoring my share?", "What you may be overlooking", 65.0, 15.0),
        ("Past experiences together", "History with this person", 65.0, 50.0),
        ("Are we taking advantage of each other?", "Balance of give and take", 45.0, 50.0),
        ("Are others interfering?", "Outside involvement", 25.0, 85.0),
        ("Are money issues affecting us?", "Material pressure", 12.0, 50.0),
        ("Will this relationship last?", "The likely outcome", 25.0, 15.0),
    ]);
    positions[7].placement = positions[7].placement.on_layer(30);
    positions[8].placement = positions[8].placement.on_layer(30);

    build_layout_config(
        LayoutParams::new("relationship-problems", Theme::Red, positions)
            .with_icon("💔")
            .with_reading_type_key("RELATIONSHIP_PROBLEMS_SPREAD"),
    )
}

pub fn new_lover() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("Will I have a new relationship soon?", "Whether love is on its way", 65.0, 55.0),
        ("Which sign will they be?", "Hints about who they are", 65.0, 45.0),
        ("Will we be compatible?", "How well you fit", 50.0, 25.0),
        ("Will it be long-lasting?", "Staying power", 30.0, 45.0),
        ("Could they be my soulmate?", "Depth of the bond", 30.0, 55.0),
        ("Will my wish come true?", "The wish behind the question", 50.0, 75.0),
    ]);
    positions[2].placement = positions[2].placement.rotated(-6);
    positions[5].placement = positions[5].placement.rotated(6);

    build_layout_config(
        LayoutParams::new("new-lover", Theme::Pink, positions)
            .with_icon("💕")
            .with_reading_type_key("NEW_LOVER_SPREAD"),
    )
}

pub fn situation_analysis() -> LayoutConfig {
    let mut positions = descriptors(&[
        ("Past or Causes", "What brought you here", 86.0, 25.0),
        ("Present Situation", "Where things stand", 61.0, 25.0),
        ("Hidden Factors", "What is not yet visible", 36.0, 25.0),
        ("Central Card", "The heart of the matter", 18.0, 50.0),
        ("External Factors", "Outside influences", 36.0, 75.0),
        ("Advice", "What to do next", 61.0, 75.0),
        ("Possible Future", "The likely outcome", 86.0, 75.0),
    ]);
    positions[0].placement = positions[0].placement.on_layer(10);
    positions[2].placement = positions[2].placement.on_layer(10);
    positions[3].placement = positions[3].placement.on_layer(30);

    build_layout_config(
        LayoutParams::new("situation-analysis", Theme::Purple, positions)
            .with_icon("🔮")
            .with_reading_type_key("SITUATION_ANALYSIS_SPREAD"),
    )
}

pub fn builtin() -> Vec<LayoutConfig> {
    vec![
        love(),
        career(),
        money(),
        problem_solving(),
        marriage(),
        relationship_analysis(),
        relationship_problems(),
        new_lover(),
        situation_analysis(),
    ]
}

/// 以 layout_id 索引的牌陣集合
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: BTreeMap<String, LayoutConfig>,
}

impl LayoutRegistry {
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        for layout in builtin() {
            registry.layouts.insert(layout.layout_id.clone(), layout);
        }
        registry
    }

    /// 額外的牌陣走同一個 factory，id 不可與既有牌陣重複
    pub fn register(&mut self, params: LayoutParams) -> Result<&LayoutConfig> {
        let config = build_layout_config(params);
        config.validate()?;

        if self.layouts.contains_key(&config.layout_id) {
            return Err(EngineError::ConfigValidationError {
                field: "layouts".to_string(),
                message: format!("layout '{}' is already defined", config.layout_id),
            });
        }

        debug!(
            "Registered layout {} with {} positions",
            config.layout_id, config.position_count
        );
        let id = config.layout_id.clone();
        Ok(self.layouts.entry(id).or_insert(config))
    }

    pub fn get(&self, layout_id: &str) -> Option<&LayoutConfig> {
        self.layouts.get(layout_id)
    }

    pub fn require(&self, layout_id: &str) -> Result<&LayoutConfig> {
        self.get(layout_id).ok_or_else(|| EngineError::InvalidConfigValueError {
            field: "layout".to_string(),
            value: layout_id.to_string(),
            reason: format!(
                "unknown layout, expected one of: {}",
                self.ids().collect::<Vec<_>>().join(", ")
            ),
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LayoutConfig> {
        self.layouts.values()
    }

    pub fn len(&self) -> usize {
        self.layouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }
}
