//! Prompt assembly for each degradation level.
//!
//! The full prompt is built from layered sections:
//!
//! 1. **Role**: persona name, description and personality, never omitted
//! 2. **Memory**: fact sheet and important snippets, only when non-empty
//! 3. **State**: mood, level, today's study time, time of day
//! 4. **Behavior**: current root and sub state
//! 5. **Output format**: the structured reply schema
//!
//! The compact prompt keeps only a one-line schema and the mood, the
//! minimal prompt keeps nothing but the user's action.
//!
//! Assembly is deterministic: the hour is an input, not read from a clock.

use crate::context::token;
use crate::event::InteractionEvent;
use petmind_behavior::PetState;
use petmind_config::{PersonaConfig, ReplyConfig};
use petmind_core::{ChatTurn, Emotion, PetAction, PromptBundle, Sensors};
use petmind_providers::DegradationLevel;
use std::fmt::Write;

/// Everything the assembler reads for one request.
pub struct AssemblyInput<'a> {
    pub event: &'a InteractionEvent,
    pub sensors: &'a Sensors,
    pub state: PetState,
    /// Local hour, 0..24.
    pub hour: u32,
    /// Rendered memory block; empty when there is nothing to say.
    pub memory_prompt: &'a str,
    /// Prior turns, oldest first.
    pub history: &'a [ChatTurn],
}

/// Mood label: happy >70, neutral >40, low >20, angry otherwise.
pub fn mood_description(mood: u32) -> &'static str {
    if mood > 70 {
        "开心"
    } else if mood > 40 {
        "一般"
    } else if mood > 20 {
        "低落"
    } else {
        "愤怒"
    }
}

pub fn time_of_day(hour: u32) -> &'static str {
    match hour {
        0..6 => "深夜",
        6..12 => "上午",
        12..18 => "下午",
        _ => "晚上",
    }
}

pub struct ContextAssembler {
    persona: PersonaConfig,
    max_text_chars: usize,
}

impl ContextAssembler {
    pub fn new(persona: PersonaConfig, reply: &ReplyConfig) -> Self {
        Self {
            persona,
            max_text_chars: reply.max_text_chars,
        }
    }

    /// The bundle for `level`. Levels 2 and 3 get the minimal bundle.
    pub fn build_for_level(
        &self,
        level: DegradationLevel,
        input: &AssemblyInput<'_>,
    ) -> PromptBundle {
        match level {
            DegradationLevel::Full => self.build_full(input),
            DegradationLevel::Compact => self.build_compact(input),
            DegradationLevel::Template | DegradationLevel::Static => self.build_minimal(input),
        }
    }

    pub fn build_full(&self, input: &AssemblyInput<'_>) -> PromptBundle {
        let mut system_prompt = self.role_section(input.sensors);

        if !input.memory_prompt.trim().is_empty() {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(input.memory_prompt.trim_end());
        }

        let s = input.sensors;
        let _ = write!(
            system_prompt,
            "\n\n【当前状态】\n心情: {}/100 ({})\n等级: Lv.{}\n今日学习: {} 分钟\n当前时间: {}",
            s.mood,
            mood_description(s.mood),
            s.level,
            s.today_study_minutes,
            time_of_day(input.hour),
        );

        let _ = write!(
            system_prompt,
            "\n\n【行为状态】\n根状态: {}\n子状态: {}",
            input.state.root(),
            input.state.sub_name(),
        );

        system_prompt.push_str(&self.output_format());

        let user_message = input.event.user_message();
        let history = input.history.to_vec();
        let estimated_tokens =
            token::estimate_bundle_tokens(&system_prompt, &user_message, &history);
        PromptBundle {
            system_prompt,
            user_message,
            history,
            estimated_tokens,
        }
    }

    /// No memory, no history, a one-line schema.
    pub fn build_compact(&self, input: &AssemblyInput<'_>) -> PromptBundle {
        let system_prompt = format!(
            r#"你是{}。回复JSON格式:{{"text":"20字以内","emotion":"happy|sad|angry","action":"jump|idle|shake"}}"#,
            self.persona.pet_name
        );
        let user_message = format!("心情{}/100，用户{}", input.sensors.mood, input.event.action());
        Self::bundle(system_prompt, user_message)
    }

    /// A single instruction and the user's action.
    pub fn build_minimal(&self, input: &AssemblyInput<'_>) -> PromptBundle {
        Self::bundle("回复一句话(20字内)".to_string(), input.event.action())
    }

    fn bundle(system_prompt: String, user_message: String) -> PromptBundle {
        let estimated_tokens = token::estimate_bundle_tokens(&system_prompt, &user_message, &[]);
        PromptBundle {
            system_prompt,
            user_message,
            history: Vec::new(),
            estimated_tokens,
        }
    }

    fn role_section(&self, sensors: &Sensors) -> String {
        let mut role = format!(
            "你是一只住在桌面的电子宠物\"{}\"。\n性格：{}。\n说话风格：简短({}字以内)，可用emoji。",
            self.persona.pet_name, self.persona.description, self.max_text_chars
        );
        if !sensors.personality.trim().is_empty() {
            let _ = write!(role, "\n当前个性：{}", sensors.personality.trim());
        }
        role
    }

    fn output_format(&self) -> String {
        let emotions: Vec<&str> = Emotion::ALL.iter().map(Emotion::as_str).collect();
        let actions: Vec<&str> = PetAction::ALL.iter().map(PetAction::as_str).collect();
        format!(
            "\n\n请返回 JSON 格式（不要有其他文字）:\n{{\n  \"text\": \"{}字以内对话，可用emoji\",\n  \"emotion\": \"{}\",\n  \"action\": \"{}\",\n  \"duration\": 500-3000,\n  \"bubble_color\": \"#RRGGBB\"\n}}",
            self.max_text_chars,
            emotions.join("|"),
            actions.join("|"),
        )
    }
}
