//! 回复生成：(助手, 用户输入) -> 回复文本
//!
//! 先归一化输入，再按助手专属的关键词表顺序匹配，未命中时用助手能力生成通用回复。
//! 返回值保证非空。

use std::sync::OnceLock;

use regex::Regex;

use crate::core::{Actor, ActorId};

struct Trigger {
    keywords: &'static [&'static str],
    reply: fn(&Actor, &str) -> String,
}

const SCOUT: &[Trigger] = &[
    Trigger {
        keywords: &["style", "styles", "aesthetic", "look"],
        reply: |_, _| {
            "A few styles worth a look right now: cinematic teal-and-orange grading, soft watercolor \
             washes, and high-contrast minimalism. Want me to pull references for one of them?"
                .to_string()
        },
    },
    Trigger {
        keywords: &["trend", "trends", "trending", "popular"],
        reply: |_, _| {
            "Trending this week: moody film grain, pastel gradients, and isometric scenes. \
             I can keep watching these and flag new ones."
                .to_string()
        },
    },
    Trigger {
        keywords: &["reference", "references", "inspiration", "find", "search"],
        reply: |_, text| format!("On it. I'll gather references matching \"{}\" and line them up for comparison.", text.trim()),
    },
];

const ANALYST: &[Trigger] = &[
    Trigger {
        keywords: &["color", "colour", "colors", "palette"],
        reply: |_, _| {
            "I look at dominant hues, harmony type and saturation. Upload an image and I'll break \
             the palette down for you."
                .to_string()
        },
    },
    Trigger {
        keywords: &["composition", "layout", "balance"],
        reply: |_, _| {
            "For composition I score visual balance, count focal points and check which framing rule \
             the image follows."
                .to_string()
        },
    },
    Trigger {
        keywords: &["quality", "sharp", "sharpness", "noise", "exposure"],
        reply: |_, _| {
            "Quality covers sharpness, exposure and noise. Anything under 60 overall gets flagged as a warning."
                .to_string()
        },
    },
];

const COMPOSER: &[Trigger] = &[
    Trigger {
        keywords: &["crop", "framing", "frame"],
        reply: |_, _| {
            "Try a tighter crop that puts the subject on a third line; it usually adds tension without losing context."
                .to_string()
        },
    },
    Trigger {
        keywords: &["balance", "layout", "composition", "arrange"],
        reply: |_, _| {
            "I'd balance the heavy side with negative space or a secondary element. Send me an \
             analysis and I'll propose a layout."
                .to_string()
        },
    },
    Trigger {
        keywords: &["focal", "focus", "subject"],
        reply: |_, _| {
            "One clear focal point reads best. Dim or blur competing areas so the eye lands where you want."
                .to_string()
        },
    },
];

const GENERATOR: &[Trigger] = &[
    Trigger {
        keywords: &["prompt", "prompts", "describe"],
        reply: |_, text| {
            format!(
                "Here's a starting prompt built from your note: \"{}, detailed lighting, cohesive palette\". \
                 Tweak the adjectives to steer the mood.",
                text.trim()
            )
        },
    },
    Trigger {
        keywords: &["variation", "variations", "generate", "another"],
        reply: |_, _| {
            "I can spin up variations that keep the palette but change framing or style strength. How many would you like?"
                .to_string()
        },
    },
    Trigger {
        keywords: &["upscale", "resolution", "bigger", "enlarge"],
        reply: |_, _| "Upscaling 2x usually keeps detail clean; 4x works best after a denoise pass.".to_string(),
    },
];

const CRITIC: &[Trigger] = &[
    Trigger {
        keywords: &["review", "critique", "feedback", "opinion"],
        reply: |_, _| {
            "Honest take: strong idea, but check edge sharpness and whether the palette supports the mood. \
             I'll list specifics after the next analysis."
                .to_string()
        },
    },
    Trigger {
        keywords: &["export", "ready", "print", "publish"],
        reply: |_, _| {
            "Before export: confirm resolution, check color profile, and look for artifacts at 100% zoom."
                .to_string()
        },
    },
    Trigger {
        keywords: &["consistent", "consistency", "series"],
        reply: |_, _| {
            "For a consistent series keep lighting direction, palette and lens feel the same across images."
                .to_string()
        },
    },
];

/// 所有助手共用，排在专属表之后
const COMMON: &[Trigger] = &[
    Trigger {
        keywords: &["hello", "hi", "hey"],
        reply: |actor, _| format!("Hi! I'm {}, your {}. What are we working on?", actor.name, actor.role.to_lowercase()),
    },
    Trigger {
        keywords: &["help", "can you", "what can"],
        reply: |actor, _| format!("I can help with {}.", actor.capabilities.join(", ")),
    },
    Trigger {
        keywords: &["thanks", "thank you"],
        reply: |_, _| "Anytime. I'll keep an eye out and let you know if anything comes up.".to_string(),
    },
];

fn triggers(actor: ActorId) -> &'static [Trigger] {
    match actor {
        ActorId::Scout => SCOUT,
        ActorId::Analyst => ANALYST,
        ActorId::Composer => COMPOSER,
        ActorId::Generator => GENERATOR,
        ActorId::Critic => CRITIC,
    }
}

/// 小写化、去标点、合并空白
pub fn normalize(input: &str) -> String {
    static NON_WORD: OnceLock<Regex> = OnceLock::new();
    let re = NON_WORD.get_or_init(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid regex"));
    let stripped = re.replace_all(&input.to_lowercase(), " ").into_owned();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn matches(normalized: &str, keyword: &str) -> bool {
    let padded = format!(" {normalized} ");
    padded.contains(&format!(" {keyword} "))
}

/// 生成回复（总是非空）
pub fn generate_response(actor: &Actor, user_text: &str) -> String {
    let normalized = normalize(user_text);
    if normalized.is_empty() {
        return format!("I'm {}. What would you like me to look at?", actor.name);
    }

    let hit = triggers(actor.id)
        .iter()
        .chain(COMMON.iter())
        .find(|t| t.keywords.iter().any(|k| matches(&normalized, k)));

    match hit {
        Some(trigger) => (trigger.reply)(actor, user_text),
        None => format!(
            "As your {}, I can help with {}. Tell me more about \"{}\" and I'll take a look.",
            actor.role.to_lowercase(),
            actor.capabilities.join(", "),
            user_text.trim()
        ),
    }
}
