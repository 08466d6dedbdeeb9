//! 助手注册表：固定的助手身份与展示元数据
//!
//! 进程启动时构建，之后只读；按声明顺序返回。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Result, StudioError};

/// 固定的助手身份
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorId {
    Scout,
    Analyst,
    Composer,
    Generator,
    Critic,
}

impl ActorId {
    /// 声明顺序
    pub const ALL: [ActorId; 5] = [
        ActorId::Scout,
        ActorId::Analyst,
        ActorId::Composer,
        ActorId::Generator,
        ActorId::Critic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorId::Scout => "scout",
            ActorId::Analyst => "analyst",
            ActorId::Composer => "composer",
            ActorId::Generator => "generator",
            ActorId::Critic => "critic",
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActorId {
    type Err = StudioError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        ActorId::ALL
            .into_iter()
            .find(|id| id.as_str() == key)
            .ok_or_else(|| StudioError::UnknownActor(s.to_string()))
    }
}

/// 助手身份与展示信息（不可变）
#[derive(Debug, Clone, Serialize)]
pub struct Actor {
    pub id: ActorId,
    pub name: &'static str,
    pub role: &'static str,
    pub capabilities: &'static [&'static str],
    /// 强调色（#RRGGBB）
    pub color: &'static str,
}

static ACTORS: [Actor; 5] = [
    Actor {
        id: ActorId::Scout,
        name: "Scout",
        role: "Reference & trend finder",
        capabilities: &["style discovery", "reference search", "trend tracking"],
        color: "#38bdf8",
    },
    Actor {
        id: ActorId::Analyst,
        name: "Analyst",
        role: "Image analyst",
        capabilities: &["color analysis", "composition analysis", "quality assessment"],
        color: "#a78bfa",
    },
    Actor {
        id: ActorId::Composer,
        name: "Composer",
        role: "Composition optimizer",
        capabilities: &["layout balancing", "focal point placement", "cropping"],
        color: "#34d399",
    },
    Actor {
        id: ActorId::Generator,
        name: "Generator",
        role: "Prompt & generation specialist",
        capabilities: &["prompt crafting", "variation generation", "upscaling"],
        color: "#fbbf24",
    },
    Actor {
        id: ActorId::Critic,
        name: "Critic",
        role: "Quality reviewer",
        capabilities: &["critique", "consistency checks", "export readiness"],
        color: "#f87171",
    },
];

/// 只读注册表，可在任意上下文并发读取
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorRegistry;

impl ActorRegistry {
    pub fn new() -> Self {
        Self
    }

    /// 按字符串 ID 查找，未知 ID 返回 UnknownActor
    pub fn get(&self, actor_id: &str) -> Result<&'static Actor> {
        let id: ActorId = actor_id.parse()?;
        Ok(self.actor(id))
    }

    pub fn actor(&self, id: ActorId) -> &'static Actor {
        // ACTORS 与 ActorId::ALL 同序
        &ACTORS[id as usize]
    }

    pub fn all(&self) -> &'static [Actor] {
        &ACTORS
    }
}
