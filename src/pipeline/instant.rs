//! Instant replies for trivial conversational turns
//!
//! An ordered table of trigger phrases is scanned against the normalized
//! query; the first trigger contained in the query wins. Time and date
//! replies are rendered at call time.

use chrono::{DateTime, Local, Locale, TimeZone};

use super::cache::normalize_query;

/// Timestamp renderings used by the dynamic replies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockFormat {
    /// `🕐 Son las 14:05:09`
    TimeOfDay,
    /// `📅 Hoy es sábado, 17 de octubre de 2026`
    LongDate,
    /// `📅 La fecha actual es 17/10/2026`
    ShortDate,
}

impl ClockFormat {
    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        match self {
            ClockFormat::TimeOfDay => format!("🕐 Son las {}", now.format("%H:%M:%S")),
            ClockFormat::LongDate => format!(
                "📅 Hoy es {}",
                now.format_localized("%A, %d de %B de %Y", Locale::es_ES)
            ),
            ClockFormat::ShortDate => format!("📅 La fecha actual es {}", now.format("%d/%m/%Y")),
        }
    }
}

/// Answer attached to a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantReply {
    Static(String),
    Clock(ClockFormat),
}

/// One row of the trigger table
#[derive(Debug, Clone)]
pub struct InstantRule {
    pub trigger: String,
    pub reply: InstantReply,
}

impl InstantRule {
    pub fn fixed(trigger: &str, answer: &str) -> Self {
        Self {
            trigger: trigger.to_lowercase(),
            reply: InstantReply::Static(answer.to_string()),
        }
    }

    pub fn clock(trigger: &str, format: ClockFormat) -> Self {
        Self {
            trigger: trigger.to_lowercase(),
            reply: InstantReply::Clock(format),
        }
    }
}

/// Looser second pass: any keyword present selects the clock reply
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub format: ClockFormat,
}

fn default_rules() -> Vec<InstantRule> {
    vec![
        InstantRule::fixed("hola", "¡Hola! 😊 ¿En qué puedo ayudarte hoy?"),
        InstantRule::fixed("hello", "Hello! 👋 How can I assist you?"),
        InstantRule::fixed("adiós", "¡Hasta luego! 👋 Que tengas un excelente día."),
        InstantRule::fixed("chao", "¡Chao! 😊 Espero verte pronto."),
        InstantRule::fixed("bye", "Goodbye! 👋 Have a great day!"),
        InstantRule::fixed("gracias", "¡De nada! 💙 Me encanta ayudarte."),
        InstantRule::fixed("thanks", "You're welcome! 💙 Happy to help!"),
        InstantRule::fixed("cómo estás", "¡Estoy funcionando perfectamente! 🤖 ¿Y tú cómo estás?"),
        InstantRule::fixed(
            "quién eres",
            "Soy tu asistente de IA inteligente 🧠 con un modelo local. Aprendo de cada conversación.",
        ),
        InstantRule::fixed(
            "qué puedes hacer",
            "Puedo: • Responder preguntas • Aprender nuevas cosas • Conversar • Ayudarte con información • Y mucho más! 🚀",
        ),
        InstantRule::fixed(
            "qué es la inteligencia artificial",
            "La IA es la simulación de procesos de inteligencia humana por máquinas. Incluye aprendizaje automático, razonamiento y autocorrección. 🤖",
        ),
        InstantRule::fixed(
            "qué es python",
            "Python es un lenguaje de programación versátil y fácil de aprender, ideal para IA, web, datos y automatización. 🐍",
        ),
        InstantRule::fixed(
            "qué es machine learning",
            "El Machine Learning es una rama de la IA donde las máquinas aprenden patrones de datos sin programación explícita. 📊",
        ),
        InstantRule::clock("qué hora es", ClockFormat::TimeOfDay),
        InstantRule::clock("qué día es hoy", ClockFormat::LongDate),
        InstantRule::clock("cuál es la fecha", ClockFormat::ShortDate),
        InstantRule::fixed("cómo te llamas", "Me llamo Asistente IA 🤖 ¡Mucho gusto!"),
        InstantRule::fixed(
            "quién te creó",
            "Fui creado para ayudarte con tus preguntas y tareas usando tecnología de IA local. 🚀",
        ),
    ]
}

fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule {
            keywords: vec!["hora".to_string()],
            format: ClockFormat::TimeOfDay,
        },
        KeywordRule {
            keywords: vec!["fecha".to_string(), "día es".to_string()],
            format: ClockFormat::LongDate,
        },
    ]
}

/// Substring matcher over the instant-reply table
#[derive(Debug, Clone)]
pub struct InstantMatcher {
    rules: Vec<InstantRule>,
    keyword_rules: Vec<KeywordRule>,
}

impl Default for InstantMatcher {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            keyword_rules: default_keyword_rules(),
        }
    }
}

impl InstantMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher with a custom table (order is the tie-break)
    pub fn with_rules(rules: Vec<InstantRule>, keyword_rules: Vec<KeywordRule>) -> Self {
        Self { rules, keyword_rules }
    }

    /// Trigger phrases in table order
    pub fn triggers(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.trigger.as_str())
    }

    /// Instant answer for `query`, if any
    pub fn find(&self, query: &str) -> Option<String> {
        self.find_at(query, &Local::now())
    }

    /// Same as [`find`](Self::find) with an explicit clock
    pub fn find_at<Tz: TimeZone>(&self, query: &str, now: &DateTime<Tz>) -> Option<String>
    where
        Tz::Offset: std::fmt::Display,
    {
        let low = normalize_query(query);
        if low.is_empty() {
            return None;
        }

        if let Some(rule) = self.rules.iter().find(|r| low.contains(r.trigger.as_str())) {
            return Some(match &rule.reply {
                InstantReply::Static(answer) => answer.clone(),
                InstantReply::Clock(format) => format.render(now),
            });
        }

        self.keyword_rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| low.contains(k.as_str())))
            .map(|rule| rule.format.render(now))
    }
}
